//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};
use vizrag_core::{ConversationTurn, Error, Result, RetrievedChunk, supported_formats};
use vizrag_rag::ProcessReport;

use crate::render::render_markdown;
use crate::shell::{Reply, ShellStatus};

const PROMPT: &str = "vizrag>";

/// Display startup banner
pub fn display_banner() {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "vizrag - HTML Content guide assistant";
    let title_line = format!(
        "│  {}{}│",
        title.blue().bold(),
        " ".repeat(banner_width.saturating_sub(title.chars().count() + 4))
    );
    println!("{}", title_line);
    println!("{}", empty_line.blue());

    let upload_line = format!("• upload a {} file", supported_formats());
    let feature_lines = [
        "Ask questions about your Power BI guide:",
        "",
        upload_line.as_str(),
        "• process it into a searchable index",
        "• get DAX measures and HTML/SVG snippets",
        "",
        concat!("v", env!("CARGO_PKG_VERSION")),
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let padding = " ".repeat(banner_width.saturating_sub(line.chars().count() + 4));
        let content = if line.starts_with('v') {
            format!("│  {}{}│", line.dimmed(), padding)
        } else {
            format!("│  {}{}│", line, padding)
        };
        println!("{}", content.blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "💡 Tip: 'upload <path>', then 'process', then type your question. 'help' lists commands"
            .dimmed()
    );
    println!();
}

/// Handle input with command history navigation
pub async fn handle_input_with_history(history: &mut Vec<String>) -> Result<String> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok("exit".to_string());
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(input);
    }

    enable_raw_mode()?;
    let result = read_line_raw(history);
    disable_raw_mode()?;
    println!();
    result
}

fn read_line_raw(history: &mut Vec<String>) -> Result<String> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    redraw(&input, 0)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        let previous_width = input.chars().count();
        match key_event.code {
            KeyCode::Enter => {
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(input);
            }
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok("exit".to_string());
            }
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Up if !history.is_empty() => {
                let new_index = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(new_index);
                input = history[new_index].clone();
            }
            KeyCode::Down => match history_index {
                Some(idx) if idx + 1 < history.len() => {
                    history_index = Some(idx + 1);
                    input = history[idx + 1].clone();
                }
                Some(_) => {
                    history_index = None;
                    input.clear();
                }
                None => {}
            },
            KeyCode::Esc => return Ok(String::new()),
            _ => {}
        }
        redraw(&input, previous_width)?;
    }
}

fn redraw(input: &str, previous_width: usize) -> Result<()> {
    let mut stdout = io::stdout();
    write!(
        stdout,
        "\r{} {}\r{} {}",
        PROMPT.green().bold(),
        " ".repeat(previous_width.max(input.chars().count())),
        PROMPT.green().bold(),
        input
    )?;
    stdout.flush()?;
    Ok(())
}

/// Read a secret without echoing it; each typed character shows as `*`
pub fn read_masked(label: &str) -> Result<String> {
    print!("{} ", label.cyan());
    io::stdout().flush()?;

    if !io::stdin().is_terminal() {
        let mut secret = String::new();
        io::stdin().read_line(&mut secret)?;
        return Ok(secret.trim().to_string());
    }

    enable_raw_mode()?;
    let result = read_masked_raw();
    disable_raw_mode()?;
    println!();
    result
}

fn read_masked_raw() -> Result<String> {
    let mut secret = String::new();
    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        match key_event.code {
            KeyCode::Enter => return Ok(secret),
            KeyCode::Esc => return Ok(String::new()),
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(String::new());
            }
            KeyCode::Char(c) => {
                secret.push(c);
                print!("*");
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                if secret.pop().is_some() {
                    print!("\u{8} \u{8}");
                    io::stdout().flush()?;
                }
            }
            _ => {}
        }
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!(
        "  {} - Select a {} file",
        "upload <path>".green(),
        supported_formats()
    );
    println!("  {} - Index the selected file", "process".green());
    println!("  {} - Ask about the indexed file (or just type the question)", "ask <question>".green());
    println!("  {} - Show session and index status", "status".green());
    println!("  {} - Show the chunks behind the last answer", "sources".green());
    println!("  {} - Enter the API key (input is hidden)", "key".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  upload guia_html_content.md");
    println!("  ¿Cómo creo un semáforo con HTML Content?");
    println!("  write a DAX measure for a progress bar");
}

/// One printable line for an action error; service failures print as warnings
pub fn error_line(error: &Error) -> String {
    if error.is_service_error() {
        format!("{} {}", "⚠️".yellow(), error.guidance().yellow())
    } else {
        format!("{} {}", "❌".red(), error.guidance().red())
    }
}

/// Print an action error with guidance; the shell keeps running
pub fn report_error(error: &Error) {
    println!("{}", error_line(error));
}

pub fn print_answer(turn: &ConversationTurn) {
    println!();
    println!("{}", render_markdown(&turn.answer));
    println!();
    let labels: Vec<String> = turn.sources.iter().map(|s| s.chunk.label()).collect();
    if !labels.is_empty() {
        println!("{} {}", "Sources:".dimmed(), labels.join(", ").dimmed());
    }
}

pub fn print_processed(report: &ProcessReport) {
    println!(
        "{} Processed {} into {} chunks ({} records, {} dimensions)",
        "✅".green(),
        report.filename.bold(),
        report.chunks,
        report.records,
        report.index.dimensions
    );
}

pub fn print_sources(sources: &[RetrievedChunk]) {
    if sources.is_empty() {
        println!("{}", "No answer yet. Ask a question first.".yellow());
        return;
    }
    for source in sources {
        println!(
            "{} {} {}",
            format!("[{}]", source.rank).cyan(),
            source.chunk.label().bold(),
            format!("score {:.3}", source.score).dimmed()
        );
        for line in source.chunk.content.lines() {
            println!("    {}", line);
        }
    }
}

pub fn print_status(status: &ShellStatus) {
    let credential = if status.credential { "set".green() } else { "missing".red() };
    println!("{} {}", "API key:".bold(), credential);
    println!(
        "{} {}",
        "Selected file:".bold(),
        status.selected.as_deref().unwrap_or("none")
    );

    let Some(session) = &status.session else {
        return;
    };
    println!("{} {}", "State:".bold(), session.state.to_string().cyan());
    if let Some(index) = &session.index {
        println!(
            "{} {} chunks from {} ({} metric, {} dimensions, built {})",
            "Index:".bold(),
            index.chunks,
            index.sources.join(", "),
            index.metric,
            index.dimensions,
            index.built_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("{} {}", "Questions answered:".bold(), session.turns_answered);
    if let Some(error) = &session.last_error {
        println!("{} {}", "Last error:".bold(), error.yellow());
    }
}

/// Print a dispatched command's result
pub fn print_reply(reply: &Reply) {
    match reply {
        Reply::Selected { filename, bytes } => println!(
            "{} Selected {} ({} bytes). Run 'process' to index it.",
            "📄".cyan(),
            filename.bold(),
            bytes
        ),
        Reply::Processed(report) => print_processed(report),
        Reply::Answer(turn) => print_answer(turn),
        Reply::Status(status) => print_status(status),
        Reply::Sources(sources) => print_sources(sources),
        Reply::Help => print_help(),
        Reply::Exit => println!("{}", "👋 Goodbye!".green()),
        Reply::KeyRequested | Reply::Nothing => {}
    }
}
