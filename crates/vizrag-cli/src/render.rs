//! Markdown → terminal text renderer for answers

use colored::*;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default)]
struct Style {
    bold: bool,
    italic: bool,
    link: bool,
}

/// Render markdown `md` as terminal lines. Fenced code is framed and
/// highlighted so DAX and HTML answers are easy to copy.
pub fn render_markdown(md: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut styles: Vec<Style> = vec![Style::default()];

    let mut in_code_block = false;
    let mut code_lang = String::new();
    let mut code_buffer = String::new();
    let mut heading: Option<HeadingLevel> = None;
    let mut list_depth: usize = 0;

    for event in Parser::new(md) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_line(&mut current, &mut lines);
                heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                let text = std::mem::take(&mut current);
                let styled = match heading {
                    Some(HeadingLevel::H1) => text.cyan().bold().underline(),
                    Some(HeadingLevel::H2) => text.cyan().bold(),
                    _ => text.bold(),
                };
                lines.push(styled.to_string());
                lines.push(String::new());
                heading = None;
            }

            Event::Start(Tag::Strong) => push_style(&mut styles, |s| s.bold = true),
            Event::Start(Tag::Emphasis) => push_style(&mut styles, |s| s.italic = true),
            Event::Start(Tag::Link { .. }) => push_style(&mut styles, |s| s.link = true),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Link) => {
                if styles.len() > 1 {
                    styles.pop();
                }
            }

            Event::Code(code) => {
                current.push_str(&code.yellow().to_string());
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                flush_line(&mut current, &mut lines);
                in_code_block = true;
                code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_buffer.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                render_code_block(&code_buffer, &code_lang, &mut lines);
                in_code_block = false;
            }

            Event::Start(Tag::List(_)) => {
                flush_line(&mut current, &mut lines);
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(String::new());
                }
            }
            Event::Start(Tag::Item) => {
                flush_line(&mut current, &mut lines);
                let indent = "  ".repeat(list_depth.saturating_sub(1));
                current.push_str(&format!("{}{} ", indent, "•".blue()));
            }
            Event::End(TagEnd::Item) => flush_line(&mut current, &mut lines),

            Event::End(TagEnd::Paragraph) => {
                flush_line(&mut current, &mut lines);
                if list_depth == 0 {
                    lines.push(String::new());
                }
            }

            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                if in_code_block {
                    code_buffer.push_str(&text);
                } else {
                    let style = styles.last().copied().unwrap_or_default();
                    current.push_str(&apply(&text, style));
                }
            }
            Event::SoftBreak => current.push(' '),
            Event::HardBreak => flush_line(&mut current, &mut lines),
            Event::Rule => {
                flush_line(&mut current, &mut lines);
                lines.push("─".repeat(40).dimmed().to_string());
                lines.push(String::new());
            }
            _ => {}
        }
    }

    flush_line(&mut current, &mut lines);
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

fn push_style(styles: &mut Vec<Style>, change: impl FnOnce(&mut Style)) {
    let mut style = styles.last().copied().unwrap_or_default();
    change(&mut style);
    styles.push(style);
}

fn apply(text: &str, style: Style) -> String {
    let mut styled = text.normal();
    if style.bold {
        styled = styled.bold();
    }
    if style.italic {
        styled = styled.italic();
    }
    if style.link {
        styled = styled.blue().underline();
    }
    styled.to_string()
}

fn flush_line(current: &mut String, lines: &mut Vec<String>) {
    if !current.is_empty() {
        lines.push(std::mem::take(current));
    }
}

fn render_code_block(code: &str, lang: &str, lines: &mut Vec<String>) {
    let label = if lang.is_empty() { "code" } else { lang };
    lines.push(format!("┌─ {}", label).dimmed().to_string());
    for line in code.trim_end_matches('\n').lines() {
        lines.push(format!("{} {}", "│".dimmed(), line.green()));
    }
    lines.push("└─".dimmed().to_string());
    lines.push(String::new());
}
