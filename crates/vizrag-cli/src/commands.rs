//! Shell command parsing

use std::path::PathBuf;

use vizrag_core::{Error, Result};

/// One line of shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Select a file for the next `process`
    Upload(PathBuf),
    Process,
    /// Explicit `ask <question>` or any bare text
    Ask(String),
    Status,
    Sources,
    Key,
    Help,
    Exit,
    Empty,
}

impl ShellCommand {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(ShellCommand::Empty);
        }

        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };

        let command = match (head.to_lowercase().as_str(), rest) {
            ("exit" | "quit", "") => ShellCommand::Exit,
            ("help" | "?", "") => ShellCommand::Help,
            ("process", "") => ShellCommand::Process,
            ("status", "") => ShellCommand::Status,
            ("sources", "") => ShellCommand::Sources,
            ("key", "") => ShellCommand::Key,
            ("upload", "") => {
                return Err(Error::InvalidInput("Usage: upload <path>".to_string()));
            }
            ("upload", path) => ShellCommand::Upload(PathBuf::from(unquote(path))),
            ("ask", "") => return Err(Error::InvalidInput("Usage: ask <question>".to_string())),
            ("ask", question) => ShellCommand::Ask(question.to_string()),
            _ => ShellCommand::Ask(input.to_string()),
        };

        Ok(command)
    }
}

fn unquote(path: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| {
            path.strip_prefix(*quote)
                .and_then(|inner| inner.strip_suffix(*quote))
        })
        .unwrap_or(path)
}
