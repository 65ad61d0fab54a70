//! Terminal front end for vizrag
//!
//! Parses shell commands, dispatches them against a session and renders the
//! results (answers are markdown) to the terminal.

mod commands;
mod render;
mod shell;
mod ui;

pub use commands::ShellCommand;
pub use render::render_markdown;
pub use shell::{Reply, SessionFactory, Shell, ShellStatus};
pub use ui::{
    display_banner, handle_input_with_history, print_answer, print_help, print_reply,
    read_masked, report_error,
};

// Re-export core types
pub use vizrag_core::{Error, Result};
