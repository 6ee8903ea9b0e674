//! Chat application module for interactive conversations with a local model server.
//!
//! This module provides the pieces of the `talkhand-chat` REPL that are worth testing
//! without a terminal:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output and incremental reply printing

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer, ReplyPrinter};
