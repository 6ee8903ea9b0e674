//! Output rendering for the chat application.
//!
//! A [`Renderer`] draws text on the terminal.  A [`ReplyPrinter`] turns the conversation's
//! [`ConversationEvent`]s for one reply into renderer calls, printing streamed text
//! incrementally.

use std::io::{self, Stdout, Write};

use crate::conversation::{ConversationEvent, SendOutcome};
use crate::types::Message;

/// ANSI escape code for dim text (used for the typing indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for speaker labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Return to column zero and erase the line.
const ANSI_CLEAR_LINE: &str = "\r\x1b[2K";

const TYPING: &str = "...";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Show that the assistant has not answered yet.
    fn start_typing(&mut self);

    /// Remove the typing indicator, if shown.
    fn stop_typing(&mut self);

    /// Print a chunk of assistant text.
    ///
    /// This is called incrementally as the reply streams in.
    fn print_text(&mut self, text: &str);

    /// Print a stored message with its speaker.
    fn print_message(&mut self, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a reply is complete.
    fn finish_response(&mut self);

    /// Called when the user stopped the reply.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    typing: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            typing: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_typing(&mut self) {
        if self.typing {
            return;
        }
        self.typing = true;
        if self.use_color {
            print!("{ANSI_DIM}{TYPING}{ANSI_RESET}");
        } else {
            print!("{TYPING}");
        }
        self.flush();
    }

    fn stop_typing(&mut self) {
        if !self.typing {
            return;
        }
        self.typing = false;
        if self.use_color {
            print!("{ANSI_CLEAR_LINE}");
        } else {
            println!();
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        self.stop_typing();
        print!("{text}");
        self.flush();
    }

    fn print_message(&mut self, message: &Message) {
        let speaker = if message.is_from_user() {
            "You"
        } else {
            "Assistant"
        };
        if self.use_color {
            println!("{ANSI_CYAN}{speaker}:{ANSI_RESET} {}", message.text());
        } else {
            println!("{speaker}: {}", message.text());
        }
    }

    fn print_error(&mut self, error: &str) {
        self.stop_typing();
        if self.use_color {
            eprintln!("{ANSI_RED}{error}{ANSI_RESET}");
        } else {
            eprintln!("{error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.stop_typing();
        println!("{info}");
    }

    fn finish_response(&mut self) {
        self.stop_typing();
        println!();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.stop_typing();
        println!("\n[interrupted]");
        self.flush();
    }
}

/// Follows one reply and draws it.
///
/// Streamed text is printed as suffixes of what is already on screen.  Sanitizing can make
/// the text shrink when a control tag completes; nothing is printed until the text extends
/// what was shown again, and if the settled text disagrees with the screen it is printed
/// again in full.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    printed: String,
    streaming: bool,
    reply: Option<String>,
}

impl ReplyPrinter {
    /// A printer for a reply that has not started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the effect of `event`.
    pub fn apply(&mut self, event: &ConversationEvent, renderer: &mut dyn Renderer) {
        match event {
            ConversationEvent::FlagsChanged {
                is_awaiting_first_token: true,
                ..
            } => renderer.start_typing(),
            ConversationEvent::FlagsChanged {
                is_streaming: true, ..
            } => {
                self.streaming = true;
                renderer.stop_typing();
            }
            ConversationEvent::MessageUpdated(message) if self.streaming => {
                self.print_suffix(message.text(), renderer);
                self.reply = Some(message.text().to_string());
            }
            ConversationEvent::MessageAppended(message) if !message.is_from_user() => {
                self.reply = Some(message.text().to_string());
            }
            _ => {}
        }
    }

    /// Draw the end of the reply.
    pub fn finish(&mut self, outcome: &SendOutcome, renderer: &mut dyn Renderer) {
        match outcome {
            SendOutcome::Ignored => {}
            SendOutcome::Completed => {
                let reply = self.reply.take().unwrap_or_default();
                if !self.streaming {
                    renderer.print_text(&reply);
                } else if reply != self.printed {
                    renderer.print_text("\n");
                    renderer.print_text(&reply);
                }
                renderer.finish_response();
            }
            SendOutcome::Failed(err) => {
                if !self.printed.is_empty() {
                    renderer.finish_response();
                }
                renderer.print_error(&err.user_message());
            }
            SendOutcome::Cancelled => renderer.print_interrupted(),
        }
        *self = Self::default();
    }

    fn print_suffix(&mut self, text: &str, renderer: &mut dyn Renderer) {
        if let Some(rest) = text.strip_prefix(self.printed.as_str())
            && !rest.is_empty()
        {
            renderer.print_text(rest);
            self.printed.push_str(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
    }

    impl Renderer for Recording {
        fn start_typing(&mut self) {
            self.calls.push("typing".to_string());
        }

        fn stop_typing(&mut self) {
            self.calls.push("stop".to_string());
        }

        fn print_text(&mut self, text: &str) {
            self.calls.push(format!("text:{text}"));
        }

        fn print_message(&mut self, message: &Message) {
            self.calls.push(format!("message:{}", message.text()));
        }

        fn print_error(&mut self, error: &str) {
            self.calls.push(format!("error:{error}"));
        }

        fn print_info(&mut self, info: &str) {
            self.calls.push(format!("info:{info}"));
        }

        fn finish_response(&mut self) {
            self.calls.push("finish".to_string());
        }

        fn print_interrupted(&mut self) {
            self.calls.push("interrupted".to_string());
        }
    }

    fn flags(awaiting: bool, streaming: bool) -> ConversationEvent {
        ConversationEvent::FlagsChanged {
            is_sending: true,
            is_awaiting_first_token: awaiting,
            is_streaming: streaming,
            active_streaming_message_id: None,
        }
    }

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn streamed_reply_prints_suffixes() {
        let reply = Message::assistant("");
        let mut printer = ReplyPrinter::new();
        let mut out = Recording::default();
        for event in [
            ConversationEvent::MessageAppended(Message::user("Hello")),
            flags(true, false),
            ConversationEvent::MessageAppended(reply.clone()),
            flags(false, true),
            ConversationEvent::MessageUpdated(reply.with_text("Hi")),
            ConversationEvent::MessageUpdated(reply.with_text("Hi there")),
        ] {
            printer.apply(&event, &mut out);
        }
        printer.finish(&SendOutcome::Completed, &mut out);
        assert_eq!(
            out.calls,
            vec!["typing", "stop", "text:Hi", "text: there", "finish"]
        );
    }

    #[test]
    fn shrinking_text_is_reprinted_at_the_end() {
        let reply = Message::assistant("");
        let mut printer = ReplyPrinter::new();
        let mut out = Recording::default();
        for event in [
            flags(false, true),
            ConversationEvent::MessageUpdated(reply.with_text("A<|chan")),
            ConversationEvent::MessageUpdated(reply.with_text("A")),
            ConversationEvent::MessageUpdated(reply.with_text("A b")),
        ] {
            printer.apply(&event, &mut out);
        }
        printer.finish(&SendOutcome::Completed, &mut out);
        assert_eq!(
            out.calls,
            vec!["stop", "text:A<|chan", "text:\n", "text:A b", "finish"]
        );
    }

    #[test]
    fn settled_reply_prints_whole() {
        let mut printer = ReplyPrinter::new();
        let mut out = Recording::default();
        printer.apply(&flags(true, false), &mut out);
        printer.apply(
            &ConversationEvent::MessageAppended(Message::assistant("ok")),
            &mut out,
        );
        printer.finish(&SendOutcome::Completed, &mut out);
        assert_eq!(out.calls, vec!["typing", "text:ok", "finish"]);
    }

    #[test]
    fn failure_prints_error() {
        let mut printer = ReplyPrinter::new();
        let mut out = Recording::default();
        printer.apply(&flags(true, false), &mut out);
        let err = Error::server(404, "not found");
        printer.apply(
            &ConversationEvent::MessageAppended(Message::assistant(err.user_message())),
            &mut out,
        );
        printer.finish(&SendOutcome::Failed(err), &mut out);
        assert_eq!(
            out.calls,
            vec!["typing", "error:Error: Server error occurred (HTTP 404)"]
        );
    }

    #[test]
    fn cancellation_prints_interrupted() {
        let mut printer = ReplyPrinter::new();
        let mut out = Recording::default();
        printer.apply(&flags(true, false), &mut out);
        printer.finish(&SendOutcome::Cancelled, &mut out);
        assert_eq!(out.calls, vec!["typing", "interrupted"]);
    }
}
