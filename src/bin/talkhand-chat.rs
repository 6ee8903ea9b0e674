//! Interactive chat with a self-hosted, OpenAI-compatible model server.
//!
//! # Usage
//!
//! ```bash
//! # Use the stored settings
//! talkhand-chat
//!
//! # Point at a server and pick a model (both are remembered)
//! talkhand-chat --server http://localhost:1337 --model jan-nano
//!
//! # Wait for whole replies and log every exchange to stderr
//! talkhand-chat --no-stream --verbose
//! ```
//!
//! The API key is read from the settings file or the `TALKHAND_API_KEY` environment variable.
//!
//! # Commands
//!
//! - `/help` - Show available commands
//! - `/clear` - Clear the conversation
//! - `/history` - Show the conversation
//! - `/model <name>` - Change the model
//! - `/server <url>` - Change the server
//! - `/stream on|off` - Toggle streaming
//! - `/models` - List the server's models
//! - `/config` - Show the current configuration
//! - `/quit` - Exit the application

use std::sync::{Arc, Mutex, PoisonError};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc::UnboundedReceiver;

use talkhand::chat::{
    ChatArgs, ChatCommand, ChatConfig, PlainTextRenderer, Renderer, ReplyPrinter, help_text,
    parse_command,
};
use talkhand::{
    CHAT_COMPLETIONS_PATH, CancelHandle, ChatCompletionRequest, ChatCompletionResponse, Client, ClientLogger,
    Conversation, ConversationEvent, JsonFileStore, Settings, SettingsFile, SettingsStore,
    StreamDelta, endpoint,
};

/// Logs every exchange to stderr.
struct StderrLogger;

impl ClientLogger for StderrLogger {
    fn log_request(&self, request: &ChatCompletionRequest) {
        eprintln!(
            "[request] model={} stream={} messages={}",
            request.model,
            request.stream,
            request.messages.len()
        );
    }

    fn log_response(&self, response: &ChatCompletionResponse) {
        eprintln!(
            "[response] choices={} content={:?}",
            response.choices.len(),
            response.first_content()
        );
    }

    fn log_stream_delta(&self, delta: &StreamDelta) {
        if delta.is_terminal {
            eprintln!("[stream] [DONE]");
        } else if let Some(content) = &delta.content {
            eprintln!("[stream] {content:?}");
        }
    }

    fn log_stream_text(&self, text: &str) {
        eprintln!("[stream] settled {} chars", text.chars().count());
    }
}

/// Main entry point for the talkhand-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("talkhand-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let settings = Arc::new(SettingsFile::open(&config.settings_path)?);
    if config.has_overrides() {
        settings.set(config.apply(settings.get()))?;
    }

    let mut client = Client::new()?;
    if config.verbose {
        client = client.with_logger(Arc::new(StderrLogger));
    }
    let store = Arc::new(JsonFileStore::new(&config.history_path));
    let mut conversation = Conversation::new(Arc::new(client.clone()), settings.clone(), store);
    if let Err(err) = conversation.load_history().await {
        renderer.print_error(&format!("Failed to load history: {err}"));
    }
    let mut events = conversation.subscribe();

    // Ctrl+C stops whichever request is in flight: a reply or a model listing.
    let canceller = conversation.canceller();
    let listing = Arc::new(Mutex::new(CancelHandle::new()));
    let listing_for_handler = listing.clone();
    ctrlc::set_handler(move || {
        canceller.cancel();
        listing_for_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    })?;

    let mut rl = DefaultEditor::new()?;

    let current = settings.get();
    println!("talkhand chat (model: {})", current.model_name);
    if current.server_url.is_empty() {
        println!("No server configured. Use /server <url> to set one.");
    } else {
        println!("Server: {}", current.server_url);
    }
    println!(
        "{} earlier messages. Type /help for commands, /quit to exit\n",
        conversation.messages().len()
    );

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            conversation.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::History => {
                            if conversation.messages().is_empty() {
                                renderer.print_info("No messages yet.");
                            }
                            for message in conversation.messages() {
                                renderer.print_message(message);
                            }
                        }
                        ChatCommand::Model(model) => {
                            update_settings(settings.as_ref(), &mut renderer, |s| {
                                s.model_name = model.clone();
                            });
                            renderer.print_info(&format!("Model changed to: {model}"));
                        }
                        ChatCommand::Server(url) => {
                            if let Err(err) = endpoint(&url, CHAT_COMPLETIONS_PATH) {
                                renderer.print_error(&err.user_message());
                            } else {
                                update_settings(settings.as_ref(), &mut renderer, |s| {
                                    s.server_url = url.clone();
                                });
                                renderer.print_info(&format!("Server changed to: {url}"));
                            }
                        }
                        ChatCommand::Stream(on) => {
                            update_settings(settings.as_ref(), &mut renderer, |s| {
                                s.streaming = on;
                            });
                            renderer.print_info(if on {
                                "Streaming enabled."
                            } else {
                                "Streaming disabled."
                            });
                        }
                        ChatCommand::Models => {
                            let current = settings.get();
                            let cancel = CancelHandle::new();
                            *listing.lock().unwrap_or_else(PoisonError::into_inner) =
                                cancel.clone();
                            match client
                                .list_models_or_cancel(
                                    &current.server_url,
                                    &current.api_key,
                                    &cancel,
                                )
                                .await
                            {
                                Ok(None) => renderer.print_interrupted(),
                                Ok(Some(models)) if models.is_empty() => {
                                    renderer.print_info("The server offers no models.")
                                }
                                Ok(Some(models)) => {
                                    println!("    Available models:");
                                    for model in models {
                                        let marker = if model == current.model_name {
                                            "*"
                                        } else {
                                            "-"
                                        };
                                        println!("      {marker} {model}");
                                    }
                                }
                                Err(err) => renderer.print_error(&err.user_message()),
                            }
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&settings.get(), &config);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    drain(&mut events);
                    continue;
                }

                let mut printer = ReplyPrinter::new();
                let outcome = {
                    let send = conversation.send(line);
                    tokio::pin!(send);
                    loop {
                        tokio::select! {
                            outcome = &mut send => break outcome,
                            Some(event) = events.recv() => printer.apply(&event, &mut renderer),
                        }
                    }
                };
                while let Ok(event) = events.try_recv() {
                    printer.apply(&event, &mut renderer);
                }
                match outcome {
                    Ok(outcome) => printer.finish(&outcome, &mut renderer),
                    Err(err) => renderer.print_error(&format!("Failed to save history: {err}")),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn update_settings(
    settings: &dyn SettingsStore,
    renderer: &mut dyn Renderer,
    change: impl FnOnce(&mut Settings),
) {
    let mut updated = settings.get();
    change(&mut updated);
    if let Err(err) = settings.set(updated) {
        renderer.print_error(&format!("Failed to save settings: {err}"));
    }
}

fn drain(events: &mut UnboundedReceiver<ConversationEvent>) {
    while events.try_recv().is_ok() {}
}

fn print_config(settings: &Settings, config: &ChatConfig) {
    println!("    Current Configuration:");
    if settings.server_url.is_empty() {
        println!("      Server: (not set)");
    } else {
        println!("      Server: {}", settings.server_url);
    }
    println!("      Model: {}", settings.model_name);
    println!(
        "      Streaming: {}",
        if settings.streaming { "on" } else { "off" }
    );
    println!(
        "      API key: {}",
        if settings.api_key.is_empty() {
            "(not set)"
        } else {
            "(set)"
        }
    );
    println!("      Settings file: {}", config.settings_path.display());
    println!("      History file: {}", config.history_path.display());
}
