//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::ConversationState;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// A line typed at the chat prompt.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Exit,
    Clear,
    Info,
    Help,
    Memory(bool),
    Question(&'a str),
    Empty,
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => ChatInput::Empty,
            "exit" | "quit" => ChatInput::Exit,
            "clear" => ChatInput::Clear,
            "info" => ChatInput::Info,
            "help" => ChatInput::Help,
            "memory on" => ChatInput::Memory(true),
            "memory off" => ChatInput::Memory(false),
            _ => ChatInput::Question(line),
        }
    }
}

/// Run the interactive chat command.
pub async fn run_chat(memory: bool, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut memory_enabled = memory || settings.memory.enabled;
    let mut history = ConversationState::new(settings.memory.max_turns);
    let orchestrator = Orchestrator::new(settings)?;

    println!("\n{}", style("docrag chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask questions about your documents, or type 'help' for commands.").dim()
    );
    Output::kv("Memory", if memory_enabled { "on" } else { "off" });

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        match ChatInput::parse(&input) {
            ChatInput::Empty => continue,
            ChatInput::Exit => {
                Output::info("Goodbye!");
                break;
            }
            ChatInput::Clear => {
                history.clear();
                Output::info("Conversation history cleared.");
            }
            ChatInput::Info => match orchestrator.database_info().await {
                Ok(info) => Output::database_info(&info),
                Err(e) => Output::error(&format!("Failed to read database info: {}", e)),
            },
            ChatInput::Help => print_help(),
            ChatInput::Memory(enable) => {
                memory_enabled = enable;
                if !enable {
                    history.clear();
                }
                Output::info(&format!("Memory {}.", if enable { "enabled" } else { "disabled" }));
            }
            ChatInput::Question(question) => {
                let spinner = Output::spinner("Thinking...");
                let result = if memory_enabled {
                    orchestrator.ask_with_history(question, &mut history, None).await
                } else {
                    orchestrator.ask(question, false, None).await
                };
                spinner.finish_and_clear();

                match result {
                    Ok(result) => Output::answer(&result),
                    Err(e) => Output::error(&format!("Error: {}", e)),
                }
                println!();
            }
        }
    }

    Ok(())
}

fn print_help() {
    Output::header("Commands");
    Output::kv("exit", "leave the chat");
    Output::kv("clear", "forget the conversation so far");
    Output::kv("info", "show database information");
    Output::kv("memory on|off", "toggle conversation memory");
    Output::kv("help", "show this list");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_input() {
        assert_eq!(ChatInput::parse("  EXIT \n"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("quit"), ChatInput::Exit);
        assert_eq!(ChatInput::parse("memory on"), ChatInput::Memory(true));
        assert_eq!(ChatInput::parse("Memory Off"), ChatInput::Memory(false));
        assert_eq!(ChatInput::parse("\n"), ChatInput::Empty);
        assert_eq!(
            ChatInput::parse("What is the visa policy?\n"),
            ChatInput::Question("What is the visa policy?")
        );
    }
}
