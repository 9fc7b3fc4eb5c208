//! Interactive chat over a session store

use super::ask::{open_pipeline, render_answer};
use crate::output::OutputWriter;
use crate::progress::spinner_for;
use anyhow::Result;
use console::style;
use dcpr_core::config::LayeredConfig;
use dcpr_core::models::Role;
use dcpr_retrieval::{ConfiguredPipeline, SessionId, SessionStore};
use dialoguer::Input;
use tabled::Tabled;

const HELP: &str = "Commands: /new, /clear, /sessions, /switch <n>, /up, /down [comment], /quit";

/// A line typed at the prompt
#[derive(Debug, PartialEq)]
enum ChatInput<'a> {
    Question(&'a str),
    New,
    Clear,
    Sessions,
    Switch(usize),
    Feedback { positive: bool, comment: Option<&'a str> },
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Question(line);
    };

    let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
    let rest = rest.trim();

    match name {
        "new" => ChatInput::New,
        "clear" => ChatInput::Clear,
        "sessions" => ChatInput::Sessions,
        "switch" => rest.parse().map(ChatInput::Switch).unwrap_or(ChatInput::Unknown(line)),
        "up" => ChatInput::Feedback { positive: true, comment: None },
        "down" => ChatInput::Feedback {
            positive: false,
            comment: (!rest.is_empty()).then_some(rest),
        },
        "help" => ChatInput::Help,
        "quit" | "exit" => ChatInput::Quit,
        _ => ChatInput::Unknown(line),
    }
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "#")]
    number: usize,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Turns")]
    turns: usize,
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "")]
    current: &'static str,
}

pub async fn execute(config: &LayeredConfig, output: &OutputWriter, explain: bool) -> Result<()> {
    let pipeline = open_pipeline(config)?;
    let sessions = SessionStore::new();
    let mut current = sessions.create();

    output.text(format!(
        "{}\n{}",
        style("DCPR 2034 regulations assistant").bold(),
        style(HELP).dim()
    ));

    loop {
        let line: String = Input::new().with_prompt("You").allow_empty(true).interact_text()?;

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => output.info(HELP),
            ChatInput::Unknown(text) => {
                output.warning(format!("Unknown command '{}'. {}", text, HELP))
            }
            ChatInput::New => {
                current = sessions.create();
                output.success("Started a new session");
            }
            ChatInput::Clear => {
                sessions.clear(current)?;
                output.success("Session history cleared");
            }
            ChatInput::Sessions => show_sessions(&sessions, current, output),
            ChatInput::Switch(number) => match sessions.list().get(number.wrapping_sub(1)) {
                Some(summary) => {
                    current = summary.id;
                    output.success(format!("Switched to '{}'", summary.title));
                    show_transcript(&sessions, current, output)?;
                }
                None => output.warning(format!("No session #{}", number)),
            },
            ChatInput::Feedback { positive, comment } => {
                let last_turn = sessions.history(current)?.len().checked_sub(1);
                let recorded =
                    last_turn.map(|turn| sessions.record_feedback(current, turn, positive, comment));
                match recorded {
                    Some(Ok(())) => output.success("Thanks for the feedback"),
                    _ => output.warning("There is no answer to rate yet"),
                }
            }
            ChatInput::Question(question) => {
                ask(&sessions, current, question, &pipeline, output, explain).await
            }
        }
    }

    Ok(())
}

async fn ask(
    sessions: &SessionStore,
    id: SessionId,
    question: &str,
    pipeline: &ConfiguredPipeline,
    output: &OutputWriter,
    explain: bool,
) {
    let spinner = spinner_for(output.is_json(), "Thinking...");
    let result = sessions.ask(id, question, pipeline).await;
    spinner.finish_and_clear();

    let rendered = match result {
        Ok(result) => render_answer(output, question, &result, explain),
        Err(e) if e.is_transient() => {
            output.error(format!("{}. The question was not recorded; try again.", e));
            Ok(())
        }
        Err(e) => {
            output.error(e);
            Ok(())
        }
    };

    if let Err(e) = rendered {
        output.error(format!("Failed to print the answer: {}", e));
    }
}

/// Replay a session, listing the regulations each answer cited
fn show_transcript(sessions: &SessionStore, id: SessionId, output: &OutputWriter) -> Result<()> {
    for entry in sessions.transcript(id)? {
        let speaker = match entry.turn.role {
            Role::User => style("You").cyan().bold(),
            Role::Assistant => style("Assistant").green().bold(),
        };
        output.text(format!("{}: {}", speaker, entry.turn.content));

        for source in &entry.sources {
            output.text(style(format!(
                "    {} ({:.2})",
                source.regulation_id.as_deref().unwrap_or("unlabelled passage"),
                source.relevance
            ))
            .dim());
        }
    }

    Ok(())
}

fn show_sessions(sessions: &SessionStore, current: SessionId, output: &OutputWriter) {
    let rows: Vec<SessionRow> = sessions
        .list()
        .into_iter()
        .enumerate()
        .map(|(i, s)| SessionRow {
            number: i + 1,
            title: s.title,
            turns: s.turn_count,
            started: s.created_at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string(),
            current: if s.id == current { "*" } else { "" },
        })
        .collect();

    output.table(rows);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_and_commands() {
        assert_eq!(parse_input("  What is FSI?  "), ChatInput::Question("What is FSI?"));
        assert_eq!(parse_input("/new"), ChatInput::New);
        assert_eq!(parse_input("/clear"), ChatInput::Clear);
        assert_eq!(parse_input("/sessions"), ChatInput::Sessions);
        assert_eq!(parse_input("/exit"), ChatInput::Quit);
        assert_eq!(parse_input("   "), ChatInput::Empty);
    }

    #[test]
    fn test_switch_needs_number() {
        assert_eq!(parse_input("/switch 2"), ChatInput::Switch(2));
        assert_eq!(parse_input("/switch two"), ChatInput::Unknown("/switch two"));
    }

    #[test]
    fn test_feedback_comment() {
        assert_eq!(
            parse_input("/down wrong regulation cited"),
            ChatInput::Feedback { positive: false, comment: Some("wrong regulation cited") }
        );
        assert_eq!(parse_input("/up"), ChatInput::Feedback { positive: true, comment: None });
    }
}
