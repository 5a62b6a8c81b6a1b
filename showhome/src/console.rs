//! Line-oriented control console
//!
//! Reads one command per line and runs it against the open sessions. Labels
//! containing spaces can be written in double quotes.
//!
//! ```text
//! preset "Front Wash" Warm      apply a preset to a group by label
//! preset# 4 2.5                 apply a preset to a group by number
//! route on Vocal Main           switch a channel's send to a bus by label
//! route# off 3 7                switch a channel's send to a bus by number
//! cmd Chan 1 At Full#           send a raw Eos command line
//! sync                          forget every label and rediscover
//! list groups                   show the labels known in a category
//! status                        show discovery progress
//! quit
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use show_protocol::{Category, DeviceCommand, DeviceId, Family, LabelCommand};
use show_sync::Session;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "commands: preset <group> <preset> | preset# <group> <preset> | \
route on|off <channel> <bus> | route# on|off <channel> <bus> | cmd <text> | \
sync | list <category> | status | quit";

/// A parsed control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Label-addressed command
    Label(LabelCommand),
    /// Id-addressed command
    Number(DeviceCommand),
    /// Raw Eos command line
    CommandLine(String),
    /// Clear the caches and rediscover
    Sync,
    /// Print the labels of one category
    List(Category),
    /// Print discovery progress for every session
    Status,
    Help,
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// First word is not a command
    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    /// Wrong arguments for a known command
    #[error("usage: {0}")]
    Usage(&'static str),

    /// A quoted label was never closed
    #[error("unterminated quote")]
    UnterminatedQuote,

    /// `list` named something that is not a category
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
}

/// Split a line into words, honouring double quotes
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn switch(word: &str) -> Option<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Control>, ParseError> {
    let words = tokenize(line)?;
    let Some((command, args)) = words.split_first() else {
        return Ok(None);
    };

    let control = match (command.to_ascii_lowercase().as_str(), args) {
        ("preset", [group, preset]) => Control::Label(LabelCommand::ApplyPreset {
            group: group.clone(),
            preset: preset.clone(),
        }),
        ("preset", _) => return Err(ParseError::Usage("preset <group> <preset>")),
        ("preset#", [group, preset]) => Control::Number(DeviceCommand::ApplyPreset {
            group: DeviceId::new(group.as_str()),
            preset: DeviceId::new(preset.as_str()),
        }),
        ("preset#", _) => return Err(ParseError::Usage("preset# <group> <preset>")),
        ("route", [state, source, destination]) => {
            let enabled = switch(state).ok_or(ParseError::Usage("route on|off <channel> <bus>"))?;
            Control::Label(LabelCommand::Route {
                source: source.clone(),
                destination: destination.clone(),
                enabled,
            })
        }
        ("route", _) => return Err(ParseError::Usage("route on|off <channel> <bus>")),
        ("route#", [state, channel, bus]) => {
            let enabled =
                switch(state).ok_or(ParseError::Usage("route# on|off <channel> <bus>"))?;
            Control::Number(DeviceCommand::Route {
                channel: DeviceId::new(channel.as_str()),
                bus: DeviceId::new(bus.as_str()),
                enabled,
            })
        }
        ("route#", _) => return Err(ParseError::Usage("route# on|off <channel> <bus>")),
        ("cmd", [_, ..]) => Control::CommandLine(args.join(" ")),
        ("cmd", []) => return Err(ParseError::Usage("cmd <text>")),
        ("sync", []) => Control::Sync,
        ("list", [category]) => Control::List(
            category
                .parse()
                .map_err(|_| ParseError::UnknownCategory(category.clone()))?,
        ),
        ("list", _) => return Err(ParseError::Usage("list <category>")),
        ("status", []) => Control::Status,
        ("help" | "?", _) => Control::Help,
        ("quit" | "exit", _) => Control::Quit,
        _ => return Err(ParseError::UnknownCommand(command.clone())),
    };
    Ok(Some(control))
}

fn session_for(sessions: &[Arc<Session>], family: Family) -> Result<&Session> {
    sessions
        .iter()
        .find(|s| s.family() == family)
        .map(Arc::as_ref)
        .ok_or_else(|| anyhow!("no {} console configured", family))
}

fn family_for(command: &DeviceCommand) -> Family {
    match command {
        DeviceCommand::Route { .. } => Family::X32,
        DeviceCommand::ApplyPreset { .. } | DeviceCommand::CommandLine(_) => Family::Eos,
    }
}

/// Run one command and describe the outcome
pub fn execute(sessions: &[Arc<Session>], control: &Control) -> Result<String> {
    match control {
        Control::Label(command) => {
            let family = match command {
                LabelCommand::ApplyPreset { .. } => Family::Eos,
                LabelCommand::Route { .. } => Family::X32,
            };
            let sent = session_for(sessions, family)?.set_by_label(command)?;
            Ok(format!("sent {}", sent))
        }
        Control::Number(command) => {
            session_for(sessions, family_for(command))?.set_by_number(command)?;
            Ok(format!("sent {}", command))
        }
        Control::CommandLine(line) => {
            session_for(sessions, Family::Eos)?.send_command_line(line)?;
            Ok(format!("sent {:?}", line))
        }
        Control::Sync => {
            for session in sessions {
                session.resync();
            }
            Ok("resynchronizing".to_string())
        }
        Control::List(category) => {
            let session = sessions
                .iter()
                .find(|s| s.categories().contains(category))
                .ok_or_else(|| anyhow!("no console has {}", category.plural()))?;
            let snapshot = session.snapshot(*category);
            if snapshot.is_empty() {
                return Ok(format!("no {} known", category.plural()));
            }
            let mut out = String::new();
            for (label, id) in &snapshot {
                let _ = writeln!(out, "{:>6}  {}", id, label);
            }
            Ok(out.trim_end().to_string())
        }
        Control::Status => {
            let mut out = String::new();
            for session in sessions {
                let _ = write!(out, "{}:", session.family());
                for &category in session.categories() {
                    let _ = write!(
                        out,
                        " {} {} ({} known);",
                        category.plural(),
                        session.discovery_progress(category),
                        session.cache().len(category)
                    );
                }
                out.push('\n');
            }
            Ok(out.trim_end().to_string())
        }
        Control::Help => Ok(HELP.to_string()),
        Control::Quit => Ok(String::new()),
    }
}

/// Read commands from `input` until it closes or `quit` is entered
pub async fn run<R, W>(sessions: &[Arc<Session>], input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse(&line) {
            Ok(None) => continue,
            Ok(Some(Control::Quit)) => break,
            Ok(Some(control)) => match execute(sessions, &control) {
                Ok(text) => text,
                Err(e) => format!("error: {:#}", e),
            },
            Err(e) => format!("error: {}", e),
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use show_protocol::{eos::EosGrammar, x32::X32Grammar, Packet};
    use show_sync::RecordingTransport;

    use super::*;

    fn sessions() -> (Vec<Arc<Session>>, Arc<RecordingTransport>, Arc<RecordingTransport>) {
        let eos_transport = Arc::new(RecordingTransport::new());
        let x32_transport = Arc::new(RecordingTransport::new());
        let eos = Session::new(Arc::new(EosGrammar::new()), eos_transport.clone()).unwrap();
        let x32 = Session::new(Arc::new(X32Grammar::new()), x32_transport.clone()).unwrap();
        (vec![Arc::new(eos), Arc::new(x32)], eos_transport, x32_transport)
    }

    #[test]
    fn test_parse_quoted_labels() {
        assert_eq!(
            parse(r#"preset "Front Wash" Warm"#).unwrap(),
            Some(Control::Label(LabelCommand::ApplyPreset {
                group: "Front Wash".into(),
                preset: "Warm".into(),
            }))
        );
    }

    #[test]
    fn test_parse_route() {
        assert_eq!(
            parse("route off Vocal Main").unwrap(),
            Some(Control::Label(LabelCommand::Route {
                source: "Vocal".into(),
                destination: "Main".into(),
                enabled: false,
            }))
        );
        assert_eq!(
            parse("route maybe Vocal Main"),
            Err(ParseError::Usage("route on|off <channel> <bus>"))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("preset a"), Err(ParseError::Usage("preset <group> <preset>")));
        assert_eq!(parse(r#"preset "a b"#), Err(ParseError::UnterminatedQuote));
        assert_eq!(
            parse("list cues"),
            Err(ParseError::UnknownCategory("cues".into()))
        );
        assert!(matches!(parse("fire"), Err(ParseError::UnknownCommand(_))));
    }

    #[test]
    fn test_parse_command_line_keeps_words() {
        assert_eq!(
            parse("cmd Chan 1 At Full#").unwrap(),
            Some(Control::CommandLine("Chan 1 At Full#".into()))
        );
    }

    #[test]
    fn test_execute_routes_to_matching_family() {
        let (sessions, eos, x32) = sessions();
        sessions[1].handle_packet(&Packet::new("/ch/03/config/name").with_arg("Vocal"));
        sessions[1].handle_packet(&Packet::new("/bus/07/config/name").with_arg("Main"));

        let control = parse("route on vocal main").unwrap().unwrap();
        let reply = execute(&sessions, &control).unwrap();

        assert_eq!(reply, "sent channel 03 -> bus 07 on");
        assert_eq!(x32.take()[0].address, "/ch/03/mix/07/on");
        assert!(eos.sent().is_empty());
    }

    #[test]
    fn test_execute_unknown_label_is_error() {
        let (sessions, eos, _x32) = sessions();
        let control = parse("preset Ghost Warm").unwrap().unwrap();
        let err = execute(&sessions, &control).unwrap_err();
        assert_eq!(err.to_string(), "no group called 'Ghost'");
        assert!(eos.sent().is_empty());
    }

    #[test]
    fn test_execute_missing_family() {
        let (mut sessions, _eos, _x32) = sessions();
        sessions.truncate(1);
        let control = parse("route# on 1 2").unwrap().unwrap();
        assert!(execute(&sessions, &control)
            .unwrap_err()
            .to_string()
            .contains("no Behringer X32 console"));
    }

    #[test]
    fn test_list_and_status() {
        let (sessions, _eos, _x32) = sessions();
        sessions[0].handle_packet(
            &Packet::new("/eos/out/get/group/4/list/0/1")
                .with_arg(0)
                .with_arg("uid")
                .with_arg("Front"),
        );

        let list = execute(&sessions, &Control::List(Category::Group)).unwrap();
        assert_eq!(list, "     4  FRONT");
        let none = execute(&sessions, &Control::List(Category::Bus)).unwrap();
        assert_eq!(none, "no buses known");

        let status = execute(&sessions, &Control::Status).unwrap();
        assert!(status.starts_with("ETC Eos: groups idle (1 known);"));
    }

    #[tokio::test]
    async fn test_run_until_quit() {
        let (sessions, eos, _x32) = sessions();
        let input: &[u8] = b"preset# 4 2\nbogus\nquit\nsync\n";
        let mut output = Vec::new();

        run(&sessions, input, &mut output).await.unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sent group 4 preset 2");
        assert!(lines[1].starts_with("error: unknown command 'bogus'"));
        assert_eq!(lines.len(), 2);
        assert_eq!(eos.take().len(), 1);
    }

    proptest! {
        #[test]
        fn quoted_words_survive_tokenizing(words in prop::collection::vec("[A-Za-z0-9]{1,5}( [A-Za-z0-9]{1,5})?", 1..5)) {
            let line = words
                .iter()
                .map(|w| format!("\"{}\"", w))
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(tokenize(&line).unwrap(), words);
        }
    }
}
