//! Console command parsing
//!
//! One command per line, first word is the verb:
//!
//! ```text
//! up <identity> <zip-path> <command...>    (aliases: subir, sub)
//! stop <identity>
//! remove <identity>
//! console <identity> [lines]
//! resume <identity>
//! status [identity]
//! help
//! quit
//! ```

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;
use unicloud_hosting::LaunchCommand;

pub const HELP: &str = "\
Commands:
  up <identity> <zip-path> <command...>   Host a new application (aliases: subir, sub)
  stop <identity>                         Stop a running application
  remove <identity>                       Delete a stopped application
  console <identity> [lines]              Show recent output
  resume <identity>                       Start a stopped application again
  status [identity]                       Show one or all applications
  help                                    Show this help
  quit                                    Stop the console";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Up {
        identity: String,
        archive: PathBuf,
        command: LaunchCommand,
    },
    Stop {
        identity: String,
    },
    Remove {
        identity: String,
    },
    Console {
        identity: String,
        lines: Option<usize>,
    },
    Resume {
        identity: String,
    },
    Status {
        identity: Option<String>,
    },
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let Some((verb, rest)) = next_word(line) else {
            return Ok(None);
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "up" | "subir" | "sub" => {
                let (identity, rest) = next_word(rest).ok_or_else(|| usage("up"))?;
                let (archive, rest) = next_word(rest).ok_or_else(|| usage("up"))?;
                if rest.trim().is_empty() {
                    return Err(usage("up"));
                }
                ConsoleCommand::Up {
                    identity: identity.to_string(),
                    archive: PathBuf::from(archive),
                    command: LaunchCommand::parse(rest)?,
                }
            }
            "stop" => ConsoleCommand::Stop {
                identity: single_identity(rest, "stop")?,
            },
            "remove" | "rm" => ConsoleCommand::Remove {
                identity: single_identity(rest, "remove")?,
            },
            "console" | "logs" => {
                let (identity, rest) = next_word(rest).ok_or_else(|| usage("console"))?;
                let lines = match next_word(rest) {
                    None => None,
                    Some((count, extra)) => {
                        if !extra.trim().is_empty() {
                            return Err(usage("console"));
                        }
                        let count: usize = count
                            .parse()
                            .map_err(|_| anyhow!("line count must be a positive number: {}", count))?;
                        if count == 0 {
                            bail!("line count must be a positive number: 0");
                        }
                        Some(count)
                    }
                };
                ConsoleCommand::Console {
                    identity: identity.to_string(),
                    lines,
                }
            }
            "resume" | "start" => ConsoleCommand::Resume {
                identity: single_identity(rest, "resume")?,
            },
            "status" | "list" | "ls" => ConsoleCommand::Status {
                identity: match next_word(rest) {
                    None => None,
                    Some((identity, extra)) if extra.trim().is_empty() => Some(identity.to_string()),
                    Some(_) => return Err(usage("status")),
                },
            },
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => bail!("unknown command `{}` (try `help`)", other),
        };
        Ok(Some(command))
    }
}

/// Split off the first whitespace-delimited word
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}

fn single_identity(rest: &str, verb: &str) -> Result<String> {
    match next_word(rest) {
        Some((identity, extra)) if extra.trim().is_empty() => Ok(identity.to_string()),
        _ => Err(usage(verb)),
    }
}

fn usage(verb: &str) -> anyhow::Error {
    let form = match verb {
        "up" => "up <identity> <zip-path> <command...>",
        "console" => "console <identity> [lines]",
        "status" => "status [identity]",
        "stop" => "stop <identity>",
        "remove" => "remove <identity>",
        "resume" => "resume <identity>",
        _ => verb,
    };
    anyhow!("usage: {}", form)
}
