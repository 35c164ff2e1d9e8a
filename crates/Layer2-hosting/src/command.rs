//! Launch commands - structured `{program, args}` pairs

use std::fmt;
use std::str::FromStr;
use unicloud_foundation::{Error, Result};

/// Program plus ordered arguments used to start a hosted application.
///
/// Parsed with POSIX shell-like word splitting: `node app.js --port 80`
/// splits on whitespace, and quoted arguments (`python3 "my bot.py"`) stay
/// whole. No variable expansion, globbing or pipes happen; the program is
/// executed directly. An unquoted word starting with `#` is rejected rather
/// than read as a comment; quote it (`'#main'`) to pass it through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchCommand {
    program: String,
    args: Vec<String>,
}

impl LaunchCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(Error::InvalidCommand("program must not be empty".to_string()));
        }
        Ok(Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Split a command line into program and arguments
    pub fn parse(line: &str) -> Result<Self> {
        if starts_comment(line) {
            return Err(Error::InvalidCommand(format!(
                "unquoted `#` in `{}`; quote the word to keep it",
                line
            )));
        }
        let mut words = shlex::split(line)
            .ok_or_else(|| Error::InvalidCommand(format!("unbalanced quotes in `{}`", line)))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| Error::InvalidCommand("command is empty".to_string()))?;
        Self::new(program, words)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Whether `line` has an unquoted word beginning with `#`, which shell
/// splitting would drop along with the rest of the line
fn starts_comment(line: &str) -> bool {
    let mut at_word_start = true;
    let mut escaped = false;
    let mut in_single = false;
    let mut in_double = false;

    for c in line.chars() {
        if escaped {
            escaped = false;
            at_word_start = false;
            continue;
        }
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            match c {
                '"' => in_double = false,
                '\\' => escaped = true,
                _ => {}
            }
            continue;
        }
        match c {
            '#' if at_word_start => return true,
            '\\' => escaped = true,
            '\'' => in_single = true,
            '"' => in_double = true,
            c if c.is_whitespace() => {
                at_word_start = true;
                continue;
            }
            _ => {}
        }
        at_word_start = false;
    }
    false
}

impl FromStr for LaunchCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(&self.program).chain(self.args.iter());
        for (i, word) in words.enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match shlex::try_quote(word) {
                // keep a leading `#` from reading back as a comment
                Ok(quoted) if quoted.starts_with('#') => write!(f, "'{}'", quoted)?,
                Ok(quoted) => f.write_str(&quoted)?,
                // only interior NUL bytes fail to quote
                Err(_) => f.write_str(word)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_split() {
        let cmd = LaunchCommand::parse("node app.js").unwrap();
        assert_eq!(cmd.program(), "node");
        assert_eq!(cmd.args(), ["app.js"]);
        assert_eq!(cmd.to_string(), "node app.js");
    }

    #[test]
    fn test_repeated_whitespace_collapses() {
        let cmd = LaunchCommand::parse("  python3   -u  bot.py ").unwrap();
        assert_eq!(cmd.program(), "python3");
        assert_eq!(cmd.args(), ["-u", "bot.py"]);
        assert_eq!(cmd.to_string(), "python3 -u bot.py");
    }

    #[test]
    fn test_quoted_argument_kept_whole() {
        let cmd = LaunchCommand::parse(r#"python3 "my bot.py" --name 'Uni Cloud'"#).unwrap();
        assert_eq!(cmd.args(), ["my bot.py", "--name", "Uni Cloud"]);

        let reparsed = LaunchCommand::parse(&cmd.to_string()).unwrap();
        assert_eq!(reparsed, cmd);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            LaunchCommand::parse("   "),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            LaunchCommand::new("", Vec::<String>::new()),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_unbalanced_quotes_rejected() {
        assert!(matches!(
            LaunchCommand::parse("node 'app.js"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_hash_word_rejected() {
        assert!(matches!(
            LaunchCommand::parse("node bot.js #main"),
            Err(Error::InvalidCommand(_))
        ));
        assert!(matches!(
            LaunchCommand::parse("#node bot.js"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_hash_inside_word_or_quotes_kept() {
        let cmd = LaunchCommand::parse("node bot.js '#main' \"#x\" a#b \\#c").unwrap();
        assert_eq!(cmd.args(), ["bot.js", "#main", "#x", "a#b", "#c"]);

        let reparsed = LaunchCommand::parse(&cmd.to_string()).unwrap();
        assert_eq!(reparsed, cmd);
    }

    #[test]
    fn test_from_parts() {
        let cmd = LaunchCommand::new("sh", ["-c", "echo hello"]).unwrap();
        assert!(cmd.to_string().starts_with("sh -c "));
        assert_eq!(cmd.to_string().parse::<LaunchCommand>().unwrap(), cmd);
        assert_eq!("sh -c 'echo hello'".parse::<LaunchCommand>().unwrap(), cmd);
    }
}
