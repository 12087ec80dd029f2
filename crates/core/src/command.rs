//! Endpoint-tagged command lines.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::scheme::{split_scheme, SchemeSplit};

/// Where a command line runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandScheme {
    /// The local shell.
    Local,
    /// The server being targeted. This is the default.
    Remote,
}

/// One shell command line, tagged with its endpoint scheme.
///
/// Spec command lines may carry a `local:` or `remote:` prefix; the prefix
/// is stripped here, once, at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Execution endpoint.
    pub scheme: CommandScheme,
    /// The shell command line with any scheme prefix removed.
    pub line: String,
}

impl Command {
    /// Parse a raw command line, resolving its optional scheme prefix.
    pub fn parse(raw: &str) -> Result<Command, Error> {
        match split_scheme(raw, &["local", "remote"]) {
            SchemeSplit::Known("local", rest) => Ok(Command {
                scheme: CommandScheme::Local,
                line: rest.to_string(),
            }),
            SchemeSplit::Known(_, rest) => Ok(Command {
                scheme: CommandScheme::Remote,
                line: rest.to_string(),
            }),
            SchemeSplit::Bare(line) => Ok(Command {
                scheme: CommandScheme::Remote,
                line: line.to_string(),
            }),
            SchemeSplit::Unknown(scheme) => Err(Error::UnknownScheme {
                scheme: scheme.to_string(),
                input: raw.to_string(),
            }),
        }
    }

    /// Parse a list of raw command lines.
    pub fn parse_all(raw: &[String]) -> Result<Vec<Command>, Error> {
        raw.iter().map(|line| Command::parse(line)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scheme_is_remote() {
        let command = Command::parse("nvidia-smi").unwrap();
        assert_eq!(command.scheme, CommandScheme::Remote);
        assert_eq!(command.line, "nvidia-smi");
    }

    #[test]
    fn test_local_prefix() {
        let command = Command::parse("local:scp data.tar $NOODLES_SERVER_AUTHORITY:~").unwrap();
        assert_eq!(command.scheme, CommandScheme::Local);
        assert_eq!(command.line, "scp data.tar $NOODLES_SERVER_AUTHORITY:~");
    }

    #[test]
    fn test_remote_prefix() {
        let command = Command::parse("remote:ls").unwrap();
        assert_eq!(command.scheme, CommandScheme::Remote);
        assert_eq!(command.line, "ls");
    }

    #[test]
    fn test_unknown_scheme_is_rejected() {
        assert!(matches!(
            Command::parse("ftp:ls"),
            Err(Error::UnknownScheme { .. })
        ));
    }

    #[test]
    fn test_colon_inside_command_is_kept() {
        let command = Command::parse("echo a:b").unwrap();
        assert_eq!(command.line, "echo a:b");
    }
}
