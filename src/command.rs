//! Command line of the program being measured

use std::ffi::{OsStr, OsString};
use std::fmt;

use crate::error::RunError;

/// Program path plus arguments, in order
///
/// Always holds at least the program name. Tokens are kept as `OsString` so
/// arguments that are not valid UTF-8 reach the child unchanged. The joined
/// form (single spaces) is what Windows process creation receives; the
/// `Command:` line shows it lossily decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<OsString>,
}

impl CommandLine {
    /// Build a command line from already-tokenized arguments
    ///
    /// # Example
    /// ```
    /// use proctime::command::CommandLine;
    ///
    /// let cmd = CommandLine::new(["echo", "hello", "world"]).unwrap();
    /// assert_eq!(cmd.program(), "echo");
    /// assert_eq!(cmd.to_string(), "echo hello world");
    /// assert!(CommandLine::new(Vec::<String>::new()).is_err());
    /// ```
    pub fn new<I, S>(tokens: I) -> Result<Self, RunError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let tokens: Vec<OsString> = tokens.into_iter().map(Into::into).collect();
        if tokens.is_empty() {
            return Err(RunError::NoProgramName);
        }
        Ok(Self { tokens })
    }

    pub fn program(&self) -> &OsStr {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[OsString] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[OsString] {
        &self.tokens
    }

    /// Tokens joined with single spaces, bytes untouched
    pub fn joined(&self) -> OsString {
        let mut line = OsString::new();
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                line.push(" ");
            }
            line.push(token);
        }
        line
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined().to_string_lossy())
    }
}
