//! fopen-style open modes.
//!
//! A mode string such as `"r"`, `"w+"` or `"ab"` decides once, when the stream is created,
//! whether it may be read and written. The flags never change afterwards.

use std::fs::OpenOptions;
use std::str::FromStr;

use crate::protocol::StreamError;

/// Access flags of a stream resource, parsed from an fopen-style mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    kind: ModeKind,
    plus: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeKind {
    Read,
    Write,
    Append,
    CreateNew,
    Create,
}

impl OpenMode {
    /// Mode of an in-memory buffer: readable, writable and seekable.
    pub const READ_WRITE: OpenMode = OpenMode { kind: ModeKind::Write, plus: true };

    /// Read-only mode (`"r"`).
    pub const READ: OpenMode = OpenMode { kind: ModeKind::Read, plus: false };

    /// Write-only mode (`"w"`).
    pub const WRITE: OpenMode = OpenMode { kind: ModeKind::Write, plus: false };

    pub fn is_readable(&self) -> bool {
        self.plus || self.kind == ModeKind::Read
    }

    pub fn is_writable(&self) -> bool {
        self.plus || self.kind != ModeKind::Read
    }

    /// Translates the mode into the matching [`OpenOptions`].
    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.is_readable());
        match self.kind {
            ModeKind::Read => {
                options.write(self.plus);
            }
            ModeKind::Write => {
                options.write(true).create(true).truncate(true);
            }
            ModeKind::Append => {
                options.append(true).create(true);
            }
            ModeKind::CreateNew => {
                options.write(true).create_new(true);
            }
            ModeKind::Create => {
                options.write(true).create(true);
            }
        }
        options
    }

    /// The canonical mode string, without `b`/`t` flags.
    pub fn as_str(&self) -> &'static str {
        match (self.kind, self.plus) {
            (ModeKind::Read, false) => "r",
            (ModeKind::Read, true) => "r+",
            (ModeKind::Write, false) => "w",
            (ModeKind::Write, true) => "w+",
            (ModeKind::Append, false) => "a",
            (ModeKind::Append, true) => "a+",
            (ModeKind::CreateNew, false) => "x",
            (ModeKind::CreateNew, true) => "x+",
            (ModeKind::Create, false) => "c",
            (ModeKind::Create, true) => "c+",
        }
    }
}

impl FromStr for OpenMode {
    type Err = StreamError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        let mut chars = mode.chars();
        let kind = match chars.next() {
            Some('r') => ModeKind::Read,
            Some('w') => ModeKind::Write,
            Some('a') => ModeKind::Append,
            Some('x') => ModeKind::CreateNew,
            Some('c') => ModeKind::Create,
            _ => return Err(StreamError::invalid_mode(mode)),
        };

        let mut plus = false;
        for flag in chars {
            match flag {
                '+' if !plus => plus = true,
                'b' | 't' => {}
                _ => return Err(StreamError::invalid_mode(mode)),
            }
        }

        Ok(Self { kind, plus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flags() {
        let cases = [
            ("r", true, false),
            ("rb", true, false),
            ("r+", true, true),
            ("w", false, true),
            ("w+b", true, true),
            ("a", false, true),
            ("a+", true, true),
            ("x", false, true),
            ("c+", true, true),
        ];

        for (mode, readable, writable) in cases {
            let parsed: OpenMode = mode.parse().unwrap();
            assert_eq!(parsed.is_readable(), readable, "mode {mode}");
            assert_eq!(parsed.is_writable(), writable, "mode {mode}");
        }
    }

    #[test]
    fn canonical_string_drops_binary_flag() {
        let mode: OpenMode = "rb+".parse().unwrap();
        assert_eq!(mode.as_str(), "r+");
    }

    #[test]
    fn reject_unknown() {
        assert!(matches!("q".parse::<OpenMode>(), Err(StreamError::InvalidMode { .. })));
        assert!(matches!("".parse::<OpenMode>(), Err(StreamError::InvalidMode { .. })));
        assert!(matches!("r++".parse::<OpenMode>(), Err(StreamError::InvalidMode { .. })));
    }
}
