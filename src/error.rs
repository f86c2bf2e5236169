//! Error types for every keyconf operation.
//!
//! All fallible calls return [`KeyconfError`]. Variants carry enough context
//! (paths, group/key names, the offending text, 1-based line numbers) to
//! print a useful diagnostic without the caller re-reading anything.
//!
//! Two queries classify an error without matching on variants:
//!
//! - [`KeyconfError::kind`]: the coarse [`ErrorKind`] (`NotFound`,
//!   `Malformed`, `Overflow`, `Permission`, `Io`, `Usage`).
//! - [`KeyconfError::location`]: where a parse failure happened, if it was
//!   one.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeyconfError>;

/// Coarse classification of a [`KeyconfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing file, group, or key.
    NotFound,
    /// Syntax violation or a value that cannot be read as the requested type.
    Malformed,
    /// Numeric value outside the range of the requested type.
    Overflow,
    /// Ownership, mode, or symlink policy violation.
    Permission,
    /// Read or write failure.
    Io,
    /// Invalid input from the caller, rejected before any I/O.
    Usage,
}

impl ErrorKind {
    /// Stable, human-readable name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Permission => "permission denied",
            ErrorKind::Io => "i/o failure",
            ErrorKind::Usage => "usage error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line was rejected by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseReason {
    /// `[section` with no closing bracket.
    MissingBracket,
    /// A content line without the key/value delimiter.
    MissingDelimiter,
    /// `[]`.
    EmptySectionName,
    /// Non-comment text after the closing `]` of a section header.
    TextAfterSection,
    /// Nothing before the delimiter.
    EmptyKey,
    /// Nothing after the delimiter.
    KeyHasNullValue,
    /// A `"` that is never closed.
    UnterminatedQuote,
    /// Non-comment text after the closing quote of a value.
    TextAfterValue,
}

impl ParseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseReason::MissingBracket => "missing closing ']'",
            ParseReason::MissingDelimiter => "missing delimiter",
            ParseReason::EmptySectionName => "empty section name",
            ParseReason::TextAfterSection => "text after section header",
            ParseReason::EmptyKey => "empty key",
            ParseReason::KeyHasNullValue => "key has no value",
            ParseReason::UnterminatedQuote => "unterminated quoted value",
            ParseReason::TextAfterValue => "text after quoted value",
        }
    }
}

impl fmt::Display for ParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source position of a parse failure.
///
/// `path` is `None` when the input came from an in-memory buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLocation {
    pub path: Option<PathBuf>,
    pub line: usize,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (line {})", path.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum KeyconfError {
    #[error("Parse error in {location}: {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::parse)))]
    Parse {
        location: ErrorLocation,
        reason: ParseReason,
    },

    #[error("No such file: {}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::no_file)))]
    NoFile { path: PathBuf },

    #[error("No such group: '{0}'")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::no_group)))]
    NoGroup(String),

    #[error("Key '{key}' not found in {}", group_label(group))]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::no_key)))]
    NoKey { group: String, key: String },

    #[error("Wrong boolean value '{value}' for key '{key}' in {}", group_label(group))]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(keyconf::wrong_boolean),
            help("use one of true/false, yes/no, on/off, 1/0")
        )
    )]
    WrongBooleanValue {
        group: String,
        key: String,
        value: String,
    },

    #[error("Value '{value}' for key '{key}' in {} is not a valid {target}", group_label(group))]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::invalid_number)))]
    InvalidNumber {
        group: String,
        key: String,
        value: String,
        target: &'static str,
    },

    #[error("Value '{value}' for key '{key}' in {} does not fit in {target}", group_label(group))]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::overflow)))]
    Overflow {
        group: String,
        key: String,
        value: String,
        target: &'static str,
    },

    #[error("{} is owned by uid {uid}, which is not allowed", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::wrong_owner)))]
    WrongOwner { path: PathBuf, uid: u32 },

    #[error("{} belongs to gid {gid}, which is not allowed", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::wrong_group)))]
    WrongGroup { path: PathBuf, gid: u32 },

    #[error("{} has forbidden permission bits (mode {mode:o})", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::wrong_file_permission)))]
    WrongFilePermission { path: PathBuf, mode: u32 },

    #[error("Directory {} has forbidden permission bits (mode {mode:o})", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::wrong_dir_permission)))]
    WrongDirPermission { path: PathBuf, mode: u32 },

    #[error("{} is a symbolic link and symlinks are not followed", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::symlink)))]
    FileIsSymLink { path: PathBuf },

    #[error("{} is not valid UTF-8", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::encoding)))]
    InvalidEncoding { path: PathBuf },

    #[error("Invalid {what} '{name}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::invalid_name)))]
    InvalidName {
        what: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("Failed to read {}: {source}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::io)))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(keyconf::write)))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl KeyconfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyconfError::NoFile { .. }
            | KeyconfError::NoGroup(_)
            | KeyconfError::NoKey { .. } => ErrorKind::NotFound,
            KeyconfError::Parse { .. }
            | KeyconfError::WrongBooleanValue { .. }
            | KeyconfError::InvalidNumber { .. } => ErrorKind::Malformed,
            KeyconfError::Overflow { .. } => ErrorKind::Overflow,
            KeyconfError::WrongOwner { .. }
            | KeyconfError::WrongGroup { .. }
            | KeyconfError::WrongFilePermission { .. }
            | KeyconfError::WrongDirPermission { .. }
            | KeyconfError::FileIsSymLink { .. } => ErrorKind::Permission,
            KeyconfError::IoError { .. } | KeyconfError::WriteError { .. } => ErrorKind::Io,
            KeyconfError::InvalidEncoding { .. } | KeyconfError::InvalidName { .. } => {
                ErrorKind::Usage
            }
        }
    }

    /// Where a parse error happened. `None` for every other variant.
    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            KeyconfError::Parse { location, .. } => Some(location),
            _ => None,
        }
    }

    /// The parse failure reason, if this is a parse error.
    pub fn parse_reason(&self) -> Option<ParseReason> {
        match self {
            KeyconfError::Parse { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// True for a missing group or key, the one case default-value
    /// accessors absorb.
    pub fn is_missing_entry(&self) -> bool {
        matches!(self, KeyconfError::NoGroup(_) | KeyconfError::NoKey { .. })
    }
}

fn group_label(group: &str) -> String {
    if group.is_empty() {
        "the top-level group".to_string()
    } else {
        format!("group '{group}'")
    }
}
