//! Build a [`KeyFile`] from text.
//!
//! The scanner produces tokens; this module tracks the current group and
//! routes comments:
//!
//! - full-line comments attach to the next entry as `comment_before`;
//! - comments left over when a new section starts trail the last entry of
//!   the section being closed;
//! - comments left over at the end of the file become the key file's
//!   trailing comment.
//!
//! A `(group, key)` pair that appears twice in one source keeps its first
//! position and takes the later value.
//!
//! Groups are created by their first entry, so a `[section]` with no
//! entries leaves nothing in the key file.

use std::path::Path;

use tracing::trace;

use crate::error::{ErrorLocation, KeyconfError, Result};
use crate::file;
use crate::keyfile::{Entry, KeyFile};
use crate::scan::{ScanError, Scanned, Scanner, Token};
use crate::types::FilePolicy;

/// Parse an in-memory buffer.
///
/// Parse errors carry a location with no path.
pub fn parse_str(text: &str, delimiter: char, comment: char) -> Result<KeyFile> {
    parse_source(text, delimiter, comment, None)
}

/// Read and parse a file with the permissive default [`FilePolicy`].
pub fn read_file(path: impl AsRef<Path>, delimiter: char, comment: char) -> Result<KeyFile> {
    read_file_with_policy(path, delimiter, comment, &FilePolicy::default())
}

/// Read and parse a file after checking it against `policy`.
///
/// Fails with [`KeyconfError::NoFile`] if the file does not exist, with a
/// permission variant if it violates the policy, and with
/// [`KeyconfError::Parse`] (carrying path and line) on the first syntax
/// error.
pub fn read_file_with_policy(
    path: impl AsRef<Path>,
    delimiter: char,
    comment: char,
    policy: &FilePolicy,
) -> Result<KeyFile> {
    let path = path.as_ref();
    // Reject bad markers before touching the filesystem.
    KeyFile::new(delimiter, comment)?;
    let text = file::read_source(path, policy)?;
    let kf = parse_source(&text, delimiter, comment, Some(path))?;
    trace!(path = %path.display(), entries = kf.len(), "parsed key file");
    Ok(kf)
}

pub(crate) fn parse_source(
    text: &str,
    delimiter: char,
    comment: char,
    path: Option<&Path>,
) -> Result<KeyFile> {
    let mut kf = KeyFile::new(delimiter, comment)?;
    kf.set_path(path.map(Path::to_path_buf));

    let mut group = String::new();
    let mut pending: Vec<String> = Vec::new();

    for item in Scanner::new(text, delimiter, comment) {
        let Scanned { line, token } = item.map_err(|e| scan_error(path, e))?;
        match token {
            Token::Comment(c) => pending.push(c),
            Token::Section(name) => {
                if !pending.is_empty()
                    && let Some(last) = kf.last_entry_mut(&group)
                {
                    last.push_comment_after(pending.join("\n"));
                    pending.clear();
                }
                group = name;
            }
            Token::Pair {
                key,
                value,
                quoted,
                inline_comment,
            } => {
                let mut entry = Entry::new(key, value, quoted, line);
                entry.set_comment_before(take_comment(&mut pending));
                if let Some(c) = inline_comment {
                    entry.push_comment_after(c);
                }
                kf.upsert(&group, entry);
            }
        }
    }

    kf.set_trailing_comment(take_comment(&mut pending));
    Ok(kf)
}

fn take_comment(pending: &mut Vec<String>) -> Option<String> {
    if pending.is_empty() {
        return None;
    }
    let joined = pending.join("\n");
    pending.clear();
    Some(joined)
}

fn scan_error(path: Option<&Path>, e: ScanError) -> KeyconfError {
    KeyconfError::Parse {
        location: ErrorLocation {
            path: path.map(Path::to_path_buf),
            line: e.line,
        },
        reason: e.reason,
    }
}
