//! Write a [`KeyFile`] back to text and to disk.
//!
//! Output follows the key file's own delimiter and comment marker. Groups
//! come out in store order, the top-level group first and without a header,
//! with a blank line between groups. Each entry is preceded by its
//! `comment_before` lines. A one-line `comment_after` goes on the entry's
//! own line; a longer one follows as full-line comments.
//!
//! Values flagged as quoted are written in `"…"` with `\n`, `\t`, `\\` and
//! `\"` escaped. Unquoted values are written verbatim, a multi-line value as
//! `\` continuations. An unquoted value that would not read back unchanged
//! is quoted anyway.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::Path;

use tracing::trace;

use crate::error::{KeyconfError, Result};
use crate::file;
use crate::keyfile::{Entry, KeyFile};
use crate::scan::{escape_key, escape_quoted, needs_quotes};
use crate::types::FilePolicy;

impl KeyFile {
    /// Render the key file as text.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = self.comment_marker();
        let mut first = true;
        for group in self.raw_groups().iter().filter(|g| !g.entries.is_empty()) {
            if !first {
                f.write_char('\n')?;
            }
            first = false;
            if !group.name.is_empty() {
                writeln!(f, "[{}]", group.name)?;
            }
            for entry in &group.entries {
                write_entry(f, entry, self.delimiter(), marker)?;
            }
        }
        if let Some(c) = self.trailing_comment() {
            write_comment(f, c, marker)?;
        }
        Ok(())
    }
}

fn write_entry(f: &mut fmt::Formatter<'_>, entry: &Entry, delimiter: char, marker: char) -> fmt::Result {
    if let Some(c) = entry.comment_before() {
        write_comment(f, c, marker)?;
    }
    f.write_str(&escape_key(entry.key(), delimiter))?;
    if delimiter.is_whitespace() {
        f.write_char(delimiter)?;
    } else {
        write!(f, " {delimiter} ")?;
    }

    let value = entry.value();
    if entry.is_quoted() || needs_quotes(value, marker) {
        write!(f, "\"{}\"", escape_quoted(value))?;
    } else {
        f.write_str(&value.replace('\n', " \\\n"))?;
    }

    match entry.comment_after() {
        Some(c) if !c.contains('\n') => writeln!(f, " {marker}{c}"),
        Some(c) => {
            f.write_char('\n')?;
            write_comment(f, c, marker)
        }
        None => f.write_char('\n'),
    }
}

fn write_comment(f: &mut fmt::Formatter<'_>, comment: &str, marker: char) -> fmt::Result {
    for line in comment.split('\n') {
        writeln!(f, "{marker}{line}")?;
    }
    Ok(())
}

/// Write `kf` to `dir/file_name`, creating `dir` if needed.
pub fn write_file(kf: &KeyFile, dir: impl AsRef<Path>, file_name: &str) -> Result<()> {
    write_file_with_policy(kf, dir, file_name, &FilePolicy::default())
}

/// Like [`write_file`], checking the target directory (and the file, if it
/// already exists) against `policy` first.
pub fn write_file_with_policy(
    kf: &KeyFile,
    dir: impl AsRef<Path>,
    file_name: &str,
    policy: &FilePolicy,
) -> Result<()> {
    let dir = dir.as_ref();
    if file_name.is_empty() || file_name.contains('/') {
        return Err(KeyconfError::InvalidName {
            what: "file name",
            name: file_name.into(),
            reason: "must be a plain file name",
        });
    }
    let path = dir.join(file_name);
    file::check_target(dir, &path, policy)?;

    fs::create_dir_all(dir).map_err(|e| KeyconfError::WriteError {
        path: dir.to_path_buf(),
        source: e,
    })?;
    fs::write(&path, kf.to_text()).map_err(|e| KeyconfError::WriteError {
        path: path.clone(),
        source: e,
    })?;
    trace!(path = %path.display(), entries = kf.len(), "wrote key file");
    Ok(())
}
