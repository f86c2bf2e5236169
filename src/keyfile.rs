//! The in-memory key file: ordered groups of ordered entries.
//!
//! A [`KeyFile`] owns its entries outright. Cloning produces an independent
//! copy; a fully built key file can be shared read-only across threads
//! (it is `Send + Sync`), and mutation requires `&mut`, so the borrow checker
//! enforces single-owner writes.
//!
//! Groups are stored in first-appearance order. The implicit top-level group
//! is named `""` and, when present, is always the first group, since its
//! entries must precede every `[section]` header on disk.

use std::path::{Path, PathBuf};

use crate::error::{KeyconfError, Result};

/// One key/value line together with the metadata needed to write it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    key: String,
    value: String,
    quoted: bool,
    comment_before: Option<String>,
    comment_after: Option<String>,
    line: usize,
}

impl Entry {
    pub(crate) fn new(key: String, value: String, quoted: bool, line: usize) -> Self {
        Self {
            key,
            value,
            quoted,
            comment_before: None,
            comment_after: None,
            line,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored value text, already unescaped if it was quoted.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value was written in double quotes.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Full-line comments preceding the entry, one line per `\n`, without
    /// their comment markers.
    pub fn comment_before(&self) -> Option<&str> {
        self.comment_before.as_deref()
    }

    /// Comments following the entry (inline after a quoted value, or
    /// trailing at the end of its group).
    pub fn comment_after(&self) -> Option<&str> {
        self.comment_after.as_deref()
    }

    /// 1-based source line, `0` for entries created programmatically.
    pub fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn set_text(&mut self, value: String, quoted: bool) {
        self.value = value;
        self.quoted = quoted;
    }

    pub(crate) fn set_line(&mut self, line: usize) {
        self.line = line;
    }

    pub(crate) fn set_comment_before(&mut self, comment: Option<String>) {
        if comment.is_some() {
            self.comment_before = comment;
        }
    }

    pub(crate) fn push_comment_after(&mut self, comment: String) {
        match &mut self.comment_after {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&comment);
            }
            None => self.comment_after = Some(comment),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Group {
    pub(crate) name: String,
    pub(crate) entries: Vec<Entry>,
}

impl Group {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.key == key)
    }
}

/// An ordered store of configuration entries plus the syntax it was read
/// with (delimiter and comment marker) and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFile {
    groups: Vec<Group>,
    delimiter: char,
    comment: char,
    path: Option<PathBuf>,
    trailing_comment: Option<String>,
}

impl KeyFile {
    /// Create an empty key file using `delimiter` between keys and values
    /// and `comment` to start comments.
    ///
    /// Fails with a usage error when the two characters cannot produce an
    /// unambiguous file (equal, line breaks, quotes, brackets, backslash).
    pub fn new(delimiter: char, comment: char) -> Result<Self> {
        validate_markers(delimiter, comment)?;
        Ok(Self::with_markers(delimiter, comment))
    }

    /// Create an empty INI-style key file (`=` and `#`).
    pub fn new_ini() -> Self {
        Self::with_markers('=', '#')
    }

    pub(crate) fn with_markers(delimiter: char, comment: char) -> Self {
        Self {
            groups: Vec::new(),
            delimiter,
            comment,
            path: None,
            trailing_comment: None,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn comment_marker(&self) -> char {
        self.comment
    }

    /// The file this key file was read from, `None` if it was built in
    /// memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn set_path(&mut self, path: Option<PathBuf>) {
        self.path = path;
    }

    /// Comments after the last entry of the file.
    pub fn trailing_comment(&self) -> Option<&str> {
        self.trailing_comment.as_deref()
    }

    pub(crate) fn set_trailing_comment(&mut self, comment: Option<String>) {
        self.trailing_comment = comment;
    }

    /// Total number of entries across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.entries.is_empty())
    }

    /// Names of the named groups, in file order.
    ///
    /// The implicit top-level group is not listed. Fails with
    /// [`KeyconfError::NoGroup`] when the file has no named group at all.
    pub fn groups(&self) -> Result<Vec<&str>> {
        let names: Vec<&str> = self
            .groups
            .iter()
            .filter(|g| !g.name.is_empty() && !g.entries.is_empty())
            .map(|g| g.name.as_str())
            .collect();
        if names.is_empty() {
            return Err(KeyconfError::NoGroup(String::new()));
        }
        Ok(names)
    }

    /// Keys of `group` in file order. `""` addresses the top-level group.
    pub fn keys(&self, group: &str) -> Result<Vec<&str>> {
        let grp = self.group(group)?;
        Ok(grp.entries.iter().map(|e| e.key.as_str()).collect())
    }

    /// Read-only view of one entry.
    pub fn entry(&self, group: &str, key: &str) -> Result<&Entry> {
        self.group(group)?
            .get(key)
            .ok_or_else(|| KeyconfError::NoKey {
                group: group.into(),
                key: key.into(),
            })
    }

    pub fn contains(&self, group: &str, key: &str) -> bool {
        self.entry(group, key).is_ok()
    }

    /// Iterate over every entry as `(group, entry)` in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter().map(move |e| (g.name.as_str(), e)))
    }

    /// Remove an entry, returning its value. A group left without entries
    /// disappears.
    pub fn remove(&mut self, group: &str, key: &str) -> Result<String> {
        let gi = self
            .groups
            .iter()
            .position(|g| g.name == group && !g.entries.is_empty())
            .ok_or_else(|| KeyconfError::NoGroup(group.into()))?;
        let grp = &mut self.groups[gi];
        let ei = grp
            .entries
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| KeyconfError::NoKey {
                group: group.into(),
                key: key.into(),
            })?;
        let removed = grp.entries.remove(ei);
        if grp.entries.is_empty() {
            self.groups.remove(gi);
        }
        Ok(removed.value)
    }

    fn group(&self, name: &str) -> Result<&Group> {
        self.groups
            .iter()
            .find(|g| g.name == name && !g.entries.is_empty())
            .ok_or_else(|| KeyconfError::NoGroup(name.into()))
    }

    pub(crate) fn raw_groups(&self) -> &[Group] {
        &self.groups
    }

    pub(crate) fn find_mut(&mut self, group: &str, key: &str) -> Option<&mut Entry> {
        self.groups
            .iter_mut()
            .find(|g| g.name == group)
            .and_then(|g| g.get_mut(key))
    }

    pub(crate) fn last_entry_mut(&mut self, group: &str) -> Option<&mut Entry> {
        self.groups
            .iter_mut()
            .find(|g| g.name == group)
            .and_then(|g| g.entries.last_mut())
    }

    /// Return the group named `name`, creating it if needed. A new
    /// top-level group goes first; any other new group goes last.
    pub(crate) fn group_mut_or_insert(&mut self, name: &str) -> &mut Group {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None if name.is_empty() => {
                self.groups.insert(0, Group::new(name));
                0
            }
            None => {
                self.groups.push(Group::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    /// Overwrite `(group, key)` in place, or append it to its group.
    pub(crate) fn upsert(&mut self, group: &str, entry: Entry) -> &mut Entry {
        let grp = self.group_mut_or_insert(group);
        match grp.entries.iter().position(|e| e.key == entry.key) {
            Some(idx) => {
                let existing = &mut grp.entries[idx];
                existing.set_text(entry.value, entry.quoted);
                existing.set_line(entry.line);
                existing.set_comment_before(entry.comment_before);
                if entry.comment_after.is_some() {
                    existing.comment_after = entry.comment_after;
                }
                existing
            }
            None => {
                grp.entries.push(entry);
                let last = grp.entries.len() - 1;
                &mut grp.entries[last]
            }
        }
    }
}

fn validate_markers(delimiter: char, comment: char) -> Result<()> {
    const RESERVED: [char; 6] = ['\n', '\r', '"', '\\', '[', ']'];
    let invalid = |what: &'static str, c: char, reason: &'static str| KeyconfError::InvalidName {
        what,
        name: c.to_string(),
        reason,
    };
    if RESERVED.contains(&delimiter) {
        return Err(invalid("delimiter", delimiter, "reserved character"));
    }
    if RESERVED.contains(&comment) || comment.is_whitespace() {
        return Err(invalid("comment marker", comment, "reserved character"));
    }
    if delimiter == comment {
        return Err(invalid(
            "comment marker",
            comment,
            "must differ from the delimiter",
        ));
    }
    Ok(())
}

/// Reject group names that cannot be written back as a `[header]`.
pub(crate) fn validate_group(group: &str) -> Result<()> {
    let invalid = |reason| KeyconfError::InvalidName {
        what: "group",
        name: group.into(),
        reason,
    };
    if group.contains(['\n', '\r', ']']) {
        return Err(invalid("must not contain line breaks or ']'"));
    }
    if group.trim() != group {
        return Err(invalid("must not have surrounding whitespace"));
    }
    Ok(())
}

/// Reject keys that would not survive a write/read cycle.
pub(crate) fn validate_key(key: &str, comment: char) -> Result<()> {
    let invalid = |reason| KeyconfError::InvalidName {
        what: "key",
        name: key.into(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if key.contains(['\n', '\r']) {
        return Err(invalid("must not contain line breaks"));
    }
    if key.trim() != key {
        return Err(invalid("must not have surrounding whitespace"));
    }
    if key.starts_with(comment) || key.starts_with('[') {
        return Err(invalid("must not start with a comment marker or '['"));
    }
    Ok(())
}
