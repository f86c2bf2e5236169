//! Layered INI-style key files for system configuration. Point at a project
//! name, get back one merged view of vendor defaults and admin overrides.
//!
//! keyconf reads `key = value` files with `[group]` headers, merges a base
//! file with drop-in snippets the way `/usr/etc` + `/etc` trees are layered
//! on Linux, and writes the result back without losing comments or quoting.
//!
//! ```ignore
//! let kf = Keyconf::builder()
//!     .project("example")
//!     .load()?;
//! let answer = kf.get_uint("Group", "Answer")?;
//! ```
//!
//! That single call looks for `/etc/example.conf` (falling back to
//! `/usr/etc/example.conf`), applies every `example.conf.d/*.conf` snippet
//! from both trees in file-name order, and hands you a [`KeyFile`].
//!
//! # Resolution
//!
//! Two roots take part, a *preferred* one (default [`ConfDir::Etc`]) and a
//! *fallback* one (default [`ConfDir::UsrEtc`]):
//!
//! - **Base file**: `{project}.{suffix}` from the preferred root if it
//!   exists there, otherwise from the fallback root. The two are never
//!   merged with each other; an admin copy replaces the vendor copy.
//! - **Snippets**: every `*.{suffix}` file in `{project}.{suffix}.d/` of
//!   either root. A preferred snippet shadows a fallback snippet of the same
//!   name. Survivors are applied in file-name order, each on top of
//!   everything before it.
//!
//! A missing base file is [`ErrorKind::NotFound`]. A malformed snippet
//! aborts resolution with its path and line; nothing is skipped silently.
//!
//! [`read_dirs_history`] returns the individual files instead of the merged
//! result, each with its [`KeyFile::path`], so you can tell which file set
//! which value.
//!
//! # Merging
//!
//! [`merge_files`] lays one key file over another. For every `(group, key)`
//! in the overlay, the overlay's value wins. Base groups and keys keep their
//! positions; overlay-only groups and keys are appended. Merging is
//! deterministic, so writing a merged file and diffing it is meaningful.
//!
//! # File format
//!
//! ```text
//! # top-level entries come before any header
//! Welcome = Hello
//!
//! [Group]
//! # quotes enable \n \t \\ \" escapes
//! Name = "A quoted\tname"  # inline
//! # unquoted values take no escapes; a trailing \ continues the line
//! Path = /very/long/value \
//!        continued
//! Color = #fff  # a marker after whitespace starts a comment
//! ```
//!
//! The delimiter and comment marker are configurable (`:` and `;`, or a
//! whitespace delimiter, work as well). A key repeated within one file keeps
//! its first position and takes the last value.
//!
//! # Typed access
//!
//! Values are stored as text and coerced on read:
//!
//! | getter                       | type     | errors                           |
//! |------------------------------|----------|----------------------------------|
//! | `get_int` / `get_int32`      | i64/i32  | `Malformed`, `Overflow`          |
//! | `get_uint` / `get_uint32`    | u64/u32  | `Malformed`, `Overflow` (< 0)    |
//! | `get_float` / `get_float32`  | f64/f32  | `Malformed`, `Overflow` (to inf) |
//! | `get_bool`                   | bool     | `Malformed`                      |
//! | `get_string` / `get_str`     | text     | none                             |
//!
//! Every getter has an `_or` variant whose default is used only when the
//! group or key is missing; a present but malformed value is still an error.
//! [`KeyFile::get`] and [`KeyFile::set`] are the generic forms over
//! [`FromValueText`] and [`ToValueText`]. [`KeyFile::set_value`] takes a
//! [`Value`], which also deserializes from any serde source.
//!
//! # File policy
//!
//! A [`FilePolicy`] restricts which files are trusted: symlinks, owner and
//! group ids, forbidden mode bits on files and their directories. The
//! default trusts everything; [`FilePolicy::system`] expects root-owned
//! files that nobody else can write.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events (`debug` for resolution decisions,
//! `trace` for each file read or written) and never installs a subscriber.
//! Errors are returned, never logged.
//!
//! # Feature flags
//!
//! | Feature       | Default | Description                                       |
//! |---------------|---------|---------------------------------------------------|
//! | `rich-errors` | no      | `miette::Diagnostic` on [`KeyconfError`]          |

pub mod error;
pub mod types;

mod access;
mod builder;
mod file;
mod keyfile;
mod merge;
mod parse;
mod persist;
mod resolve;
mod scan;

#[cfg(test)]
mod fixtures;

pub use access::{CoerceError, FromValueText, ToValueText};
pub use builder::{Keyconf, KeyconfBuilder};
pub use error::{ErrorKind, ErrorLocation, KeyconfError, ParseReason, Result};
pub use file::resolve_conf_dir;
pub use keyfile::{Entry, KeyFile};
pub use merge::merge_files;
pub use parse::{parse_str, read_file, read_file_with_policy};
pub use persist::{write_file, write_file_with_policy};
pub use resolve::{
    read_dirs, read_dirs_history, read_dirs_history_with_policy, read_dirs_with_policy,
};
pub use types::{ConfDir, FilePolicy, Value};
