use std::path::PathBuf;

use crate::error::{KeyconfError, Result};
use crate::file;
use crate::keyfile::KeyFile;
use crate::persist;
use crate::resolve;
use crate::types::{ConfDir, FilePolicy};

/// Entry point for loading a project's configuration by convention.
pub struct Keyconf;

impl Keyconf {
    pub fn builder() -> KeyconfBuilder {
        KeyconfBuilder::new()
    }
}

/// Builder for resolving `{project}.{suffix}` across a preferred and a
/// fallback directory.
///
/// Only [`project()`](Self::project) is required. Everything else has a
/// default:
///
/// | setting          | default              |
/// |------------------|----------------------|
/// | `suffix`         | `"conf"`             |
/// | `preferred_dir`  | [`ConfDir::Etc`]     |
/// | `fallback_dir`   | [`ConfDir::UsrEtc`]  |
/// | `delimiter`      | `'='`                |
/// | `comment`        | `'#'`                |
/// | `policy`         | permissive           |
#[derive(Debug, Clone)]
pub struct KeyconfBuilder {
    project: Option<String>,
    suffix: String,
    preferred_dir: ConfDir,
    fallback_dir: ConfDir,
    delimiter: char,
    comment: char,
    policy: FilePolicy,
}

impl KeyconfBuilder {
    fn new() -> Self {
        Self {
            project: None,
            suffix: "conf".into(),
            preferred_dir: ConfDir::Etc,
            fallback_dir: ConfDir::UsrEtc,
            delimiter: '=',
            comment: '#',
            policy: FilePolicy::default(),
        }
    }

    /// Set the project name; the base file is `{project}.{suffix}`.
    pub fn project(mut self, name: &str) -> Self {
        self.project = Some(name.to_string());
        self
    }

    /// File suffix, with or without the leading dot.
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    /// Directory whose files win (admin tree).
    pub fn preferred_dir(mut self, dir: ConfDir) -> Self {
        self.preferred_dir = dir;
        self
    }

    /// Directory consulted when the preferred one lacks a file (vendor tree).
    pub fn fallback_dir(mut self, dir: ConfDir) -> Self {
        self.fallback_dir = dir;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn comment(mut self, comment: char) -> Self {
        self.comment = comment;
        self
    }

    /// Ownership and permission rules applied to every file read or written.
    pub fn policy(mut self, policy: FilePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn effective_project(&self) -> Result<&str> {
        self.project
            .as_deref()
            .ok_or_else(|| KeyconfError::InvalidName {
                what: "project",
                name: String::new(),
                reason: "must be set before loading",
            })
    }

    fn effective_dirs(&self) -> Result<(PathBuf, PathBuf)> {
        let resolve = |dir: &ConfDir| {
            file::resolve_conf_dir(dir).ok_or_else(|| KeyconfError::InvalidName {
                what: "directory",
                name: format!("{dir:?}"),
                reason: "cannot be resolved on this system",
            })
        };
        Ok((resolve(&self.preferred_dir)?, resolve(&self.fallback_dir)?))
    }

    /// Resolve and merge the base file and all snippets.
    pub fn load(self) -> Result<KeyFile> {
        let project = self.effective_project()?;
        let (preferred, fallback) = self.effective_dirs()?;
        resolve::read_dirs_with_policy(
            preferred,
            fallback,
            project,
            &self.suffix,
            self.delimiter,
            self.comment,
            &self.policy,
        )
    }

    /// Every contributing file, parsed separately, base first.
    pub fn load_history(self) -> Result<Vec<KeyFile>> {
        let project = self.effective_project()?;
        let (preferred, fallback) = self.effective_dirs()?;
        resolve::read_dirs_history_with_policy(
            preferred,
            fallback,
            project,
            &self.suffix,
            self.delimiter,
            self.comment,
            &self.policy,
        )
    }

    /// Write `kf` as the base file in the preferred directory and return
    /// its path.
    pub fn save(self, kf: &KeyFile) -> Result<PathBuf> {
        let project = self.effective_project()?;
        let (preferred, _) = self.effective_dirs()?;
        let file_name = format!("{project}{}", file::normalize_suffix(&self.suffix));
        persist::write_file_with_policy(kf, &preferred, &file_name, &self.policy)?;
        Ok(preferred.join(file_name))
    }
}
