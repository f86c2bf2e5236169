//! File discovery and loading for key files.
//!
//! # Discovery
//!
//! A configuration is looked up in two roots, a *preferred* one (usually the
//! admin tree, `/etc`) and a *fallback* one (usually the vendor tree,
//! `/usr/etc`):
//!
//! - the base file `{root}/{project}.{suffix}` is taken from the preferred
//!   root if present there, otherwise from the fallback root;
//! - drop-in snippets are collected from `{root}/{project}.{suffix}.d/` in
//!   both roots. Only files ending in `.{suffix}` count. When both roots
//!   hold a snippet with the same file name, the preferred one shadows the
//!   fallback one. The surviving snippets are ordered by file name.
//!
//! Missing roots and missing `.d` directories are silently skipped. Only
//! actual I/O errors (permissions, etc.) are propagated.
//!
//! # Loading
//!
//! [`read_source`] applies a [`FilePolicy`] (symlinks, owner, group, mode
//! bits) before reading a file, and [`check_target`] applies the same
//! policy to a write target.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{KeyconfError, Result};
use crate::types::{ConfDir, FilePolicy};

/// Resolve a [`ConfDir`] to a concrete path.
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory
/// found for [`ConfDir::UserConfig`]).
pub fn resolve_conf_dir(dir: &ConfDir) -> Option<PathBuf> {
    match dir {
        ConfDir::Etc => Some(PathBuf::from("/etc")),
        ConfDir::UsrEtc => Some(PathBuf::from("/usr/etc")),
        ConfDir::UserConfig => {
            let base = directories::BaseDirs::new()?;
            Some(base.config_dir().to_path_buf())
        }
        ConfDir::Path(p) => Some(p.clone()),
    }
}

/// `"conf"` and `".conf"` both become `".conf"`; an empty suffix stays
/// empty.
pub(crate) fn normalize_suffix(suffix: &str) -> String {
    let bare = suffix.trim_start_matches('.');
    if bare.is_empty() {
        String::new()
    } else {
        format!(".{bare}")
    }
}

/// Find the base file, preferred root first.
///
/// Fails with [`KeyconfError::NoFile`] (naming the preferred location) if
/// neither root has it.
pub(crate) fn find_base_file(
    preferred: &Path,
    fallback: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    for dir in [preferred, fallback] {
        let candidate = dir.join(file_name);
        match fs::symlink_metadata(&candidate) {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == IoKind::NotFound => continue,
            Err(e) => {
                return Err(KeyconfError::IoError {
                    path: candidate,
                    source: e,
                });
            }
        }
    }
    Err(KeyconfError::NoFile {
        path: preferred.join(file_name),
    })
}

/// Collect drop-in snippets from `{root}/{file_name}.d/` in both roots.
///
/// Returned in file-name order; a preferred snippet shadows a fallback
/// snippet of the same name.
pub(crate) fn snippet_files(
    preferred: &Path,
    fallback: &Path,
    file_name: &str,
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    let dir_name = format!("{file_name}.d");
    let mut chosen: BTreeMap<OsString, PathBuf> = BTreeMap::new();

    for root in [preferred, fallback] {
        let dir = root.join(&dir_name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoKind::NotFound => continue,
            Err(e) => {
                return Err(KeyconfError::IoError {
                    path: dir,
                    source: e,
                });
            }
        };
        for entry in entries {
            let entry = entry.map_err(|e| KeyconfError::IoError {
                path: dir.clone(),
                source: e,
            })?;
            let name = entry.file_name();
            if !name.to_string_lossy().ends_with(suffix) {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            if let Some(existing) = chosen.get(&name) {
                debug!(
                    skipped = %path.display(),
                    kept = %existing.display(),
                    "snippet shadowed by preferred directory"
                );
                continue;
            }
            chosen.insert(name, path);
        }
    }

    Ok(chosen.into_values().collect())
}

/// Read a config file as UTF-8 after checking it against `policy`.
pub(crate) fn read_source(path: &Path, policy: &FilePolicy) -> Result<String> {
    check_file(path, policy)?;
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        IoKind::NotFound => KeyconfError::NoFile {
            path: path.to_path_buf(),
        },
        _ => KeyconfError::IoError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    String::from_utf8(bytes).map_err(|_| KeyconfError::InvalidEncoding {
        path: path.to_path_buf(),
    })
}

/// Check an existing file (and its directory) against `policy`.
pub(crate) fn check_file(path: &Path, policy: &FilePolicy) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(|e| match e.kind() {
        IoKind::NotFound => KeyconfError::NoFile {
            path: path.to_path_buf(),
        },
        _ => KeyconfError::IoError {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    if meta.file_type().is_symlink() && !policy.follow_symlinks {
        return Err(KeyconfError::FileIsSymLink {
            path: path.to_path_buf(),
        });
    }
    if policy.is_permissive() {
        return Ok(());
    }
    check_ownership(path, policy, false)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        check_ownership(dir, policy, true)?;
    }
    Ok(())
}

/// Check a write target: the directory must pass the policy, and so must
/// the file if it already exists.
pub(crate) fn check_target(dir: &Path, path: &Path, policy: &FilePolicy) -> Result<()> {
    if policy.is_permissive() {
        return Ok(());
    }
    if dir.exists() {
        check_ownership(dir, policy, true)?;
    }
    match fs::symlink_metadata(path) {
        Ok(_) => check_file(path, policy),
        Err(e) if e.kind() == IoKind::NotFound => Ok(()),
        Err(e) => Err(KeyconfError::IoError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(unix)]
fn check_ownership(path: &Path, policy: &FilePolicy, is_dir: bool) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let meta = fs::metadata(path).map_err(|e| KeyconfError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(owners) = &policy.allowed_owners
        && !owners.contains(&meta.uid())
    {
        return Err(KeyconfError::WrongOwner {
            path: path.to_path_buf(),
            uid: meta.uid(),
        });
    }
    if let Some(groups) = &policy.allowed_groups
        && !groups.contains(&meta.gid())
    {
        return Err(KeyconfError::WrongGroup {
            path: path.to_path_buf(),
            gid: meta.gid(),
        });
    }

    let mode = meta.mode() & 0o7777;
    if is_dir && mode & policy.forbidden_dir_mode != 0 {
        return Err(KeyconfError::WrongDirPermission {
            path: path.to_path_buf(),
            mode,
        });
    }
    if !is_dir && mode & policy.forbidden_file_mode != 0 {
        return Err(KeyconfError::WrongFilePermission {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_ownership(_path: &Path, _policy: &FilePolicy, _is_dir: bool) -> Result<()> {
    Ok(())
}
