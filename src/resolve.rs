//! Directory resolution: base file plus drop-in snippets, merged by
//! precedence.
//!
//! Steps:
//!
//! 1. Pick `{project}{suffix}` from the preferred root, else the fallback
//!    root. Neither present is [`KeyconfError::NoFile`].
//! 2. Parse it.
//! 3. Collect snippets from `{project}{suffix}.d/` in both roots, sorted by
//!    file name, preferred shadowing fallback.
//! 4. Parse each snippet and merge it on top of everything before it.
//!
//! A malformed snippet aborts the whole resolution; nothing is skipped
//! silently.
//!
//! The history variant stops before step 4 and hands back every parsed
//! file, base first.

use std::path::Path;

use tracing::debug;

use crate::error::{KeyconfError, Result};
use crate::file;
use crate::keyfile::KeyFile;
use crate::merge::merge_into;
use crate::parse::read_file_with_policy;
use crate::types::FilePolicy;

/// Resolve and merge `{project}{suffix}` across `preferred` and
/// `fallback` with the permissive default [`FilePolicy`].
pub fn read_dirs(
    preferred: impl AsRef<Path>,
    fallback: impl AsRef<Path>,
    project: &str,
    suffix: &str,
    delimiter: char,
    comment: char,
) -> Result<KeyFile> {
    read_dirs_with_policy(
        preferred,
        fallback,
        project,
        suffix,
        delimiter,
        comment,
        &FilePolicy::default(),
    )
}

/// Like [`read_dirs`], checking every file against `policy`.
pub fn read_dirs_with_policy(
    preferred: impl AsRef<Path>,
    fallback: impl AsRef<Path>,
    project: &str,
    suffix: &str,
    delimiter: char,
    comment: char,
    policy: &FilePolicy,
) -> Result<KeyFile> {
    let (base, snippets) = read_layers(
        preferred.as_ref(),
        fallback.as_ref(),
        project,
        suffix,
        delimiter,
        comment,
        policy,
    )?;
    Ok(snippets.into_iter().fold(base, |merged, snippet| {
        debug!(
            snippet = ?snippet.path(),
            entries = snippet.len(),
            "applying snippet"
        );
        merge_into(merged, &snippet)
    }))
}

/// Every file that contributes to [`read_dirs`], parsed separately:
/// the base file first, then each snippet in application order. Each
/// key file keeps its origin [`KeyFile::path`].
pub fn read_dirs_history(
    preferred: impl AsRef<Path>,
    fallback: impl AsRef<Path>,
    project: &str,
    suffix: &str,
    delimiter: char,
    comment: char,
) -> Result<Vec<KeyFile>> {
    read_dirs_history_with_policy(
        preferred,
        fallback,
        project,
        suffix,
        delimiter,
        comment,
        &FilePolicy::default(),
    )
}

/// Like [`read_dirs_history`], checking every file against `policy`.
pub fn read_dirs_history_with_policy(
    preferred: impl AsRef<Path>,
    fallback: impl AsRef<Path>,
    project: &str,
    suffix: &str,
    delimiter: char,
    comment: char,
    policy: &FilePolicy,
) -> Result<Vec<KeyFile>> {
    let (base, snippets) = read_layers(
        preferred.as_ref(),
        fallback.as_ref(),
        project,
        suffix,
        delimiter,
        comment,
        policy,
    )?;
    let mut history = Vec::with_capacity(snippets.len() + 1);
    history.push(base);
    history.extend(snippets);
    Ok(history)
}

/// Parse the base file and every snippet, in application order.
fn read_layers(
    preferred: &Path,
    fallback: &Path,
    project: &str,
    suffix: &str,
    delimiter: char,
    comment: char,
    policy: &FilePolicy,
) -> Result<(KeyFile, Vec<KeyFile>)> {
    validate_project(project)?;
    KeyFile::new(delimiter, comment)?;

    let suffix = file::normalize_suffix(suffix);
    let file_name = format!("{project}{suffix}");

    let base_path = file::find_base_file(preferred, fallback, &file_name)?;
    debug!(path = %base_path.display(), "using base file");
    let base = read_file_with_policy(&base_path, delimiter, comment, policy)?;

    let snippets = file::snippet_files(preferred, fallback, &file_name, &suffix)?
        .iter()
        .map(|path| read_file_with_policy(path, delimiter, comment, policy))
        .collect::<Result<Vec<_>>>()?;
    debug!(snippets = snippets.len(), project, "resolved configuration files");
    Ok((base, snippets))
}

fn validate_project(project: &str) -> Result<()> {
    let reason = if project.is_empty() {
        "must not be empty"
    } else if project.contains('/') || project == "." || project == ".." {
        "must be a plain file name"
    } else {
        return Ok(());
    };
    Err(KeyconfError::InvalidName {
        what: "project",
        name: project.into(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ParseReason};
    use crate::fixtures::test::{EXAMPLE, Roots};
    use pretty_assertions::assert_eq;

    fn resolve(roots: &Roots) -> Result<KeyFile> {
        read_dirs(roots.etc.path(), roots.usr.path(), "example", "conf", '=', '#')
    }

    #[test]
    fn vendor_file_only() {
        let roots = Roots::new();
        roots.usr(&[("example.conf", EXAMPLE)]);
        let kf = resolve(&roots).unwrap();
        assert_eq!(kf.get_int("Group", "Bla").unwrap(), 12311);
        assert_eq!(kf.path(), Some(roots.usr.path().join("example.conf").as_path()));
    }

    #[test]
    fn snippet_overrides_base() {
        let roots = Roots::new();
        roots
            .usr(&[("example.conf", "[Group]\nBla=12311\n")])
            .etc(&[("example.conf.d/a.conf", "[Group]\nBla=99\n")]);
        assert_eq!(resolve(&roots).unwrap().get_int("Group", "Bla").unwrap(), 99);
    }

    #[test]
    fn preferred_base_replaces_fallback_base() {
        let roots = Roots::new();
        roots
            .usr(&[("example.conf", "[G]\nfrom = usr\nonly_usr = 1\n")])
            .etc(&[("example.conf", "[G]\nfrom = etc\n")]);
        let kf = resolve(&roots).unwrap();
        assert_eq!(kf.get_str("G", "from").unwrap(), "etc");
        assert!(!kf.contains("G", "only_usr"));
    }

    #[test]
    fn snippets_apply_in_name_order_across_roots() {
        let roots = Roots::new();
        roots
            .usr(&[
                ("example.conf", "[G]\nk = base\n"),
                ("example.conf.d/10-vendor.conf", "[G]\nk = ten\nv = 1\n"),
                ("example.conf.d/30-vendor.conf", "[G]\nk = thirty\n"),
            ])
            .etc(&[("example.conf.d/20-admin.conf", "[G]\nk = twenty\na = 1\n")]);
        let kf = resolve(&roots).unwrap();
        assert_eq!(kf.get_str("G", "k").unwrap(), "thirty");
        assert_eq!(kf.keys("G").unwrap(), vec!["k", "v", "a"]);
    }

    #[test]
    fn preferred_snippet_shadows_fallback_snippet() {
        let roots = Roots::new();
        roots
            .usr(&[
                ("example.conf", "[G]\nk = base\n"),
                ("example.conf.d/50-x.conf", "[G]\nk = usr\nusr_only = 1\n"),
            ])
            .etc(&[("example.conf.d/50-x.conf", "[G]\nk = etc\n")]);
        let kf = resolve(&roots).unwrap();
        assert_eq!(kf.get_str("G", "k").unwrap(), "etc");
        assert!(!kf.contains("G", "usr_only"));
    }

    #[test]
    fn snippets_without_suffix_are_ignored() {
        let roots = Roots::new();
        roots.usr(&[
            ("example.conf", "[G]\nk = base\n"),
            ("example.conf.d/notes.txt", "[G]\nk = txt\n"),
            ("example.conf.d/old.conf.bak", "[G]\nk = bak\n"),
        ]);
        assert_eq!(resolve(&roots).unwrap().get_str("G", "k").unwrap(), "base");
    }

    #[test]
    fn suffix_with_leading_dot() {
        let roots = Roots::new();
        roots.usr(&[("example.conf", "[G]\nk = v\n")]);
        let kf = read_dirs(roots.etc.path(), roots.usr.path(), "example", ".conf", '=', '#').unwrap();
        assert_eq!(kf.get_str("G", "k").unwrap(), "v");
    }

    #[test]
    fn missing_base_is_no_file() {
        let roots = Roots::new();
        roots.etc(&[("example.conf.d/a.conf", "[G]\nk = v\n")]);
        let err = resolve(&roots).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        match err {
            KeyconfError::NoFile { path } => {
                assert_eq!(path, roots.etc.path().join("example.conf"));
            }
            other => panic!("expected NoFile, got {other:?}"),
        }
    }

    #[test]
    fn malformed_snippet_aborts_with_location() {
        let roots = Roots::new();
        let bad = "example.conf.d/20-bad.conf";
        roots.usr(&[
            ("example.conf", "[G]\nk = v\n"),
            ("example.conf.d/10-ok.conf", "[G]\nk = w\n"),
            (bad, "[G]\nno delimiter here\n"),
        ]);
        let err = resolve(&roots).unwrap_err();
        assert_eq!(err.parse_reason(), Some(ParseReason::MissingDelimiter));
        let loc = err.location().unwrap();
        assert_eq!(loc.path.as_deref(), Some(roots.usr.path().join(bad).as_path()));
        assert_eq!(loc.line, 2);
    }

    #[test]
    fn history_lists_each_file_in_order() {
        let roots = Roots::new();
        roots
            .usr(&[
                ("example.conf", "[G]\nk = base\n"),
                ("example.conf.d/b.conf", "[G]\nk = b\n"),
            ])
            .etc(&[("example.conf.d/a.conf", "[G]\nk = a\n")]);
        let history =
            read_dirs_history(roots.etc.path(), roots.usr.path(), "example", "conf", '=', '#')
                .unwrap();
        let values: Vec<&str> = history.iter().map(|kf| kf.get_str("G", "k").unwrap()).collect();
        assert_eq!(values, vec!["base", "a", "b"]);
        assert_eq!(
            history[1].path(),
            Some(roots.etc.path().join("example.conf.d/a.conf").as_path())
        );
    }

    #[test]
    fn history_and_merge_agree() {
        let roots = Roots::new();
        roots.usr(&[
            ("example.conf", EXAMPLE),
            ("example.conf.d/a.conf", "[Group]\nBla = 1\n[New]\nx = y\n"),
        ]);
        let history =
            read_dirs_history(roots.etc.path(), roots.usr.path(), "example", "conf", '=', '#')
                .unwrap();
        let folded = history
            .iter()
            .skip(1)
            .fold(history[0].clone(), |acc, kf| crate::merge::merge_files(&acc, kf));
        assert_eq!(folded, resolve(&roots).unwrap());
    }

    #[test]
    fn rejects_bad_project_name() {
        let roots = Roots::new();
        let err = read_dirs(roots.etc.path(), roots.usr.path(), "../x", "conf", '=', '#').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = read_dirs(roots.etc.path(), roots.usr.path(), "", "conf", '=', '#').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[cfg(unix)]
    #[test]
    fn policy_applies_to_snippets() {
        use std::os::unix::fs::symlink;

        let roots = Roots::new();
        roots.usr(&[("example.conf", "[G]\nk = v\n"), ("real.conf", "[G]\nk = w\n")]);
        std::fs::create_dir_all(roots.usr.path().join("example.conf.d")).unwrap();
        symlink(
            roots.usr.path().join("real.conf"),
            roots.usr.path().join("example.conf.d/link.conf"),
        )
        .unwrap();

        assert_eq!(resolve(&roots).unwrap().get_str("G", "k").unwrap(), "w");

        let policy = FilePolicy::default().follow_symlinks(false);
        let err = read_dirs_with_policy(
            roots.etc.path(),
            roots.usr.path(),
            "example",
            "conf",
            '=',
            '#',
            &policy,
        )
        .unwrap_err();
        assert!(matches!(err, KeyconfError::FileIsSymLink { .. }));
        assert_eq!(err.kind(), ErrorKind::Permission);
    }
}
