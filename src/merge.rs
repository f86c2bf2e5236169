use crate::keyfile::KeyFile;

/// Merge `overlay` on top of `base`, producing a new key file.
///
/// For every `(group, key)` in the overlay, the overlay's value wins.
/// Ordering follows the base first: its groups and keys keep their
/// positions, overlay-only groups come after them, and overlay-only keys
/// are appended to their group. Groups with no entries are dropped.
///
/// The result keeps the base's delimiter, comment marker and origin path.
pub fn merge_files(base: &KeyFile, overlay: &KeyFile) -> KeyFile {
    merge_into(base.clone(), overlay)
}

pub(crate) fn merge_into(mut base: KeyFile, overlay: &KeyFile) -> KeyFile {
    for group in overlay.raw_groups() {
        for entry in &group.entries {
            base.upsert(&group.name, entry.clone());
        }
    }
    if let Some(c) = overlay.trailing_comment() {
        base.set_trailing_comment(Some(c.to_string()));
    }
    base
}
