use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A typed value for [`KeyFile::set_value`](crate::KeyFile::set_value).
///
/// The closed set of types a key file can store. Deserializes untagged, so
/// any serde source (JSON, TOML, ...) can feed the value-agnostic setter;
/// null, sequences and maps are rejected by the deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A configuration root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfDir {
    /// `/etc`, the admin-owned, mutable tree.
    Etc,
    /// `/usr/etc`, the vendor-owned, immutable tree.
    UsrEtc,
    /// The platform user config directory (`$XDG_CONFIG_HOME` or
    /// `~/.config` on Linux).
    UserConfig,
    /// An explicit directory.
    Path(PathBuf),
}

/// Ownership and permission rules applied to files before reading or
/// writing them.
///
/// The default policy is permissive: symlinks are followed and nothing about
/// ownership or mode is checked. [`FilePolicy::system`] is the locked-down
/// variant for root-owned system configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePolicy {
    /// Whether a config file may be a symbolic link.
    pub follow_symlinks: bool,
    /// Allowed owner uids for a config file and its directory. `None`
    /// accepts any owner.
    pub allowed_owners: Option<Vec<u32>>,
    /// Allowed group gids for a config file and its directory. `None`
    /// accepts any group.
    pub allowed_groups: Option<Vec<u32>>,
    /// Mode bits a config file must not have.
    pub forbidden_file_mode: u32,
    /// Mode bits the directory containing a config file must not have.
    pub forbidden_dir_mode: u32,
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            allowed_owners: None,
            allowed_groups: None,
            forbidden_file_mode: 0,
            forbidden_dir_mode: 0,
        }
    }
}

impl FilePolicy {
    /// Root-owned, not group/world writable, no symlinks.
    pub fn system() -> Self {
        Self {
            follow_symlinks: false,
            allowed_owners: Some(vec![0]),
            allowed_groups: Some(vec![0]),
            forbidden_file_mode: 0o022,
            forbidden_dir_mode: 0o022,
        }
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn allowed_owners(mut self, uids: Vec<u32>) -> Self {
        self.allowed_owners = Some(uids);
        self
    }

    pub fn allowed_groups(mut self, gids: Vec<u32>) -> Self {
        self.allowed_groups = Some(gids);
        self
    }

    pub fn forbidden_file_mode(mut self, bits: u32) -> Self {
        self.forbidden_file_mode = bits;
        self
    }

    pub fn forbidden_dir_mode(mut self, bits: u32) -> Self {
        self.forbidden_dir_mode = bits;
        self
    }

    /// True when the policy checks nothing beyond existence.
    pub(crate) fn is_permissive(&self) -> bool {
        *self == FilePolicy::default()
    }
}
