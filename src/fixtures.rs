#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    /// A small vendor file with a top-level key, comments, and three groups.
    pub const EXAMPLE: &str = "\
# vendor defaults
Welcome = Hello

[Group]
Bla = 12311
# the answer
Answer = 42
Name = \"A quoted\\tname\"

[First Group]
Name = First
Enabled = yes

[Another Group]
Ratio = 0.5
";

    /// Write `(relative_path, content)` pairs under `root`, creating
    /// directories as needed.
    pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    /// A preferred (`etc`) and a fallback (`usr`) root in temporary
    /// directories.
    pub struct Roots {
        pub etc: TempDir,
        pub usr: TempDir,
    }

    impl Roots {
        pub fn new() -> Self {
            Self {
                etc: TempDir::new().unwrap(),
                usr: TempDir::new().unwrap(),
            }
        }

        pub fn etc(&self, files: &[(&str, &str)]) -> &Self {
            write_tree(self.etc.path(), files);
            self
        }

        pub fn usr(&self, files: &[(&str, &str)]) -> &Self {
            write_tree(self.usr.path(), files);
            self
        }
    }

    #[test]
    fn example_parses() {
        let kf = crate::parse_str(EXAMPLE, '=', '#').unwrap();
        assert_eq!(
            kf.groups().unwrap(),
            vec!["Group", "First Group", "Another Group"]
        );
        assert_eq!(kf.keys("").unwrap(), vec!["Welcome"]);
    }
}
