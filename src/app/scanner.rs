use crate::app::error::TransformError;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::path::PathBuf;

const CONFIG_PATTERN: &str = "*.config";

/// Recursively collects every `*.config` file under a root.
pub struct Scanner {
    root: PathBuf,
    config_matcher: GlobMatcher,
}

impl Scanner {
    pub fn new(root: PathBuf) -> Result<Self, TransformError> {
        Ok(Self {
            root,
            config_matcher: build_config_matcher()?,
        })
    }

    /// Returns full paths in lexicographic order.
    pub fn scan(&self) -> Result<Vec<PathBuf>, TransformError> {
        let mut configs = Vec::new();

        // Every file counts, including hidden and git-ignored ones, and
        // symlinks are resolved so linked configs and folders are found too.
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .build();

        for result in walker {
            let entry = result.map_err(|source| TransformError::Discovery {
                root: self.root.clone(),
                source,
            })?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            if self.config_matcher.is_match(entry.file_name()) {
                configs.push(entry.into_path());
            }
        }

        configs.sort();
        Ok(configs)
    }
}

fn build_config_matcher() -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(CONFIG_PATTERN)
        .case_insensitive(true)
        .build()?
        .compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<configuration />").unwrap();
    }

    #[test]
    fn finds_nested_and_hidden_configs_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Web.config");
        touch(dir.path(), "Web.Debug.config");
        touch(dir.path(), "sub/App.config");
        touch(dir.path(), ".hidden/Tool.CONFIG");
        touch(dir.path(), "readme.txt");
        touch(dir.path(), "Web.config.bak");

        let found = Scanner::new(dir.path().to_path_buf())
            .unwrap()
            .scan()
            .unwrap();

        let relative: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from(".hidden/Tool.CONFIG"),
                PathBuf::from("Web.Debug.config"),
                PathBuf::from("Web.config"),
                PathBuf::from("sub/App.config"),
            ]
        );
    }

    #[test]
    fn ignores_gitignore_rules() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.config\n").unwrap();
        touch(dir.path(), "App.config");

        let found = Scanner::new(dir.path().to_path_buf())
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(found, vec![dir.path().join("App.config")]);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinked_files_and_directories() {
        use std::os::unix::fs::symlink;

        let shared = tempfile::tempdir().unwrap();
        touch(shared.path(), "Web.config");
        touch(shared.path(), "common/App.config");

        let dir = tempfile::tempdir().unwrap();
        symlink(shared.path().join("Web.config"), dir.path().join("Web.config")).unwrap();
        touch(dir.path(), "Web.Debug.config");
        symlink(shared.path().join("common"), dir.path().join("linked")).unwrap();

        let found = Scanner::new(dir.path().to_path_buf())
            .unwrap()
            .scan()
            .unwrap();

        assert_eq!(
            found,
            vec![
                dir.path().join("Web.Debug.config"),
                dir.path().join("Web.config"),
                dir.path().join("linked/App.config"),
            ]
        );
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let found = Scanner::new(dir.path().to_path_buf())
            .unwrap()
            .scan()
            .unwrap();
        assert!(found.is_empty());
    }
}
