use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Files a Java source tree carries that declare nothing extractable.
const NON_SOURCE_FILES: &[&str] = &["package-info.java", "module-info.java"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_test_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case("test") || name.eq_ignore_ascii_case("tests"))
}

pub fn is_java_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".java") && !NON_SOURCE_FILES.contains(&name)
}

/// Lazily walks each root in turn, yielding qualifying Java sources.
///
/// A root that is itself a file is yielded when it is a Java source. Below a
/// root, hidden entries are pruned, as are `test`/`tests` directories unless
/// `include_tests` is set. Unreadable entries are logged and skipped.
pub fn discover_sources(
    roots: &[PathBuf],
    include_tests: bool,
) -> impl Iterator<Item = PathBuf> + '_ {
    roots.iter().flat_map(move |root| {
        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                !is_hidden(entry) && (include_tests || !is_test_dir(entry))
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_java_source(entry.path()))
            .map(DirEntry::into_path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    fn names(found: Vec<PathBuf>, root: &Path) -> Vec<String> {
        found
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn skips_hidden_tests_and_non_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "src/a/A.java");
        touch(root, "src/a/package-info.java");
        touch(root, "module-info.java");
        touch(root, "src/a/notes.txt");
        touch(root, ".git/B.java");
        touch(root, "src/.hidden/C.java");
        touch(root, "src/Test/D.java");
        touch(root, "tests/E.java");
        touch(root, "src/testing/F.java");

        let found = discover_sources(&[root.to_path_buf()], false).collect();
        assert_eq!(names(found, root), vec!["src/a/A.java", "src/testing/F.java"]);

        let found = discover_sources(&[root.to_path_buf()], true).collect();
        assert_eq!(
            names(found, root),
            vec!["src/Test/D.java", "src/a/A.java", "src/testing/F.java", "tests/E.java"]
        );
    }

    #[test]
    fn file_roots_are_yielded_directly() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Single.java");
        touch(dir.path(), "readme.md");
        let roots = vec![dir.path().join("Single.java"), dir.path().join("readme.md")];
        let found: Vec<PathBuf> = discover_sources(&roots, false).collect();
        assert_eq!(found, vec![dir.path().join("Single.java")]);
    }
}
