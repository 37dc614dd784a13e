use crate::util;
use std::path::Path;
use tracing::trace;
use walkdir::{DirEntry, WalkDir};

const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// Workspace-relative paths of every `.yaml`/`.yml` file, sorted
pub fn yaml_files(workspace: &Path) -> anyhow::Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(workspace)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_yaml(entry.path()) {
            let relative = util::relative_slash_path(workspace, entry.path());
            trace!("Found {}", relative);
            files.push(relative);
        }
    }

    files.sort();
    Ok(files)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&&*name)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}
