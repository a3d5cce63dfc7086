//! Renders a bounded-depth directory listing as indented text, for
//! `FS_TREE_GET`/`FS_SNAP_GET`.

use std::path::Path;

/// Walk `root` up to `max_depth` levels and render an indented tree. Entries
/// within a directory are sorted for deterministic output. `include_size`
/// appends each file's byte length in parentheses.
pub fn render_tree(root: &Path, max_depth: u16, include_size: bool) -> String {
    let mut out = String::new();
    out.push_str(&root.display().to_string());
    out.push('\n');
    walk(root, 0, max_depth, include_size, &mut out);
    out
}

fn walk(dir: &Path, depth: u16, max_depth: u16, include_size: bool, out: &mut String) {
    if depth >= max_depth {
        return;
    }
    let Ok(read_dir) = std::fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = read_dir.filter_map(Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let indent = "  ".repeat(usize::from(depth) + 1);
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(metadata) = entry.metadata() else { continue };

        if metadata.is_dir() {
            out.push_str(&format!("{indent}{name}/\n"));
            walk(&entry.path(), depth + 1, max_depth, include_size, out);
        } else if include_size {
            out.push_str(&format!("{indent}{name} ({})\n", metadata.len()));
        } else {
            out.push_str(&format!("{indent}{name}\n"));
        }
    }
}
