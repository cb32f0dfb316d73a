use std::path::{Component, Path, PathBuf};

/// Joins `path` onto `base` (unless it is already absolute) and lexically folds `.` and `..`.
///
/// Nothing is touched on disk, so the result is usable for files that do not exist yet.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let input = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut new_path = PathBuf::new();

    for component in input.components() {
        match component {
            // Skip the current-dir marker "."
            Component::CurDir => {}

            // For "..", pop the last component if possible, keep it for relative leading parents
            Component::ParentDir => {
                let ends_in_parent = matches!(
                    new_path.components().next_back(),
                    Some(Component::ParentDir)
                );
                if ends_in_parent || !new_path.pop() {
                    new_path.push("..");
                }
            }

            // For normal components, push them
            other => new_path.push(other.as_os_str()),
        }
    }

    new_path
}

/// File name up to its first `.`, the name a single-export group falls back to.
pub fn base_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    match file_name.split('.').next() {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        // dotfiles like `.theme.scss`
        _ => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_base() {
        let resolved = resolve_path(Path::new("/project/config"), Path::new("./theme/../scss/a.scss"));

        assert_eq!(resolved, PathBuf::from("/project/config/scss/a.scss"));
    }

    #[test]
    fn absolute_paths_ignore_base() {
        let resolved = resolve_path(Path::new("/project"), Path::new("/tmp/out.scss"));

        assert_eq!(resolved, PathBuf::from("/tmp/out.scss"));
    }

    #[test]
    fn leading_parent_dirs_are_kept_for_relative_bases() {
        let resolved = resolve_path(Path::new(""), Path::new("../shared/colors.js"));

        assert_eq!(resolved, PathBuf::from("../shared/colors.js"));
        assert_eq!(
            resolve_path(Path::new("config"), Path::new("../../theme.js")),
            PathBuf::from("../theme.js")
        );
    }

    #[test]
    fn base_name_stops_at_first_dot() {
        assert_eq!(base_name(Path::new("out/colors.scss")), "colors");
        assert_eq!(base_name(Path::new("out/colors.module.scss")), "colors");
        assert_eq!(base_name(Path::new("out/globals")), "globals");
        assert_eq!(base_name(Path::new(".theme.scss")), ".theme");
    }
}
