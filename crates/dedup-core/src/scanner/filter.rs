/// Which walk entries take part in a scan.

/// `true` if the file at `path` must be ignored: any segment is hidden
/// (leading `.`), or any folder on the way starts with `reserved_prefix`.
pub fn is_excluded<S: AsRef<str>>(path: &[S], reserved_prefix: &str) -> bool {
    let Some((_, folders)) = path.split_last() else {
        return true;
    };
    path.iter().any(|segment| segment.as_ref().starts_with('.'))
        || (!reserved_prefix.is_empty()
            && folders
                .iter()
                .any(|segment| segment.as_ref().starts_with(reserved_prefix)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_files_and_folders_are_excluded() {
        assert!(is_excluded(&[".meta.csv"], "~~~"));
        assert!(is_excluded(&[".git", "config"], "~~~"));
        assert!(!is_excluded(&["photos", "a.jpg"], "~~~"));
    }

    #[test]
    fn reserved_folders_are_excluded() {
        assert!(is_excluded(&["~~~trash", "a.jpg"], "~~~"));
        assert!(is_excluded(&["x", "~~~old", "y", "a.jpg"], "~~~"));
    }

    #[test]
    fn reserved_prefix_on_a_file_name_is_allowed() {
        assert!(!is_excluded(&["~~~note.txt"], "~~~"));
    }

    #[test]
    fn empty_path_is_excluded() {
        let empty: [&str; 0] = [];
        assert!(is_excluded(&empty, "~~~"));
    }
}
