//! `{task_work_directory}` placeholder substitution used by action specs
//! that reference a task's scratch directory without knowing its path
//! ahead of time.

const PLACEHOLDER: &str = "{task_work_directory}";

/// Substitute the literal placeholder with `work_dir`, if one is set.
/// With no work directory, the path is returned unchanged.
pub fn translate_path(path: &str, work_dir: Option<&str>) -> String {
    match work_dir {
        Some(dir) => path.replace(PLACEHOLDER, dir),
        None => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholder() {
        assert_eq!(
            translate_path("{task_work_directory}/source", Some("/tmp/task-3")),
            "/tmp/task-3/source"
        );
    }

    #[test]
    fn leaves_path_unchanged_without_work_dir() {
        assert_eq!(
            translate_path("{task_work_directory}/source", None),
            "{task_work_directory}/source"
        );
    }

    #[test]
    fn leaves_plain_path_unchanged() {
        assert_eq!(translate_path("/abs/path", Some("/tmp/x")), "/abs/path");
    }
}
