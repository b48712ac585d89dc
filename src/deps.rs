use std::path::PathBuf;

use crate::error::LrtError;

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

pub fn missing_executables(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .filter(|name| find_in_path(name).is_none())
        .map(|name| name.to_string())
        .collect()
}

pub fn require_executables(names: &[&str]) -> Result<(), LrtError> {
    let missing = missing_executables(names);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LrtError::MissingExecutables(missing.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn finds_a_shell() {
        assert!(find_in_path("sh").is_some());
    }

    #[test]
    fn reports_all_missing_names() {
        let missing = missing_executables(&["sh", "definitely-not-a-real-tool-1"]);
        assert_eq!(missing, vec!["definitely-not-a-real-tool-1".to_string()]);

        let err = require_executables(&["definitely-not-a-real-tool-1"]).unwrap_err();
        assert_matches!(err, LrtError::MissingExecutables(_));
    }
}
