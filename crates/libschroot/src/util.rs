//! String and path helpers.
//!
//! Paths are manipulated as strings here. The semantics of [`basename`] and
//! [`dirname`] follow basename(3) and dirname(3), which differ from
//! `std::path` for trailing slashes and the root directory.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

/// Chroot names and aliases: anything goes except a leading '.', ':', '/'
/// or ',' and embedded ':', '/' or ','.
static CHROOT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:/,.][^:/,]*$").expect("valid pattern"));

/// User-supplied session names are held to a stricter grammar, since they
/// become file names under the session directory.
static SESSION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid pattern"));

pub fn is_valid_chroot_name(name: &str) -> bool {
    CHROOT_NAME_RE.is_match(name)
}

pub fn is_valid_session_name(name: &str) -> bool {
    SESSION_NAME_RE.is_match(name)
}

/// Remove the leading directory components from a path.
pub fn basename(path: &str) -> String {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        return "/".to_string();
    }
    match stripped.rfind('/') {
        Some(pos) => stripped[pos + 1..].to_string(),
        None => stripped.to_string(),
    }
}

/// Remove the trailing component from a path.
pub fn dirname(path: &str) -> String {
    let stripped = path.trim_end_matches('/');
    if stripped.is_empty() {
        return "/".to_string();
    }
    match stripped.rfind('/') {
        Some(0) => "/".to_string(),
        Some(pos) => stripped[..pos].trim_end_matches('/').to_string(),
        None => ".".to_string(),
    }
}

/// Split a string on any of the characters in `separators`, dropping empty
/// tokens.
pub fn split_string(value: &str, separators: &str) -> Vec<String> {
    value
        .split(|c| separators.contains(c))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Join a list of strings with `separator`.
pub fn string_list_to_string(list: &[String], separator: &str) -> String {
    list.join(separator)
}

/// Look up an executable in a colon-separated search path. `prefix` is
/// prepended to each candidate before the existence check but is not part
/// of the returned path.
pub fn find_program_in_path(program: &str, path: &str, prefix: &str) -> Option<String> {
    if program.contains('/') {
        return None;
    }

    for dir in split_string(path, ":") {
        let candidate = PathBuf::from(&dir).join(program);

        let real = if prefix.is_empty() {
            candidate.clone()
        } else {
            PathBuf::from(prefix)
                .join(candidate.strip_prefix("/").unwrap_or(candidate.as_path()))
        };

        if let Ok(meta) = std::fs::metadata(&real) {
            if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
                return Some(candidate.to_string_lossy().into_owned());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use anyhow::Result;

    use super::*;

    #[test]
    fn basename_strips_leading_components() {
        assert_eq!(basename("/usr/bin/perl"), "perl");
        assert_eq!(basename("/usr/lib"), "lib");
        assert_eq!(basename("/usr/"), "usr");
        assert_eq!(basename("usr"), "usr");
        assert_eq!(basename("/"), "/");
        assert_eq!(basename("."), ".");
        assert_eq!(basename(".."), "..");
    }

    #[test]
    fn dirname_strips_trailing_component() {
        assert_eq!(dirname("/usr/bin/perl"), "/usr/bin");
        assert_eq!(dirname("/usr/lib"), "/usr");
        assert_eq!(dirname("/usr/"), "/");
        assert_eq!(dirname("usr"), ".");
        assert_eq!(dirname("/"), "/");
        assert_eq!(dirname("."), ".");
        assert_eq!(dirname(".."), ".");
    }

    #[test]
    fn split_drops_empty_tokens() {
        let items = split_string("/usr/share/info", "/");
        assert_eq!(items, vec!["usr", "share", "info"]);
    }

    #[test]
    fn join_with_separator() {
        let items = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        assert_eq!(string_list_to_string(&items, "--"), "foo--bar--baz");
    }

    #[test]
    fn find_program_walks_path_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        fs::create_dir(&first)?;
        fs::create_dir(&second)?;

        for d in [&first, &second] {
            let sh = d.join("sh");
            fs::write(&sh, "#!/bin/sh\n")?;
            fs::set_permissions(&sh, fs::Permissions::from_mode(0o755))?;
        }

        let path = format!("{}:{}", first.display(), second.display());
        assert_eq!(
            find_program_in_path("sh", &path, ""),
            Some(first.join("sh").to_string_lossy().into_owned())
        );
        assert_eq!(find_program_in_path("missing", &path, ""), None);
        Ok(())
    }

    #[test]
    fn find_program_ignores_non_executable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let data = dir.path().join("sh");
        fs::write(&data, "not a program")?;
        fs::set_permissions(&data, fs::Permissions::from_mode(0o644))?;

        let path = dir.path().to_string_lossy().into_owned();
        assert_eq!(find_program_in_path("sh", &path, ""), None);
        Ok(())
    }

    #[test]
    fn chroot_name_grammar() {
        assert!(is_valid_chroot_name("foobar"));
        assert!(is_valid_chroot_name("sid-snapshot"));
        assert!(!is_valid_chroot_name(":fail:"));
        assert!(!is_valid_chroot_name(".hidden"));
        assert!(!is_valid_chroot_name("a/b"));
        assert!(!is_valid_chroot_name("a,b"));
        assert!(!is_valid_chroot_name(""));
    }

    #[test]
    fn session_name_grammar() {
        assert!(is_valid_session_name("build-1"));
        assert!(is_valid_session_name("0abc.def"));
        assert!(!is_valid_session_name("-leading"));
        assert!(!is_valid_session_name("has space"));
        assert!(!is_valid_session_name(""));
    }
}
