//! Discovery and loading of settings files.
//!
//! Each [`SearchPath`] resolves to one directory, which is checked for
//! `{dir}/{file_name}`. Every file found is returned, in search-path order
//! (first = lowest priority). Missing files and unresolvable directories are
//! skipped; only real I/O errors (permissions, etc.) are propagated.

use std::path::PathBuf;

use crate::error::RenvError;
use crate::types::SearchPath;

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Load every settings file found across the search paths, lowest priority first.
pub fn load_settings_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Vec<(PathBuf, String)>, RenvError> {
    let mut results = Vec::new();
    for dir in search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
    {
        let file_path = dir.join(file_name);
        match std::fs::read_to_string(&file_path) {
            Ok(content) => results.push((file_path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(RenvError::IoError {
                    path: file_path,
                    source: e,
                });
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_explicit_path() {
        let p = PathBuf::from("/tmp/renv");
        let resolved = resolve_search_path(&SearchPath::Path(p.clone()), "ignored");
        assert_eq!(resolved, Some(p));
    }

    #[test]
    fn home_subdirectory_is_under_home() {
        if let Some(resolved) = resolve_search_path(&SearchPath::Home(".renv"), "renv") {
            assert!(resolved.ends_with(".renv"));
        }
    }

    #[test]
    fn load_no_files_exist() {
        let dir = TempDir::new().unwrap();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let files = load_settings_files(&paths, "renv.toml", "renv").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn load_files_in_search_order() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("renv.toml"), "ssl = true\n").unwrap();
        fs::write(dir2.path().join("renv.toml"), "hosts = [\"a:4001\"]\n").unwrap();

        let paths = vec![
            SearchPath::Path(dir1.path().to_path_buf()),
            SearchPath::Path(dir2.path().to_path_buf()),
        ];
        let files = load_settings_files(&paths, "renv.toml", "renv").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].1.contains("ssl"));
        assert!(files[1].1.contains("hosts"));
    }

    #[test]
    fn missing_file_silently_skipped() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir2.path().join("renv.toml"), "ssl = false\n").unwrap();

        let paths = vec![
            SearchPath::Path(dir1.path().to_path_buf()),
            SearchPath::Path(dir2.path().to_path_buf()),
        ];
        let files = load_settings_files(&paths, "renv.toml", "renv").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, dir2.path().join("renv.toml"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_returns_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("renv.toml");
        fs::write(&file_path, "ssl = true\n").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read mode-000 files; only assert when the read really fails.
        let readable = fs::read_to_string(&file_path).is_ok();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let result = load_settings_files(&paths, "renv.toml", "renv");
        if !readable {
            assert!(matches!(result, Err(RenvError::IoError { .. })));
        }

        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();
    }
}
