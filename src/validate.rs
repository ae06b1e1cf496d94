//! Strict-mode validation: detect unknown keys in settings files.
//!
//! Uses `serde_ignored` to deserialize into `C::Layer` (all-optional fields) and
//! capture any keys that the layer doesn't consume. Reports each unknown key with
//! its file path and best-effort line number.

use std::path::Path;

use confique::Config;
use serde::Deserialize;

use crate::error::RenvError;

/// Validate that a TOML settings file contains no keys unknown to `C`.
pub fn validate_unknown_keys<C: Config>(content: &str, path: &Path) -> Result<(), RenvError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let _layer: C::Layer = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| RenvError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let errors: Vec<RenvError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            RenvError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(RenvError::UnknownKeys(errors))
}

/// 1-indexed line of a key, or 0 when it cannot be located.
///
/// Tracks `[section]` headers so `tls.ca` is only matched inside `[tls]`. An
/// unknown table is reported at its header line. Quoted keys and inline tables
/// are not handled.
fn find_key_line(content: &str, dotted_key: &str) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let (leaf, expected_section) = match segments.split_last() {
        Some((leaf, section)) => (*leaf, section),
        None => return 0,
    };

    let mut current_section: Vec<&str> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header.split('.').map(str::trim).collect();
            if current_section == segments {
                return i + 1;
            }
            continue;
        }

        if current_section.as_slice() == expected_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("/test/renv.toml")
    }

    fn single_unknown(content: &str) -> (String, usize) {
        match validate_unknown_keys::<Settings>(content, &path()).unwrap_err() {
            RenvError::UnknownKeys(keys) => {
                assert_eq!(keys.len(), 1);
                match &keys[0] {
                    RenvError::UnknownKey { key, line, .. } => (key.clone(), *line),
                    other => panic!("Expected UnknownKey, got: {other:?}"),
                }
            }
            other => panic!("Expected UnknownKeys, got: {other:?}"),
        }
    }

    #[test]
    fn valid_settings_pass() {
        let content = r#"
hosts = ["10.0.0.1:4001", "10.0.0.2:4001"]
ssl = true
ca_paths = ["/etc/renv/ca.pem"]
cert_path = "/etc/renv/client.crt"
key_path = "/etc/renv/client.key"
"#;
        assert!(validate_unknown_keys::<Settings>(content, &path()).is_ok());
    }

    #[test]
    fn unknown_top_level_key() {
        let (key, line) = single_unknown("ssl = true\nhostz = [\"a\"]\n");
        assert_eq!(key, "hostz");
        assert_eq!(line, 2);
    }

    #[test]
    fn unknown_table_reports_header_line() {
        let (key, line) = single_unknown("ssl = true\n\n[tls]\nca = \"x\"\n");
        assert!(key.starts_with("tls"));
        assert!(line == 3 || line == 4, "line {line}");
    }

    #[test]
    fn multiple_unknown_keys() {
        let content = "typo1 = 1\ntypo2 = 2\n";
        match validate_unknown_keys::<Settings>(content, &path()).unwrap_err() {
            RenvError::UnknownKeys(keys) => assert_eq!(keys.len(), 2),
            other => panic!("Expected UnknownKeys, got: {other:?}"),
        }
    }

    #[test]
    fn line_number_skips_comments() {
        let (_, line) = single_unknown("ssl = false\n\n# comment\nbad_key = 1\n");
        assert_eq!(line, 4);
    }

    #[test]
    fn empty_content_ok() {
        assert!(validate_unknown_keys::<Settings>("", &path()).is_ok());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = validate_unknown_keys::<Settings>("hosts = [", &path()).unwrap_err();
        assert!(matches!(err, RenvError::ParseError { .. }));
    }
}
