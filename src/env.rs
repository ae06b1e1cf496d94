use toml::{Table, Value};

/// How the text of an environment variable becomes a settings value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    /// Used as-is.
    Text,
    /// `true`/`false`/`1`/`0`, case-insensitive. Anything else stays text so
    /// deserialization reports it.
    Flag,
    /// Comma separated; blanks dropped.
    List,
}

/// Build a `toml::Table` from environment variables named `{PREFIX}_{FIELD}`.
///
/// Only the listed fields are picked up, so unrelated variables sharing the
/// prefix (`RENV_LOG`) are left alone. Field names are matched lowercased.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_table(
    prefix: &str,
    fields: &[(&str, EnvKind)],
    vars: impl IntoIterator<Item = (String, String)>,
) -> Table {
    let needle = format!("{prefix}_");
    let mut table = Table::new();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        let name = rest.to_lowercase();
        let Some((_, kind)) = fields.iter().find(|(field, _)| *field == name) else {
            continue;
        };
        table.insert(name, parse_env_value(&value, *kind));
    }

    table
}

fn parse_env_value(s: &str, kind: EnvKind) -> Value {
    match kind {
        EnvKind::Text => Value::String(s.to_string()),
        EnvKind::Flag => {
            if s.eq_ignore_ascii_case("true") || s == "1" {
                Value::Boolean(true)
            } else if s.eq_ignore_ascii_case("false") || s == "0" {
                Value::Boolean(false)
            } else {
                Value::String(s.to_string())
            }
        }
        EnvKind::List => Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        ),
    }
}
