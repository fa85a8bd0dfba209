// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config errors as miette diagnostics.
//!
//! Figment reports unknown keys and type mismatches against a dotted path.
//! These are mapped onto the `[modem]`, `[server]`, `[queue]` and `[daemon]`
//! tables: a value read from a TOML file gets a span on the offending line,
//! and a value read from the environment names its `SMSD_*` variable.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::{Error as FigmentError, Kind};
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Source name used for configuration passed as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// Top-level tables of `smsd.toml`.
pub const SECTIONS: [&str; 4] = ["modem", "server", "queue", "daemon"];

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A top-level table or key outside [`SECTIONS`].
    #[error("unknown section `{name}`")]
    #[diagnostic(
        code(smsd::config::unknown_section),
        help("{}", unknown_section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("not an smsd section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the table does not accept, e.g. `baud_rte` in `[modem]`.
    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(
        code(smsd::config::unknown_key),
        help("{}", unknown_key_help(section, suggestion.as_deref(), valid_keys, env_var.as_deref()))
    )]
    UnknownKey {
        key: String,
        section: String,
        suggestion: Option<String>,
        /// Every key `[section]` accepts.
        valid_keys: Vec<String>,
        /// Set when the key came from the environment.
        env_var: Option<String>,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, e.g. `port = "eighty"`.
    #[error("`{key}` must be {expected}, found {found}")]
    #[diagnostic(
        code(smsd::config::invalid_type),
        help("{}", invalid_type_help(expected, env_var.as_deref()))
    )]
    InvalidType {
        /// Dotted path such as `server.port`.
        key: String,
        found: String,
        expected: String,
        env_var: Option<String>,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A semantic check failed after the config was parsed.
    #[error("validation error: {message}")]
    #[diagnostic(code(smsd::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(smsd::config::other))]
    Other(String),
}

fn unknown_section_help(suggestion: Option<&str>) -> String {
    let tables = SECTIONS.map(|s| format!("[{s}]")).join(", ");
    match suggestion {
        Some(s) => format!("did you mean `[{s}]`? smsd.toml has only {tables}"),
        None => format!("smsd.toml has only {tables}"),
    }
}

fn unknown_key_help(
    section: &str,
    suggestion: Option<&str>,
    valid_keys: &[String],
    env_var: Option<&str>,
) -> String {
    let mut help = match suggestion {
        Some(s) => format!("did you mean `{s}`? "),
        None => String::new(),
    };
    help.push_str(&format!("[{section}] accepts: {}", valid_keys.join(", ")));
    if let Some(var) = env_var {
        help.push_str(&format!("; unset or rename `{var}`"));
    }
    help
}

fn invalid_type_help(expected: &str, env_var: Option<&str>) -> String {
    match env_var {
        Some(var) => format!("set `{var}` to {expected}"),
        None => format!("use {expected} here"),
    }
}

/// Where a figment value was read from.
enum Origin {
    /// A TOML file or inline string, named as in the source list.
    Toml(String),
    Env,
    Unknown,
}

fn origin(error: &FigmentError) -> Origin {
    let Some(metadata) = error.metadata.as_ref() else {
        return Origin::Unknown;
    };
    match &metadata.source {
        Some(figment::Source::File(path)) => Origin::Toml(path.display().to_string()),
        _ if metadata.name.contains("environment variable") => Origin::Env,
        _ if metadata.name.contains("source string") => Origin::Toml(INLINE_SOURCE.to_string()),
        _ => Origin::Unknown,
    }
}

/// `SMSD_QUEUE_MAX_QUEUE` for `["queue"]` + `max_queue`.
pub fn env_var_name(table: &[String], field: &str) -> String {
    let mut name = String::from("SMSD");
    for part in table.iter().map(String::as_str).chain([field]) {
        name.push('_');
        name.push_str(&part.to_ascii_uppercase());
    }
    name
}

/// Convert every error inside a `figment::Error` into a [`ConfigError`].
///
/// `toml_sources` pairs a source name (file path or [`INLINE_SOURCE`]) with its
/// content; it is only used to resolve spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &FigmentError, toml_sources: &[(String, String)]) -> ConfigError {
    let origin = origin(error);
    let env_var = |table: &[String], field: &str| {
        matches!(origin, Origin::Env).then(|| env_var_name(table, field))
    };

    match &error.kind {
        Kind::UnknownField(name, expected) if error.path.is_empty() => {
            let (span, src) = locate(&origin, toml_sources, |content| {
                find_header(content, name).or_else(|| {
                    find_key_offset(content, &[], name).map(|offset| (offset, name.len()))
                })
            });
            ConfigError::UnknownSection {
                name: name.clone(),
                suggestion: suggest_key(name, expected),
                span,
                src,
            }
        }
        Kind::UnknownField(key, expected) => {
            let (span, src) = locate(&origin, toml_sources, |content| {
                find_key_offset(content, &error.path, key).map(|offset| (offset, key.len()))
            });
            ConfigError::UnknownKey {
                key: key.clone(),
                section: error.path.join("."),
                suggestion: suggest_key(key, expected),
                valid_keys: expected.iter().map(|k| k.to_string()).collect(),
                env_var: env_var(&error.path, key),
                span,
                src,
            }
        }
        Kind::InvalidType(found, expected) => match error.path.split_last() {
            Some((field, table)) => {
                let (span, src) = locate(&origin, toml_sources, |content| {
                    find_value_span(content, table, field)
                });
                ConfigError::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                    env_var: env_var(table, field),
                    span,
                    src,
                }
            }
            None => ConfigError::Other(error.to_string()),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Resolve a span in the TOML source the error came from.
fn locate(
    origin: &Origin,
    toml_sources: &[(String, String)],
    find: impl Fn(&str) -> Option<(usize, usize)>,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Origin::Toml(name) = origin else {
        return (None, None);
    };
    toml_sources
        .iter()
        .find(|(source, _)| source == name)
        .and_then(|(source, content)| {
            let (offset, len) = find(content)?;
            Some((
                Some(SourceSpan::new(offset.into(), len)),
                Some(NamedSource::new(source, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Offset and length of a `[name]` table header.
fn find_header(content: &str, name: &str) -> Option<(usize, usize)> {
    let header = format!("[{name}]");
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(&header) {
            return Some((offset + line.len() - trimmed.len(), header.len()));
        }
        offset += line.len();
    }
    None
}

/// Byte offset of `field = ...` inside the `[table]` section.
///
/// An empty `table` searches the keys before the first header. The search
/// stops at the next header.
pub fn find_key_offset(content: &str, table: &[String], field: &str) -> Option<usize> {
    let start = match table.first() {
        None => 0,
        Some(section) => {
            let (offset, len) = find_header(content, section)?;
            offset + len
        }
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && (offset > start || table.is_empty()) {
            return None;
        }
        if let Some(after) = trimmed.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + line.len() - trimmed.len());
        }
        offset += line.len();
    }
    None
}

/// Offset and length of the value in `field = value`, without a trailing comment.
fn find_value_span(content: &str, table: &[String], field: &str) -> Option<(usize, usize)> {
    let key = find_key_offset(content, table, field)?;
    let line = content[key..].lines().next()?;
    let eq = line.find('=')?;
    let raw = &line[eq + 1..];
    let value = raw.trim_start();
    let value = match value.find(" #") {
        Some(comment) if !value.starts_with('"') => &value[..comment],
        _ => value,
    }
    .trim_end();
    if value.is_empty() {
        return None;
    }
    Some((key + eq + 1 + (raw.len() - raw.trim_start().len()), value.len()))
}

/// Closest valid name by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn suggests_close_modem_key() {
        let valid = &["device", "baud_rate", "rtscts", "xon", "xoff"];
        assert_eq!(suggest_key("baud_rte", valid), Some("baud_rate".to_string()));
    }

    #[test]
    fn suggests_close_queue_key() {
        let valid = &["max_queue", "message_retries", "log_size", "wake_interval_secs"];
        assert_eq!(
            suggest_key("mesage_retries", valid),
            Some("message_retries".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port", "enable_dashboard"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn suggests_section_name() {
        assert_eq!(suggest_key("modme", &SECTIONS), Some("modem".to_string()));
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[server]\nport = 80\n\n[queue]\nmax_queu = 5\n";
        let o = find_key_offset(content, &table("queue"), "max_queu").unwrap();
        assert_eq!(&content[o..o + 8], "max_queu");
    }

    #[test]
    fn find_key_offset_stays_within_section() {
        let content = "[queue]\nlog_size = 5\n\n[server]\nport = 80\n";
        assert_eq!(find_key_offset(content, &table("queue"), "port"), None);
    }

    #[test]
    fn find_key_offset_ignores_commented_header() {
        let content = "# [queue] is below\n[queue]\nlog_size = 5\n";
        let o = find_key_offset(content, &table("queue"), "log_size").unwrap();
        assert_eq!(&content[o..o + 8], "log_size");
    }

    #[test]
    fn value_span_skips_quotes_and_comments() {
        let content = "[server]\nport = \"eighty\"\n[queue]\nmax_queue = ten # bad\n";
        let (o, len) = find_value_span(content, &table("server"), "port").unwrap();
        assert_eq!(&content[o..o + len], "\"eighty\"");
        let (o, len) = find_value_span(content, &table("queue"), "max_queue").unwrap();
        assert_eq!(&content[o..o + len], "ten");
    }

    #[test]
    fn header_span_covers_brackets() {
        let content = "[modem]\ndevice = \"/dev/ttyS0\"\n\n[modme]\n";
        let (o, len) = find_header(content, "modme").unwrap();
        assert_eq!(&content[o..o + len], "[modme]");
    }

    #[test]
    fn env_var_names_follow_loader_mapping() {
        assert_eq!(env_var_name(&table("queue"), "max_queue"), "SMSD_QUEUE_MAX_QUEUE");
        assert_eq!(env_var_name(&[], "verbose"), "SMSD_VERBOSE");
    }

    #[test]
    fn unknown_key_help_lists_section_keys() {
        let valid = vec!["host".to_string(), "port".to_string()];
        let help = unknown_key_help("server", Some("port"), &valid, Some("SMSD_SERVER_PROT"));
        assert_eq!(
            help,
            "did you mean `port`? [server] accepts: host, port; unset or rename `SMSD_SERVER_PROT`"
        );
    }

    #[test]
    fn section_help_lists_all_tables() {
        let help = unknown_section_help(None);
        assert_eq!(help, "smsd.toml has only [modem], [server], [queue], [daemon]");
    }
}
