//! Environment interpolation and duration parsing for config values.

use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};

use super::error::ConfigError;

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(?P<name>[A-Za-z_][A-Za-z0-9_]*)(?::-(?P<default>[^}]*))?\}")
        .expect("env reference pattern is valid")
});

/// Parse a humantime duration such as `500ms`, `30s` or `1m30s`.
///
/// Used for duration flags on the command line. Zero is rejected: every
/// duration pingwatch accepts is an interval or a deadline.
///
/// # Examples
///
/// ```
/// use pingwatch::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("500ms").unwrap().as_millis(), 500);
/// assert!(parse_duration("0s").is_err());
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(s.trim()).map_err(|e| format!("'{s}': {e}"))?;
    if duration.is_zero() {
        return Err(format!("'{s}': duration must be non-zero"));
    }
    Ok(duration)
}

/// Substitute `${NAME}` and `${NAME:-default}` references from the process
/// environment.
///
/// Lines that are YAML comments are copied unchanged.
///
/// # Errors
/// Returns `ConfigError::UndefinedVariable` for the first `${NAME}` whose
/// variable is unset and which has no default.
pub fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(
    input: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());

    for (index, line) in input.split_inclusive('\n').enumerate() {
        if line.trim_start().starts_with('#') {
            output.push_str(line);
            continue;
        }

        let mut undefined = None;
        let expanded = ENV_REF.replace_all(line, |caps: &Captures| {
            if let Some(value) = lookup(&caps["name"]) {
                return value;
            }
            match caps.name("default") {
                Some(default) => default.as_str().to_string(),
                None => {
                    undefined.get_or_insert_with(|| caps["name"].to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = undefined {
            return Err(ConfigError::UndefinedVariable {
                name,
                line: index + 1,
            });
        }
        output.push_str(&expanded);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_duration_rejects_zero_and_garbage() {
        assert!(parse_duration("0s").unwrap_err().contains("non-zero"));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("30").is_err());
        assert!(parse_duration("fast").is_err());
    }

    #[test]
    fn test_expand_set_variable() {
        let text = expand_with("address: ${GATEWAY}\n", vars(&[("GATEWAY", "10.0.0.1")])).unwrap();
        assert_eq!(text, "address: 10.0.0.1\n");
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        let text = expand_with("address: ${GATEWAY:-192.168.1.1}", vars(&[])).unwrap();
        assert_eq!(text, "address: 192.168.1.1");
    }

    #[test]
    fn test_expand_set_variable_beats_default() {
        let text = expand_with("port: ${PORT:-9056}", vars(&[("PORT", "9100")])).unwrap();
        assert_eq!(text, "port: 9100");
    }

    #[test]
    fn test_expand_empty_default_allowed() {
        let text = expand_with("log_filter: ${FILTER:-}", vars(&[])).unwrap();
        assert_eq!(text, "log_filter: ");
    }

    #[test]
    fn test_expand_undefined_reports_line() {
        let input = "interval: 30s\ntargets:\n  - name: gw\n    address: ${GATEWAY}\n";
        match expand_with(input, vars(&[])) {
            Err(ConfigError::UndefinedVariable { name, line }) => {
                assert_eq!(name, "GATEWAY");
                assert_eq!(line, 4);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_expand_skips_comment_lines() {
        let input = "# set ${GATEWAY} before starting\naddress: 1.1.1.1\n";
        assert_eq!(expand_with(input, vars(&[])).unwrap(), input);
    }

    #[test]
    fn test_expand_from_process_environment() {
        let text = expand_env_vars("address: ${PINGWATCH_TEST_UNSET_HOST_93817:-8.8.8.8}").unwrap();
        assert_eq!(text, "address: 8.8.8.8");
    }
}
