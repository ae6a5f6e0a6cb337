//! Environment variable helpers
//!
//! `env_get` is lenient (unset or unparseable falls back to the default);
//! `env_get_strict` is for values where a typo must not be silently
//! replaced by a default, such as the dispatcher policies.
//!
//! ```ignore
//! use ingest_core::env::{env_get, env_get_bool, env_get_strict};
//!
//! let port: u16 = env_get("INGEST_PORT", 8080);
//! let daemonize = env_get_bool("INGEST_DAEMONIZE", true);
//! let policy: Option<ReadErrorPolicy> = env_get_strict("INGEST_READ_ERROR_POLICY")?;
//! ```

use std::fmt;
use std::str::FromStr;

/// `Some(v)` when `key` is set and parses (surrounding whitespace ignored).
pub fn env_get_opt<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Parse `key` as `T`, or return `default` when unset or unparseable.
pub fn env_get<T: FromStr>(key: &str, default: T) -> T {
    env_get_opt(key).unwrap_or(default)
}

/// Unset returns `default`. Any set value is a flag: `1`, `true`, `yes`
/// and `on` (any case) are true, everything else is false.
pub fn env_get_bool(key: &str, default: bool) -> bool {
    std::env::var(key).map_or(default, |v| is_truthy(&v))
}

fn is_truthy(v: &str) -> bool {
    let v = v.trim();
    ["1", "true", "yes", "on"].iter().any(|t| v.eq_ignore_ascii_case(t))
}

/// A set-but-invalid environment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvError {
    pub key: String,
    pub value: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value {:?} for {}", self.value, self.key)
    }
}

impl std::error::Error for EnvError {}

/// `Ok(None)` when unset, `Ok(Some(v))` when it parses, `Err` otherwise.
pub fn env_get_strict<T>(key: &str) -> Result<Option<T>, EnvError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| EnvError {
            key: key.to_string(),
            value: raw,
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variable names; the harness runs tests in parallel.

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__INGEST_TEST_UNSET_1__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__INGEST_TEST_NUM__", " 123 ");
        let val: usize = env_get("__INGEST_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__INGEST_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_falls_back() {
        std::env::set_var("__INGEST_TEST_INVALID__", "not_a_number");
        let val: u16 = env_get("__INGEST_TEST_INVALID__", 8080);
        assert_eq!(val, 8080);
        std::env::remove_var("__INGEST_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__INGEST_TEST_UNSET_2__", true));
        assert!(!env_get_bool("__INGEST_TEST_UNSET_2__", false));

        for truthy in ["1", "true", "TRUE", "yes", "on"] {
            std::env::set_var("__INGEST_TEST_BOOL__", truthy);
            assert!(env_get_bool("__INGEST_TEST_BOOL__", false), "{truthy}");
        }
        for falsy in ["0", "false", "garbage"] {
            std::env::set_var("__INGEST_TEST_BOOL__", falsy);
            assert!(!env_get_bool("__INGEST_TEST_BOOL__", true), "{falsy}");
        }
        std::env::remove_var("__INGEST_TEST_BOOL__");
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<usize> = env_get_opt("__INGEST_TEST_UNSET_3__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_strict() {
        let unset: Result<Option<u32>, _> = env_get_strict("__INGEST_TEST_UNSET_4__");
        assert_eq!(unset, Ok(None));

        std::env::set_var("__INGEST_TEST_STRICT__", "17");
        assert_eq!(env_get_strict::<u32>("__INGEST_TEST_STRICT__"), Ok(Some(17)));

        std::env::set_var("__INGEST_TEST_STRICT__", "seventeen");
        let err = env_get_strict::<u32>("__INGEST_TEST_STRICT__").unwrap_err();
        assert_eq!(err.key, "__INGEST_TEST_STRICT__");
        assert_eq!(err.value, "seventeen");
        std::env::remove_var("__INGEST_TEST_STRICT__");
    }
}
