//! Permissive query-parameter coercion
//!
//! Upstream callers send everything as strings; values that don't parse
//! fall back to defaults instead of rejecting the request, matching the
//! sanitize-and-continue contract of the API.

use std::collections::HashMap;

/// Integer param with a default (non-numeric → default)
pub fn int_or(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

/// Optional positive integer param (absent, zero, or garbage → None)
pub fn positive_int(params: &HashMap<String, String>, key: &str) -> Option<i64> {
    params
        .get(key)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

/// Optional boolean param; accepts the usual truthy spellings
pub fn opt_bool(params: &HashMap<String, String>, key: &str) -> Option<bool> {
    params
        .get(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Optional trimmed non-empty string param
pub fn non_empty(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ints_fall_back_on_garbage() {
        let p = params(&[("page", "3"), ("count", "abc")]);

        assert_eq!(int_or(&p, "page", 1), 3);
        assert_eq!(int_or(&p, "count", 50), 50);
        assert_eq!(int_or(&p, "missing", 7), 7);
    }

    #[test]
    fn positive_int_filters_zero_and_garbage() {
        let p = params(&[("genre", "28"), ("tag", "0"), ("bad", "x")]);

        assert_eq!(positive_int(&p, "genre"), Some(28));
        assert_eq!(positive_int(&p, "tag"), None);
        assert_eq!(positive_int(&p, "bad"), None);
        assert_eq!(positive_int(&p, "missing"), None);
    }

    #[test]
    fn bools_accept_truthy_spellings() {
        let p = params(&[("a", "true"), ("b", "1"), ("c", "no"), ("d", "FALSE")]);

        assert_eq!(opt_bool(&p, "a"), Some(true));
        assert_eq!(opt_bool(&p, "b"), Some(true));
        assert_eq!(opt_bool(&p, "c"), Some(false));
        assert_eq!(opt_bool(&p, "d"), Some(false));
        assert_eq!(opt_bool(&p, "missing"), None);
    }

    #[test]
    fn strings_are_trimmed_and_emptiness_is_absence() {
        let p = params(&[("keyword", "  matrix  "), ("blank", "   ")]);

        assert_eq!(non_empty(&p, "keyword").as_deref(), Some("matrix"));
        assert_eq!(non_empty(&p, "blank"), None);
    }
}
