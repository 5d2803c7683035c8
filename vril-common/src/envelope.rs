//! Uniform API response envelope
//!
//! Every handler packages its payload through an `Envelope`: named data
//! keys accumulate while the response is healthy, and a single error
//! message replaces them all when something fails. The packaged body is
//! always `{ "success": bool, "data": { ... } }`, with `data.error`
//! populated on failure. Wall-clock duration is measured from envelope
//! creation and included only when the service runs with the debug flag.

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Instant;

/// Accumulating success/error response wrapper
#[derive(Debug)]
pub struct Envelope {
    start: Instant,
    data: Map<String, Value>,
    error: bool,
    status: u16,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            data: Map::new(),
            error: false,
            status: 200,
        }
    }

    /// Add (or replace) a named data key.
    ///
    /// Once an error has been set the envelope is locked: in debug builds
    /// this trips an assertion, in release builds it is a no-op.
    pub fn add_data<T: Serialize>(&mut self, key: &str, value: T) -> &mut Self {
        if self.error {
            debug_assert!(false, "add_data called on errored envelope: {}", key);
            return self;
        }

        match serde_json::to_value(value) {
            Ok(v) => {
                self.data.insert(key.to_string(), v);
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to serialize envelope data");
                self.set_error(format!("Failed to serialize response data: {}", key), 500);
            }
        }

        self
    }

    /// Switch the envelope into its error state.
    ///
    /// Any accumulated data is discarded; the error message becomes the
    /// only data key. A second call on an already-errored envelope is a
    /// programming error (asserts in debug, no-op in release); there is
    /// no transition out of the error state.
    pub fn set_error(&mut self, message: impl Into<String>, status: u16) -> &mut Self {
        if self.error {
            debug_assert!(false, "set_error called twice on one envelope");
            return self;
        }

        self.data.clear();
        self.data
            .insert("error".to_string(), Value::String(message.into()));
        self.error = true;
        self.status = status;

        self
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Package the envelope for the wire.
    ///
    /// Consumes the envelope (nothing can be added after packaging) and
    /// returns the HTTP status plus the JSON body. Elapsed duration is
    /// attached only when `include_duration` is set.
    pub fn package(self, include_duration: bool) -> (u16, Value) {
        let mut body = json!({
            "success": !self.error,
            "data": Value::Object(self.data),
        });

        if include_duration {
            let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
            body["duration_ms"] = json!(elapsed_ms);
        }

        (self.status, body)
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_contains_named_keys() {
        let mut env = Envelope::new();
        env.add_data("meta", json!({"total": 3}));
        env.add_data("movies", json!([1, 2, 3]));

        let (status, body) = env.package(false);

        assert_eq!(status, 200);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["meta"]["total"], json!(3));
        assert_eq!(body["data"]["movies"], json!([1, 2, 3]));
        assert!(body.get("duration_ms").is_none());
    }

    #[test]
    fn error_wipes_prior_data() {
        let mut env = Envelope::new();
        env.add_data("movies", json!([1, 2, 3]));
        env.set_error("upstream fell over", 500);

        let (status, body) = env.package(false);

        assert_eq!(status, 500);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["data"]["error"], json!("upstream fell over"));
        assert!(body["data"].get("movies").is_none());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn add_data_after_error_is_noop_in_release() {
        let mut env = Envelope::new();
        env.set_error("boom", 500);
        env.add_data("movies", json!([1]));

        let (_, body) = env.package(false);
        assert!(body["data"].get("movies").is_none());
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn add_data_after_error_asserts_in_debug() {
        let mut env = Envelope::new();
        env.set_error("boom", 500);
        env.add_data("movies", json!([1]));
    }

    #[test]
    fn duration_included_when_debug_enabled() {
        let env = Envelope::new();
        let (_, body) = env.package(true);

        assert!(body["duration_ms"].is_number());
    }
}
