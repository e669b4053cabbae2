//! Process-wide defaults, per-call options and policy hooks.
//!
//! # Lifecycle
//! The process-wide [`Defaults`] are set once at startup with [`configure`]
//! and may be put back with [`reset`] (tests do this). Each call copies the
//! current defaults into its own snapshot before the first dispatch, so a
//! later `configure` never reaches a request that is already in flight.
//!
//! Options resolve in layers: call-site value, then the service-level value,
//! then the process-wide default, then the built-in default.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use crate::error::HttpError;
use crate::http::Response;
use crate::transport::TransportError;
use crate::types::{Decoded, Payload, ResponseType};

pub type RetryCheck = Arc<dyn Fn(Response) -> bool + Send + Sync>;
pub type ResponseCheck = Arc<dyn Fn(Response) -> bool + Send + Sync>;
pub type ResponseProcessor =
    Arc<dyn Fn(Response, Option<ResponseType>) -> Result<Decoded, HttpError> + Send + Sync>;
pub type ErrorProcessor = Arc<dyn Fn(Response) -> String + Send + Sync>;
pub type NetworkErrorProcessor = Arc<dyn Fn(&TransportError) -> String + Send + Sync>;

/// Ordered header set with case-insensitive names.
///
/// A `None` value marks a header as explicitly unset: it still overrides a
/// lower layer during merging but is dropped when the final headers are
/// built, like an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Option<String>)>,
}

impl Headers {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name.into(), Some(value.into()));
    }

    /// Mark `name` as unset so it overrides lower layers with nothing.
    pub fn unset(&mut self, name: impl Into<String>) {
        self.set(name.into(), None);
    }

    fn set(&mut self, name: String, value: Option<String>) {
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// The entry for `name`: `Some(None)` when explicitly unset.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layer `overlay` on top of `self`; entries in `overlay` win.
    pub fn merged(&self, overlay: &Headers) -> Headers {
        let mut merged = self.clone();
        for (name, value) in &overlay.entries {
            merged.set(name.clone(), value.clone());
        }
        merged
    }

    /// Final header list with unset and empty values dropped.
    pub fn resolve(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(name, value)| match value {
                Some(value) if !value.is_empty() => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Process-wide request defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Prepended to every request path.
    pub path_prefix: String,
    /// Maximum number of re-dispatches when the retry check asks for one.
    pub retry_count: u32,
    pub headers: Headers,
}

impl Defaults {
    const INITIAL: Defaults = Defaults {
        path_prefix: String::new(),
        retry_count: 1,
        headers: Headers::new(),
    };
}

impl Default for Defaults {
    fn default() -> Self {
        Self::INITIAL
    }
}

static DEFAULTS: RwLock<Defaults> = RwLock::new(Defaults::INITIAL);

/// Replace the process-wide defaults.
pub fn configure(defaults: Defaults) {
    tracing::debug!(
        path_prefix = %defaults.path_prefix,
        retry_count = defaults.retry_count,
        headers = defaults.headers.len(),
        "configuring process-wide request defaults"
    );
    *DEFAULTS.write().unwrap_or_else(PoisonError::into_inner) = defaults;
}

/// Snapshot of the current process-wide defaults.
pub fn defaults() -> Defaults {
    DEFAULTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Restore the initial process-wide defaults.
pub fn reset() {
    configure(Defaults::INITIAL);
}

/// Pluggable policy hooks. Unset hooks fall through to the next layer.
#[derive(Clone, Default)]
pub struct Policies {
    /// Asked after each dispatch whether to send the request again.
    pub check_response_retry: Option<RetryCheck>,
    /// Decides whether a response counts as a success.
    pub check_response: Option<ResponseCheck>,
    /// Decodes a valid response.
    pub process_response: Option<ResponseProcessor>,
    /// Derives the message for a rejected response.
    pub process_error: Option<ErrorProcessor>,
    /// Derives the message for a transport failure.
    pub process_network_error: Option<NetworkErrorProcessor>,
}

impl Policies {
    /// Fill every unset hook from `fallback`.
    pub fn or(self, fallback: &Policies) -> Policies {
        Policies {
            check_response_retry: self
                .check_response_retry
                .or_else(|| fallback.check_response_retry.clone()),
            check_response: self
                .check_response
                .or_else(|| fallback.check_response.clone()),
            process_response: self
                .process_response
                .or_else(|| fallback.process_response.clone()),
            process_error: self
                .process_error
                .or_else(|| fallback.process_error.clone()),
            process_network_error: self
                .process_network_error
                .or_else(|| fallback.process_network_error.clone()),
        }
    }
}

impl fmt::Debug for Policies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policies")
            .field("check_response_retry", &self.check_response_retry.is_some())
            .field("check_response", &self.check_response.is_some())
            .field("process_response", &self.process_response.is_some())
            .field("process_error", &self.process_error.is_some())
            .field("process_network_error", &self.process_network_error.is_some())
            .finish()
    }
}

/// Per-call request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub response_type: Option<ResponseType>,
    pub headers: Headers,
    pub retry_count: Option<u32>,
    pub path_prefix: Option<String>,
    pub data: Option<Payload>,
    pub signal: Option<CancellationToken>,
    pub policies: Policies,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Suppress a header that a default would otherwise add.
    pub fn remove_header(mut self, name: impl Into<String>) -> Self {
        self.headers.unset(name);
        self
    }

    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(path_prefix.into());
        self
    }

    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn check_response_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> bool + Send + Sync + 'static,
    {
        self.policies.check_response_retry = Some(Arc::new(f));
        self
    }

    pub fn check_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> bool + Send + Sync + 'static,
    {
        self.policies.check_response = Some(Arc::new(f));
        self
    }

    pub fn process_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Response, Option<ResponseType>) -> Result<Decoded, HttpError> + Send + Sync + 'static,
    {
        self.policies.process_response = Some(Arc::new(f));
        self
    }

    pub fn process_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> String + Send + Sync + 'static,
    {
        self.policies.process_error = Some(Arc::new(f));
        self
    }

    pub fn process_network_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TransportError) -> String + Send + Sync + 'static,
    {
        self.policies.process_network_error = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_replace_case_insensitively() {
        let mut headers = Headers::new();
        headers.insert("Accept", "text/html");
        headers.insert("accept", "*/*");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("ACCEPT"), Some(Some("*/*")));
    }

    #[test]
    fn merged_overlay_wins() {
        let base: Headers = [("Authorization", "Bearer a"), ("X-Trace", "1")]
            .into_iter()
            .collect();
        let overlay: Headers = [("authorization", "Bearer b")].into_iter().collect();
        let resolved = base.merged(&overlay).resolve();
        assert_eq!(
            resolved,
            vec![
                ("Authorization".to_string(), "Bearer b".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn resolve_drops_unset_and_empty_values() {
        let mut headers = Headers::new();
        headers.insert("X-Empty", "");
        headers.insert("X-Kept", "yes");
        headers.unset("X-Gone");
        assert_eq!(
            headers.resolve(),
            vec![("X-Kept".to_string(), "yes".to_string())]
        );
    }

    #[test]
    fn unset_overrides_lower_layer() {
        let base: Headers = [("X-Client", "web")].into_iter().collect();
        let mut overlay = Headers::new();
        overlay.unset("x-client");
        assert!(base.merged(&overlay).resolve().is_empty());
    }

    #[test]
    fn defaults_start_with_single_retry_and_empty_prefix() {
        let defaults = Defaults::default();
        assert_eq!(defaults.path_prefix, "");
        assert_eq!(defaults.retry_count, 1);
        assert!(defaults.headers.is_empty());
    }

    #[test]
    fn policies_or_keeps_call_site_hooks() {
        let call = Policies {
            check_response: Some(Arc::new(|_: Response| false)),
            ..Policies::default()
        };
        let service = Policies {
            check_response: Some(Arc::new(|_: Response| true)),
            process_error: Some(Arc::new(|_: Response| "service".to_string())),
            ..Policies::default()
        };
        let merged = call.or(&service);
        let check = merged.check_response.unwrap();
        assert!(!check(Response::new(200, "")));
        let process_error = merged.process_error.unwrap();
        assert_eq!(process_error(Response::new(500, "")), "service");
        assert!(merged.check_response_retry.is_none());
    }

    #[test]
    fn options_builder_collects_fields() {
        let options = RequestOptions::new()
            .response_type(ResponseType::Text)
            .header("X-Id", "1")
            .remove_header("Accept")
            .retry_count(3)
            .path_prefix("/api")
            .data("raw");
        assert_eq!(options.response_type, Some(ResponseType::Text));
        assert_eq!(options.headers.get("x-id"), Some(Some("1")));
        assert_eq!(options.headers.get("accept"), Some(None));
        assert_eq!(options.retry_count, Some(3));
        assert_eq!(options.path_prefix.as_deref(), Some("/api"));
        assert_eq!(options.data, Some(Payload::Text("raw".to_string())));
    }
}
