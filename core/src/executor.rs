//! Request execution pipeline.
//!
//! Each call runs strictly in order: resolve options, assemble headers,
//! encode the body, dispatch, retry while the retry check asks for it,
//! validate, decode. Every inspection before decoding works on a duplicate
//! of the response; decoding consumes the original.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{
    self, Defaults, ErrorProcessor, NetworkErrorProcessor, Policies, RequestOptions, ResponseCheck,
    ResponseProcessor, RetryCheck,
};
use crate::error::HttpError;
use crate::http::{HttpMethod, HttpRequest, RequestBody, Response};
use crate::transport::{Transport, TransportError};
use crate::types::{Decoded, Payload, ResponseType};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A response is valid when its status is 2xx.
pub fn default_check_response(response: Response) -> bool {
    response.ok()
}

/// Decode `response` according to `response_type`.
///
/// Without an explicit type the `Content-Type` header decides: JSON when it
/// mentions `application/json`, text otherwise.
pub fn decode_response(
    response: Response,
    response_type: Option<ResponseType>,
) -> Result<Decoded, HttpError> {
    match response_type {
        Some(ResponseType::Text) => response.text().map(Decoded::Text),
        Some(ResponseType::Blob) => Ok(Decoded::Blob(response.blob())),
        Some(ResponseType::Response) => Ok(Decoded::Response(response)),
        Some(ResponseType::Json) => response.json().map(Decoded::Json),
        None => {
            let is_json = response
                .header(CONTENT_TYPE)
                .is_some_and(|value| value.contains(CONTENT_TYPE_JSON));
            if is_json {
                response.json().map(Decoded::Json)
            } else {
                response.text().map(Decoded::Text)
            }
        }
    }
}

/// The message of a rejected response is its body text.
pub fn default_process_error(response: Response) -> String {
    String::from_utf8_lossy(&response.body).into_owned()
}

/// The message of a transport failure is its display text.
pub fn default_process_network_error(error: &TransportError) -> String {
    error.to_string()
}

/// A call with every default and hook resolved, ready to dispatch.
///
/// Built synchronously when the call is made, so later changes to the
/// process-wide defaults or to the service never reach it.
pub(crate) struct PreparedRequest {
    pub(crate) request: HttpRequest,
    pub(crate) response_type: Option<ResponseType>,
    pub(crate) retry_count: u32,
    pub(crate) signal: Option<CancellationToken>,
    check_response_retry: Option<RetryCheck>,
    check_response: ResponseCheck,
    process_response: ResponseProcessor,
    process_error: ErrorProcessor,
    process_network_error: NetworkErrorProcessor,
}

/// Runs requests against a transport with service-level defaults and hooks.
#[derive(Clone)]
pub(crate) struct Executor {
    pub(crate) transport: Arc<dyn Transport>,
    /// Pinned defaults; the process-wide ones are read per call when unset.
    pub(crate) defaults: Option<Defaults>,
    pub(crate) policies: Policies,
}

impl Executor {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            defaults: None,
            policies: Policies::default(),
        }
    }

    pub(crate) async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<Decoded, HttpError> {
        let prepared = self.prepare(method, path, options)?;
        self.run(prepared).await
    }

    /// Snapshot defaults, merge headers, encode the body and resolve hooks.
    pub(crate) fn prepare(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<PreparedRequest, HttpError> {
        let defaults = self.defaults.clone().unwrap_or_else(config::defaults);
        let RequestOptions {
            response_type,
            mut headers,
            retry_count,
            path_prefix,
            data,
            signal,
            policies,
        } = options;

        let policies = policies.or(&self.policies);
        let check_response: ResponseCheck = match policies.check_response {
            Some(hook) => hook,
            None => Arc::new(default_check_response),
        };
        let process_response: ResponseProcessor = match policies.process_response {
            Some(hook) => hook,
            None => Arc::new(decode_response),
        };
        let process_error: ErrorProcessor = match policies.process_error {
            Some(hook) => hook,
            None => Arc::new(default_process_error),
        };
        let process_network_error: NetworkErrorProcessor = match policies.process_network_error {
            Some(hook) => hook,
            None => Arc::new(default_process_network_error),
        };

        let path_prefix = path_prefix.unwrap_or(defaults.path_prefix);

        if data.as_ref().is_some_and(Payload::is_form) {
            headers.unset(CONTENT_TYPE);
        }
        if response_type == Some(ResponseType::Blob) && headers.get(ACCEPT).flatten().is_none() {
            headers.insert(ACCEPT, "*/*");
        }

        let body = match data {
            Some(Payload::Json(value)) => {
                if !headers.contains(CONTENT_TYPE) && !defaults.headers.contains(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, CONTENT_TYPE_JSON);
                }
                Some(RequestBody::Text(serde_json::to_string(&value)?))
            }
            Some(Payload::Text(text)) => Some(RequestBody::Text(text)),
            Some(Payload::Form(form)) => Some(RequestBody::Form(form)),
            None => None,
        };

        Ok(PreparedRequest {
            request: HttpRequest {
                method,
                url: format!("{path_prefix}{path}"),
                headers: defaults.headers.merged(&headers).resolve(),
                body,
            },
            response_type,
            retry_count: retry_count.unwrap_or(defaults.retry_count),
            signal,
            check_response_retry: policies.check_response_retry,
            check_response,
            process_response,
            process_error,
            process_network_error,
        })
    }

    /// Dispatch, retry, validate and decode a prepared call.
    pub(crate) async fn run(&self, prepared: PreparedRequest) -> Result<Decoded, HttpError> {
        let PreparedRequest {
            request,
            response_type,
            retry_count,
            signal,
            check_response_retry,
            check_response,
            process_response,
            process_error,
            process_network_error,
        } = prepared;

        let mut attempt = 0;
        let mut response = self
            .dispatch(&request, attempt, signal.as_ref(), &process_network_error)
            .await?;

        if let Some(check_response_retry) = check_response_retry {
            while attempt < retry_count && check_response_retry(response.duplicate()) {
                attempt += 1;
                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    status = response.status,
                    remaining = retry_count - attempt,
                    "retrying request"
                );
                response = self
                    .dispatch(&request, attempt, signal.as_ref(), &process_network_error)
                    .await?;
            }
        }

        if !check_response(response.duplicate()) {
            let message = process_error(response.duplicate());
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                status = response.status,
                attempts = attempt + 1,
                "request rejected: {message}"
            );
            return Err(HttpError::Response { response, message });
        }

        tracing::debug!(response_type = ?response_type, "decoding response");
        process_response(response, response_type)
    }

    /// Send `request` once, racing it against `signal`.
    ///
    /// `attempt` is 0 for the initial send and counts up with each retry.
    async fn dispatch(
        &self,
        request: &HttpRequest,
        attempt: u32,
        signal: Option<&CancellationToken>,
        process_network_error: &NetworkErrorProcessor,
    ) -> Result<Response, HttpError> {
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            attempt,
            "dispatching request"
        );

        let send = self.transport.send(request.clone());
        let result = match signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => Err(TransportError::Aborted),
                result = send => result,
            },
            None => send.await,
        };

        result.map_err(|error| {
            let message = process_network_error(&error);
            tracing::warn!(
                method = %request.method,
                url = %request.url,
                attempt,
                "transport failure: {message}"
            );
            HttpError::Network { message }
        })
    }
}
