//! Network transport seam.
//!
//! The executor never touches sockets. It hands an `HttpRequest` to a
//! [`Transport`] and gets a buffered [`Response`] back. Non-2xx statuses are
//! ordinary responses; only failures to complete the exchange are errors.

use async_trait::async_trait;

use crate::http::{HttpRequest, Response};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The exchange with the peer could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The caller aborted the request before a response arrived.
    #[error("the operation was aborted")]
    Aborted,

    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl TransportError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        TransportError::Failed(error.into())
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, TransportError::Aborted)
    }
}

/// Sends requests over the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Response, TransportError>;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::{ReqwestTransport, TransportConfig};

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::multipart::{Form, Part};
    use reqwest::{Client, ClientBuilder, Method};

    use super::{Transport, TransportError};
    use crate::http::{FormData, FormPart, HttpMethod, HttpRequest, RequestBody, Response};

    /// Settings for the underlying `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct TransportConfig {
        pub connect_timeout: Duration,
        /// Total time allowed for a request. `None` leaves a request running
        /// until it settles or its dispatch is aborted.
        pub request_timeout: Option<Duration>,
        pub user_agent: String,
        /// Maximum idle connections kept per host.
        pub pool_max_idle_per_host: usize,
    }

    impl Default for TransportConfig {
        fn default() -> Self {
            Self {
                connect_timeout: Duration::from_secs(10),
                request_timeout: None,
                user_agent: format!("http-service/{}", env!("CARGO_PKG_VERSION")),
                pool_max_idle_per_host: 10,
            }
        }
    }

    /// [`Transport`] backed by `reqwest`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self, TransportError> {
            Self::with_config(TransportConfig::default())
        }

        pub fn with_config(config: TransportConfig) -> Result<Self, TransportError> {
            let mut builder = ClientBuilder::new()
                .connect_timeout(config.connect_timeout)
                .user_agent(&config.user_agent)
                .pool_max_idle_per_host(config.pool_max_idle_per_host);
            if let Some(timeout) = config.request_timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder.build().map_err(TransportError::failed)?;
            Ok(Self { client })
        }

        /// Wrap an already configured client.
        pub fn from_client(client: Client) -> Self {
            Self { client }
        }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    fn multipart(form: FormData) -> Result<Form, TransportError> {
        let mut multipart = Form::new();
        for (name, part) in form.parts().iter().cloned() {
            multipart = match part {
                FormPart::Text(value) => multipart.text(name, value),
                FormPart::File {
                    file_name,
                    content_type,
                    data,
                } => {
                    let mut part = Part::bytes(data.to_vec()).file_name(file_name);
                    if let Some(content_type) = content_type {
                        part = part.mime_str(&content_type).map_err(TransportError::failed)?;
                    }
                    multipart.part(name, part)
                }
            };
        }
        Ok(multipart)
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<Response, TransportError> {
            let mut builder = self.client.request(method(request.method), &request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder = match request.body {
                Some(RequestBody::Text(text)) => builder.body(text),
                Some(RequestBody::Form(form)) => builder.multipart(multipart(form)?),
                None => builder,
            };

            let response = builder.send().await.map_err(TransportError::failed)?;

            let url = response.url().to_string();
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();
            let body = response.bytes().await.map_err(TransportError::failed)?;

            Ok(Response {
                url,
                status,
                headers,
                body,
            })
        }
    }

}
