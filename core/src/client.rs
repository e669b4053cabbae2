//! Cancellable request dispatch.
//!
//! # Design
//! `HttpService` is a cheap handle over a shared executor. Every verb method
//! creates a fresh cancellation token, spawns the request onto the current
//! tokio runtime, and returns a [`DispatchHandle`] straight away. The handle
//! is a future for the decoded body plus the means to abort the request.
//! Aborting only matters while a dispatch is in flight; once the transport
//! has answered, the request settles on its own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Defaults, Policies, RequestOptions};
use crate::error::HttpError;
use crate::executor::Executor;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::Decoded;

/// Cancels the request it was taken from.
#[derive(Debug, Clone)]
pub struct AbortTrigger {
    token: CancellationToken,
}

impl AbortTrigger {
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A request in flight.
///
/// Await it for the decoded body. Dropping the handle does not cancel the
/// request; call [`DispatchHandle::abort`] for that.
#[derive(Debug)]
pub struct DispatchHandle {
    task: JoinHandle<Result<Decoded, HttpError>>,
    abort: AbortTrigger,
}

impl DispatchHandle {
    /// Signal cancellation to the in-flight dispatch.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// A trigger that can abort the request from elsewhere while this
    /// handle is being awaited.
    pub fn abort_trigger(&self) -> AbortTrigger {
        self.abort.clone()
    }
}

impl Future for DispatchHandle {
    type Output = Result<Decoded, HttpError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(HttpError::Task {
                message: e.to_string(),
            }),
        })
    }
}

/// HTTP service with process-wide defaults, per-call options and
/// cancellable dispatch.
#[derive(Clone)]
pub struct HttpService {
    executor: Arc<Executor>,
}

impl HttpService {
    /// Service over `transport` that reads the process-wide defaults on
    /// every call.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_transport(Arc::new(transport))
    }

    pub fn from_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: Arc::new(Executor::new(transport)),
        }
    }

    /// Service over a default `reqwest` transport.
    #[cfg(feature = "reqwest")]
    pub fn with_reqwest() -> Result<Self, crate::transport::TransportError> {
        Ok(Self::new(crate::transport::ReqwestTransport::new()?))
    }

    /// Pin `defaults` for this service instead of the process-wide ones.
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        Arc::make_mut(&mut self.executor).defaults = Some(defaults);
        self
    }

    /// Service-level hooks, used when a call does not supply its own.
    pub fn with_policies(mut self, policies: Policies) -> Self {
        Arc::make_mut(&mut self.executor).policies = policies;
        self
    }

    /// Run a request to completion on the current task.
    ///
    /// No cancellation token is created; pass one through
    /// [`RequestOptions::signal`] to make the call abortable.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<Decoded, HttpError> {
        self.executor.execute(method, path, options).await
    }

    /// Spawn a request and return its handle immediately.
    ///
    /// Defaults, headers, body and hooks are resolved before this returns;
    /// only dispatch and decoding run on the spawned task. Any signal in
    /// `options` is replaced by the handle's own token. Must be called from
    /// within a tokio runtime.
    pub fn request(
        &self,
        method: HttpMethod,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> DispatchHandle {
        let token = CancellationToken::new();
        let options = options.signal(token.clone());
        let path: String = path.into();
        let prepared = self.executor.prepare(method, &path, options);
        let executor = Arc::clone(&self.executor);

        let task = tokio::spawn(async move { executor.run(prepared?).await });

        DispatchHandle {
            task,
            abort: AbortTrigger { token },
        }
    }

    pub fn get(&self, path: impl Into<String>, options: RequestOptions) -> DispatchHandle {
        self.request(HttpMethod::Get, path, options)
    }

    pub fn post(&self, path: impl Into<String>, options: RequestOptions) -> DispatchHandle {
        self.request(HttpMethod::Post, path, options)
    }

    pub fn put(&self, path: impl Into<String>, options: RequestOptions) -> DispatchHandle {
        self.request(HttpMethod::Put, path, options)
    }

    pub fn patch(&self, path: impl Into<String>, options: RequestOptions) -> DispatchHandle {
        self.request(HttpMethod::Patch, path, options)
    }

    pub fn delete(&self, path: impl Into<String>, options: RequestOptions) -> DispatchHandle {
        self.request(HttpMethod::Delete, path, options)
    }
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("defaults", &self.executor.defaults)
            .field("policies", &self.executor.policies)
            .finish_non_exhaustive()
    }
}
