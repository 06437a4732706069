//! Tower adapter for the rate gate.
//!
//! Workers built as tower services can wrap their API client so every call
//! acquires a slot first and releases it afterwards, on success and failure
//! alike. The request label (API type, optional file) is extracted from each
//! request by a configured function.

use crate::error::GateError;
use crate::gate::RateGate;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Labels the gate needs for one outbound call.
#[derive(Debug, Clone)]
pub struct CallLabel {
    /// API type label (used for logging and tracking rows).
    pub api_type: String,
    /// File the call is about, if any; enables per-call tracking.
    pub filename: Option<String>,
}

impl CallLabel {
    /// A label with no tracked file.
    pub fn untracked(api_type: impl Into<String>) -> Self {
        Self {
            api_type: api_type.into(),
            filename: None,
        }
    }
}

type LabelFn<Req> = Arc<dyn Fn(&Req) -> CallLabel + Send + Sync>;

/// Layer that wraps a service with slot acquisition.
pub struct RateGateLayer<Req> {
    gate: RateGate,
    label: LabelFn<Req>,
}

impl<Req> RateGateLayer<Req> {
    /// Creates a layer extracting the call label with `label`.
    pub fn new<F>(gate: RateGate, label: F) -> Self
    where
        F: Fn(&Req) -> CallLabel + Send + Sync + 'static,
    {
        Self {
            gate,
            label: Arc::new(label),
        }
    }
}

impl<Req> Clone for RateGateLayer<Req> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            label: Arc::clone(&self.label),
        }
    }
}

impl<S, Req> Layer<S> for RateGateLayer<Req> {
    type Service = RateGateService<S, Req>;

    fn layer(&self, inner: S) -> Self::Service {
        RateGateService {
            inner,
            gate: self.gate.clone(),
            label: Arc::clone(&self.label),
            _req: PhantomData,
        }
    }
}

/// Service produced by [`RateGateLayer`].
pub struct RateGateService<S, Req> {
    inner: S,
    gate: RateGate,
    label: LabelFn<Req>,
    _req: PhantomData<fn(Req)>,
}

impl<S: Clone, Req> Clone for RateGateService<S, Req> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
            label: Arc::clone(&self.label),
            _req: PhantomData,
        }
    }
}

impl<S, Req> Service<Req> for RateGateService<S, Req>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: From<GateError> + Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let label = (self.label)(&request);
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let guard = gate
                .acquire(&label.api_type, label.filename.as_deref())
                .await
                .map_err(S::Error::from)?;

            let result = inner.call(request).await;
            guard.release().await;
            result
        })
    }
}
