use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";
const MAX_AGE_SECS: &str = "86400";

/// Which browser origins may call the endpoint.
///
/// With no allow-list every origin is accepted and answered with `*`.
/// With one, the caller's origin is echoed back when listed and refused
/// with 403 otherwise. Preflights always get 204, but an unlisted origin
/// receives no `Access-Control-Allow-Origin`. Requests without an `Origin`
/// header always pass.
#[derive(Clone, Debug, Default)]
pub struct OriginPolicy {
    allowed: Option<Arc<Vec<String>>>,
}

impl OriginPolicy {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn allow_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = origins
            .into_iter()
            .map(Into::into)
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            return Self::any();
        }
        Self {
            allowed: Some(Arc::new(origins)),
        }
    }

    /// Parse a single origin or a `;`-separated list.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some(value) => Self::allow_list(value.split(';')),
            None => Self::any(),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.allowed.is_some()
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        match &self.allowed {
            None => true,
            Some(list) => list.iter().any(|o| o == origin.trim_end_matches('/')),
        }
    }

    fn allow_origin(&self, origin: Option<&str>) -> Option<HeaderValue> {
        match (&self.allowed, origin) {
            (None, _) => Some(HeaderValue::from_static("*")),
            (Some(_), Some(origin)) => HeaderValue::from_str(origin).ok(),
            (Some(_), None) => None,
        }
    }
}

impl<S> Layer<S> for OriginPolicy {
    type Service = OriginPolicyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OriginPolicyService {
            inner,
            policy: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OriginPolicyService<S> {
    inner: S,
    policy: OriginPolicy,
}

impl<S> Service<Request<Body>> for OriginPolicyService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let origin = req
                .headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            if req.method() == Method::OPTIONS {
                debug!(origin = origin.as_deref().unwrap_or("-"), "preflight answered");
                let mut response = StatusCode::NO_CONTENT.into_response();
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
                // unlisted origins get no allow-origin header
                let allow_origin = match origin.as_deref() {
                    Some(o) if !policy.is_allowed(o) => None,
                    o => policy.allow_origin(o),
                };
                decorate(&mut response, allow_origin, policy.is_restricted());
                return Ok(response);
            }

            if let Some(origin) = origin.as_deref() {
                if !policy.is_allowed(origin) {
                    warn!(origin, method = %req.method(), "origin refused");
                    return Ok((StatusCode::FORBIDDEN, "Origin not allowed").into_response());
                }
            }

            let allow_origin = policy.allow_origin(origin.as_deref());

            let mut response = inner.call(req).await?;
            decorate(&mut response, allow_origin, policy.is_restricted());
            Ok(response)
        })
    }
}

fn decorate(response: &mut Response, allow_origin: Option<HeaderValue>, restricted: bool) {
    let headers = response.headers_mut();
    if let Some(value) = allow_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    if restricted {
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}
