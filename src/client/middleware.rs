// File: ./src/client/middleware.rs
//! Tower middleware stamping the headers every REST call carries.
use http::{HeaderMap, HeaderValue, Request, header};
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// Adds `User-Agent`, `Accept` and (for bodies) `Content-Type` unless the
/// request already sets them.
#[derive(Clone, Debug)]
pub struct RestHeadersLayer {
    defaults: HeaderMap,
}

impl RestHeadersLayer {
    pub fn new(user_agent: &str) -> Self {
        let mut defaults = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(user_agent) {
            defaults.insert(header::USER_AGENT, val);
        }
        defaults.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self { defaults }
    }
}

impl<S> Layer<S> for RestHeadersLayer {
    type Service = RestHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RestHeadersService {
            inner,
            defaults: self.defaults.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RestHeadersService<S> {
    inner: S,
    defaults: HeaderMap,
}

impl<S> Service<Request<String>> for RestHeadersService<S>
where
    S: Service<Request<String>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<String>) -> Self::Future {
        let has_body = !req.body().is_empty();
        let headers = req.headers_mut();
        for (name, value) in &self.defaults {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        if has_body && !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self.inner.call(req)
    }
}
