use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Uri, header};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::error::EdgeError;
use crate::metrics::{
    RATE_LIMITED, REJECTED_PATHS, REQUEST_TOTAL, UPSTREAM_ERRORS, UPSTREAM_LATENCY,
};
use crate::proxy_path;
use crate::route_class::RouteClass;
use crate::state::AppState;

// Route prefix stripped off before forwarding
const PROXY_PREFIX: &str = "/api/";

// The single pipeline every client API call goes through, for every verb:
// validate the path, rate-limit by IP and route class, swap the session
// cookie for the upstream bearer credential, forward, relay. Each step can
// short-circuit; nothing later runs once a step rejects.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Result<Response, EdgeError> {
    REQUEST_TOTAL.inc();

    // cheapest check first: a bad path consumes no budget and reads no
    // credential. The raw (still-encoded) path is what gets validated and
    // forwarded.
    let raw_path = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or("");
    let path = match proxy_path::validate(raw_path) {
        Ok(path) => path,
        Err(violations) => {
            REJECTED_PATHS.inc();
            warn!(path = raw_path, ?violations, "rejected proxy path");
            return Err(EdgeError::InvalidPath(violations));
        }
    };

    let ip = client_ip(&headers);
    let class = RouteClass::classify(path);
    let limit = state.limit_for(class);
    let key = format!("{}:{}", class.key_prefix(), ip);

    let verdict = state.limiter.check_limit(&key, limit, state.rate_window);
    if !verdict.success {
        RATE_LIMITED.inc();
        warn!(%key, limit, retry_after = verdict.retry_after, "rate limit exceeded");
        return Err(EdgeError::RateLimited {
            limit,
            retry_after: verdict.retry_after,
        });
    }

    // the upstream credential comes out of the signed session cookie only -
    // whatever Authorization the client sent is dropped below
    let session = state.sessions.decode(&headers);

    let mut url = format!("{}/{}", state.upstream_url.trim_end_matches('/'), path);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }

    // forward an explicit allow-list of inbound headers, nothing else
    let mut upstream_req = state.client.request(method.clone(), url).header(
        header::CONTENT_TYPE,
        headers
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    for name in [header::ACCEPT, header::ACCEPT_LANGUAGE] {
        if let Some(value) = headers.get(&name) {
            upstream_req = upstream_req.header(name, value.clone());
        }
    }
    if let Some(session) = &session {
        upstream_req = upstream_req.bearer_auth(&session.access_token);
    }
    if method != Method::GET && method != Method::HEAD {
        upstream_req = upstream_req.body(body);
    }

    let started = Instant::now();
    let upstream_res = upstream_req.send().await.map_err(|err| {
        UPSTREAM_ERRORS.inc();
        EdgeError::Upstream(err)
    })?;

    let status = upstream_res.status();
    let content_type = upstream_res.headers().get(header::CONTENT_TYPE).cloned();
    let relayed_body = upstream_res.text().await.map_err(|err| {
        UPSTREAM_ERRORS.inc();
        EdgeError::Upstream(err)
    })?;
    UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());

    info!(
        method = %method,
        path,
        status = status.as_u16(),
        client_ip = %ip,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "relayed upstream response"
    );

    let mut response = (status, relayed_body).into_response();
    let out = response.headers_mut();
    match content_type {
        Some(value) => {
            out.insert(header::CONTENT_TYPE, value);
        }
        None => {
            out.remove(header::CONTENT_TYPE);
        }
    }
    out.insert("x-ratelimit-limit", HeaderValue::from(limit));
    out.insert("x-ratelimit-remaining", HeaderValue::from(verdict.remaining));

    Ok(response)
}

// First X-Forwarded-For entry, then X-Real-IP, then loopback. The edge runs
// behind a forwarding front end in deployment, so the loopback fallback only
// matters for direct local traffic.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        })
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn forwarded_for_wins_and_takes_the_first_entry() {
        let map = headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&map), "203.0.113.9");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let map = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&map), "198.51.100.2");
    }

    #[test]
    fn loopback_when_nothing_is_present() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
