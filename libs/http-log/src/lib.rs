use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::{error, info, trace, warn};

const SLOW_REQUEST_MILLIS: u128 = 500;
const REDACTED: &str = "******";

/// Logs every request with its status and latency, bodies go to `trace`
/// with credentials masked.
pub async fn print_request_response(
    req: Request,
    next: Next,
) -> std::result::Result<impl IntoResponse, (StatusCode, String)> {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let (parts, body) = req.into_parts();
    let bytes = buffer_and_print("request", &parts.headers, body).await?;
    let req = Request::from_parts(parts, Body::from(bytes));

    let res = next.run(req).await;
    let (parts, body) = res.into_parts();
    let bytes = buffer_and_print("response", &parts.headers, body).await?;
    let res = Response::from_parts(parts, Body::from(bytes));

    let millis = start.elapsed().as_millis();
    let status = res.status().as_u16();
    if res.status().is_success() {
        if millis > SLOW_REQUEST_MILLIS {
            warn!("[{} {}] [{}] {}ms", method, uri, status, millis);
        } else {
            info!("[{} {}] [{}] {}ms", method, uri, status, millis);
        }
    } else {
        error!("[{} {}] [{}] {}ms", method, uri, status, millis);
    }

    Ok(res)
}

async fn buffer_and_print<B>(
    direction: &str,
    headers: &HeaderMap,
    body: B,
) -> std::result::Result<Bytes, (StatusCode, String)>
where
    B: axum::body::HttpBody<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("failed to read {direction} body: {err}"),
            ));
        }
    };

    if tracing::enabled!(tracing::Level::TRACE) {
        let mut headers = headers.clone();
        if headers.contains_key(header::AUTHORIZATION) {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(REDACTED));
        }
        if let Ok(body) = std::str::from_utf8(&bytes) {
            let body = redact(body);
            trace!("{direction} headers = {headers:?} body = {body:?}");
        } else {
            trace!("{direction} headers = {headers:?} body = {} bytes", bytes.len());
        }
    }

    Ok(bytes)
}

/// Masks every JSON field whose name contains `password` or `token`
pub fn redact(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            mask(&mut value);
            value.to_string()
        }
        Err(_) => body.to_string(),
    }
}

fn mask(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                let key = key.to_ascii_lowercase();
                if key.contains("password") || key.contains("token") {
                    *v = Value::String(REDACTED.to_string());
                } else {
                    mask(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        let body = redact(r#"{"username":"admin","password":"admin"}"#);
        assert!(body.contains("\"username\":\"admin\""));
        assert!(!body.contains("\"password\":\"admin\""));

        let body = redact(r#"{"oldPassword":"a","newPassword":"b","nested":[{"token":"t"}]}"#);
        assert!(!body.contains("\"a\""));
        assert!(!body.contains("\"b\""));
        assert!(!body.contains("\"t\""));

        assert_eq!(redact("not json"), "not json");
    }
}
