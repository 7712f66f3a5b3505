//! HTTP helpers for the proxy Lambda.

use lambda_http::http::StatusCode;
use lambda_http::{Body, Response};
use serde::Serialize;

pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

fn with_cors(status: u16) -> lambda_http::http::response::Builder {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    CORS_HEADERS
        .iter()
        .fold(Response::builder().status(status), |builder, (name, value)| {
            builder.header(*name, *value)
        })
}

/// Create a JSON response with the given status code and data, CORS headers attached.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(with_cors(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Empty-bodied response, used for CORS preflight.
pub fn empty_response(status: u16) -> Result<Response<Body>, lambda_http::Error> {
    Ok(with_cors(status).body(Body::Empty)?)
}
