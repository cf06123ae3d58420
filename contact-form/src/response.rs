use lambda_http::{
    http::{header, HeaderValue, StatusCode},
    Body, Response,
};
use serde_json::Value;

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

pub(crate) fn json_response(
    status: StatusCode,
    body: &Value,
) -> Result<Response<Body>, lambda_http::http::Error> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.to_string().into())
}

/// Answer to a CORS preflight request.
pub(crate) fn preflight_response() -> Result<Response<Body>, lambda_http::http::Error> {
    let mut response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::Empty)?;
    add_cors_headers(&mut response);
    Ok(response)
}

pub(crate) fn add_cors_headers(response: &mut Response<Body>) {
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
}
