use crate::response::json_response;
use lambda_http::{
    http::{header::ALLOW, HeaderValue, Method, StatusCode},
    Body, Response,
};
use serde_json::json;
use tracing::error;

/// Every way a request can fail. Each variant maps to exactly one HTTP status.
#[derive(Debug)]
pub enum ContactFormError {
    /// Missing or malformed request content. Maps to 400.
    ClientError(String),
    /// Maps to 405. `allow` lists the methods the endpoint accepts.
    MethodNotAllowed {
        method: Method,
        allow: &'static str,
    },
    /// Misconfiguration or failure of the mail integration. Maps to 500.
    InternalError {
        error: &'static str,
        description: String,
    },
}

impl ContactFormError {
    pub fn log(&self) {
        match self {
            ContactFormError::InternalError { description, .. } => {
                error!("Internal error handling request: {description}");
            }
            ContactFormError::ClientError(description) => {
                error!("Client error handling request: {description}");
            }
            ContactFormError::MethodNotAllowed { method, .. } => {
                error!("Rejected request with method {method}");
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContactFormError::ClientError(_) => StatusCode::BAD_REQUEST,
            ContactFormError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ContactFormError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, lambda_http::http::Error> {
        let status = self.status();
        match self {
            ContactFormError::ClientError(description) => {
                json_response(status, &json!({ "error": description }))
            }
            ContactFormError::MethodNotAllowed { allow, .. } => {
                let mut response = json_response(status, &json!({ "error": "Method not allowed" }))?;
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static(allow));
                Ok(response)
            }
            ContactFormError::InternalError { error, description } => {
                json_response(status, &json!({ "error": error, "details": description }))
            }
        }
    }
}

impl std::fmt::Display for ContactFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactFormError::InternalError { description, .. } => {
                write!(f, "Internal error: {description}")
            }
            ContactFormError::ClientError(description) => write!(f, "Client error: {description}"),
            ContactFormError::MethodNotAllowed { method, .. } => {
                write!(f, "Method not allowed: {method}")
            }
        }
    }
}

impl std::error::Error for ContactFormError {}
