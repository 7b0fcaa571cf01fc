use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::QueryRejection;
use http::StatusCode;

#[derive(Debug)]
pub enum AppError {
    /// Bad credentials, unknown or expired token, missing permission
    Auth(String),
    NotFound(String),
    DuplicateStream(String),
    Conflict(String),
    BadRequest(String),
    Io(std::io::Error),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn auth<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Auth(t.to_string())
    }

    pub fn not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::NotFound(t.to_string())
    }

    pub fn duplicate_stream<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::DuplicateStream(t.to_string())
    }

    pub fn conflict<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::Conflict(t.to_string())
    }

    pub fn bad_request<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::BadRequest(t.to_string())
    }

    /// Stable code reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "AuthError",
            AppError::NotFound(_) => "NotFound",
            AppError::DuplicateStream(_) => "DuplicateStream",
            AppError::Conflict(_) => "Conflict",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Io(_) => "IOError",
            AppError::InternalServerError(_) => "Internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateStream(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Io(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateStream(msg)
            | AppError::Conflict(msg)
            | AppError::BadRequest(msg) => write!(f, "{}", msg),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::InternalServerError(err) => write!(f, "{}", err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = api::response::Error {
            code: self.code().to_string(),
            msg: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        // Extractor rejections are the client's fault
        let err = match err.downcast::<JsonRejection>() {
            Ok(rejection) => return AppError::BadRequest(rejection.body_text()),
            Err(err) => err,
        };
        let err = match err.downcast::<QueryRejection>() {
            Ok(rejection) => return AppError::BadRequest(rejection.to_string()),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(err) => AppError::Io(err),
            Err(err) => AppError::InternalServerError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(AppError::auth("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::duplicate_stream("x").code(), "DuplicateStream");
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);

        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.code(), "IOError");

        let err: AppError = anyhow::anyhow!("boom").into();
        assert_eq!(err.code(), "Internal");
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_json_rejection() {
        use axum::extract::FromRequest;

        let req = http::Request::builder()
            .method("POST")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let rejection = Json::<api::request::Id>::from_request(req, &())
            .await
            .unwrap_err();
        let err = AppError::from(rejection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BadRequest");
        assert!(err.to_string().contains("id"));
    }
}
