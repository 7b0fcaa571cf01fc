use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use http::{request::Parts, StatusCode};

pub mod access;

pub use access::{Access, Role};

/// Password digest kept in the account table, hex encoded md5
pub fn digest(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}

/// Session token carried by `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct MissingToken;

impl IntoResponse for MissingToken {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(api::response::Error {
                code: "AuthError".to_string(),
                msg: "missing bearer token".to_string(),
            }),
        )
            .into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = MissingToken;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| BearerToken(auth.token().to_string()))
            .filter(|token| !token.0.is_empty())
            .ok_or(MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{header, Request};

    #[test]
    fn test_digest() {
        assert_eq!(digest("admin"), "21232f297a57a5a743894a0e4a801fc3");
        assert_ne!(digest("admin"), digest("Admin"));
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let (mut parts, _) = Request::builder()
            .header(header::AUTHORIZATION, "Bearer abc123")
            .body(())
            .unwrap()
            .into_parts();
        let token = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token.as_str(), "abc123");

        let (mut parts, _) = Request::builder()
            .header(header::AUTHORIZATION, "Basic YWRtaW46YWRtaW4=")
            .body(())
            .unwrap()
            .into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &())
            .await
            .is_err());

        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert!(BearerToken::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }
}
