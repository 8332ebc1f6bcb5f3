use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use log::*;
use realtime::UserId;

/// Header carrying the caller's user id, set by the auth proxy.
pub(crate) const USER_ID_HEADER: &str = "x-user-id";

pub(crate) struct AuthenticatedUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(USER_ID_HEADER) else {
            return Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
        };

        value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                warn!("Rejecting malformed {USER_ID_HEADER} header: {value:?}");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<UserId, StatusCode> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();

        AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .map(|AuthenticatedUser(id)| id)
            .map_err(|(status, _)| status)
    }

    #[tokio::test]
    async fn reads_numeric_user_id() {
        assert_eq!(extract(Some("42")).await, Ok(42));
    }

    #[tokio::test]
    async fn missing_or_garbled_header_is_unauthorized() {
        assert_eq!(extract(None).await, Err(StatusCode::UNAUTHORIZED));
        assert_eq!(extract(Some("abc")).await, Err(StatusCode::UNAUTHORIZED));
    }
}
