use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use realtime::error::{Error as RealtimeError, RealtimeErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(RealtimeError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            RealtimeErrorKind::InvalidEventShape(shape) => {
                (StatusCode::UNPROCESSABLE_ENTITY, shape.to_string()).into_response()
            }
            RealtimeErrorKind::MalformedClientMessage => {
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            RealtimeErrorKind::Lifecycle => {
                error!("Lifecycle error reached the HTTP layer: {:?}", self.0.source);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<RealtimeError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
