use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::controller::ApiResponse;
use crate::{AppState, Error};
use events::EventSubmission;
use log::*;
use realtime::{DeliveryOutcome, Dispatched};

/// Summary of how a submitted event was routed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "audience")]
enum Routed {
    Direct {
        delivered: bool,
        fallback: bool,
    },
    Broadcast {
        delivered: usize,
        failed: usize,
    },
}

impl From<Dispatched> for Routed {
    fn from(dispatched: Dispatched) -> Self {
        match dispatched {
            Dispatched::Direct(outcome) => Routed::Direct {
                delivered: outcome == DeliveryOutcome::Delivered,
                fallback: outcome.needs_fallback(),
            },
            Dispatched::Broadcast(report) => Routed::Broadcast {
                delivered: report.delivered,
                failed: report.failed,
            },
        }
    }
}

/// POST submit an event for routing to live connections
#[utoipa::path(
    post,
    path = "/events",
    responses(
        (status = 202, description = "Event accepted and routed"),
        (status = 422, description = "Event has no valid audience or an unknown kind"),
    )
)]
pub async fn create(
    State(app_state): State<AppState>,
    Json(submission): Json<EventSubmission>,
) -> Result<impl IntoResponse, Error> {
    debug!("POST event submission of kind {}", submission.kind);

    let dispatched = app_state.manager.submit(submission)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            Routed::from(dispatched),
        )),
    ))
}
