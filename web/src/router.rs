use crate::controller::{event_controller, health_check_controller, presence_controller};
use crate::extractors::authenticated_user::USER_ID_HEADER;
use crate::{sse, ws, AppState};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use log::*;
use service::config::Config;
use tower_http::cors::{AllowOrigin, CorsLayer};
use utoipa::OpenApi;

// To be a part of the rendered OpenAPI document, a path must be listed here.
#[derive(OpenApi)]
#[openapi(
    info(title = "Social Realtime API"),
    paths(
        event_controller::create,
        health_check_controller::health_check,
        presence_controller::index,
        presence_controller::read,
    )
)]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config);

    Router::new()
        .merge(health_routes())
        .merge(event_routes(app_state.clone()))
        .merge(presence_routes(app_state.clone()))
        .merge(realtime_routes(app_state))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(cors)
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events", post(event_controller::create))
        .with_state(app_state)
}

fn presence_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/presence", get(presence_controller::index))
        .route("/presence/:user_id", get(presence_controller::read))
        .with_state(app_state)
}

fn realtime_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::handler::ws_handler))
        .route("/sse", get(sse::handler::sse_handler))
        .with_state(app_state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping invalid allowed origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use realtime::{Manager, ManagerConfig, NoopGateway};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app_state() -> AppState {
        let manager = Manager::new(
            ManagerConfig {
                broadcast_presence: false,
                ..ManagerConfig::default()
            },
            Arc::new(NoopGateway),
        );
        AppState::new(Config::default(), Arc::new(manager))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_event(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/events")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_check_responds_healthy() {
        let app = define_routes(app_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"healthy");
    }

    #[tokio::test]
    async fn submitted_direct_event_reaches_the_live_connection() {
        let state = app_state();
        let (_conn, mut rx) = state.manager.connect(42).unwrap();
        let app = define_routes(state);

        let response = app
            .oneshot(post_event(json!({
                "kind": "chat.message.new",
                "targetId": 42,
                "payload": "hi"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            body_json(response).await,
            json!({"status_code": 202, "data": {"audience": "direct", "delivered": true, "fallback": false}})
        );
        assert_eq!(rx.recv().await.as_deref(), Some("\"hi\""));
    }

    #[tokio::test]
    async fn ill_shaped_event_is_unprocessable() {
        let app = define_routes(app_state());

        let response = app
            .oneshot(post_event(json!({
                "kind": "comments.new",
                "targetId": 1,
                "originatorId": 2,
                "payload": {}
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_kind_is_unprocessable() {
        let app = define_routes(app_state());

        let response = app
            .oneshot(post_event(json!({"kind": "tweets.exploded", "targetId": 1})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn presence_reports_online_users() {
        let state = app_state();
        let (_c7, _rx7) = state.manager.connect(7).unwrap();
        let (_c3, _rx3) = state.manager.connect(3).unwrap();
        let app = define_routes(state);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/presence/7").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            json!({"userId": 7, "isOnline": true})
        );

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/presence/8").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            json!({"userId": 8, "isOnline": false})
        );

        let response = app
            .oneshot(Request::builder().uri("/presence").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            json!({"count": 2, "users": [3, 7]})
        );
    }

    #[tokio::test]
    async fn sse_requires_an_identity() {
        let app = define_routes(app_state());
        let response = app
            .oneshot(Request::builder().uri("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sse_registers_the_user_and_streams_frames() {
        let state = app_state();
        let manager = state.manager.clone();
        let app = define_routes(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sse")
                    .header(USER_ID_HEADER, "5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(manager.presence().is_online(5));

        // Dropping the response body ends the stream and tears the connection down
        drop(response);
        assert!(!manager.presence().is_online(5));
    }
}
