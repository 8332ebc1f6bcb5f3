use log::*;
use mailer::EmailNotificationGateway;
use realtime::{Manager, ManagerConfig, NoopGateway, NotificationGateway};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use tokio::net::TcpListener;
use web::{router, AppState};

#[tokio::main]
async fn main() {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!(
        "Starting up social_realtime_rs in {} mode",
        config.runtime_env()
    );

    let gateway = notification_gateway(&config);
    let manager = Arc::new(Manager::new(
        ManagerConfig {
            outbound_queue_capacity: config.outbound_queue_capacity,
            broadcast_presence: config.broadcast_presence,
        },
        gateway,
    ));

    let app_state = AppState::new(config.clone(), manager.clone());
    let app = router::define_routes(app_state);

    let listen_address = config.listen_address();
    let listener = match TcpListener::bind(&listen_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {listen_address}: {e}");
            std::process::exit(1);
        }
    };
    info!("Server starting... listening for connections on http://{listen_address}");

    let shutdown_manager = manager.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Shutdown requested, closing live connections");
        shutdown_manager.close_all();
    });

    if let Err(e) = server.await {
        error!("Server error: {e}");
    }
}

// Email needs both an API key and a template; without them, offline
// recipients simply miss the event.
fn notification_gateway(config: &Config) -> Arc<dyn NotificationGateway> {
    if !config.email_notifications_enabled() {
        warn!("MailerSend is not configured, offline notifications will be dropped");
        return Arc::new(NoopGateway);
    }

    match EmailNotificationGateway::new(Arc::new(config.clone())) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            error!("Failed to set up email notifications: {e}");
            Arc::new(NoopGateway)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
