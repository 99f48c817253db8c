use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use jobboard_backend::middleware::auth;
use jobboard_backend::middleware::rate_limit::{rps_middleware, RateLimiter};
use jobboard_backend::services::notification_service::NotificationService;
use jobboard_backend::storage::postgres::PgSubmissionStore;
use jobboard_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgSubmissionStore::new(pool.clone()));
    let notifier = NotificationService::new(pool.clone(), config.notify_webhook_url.clone());
    let app_state = AppState::new(store, Arc::new(notifier.clone()));

    {
        let worker = notifier;
        tokio::spawn(async move {
            loop {
                match worker.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Webhook worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/certificates/:code",
            get(routes::certificate_routes::verify_certificate),
        );

    let applicant_api = Router::new()
        .route(
            "/api/assessments",
            get(routes::assessment_routes::list_assessments),
        )
        .route(
            "/api/assessments/:id",
            get(routes::assessment_routes::get_assessment),
        )
        .route(
            "/api/assessments/:id/submit",
            post(routes::assessment_routes::submit_assessment),
        )
        .route(
            "/api/assessments/:id/result",
            get(routes::assessment_routes::get_result),
        )
        .route(
            "/api/applications/:id/test/submit",
            post(routes::application_routes::submit_preselection_test),
        )
        .layer(axum::middleware::from_fn(auth::require_bearer_auth))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(config.public_rps),
            rps_middleware,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/assessments",
            get(routes::admin_routes::list_assessments).post(routes::admin_routes::create_assessment),
        )
        .route(
            "/api/admin/assessments/:id",
            get(routes::admin_routes::get_assessment)
                .patch(routes::admin_routes::update_assessment)
                .delete(routes::admin_routes::delete_assessment),
        )
        .route(
            "/api/admin/assessments/:id/attempts",
            get(routes::admin_routes::list_attempts),
        )
        .layer(axum::middleware::from_fn(auth::require_employer_or_admin))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(config.admin_rps),
            rps_middleware,
        ));

    let app = base_routes
        .merge(applicant_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
