use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutlist_optimizer::Error;
use cutlist_optimizer::solver::{Comparison, RunOutcome, Solver};
use cutlist_optimizer::types::Job;
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
struct OptimizeResponse {
    #[serde(flatten)]
    outcome: RunOutcome,
    score: f64,
}

fn bad_request(e: Error) -> (StatusCode, String) {
    tracing::warn!(error = %e, "rejected job");
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn optimize(Json(job): Json<Job>) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&job).unwrap_or_default(),
        "POST /optimize"
    );

    let outcome = Solver::from_job(job).solve().map_err(bad_request)?;
    let score = outcome.score();
    Ok(Json(OptimizeResponse { outcome, score }))
}

async fn compare(Json(job): Json<Job>) -> Result<Json<Comparison>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&job).unwrap_or_default(),
        "POST /compare"
    );

    let comparison = Solver::from_job(job).compare().map_err(bad_request)?;
    Ok(Json(comparison))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN").ok().and_then(|dsn| dsn.parse().ok()),
        release: sentry::release_name!(),
        ..Default::default()
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(std::sync::Mutex::new(log_file))
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/compare", post(compare))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.expect("server error");
}
