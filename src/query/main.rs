//! Query server for zone lookups.
//!
//! Provides an HTTP API to load a KML boundary document and find the zones
//! containing a point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zonefinder::config::Config;
use zonefinder::{
    render_report, Coordinate, LoadOutcome, LoadReport, QueryOutcome, QueryResult,
    QueryService, ServiceError, ServiceStatus,
};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Zone lookup query server")]
struct Args {
    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// KML document to load at startup (overrides config)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Application state shared across handlers
struct AppState {
    service: QueryService,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;
    let listen = args.listen.unwrap_or(config.server.listen);

    info!("Zonefinder Query Server");

    let state = Arc::new(AppState {
        service: QueryService::new(config.parser),
    });

    if let Some(document) = args.document.or(config.document) {
        if let Err(e) = start_load(&state.service, document.clone()) {
            error!("Startup load of {} rejected: {}", document.display(), e);
        }
    }

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/status", get(status_handler))
        .route("/v1/load", post(load_handler))
        .route("/v1/zones", get(zones_handler))
        .route("/v1/report", get(report_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", listen);

    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = state.service.status();
    Json(HealthResponse {
        status: if matches!(status, ServiceStatus::Ready { .. }) {
            "ok"
        } else {
            "degraded"
        },
        service: status,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: ServiceStatus,
}

/// Current service state and the last successful load
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.service.status(),
        last_load: state.service.last_load(),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    service: ServiceStatus,
    last_load: Option<LoadReport>,
}

/// Start loading (or reloading) a document; poll `/v1/status` for the result
async fn load_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoadRequest>,
) -> Result<(StatusCode, Json<LoadAccepted>), (StatusCode, String)> {
    start_load(&state.service, request.path).map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(LoadAccepted {
            service: state.service.status(),
        }),
    ))
}

#[derive(Serialize)]
struct LoadAccepted {
    service: ServiceStatus,
}

/// Spawn a background load that logs progress and its final outcome
fn start_load(service: &QueryService, path: PathBuf) -> Result<(), ServiceError> {
    let handle = service.spawn_load_path(&path, |progress| {
        info!(
            "Loading: {} zones ({:.0}%)",
            progress.zones_found,
            progress.fraction * 100.0
        )
    })?;

    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(LoadOutcome::Loaded(report))) => {
                info!("Loaded {} zones from {}", report.zone_count, path.display())
            }
            Ok(Ok(LoadOutcome::Cancelled)) => info!("Load of {} cancelled", path.display()),
            Ok(Err(e)) => error!("Load of {} failed: {}", path.display(), e),
            Err(e) => error!("Load task for {} panicked: {}", path.display(), e),
        }
    });

    Ok(())
}

/// Zones containing a point, as JSON
async fn zones_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQueryParams>,
) -> Result<Json<ZonesResponse>, (StatusCode, String)> {
    let point = Coordinate::new(params.lat, params.lng);
    let outcome = state.service.query(point).await.map_err(error_response)?;

    Ok(Json(match outcome {
        QueryOutcome::NothingLoaded => ZonesResponse {
            loaded: false,
            results: Vec::new(),
            candidates: 0,
            took_us: 0,
        },
        QueryOutcome::Completed(check) => ZonesResponse {
            loaded: true,
            candidates: check.candidates,
            took_us: check.elapsed.as_micros(),
            results: check.results,
        },
    }))
}

/// Zones containing a point, as the plain-text report
async fn report_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQueryParams>,
) -> Result<String, (StatusCode, String)> {
    let point = Coordinate::new(params.lat, params.lng);
    match state.service.query(point).await.map_err(error_response)? {
        QueryOutcome::Completed(check) => Ok(render_report(&check.results)),
        QueryOutcome::NothingLoaded => {
            Err((StatusCode::SERVICE_UNAVAILABLE, "no zones loaded".into()))
        }
    }
}

fn error_response(err: ServiceError) -> (StatusCode, String) {
    let status = match &err {
        ServiceError::Busy { .. } => StatusCode::CONFLICT,
        ServiceError::Load(_) | ServiceError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[derive(Deserialize)]
struct LoadRequest {
    /// Path of the KML document on the server
    path: PathBuf,
}

#[derive(Deserialize)]
struct PointQueryParams {
    /// Point latitude
    lat: f64,
    /// Point longitude
    lng: f64,
}

#[derive(Serialize)]
struct ZonesResponse {
    loaded: bool,
    results: Vec<QueryResult>,
    candidates: usize,
    took_us: u128,
}
