use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use load_planner::manifest::{OrderLine, Pallet, ShipMode, Vehicle, expand_order};
use load_planner::solver::Solver;
use load_planner::types::{Container, DEFAULT_FLEET_CAP, PackOptions, PackingResult, Unit};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct PackRequest {
    container: Container,
    units: Vec<Unit>,
    #[serde(default = "default_fleet_cap")]
    fleet_cap: usize,
    #[serde(default = "default_true")]
    require_support: bool,
    #[serde(default)]
    max_checks: Option<u64>,
}

#[derive(Deserialize, Serialize)]
struct PlanRequest {
    vehicle: Vehicle,
    #[serde(default)]
    margin_percent: f64,
    lines: Vec<OrderLine>,
    /// Loose cartons when absent.
    #[serde(default)]
    pallet: Option<Pallet>,
    #[serde(default = "default_fleet_cap")]
    fleet_cap: usize,
}

fn default_true() -> bool {
    true
}

fn default_fleet_cap() -> usize {
    DEFAULT_FLEET_CAP
}

#[derive(Debug, Serialize)]
struct PackResponse {
    container_count: usize,
    placed_count: usize,
    unplaced_count: usize,
    fleet_exhausted_count: usize,
    containers: Vec<ContainerSummary>,
    #[serde(flatten)]
    result: PackingResult,
}

#[derive(Debug, Serialize)]
struct ContainerSummary {
    id: String,
    units: usize,
    occupied_volume: u64,
    occupied_weight: f64,
    volume_percent: f64,
    weight_percent: f64,
}

impl From<PackingResult> for PackResponse {
    fn from(result: PackingResult) -> Self {
        Self {
            container_count: result.container_count(),
            placed_count: result.placed_count(),
            unplaced_count: result.unplaced_count(),
            fleet_exhausted_count: result.fleet_exhausted_count(),
            containers: result
                .loads
                .iter()
                .map(|load| ContainerSummary {
                    id: load.container.id.clone(),
                    units: load.placements.len(),
                    occupied_volume: load.occupied_volume(),
                    occupied_weight: load.occupied_weight(),
                    volume_percent: load.volume_utilization_percent(),
                    weight_percent: load.weight_utilization_percent(),
                })
                .collect(),
            result,
        }
    }
}

fn bad_request(e: load_planner::Error) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, e.to_string())
}

/// Runs the solver on the blocking pool so a long search does not stall
/// the async workers.
async fn solve(solver: Solver, units: Vec<Unit>) -> Result<PackingResult, (StatusCode, String)> {
    tokio::task::spawn_blocking(move || solver.solve(&units))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(bad_request)
}

async fn pack(Json(req): Json<PackRequest>) -> Result<Json<PackResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /pack"
    );

    let mut options = PackOptions::default()
        .with_fleet_cap(req.fleet_cap)
        .with_support(req.require_support);
    if let Some(max_checks) = req.max_checks {
        options = options.with_max_checks(max_checks);
    }

    let result = solve(Solver::new(req.container, options), req.units).await?;
    Ok(Json(result.into()))
}

async fn plan(Json(req): Json<PlanRequest>) -> Result<Json<PackResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /plan"
    );

    let container = req
        .vehicle
        .usable(req.margin_percent / 100.0)
        .map_err(bad_request)?;
    let mode = match req.pallet {
        Some(pallet) => ShipMode::Palletized(pallet),
        None => ShipMode::Bulk,
    };
    let units = expand_order(&req.lines, &mode, container.dims.height).map_err(bad_request)?;

    let options = PackOptions::default().with_fleet_cap(req.fleet_cap);
    let result = solve(Solver::new(container, options), units).await?;
    Ok(Json(result.into()))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/pack", post(pack))
        .route("/plan", post(plan))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
