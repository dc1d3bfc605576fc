use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{FABRICS_URL, METRICS_URL, PROBE_URL};
use crate::context::AppContext;

const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Extract the target fabric from query parameters
#[derive(Deserialize)]
pub struct ProbeQuery {
    target: Option<String>,
}

/// Entry of the `/fabrics` listing
#[derive(Serialize)]
struct FabricInfo<'a> {
    name: &'a str,
    apic: &'a [String],
}

/// Create the HTTP server router
pub fn create_router(app_context: AppContext) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route(METRICS_URL, get(metrics_handler))
        .route(PROBE_URL, get(probe_handler))
        .route(FABRICS_URL, get(fabrics_handler))
        .with_state(app_context)
}

/// Index page handler
async fn index_page() -> impl IntoResponse {
    info!("Index page request received");
    let html = r#"<html>
    <head><title>ACI Pulse</title></head>
    <body>
    <h1>Available HTTP endpoints:</h1>
    <ul>
    <li><b><a href='/metrics'>/metrics</a></b>: Get metrics from all configured fabrics</li>
    <li><b>/probe?target=&lt;fabric&gt;</b>: Get metrics from a single fabric</li>
    <li><b><a href='/fabrics'>/fabrics</a></b>: List configured fabrics</li>
    </ul>
    </body>
    </html>"#;
    Html(html).into_response()
}

fn text_response(status: StatusCode, body: String) -> Response {
    (status, [("Content-Type", TEXT_CONTENT_TYPE)], body).into_response()
}

/// Metrics endpoint handler - every fabric
async fn metrics_handler(State(ctx): State<AppContext>) -> Response {
    info!("Metrics request received");

    let output = ctx.scrape_all().await;
    info!(output_size = output.len(), "Returning aggregated metrics");
    text_response(StatusCode::OK, output)
}

/// Probe endpoint handler - one fabric
async fn probe_handler(
    State(ctx): State<AppContext>,
    Query(params): Query<ProbeQuery>,
) -> Response {
    let Some(target) = params.target.filter(|t| !t.is_empty()) else {
        warn!("Probe request without target");
        return text_response(
            StatusCode::BAD_REQUEST,
            "Missing target parameter".to_string(),
        );
    };

    info!(fabric = %target, "Probe request received");
    debug!(fabric = %target, "Collecting single fabric");

    match ctx.scrape_fabric(&target).await {
        Some(output) => {
            info!(fabric = %target, output_size = output.len(), "Returning fabric metrics");
            text_response(StatusCode::OK, output)
        }
        None => {
            warn!(fabric = %target, "Probe for unknown fabric");
            text_response(
                StatusCode::NOT_FOUND,
                format!("Unknown fabric: {}", target),
            )
        }
    }
}

/// Fabrics listing handler
async fn fabrics_handler(State(ctx): State<AppContext>) -> Response {
    info!("Fabrics listing request received");

    let fabrics: Vec<FabricInfo> = ctx
        .fabric_names()
        .filter_map(|name| {
            ctx.client(name).map(|client| FabricInfo {
                name,
                apic: &client.config().apic,
            })
        })
        .collect();

    let json_output = serde_json::to_string(&fabrics).unwrap_or_else(|e| {
        warn!("Failed to serialize fabrics: {}", e);
        "[]".to_string()
    });

    (
        StatusCode::OK,
        [("Content-Type", "application/json; charset=utf-8")],
        json_output,
    )
        .into_response()
}

/// Start the HTTP server
pub async fn start_server(listen_address: &str, app_context: AppContext) -> anyhow::Result<()> {
    let router = create_router(app_context);

    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    info!("Server listening on {}", listen_address);

    axum::serve(listener, router).await?;

    Ok(())
}
