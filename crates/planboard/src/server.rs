use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::board::{self, BoardView, TimelineBoard, YearSummary};
use crate::config::Settings;
use crate::html::{self, LinkStyle, PageContext};
use crate::source::PlanSource;
use crate::tooltip::TooltipBody;
use crate::types::Plan;

/// Application state shared across requests
pub struct AppState {
    pub source: PlanSource,
    pub admin_base: String,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            source: PlanSource::from_settings(&settings.source)?,
            admin_base: settings.admin_base.clone(),
        })
    }

    /// A fresh board per request; nothing is shared between loads
    fn board(&self, year: i32) -> TimelineBoard {
        TimelineBoard::new(self.source.clone(), self.admin_base.clone(), year)
    }
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/plans/") }))
        .route("/plans/", get(board_page_handler))
        .route("/plans/{id}/attendees", get(attendees_handler))
        .route("/api/board/", get(board_json_handler))
        .route("/api/calendar-year/", get(calendar_year_handler))
        .route("/api/plan-search/", get(plan_search_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the board server
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(url = %format!("http://{}/plans/", addr), "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_board(state: &AppState, query: &YearQuery) -> BoardView {
    let year = board::resolve_year(query.year.as_deref(), board::current_year());
    state.board(year).load().await
}

/// Serve the board page for `?year=`
async fn board_page_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> Html<String> {
    let view = load_board(&state, &query).await;
    let ctx = PageContext {
        current_year: board::current_year(),
        links: LinkStyle::Server,
    };
    Html(html::render_page(&view, ctx).into_string())
}

/// Tooltip body fragment for one plan; fetch failures render a fallback
async fn attendees_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Html<String> {
    let outcome = state.source.plan_detail(id).await;
    if let Err(e) = &outcome {
        warn!(plan_id = id, error = %e, "Plan detail unavailable");
    }
    let body = TooltipBody::from_outcome(&outcome);
    Html(html::render_tooltip_body(&body).into_string())
}

/// Return the laid-out board as JSON
async fn board_json_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> Json<BoardView> {
    Json(load_board(&state, &query).await)
}

/// Plans of a year grouped by start month; no usable year gives an empty summary
async fn calendar_year_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> Result<Json<YearSummary>, Response> {
    let Some(year) = board::parse_year(query.year.as_deref()) else {
        return Ok(Json(YearSummary::empty(0)));
    };
    let plans = state.source.list_plans().await.map_err(upstream_error)?;
    Ok(Json(board::year_summary(plans, year)))
}

/// Search plans by title or code
async fn plan_search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Plan>>, Response> {
    let plans = state.source.list_plans().await.map_err(upstream_error)?;
    Ok(Json(board::search_plans(plans, &query.q)))
}

fn upstream_error(e: crate::error::SourceError) -> Response {
    warn!(error = %e, "Plan source request failed");
    (StatusCode::BAD_GATEWAY, "Plan source unavailable").into_response()
}
