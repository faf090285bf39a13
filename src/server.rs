//! HTTP surface of the dashboard.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{coef::Coef, pages::Page, report::Report, trends::TrendPoint, Dashboard, Error};

type AppState = Arc<Dashboard>;

/// Renders on the blocking pool; page renders may load the file or fit the model.
async fn blocking<T, F>(dash: AppState, f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce(&Dashboard) -> Result<T, Error> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&dash)).await?
}

struct PageError(Page, Error);

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!(page = ?self.0, "Render failed: {}", self.1);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(crate::pages::error(self.0, &self.1)),
        )
            .into_response()
    }
}

struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn page(dash: AppState, page: Page) -> Result<Html<String>, PageError> {
    blocking(dash, move |d| d.render(page))
        .await
        .map(Html)
        .map_err(|e| PageError(page, e))
}

async fn home(State(dash): State<AppState>) -> Result<Html<String>, PageError> {
    page(dash, Page::Home).await
}

async fn trends(State(dash): State<AppState>) -> Result<Html<String>, PageError> {
    page(dash, Page::Trends).await
}

async fn effect(State(dash): State<AppState>) -> Result<Html<String>, PageError> {
    page(dash, Page::Effect).await
}

async fn trends_svg(State(dash): State<AppState>) -> Result<Response, ApiError> {
    let svg = blocking(dash, |d| d.trends_svg()).await.map_err(ApiError)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn api_trends(State(dash): State<AppState>) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    blocking(dash, |d| Ok(d.trends()?.points().to_vec()))
        .await
        .map(Json)
        .map_err(ApiError)
}

#[derive(Debug, Serialize)]
pub struct EffectResponse {
    pub formula: &'static str,
    pub estimate: Coef,
    pub report: Report,
    pub nobs: usize,
    pub n_clusters: usize,
    pub significant: bool,
}

async fn api_effect(State(dash): State<AppState>) -> Result<Json<EffectResponse>, ApiError> {
    blocking(dash, |d| {
        let model = d.model()?;
        let estimate = model.interaction()?.clone();
        let report = Report::new(&estimate, d.config().significance_level);
        Ok(EffectResponse {
            formula: model.formula(),
            significant: report.verdict() == crate::report::Verdict::Significant,
            estimate,
            report,
            nobs: model.wls().nobs(),
            n_clusters: model.wls().n_clusters(),
        })
    })
    .await
    .map(Json)
    .map_err(ApiError)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

pub fn router(dash: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/trends", get(trends))
        .route("/effect", get(effect))
        .route("/trends.svg", get(trends_svg))
        .route("/api/trends", get(api_trends))
        .route("/api/effect", get(api_effect))
        .route("/health", get(health))
        .with_state(dash)
}

pub async fn serve(dash: Dashboard) -> Result<(), Error> {
    let addr: SocketAddr = dash.config().bind_addr.parse().map_err(|_| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid bind address {}", dash.config().bind_addr),
        ))
    })?;
    let listener = TcpListener::bind(addr).await?;
    info!("Serving dashboard on http://{}", addr);
    axum::serve(listener, router(Arc::new(dash))).await?;
    Ok(())
}
