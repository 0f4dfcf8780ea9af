use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::barcode::BarcodeGenerator;
use crate::config::Config;
use crate::desk::{Desk, DeskError, DeskView};
use crate::downloader;
use crate::error::AppError;
use crate::guard::SessionGuard;
use crate::record::{RecordFields, Table};
use crate::store::RecordStore;

/// Cookie carrying the editing session token
pub const SESSION_COOKIE: &str = "barcode_session";

pub struct AppState {
    desk: Mutex<Desk>,
}

impl AppState {
    pub fn new(desk: Desk) -> Self {
        AppState {
            desk: Mutex::new(desk),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let store = RecordStore::new(&config.data_file);
        let guard = SessionGuard::for_data_file(&config.data_file, config.session_ttl);
        AppState::new(Desk::new(store, guard, BarcodeGenerator::default()))
    }
}

type ActionResult = Result<(CookieJar, Json<DeskView>), AppError>;

/// Build the router with all pages and API endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/session", post(open_session))
        .route("/api/session/end", post(close_session))
        .route("/api/records", get(browse_records).post(issue_record))
        .route(
            "/api/records/:barcode",
            put(edit_record).delete(delete_record),
        )
        .route("/api/barcode", post(generate_barcode))
        .route("/api/refresh", post(refresh_records))
        .route("/api/export/csv", get(export_csv))
        .route("/api/export/xlsx", get(export_xlsx))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = TcpListener::bind(config.bind_addr.as_str()).await?;
    log::info!("barcode database at {}", config.data_file.display());
    log::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", e);
    }
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn open_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> ActionResult {
    with_desk(&state, jar, |desk, token| desk.open(token))
}

async fn close_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> ActionResult {
    with_desk(&state, jar, |desk, token| desk.close(token))
}

async fn browse_records(State(state): State<Arc<AppState>>, jar: CookieJar) -> ActionResult {
    with_desk(&state, jar, |desk, token| desk.open(token))
}

async fn generate_barcode(State(state): State<Arc<AppState>>, jar: CookieJar) -> ActionResult {
    with_desk(&state, jar, |desk, token| desk.generate(token))
}

async fn issue_record(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(fields): Json<RecordFields>,
) -> ActionResult {
    with_desk(&state, jar, move |desk, token| desk.issue(token, fields))
}

async fn edit_record(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(barcode): Path<String>,
    Json(changes): Json<RecordFields>,
) -> ActionResult {
    with_desk(&state, jar, move |desk, token| {
        desk.edit(token, &barcode, changes)
    })
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(barcode): Path<String>,
) -> ActionResult {
    with_desk(&state, jar, move |desk, token| desk.delete(token, &barcode))
}

async fn refresh_records(State(state): State<Arc<AppState>>, jar: CookieJar) -> ActionResult {
    with_desk(&state, jar, |desk, token| desk.refresh(token))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, table) = snapshot(&state, jar)?;
    let body = downloader::to_csv(&table).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        jar,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"barcode_database.csv\"",
            ),
        ],
        body,
    ))
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let (jar, table) = snapshot(&state, jar)?;
    let body = downloader::to_xlsx(&table).map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        jar,
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"barcode_database.xlsx\"",
            ),
        ],
        body,
    ))
}

// Runs one action under the desk lock and hands the session token back as a cookie
fn with_desk<F>(state: &AppState, jar: CookieJar, action: F) -> ActionResult
where
    F: FnOnce(&mut Desk, Option<&str>) -> Result<DeskView, DeskError>,
{
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let mut desk = state
        .desk
        .lock()
        .map_err(|_| AppError::Internal("desk state is poisoned".to_string()))?;

    let view = action(&mut *desk, token.as_deref())?;
    let jar = remember_token(jar, &view.token);

    Ok((jar, Json(view)))
}

fn snapshot(state: &AppState, jar: CookieJar) -> Result<(CookieJar, Table), AppError> {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let mut desk = state
        .desk
        .lock()
        .map_err(|_| AppError::Internal("desk state is poisoned".to_string()))?;

    let (token, table) = desk.export(token.as_deref())?;
    Ok((remember_token(jar, &token), table))
}

fn remember_token(jar: CookieJar, token: &str) -> CookieJar {
    if token.is_empty() {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    } else {
        jar.add(
            Cookie::build((SESSION_COOKIE, token.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Strict),
        )
    }
}
