use axum::{
    Json, Router,
    extract::{Request, State, rejection::JsonRejection},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::auth::ServiceAccountTokens;
use crate::config::Config;
use crate::error::SheetError;
use crate::gateway::{GoogleSheetsClient, Row};
use crate::handlers::SheetService;
use crate::store::SheetStore;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    service: SheetService,
}

impl AppState {
    pub fn new(service: SheetService) -> Self {
        Self { service }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SetSheetIdRequest {
    sheet_url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    phone_number: Option<String>,
    message: Option<String>,
    row_index: Option<usize>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed_row: Option<usize>,
}

impl ApiResponse {
    fn ok(message: &str) -> Self {
        ApiResponse {
            success: true,
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn failed(error: String, kind: &'static str) -> Self {
        ApiResponse {
            success: false,
            error: Some(error),
            kind: Some(kind),
            ..Default::default()
        }
    }
}

fn reply(status: StatusCode, body: ApiResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Build the API router (without CORS, which depends on configuration)
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/set-sheet-id", post(set_sheet_id))
        .route("/sheet-data", get(get_sheet_data))
        .route("/send-message", post(send_message))
        .route("/send-all-messages", post(send_all_messages));

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let tokens = Arc::new(ServiceAccountTokens::new(
        config.credentials.clone(),
        http.clone(),
    ));
    let api = Arc::new(GoogleSheetsClient::new(
        http,
        config.sheets_api_base.clone(),
        tokens,
    ));

    // Setup app state
    let store = Arc::new(SheetStore::new());
    let app_state = Arc::new(AppState::new(SheetService::new(store, api)));

    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = router(app_state).layer(cors);

    // Start server
    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!("Server running on port {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn set_sheet_id(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SetSheetIdRequest>, JsonRejection>,
) -> Response {
    let payload = payload.map(|Json(p)| p).unwrap_or_else(|rejection| {
        warn!("set-sheet-id: unreadable body: {}", rejection);
        SetSheetIdRequest::default()
    });

    match state.service.set_sheet_id(payload.sheet_url.as_deref()).await {
        Ok(sheet_id) => reply(
            StatusCode::OK,
            ApiResponse {
                sheet_id: Some(sheet_id),
                ..ApiResponse::ok("Sheet ID set successfully")
            },
        ),
        Err(e) => reply(e.status_code(), ApiResponse::failed(e.to_string(), e.kind())),
    }
}

async fn get_sheet_data(State(state): State<Arc<AppState>>) -> Response {
    match state.service.fetch_rows().await {
        Ok(rows) => reply(
            StatusCode::OK,
            ApiResponse {
                success: true,
                data: Some(rows),
                ..Default::default()
            },
        ),
        Err(e) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse {
                message: Some("Failed to fetch Google Sheet data.".to_string()),
                ..ApiResponse::failed(e.to_string(), e.kind())
            },
        ),
    }
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Response {
    let payload = payload.map(|Json(p)| p).unwrap_or_else(|rejection| {
        warn!("send-message: unreadable body: {}", rejection);
        SendMessageRequest::default()
    });

    let result = state
        .service
        .mark_row_sent(
            payload.phone_number.as_deref(),
            payload.message.as_deref(),
            payload.row_index,
        )
        .await;

    match result {
        Ok(_) => reply(
            StatusCode::OK,
            ApiResponse::ok("Google Sheet updated successfully."),
        ),
        Err(e @ SheetError::InvalidInput(_)) => reply(
            StatusCode::BAD_REQUEST,
            ApiResponse::failed(e.to_string(), e.kind()),
        ),
        Err(e) => {
            error!("Error updating Google Sheet: {}", e);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::failed("Failed to update Google Sheet.".to_string(), e.kind()),
            )
        }
    }
}

async fn send_all_messages(State(state): State<Arc<AppState>>) -> Response {
    match state.service.mark_all_sent().await {
        Ok(count) => reply(
            StatusCode::OK,
            ApiResponse {
                rows_updated: Some(count),
                ..ApiResponse::ok("All messages sent")
            },
        ),
        Err(failure) => {
            error!("Error sending all messages: {}", failure.error);
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse {
                    rows_updated: Some(failure.rows_written.len()),
                    failed_row: failure.failed_row,
                    ..ApiResponse::failed(
                        "Failed to send all messages".to_string(),
                        failure.error.kind(),
                    )
                },
            )
        }
    }
}
