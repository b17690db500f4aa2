use crate::cli::Args;
use crate::models::chat::ChatMessage;
use crate::relay::Relay;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    body::Body,
    extract::State,
    response::{ IntoResponse, Response },
    http::{ header, StatusCode },
};
use futures::StreamExt;
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error };

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

#[derive(Clone)]
struct AppState {
    relay: Arc<Mutex<Relay>>,
    args: Args,
}

pub fn build_router(relay: Arc<Mutex<Relay>>, args: Args) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/reload-prompts", get(reload_prompts_handler))
        .layer(cors)
        .with_state(AppState { relay, args })
}

pub async fn start_http_server(
    relay: Arc<Mutex<Relay>>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let app = build_router(relay, args.clone());

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        };

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("Starting HTTPS server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("Starting HTTP server on: http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Relay one conversation to the upstream completion API and stream the
/// reply text back as a chunked plain-text body. An upstream failure before
/// the first fragment maps to 502; a failure mid-stream aborts the body and
/// the caller observes a truncated response.
async fn chat_handler(
    State(state): State<AppState>,
    Json(conversation): Json<Vec<ChatMessage>>
) -> Response {
    let relay = state.relay.lock().await.clone();

    let mut stream = match relay.stream_reply(&conversation).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open upstream stream: {}", e);
            return (StatusCode::BAD_GATEWAY, "upstream request failed").into_response();
        }
    };

    // Peek the first fragment so auth and connection errors surface as a
    // status code instead of an empty 200.
    let head = match stream.next().await {
        Some(Ok(fragment)) => vec![Ok(fragment)],
        Some(Err(e)) => {
            error!("Upstream stream failed before first fragment: {}", e);
            return (StatusCode::BAD_GATEWAY, "upstream request failed").into_response();
        }
        None => Vec::new(),
    };

    let body = Body::from_stream(futures::stream::iter(head).chain(stream));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    ).into_response()
}

async fn reload_prompts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut relay = match state.relay.try_lock() {
        Ok(g) => g,
        Err(_) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReloadResponse {
                    success: false,
                    message: "Relay busy".into(),
                }),
            ).into_response();
        }
    };

    match relay.reload_prompts_if_changed(&state.args) {
        Ok(true) =>
            (
                StatusCode::OK,
                Json(ReloadResponse {
                    success: true,
                    message: "Prompts reloaded".into(),
                }),
            ).into_response(),
        Ok(false) =>
            (
                StatusCode::OK,
                Json(ReloadResponse {
                    success: true,
                    message: "Prompts unchanged".into(),
                }),
            ).into_response(),
        Err(e) =>
            (
                StatusCode::BAD_REQUEST,
                Json(ReloadResponse {
                    success: false,
                    message: format!("Reload error: {}", e),
                }),
            ).into_response(),
    }
}
