// src/server.rs

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::types::StreamConfig;

#[derive(Clone)]
struct AppState {
    frames: broadcast::Sender<Bytes>,
    frame_width: i32,
    frame_height: i32,
}

pub async fn serve(config: &StreamConfig, frames: broadcast::Sender<Bytes>) -> Result<()> {
    let state = AppState {
        frames,
        frame_width: config.frame_width,
        frame_height: config.frame_height,
    };

    let app = Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚦 Streaming at http://{}/", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        r#"<html>
    <head><title>Traffic Violation Stream</title></head>
    <body>
        <h1>Traffic Monitoring Stream</h1>
        <img src="/video_feed" width="{}" height="{}" />
    </body>
</html>"#,
        state.frame_width, state.frame_height
    ))
}

async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let mut rx = state.frames.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(jpeg) => yield Ok::<Bytes, Infallible>(mjpeg_chunk(&jpeg)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Viewer lagged, skipped {} frame(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("multipart/x-mixed-replace; boundary=frame"),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

/// One multipart part: boundary line, content-type header, blank line,
/// JPEG bytes, trailing line break.
fn mjpeg_chunk(jpeg: &[u8]) -> Bytes {
    let mut payload = Vec::with_capacity(jpeg.len() + 64);
    payload.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    payload.extend_from_slice(jpeg);
    payload.extend_from_slice(b"\r\n");
    Bytes::from(payload)
}
