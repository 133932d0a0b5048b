use std::convert::Infallible;
use std::path::{Component, Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use engine_logging::{engine_error, engine_info, engine_warn};
use serde::Deserialize;
use streamer_core::{encode, encode_frame, Event};
use streamer_engine::{EngineHandle, JobRequest};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::io::ReaderStream;

use crate::sanitize::sanitize_name;

const HELP_PAGE: &str = "<h3>yt-dlp SSE download server</h3>\
<p>Use /stream-download?playlist_url=...&amp;playlist_name=... to start a streamed download.</p>";

/// Frame sent in place of an event that failed to serialize.
const ENCODE_FAILURE: &str = r#"{"message": "failed to encode event"}"#;

#[derive(Clone)]
pub struct AppState {
    engine: EngineHandle,
    downloads_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(engine: EngineHandle, downloads_dir: PathBuf) -> Self {
        Self {
            engine,
            downloads_dir: Arc::new(downloads_dir),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/stream-download", get(stream_download))
        .route("/downloads/{folder}/{*file}", get(downloaded_file))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    playlist_url: Option<String>,
    playlist_name: Option<String>,
}

async fn index_page() -> Html<&'static str> {
    Html(HELP_PAGE)
}

/// GET /stream-download: one job per request, streamed as server-sent events
/// until `stream_end`. Closing the connection cancels the job.
async fn stream_download(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Response {
    let folder = sanitize_name(params.playlist_name.as_deref().unwrap_or("playlist"));
    let request = JobRequest {
        source: params.playlist_url,
        target_dir: state.downloads_dir.join(&folder),
    };
    engine_info!(
        "Stream requested for {:?} into {:?}",
        request.source,
        request.target_dir
    );
    event_stream_response(state.engine.start(request))
}

fn event_stream_response(events: UnboundedReceiver<Event>) -> Response {
    let frames = futures_util::stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((Ok::<_, Infallible>(Bytes::from(frame(&event))), events))
    });

    let mut response = Body::from_stream(frames).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

fn frame(event: &Event) -> String {
    match encode(event) {
        Ok(frame) => frame,
        Err(err) => {
            engine_error!("Failed to encode {} event: {}", event.name(), err);
            encode_frame("error", ENCODE_FAILURE)
        }
    }
}

/// GET /downloads/{folder}/{*file}: a finished file, as an attachment.
async fn downloaded_file(
    State(state): State<AppState>,
    Path((folder, file)): Path<(String, String)>,
) -> Response {
    let Some(path) = resolve_download(&state.downloads_dir, &folder, &file) else {
        engine_warn!("Rejected download path {:?}/{:?}", folder, file);
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let handle = match tokio::fs::File::open(&path).await {
        Ok(handle) => handle,
        Err(_) => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };
    let length = match handle.metadata().await {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return (StatusCode::NOT_FOUND, "File not found").into_response(),
    };

    let mut response = Body::from_stream(ReaderStream::new(handle)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&path)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Joins a request path onto the downloads root. Only plain names are
/// accepted: no `..`, no roots, no prefixes, and exactly one folder level.
pub fn resolve_download(root: &FsPath, folder: &str, file: &str) -> Option<PathBuf> {
    let folder = FsPath::new(folder);
    let mut folder_parts = folder.components();
    if !matches!(
        (folder_parts.next(), folder_parts.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return None;
    }
    let file = FsPath::new(file);
    if file.as_os_str().is_empty()
        || !file
            .components()
            .all(|part| matches!(part, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(folder).join(file))
}

fn content_disposition(path: &FsPath) -> String {
    let name: String = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{name}\"")
}
