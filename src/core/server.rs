/// MCP Server Transports
///
/// This module wires the protocol layer to its transports:
/// - `POST /mcp`: streamable HTTP framing, one JSON-RPC message per request
/// - `GET /sse` + `POST /sse/message`: SSE framing, responses travel over the
///   event stream
/// - STDIO: line-delimited JSON-RPC for local development tooling
///
/// Any other HTTP path answers `404 Not found`.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    App, HttpResponse, HttpServer,
    http::header,
    middleware::{Compress, DefaultHeaders, Logger},
    web,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::protocol::{self, AppState};
use crate::core::registry::ToolRegistry;
use crate::core::sse::{self, SseSessions};

pub const MCP_PATH: &str = "/mcp";
pub const SSE_PATH: &str = "/sse";
pub const SSE_MESSAGE_PATH: &str = "/sse/message";

/// Register the MCP routes. The app-level default service should be
/// `not_found`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(MCP_PATH).route(web::post().to(mcp_streamable)))
        .service(web::resource(SSE_PATH).route(web::get().to(sse_connect)))
        .service(web::resource(SSE_MESSAGE_PATH).route(web::post().to(sse_message)));
}

/// Fallback for every unrecognized path.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().body("Not found")
}

/// Streamable HTTP framing: the JSON-RPC response is the HTTP response body.
/// Notifications are acknowledged with `202 Accepted`.
async fn mcp_streamable(
    state: web::Data<AppState>,
    registry: web::Data<Arc<ToolRegistry>>,
    body: web::Bytes,
) -> HttpResponse {
    match protocol::handle_message(&state, &registry, &body).await {
        Some(response) => HttpResponse::Ok().json(response),
        None => HttpResponse::Accepted().finish(),
    }
}

/// Open an SSE stream. The first event tells the client where to POST.
async fn sse_connect(sessions: web::Data<SseSessions>) -> HttpResponse {
    let (_, stream) = sessions.open(SSE_MESSAGE_PATH);

    HttpResponse::Ok()
        .content_type("text/event-stream")
        // Disable caching to ensure clients always get fresh data
        .insert_header(header::CacheControl(vec![
            header::CacheDirective::NoCache,
            header::CacheDirective::NoStore,
            header::CacheDirective::MustRevalidate,
        ]))
        // Compression would buffer events
        .insert_header(header::ContentEncoding::Identity)
        // Disable nginx buffering for real-time streaming
        .insert_header(("x-accel-buffering", "no"))
        .streaming(stream)
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// SSE framing: accept a message for an open session and answer on its stream.
async fn sse_message(
    state: web::Data<AppState>,
    registry: web::Data<Arc<ToolRegistry>>,
    sessions: web::Data<SseSessions>,
    query: web::Query<SessionQuery>,
    body: web::Bytes,
) -> HttpResponse {
    let Some(raw_id) = query.session_id.as_deref() else {
        return HttpResponse::BadRequest().body("Missing sessionId parameter");
    };
    let Some(session_id) = Uuid::parse_str(raw_id).ok().filter(|id| sessions.contains(id)) else {
        return HttpResponse::NotFound().body("Session not found");
    };

    if let Some(response) = protocol::handle_message(&state, &registry, &body).await {
        let json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(target: "calculator_mcp::server", error = %e, "Error serializing response");
                return HttpResponse::InternalServerError().finish();
            }
        };
        if !sessions.send(&session_id, sse::event("message", &json)) {
            return HttpResponse::NotFound().body("Session not found");
        }
    }

    HttpResponse::Accepted().body("Accepted")
}

/// Run the MCP server in HTTP mode.
///
/// The server is configured with:
/// - Worker threads: from `Settings::workers`
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive: 30 seconds
/// - Request timeout: 30 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(settings: &Settings, registry: Arc<ToolRegistry>) -> std::io::Result<()> {
    let bind_addr = settings.bind_addr();

    let app_state = web::Data::new(AppState {
        server_name: settings.server_name.clone(),
        server_version: settings.server_version.clone(),
    });
    let tool_registry = web::Data::new(registry);
    let sse_sessions = web::Data::new(SseSessions::new());

    tracing::info!(
        target: "calculator_mcp::server",
        name = %settings.server_name,
        version = %settings.server_version,
        bind_addr = %bind_addr,
        workers = settings.workers,
        "MCP server starting (HTTP mode)"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(tool_registry.clone())
            .app_data(sse_sessions.clone())
            // Enable compression for JSON responses (gzip/brotli)
            .wrap(Compress::default())
            // Add security headers to all responses
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .configure(routes)
            .default_service(web::to(not_found))
    })
    .workers(settings.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// Reads one JSON-RPC message per line from stdin and writes each response
/// as one line on stdout. Requests are processed one at a time.
pub async fn run_server_stdio(state: AppState, registry: Arc<ToolRegistry>) -> std::io::Result<()> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

    tracing::info!(
        target: "calculator_mcp::server",
        name = %state.server_name,
        version = %state.server_version,
        "MCP server starting (STDIO mode)"
    );

    let mut stdin = BufReader::with_capacity(8192, tokio::io::stdin()).lines();
    let mut stdout = BufWriter::with_capacity(8192, tokio::io::stdout());

    while let Some(line) = stdin.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let Some(response) = protocol::handle_message(&state, &registry, line.as_bytes()).await else {
            continue;
        };
        let response_json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(target: "calculator_mcp::server", error = %e, "Error serializing response");
                continue;
            }
        };

        stdout.write_all(response_json.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        // Flush after each response so the client is not left waiting on the buffer
        stdout.flush().await?;
    }

    tracing::info!(target: "calculator_mcp::server", "STDIO input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use actix_web::{http::StatusCode, test};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use serde_json::{Value, json};

    use super::*;
    use crate::core::error::FetchError;
    use crate::tools::initialize_tools_with_feed;
    use crate::tools::weather::{AlertFeed, FeedResponse};

    struct RecordingFeed {
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertFeed for RecordingFeed {
        async fn get(&self, url: &str) -> Result<FeedResponse, FetchError> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(FeedResponse {
                status: 200,
                status_text: "OK".to_string(),
                body: r#"{"features": []}"#.to_string(),
            })
        }
    }

    fn app_data() -> (web::Data<AppState>, web::Data<Arc<ToolRegistry>>, web::Data<SseSessions>) {
        let feed = Arc::new(RecordingFeed {
            urls: Mutex::new(Vec::new()),
        });
        let registry = initialize_tools_with_feed(feed, "https://api.weather.gov".to_string())
            .expect("registry builds");
        (
            web::Data::new(AppState {
                server_name: "Authless Calculator".to_string(),
                server_version: "1.0.0".to_string(),
            }),
            web::Data::new(registry),
            web::Data::new(SseSessions::new()),
        )
    }

    macro_rules! init_app {
        ($state:expr, $registry:expr, $sessions:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data($registry.clone())
                    .app_data($sessions.clone())
                    .configure(routes)
                    .default_service(web::to(not_found)),
            )
            .await
        };
    }

    fn add_call(id: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": "add", "arguments": { "a": 1, "b": 2 } }
        })
    }

    #[actix_web::test]
    async fn unknown_path_is_not_found() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        for path in ["/", "/health", "/mcp/extra", "/sse/other"] {
            let req = test::TestRequest::get().uri(path).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
            let body = test::read_body(resp).await;
            assert_eq!(body, web::Bytes::from_static(b"Not found"));
        }
    }

    #[actix_web::test]
    async fn mcp_path_reaches_the_registry() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let req = test::TestRequest::post()
            .uri(MCP_PATH)
            .set_json(add_call(1))
            .to_request();
        let resp: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["content"][0]["text"], "3");
    }

    #[actix_web::test]
    async fn mcp_notification_is_accepted_without_body() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let req = test::TestRequest::post()
            .uri(MCP_PATH)
            .set_json(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[actix_web::test]
    async fn mcp_rejects_get() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let req = test::TestRequest::get().uri(MCP_PATH).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn sse_connect_opens_event_stream() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let req = test::TestRequest::get().uri(SSE_PATH).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(sessions.len(), 1);

        drop(resp);
        assert_eq!(sessions.len(), 0);
    }

    #[actix_web::test]
    async fn sse_message_answers_on_the_stream() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let (session_id, mut stream) = sessions.open(SSE_MESSAGE_PATH);
        let _endpoint = stream.next().await;

        let req = test::TestRequest::post()
            .uri(&format!("{SSE_MESSAGE_PATH}?sessionId={session_id}"))
            .set_json(add_call(9))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);

        let chunk = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        let data = text
            .strip_prefix("event: message\ndata: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("message event framing");
        let message: Value = serde_json::from_str(data).unwrap();
        assert_eq!(message["id"], 9);
        assert_eq!(message["result"]["content"][0]["text"], "3");
    }

    #[actix_web::test]
    async fn sse_message_requires_a_live_session() {
        let (state, registry, sessions) = app_data();
        let app = init_app!(state, registry, sessions);

        let req = test::TestRequest::post()
            .uri(SSE_MESSAGE_PATH)
            .set_json(add_call(1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri(&format!("{SSE_MESSAGE_PATH}?sessionId={}", Uuid::new_v4()))
            .set_json(add_call(1))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
