mod config;
mod errors;
mod handlers;
mod middleware;
mod models;

use anyhow::Result;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use shared::{init_logging, LogConfig, Localizer};
use std::sync::Arc;
use stream_gateway::{
    InitReport, JsonCodec, MemoryBroker, RedisStreamBroker, StreamBroker, StreamGateway,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{BrokerBackend, Config};
use crate::models::ChatMessage;

pub type ChatGateway = StreamGateway<JsonCodec<ChatMessage>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_logging(LogConfig::from_env("chat-service")?)?;
    info!("Starting Chat Service...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    let localizer = match &config.localization.locales_dir {
        Some(dir) => Localizer::from_dir(dir)?,
        None => Localizer::builtin(),
    }
    .with_default_locale(config.localization.default_locale.clone());
    info!(languages = ?localizer.languages(), "Localization catalogs loaded");
    Localizer::install(Arc::new(localizer));

    let broker: Arc<dyn StreamBroker> = match config.broker_backend {
        BrokerBackend::Redis => Arc::new(RedisStreamBroker::new(&config.broker)?),
        BrokerBackend::Memory => {
            warn!("Using in-memory broker; messages are lost on restart");
            Arc::new(MemoryBroker::new())
        }
    };
    let gateway = Arc::new(ChatGateway::new(
        broker,
        JsonCodec::new(),
        config.gateway.clone(),
    ));

    init_rooms(&gateway).await;

    let app_state = Arc::new(AppState { gateway });
    let app = app(app_state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Chat Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the configured room streams; the gateway logs the summary.
async fn init_rooms(gateway: &ChatGateway) -> InitReport {
    let report = gateway.init_configured_streams().await;
    for (stream, reason) in &report.failed {
        warn!(stream = %stream, reason = %reason, "Stream not initialized");
    }
    report
}

pub fn app(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/chat/streams", get(handlers::streams::list_streams))
        .route(
            "/api/v1/chat/rooms/:room/messages",
            post(handlers::messages::send_message),
        )
        .route("/api/v1/chat/rooms/:room/ws", get(handlers::ws::room_socket))
        .layer(axum_middleware::from_fn(middleware::locale_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct AppState {
    pub gateway: Arc<ChatGateway>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::time::Duration;
    use stream_gateway::GatewayConfig;
    use tokio_tungstenite::{connect_async, tungstenite};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    fn test_state(broker: &MemoryBroker) -> Arc<AppState> {
        let config = GatewayConfig {
            retry_delay: Duration::from_millis(10),
            init_max_attempts: 2,
            recovery_max_attempts: 2,
            ..GatewayConfig::default()
        };
        let gateway = ChatGateway::new(Arc::new(broker.clone()), JsonCodec::new(), config);
        Arc::new(AppState {
            gateway: Arc::new(gateway),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_message(room: &str, body: Value, lang: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(format!("/api/v1/chat/rooms/{}/messages", room))
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(lang) = lang {
            builder = builder.header(header::ACCEPT_LANGUAGE, lang);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let broker = MemoryBroker::new();
        let (status, body) = send(
            app(test_state(&broker)),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "chat-service");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_init_rooms_logs_summary_once() {
        let broker = MemoryBroker::new();
        let config = GatewayConfig {
            streams: vec!["general".to_string(), "support".to_string()],
            ..GatewayConfig::default()
        };
        let gateway = ChatGateway::new(Arc::new(broker.clone()), JsonCodec::new(), config);

        let report = init_rooms(&gateway).await;

        assert_eq!(report.created.len(), 2);
        logs_assert(|lines: &[&str]| {
            match lines
                .iter()
                .filter(|line| line.contains("Stream initialization finished"))
                .count()
            {
                1 => Ok(()),
                n => Err(format!("summary logged {} times", n)),
            }
        });
    }

    #[tokio::test]
    async fn test_send_message_creates_room_stream() {
        let broker = MemoryBroker::new();
        let state = test_state(&broker);

        let (status, body) = send(
            app(state.clone()),
            post_message("general", json!({"sender": "sara", "content": "hello"}), None),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Message sent");
        assert_eq!(body["data"]["room"], "general");

        let stored = broker.messages("general").await.unwrap();
        let message: ChatMessage = serde_json::from_slice(&stored[0]).unwrap();
        assert_eq!(message.content, "hello");

        let (_, streams) = send(
            app(state),
            Request::get("/api/v1/chat/streams").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(streams, json!({"streams": {"general": "ready"}}));
    }

    #[tokio::test]
    async fn test_validation_error_is_localized() {
        let broker = MemoryBroker::new();

        let (status, body) = send(
            app(test_state(&broker)),
            post_message("general", json!({"sender": "sara", "content": "  "}), Some("ar")),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"], "طلب غير صالح: content is required");
        assert_eq!(broker.stats().send_calls, 0);
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_service_unavailable() {
        let broker = MemoryBroker::new();
        broker.set_available(false);

        let (status, body) = send(
            app(test_state(&broker)),
            post_message("general", json!({"sender": "sara", "content": "hi"}), None),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "STREAM_UNAVAILABLE");
        assert_eq!(body["error"], "Messaging for 'general' is temporarily unavailable");
    }

    async fn serve(state: Arc<AppState>) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_socket_relays_history_and_closes_on_disconnect() {
        let broker = MemoryBroker::new();
        let state = test_state(&broker);
        state.gateway.init_streams(["general"]).await;
        state
            .gateway
            .publish("general", &ChatMessage::new("general", "sara", "before you came"))
            .await
            .unwrap();

        let addr = serve(state.clone()).await;
        let (mut socket, _) = connect_async(format!("ws://{}/api/v1/chat/rooms/general/ws", addr))
            .await
            .unwrap();

        let frame = socket.next().await.unwrap().unwrap();
        let message: ChatMessage = serde_json::from_str(&frame.into_text().unwrap()).unwrap();
        assert_eq!(message.content, "before you came");

        state
            .gateway
            .publish("general", &ChatMessage::new("general", "omar", "live"))
            .await
            .unwrap();
        let frame = socket.next().await.unwrap().unwrap();
        let message: ChatMessage = serde_json::from_str(&frame.into_text().unwrap()).unwrap();
        assert_eq!(message.sender, "omar");

        socket.close(None).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while broker.stats().consumers_closed == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(broker.stats().consumers_closed, 1);
        assert!(broker.stream_exists("general").await);
    }

    #[tokio::test]
    async fn test_socket_to_missing_room_reports_error() {
        let broker = MemoryBroker::new();
        let addr = serve(test_state(&broker)).await;

        let (mut socket, _) = connect_async(format!("ws://{}/api/v1/chat/rooms/ghost/ws", addr))
            .await
            .unwrap();

        let frame = socket.next().await.unwrap().unwrap();
        assert!(matches!(frame, tungstenite::Message::Text(_)));
        let body: Value = serde_json::from_str(&frame.into_text().unwrap()).unwrap();
        assert_eq!(body["code"], "STREAM_NOT_FOUND");
        assert_eq!(broker.stats().consumers_closed, 1);
    }
}
