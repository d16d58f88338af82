//! HTTP API.
//!
//! Routes:
//! - `GET /`, `GET /status`: service status and broker topic list
//! - `POST /submit_contract`: register an entity and provision its topic
//! - `POST /channels`: create the channel topic for `{id, owner}`
//! - `POST /create_sensor`: create a sensor topic from `{"sensor": {...}}`
//! - `GET /create/<company>/<machine>/<sensor>`: create a sensor topic
//!
//! Direct creation answers 409 when the topic already exists.

use crate::config::ServerConfig;
use crate::ingest::{ContractIngestion, IngestError};
use crate::provision::provision;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use topicsync_adapter_catalog::CatalogError;
use topicsync_adapter_kafka::TopicAdmin;
use topicsync_core::{resolve, sensor_topic, ProvisionOutcome, TopicName, TopicPolicy};

/// Usage hint for incomplete `/create` paths.
const CREATE_USAGE: &str =
    "creation of sensor must be of the form: '/create/<company>/<machine>/<sensor>'";

/// State shared by every request.
pub struct AppState {
    /// Broker admin
    pub admin: Arc<dyn TopicAdmin>,
    /// Contract ingestion flow
    pub ingestion: ContractIngestion,
    /// Policy for directly created topics
    pub policy: TopicPolicy,
}

/// A handled request: status and JSON body.
pub type Reply = (StatusCode, Value);

/// HTTP API server.
pub struct Server {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Create a new server.
    #[must_use]
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Bind the listen address.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.config.listen)
            .await
            .map_err(|e| ServerError::Bind(self.config.listen.to_string(), e.to_string()))
    }

    /// Serve connections from `listener` until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns error if accepting connections fails.
    pub async fn serve(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, "HTTP API listening");
        }

        loop {
            let (stream, remote_addr) = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = listener.accept() => {
                    accepted.map_err(|e| ServerError::Accept(e.to_string()))?
                }
            };

            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);
            let max_body_size = self.config.max_body_size;

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let state = Arc::clone(&state);
                    async move {
                        let (status, body) = dispatch(req, &state, max_body_size).await;
                        Ok::<_, std::convert::Infallible>(json_response(status, &body))
                    }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::warn!(%remote_addr, error = %e, "HTTP connection error");
                }
            });
        }

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

async fn dispatch(req: Request<Incoming>, state: &AppState, max_body_size: usize) -> Reply {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // Reading stops as soon as the limit is crossed.
    let body = match Limited::new(req.into_body(), max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            tracing::debug!(%method, path, max_body_size, "Request body over limit");
            return error_reply(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!("request body too large (max {max_body_size} bytes)"),
            );
        }
        Err(e) => {
            return error_reply(
                StatusCode::BAD_REQUEST,
                &format!("failed to read body: {e}"),
            )
        }
    };

    tracing::debug!(%method, path, body_len = body.len(), "HTTP request");

    handle(state, &method, &path, &body).await
}

/// Route one request.
pub async fn handle(state: &AppState, method: &Method, path: &str, body: &[u8]) -> Reply {
    let segments: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect();
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match (method, segments.as_slice()) {
        (&Method::GET, [""] | ["status"]) => status(state).await,
        (&Method::POST, ["submit_contract"]) => submit_contract(state, body).await,
        (&Method::POST, ["channels"]) => create_channel(state, body).await,
        (&Method::POST, ["create_sensor"]) => create_sensor(state, body).await,
        (&Method::GET, ["create", company, machine, sensor]) => {
            create_direct(state, sensor_topic(company, machine, sensor)).await
        }
        (&Method::GET, ["create"] | ["create", _] | ["create", _, _]) => {
            error_reply(StatusCode::BAD_REQUEST, CREATE_USAGE)
        }
        _ => error_reply(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn status(state: &AppState) -> Reply {
    let topics = match state.admin.list_topics().await {
        Ok(topics) => topics,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to list topics");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        json!({
            "application": "topicsync",
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running",
            "topics": topics,
        }),
    )
}

async fn submit_contract(state: &AppState, body: &[u8]) -> Reply {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, &format!("invalid JSON: {e}")),
    };

    match state.ingestion.submit(&payload).await {
        Ok(ingested) => (StatusCode::OK, ingested.document),
        Err(IngestError::Catalog(err)) => catalog_error_reply(&err),
    }
}

fn catalog_error_reply(err: &CatalogError) -> Reply {
    match err {
        CatalogError::WriteRejected { status, body } => (
            StatusCode::CONFLICT,
            json!({
                "error": "Couldn't create instance",
                "catalog_status": status,
                "catalog_body": body,
            }),
        ),
        CatalogError::Unavailable(_) => {
            error_reply(StatusCode::SERVICE_UNAVAILABLE, &err.to_string())
        }
        CatalogError::Parse(_) | CatalogError::Entity(_) => {
            error_reply(StatusCode::BAD_GATEWAY, &err.to_string())
        }
        CatalogError::Init(_) => error_reply(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ChannelRequest {
    id: u64,
    owner: Value,
}

async fn create_channel(state: &AppState, body: &[u8]) -> Reply {
    let request: ChannelRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, &format!("invalid request: {e}")),
    };
    let owner = match request.owner {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => return error_reply(StatusCode::BAD_REQUEST, "owner must be a string or number"),
    };

    create_direct(state, resolve(request.id, &owner)).await
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SensorSpec {
    company: String,
    system: String,
    sensor: String,
}

#[derive(Debug, Deserialize)]
struct SensorRequest {
    sensor: SensorSpec,
}

async fn create_sensor(state: &AppState, body: &[u8]) -> Reply {
    let request: SensorRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_reply(StatusCode::BAD_REQUEST, &format!("invalid request: {e}")),
    };
    let spec = request.sensor;

    create_direct(state, sensor_topic(&spec.company, &spec.system, &spec.sensor)).await
}

async fn create_direct(state: &AppState, topic: TopicName) -> Reply {
    if topic.is_empty() {
        return error_reply(
            StatusCode::BAD_REQUEST,
            "topic identifier is empty after sanitization",
        );
    }

    match provision(state.admin.as_ref(), &topic, &state.policy.topic_config()).await {
        ProvisionOutcome::Created => (
            StatusCode::CREATED,
            json!({"topic": topic, "outcome": "created"}),
        ),
        ProvisionOutcome::AlreadyExists => {
            tracing::warn!(topic = %topic, "Couldn't create topic, topic already exists");
            (
                StatusCode::CONFLICT,
                json!({"topic": topic, "error": "topic already exists"}),
            )
        }
        ProvisionOutcome::Failed(detail) => (
            StatusCode::BAD_GATEWAY,
            json!({"topic": topic, "error": detail}),
        ),
    }
}

fn error_reply(status: StatusCode, message: &str) -> Reply {
    (status, json!({ "error": message }))
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Errors that can occur in the HTTP API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind the listen address
    #[error("failed to bind {0}: {1}")]
    Bind(String, String),
    /// Failed to accept a connection
    #[error("accept failed: {0}")]
    Accept(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use topicsync_adapter_catalog::{Catalog, MemoryCatalog};
    use topicsync_adapter_kafka::MemoryAdmin;

    fn app_state(catalog: &Arc<MemoryCatalog>, admin: &Arc<MemoryAdmin>) -> AppState {
        let admin_dyn = Arc::clone(admin) as Arc<dyn TopicAdmin>;
        AppState {
            admin: Arc::clone(&admin_dyn),
            ingestion: ContractIngestion::new(
                Arc::clone(catalog) as Arc<dyn Catalog>,
                admin_dyn,
                TopicPolicy::default(),
            ),
            policy: TopicPolicy::default(),
        }
    }

    fn fixtures() -> (Arc<MemoryCatalog>, Arc<MemoryAdmin>) {
        (Arc::new(MemoryCatalog::new()), Arc::new(MemoryAdmin::new()))
    }

    #[tokio::test]
    async fn status_lists_topics() {
        let (catalog, _) = fixtures();
        let admin = Arc::new(MemoryAdmin::with_topics(["eu.a.b.c"]));
        let state = app_state(&catalog, &admin);

        for path in ["/", "/status"] {
            let (code, body) = handle(&state, &Method::GET, path, b"").await;
            assert_eq!(code, StatusCode::OK);
            assert_eq!(body["status"], "running");
            assert_eq!(body["topics"], json!(["eu.a.b.c"]));
        }
    }

    #[tokio::test]
    async fn status_survives_listing_failure() {
        let (catalog, admin) = fixtures();
        admin.fail_listing();
        let state = app_state(&catalog, &admin);

        let (code, body) = handle(&state, &Method::GET, "/status", b"").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["topics"], json!([]));
    }

    #[tokio::test]
    async fn channel_created_then_conflict() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);
        let body = br#"{"id": 42, "owner": "acme"}"#;

        let (code, reply) = handle(&state, &Method::POST, "/channels", body).await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(reply["topic"], "eu.ChannelID_42.CompanyID_acme");

        let (code, _) = handle(&state, &Method::POST, "/channels", body).await;
        assert_eq!(code, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn broker_failure_is_bad_gateway() {
        let (catalog, admin) = fixtures();
        admin.fail_all("Error: Broker may not be available.");
        let state = app_state(&catalog, &admin);

        let (code, reply) =
            handle(&state, &Method::POST, "/channels", br#"{"id": 1, "owner": 7}"#).await;
        assert_eq!(code, StatusCode::BAD_GATEWAY);
        assert_eq!(reply["topic"], "eu.ChannelID_1.CompanyID_7");
        assert_eq!(reply["error"], "Error: Broker may not be available.");
    }

    #[tokio::test]
    async fn create_sensor_routes() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);

        let body = br#"{"sensor": {"company": "srfg", "system": "ultimaker", "sensor": "temp122"}}"#;
        let (code, _) = handle(&state, &Method::POST, "/create_sensor", body).await;
        assert_eq!(code, StatusCode::CREATED);

        let (code, _) =
            handle(&state, &Method::GET, "/create/srfg/ultimaker/temp122", b"").await;
        assert_eq!(code, StatusCode::CONFLICT);

        let (code, reply) =
            handle(&state, &Method::GET, "/create/srfg/3d%20printer/temp1", b"").await;
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(reply["topic"], "eu.srfg.3d-printer.temp1");
    }

    #[tokio::test]
    async fn incomplete_create_path_shows_usage() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);

        for path in ["/create", "/create/srfg", "/create/srfg/ultimaker"] {
            let (code, reply) = handle(&state, &Method::GET, path, b"").await;
            assert_eq!(code, StatusCode::BAD_REQUEST);
            assert_eq!(reply["error"], CREATE_USAGE);
        }
        assert!(admin.attempts().is_empty());
    }

    #[tokio::test]
    async fn empty_topic_is_rejected() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);

        let (code, _) = create_direct(&state, TopicName::sanitize("///")).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(admin.attempts().is_empty());
    }

    #[tokio::test]
    async fn submit_contract_returns_entity() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);

        let body = br#"{"name": "press", "properties": {"owner": "acme"}}"#;
        let (code, reply) = handle(&state, &Method::POST, "/submit_contract", body).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(reply["@iot.id"], 1);
        assert_eq!(reply["name"], "press");
        assert!(admin.topics().contains("eu.ChannelID_1.CompanyID_acme"));
    }

    #[tokio::test]
    async fn submit_contract_catalog_errors() {
        let (catalog, admin) = fixtures();
        catalog.reject_writes(400, "bad entity");
        let state = app_state(&catalog, &admin);

        let body = br#"{"properties": {"owner": "acme"}}"#;
        let (code, reply) = handle(&state, &Method::POST, "/submit_contract", body).await;
        assert_eq!(code, StatusCode::CONFLICT);
        assert_eq!(reply["catalog_status"], 400);
        assert_eq!(reply["catalog_body"], "bad entity");

        let (code, _) = handle(&state, &Method::POST, "/submit_contract", b"not json").await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(admin.attempts().is_empty());

        let (catalog, admin) = fixtures();
        catalog.fail_writes();
        let state = app_state(&catalog, &admin);
        let (code, _) = handle(&state, &Method::POST, "/submit_contract", body).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_route() {
        let (catalog, admin) = fixtures();
        let state = app_state(&catalog, &admin);

        let (code, _) = handle(&state, &Method::DELETE, "/channels", b"").await;
        assert_eq!(code, StatusCode::NOT_FOUND);
    }
}
