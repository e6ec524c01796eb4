//! HTTP surface: three GET routes wired to the handlers, plus a static-file
//! fallback for `public/`. Translates between hex/raw-byte wire values and
//! the core's typed errors, and is the only layer that knows about HTTP
//! status codes.

use crate::crypto::rsa_ops;
use crate::error::Error;
use crate::handlers;
use crate::message::FieldRegistry;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use rsa::RsaPrivateKey;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tower_http::services::ServeDir;
use tracing::{error, warn};

const TOKEN_VALIDITY_MS: u64 = 48 * 60 * 60 * 1000;

/// Per-process state shared across requests. The RSA keys are lazily read
/// from their PEM files and parsed on first use, then cached in their
/// `OnceLock` cells for the rest of the process's life - a failed load
/// (missing file, bad PEM) is retried on the next request rather than
/// poisoning the cell.
pub struct AppState {
    pub registry: FieldRegistry,
    pub transport_key_path: String,
    pub token_key_path: String,
    transport_key: OnceLock<RsaPrivateKey>,
    token_key: OnceLock<RsaPrivateKey>,
    pub allow_list: Vec<String>,
}

impl AppState {
    /// Build state that loads its RSA keys lazily from `transport_key_path`
    /// / `token_key_path` on first use.
    pub fn new(
        registry: FieldRegistry,
        transport_key_path: String,
        token_key_path: String,
        allow_list: Vec<String>,
    ) -> AppState {
        AppState {
            registry,
            transport_key_path,
            token_key_path,
            transport_key: OnceLock::new(),
            token_key: OnceLock::new(),
            allow_list,
        }
    }

    /// Build state with already-materialized keys, bypassing the lazy PEM
    /// load - for tests and any embedder that already holds parsed keys.
    pub fn with_keys(
        registry: FieldRegistry,
        transport_key: RsaPrivateKey,
        token_key: RsaPrivateKey,
        allow_list: Vec<String>,
    ) -> AppState {
        AppState {
            registry,
            transport_key_path: String::new(),
            token_key_path: String::new(),
            transport_key: OnceLock::from(transport_key),
            token_key: OnceLock::from(token_key),
            allow_list,
        }
    }

    fn transport_key(&self) -> Result<&RsaPrivateKey, Error> {
        load_cached(&self.transport_key, &self.transport_key_path, "transport")
    }

    fn token_key(&self) -> Result<&RsaPrivateKey, Error> {
        load_cached(&self.token_key, &self.token_key_path, "token-signing")
    }
}

fn load_cached<'a>(
    cell: &'a OnceLock<RsaPrivateKey>,
    path: &str,
    purpose: &str,
) -> Result<&'a RsaPrivateKey, Error> {
    if let Some(key) = cell.get() {
        return Ok(key);
    }
    let pem = std::fs::read_to_string(path)
        .map_err(|e| Error::CryptoFailure(format!("reading {purpose} key at {path}: {e}")))?;
    let key = rsa_ops::load_private_key_pem(&pem)?;
    Ok(cell.get_or_init(|| key))
}

pub fn router(state: Arc<AppState>, public_dir: &str) -> Router {
    Router::new()
        .route("/keyinit/:iso", get(key_init))
        .route("/sale/:iso", get(sale))
        .route("/token/:serial", get(token))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .with_state(state)
}

/// Map a core [`Error`] to an HTTP response. Per the failure semantics,
/// everything surfaced here is a 500 with a bounded diagnostic string -
/// ISO-level errors (CRC/KCV mismatch) are already folded into a 200 OK
/// response by the handler and never reach this path.
fn internal_error(context: &str, err: Error) -> Response {
    error!(%err, context, "handler failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}")).into_response()
}

async fn key_init(State(state): State<Arc<AppState>>, Path(iso): Path<String>) -> Response {
    let transport_key = match state.transport_key() {
        Ok(key) => key,
        Err(err) => return internal_error("keyinit", err),
    };
    match handlers::key_init(&iso, &state.registry, transport_key) {
        Ok(hex_reply) => hex_reply.into_response(),
        Err(Error::MissingField { field: 63 }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Campo 63 no encontrado.").into_response()
        }
        Err(err) => internal_error("keyinit", err),
    }
}

async fn sale(State(state): State<Arc<AppState>>, Path(iso): Path<String>) -> Response {
    match handlers::sale(&iso, &state.registry) {
        Ok(hex_reply) => hex_reply.into_response(),
        Err(err) => internal_error("sale", err),
    }
}

async fn token(State(state): State<Arc<AppState>>, Path(serial): Path<String>) -> Response {
    let token_key = match state.token_key() {
        Ok(key) => key,
        Err(err) => return internal_error("token", err),
    };
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    match handlers::terminal_token(
        &serial,
        &state.allow_list,
        token_key,
        now_ms,
        TOKEN_VALIDITY_MS,
    ) {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(Error::BadToken { marker: "serial" }) => {
            warn!(serial, "terminal token requested for unknown serial");
            (StatusCode::BAD_REQUEST, "invalid ID").into_response()
        }
        Err(err) => internal_error("token", err),
    }
}
