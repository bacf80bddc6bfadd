//! # Handlers HTTP — Os Endpoints do Chat de Pedidos
//!
//! Cada função pública neste módulo é um handler Axum, mapeado a uma
//! rota em [`super::create_router()`]. Todos respondem JSON no formato
//! `(StatusCode, Json<Value>)`.
//!
//! | Handler | Método | Rota | Uso |
//! |---------|--------|------|-----|
//! | `send_message` | POST | `/send_message` | Mensagem do usuário |
//! | `get_updates` | POST | `/get_updates` | Polling de avisos do bot |
//! | `get_orders` | GET | `/get_orders` | Totais atuais e gravados |
//! | `reset_session` | POST | `/reset_session` | Reinício manual |
//! | `list_batches` | GET | `/batches` | Lotes por rótulo |
//! | `confirm_batch` | POST | `/batches/{id}/confirm` | Pendente → confirmado |
//! | `delete_batch` | POST | `/batches/{id}/delete` | Descarta um lote |
//!
//! ## Sessões
//!
//! Sem `session_id` explícito, a sessão `"default"` é usada. Sessões são
//! criadas na primeira referência.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::core::{BatchId, BatchLabel};
use crate::session::SessionView;
use crate::store::{OrderStore, StoreError};

type ApiResponse = (StatusCode, Json<Value>);

const DEFAULT_SESSION: &str = "default";

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    #[serde(default = "default_session")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    pub label: Option<String>,
}

// ─── Respostas ───────────────────────────────────────────────────

/// Totais de todos os clientes, lidos do store.
struct PublicOrders {
    confirmed: BTreeMap<String, u32>,
    pending: BTreeMap<String, u32>,
}

fn public_orders(store: &dyn OrderStore) -> Result<PublicOrders, StoreError> {
    Ok(PublicOrders {
        confirmed: store.query_totals(BatchLabel::Confirmed)?,
        pending: store.query_totals(BatchLabel::Pending)?,
    })
}

fn current_orders(view: &SessionView) -> BTreeMap<String, u32> {
    view.current_orders.iter().cloned().collect()
}

/// Corpo com os pedidos da sessão e os totais públicos.
fn orders_body(state: &AppState, view: &SessionView) -> Result<Value, ApiResponse> {
    let orders = public_orders(state.store().as_ref()).map_err(store_failure)?;
    Ok(json!({
        "current_orders": current_orders(view),
        "confirmed_orders": orders.confirmed,
        "pending_orders": orders.pending,
    }))
}

fn error(status: StatusCode, message: impl Into<String>) -> ApiResponse {
    (status, Json(json!({ "error": message.into() })))
}

fn store_failure(e: StoreError) -> ApiResponse {
    match e {
        StoreError::UnknownBatch(_) => error(StatusCode::NOT_FOUND, e.to_string()),
        other => {
            tracing::error!(error = %other, "Falha no store de pedidos");
            error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// ─── Chat ────────────────────────────────────────────────────────

/// POST /send_message: processa uma mensagem do usuário.
///
/// A resposta do bot à própria mensagem vem em `bot_message`; avisos
/// gerados por timers chegam depois via `/get_updates`.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> ApiResponse {
    let message = request.message.trim();
    if message.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Mensagem vazia");
    }

    let (reply, view) = state.registry.process_message(&request.session_id, message);
    let mut body = match orders_body(&state, &view) {
        Ok(body) => body,
        Err(response) => return response,
    };
    body["status"] = json!(view.state);
    body["success"] = json!(reply.success);
    if let Some(bot_message) = reply.message {
        body["bot_message"] = json!(bot_message);
    }
    (StatusCode::OK, Json(body))
}

/// POST /get_updates: retira no máximo um aviso pendente da sessão.
pub async fn get_updates(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResponse {
    let (pending, view) = state.registry.next_pending_message(&request.session_id);
    let mut body = match orders_body(&state, &view) {
        Ok(body) => body,
        Err(response) => return response,
    };
    body["state"] = json!(view.state);
    body["reminders_sent"] = json!(view.reminders_sent);
    body["has_message"] = json!(pending.is_some());
    if let Some(bot_message) = pending {
        body["bot_message"] = json!(bot_message);
    }
    (StatusCode::OK, Json(body))
}

/// GET /get_orders?session_id=
pub async fn get_orders(
    State(state): State<AppState>,
    Query(request): Query<SessionRequest>,
) -> ApiResponse {
    let view = state.registry.view(&request.session_id);
    match orders_body(&state, &view) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(response) => response,
    }
}

/// POST /reset_session: reinício manual da conversa.
pub async fn reset_session(
    State(state): State<AppState>,
    Json(request): Json<SessionRequest>,
) -> ApiResponse {
    state.registry.reset(&request.session_id);
    tracing::info!(session_id = %request.session_id, "Sessão reiniciada manualmente");
    (StatusCode::OK, Json(json!({ "success": true })))
}

// ─── Lotes ───────────────────────────────────────────────────────

/// GET /batches?label=pending|confirmed (padrão: pending)
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
) -> ApiResponse {
    let label = match query.label.as_deref().map(str::parse::<BatchLabel>) {
        None => BatchLabel::Pending,
        Some(Ok(label)) => label,
        Some(Err(e)) => return error(StatusCode::BAD_REQUEST, e),
    };
    match state.store().list_batches(label) {
        Ok(batches) => (StatusCode::OK, Json(json!({ "label": label, "batches": batches }))),
        Err(e) => store_failure(e),
    }
}

/// POST /batches/{id}/confirm: o gerente confirma um lote pendente.
pub async fn confirm_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> ApiResponse {
    match state.store().relabel_batch(id, BatchLabel::Confirmed) {
        Ok(()) => {
            tracing::info!(batch_id = %id, "Lote confirmado pelo gerente");
            (StatusCode::OK, Json(json!({ "success": true })))
        }
        Err(e) => store_failure(e),
    }
}

/// POST /batches/{id}/delete
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> ApiResponse {
    match state.store().delete_batch(id) {
        Ok(()) => {
            tracing::info!(batch_id = %id, "Lote descartado pelo gerente");
            (StatusCode::OK, Json(json!({ "success": true })))
        }
        Err(e) => store_failure(e),
    }
}
