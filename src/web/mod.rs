//! # Módulo Web — API JSON do Chat de Pedidos
//!
//! Camada fina sobre o [`SessionRegistry`](crate::session::SessionRegistry):
//! cada rota traduz JSON ↔ chamadas síncronas do registry e do store.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ Cliente (chat web, polling)                               │
//! ├───────────────────────────────────────────────────────────┤
//! │ Axum Router (este módulo)                                 │
//! │  ├── POST /send_message          → resposta + pedidos      │
//! │  ├── POST /get_updates           → ≤1 aviso da fila       │
//! │  ├── GET  /get_orders            → totais                 │
//! │  ├── POST /reset_session         → reinício manual        │
//! │  ├── GET  /batches               → lotes por rótulo       │
//! │  ├── POST /batches/{id}/confirm  → pendente → confirmado  │
//! │  └── POST /batches/{id}/delete   → descarta lote          │
//! ├───────────────────────────────────────────────────────────┤
//! │ CorsLayer (permissivo)                                    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`state`] | Estado compartilhado (`AppState`) |
//! | [`handlers`] | Handlers Axum para cada rota |

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use state::AppState;

/// Cria o router Axum com todas as rotas da aplicação.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // ── Chat ──────────────────────────────────────────────
        .route("/send_message", post(handlers::send_message))
        .route("/get_updates", post(handlers::get_updates))
        .route("/get_orders", get(handlers::get_orders))
        .route("/reset_session", post(handlers::reset_session))
        // ── Lotes (gerente) ───────────────────────────────────
        .route("/batches", get(handlers::list_batches))
        .route("/batches/{id}/confirm", post(handlers::confirm_batch))
        .route("/batches/{id}/delete", post(handlers::delete_batch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
