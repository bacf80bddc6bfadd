//! # Pedidos Chat — Chat de Pedidos com Lembretes
//!
//! **Ponto de entrada** do servidor: um chat em português onde cada cliente
//! digita pedidos em texto livre ("2 mangas e 3 queijos"), recebe um resumo
//! para confirmar e, se sumir, é lembrado até o pedido ser marcado como
//! pendente.
//!
//! ## Fluxo de Inicialização
//!
//! ```text
//! main()
//!   ├── Configura tracing/logging (RUST_LOG, padrão info)
//!   ├── Lê AppConfig do ambiente
//!   ├── Monta catálogo + OrderParser
//!   ├── Abre o journal de pedidos (ou store em memória)
//!   ├── Cria SessionRegistry + Router
//!   ├── Serve até Ctrl+C
//!   └── registry.shutdown() → cancela timers pendentes
//! ```
//!
//! ## Exemplo de Uso
//!
//! ```bash
//! cargo run
//! RUST_LOG=debug PEDIDOS_REMINDER_SECS=5 cargo run
//! ```

/// Módulo `config` — padrões e variáveis de ambiente.
mod config;

/// Módulo `core` — catálogo e lotes de pedido.
mod core;

/// Módulo `nlu` — normalização, números por extenso e parser de pedidos.
mod nlu;

/// Módulo `session` — máquina de estados por cliente e timers.
mod session;

/// Módulo `store` — persistência append-only dos lotes.
mod store;

/// Módulo `web` — API JSON em axum.
mod web;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core::Catalog;
use crate::nlu::OrderParser;
use crate::session::SessionRegistry;
use crate::store::{JournalOrderStore, MemoryOrderStore, OrderStore};
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🛒 Pedidos Chat — Starting...");

    let config = AppConfig::from_env().context("configuração inválida")?;

    let catalog = Catalog::default_products();
    let parser = Arc::new(OrderParser::new(&catalog, config.parser.clone()));
    let store = open_store(&config);

    let registry = SessionRegistry::new(catalog, parser, store, config.session.clone());
    let app = web::create_router(AppState::new(registry.clone()));

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("falha ao fazer bind em {}", config.addr))?;
    tracing::info!(addr = %config.addr, "🚀 Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("servidor axum encerrou com erro")?;

    registry.shutdown();
    tracing::info!("Servidor encerrado");
    Ok(())
}

/// Abre o journal configurado; se falhar, segue só com memória.
fn open_store(config: &AppConfig) -> Arc<dyn OrderStore> {
    let Some(path) = &config.store_path else {
        tracing::info!("Pedidos mantidos apenas em memória");
        return Arc::new(MemoryOrderStore::new());
    };

    match JournalOrderStore::open(path) {
        Ok(store) => {
            tracing::info!(path = %path.display(), "Journal de pedidos aberto");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Falha ao abrir journal de pedidos, usando memória"
            );
            Arc::new(MemoryOrderStore::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Falha ao escutar Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Sinal de encerramento recebido");
}
