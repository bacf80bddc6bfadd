//! # Estado da Aplicação Web
//!
//! ```text
//! AppState (Clone, barato)
//!   └── registry: SessionRegistry
//!         ├── sessões + timers
//!         ├── parser (imutável)
//!         └── store (Arc<dyn OrderStore>)
//! ```

use std::sync::Arc;

use crate::session::SessionRegistry;
use crate::store::OrderStore;

/// Estado compartilhado da aplicação Axum.
#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
}

impl AppState {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        self.registry.store()
    }
}
