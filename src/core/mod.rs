//! # Módulo Core — Tipos Fundamentais do Domínio
//!
//! Tipos compartilhados por todas as camadas do sistema de pedidos:
//!
//! - [`Catalog`] / [`catalog::CatalogEntry`] — produtos fixos com quantidades por sessão
//! - [`ParsedOrderLine`] — linha (produto, quantidade, score) produzida pelo parser
//! - [`OrderBatch`] / [`OrderItem`] / [`BatchLabel`] — lotes gravados no Order Store
//!
//! ## Analogia com o Mundo Real
//!
//! Pense no [`Catalog`] como a **comanda** de uma banca de frutas: a lista de
//! produtos é impressa uma vez, e cada cliente recebe a sua cópia para anotar
//! quantidades. Quando a comanda é confirmada (ou esquecida por tempo demais),
//! ela vira um [`OrderBatch`] no livro de pedidos.

/// Sub-módulo com [`Catalog`] e [`catalog::CatalogEntry`].
pub mod catalog;

/// Sub-módulo com linhas de pedido e lotes persistidos.
pub mod order;

pub use catalog::Catalog;
pub use order::{BatchId, BatchLabel, OrderBatch, OrderItem, ParsedOrderLine};
