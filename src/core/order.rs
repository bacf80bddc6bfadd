//! # Tipos de Pedido — Linhas Reconhecidas e Lotes Persistidos
//!
//! - [`ParsedOrderLine`] — saída do parser para cada produto reconhecido
//! - [`OrderItem`] — par (produto, quantidade) gravado em um lote
//! - [`BatchLabel`] — `confirmed` ou `pending` (escalonado)
//! - [`OrderBatch`] — lote endereçável individualmente no Order Store

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identificador de um lote no Order Store.
pub type BatchId = Uuid;

/// Uma linha de pedido reconhecida em uma mensagem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedOrderLine {
    /// Nome de exibição do produto no catálogo.
    pub product: String,
    /// Quantidade (sempre ≥ 1).
    pub quantity: u32,
    /// Similaridade (0–100) entre o trecho da mensagem e o nome do produto.
    pub score: f64,
}

/// Item de um lote: produto + quantidade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: String,
    pub quantity: u32,
}

impl From<(String, u32)> for OrderItem {
    fn from((product, quantity): (String, u32)) -> Self {
        Self { product, quantity }
    }
}

/// Rótulo de um lote: confirmado pelo cliente ou escalonado aguardando confirmação.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchLabel {
    Confirmed,
    Pending,
}

impl fmt::Display for BatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchLabel::Confirmed => write!(f, "confirmed"),
            BatchLabel::Pending => write!(f, "pending"),
        }
    }
}

impl FromStr for BatchLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => Ok(BatchLabel::Confirmed),
            "pending" => Ok(BatchLabel::Pending),
            other => Err(format!("rótulo de lote desconhecido: {other}")),
        }
    }
}

/// Lote gravado no Order Store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBatch {
    pub id: BatchId,
    pub session_id: String,
    pub label: BatchLabel,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
}

impl OrderBatch {
    /// Cria um lote novo com UUID v4 e timestamp atual.
    pub fn new(session_id: &str, items: Vec<OrderItem>, label: BatchLabel) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            label,
            items,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parses_case_insensitively() {
        assert_eq!("Pending".parse::<BatchLabel>(), Ok(BatchLabel::Pending));
        assert_eq!(" confirmed ".parse::<BatchLabel>(), Ok(BatchLabel::Confirmed));
        assert!("talvez".parse::<BatchLabel>().is_err());
    }

    #[test]
    fn label_serializes_snake_case() {
        let json = serde_json::to_string(&BatchLabel::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
