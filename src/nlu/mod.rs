//! # NLU de Pedidos — Compreensão de Mensagens de Compra
//!
//! Este módulo leva uma mensagem informal em português até linhas de pedido
//! estruturadas contra o catálogo. Não há modelo de ML: tudo é léxico fechado
//! e similaridade por distância de edição.
//!
//! ## Fluxo de Processamento
//!
//! ```text
//! Mensagem do cliente
//!   ├── 1. normalize()                (minúsculas, sem acentos)
//!   ├── 2. Tokenizer::prepare_tokens  (separa "2mangas", remove pontuação)
//!   ├── 3. extract_numbers_and_positions (dígitos e números por extenso)
//!   ├── 4. Passada 1: candidatos de produto (fuzzy ≥ limiar)
//!   └── 5. Passada 2: quantidades por afinidade numérica
//! ```
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|-----------------|
//! | [`normalize`] | Normalização Unicode e tokenização posicional |
//! | [`numbers`] | Léxico numérico 0–999 e extração de números |
//! | [`fuzzy`] | Distância de Levenshtein e similaridade 0–100 |
//! | [`parser`] | Algoritmo de duas passadas ([`OrderParser`]) |

/// Sub-módulo de similaridade fuzzy.
pub mod fuzzy;

/// Sub-módulo de normalização e tokenização.
pub mod normalize;

/// Sub-módulo do léxico numérico.
pub mod numbers;

/// Sub-módulo do parser de pedidos.
pub mod parser;

pub use normalize::normalize;
pub use parser::{OrderParser, ParserConfig};
