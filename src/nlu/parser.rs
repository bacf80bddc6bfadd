//! # Parser de Pedidos — Texto Livre → Linhas (Produto, Quantidade)
//!
//! O [`OrderParser`] transforma uma mensagem informal como
//! `"quero 2mangas e tres queijo"` em linhas estruturadas contra o catálogo.
//!
//! ## Algoritmo em Duas Passadas
//!
//! ```text
//! Mensagem
//!   ├── Tokenizer::prepare_tokens()             → [quero, 2, mangas, e, tres, queijo]
//!   ├── extract_numbers_and_positions()         → [(1, 2), (4, 3)]
//!   │
//!   ├── Passada 1 — descoberta de candidatos
//!   │   └── janelas de até min(L, 4) tokens, da maior para a menor;
//!   │       melhor similaridade ≥ limiar → candidato;
//!   │       senão, token sozinho com score > piso fraco → candidato fraco
//!   │
//!   └── Passada 2 — afinidade numérica
//!       ├── classe 0: número imediatamente antes
//!       ├── classe 1: algum número antes
//!       ├── classe 2: número imediatamente depois
//!       ├── classe 3: algum número depois
//!       └── classe 4: nenhum (quantidade 1)
//! ```
//!
//! Os candidatos são processados por classe crescente (ordenação estável),
//! para que uma associação inequívoca ("2 mangas") seja resolvida antes que
//! um produto anterior na frase "roube" o número.
//!
//! ## Invariantes
//!
//! - O catálogo de entrada nunca é modificado; o resultado traz uma cópia.
//! - Cada número é consumido por no máximo uma linha.
//! - Um produto que recebe quantidade 0 não gera linha.
//! - Texto irreconhecível produz zero linhas, nunca erro.

use std::collections::HashSet;

use crate::core::{Catalog, ParsedOrderLine};

use super::fuzzy::similarity;
use super::normalize::{normalize, Tokenizer};
use super::numbers::{extract_numbers_and_positions, is_numeric_token, NumberToken};

/// Palavras de preenchimento ignoradas quando não fazem parte de um produto.
const FILLER_WORDS: &[&str] = &["quero", "e"];

/// Maior janela de tokens testada contra o catálogo.
const MAX_WINDOW: usize = 4;

/// Parâmetros ajustáveis do parser.
#[derive(Clone, Debug, PartialEq)]
pub struct ParserConfig {
    /// Score mínimo (0–100) para aceitar uma janela como produto.
    pub similarity_threshold: f64,
    /// Score que um token isolado precisa superar no fallback fraco.
    pub weak_match_floor: f64,
    /// Aceita palpites fracos de um token só. Pode confundir produtos parecidos.
    pub accept_weak_matches: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 80.0,
            weak_match_floor: 50.0,
            accept_weak_matches: true,
        }
    }
}

/// Trecho da mensagem casado com um produto (span inclusivo).
#[derive(Clone, Debug, PartialEq)]
pub struct ProductMatch {
    pub start: usize,
    pub end: usize,
    /// Índice do produto no catálogo.
    pub product: usize,
    pub score: f64,
}

/// Resultado de [`OrderParser::parse`].
#[derive(Clone, Debug)]
pub struct ParseOutcome {
    /// Linhas na ordem em que as quantidades foram atribuídas.
    pub lines: Vec<ParsedOrderLine>,
    /// Cópia do catálogo com as quantidades somadas.
    pub catalog: Catalog,
}

/// Nome de produto pré-processado.
struct ProductName {
    display: String,
    normalized: String,
}

/// Parser fuzzy de pedidos para um catálogo fixo.
///
/// Construído uma vez na inicialização e compartilhado (`&self`) entre
/// todas as sessões.
pub struct OrderParser {
    config: ParserConfig,
    tokenizer: Tokenizer,
    /// Produtos na ordem do catálogo.
    products: Vec<ProductName>,
    /// Índices dos produtos por número de palavras (decrescente, estável).
    ranked: Vec<usize>,
    /// Palavras normalizadas que aparecem em algum nome de produto.
    vocabulary: HashSet<String>,
    /// Número de palavras do maior nome de produto (L).
    max_words: usize,
}

impl OrderParser {
    pub fn new(catalog: &Catalog, config: ParserConfig) -> Self {
        let products: Vec<ProductName> = catalog
            .entries()
            .iter()
            .map(|e| ProductName {
                display: e.name.clone(),
                normalized: normalize(&e.name),
            })
            .collect();

        let vocabulary: HashSet<String> = products
            .iter()
            .flat_map(|p| p.normalized.split_whitespace().map(str::to_string))
            .collect();

        let word_count = |i: &usize| products[*i].normalized.split_whitespace().count();
        let mut ranked: Vec<usize> = (0..products.len()).collect();
        ranked.sort_by_key(|i| std::cmp::Reverse(word_count(i)));
        let max_words = ranked.first().map(word_count).unwrap_or(0);

        let words: Vec<&String> = vocabulary.iter().collect();
        let tokenizer = Tokenizer::new(words.as_slice());

        tracing::debug!(
            products = products.len(),
            max_words,
            vocabulary = vocabulary.len(),
            "Parser de pedidos inicializado"
        );

        Self {
            config,
            tokenizer,
            products,
            ranked,
            vocabulary,
            max_words,
        }
    }

    /// Reconhece produtos e quantidades em `message`, somando-os a uma cópia de `catalog`.
    pub fn parse(&self, message: &str, catalog: &Catalog) -> ParseOutcome {
        let tokens = self.tokenizer.prepare_tokens(message);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        let candidates = self.discover_candidates(&texts);
        let mut catalog = catalog.clone();
        if candidates.is_empty() {
            tracing::debug!(tokens = ?texts, "Nenhum produto reconhecido");
            return ParseOutcome {
                lines: Vec::new(),
                catalog,
            };
        }

        // Números dentro de um nome de produto não são quantidades
        let numbers: Vec<NumberToken> = extract_numbers_and_positions(&texts)
            .into_iter()
            .filter(|n| !candidates.iter().any(|c| n.position <= c.end && n.end >= c.start))
            .collect();

        let mut lines = Vec::with_capacity(candidates.len());
        for (candidate, quantity) in assign_quantities(&candidates, &numbers) {
            let product = &self.products[candidate.product];
            // "0 mangas": o número é consumido, mas nada é pedido
            if quantity == 0 {
                tracing::debug!(product = %product.display, "Quantidade zero ignorada");
                continue;
            }
            catalog.add(&product.display, quantity);
            lines.push(ParsedOrderLine {
                product: product.display.clone(),
                quantity,
                score: (candidate.score * 100.0).round() / 100.0,
            });
        }

        tracing::debug!(lines = ?lines, "Pedido interpretado");
        ParseOutcome { lines, catalog }
    }

    /// Passada 1: encontra trechos da mensagem que correspondem a produtos.
    pub fn discover_candidates(&self, tokens: &[&str]) -> Vec<ProductMatch> {
        let mut candidates = Vec::new();
        let mut consumed = vec![false; tokens.len()];
        let largest = self.max_words.min(MAX_WINDOW);

        let mut i = 0;
        while i < tokens.len() {
            if consumed[i] || self.is_skippable(tokens[i]) {
                i += 1;
                continue;
            }

            let mut matched = false;
            for size in (1..=largest).rev() {
                if i + size > tokens.len() {
                    continue;
                }
                let window = &tokens[i..i + size];
                if consumed[i..i + size].iter().any(|c| *c)
                    || window.iter().any(|t| self.is_skippable(t))
                {
                    continue;
                }

                let phrase = window.join(" ");
                let Some((product, score)) = self.best_match(&phrase, &self.ranked) else {
                    continue;
                };
                if score >= self.config.similarity_threshold {
                    candidates.push(ProductMatch {
                        start: i,
                        end: i + size - 1,
                        product,
                        score,
                    });
                    consumed[i..i + size].iter_mut().for_each(|c| *c = true);
                    i += size;
                    matched = true;
                    break;
                }
            }
            if matched {
                continue;
            }

            if self.config.accept_weak_matches {
                let catalog_order: Vec<usize> = (0..self.products.len()).collect();
                if let Some((product, score)) = self.best_match(tokens[i], &catalog_order) {
                    if score > self.config.weak_match_floor {
                        tracing::debug!(
                            token = tokens[i],
                            product = %self.products[product].display,
                            score,
                            "Palpite fraco aceito"
                        );
                        candidates.push(ProductMatch {
                            start: i,
                            end: i,
                            product,
                            score,
                        });
                        consumed[i] = true;
                    }
                }
            }
            i += 1;
        }

        candidates
    }

    /// Filler ou número que não faz parte de nenhum nome de produto.
    fn is_skippable(&self, token: &str) -> bool {
        if self.vocabulary.contains(token) {
            return false;
        }
        FILLER_WORDS.contains(&token) || is_numeric_token(token)
    }

    /// Produto de maior similaridade com `phrase`; empates ficam com o primeiro de `order`.
    fn best_match(&self, phrase: &str, order: &[usize]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for &idx in order {
            let score = similarity(phrase, &self.products[idx].normalized);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }
        best
    }
}

/// Classe de afinidade (0–4) e o número escolhido, entre os ainda não usados.
fn affinity(candidate: &ProductMatch, numbers: &[NumberToken], used: &[bool]) -> (u8, Option<usize>) {
    let free = || numbers.iter().enumerate().filter(|(k, _)| !used[*k]);

    if let Some((k, _)) = free().find(|(_, n)| n.end + 1 == candidate.start) {
        return (0, Some(k));
    }
    if let Some((k, _)) = free()
        .filter(|(_, n)| n.end < candidate.start)
        .max_by_key(|(_, n)| n.end)
    {
        return (1, Some(k));
    }
    if let Some((k, _)) = free().find(|(_, n)| n.position == candidate.end + 1) {
        return (2, Some(k));
    }
    if let Some((k, _)) = free()
        .filter(|(_, n)| n.position > candidate.end)
        .min_by_key(|(_, n)| n.position)
    {
        return (3, Some(k));
    }
    (4, None)
}

/// Passada 2: atribui quantidades por afinidade numérica.
///
/// Retorna os candidatos na ordem de processamento, cada um com sua quantidade.
fn assign_quantities<'a>(
    candidates: &'a [ProductMatch],
    numbers: &[NumberToken],
) -> Vec<(&'a ProductMatch, u32)> {
    let mut used = vec![false; numbers.len()];

    let mut order: Vec<(u8, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (affinity(c, numbers, &used).0, idx))
        .collect();
    order.sort_by_key(|(class, _)| *class);

    let mut assigned = Vec::with_capacity(candidates.len());
    for (_, idx) in order {
        let candidate = &candidates[idx];
        let quantity = match affinity(candidate, numbers, &used).1 {
            Some(k) => {
                used[k] = true;
                numbers[k].value
            }
            None => 1,
        };
        assigned.push((candidate, quantity));
    }
    assigned
}
