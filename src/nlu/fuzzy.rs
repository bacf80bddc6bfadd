//! # Similaridade Fuzzy por Distância de Edição
//!
//! Comparação tolerante a erros de digitação entre strings já normalizadas.
//! A distância de Levenshtein conta inserções, remoções e substituições
//! (custo 1 cada); a similaridade converte a distância em uma escala 0–100:
//!
//! ```text
//! similarity(a, b) = (1 - distância / max(|a|, |b|)) × 100
//! ```
//!
//! Os comprimentos são medidos em `char`s, não bytes.

/// Distância de Levenshtein com uma única linha de programação dinâmica.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            let above = row[j + 1];
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Similaridade percentual (0–100). Duas strings vazias têm similaridade 100.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein(a, b);
    (1.0 - distance as f64 / max_len as f64) * 100.0
}
