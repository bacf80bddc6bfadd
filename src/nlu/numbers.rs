//! # Léxico Numérico — Números por Extenso em Português (0–999)
//!
//! Vocabulário fechado, dividido em quatro classes:
//!
//! | Classe | Valores | Exemplos |
//! |--------|---------|----------|
//! | unidades | 0–9 | "um", "duas", "treis", "cnico" |
//! | dezenas especiais | 10–19 | "dez", "catorze", "dezenove" |
//! | dezenas | 20–90 | "vinte", "cinquenta" |
//! | centenas | 100–900 | "cem", "cento", "quinhentos" |
//!
//! As unidades incluem grafias erradas comuns em mensagens digitadas às
//! pressas ("dos", "quarto", "ses", "nov").
//!
//! ## Composição
//!
//! ```text
//! "cento e vinte e cinco mangas"
//!   └── extract_numbers_and_positions()
//!         run: [cento, e, vinte, e, cinco]  → sem conectores → [cento, vinte, cinco]
//!         parse_number_words()              → 100 + 20 + 5 = 125
//!         NumberToken { position: 0, end: 4, value: 125 }
//! ```

use super::normalize::is_digits;

/// Conector "e" entre palavras numéricas.
const CONNECTOR: &str = "e";

const UNITS: &[(&str, u32)] = &[
    ("zero", 0),
    ("um", 1),
    ("uma", 1),
    ("dois", 2),
    ("duas", 2),
    ("dos", 2),
    ("tres", 3),
    ("treis", 3),
    ("quatro", 4),
    ("quarto", 4),
    ("cinco", 5),
    ("cnico", 5),
    ("seis", 6),
    ("ses", 6),
    ("sete", 7),
    ("oito", 8),
    ("nove", 9),
    ("nov", 9),
];

const TEENS: &[(&str, u32)] = &[
    ("dez", 10),
    ("onze", 11),
    ("doze", 12),
    ("treze", 13),
    ("quatorze", 14),
    ("catorze", 14),
    ("quinze", 15),
    ("dezesseis", 16),
    ("dezessete", 17),
    ("dezoito", 18),
    ("dezenove", 19),
];

const TENS: &[(&str, u32)] = &[
    ("vinte", 20),
    ("trinta", 30),
    ("quarenta", 40),
    ("cinquenta", 50),
    ("sessenta", 60),
    ("setenta", 70),
    ("oitenta", 80),
    ("noventa", 90),
];

const HUNDREDS: &[(&str, u32)] = &[
    ("cem", 100),
    ("cento", 100),
    ("duzentos", 200),
    ("trezentos", 300),
    ("quatrocentos", 400),
    ("quinhentos", 500),
    ("seiscentos", 600),
    ("setecentos", 700),
    ("oitocentos", 800),
    ("novecentos", 900),
];

fn lookup(table: &[(&str, u32)], word: &str) -> Option<u32> {
    table.iter().find(|(w, _)| *w == word).map(|(_, v)| *v)
}

/// Todas as palavras do vocabulário numérico.
pub fn vocabulary() -> impl Iterator<Item = &'static str> {
    UNITS
        .iter()
        .chain(TEENS)
        .chain(TENS)
        .chain(HUNDREDS)
        .map(|(w, _)| *w)
}

/// Valor de uma palavra numérica isolada, em qualquer classe.
pub fn word_value(word: &str) -> Option<u32> {
    lookup(UNITS, word)
        .or_else(|| lookup(TEENS, word))
        .or_else(|| lookup(TENS, word))
        .or_else(|| lookup(HUNDREDS, word))
}

pub fn is_number_word(word: &str) -> bool {
    word_value(word).is_some()
}

/// `true` para dígitos ou palavras numéricas.
pub fn is_numeric_token(token: &str) -> bool {
    is_digits(token) || is_number_word(token)
}

/// Número extraído da mensagem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberToken {
    /// Posição do primeiro token do número.
    pub position: usize,
    /// Posição do último token (igual a `position` para dígitos e palavras soltas).
    pub end: usize,
    pub value: u32,
}

/// Converte palavras numéricas (sem conectores) em um inteiro.
///
/// Centenas somam seu valor; uma dezena consome a unidade imediatamente
/// seguinte; dezenas especiais e unidades somam direto. Retorna `None`
/// se o total for zero.
pub fn parse_number_words<S: AsRef<str>>(tokens: &[S]) -> Option<u32> {
    let mut total: u32 = 0;
    let mut i = 0;
    while i < tokens.len() {
        let t = tokens[i].as_ref();
        if let Some(v) = lookup(HUNDREDS, t) {
            total += v;
            i += 1;
        } else if let Some(v) = lookup(TENS, t) {
            let unit = tokens.get(i + 1).and_then(|next| lookup(UNITS, next.as_ref()));
            match unit {
                Some(u) => {
                    total += v + u;
                    i += 2;
                }
                None => {
                    total += v;
                    i += 1;
                }
            }
        } else if let Some(v) = lookup(TEENS, t).or_else(|| lookup(UNITS, t)) {
            total += v;
            i += 1;
        } else {
            i += 1;
        }
    }
    (total > 0).then_some(total)
}

/// Encontra todos os números da mensagem com suas posições.
///
/// Dígitos viram um número direto. Uma palavra numérica abre uma sequência
/// que se estende por pares "e" + palavra numérica; a sequência inteira
/// vira um único valor ancorado na primeira posição.
pub fn extract_numbers_and_positions<S: AsRef<str>>(tokens: &[S]) -> Vec<NumberToken> {
    let mut numbers = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let t = tokens[i].as_ref();
        if is_digits(t) {
            match t.parse::<u32>() {
                Ok(value) => numbers.push(NumberToken { position: i, end: i, value }),
                Err(_) => tracing::debug!(token = t, "Número fora do intervalo ignorado"),
            }
            i += 1;
        } else if is_number_word(t) {
            let mut words = vec![t];
            let mut j = i + 1;
            while j + 1 < tokens.len()
                && tokens[j].as_ref() == CONNECTOR
                && is_number_word(tokens[j + 1].as_ref())
            {
                words.push(tokens[j + 1].as_ref());
                j += 2;
            }
            match parse_number_words(words.as_slice()) {
                Some(value) => {
                    numbers.push(NumberToken { position: i, end: j - 1, value });
                    i = j;
                }
                None => i += 1,
            }
        } else {
            i += 1;
        }
    }
    numbers
}
