//! # Normalização e Tokenização de Mensagens
//!
//! Mensagens de pedido chegam informais e cheias de erros: acentos faltando,
//! números grudados em palavras ("2mangas"), pontuação no meio. Este módulo
//! leva o texto bruto até uma sequência de [`Token`]s posicionais.
//!
//! ## Etapas
//!
//! ```text
//! "Quero 2mangas,DEZESSEISqueijos!"
//!   ├── 1. normalize()            → "quero 2mangas,dezesseisqueijos!"
//!   ├── 2. dígito|letra           → "quero 2 mangas,dezesseisqueijos!"
//!   ├── 3. pontuação → espaço     → "quero 2 mangas dezesseisqueijos!"
//!   ├── 4. números longos         → "quero 2 mangas  dezesseis queijos!"
//!   ├── 5. split_whitespace       → [quero, 2, mangas, dezesseis, queijos!]
//!   └── 6. prefixos numéricos     → "cincomangas" → [cinco, mangas]
//! ```
//!
//! A etapa 4 separa palavras numéricas longas (≥ 6 letras, como
//! "dezesseis" ou "trezentos") em qualquer ponto do texto. A etapa 6 trata
//! as de 4 e 5 letras ("cinco", "vinte", "doze") só no início de um token
//! seguido de letras, para não partir "biscoito" em "bisc oito".
//! Palavras de 2 e 3 letras ("um", "dos") aparecem dentro de palavras
//! comuns ("algum", "pedidos") e nunca são isoladas.

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::numbers;

/// Comprimento mínimo para uma palavra numérica ser isolada em qualquer posição.
const GLUED_NUMBER_MIN_LEN: usize = 6;

/// Comprimento mínimo para uma palavra numérica ser separada do início de um token.
const NUMBER_PREFIX_MIN_LEN: usize = 4;

/// Token de uma mensagem com sua posição estável (índice a partir de 0).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: usize,
}

/// Minúsculas, decomposição canônica (NFD) sem marcas combinantes, e trim.
///
/// Idempotente: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    folded.trim().to_string()
}

/// `true` se o token é uma sequência de dígitos ASCII.
pub fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Tokenizador com regras compiladas uma única vez.
///
/// Recebe as palavras do catálogo na construção para nunca partir um nome
/// de produto que contenha uma palavra numérica.
pub struct Tokenizer {
    /// Dígito seguido de letra: "2mangas".
    digit_letter_re: Regex,
    /// Letra seguida de dígito: "mangas2".
    letter_digit_re: Regex,
    /// Pontuação tratada como separador.
    punctuation_re: Regex,
    /// Palavras numéricas longas, da maior para a menor.
    glued_number_re: Option<Regex>,
    /// Palavras numéricas curtas aceitas como prefixo, da maior para a menor.
    number_prefixes: Vec<&'static str>,
    /// Palavras do catálogo, nunca partidas.
    protected: Vec<String>,
}

impl Tokenizer {
    /// Cria o tokenizador, protegendo as palavras de `catalog_words`.
    pub fn new<S: AsRef<str>>(catalog_words: &[S]) -> Self {
        let protected: Vec<String> = catalog_words.iter().map(|w| normalize(w.as_ref())).collect();

        let mut glued: Vec<&str> = numbers::vocabulary()
            .filter(|w| w.len() >= GLUED_NUMBER_MIN_LEN)
            .filter(|w| !protected.iter().any(|p| p != w && p.contains(w)))
            .collect();
        // Alternância leftmost-first: as mais longas primeiro ("seiscentos" antes de "seis")
        glued.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        glued.dedup();

        let glued_number_re = if glued.is_empty() {
            None
        } else {
            let alternation = glued
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("(?:{alternation})")).ok()
        };

        let mut number_prefixes: Vec<&'static str> = numbers::vocabulary()
            .filter(|w| (NUMBER_PREFIX_MIN_LEN..GLUED_NUMBER_MIN_LEN).contains(&w.len()))
            .collect();
        number_prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        number_prefixes.dedup();

        Self {
            digit_letter_re: Regex::new(r"([0-9])(\p{L})").unwrap(),
            letter_digit_re: Regex::new(r"(\p{L})([0-9])").unwrap(),
            punctuation_re: Regex::new(r"[,.;+\-/()\[\]:]").unwrap(),
            glued_number_re,
            number_prefixes,
            protected,
        }
    }

    /// Normaliza e quebra a mensagem em tokens posicionais.
    pub fn prepare_tokens(&self, text: &str) -> Vec<Token> {
        let text = normalize(text);
        let text = self.digit_letter_re.replace_all(&text, "$1 $2");
        let text = self.letter_digit_re.replace_all(&text, "$1 $2");
        let text = self.punctuation_re.replace_all(&text, " ");
        let text = match &self.glued_number_re {
            Some(re) => re.replace_all(&text, " $0 ").into_owned(),
            None => text.into_owned(),
        };

        text.split_whitespace()
            .flat_map(|t| self.split_number_prefix(t))
            .enumerate()
            .map(|(position, t)| Token {
                text: t.to_string(),
                position,
            })
            .collect()
    }

    /// "cincomangas" → ["cinco", "mangas"]; qualquer outro token passa intacto.
    fn split_number_prefix<'a>(&self, token: &'a str) -> Vec<&'a str> {
        if numbers::is_number_word(token) || self.protected.iter().any(|p| p == token) {
            return vec![token];
        }
        for word in &self.number_prefixes {
            if let Some(rest) = token.strip_prefix(word) {
                if !rest.is_empty() && rest.chars().all(char::is_alphabetic) {
                    return vec![&token[..word.len()], rest];
                }
            }
        }
        vec![token]
    }
}
