//! # Catalog — Produtos à Venda e Quantidades da Sessão
//!
//! O [`Catalog`] é a lista **fixa e ordenada** de produtos carregada na
//! inicialização. Cada entrada carrega o nome de exibição (com acentos e
//! capitalização preservados) e uma quantidade corrente.
//!
//! ## Ciclo de Vida
//!
//! ```text
//! Catalog::from_names(PRODUCTS)      ← uma vez, na inicialização
//!   └── clone() por sessão            ← catálogo de trabalho
//!         ├── add()       ← linhas reconhecidas pelo parser
//!         └── zero()      ← confirmação, escalonamento, reset
//! ```
//!
//! O conjunto de nomes nunca muda em tempo de execução; apenas as
//! quantidades variam, e nunca ficam negativas (`u32`).

use serde::Serialize;

/// Produtos padrão da banca.
pub const DEFAULT_PRODUCTS: &[&str] = &[
    "limão",
    "abacaxi",
    "abacaxi com hortelã",
    "açaí",
    "acerola",
    "ameixa",
    "cajá",
    "cajú",
    "goiaba",
    "graviola",
    "manga",
    "maracujá",
    "morango",
    "seriguela",
    "tamarindo",
    "caixa de ovos",
    "ovo",
    "queijo",
];

/// Um produto do catálogo com a quantidade pedida até agora.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Nome de exibição (ex: "maracujá").
    pub name: String,
    /// Quantidade acumulada na sessão.
    pub quantity: u32,
}

/// Catálogo ordenado, com exatamente uma entrada por nome de produto.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Cria um catálogo zerado a partir de nomes de exibição.
    ///
    /// Nomes repetidos são ignorados após a primeira ocorrência, mantendo
    /// a invariante de uma entrada por produto.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for name in names {
            let name = name.into();
            if entries.iter().any(|e| e.name == name) {
                tracing::warn!(product = %name, "Produto duplicado no catálogo ignorado");
                continue;
            }
            entries.push(CatalogEntry { name, quantity: 0 });
        }
        Self { entries }
    }

    /// Catálogo com os [`DEFAULT_PRODUCTS`].
    pub fn default_products() -> Self {
        Self::from_names(DEFAULT_PRODUCTS.iter().copied())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Soma `quantity` ao produto `name`. Retorna `false` se o produto não existe.
    pub fn add(&mut self, name: &str, quantity: u32) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.quantity = entry.quantity.saturating_add(quantity);
                true
            }
            None => false,
        }
    }

    /// Quantidade atual de um produto (0 se desconhecido).
    #[cfg(test)]
    pub fn quantity(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map_or(0, |e| e.quantity)
    }

    /// `true` se algum produto tem quantidade > 0.
    pub fn has_items(&self) -> bool {
        self.entries.iter().any(|e| e.quantity > 0)
    }

    /// Zera todas as quantidades, preservando os produtos.
    pub fn zero(&mut self) {
        for entry in &mut self.entries {
            entry.quantity = 0;
        }
    }

    /// Itens com quantidade > 0, na ordem do catálogo.
    pub fn current_orders(&self) -> Vec<(String, u32)> {
        self.entries
            .iter()
            .filter(|e| e.quantity > 0)
            .map(|e| (e.name.clone(), e.quantity))
            .collect()
    }
}
