//! # Configuração — Padrões + Variáveis de Ambiente
//!
//! Todos os parâmetros têm um padrão sensato; cada um pode ser sobrescrito
//! por uma variável de ambiente, no mesmo espírito do `RUST_LOG` usado
//! pelo tracing.
//!
//! | Variável | Padrão | Efeito |
//! |----------|--------|--------|
//! | `PEDIDOS_ADDR` | `0.0.0.0:5000` | Endereço do servidor HTTP |
//! | `PEDIDOS_INACTIVITY_SECS` | `30` | Silêncio antes do resumo automático |
//! | `PEDIDOS_REMINDER_SECS` | `30` | Intervalo entre lembretes |
//! | `PEDIDOS_MAX_REMINDERS` | `5` | Lembretes antes do escalonamento |
//! | `PEDIDOS_SIMILARITY_THRESHOLD` | `80` | Score mínimo de produto |
//! | `PEDIDOS_WEAK_MATCH_FLOOR` | `50` | Piso do palpite fraco |
//! | `PEDIDOS_ACCEPT_WEAK_MATCHES` | `true` | Aceita palpites fracos |
//! | `PEDIDOS_ESCALATION_POLICY` | `retain` | `retain` ou `fold` |
//! | `PEDIDOS_STORE_PATH` | `data/orders.jsonl` | Journal; vazio = só memória |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::nlu::ParserConfig;
use crate::session::{EscalationPolicy, SessionConfig};

const DEFAULT_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_STORE_PATH: &str = "data/orders.jsonl";

/// Configuração completa do processo.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub addr: String,
    pub parser: ParserConfig,
    pub session: SessionConfig,
    /// `None` mantém os pedidos apenas em memória.
    pub store_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            parser: ParserConfig::default(),
            session: SessionConfig::default(),
            store_path: Some(PathBuf::from(DEFAULT_STORE_PATH)),
        }
    }
}

impl AppConfig {
    /// Lê a configuração do ambiente do processo.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de consulta de chaves.
    ///
    /// # Erros
    ///
    /// Retorna erro se algum valor presente não puder ser interpretado.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("PEDIDOS_ADDR") {
            config.addr = addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PEDIDOS_INACTIVITY_SECS")? {
            config.session.inactivity_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PEDIDOS_REMINDER_SECS")? {
            config.session.reminder_interval = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<u32, _>(&lookup, "PEDIDOS_MAX_REMINDERS")? {
            anyhow::ensure!(max >= 1, "PEDIDOS_MAX_REMINDERS deve ser ≥ 1");
            config.session.max_reminders = max;
        }
        if let Some(threshold) = parse_var::<f64, _>(&lookup, "PEDIDOS_SIMILARITY_THRESHOLD")? {
            config.parser.similarity_threshold = threshold;
        }
        if let Some(floor) = parse_var::<f64, _>(&lookup, "PEDIDOS_WEAK_MATCH_FLOOR")? {
            config.parser.weak_match_floor = floor;
        }
        if let Some(accept) = parse_var::<bool, _>(&lookup, "PEDIDOS_ACCEPT_WEAK_MATCHES")? {
            config.parser.accept_weak_matches = accept;
        }
        if let Some(policy) = lookup("PEDIDOS_ESCALATION_POLICY") {
            config.session.escalation_policy = policy
                .parse::<EscalationPolicy>()
                .map_err(anyhow::Error::msg)
                .context("PEDIDOS_ESCALATION_POLICY inválida")?;
        }
        if let Some(path) = lookup("PEDIDOS_STORE_PATH") {
            config.store_path = (!path.trim().is_empty()).then(|| PathBuf::from(path));
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("valor inválido para {key}: {raw:?}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.session.inactivity_timeout, Duration::from_secs(30));
        assert_eq!(config.session.max_reminders, 5);
        assert_eq!(config.parser.similarity_threshold, 80.0);
        assert_eq!(config.session.escalation_policy, EscalationPolicy::Retain);
        assert_eq!(config.store_path, Some(PathBuf::from(DEFAULT_STORE_PATH)));
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_pairs(&[
            ("PEDIDOS_REMINDER_SECS", "5"),
            ("PEDIDOS_ACCEPT_WEAK_MATCHES", "false"),
            ("PEDIDOS_ESCALATION_POLICY", "fold"),
            ("PEDIDOS_STORE_PATH", ""),
        ])
        .unwrap();
        assert_eq!(config.session.reminder_interval, Duration::from_secs(5));
        assert!(!config.parser.accept_weak_matches);
        assert_eq!(config.session.escalation_policy, EscalationPolicy::Fold);
        assert_eq!(config.store_path, None);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(from_pairs(&[("PEDIDOS_MAX_REMINDERS", "muitos")]).is_err());
        assert!(from_pairs(&[("PEDIDOS_MAX_REMINDERS", "0")]).is_err());
        assert!(from_pairs(&[("PEDIDOS_ESCALATION_POLICY", "keep")]).is_err());
    }
}
