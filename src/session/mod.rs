//! # Sessão — Máquina de Estados da Conversa de Pedido
//!
//! Cada cliente tem uma [`Session`] que acompanha a conversa do menu até a
//! confirmação do pedido, acumulando linhas reconhecidas em um catálogo de
//! trabalho próprio.
//!
//! ## Estados
//!
//! ```text
//! WaitingForNext ──qualquer msg──→ AwaitingOption ──"1"──→ Collecting
//!       ▲                               │                    │  ▲
//!       └────────────"2"────────────────┘   "pronto"/timer   │  │ "sim" / "nao" / novos itens
//!                                                            ▼  │
//!                                                         Confirming
//!                                                            │ 5 lembretes sem resposta
//!                                                            ▼
//!                                    escalonamento ──Retain──→ PendingConfirmation
//!                                                  ──Fold────→ WaitingForNext
//! ```
//!
//! Palavras de cancelamento ("cancelar", "hoje não") levam qualquer estado
//! de volta a `WaitingForNext` antes de qualquer outro tratamento.
//!
//! ## Timers
//!
//! A sessão não possui timers: ela **pede** ao [`SessionRegistry`] que arme
//! ou cancele o único timer da sessão via [`TimerCommand`], e o registry
//! chama [`Session::on_timer_fire`] quando o timer dispara.
//!
//! ## Sub-módulos
//!
//! | Módulo | Responsabilidade |
//! |--------|------------------|
//! | [`messages`] | Textos do bot |
//! | [`registry`] | Sessões por id + timers tokio |

pub mod messages;
pub mod registry;

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{BatchId, BatchLabel, Catalog, OrderItem};
use crate::nlu::{normalize, OrderParser};
use crate::store::{OrderStore, StoreError};

pub use registry::{SessionRegistry, SessionView};

/// Palavras que reiniciam a conversa em qualquer estado (já normalizadas).
const CANCEL_KEYWORDS: &[&str] = &["cancelar", "hoje nao"];

const AFFIRMATIVE: &[&str] = &["confirmar", "sim", "s"];

const NEGATIVE: &[&str] = &["nao", "n"];

/// Mensagens que pedem o resumo durante a coleta.
const READY_COMMANDS: &[&str] = &["pronto", "confirmar"];

/// Estado da conversa.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Ociosa; a próxima mensagem mostra o menu.
    WaitingForNext,
    /// Menu: pedir (1) ou falar com o gerente (2).
    #[serde(rename = "option")]
    AwaitingOption,
    /// Acumulando linhas de pedido.
    Collecting,
    /// Resumo enviado, aguardando sim/não.
    Confirming,
    /// Um lote escalonado aguarda confirmação ou descarte.
    PendingConfirmation,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::WaitingForNext => "waiting_for_next",
            SessionState::AwaitingOption => "option",
            SessionState::Collecting => "collecting",
            SessionState::Confirming => "confirming",
            SessionState::PendingConfirmation => "pending_confirmation",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// O que fazer com um pedido escalonado depois de gravado.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscalationPolicy {
    /// O lote continua endereçável; a sessão pergunta se o cliente confirma.
    Retain,
    /// O lote entra nos totais pendentes e a sessão volta a ficar ociosa.
    Fold,
}

impl FromStr for EscalationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retain" => Ok(EscalationPolicy::Retain),
            "fold" => Ok(EscalationPolicy::Fold),
            other => Err(format!("política de escalonamento desconhecida: {other}")),
        }
    }
}

/// Parâmetros do ciclo de lembretes.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Silêncio após a última mensagem antes do resumo automático.
    pub inactivity_timeout: Duration,
    /// Intervalo entre lembretes.
    pub reminder_interval: Duration,
    /// Lembretes antes do escalonamento.
    pub max_reminders: u32,
    pub escalation_policy: EscalationPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(30),
            reminder_interval: Duration::from_secs(30),
            max_reminders: 5,
            escalation_policy: EscalationPolicy::Retain,
        }
    }
}

/// Destino dos lotes escalonados quando o cliente responde.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Confirm,
    Discard,
}

/// Pedido da sessão ao agendador.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    /// Arma um timer novo, substituindo o anterior.
    Arm(Duration),
    /// Cancela o timer armado, se houver.
    Cancel,
}

/// Resposta síncrona a uma mensagem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Reply {
    /// `false` para falhas leves (entrada não entendida); o estado não muda.
    pub success: bool,
    pub message: Option<String>,
}

impl Reply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    fn silent() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Conversa de um cliente.
pub struct Session {
    id: String,
    state: SessionState,
    /// Catálogo de trabalho, independente do catálogo compartilhado.
    catalog: Catalog,
    reminder_count: u32,
    /// Avisos do bot produzidos fora do ciclo requisição/resposta.
    outbox: VecDeque<String>,
    /// Último pedido de timer ainda não aplicado pelo agendador.
    timer_command: Option<TimerCommand>,
    /// Lotes escalonados aguardando confirmação (política Retain).
    escalated: Vec<BatchId>,
    last_activity: DateTime<Utc>,
    config: SessionConfig,
}

impl Session {
    /// Cria uma sessão ociosa com uma cópia zerada de `catalog`.
    pub fn new(id: impl Into<String>, catalog: &Catalog, config: SessionConfig) -> Self {
        let mut catalog = catalog.clone();
        catalog.zero();
        Self {
            id: id.into(),
            state: SessionState::WaitingForNext,
            catalog,
            reminder_count: 0,
            outbox: VecDeque::new(),
            timer_command: None,
            escalated: Vec::new(),
            last_activity: Utc::now(),
            config,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn reminder_count(&self) -> u32 {
        self.reminder_count
    }

    #[cfg(test)]
    pub fn escalated_batches(&self) -> &[BatchId] {
        &self.escalated
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Próximo aviso do bot, se houver. Fila vazia não é erro.
    pub fn next_pending_message(&mut self) -> Option<String> {
        self.outbox.pop_front()
    }

    /// Retira o pedido de timer pendente para o agendador aplicar.
    pub fn take_timer_command(&mut self) -> Option<TimerCommand> {
        self.timer_command.take()
    }

    /// Reinício explícito: zera o pedido, cancela o timer e volta a ficar ociosa.
    pub fn restart(&mut self) {
        self.catalog.zero();
        self.state = SessionState::WaitingForNext;
        self.reminder_count = 0;
        self.escalated.clear();
        self.cancel_timer();
        self.outbox.push_back(messages::RESTARTED.to_string());
        tracing::info!(session_id = %self.id, "Conversa reiniciada");
    }

    /// Processa uma mensagem do cliente e devolve a resposta imediata.
    ///
    /// Nunca falha: texto irreconhecível vira uma resposta com `success: false`.
    pub fn process_message(
        &mut self,
        text: &str,
        parser: &OrderParser,
        store: &dyn OrderStore,
    ) -> Reply {
        self.last_activity = Utc::now();
        let normalized = normalize(text);

        if CANCEL_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            self.restart();
            return Reply::silent();
        }

        tracing::debug!(session_id = %self.id, state = %self.state, "Mensagem recebida");
        match self.state {
            SessionState::WaitingForNext => {
                self.state = SessionState::AwaitingOption;
                Reply::ok(messages::menu())
            }
            SessionState::AwaitingOption => match normalized.as_str() {
                "1" => {
                    self.enter_collecting();
                    self.arm_timer(self.config.inactivity_timeout);
                    Reply::ok(messages::START_ORDERING)
                }
                "2" => {
                    self.state = SessionState::WaitingForNext;
                    Reply::ok(messages::TALK_TO_MANAGER)
                }
                _ => Reply::fail(messages::OPTION_PROMPT),
            },
            SessionState::Collecting => self.handle_collecting(text, &normalized, parser),
            SessionState::Confirming => self.handle_confirming(text, &normalized, parser, store),
            SessionState::PendingConfirmation => {
                self.handle_pending(text, &normalized, parser, store)
            }
        }
    }

    /// Disparo do timer da sessão. Erros de persistência são registrados,
    /// nunca propagados; o timer é rearmado para tentar de novo.
    pub fn on_timer_fire(&mut self, store: &dyn OrderStore) {
        match self.state {
            SessionState::Collecting => {
                if self.catalog.has_items() {
                    tracing::info!(session_id = %self.id, "Inatividade: enviando resumo");
                    self.start_confirmation();
                } else {
                    self.arm_timer(self.config.inactivity_timeout);
                }
            }
            SessionState::Confirming => {
                let max = self.config.max_reminders;
                self.outbox
                    .push_back(messages::reminder(self.reminder_count, max, &self.catalog));
                tracing::info!(session_id = %self.id, count = self.reminder_count, max, "Lembrete enviado");
                if self.reminder_count < max {
                    self.reminder_count += 1;
                    self.arm_timer(self.config.reminder_interval);
                } else {
                    self.escalate(store);
                }
            }
            state => {
                tracing::debug!(session_id = %self.id, %state, "Timer disparado fora do ciclo; descartado");
            }
        }
    }

    // ─── handlers por estado ───────────────────────────────────

    fn handle_collecting(&mut self, text: &str, normalized: &str, parser: &OrderParser) -> Reply {
        if READY_COMMANDS.contains(&normalized) {
            if self.catalog.has_items() {
                self.start_confirmation();
                return Reply::ok(messages::PREPARING_SUMMARY);
            }
            return Reply::fail(messages::EMPTY_LIST);
        }

        let parsed = self.merge_order(text, parser);
        self.arm_timer(self.config.inactivity_timeout);
        if parsed {
            Reply::silent()
        } else {
            Reply::fail(messages::NOTHING_RECOGNIZED)
        }
    }

    fn handle_confirming(
        &mut self,
        text: &str,
        normalized: &str,
        parser: &OrderParser,
        store: &dyn OrderStore,
    ) -> Reply {
        if has_any_word(normalized, AFFIRMATIVE) {
            return self.confirm_order(store);
        }
        if has_any_word(normalized, NEGATIVE) {
            self.catalog.zero();
            self.enter_collecting();
            self.arm_timer(self.config.inactivity_timeout);
            return Reply::ok(messages::LIST_CLEARED);
        }

        if self.merge_order(text, parser) {
            self.enter_collecting();
            self.arm_timer(self.config.inactivity_timeout);
            Reply::silent()
        } else {
            Reply::fail(messages::CONFIRM_OR_CANCEL)
        }
    }

    fn handle_pending(
        &mut self,
        text: &str,
        normalized: &str,
        parser: &OrderParser,
        store: &dyn OrderStore,
    ) -> Reply {
        if has_any_word(normalized, AFFIRMATIVE) {
            return self.settle_escalated(store, Resolution::Confirm);
        }
        if has_any_word(normalized, NEGATIVE) {
            return self.settle_escalated(store, Resolution::Discard);
        }

        // Qualquer outra coisa retoma a coleta; os lotes continuam pendentes
        self.enter_collecting();
        self.arm_timer(self.config.inactivity_timeout);
        if self.merge_order(text, parser) {
            Reply::silent()
        } else {
            Reply::fail(messages::NOTHING_RECOGNIZED)
        }
    }

    // ─── commits ───────────────────────────────────────────────

    /// Grava o catálogo como lote confirmado. Em falha, nada muda.
    fn confirm_order(&mut self, store: &dyn OrderStore) -> Reply {
        let items = self.current_items();
        if items.is_empty() {
            self.enter_collecting();
            self.arm_timer(self.config.inactivity_timeout);
            return Reply::fail(messages::EMPTY_LIST);
        }

        match store.append_batch(&self.id, &items, BatchLabel::Confirmed) {
            Ok(batch_id) => {
                tracing::info!(session_id = %self.id, %batch_id, items = items.len(), "Pedido confirmado");
                self.catalog.zero();
                self.enter_collecting();
                self.arm_timer(self.config.inactivity_timeout);
                Reply::ok(messages::receipt(&items))
            }
            Err(e) => {
                tracing::error!(session_id = %self.id, error = %e, "Falha ao gravar pedido confirmado");
                Reply::fail(messages::SAVE_FAILED)
            }
        }
    }

    /// Confirma ou descarta os lotes escalonados da sessão.
    fn settle_escalated(&mut self, store: &dyn OrderStore, resolution: Resolution) -> Reply {
        if self.escalated.is_empty() {
            self.enter_collecting();
            self.arm_timer(self.config.inactivity_timeout);
            return Reply::ok(messages::NO_PENDING);
        }

        let mut failed = Vec::new();
        for batch_id in self.escalated.drain(..) {
            let result = match resolution {
                Resolution::Confirm => store.relabel_batch(batch_id, BatchLabel::Confirmed),
                Resolution::Discard => store.delete_batch(batch_id),
            };
            match result {
                Ok(()) => {}
                // Já resolvido por fora (ex: pelo gerente via HTTP).
                Err(StoreError::UnknownBatch(_)) => {
                    tracing::debug!(session_id = %self.id, %batch_id, "Lote pendente já resolvido");
                }
                Err(e) => {
                    tracing::error!(session_id = %self.id, %batch_id, error = %e, "Falha ao resolver lote pendente");
                    failed.push(batch_id);
                }
            }
        }
        if !failed.is_empty() {
            self.escalated = failed;
            return Reply::fail(messages::SAVE_FAILED);
        }

        self.enter_collecting();
        self.arm_timer(self.config.inactivity_timeout);
        match resolution {
            Resolution::Confirm => Reply::ok(messages::PENDING_CONFIRMED),
            Resolution::Discard => Reply::ok(messages::PENDING_DISCARDED),
        }
    }

    /// Fim do ciclo de lembretes: grava o pedido como lote pendente.
    fn escalate(&mut self, store: &dyn OrderStore) {
        let items = self.current_items();
        if items.is_empty() {
            self.finish_escalation(None);
            return;
        }

        match store.append_batch(&self.id, &items, BatchLabel::Pending) {
            Ok(batch_id) => {
                tracing::warn!(session_id = %self.id, %batch_id, "Pedido sem resposta escalonado como pendente");
                self.catalog.zero();
                self.finish_escalation(Some(batch_id));
            }
            Err(e) => {
                tracing::error!(session_id = %self.id, error = %e, "Falha ao escalonar pedido; nova tentativa no próximo disparo");
                self.arm_timer(self.config.reminder_interval);
            }
        }
    }

    fn finish_escalation(&mut self, batch_id: Option<BatchId>) {
        self.reminder_count = 0;
        match self.config.escalation_policy {
            EscalationPolicy::Retain => {
                self.escalated.extend(batch_id);
                self.state = SessionState::PendingConfirmation;
                self.outbox.push_back(messages::ESCALATED_AWAITING.to_string());
            }
            EscalationPolicy::Fold => {
                self.state = SessionState::WaitingForNext;
                self.outbox.push_back(messages::ESCALATED_FOLDED.to_string());
            }
        }
    }

    // ─── auxiliares ────────────────────────────────────────────

    /// Soma as linhas reconhecidas ao catálogo. Retorna `true` se houve alguma.
    fn merge_order(&mut self, text: &str, parser: &OrderParser) -> bool {
        let outcome = parser.parse(text, &self.catalog);
        if outcome.lines.is_empty() {
            return false;
        }
        tracing::info!(session_id = %self.id, lines = outcome.lines.len(), "Itens adicionados");
        self.catalog = outcome.catalog;
        true
    }

    fn current_items(&self) -> Vec<OrderItem> {
        self.catalog
            .current_orders()
            .into_iter()
            .map(OrderItem::from)
            .collect()
    }

    fn enter_collecting(&mut self) {
        self.state = SessionState::Collecting;
        self.reminder_count = 0;
    }

    fn start_confirmation(&mut self) {
        self.state = SessionState::Confirming;
        self.reminder_count = 1;
        self.outbox.push_back(messages::summary(&self.catalog));
        self.arm_timer(self.config.reminder_interval);
    }

    fn arm_timer(&mut self, delay: Duration) {
        self.timer_command = Some(TimerCommand::Arm(delay));
    }

    fn cancel_timer(&mut self) {
        self.timer_command = Some(TimerCommand::Cancel);
    }
}

fn has_any_word(normalized: &str, words: &[&str]) -> bool {
    normalized.split_whitespace().any(|w| words.contains(&w))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::nlu::ParserConfig;
    use crate::store::{MemoryOrderStore, StoreError};

    struct FailingStore;

    impl OrderStore for FailingStore {
        fn append_batch(&self, _: &str, _: &[OrderItem], _: BatchLabel) -> Result<BatchId, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disco cheio")))
        }
        fn query_totals(&self, _: BatchLabel) -> Result<BTreeMap<String, u32>, StoreError> {
            Ok(BTreeMap::new())
        }
        fn list_batches(&self, _: BatchLabel) -> Result<Vec<crate::core::OrderBatch>, StoreError> {
            Ok(Vec::new())
        }
        fn relabel_batch(&self, _: BatchId, _: BatchLabel) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disco cheio")))
        }
        fn delete_batch(&self, _: BatchId) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disco cheio")))
        }
    }

    struct Fixture {
        session: Session,
        parser: OrderParser,
        store: MemoryOrderStore,
        armed: bool,
    }

    impl Fixture {
        fn new(policy: EscalationPolicy) -> Self {
            let catalog = Catalog::from_names(["manga", "queijo", "ovo"]);
            let parser = OrderParser::new(&catalog, ParserConfig::default());
            let config = SessionConfig {
                escalation_policy: policy,
                ..SessionConfig::default()
            };
            Self {
                session: Session::new("cliente", &catalog, config),
                parser,
                store: MemoryOrderStore::new(),
                armed: false,
            }
        }

        fn send(&mut self, text: &str) -> Reply {
            self.session.process_message(text, &self.parser, &self.store)
        }

        /// Aplica o último pedido de timer, como o registry faria.
        fn timer_armed(&mut self) -> bool {
            match self.session.take_timer_command() {
                Some(TimerCommand::Arm(_)) => self.armed = true,
                Some(TimerCommand::Cancel) => self.armed = false,
                None => {}
            }
            self.armed
        }

        fn fire(&mut self) {
            self.timer_armed();
            self.armed = false;
            self.session.on_timer_fire(&self.store);
        }

        /// Menu → opção 1 → coleta.
        fn collecting(policy: EscalationPolicy) -> Self {
            let mut fx = Self::new(policy);
            fx.send("oi");
            fx.send("1");
            fx
        }

        fn drain(&mut self) -> Vec<String> {
            std::iter::from_fn(|| self.session.next_pending_message()).collect()
        }
    }

    // ─── menu ──────────────────────────────────────────────────

    #[test]
    fn first_contact_shows_menu() {
        let mut fx = Fixture::new(EscalationPolicy::Retain);
        let reply = fx.send("olá");
        assert!(reply.success);
        assert!(reply.message.unwrap().contains("pedir(1)"));
        assert_eq!(fx.session.state(), SessionState::AwaitingOption);
    }

    #[test]
    fn option_one_starts_collecting_with_timer() {
        let mut fx = Fixture::new(EscalationPolicy::Retain);
        fx.send("oi");
        let reply = fx.send("1");
        assert!(reply.success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert_eq!(
            fx.session.take_timer_command(),
            Some(TimerCommand::Arm(Duration::from_secs(30)))
        );
    }

    #[test]
    fn option_two_goes_idle_and_garbage_reprompts() {
        let mut fx = Fixture::new(EscalationPolicy::Retain);
        fx.send("oi");
        let reply = fx.send("talvez");
        assert!(!reply.success);
        assert_eq!(fx.session.state(), SessionState::AwaitingOption);

        let reply = fx.send("2");
        assert_eq!(reply.message.as_deref(), Some(messages::TALK_TO_MANAGER));
        assert_eq!(fx.session.state(), SessionState::WaitingForNext);
    }

    // ─── coleta ────────────────────────────────────────────────

    #[test]
    fn collecting_merges_parsed_lines() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        assert!(fx.send("2 mangas e 3 queijos").success);
        assert!(fx.send("1 manga").success);
        assert_eq!(fx.session.catalog().quantity("manga"), 3);
        assert_eq!(fx.session.catalog().quantity("queijo"), 3);
    }

    #[test]
    fn unrecognized_text_is_a_soft_failure_that_rearms() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.session.take_timer_command();
        let reply = fx.send("xpto qwerty");
        assert!(!reply.success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert!(matches!(fx.session.take_timer_command(), Some(TimerCommand::Arm(_))));
    }

    #[test]
    fn ready_with_empty_list_fails() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        let reply = fx.send("pronto");
        assert!(!reply.success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
    }

    #[test]
    fn ready_sends_summary_and_starts_reminders() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.drain();
        let reply = fx.send("Pronto");
        assert_eq!(reply.message.as_deref(), Some(messages::PREPARING_SUMMARY));
        assert_eq!(fx.session.state(), SessionState::Confirming);
        assert_eq!(fx.session.reminder_count(), 1);
        let queued = fx.drain();
        assert_eq!(queued.len(), 1);
        assert!(queued[0].contains("• manga: 2"));
    }

    // ─── confirmação ───────────────────────────────────────────

    #[test]
    fn confirming_persists_exact_catalog_then_zeroes() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas e 3 queijos");
        fx.send("pronto");
        let reply = fx.send("sim");
        assert!(reply.success);
        assert!(reply.message.unwrap().contains("PEDIDO CONFIRMADO"));

        let confirmed = fx.store.list_batches(BatchLabel::Confirmed).unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(
            confirmed[0].items,
            vec![
                OrderItem::from(("manga".to_string(), 2)),
                OrderItem::from(("queijo".to_string(), 3)),
            ]
        );
        assert!(!fx.session.catalog().has_items());
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert_eq!(fx.session.reminder_count(), 0);
    }

    #[test]
    fn negative_clears_the_list() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        let reply = fx.send("Não");
        assert_eq!(reply.message.as_deref(), Some(messages::LIST_CLEARED));
        assert!(!fx.session.catalog().has_items());
        assert!(fx.store.list_batches(BatchLabel::Confirmed).unwrap().is_empty());
    }

    #[test]
    fn new_items_while_confirming_return_to_collecting() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        assert!(fx.send("mais 1 queijo").success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert_eq!(fx.session.reminder_count(), 0);
        assert_eq!(fx.session.catalog().quantity("queijo"), 1);
    }

    #[test]
    fn gibberish_while_confirming_keeps_state() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        let reply = fx.send("xpto qwerty");
        assert!(!reply.success);
        assert_eq!(fx.session.state(), SessionState::Confirming);
    }

    #[test]
    fn store_failure_on_confirm_keeps_the_order() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        let reply = fx.session.process_message("sim", &fx.parser, &FailingStore);
        assert!(!reply.success);
        assert_eq!(fx.session.state(), SessionState::Confirming);
        assert_eq!(fx.session.catalog().quantity("manga"), 2);
    }

    // ─── cancelamento ──────────────────────────────────────────

    #[test]
    fn cancel_keyword_resets_from_any_state() {
        for setup in ["oi", "1", "2 mangas", "pronto"] {
            let mut fx = Fixture::new(EscalationPolicy::Retain);
            for step in ["oi", "1", "2 mangas", "pronto"] {
                fx.send(step);
                if step == setup {
                    break;
                }
            }
            fx.drain();
            let reply = fx.send("quero CANCELAR tudo");
            assert!(reply.success);
            assert_eq!(fx.session.state(), SessionState::WaitingForNext);
            assert!(!fx.session.catalog().has_items());
            assert_eq!(fx.session.take_timer_command(), Some(TimerCommand::Cancel));
            assert_eq!(fx.drain(), vec![messages::RESTARTED.to_string()]);
        }
    }

    #[test]
    fn cancel_while_pending_confirmation_keeps_the_stored_batch() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        (0..5).for_each(|_| fx.fire());
        assert_eq!(fx.session.state(), SessionState::PendingConfirmation);
        fx.drain();

        let reply = fx.send("cancelar");
        assert!(reply.success);
        assert_eq!(fx.session.state(), SessionState::WaitingForNext);
        assert!(fx.session.escalated_batches().is_empty());
        assert!(!fx.timer_armed());
        assert_eq!(fx.drain(), vec![messages::RESTARTED.to_string()]);
        assert_eq!(fx.store.list_batches(BatchLabel::Pending).unwrap().len(), 1);

        // A conversa recomeça pelo menu
        fx.send("oi");
        assert_eq!(fx.session.state(), SessionState::AwaitingOption);
    }

    #[test]
    fn hoje_nao_with_or_without_accent_cancels() {
        for text in ["hoje não", "Hoje nao, obrigado"] {
            let mut fx = Fixture::collecting(EscalationPolicy::Retain);
            fx.send(text);
            assert_eq!(fx.session.state(), SessionState::WaitingForNext);
        }
    }

    // ─── timers e escalonamento ────────────────────────────────

    #[test]
    fn inactivity_with_empty_catalog_only_rearms() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.session.take_timer_command();
        fx.fire();
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert!(fx.timer_armed());
        assert!(fx.drain().is_empty());
    }

    #[test]
    fn five_unanswered_reminders_escalate_once() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        fx.drain();

        for n in 1..=5 {
            assert_eq!(fx.session.state(), SessionState::Confirming, "disparo {n}");
            fx.fire();
        }

        assert_eq!(fx.session.state(), SessionState::PendingConfirmation);
        assert!(!fx.session.catalog().has_items());
        assert!(!fx.timer_armed());
        let pending = fx.store.list_batches(BatchLabel::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(fx.session.escalated_batches(), &[pending[0].id]);

        let queued = fx.drain();
        assert_eq!(queued.len(), 6);
        assert!(queued[4].starts_with("🔔 **LEMBRETE (5/5):**"));
        assert_eq!(queued[5], messages::ESCALATED_AWAITING);
    }

    #[test]
    fn inactivity_summary_then_reminders_then_escalation() {
        let mut fx = Fixture::collecting(EscalationPolicy::Fold);
        fx.send("3 queijos");
        fx.fire();
        assert_eq!(fx.session.state(), SessionState::Confirming);
        assert_eq!(fx.session.reminder_count(), 1);
        for _ in 0..5 {
            fx.fire();
        }
        assert_eq!(fx.session.state(), SessionState::WaitingForNext);
        assert_eq!(
            fx.store.query_totals(BatchLabel::Pending).unwrap().get("queijo"),
            Some(&3)
        );
        assert!(fx.session.escalated_batches().is_empty());
    }

    #[test]
    fn failed_escalation_keeps_order_and_rearms() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        for _ in 0..5 {
            fx.session.on_timer_fire(&FailingStore);
        }
        assert_eq!(fx.session.state(), SessionState::Confirming);
        assert_eq!(fx.session.catalog().quantity("manga"), 2);
        assert!(fx.timer_armed());

        // Próximo disparo com o store de volta grava o pedido
        fx.fire();
        assert_eq!(fx.session.state(), SessionState::PendingConfirmation);
        assert_eq!(fx.store.list_batches(BatchLabel::Pending).unwrap().len(), 1);
    }

    #[test]
    fn pending_batch_can_be_confirmed() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        (0..5).for_each(|_| fx.fire());

        let reply = fx.send("confirmar");
        assert_eq!(reply.message.as_deref(), Some(messages::PENDING_CONFIRMED));
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert!(fx.store.list_batches(BatchLabel::Pending).unwrap().is_empty());
        assert_eq!(
            fx.store.query_totals(BatchLabel::Confirmed).unwrap().get("manga"),
            Some(&2)
        );
    }

    #[test]
    fn pending_batch_can_be_discarded() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        (0..5).for_each(|_| fx.fire());

        let reply = fx.send("n");
        assert_eq!(reply.message.as_deref(), Some(messages::PENDING_DISCARDED));
        assert!(fx.store.list_batches(BatchLabel::Pending).unwrap().is_empty());
        assert!(fx.store.list_batches(BatchLabel::Confirmed).unwrap().is_empty());
    }

    #[test]
    fn batch_resolved_elsewhere_does_not_block_the_session() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        (0..5).for_each(|_| fx.fire());

        let batch_id = fx.session.escalated_batches()[0];
        fx.store.delete_batch(batch_id).unwrap();

        let reply = fx.send("sim");
        assert!(reply.success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert!(fx.session.escalated_batches().is_empty());
    }

    #[test]
    fn new_order_while_pending_resumes_collecting() {
        let mut fx = Fixture::collecting(EscalationPolicy::Retain);
        fx.send("2 mangas");
        fx.send("pronto");
        (0..5).for_each(|_| fx.fire());

        assert!(fx.send("1 ovo").success);
        assert_eq!(fx.session.state(), SessionState::Collecting);
        assert_eq!(fx.session.catalog().quantity("ovo"), 1);
        assert_eq!(fx.store.list_batches(BatchLabel::Pending).unwrap().len(), 1);
    }

    #[test]
    fn stray_fire_outside_cycle_is_dropped() {
        let mut fx = Fixture::new(EscalationPolicy::Retain);
        fx.fire();
        assert_eq!(fx.session.state(), SessionState::WaitingForNext);
        assert!(fx.session.take_timer_command().is_none());
    }

    #[test]
    fn policy_parses_from_text() {
        assert_eq!("Retain".parse::<EscalationPolicy>(), Ok(EscalationPolicy::Retain));
        assert_eq!("fold".parse::<EscalationPolicy>(), Ok(EscalationPolicy::Fold));
        assert!("keep".parse::<EscalationPolicy>().is_err());
    }
}
