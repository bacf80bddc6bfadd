//! # Registry de Sessões — Sessões por Id e Timers de Lembrete
//!
//! O [`SessionRegistry`] é o dono de todas as sessões e de seus timers.
//! Toda mutação de uma sessão (mensagem do cliente ou disparo de timer)
//! acontece sob o mutex daquela sessão, então um lembrete nunca se
//! intercala com uma confirmação.
//!
//! ## Estrutura
//!
//! ```text
//! SessionRegistry (Clone, Arc interno)
//!   └── sessions: Mutex<HashMap<id, Arc<Mutex<SessionSlot>>>>   ← lookup-or-create
//!         └── SessionSlot
//!               ├── session: Session
//!               ├── timer: Option<ArmedTimer { epoch, JoinHandle }>
//!               └── epoch: u64
//! ```
//!
//! ## Ciclo de um Timer
//!
//! 1. A sessão pede `TimerCommand::Arm(d)`; o registry aborta o timer
//!    anterior, incrementa `epoch` e faz `tokio::spawn` de um sleep de `d`.
//! 2. No disparo, a task trava o slot e confere o `epoch`: se outro timer
//!    foi armado no meio-tempo, o disparo é descartado.
//! 3. [`Session::on_timer_fire`] roda e pode pedir um novo `Arm`.
//!
//! Nenhum caminho de requisição espera por um timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::{Reply, Session, SessionConfig, SessionState, TimerCommand};
use crate::core::Catalog;
use crate::nlu::OrderParser;
use crate::store::OrderStore;

/// Timer vivo de uma sessão.
struct ArmedTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

struct SessionSlot {
    session: Session,
    timer: Option<ArmedTimer>,
    /// Incrementado a cada timer armado.
    epoch: u64,
}

/// Fotografia de uma sessão para a camada de transporte.
#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub current_orders: Vec<(String, u32)>,
    pub reminders_sent: u32,
    pub timer_armed: bool,
    pub last_activity: DateTime<Utc>,
}

impl SessionView {
    fn of(slot: &SessionSlot) -> Self {
        Self {
            state: slot.session.state(),
            current_orders: slot.session.catalog().current_orders(),
            reminders_sent: slot.session.reminder_count(),
            timer_armed: slot.timer.is_some(),
            last_activity: slot.session.last_activity(),
        }
    }
}

struct Inner {
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionSlot>>>>,
    catalog: Catalog,
    parser: Arc<OrderParser>,
    store: Arc<dyn OrderStore>,
    config: SessionConfig,
    shutting_down: AtomicBool,
}

/// Serviço que possui as sessões e agenda seus timers.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    pub fn new(
        catalog: Catalog,
        parser: Arc<OrderParser>,
        store: Arc<dyn OrderStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: Mutex::new(HashMap::new()),
                catalog,
                parser,
                store,
                config,
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.inner.store
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Processa uma mensagem na sessão `session_id` (criada se necessário).
    ///
    /// Deve ser chamado dentro de um runtime tokio: pode armar timers.
    pub fn process_message(&self, session_id: &str, text: &str) -> (Reply, SessionView) {
        let slot = self.slot(session_id);
        let mut slot = slot.lock();
        let reply = slot
            .session
            .process_message(text, &self.inner.parser, self.inner.store.as_ref());
        self.apply_timer(session_id, &mut slot);
        (reply, SessionView::of(&slot))
    }

    /// Retira no máximo um aviso pendente do bot.
    pub fn next_pending_message(&self, session_id: &str) -> (Option<String>, SessionView) {
        let slot = self.slot(session_id);
        let mut slot = slot.lock();
        let message = slot.session.next_pending_message();
        (message, SessionView::of(&slot))
    }

    pub fn view(&self, session_id: &str) -> SessionView {
        let slot = self.slot(session_id);
        let slot = slot.lock();
        SessionView::of(&slot)
    }

    /// Reinício explícito da conversa.
    pub fn reset(&self, session_id: &str) {
        let slot = self.slot(session_id);
        let mut slot = slot.lock();
        slot.session.restart();
        self.apply_timer(session_id, &mut slot);
    }

    /// Cancela todos os timers. Chamado antes de encerrar o processo.
    pub fn shutdown(&self) {
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        let slots: Vec<Arc<Mutex<SessionSlot>>> =
            self.inner.sessions.lock().values().cloned().collect();

        let mut cancelled = 0;
        for slot in slots {
            let mut slot = slot.lock();
            if let Some(timer) = slot.timer.take() {
                timer.handle.abort();
                cancelled += 1;
            }
        }
        tracing::info!(cancelled, "Timers de sessão cancelados");
    }

    /// Busca ou cria o slot da sessão, sob o lock do registry.
    fn slot(&self, session_id: &str) -> Arc<Mutex<SessionSlot>> {
        let mut sessions = self.inner.sessions.lock();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session_id, "Nova sessão criada");
                Arc::new(Mutex::new(SessionSlot {
                    session: Session::new(session_id, &self.inner.catalog, self.inner.config.clone()),
                    timer: None,
                    epoch: 0,
                }))
            })
            .clone()
    }

    /// Aplica o pedido de timer deixado pela sessão.
    fn apply_timer(&self, session_id: &str, slot: &mut SessionSlot) {
        match slot.session.take_timer_command() {
            None => {}
            Some(TimerCommand::Cancel) => {
                if let Some(timer) = slot.timer.take() {
                    timer.handle.abort();
                }
            }
            Some(TimerCommand::Arm(delay)) => {
                if let Some(timer) = slot.timer.take() {
                    timer.handle.abort();
                }
                if self.inner.shutting_down.load(Ordering::SeqCst) {
                    return;
                }
                slot.epoch += 1;
                let epoch = slot.epoch;
                let handle = self.spawn_timer(session_id.to_string(), epoch, delay);
                slot.timer = Some(ArmedTimer { epoch, handle });
            }
        }
    }

    fn spawn_timer(&self, session_id: String, epoch: u64, delay: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.fire(&session_id, epoch);
        })
    }

    /// Disparo de um timer: descarta se obsoleto, senão entrega à sessão.
    fn fire(&self, session_id: &str, epoch: u64) {
        let Some(slot) = self.inner.sessions.lock().get(session_id).cloned() else {
            return;
        };
        let mut slot = slot.lock();
        match &slot.timer {
            Some(timer) if timer.epoch == epoch => {}
            _ => {
                tracing::debug!(session_id, epoch, "Disparo obsoleto descartado");
                return;
            }
        }
        // O handle desta própria task é só descartado, não abortado
        slot.timer = None;
        slot.session.on_timer_fire(self.inner.store.as_ref());
        self.apply_timer(session_id, &mut slot);
    }
}
