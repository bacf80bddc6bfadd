//! # Order Store — Livro de Pedidos Confirmados e Escalonados
//!
//! O [`OrderStore`] é o colaborador de persistência do núcleo: recebe lotes
//! nos pontos de commit (confirmação ou escalonamento) e responde totais
//! agregados por rótulo.
//!
//! ## Implementações
//!
//! | Tipo | Armazenamento | Uso |
//! |------|---------------|-----|
//! | [`MemoryOrderStore`] | `Vec` em memória | testes, execução sem disco |
//! | [`JournalOrderStore`] | JSON Lines em disco (`data/orders.jsonl`) | produção |
//!
//! ## Formato do Journal
//!
//! Cada operação é **uma linha JSON anexada** ao fim do arquivo, nunca
//! reescrita:
//!
//! ```json
//! {"op":"append","batch":{"id":"…","session_id":"abc","label":"pending","items":[…],"created_at":"…"}}
//! {"op":"relabel","id":"…","label":"confirmed"}
//! {"op":"delete","id":"…"}
//! ```
//!
//! Na abertura, o journal é reproduzido linha a linha. Uma linha corrompida
//! no meio do arquivo é ignorada com aviso. Um final sem `\n` (escrita
//! interrompida por crash) é cortado do arquivo, ou completado com `\n` se
//! ainda for uma entrada válida, para que o próximo append comece numa
//! linha nova.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{BatchId, BatchLabel, OrderBatch, OrderItem};

/// Erros do Order Store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("falha de E/S no journal de pedidos: {0}")]
    Io(#[from] std::io::Error),
    #[error("falha ao serializar entrada do journal: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("lote {0} não encontrado")]
    UnknownBatch(BatchId),
    #[error("lote sem itens não pode ser gravado")]
    EmptyBatch,
}

/// Persistência append-only de lotes de pedido.
///
/// Chamado apenas nos pontos de commit; nunca mantido aberto durante um
/// ciclo de lembretes.
pub trait OrderStore: Send + Sync {
    /// Grava um lote novo e retorna seu id.
    fn append_batch(
        &self,
        session_id: &str,
        items: &[OrderItem],
        label: BatchLabel,
    ) -> Result<BatchId, StoreError>;

    /// Soma das quantidades por produto entre os lotes com `label`.
    fn query_totals(&self, label: BatchLabel) -> Result<BTreeMap<String, u32>, StoreError>;

    /// Lotes com `label`, em ordem de gravação.
    fn list_batches(&self, label: BatchLabel) -> Result<Vec<OrderBatch>, StoreError>;

    /// Muda o rótulo de um lote (ex: pendente → confirmado).
    fn relabel_batch(&self, id: BatchId, label: BatchLabel) -> Result<(), StoreError>;

    /// Descarta um lote.
    fn delete_batch(&self, id: BatchId) -> Result<(), StoreError>;
}

/// Uma operação do journal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Append { batch: OrderBatch },
    Relabel { id: BatchId, label: BatchLabel },
    Delete { id: BatchId },
}

/// Estado materializado a partir das entradas do journal.
#[derive(Default)]
struct Ledger {
    batches: Vec<OrderBatch>,
}

impl Ledger {
    /// Valida uma entrada contra o estado atual, sem aplicá-la.
    fn check(&self, entry: &JournalEntry) -> Result<(), StoreError> {
        match entry {
            JournalEntry::Append { batch } if batch.items.is_empty() => Err(StoreError::EmptyBatch),
            JournalEntry::Append { .. } => Ok(()),
            JournalEntry::Relabel { id, .. } | JournalEntry::Delete { id } => {
                if self.batches.iter().any(|b| b.id == *id) {
                    Ok(())
                } else {
                    Err(StoreError::UnknownBatch(*id))
                }
            }
        }
    }

    fn apply(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Append { batch } => self.batches.push(batch),
            JournalEntry::Relabel { id, label } => {
                if let Some(batch) = self.batches.iter_mut().find(|b| b.id == id) {
                    batch.label = label;
                }
            }
            JournalEntry::Delete { id } => self.batches.retain(|b| b.id != id),
        }
    }

    fn totals(&self, label: BatchLabel) -> BTreeMap<String, u32> {
        let mut totals = BTreeMap::new();
        for batch in self.batches.iter().filter(|b| b.label == label) {
            for item in &batch.items {
                let total = totals.entry(item.product.clone()).or_insert(0u32);
                *total = total.saturating_add(item.quantity);
            }
        }
        totals.retain(|_, qty| *qty > 0);
        totals
    }

    fn list(&self, label: BatchLabel) -> Vec<OrderBatch> {
        self.batches.iter().filter(|b| b.label == label).cloned().collect()
    }
}

/// Lote novo apenas com os itens de quantidade > 0.
fn new_batch(session_id: &str, items: &[OrderItem], label: BatchLabel) -> OrderBatch {
    let items = items.iter().filter(|i| i.quantity > 0).cloned().collect();
    OrderBatch::new(session_id, items, label)
}

// ─── MemoryOrderStore ──────────────────────────────────────────

/// Order Store puramente em memória.
#[derive(Default)]
pub struct MemoryOrderStore {
    ledger: Mutex<Ledger>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn commit(&self, entry: JournalEntry) -> Result<(), StoreError> {
        let mut ledger = self.ledger.lock();
        ledger.check(&entry)?;
        ledger.apply(entry);
        Ok(())
    }
}

impl OrderStore for MemoryOrderStore {
    fn append_batch(
        &self,
        session_id: &str,
        items: &[OrderItem],
        label: BatchLabel,
    ) -> Result<BatchId, StoreError> {
        let batch = new_batch(session_id, items, label);
        let id = batch.id;
        self.commit(JournalEntry::Append { batch })?;
        Ok(id)
    }

    fn query_totals(&self, label: BatchLabel) -> Result<BTreeMap<String, u32>, StoreError> {
        Ok(self.ledger.lock().totals(label))
    }

    fn list_batches(&self, label: BatchLabel) -> Result<Vec<OrderBatch>, StoreError> {
        Ok(self.ledger.lock().list(label))
    }

    fn relabel_batch(&self, id: BatchId, label: BatchLabel) -> Result<(), StoreError> {
        self.commit(JournalEntry::Relabel { id, label })
    }

    fn delete_batch(&self, id: BatchId) -> Result<(), StoreError> {
        self.commit(JournalEntry::Delete { id })
    }
}

// ─── JournalOrderStore ─────────────────────────────────────────

/// Order Store com journal JSON Lines append-only em disco.
pub struct JournalOrderStore {
    path: PathBuf,
    ledger: Mutex<Ledger>,
}

impl JournalOrderStore {
    /// Abre (ou cria) o journal em `path` e reproduz as entradas existentes.
    ///
    /// # Erros
    ///
    /// Retorna erro se o diretório não puder ser criado ou o arquivo não
    /// puder ser lido. Linhas corrompidas não são erro.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut ledger = Ledger::default();
        if path.exists() {
            let contents = std::fs::read(&path)?;
            for (line_no, line) in contents.split(|b| *b == b'\n').enumerate() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<JournalEntry>(line) {
                    Ok(entry) => ledger.apply(entry),
                    Err(e) => tracing::warn!(
                        line = line_no + 1,
                        error = %e,
                        "Linha corrompida no journal de pedidos ignorada"
                    ),
                }
            }
            repair_tail(&path, &contents)?;
        }

        tracing::info!(
            path = %path.display(),
            batches = ledger.batches.len(),
            "Journal de pedidos carregado"
        );
        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
        })
    }

    /// Valida, anexa ao arquivo e só então aplica em memória.
    fn commit(&self, entry: JournalEntry) -> Result<(), StoreError> {
        let mut ledger = self.ledger.lock();
        ledger.check(&entry)?;

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        ledger.apply(entry);
        Ok(())
    }
}

/// Garante que o journal termine em `\n` antes do próximo append.
fn repair_tail(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    if contents.is_empty() || contents.ends_with(b"\n") {
        return Ok(());
    }
    let keep = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);
    let tail = &contents[keep..];

    if serde_json::from_slice::<JournalEntry>(tail).is_ok() {
        let mut file = OpenOptions::new().append(true).open(path)?;
        file.write_all(b"\n")?;
        file.flush()?;
    } else {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(keep as u64)?;
        tracing::warn!(
            path = %path.display(),
            bytes = tail.len(),
            "Escrita incompleta removida do fim do journal"
        );
    }
    Ok(())
}

impl OrderStore for JournalOrderStore {
    fn append_batch(
        &self,
        session_id: &str,
        items: &[OrderItem],
        label: BatchLabel,
    ) -> Result<BatchId, StoreError> {
        let batch = new_batch(session_id, items, label);
        let id = batch.id;
        self.commit(JournalEntry::Append { batch })?;
        Ok(id)
    }

    fn query_totals(&self, label: BatchLabel) -> Result<BTreeMap<String, u32>, StoreError> {
        Ok(self.ledger.lock().totals(label))
    }

    fn list_batches(&self, label: BatchLabel) -> Result<Vec<OrderBatch>, StoreError> {
        Ok(self.ledger.lock().list(label))
    }

    fn relabel_batch(&self, id: BatchId, label: BatchLabel) -> Result<(), StoreError> {
        self.commit(JournalEntry::Relabel { id, label })
    }

    fn delete_batch(&self, id: BatchId) -> Result<(), StoreError> {
        self.commit(JournalEntry::Delete { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, u32)]) -> Vec<OrderItem> {
        pairs
            .iter()
            .map(|(p, q)| OrderItem {
                product: p.to_string(),
                quantity: *q,
            })
            .collect()
    }

    fn temp_journal() -> PathBuf {
        std::env::temp_dir().join(format!("pedidos-{}.jsonl", uuid::Uuid::new_v4()))
    }

    #[test]
    fn totals_are_aggregated_per_label() {
        let store = MemoryOrderStore::new();
        store
            .append_batch("a", &items(&[("manga", 2), ("queijo", 1)]), BatchLabel::Confirmed)
            .unwrap();
        store
            .append_batch("b", &items(&[("manga", 3)]), BatchLabel::Confirmed)
            .unwrap();
        store
            .append_batch("c", &items(&[("ovo", 6)]), BatchLabel::Pending)
            .unwrap();

        let confirmed = store.query_totals(BatchLabel::Confirmed).unwrap();
        assert_eq!(confirmed.get("manga"), Some(&5));
        assert_eq!(confirmed.get("queijo"), Some(&1));
        assert_eq!(confirmed.get("ovo"), None);

        let pending = store.query_totals(BatchLabel::Pending).unwrap();
        assert_eq!(pending.get("ovo"), Some(&6));
    }

    #[test]
    fn relabel_moves_batch_between_totals() {
        let store = MemoryOrderStore::new();
        let id = store
            .append_batch("a", &items(&[("manga", 2)]), BatchLabel::Pending)
            .unwrap();
        store.relabel_batch(id, BatchLabel::Confirmed).unwrap();
        assert!(store.query_totals(BatchLabel::Pending).unwrap().is_empty());
        assert_eq!(
            store.query_totals(BatchLabel::Confirmed).unwrap().get("manga"),
            Some(&2)
        );
    }

    #[test]
    fn unknown_and_empty_batches_are_rejected() {
        let store = MemoryOrderStore::new();
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            store.delete_batch(missing),
            Err(StoreError::UnknownBatch(id)) if id == missing
        ));
        assert!(matches!(
            store.append_batch("a", &items(&[("manga", 0)]), BatchLabel::Confirmed),
            Err(StoreError::EmptyBatch)
        ));
    }

    #[test]
    fn journal_replays_after_reopen() {
        let path = temp_journal();
        {
            let store = JournalOrderStore::open(&path).unwrap();
            let pending = store
                .append_batch("a", &items(&[("queijo", 4)]), BatchLabel::Pending)
                .unwrap();
            let dropped = store
                .append_batch("a", &items(&[("ovo", 1)]), BatchLabel::Pending)
                .unwrap();
            store.relabel_batch(pending, BatchLabel::Confirmed).unwrap();
            store.delete_batch(dropped).unwrap();
        }

        let reopened = JournalOrderStore::open(&path).unwrap();
        assert_eq!(
            reopened.query_totals(BatchLabel::Confirmed).unwrap().get("queijo"),
            Some(&4)
        );
        assert!(reopened.list_batches(BatchLabel::Pending).unwrap().is_empty());

        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 4, "cada operação anexa exatamente uma linha");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn torn_final_line_does_not_swallow_the_next_append() {
        let path = temp_journal();
        {
            let store = JournalOrderStore::open(&path).unwrap();
            store
                .append_batch("a", &items(&[("manga", 1)]), BatchLabel::Confirmed)
                .unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"op\":\"append\",\"bat").unwrap();
        drop(file);

        {
            let reopened = JournalOrderStore::open(&path).unwrap();
            assert_eq!(reopened.list_batches(BatchLabel::Confirmed).unwrap().len(), 1);
            reopened
                .append_batch("b", &items(&[("queijo", 7)]), BatchLabel::Confirmed)
                .unwrap();
        }

        let again = JournalOrderStore::open(&path).unwrap();
        let totals = again.query_totals(BatchLabel::Confirmed).unwrap();
        assert_eq!(totals.get("manga"), Some(&1));
        assert_eq!(totals.get("queijo"), Some(&7));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents
            .lines()
            .all(|l| serde_json::from_str::<JournalEntry>(l).is_ok()));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn valid_final_line_without_newline_is_kept() {
        let path = temp_journal();
        let entry = JournalEntry::Append {
            batch: new_batch("a", &items(&[("ovo", 3)]), BatchLabel::Pending),
        };
        std::fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();

        {
            let store = JournalOrderStore::open(&path).unwrap();
            store
                .append_batch("b", &items(&[("ovo", 2)]), BatchLabel::Pending)
                .unwrap();
        }

        let reopened = JournalOrderStore::open(&path).unwrap();
        assert_eq!(
            reopened.query_totals(BatchLabel::Pending).unwrap().get("ovo"),
            Some(&5)
        );
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn corrupted_middle_line_is_skipped() {
        let path = temp_journal();
        let entry = JournalEntry::Append {
            batch: new_batch("a", &items(&[("manga", 2)]), BatchLabel::Confirmed),
        };
        let good = serde_json::to_string(&entry).unwrap();
        std::fs::write(&path, format!("{{\"op\":\"rel\n{good}\n")).unwrap();

        let store = JournalOrderStore::open(&path).unwrap();
        assert_eq!(
            store.query_totals(BatchLabel::Confirmed).unwrap().get("manga"),
            Some(&2)
        );
        let _ = std::fs::remove_file(&path);
    }
}
