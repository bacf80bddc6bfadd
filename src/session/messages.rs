//! Textos do bot, em PT-BR, prontos para exibição.

use crate::core::{Catalog, OrderItem};

pub const RESTARTED: &str = "🔄 **Conversa reiniciada!**";

pub const OPTION_PROMPT: &str =
    "Por favor, escolha uma opção: 1 para pedir ou 2 para falar com o gerente.";

pub const START_ORDERING: &str = "Ótimo! Digite seus pedidos. Ex: '2 mangas e 3 queijos'";

pub const TALK_TO_MANAGER: &str = "Ok então.";

pub const PREPARING_SUMMARY: &str = "📋 Preparando seu resumo...";

pub const EMPTY_LIST: &str = "❌ Lista vazia. Adicione itens primeiro.";

pub const NOTHING_RECOGNIZED: &str =
    "❌ Nenhum item reconhecido. Tente usar termos como '2 mangas', 'cinco queijos', etc.";

pub const CONFIRM_OR_CANCEL: &str =
    "❌ Item não reconhecido. Digite 'confirmar' para confirmar ou 'nao' para cancelar.";

pub const LIST_CLEARED: &str = "🔄 **Lista limpa!** Digite novos itens.";

pub const SAVE_FAILED: &str =
    "⚠️ Não foi possível salvar o pedido agora. Seus itens continuam na lista; tente novamente.";

pub const PENDING_CONFIRMED: &str =
    "✅ **PEDIDOS PENDENTES CONFIRMADOS!** Adicionados à lista pública.";

pub const PENDING_DISCARDED: &str = "🗑️ **Pedido pendente descartado.** Digite novos itens.";

pub const NO_PENDING: &str = "🔄 Nenhum pedido pendente. Continue adicionando itens.";

pub const ESCALATED_AWAITING: &str = "🟡 **PEDIDO MARCADO COMO PENDENTE** - Aguardando confirmação.\n\n\
     Digite 'confirmar' para confirmar este pedido.";

pub const ESCALATED_FOLDED: &str =
    "🟡 **PEDIDO MARCADO COMO PENDENTE** - Um atendente vai revisar seu pedido.";

/// Menu exibido ao retomar a conversa.
pub fn menu() -> String {
    format!("{RESTARTED}\n\nVocê quer pedir(1) ou falar com o gerente(2)?")
}

/// Resumo do pedido atual, pedindo confirmação.
pub fn summary(catalog: &Catalog) -> String {
    let mut text = String::from("📋 **RESUMO DO SEU PEDIDO:**\n");
    for (product, qty) in catalog.current_orders() {
        text.push_str(&format!("• {product}: {qty}\n"));
    }
    text.push_str("\n⚠️ **Confirma o pedido?** (responda com 'confirmar' ou 'nao')");
    text
}

/// Lembrete numerado (`count`/`max`) com o resumo.
pub fn reminder(count: u32, max: u32, catalog: &Catalog) -> String {
    format!("🔔 **LEMBRETE ({count}/{max}):**\n{}", summary(catalog))
}

/// Comprovante de um pedido confirmado.
pub fn receipt(items: &[OrderItem]) -> String {
    let mut text = String::from("✅ **PEDIDO CONFIRMADO COM SUCESSO!**\n\n**Itens confirmados:**\n");
    for item in items {
        text.push_str(&format!("• {}: {}\n", item.product, item.quantity));
    }
    text.push_str("\nObrigado pelo pedido! 🎉");
    text
}
