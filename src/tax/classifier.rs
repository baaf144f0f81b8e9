use crate::models::{Transaction, TransactionKind};

/// Disposals trigger revenue. Crypto-to-crypto swaps are exempt.
pub fn is_taxable_disposal(tx: &Transaction) -> bool {
    matches!(
        tx.kind,
        TransactionKind::Disposal | TransactionKind::PaymentDisposal
    )
}

/// Acquisitions, plus fees whose note ties them to a sale.
///
/// A fee without such a note (withdrawal, network fee) is not deductible.
pub fn is_deductible_cost(tx: &Transaction) -> bool {
    match tx.kind {
        TransactionKind::Acquisition => true,
        TransactionKind::Fee => tx
            .note
            .as_deref()
            .is_some_and(|note| note.to_lowercase().contains("sell")),
        _ => false,
    }
}
