use ewe_synca::{Ledger, TransactionKind, TransactionOutcome};

use super::spawn_group;
use crate::config::DemoConfig;

pub fn run(config: &DemoConfig) -> anyhow::Result<()> {
    let ledger = Ledger::new(config.initial_balance);
    println!("Initial balance: ${}", ledger.balance());

    let transactions: Vec<(TransactionKind, u64)> = config
        .transactions
        .iter()
        .map(|tx| (tx.kind.into(), tx.amount))
        .collect();

    let handle = ledger.clone();
    spawn_group(transactions.len(), move |index| {
        let (kind, amount) = transactions[index];
        // rejections are already logged by the ledger
        let _ = handle.apply(kind, amount);
    })
    .wait();

    for tx in ledger.history() {
        let status = match tx.outcome {
            TransactionOutcome::Applied => "ok",
            TransactionOutcome::Rejected => "rejected",
        };
        println!(
            "  #{} {} ${}: ${} -> ${} ({status})",
            tx.sequence, tx.kind, tx.amount, tx.balance_before, tx.balance_after
        );
    }
    println!("Final balance: ${}", ledger.balance());

    anyhow::ensure!(
        ledger.transaction_count() == config.transactions.len(),
        "ledger recorded {} of {} transactions",
        ledger.transaction_count(),
        config.transactions.len()
    );
    Ok(())
}
