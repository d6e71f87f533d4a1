//! A balance and its transaction log behind one lock.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => write!(f, "Deposit"),
            TransactionKind::Withdrawal => write!(f, "Withdrawal"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    Applied,
    Rejected,
}

/// One entry of the ledger's append-only log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// 1-based position in lock-acquisition order.
    pub sequence: usize,
    pub kind: TransactionKind,
    pub amount: u64,
    pub balance_before: u64,
    /// Equal to `balance_before` when the transaction was rejected.
    pub balance_after: u64,
    pub outcome: TransactionOutcome,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("deposit of {amount} would overflow balance {balance}")]
    Overflow { amount: u64, balance: u64 },
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

struct LedgerState {
    balance: u64,
    log: Vec<Transaction>,
}

/// `Ledger` is a balance mutated by many concurrent actors.
///
/// Each [`Ledger::apply`] reads, validates, updates and logs inside a single
/// critical section, so any interleaving of calls ends with the balance a
/// sequential run in lock order would produce, and no reader ever sees a
/// balance without its log entry.
#[derive(Clone)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Ledger")
            .field("balance", &state.balance)
            .field("transactions", &state.log.len())
            .finish()
    }
}

impl Ledger {
    #[must_use]
    pub fn new(initial_balance: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                balance: initial_balance,
                log: Vec::new(),
            })),
        }
    }

    /// `apply` runs one transaction and returns the resulting balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] for a withdrawal larger than
    /// the balance held at the moment the lock is acquired, and
    /// [`LedgerError::Overflow`] for a deposit that cannot be represented.
    /// Rejected transactions leave the balance untouched but are still logged.
    pub fn apply(&self, kind: TransactionKind, amount: u64) -> LedgerResult<u64> {
        let mut state = self.lock();
        let before = state.balance;

        let next = match kind {
            TransactionKind::Deposit => before.checked_add(amount).ok_or(LedgerError::Overflow {
                amount,
                balance: before,
            }),
            TransactionKind::Withdrawal => {
                if before >= amount {
                    Ok(before - amount)
                } else {
                    Err(LedgerError::InsufficientFunds {
                        requested: amount,
                        available: before,
                    })
                }
            }
        };

        let sequence = state.log.len() + 1;
        match next {
            Ok(after) => {
                state.balance = after;
                state.log.push(Transaction {
                    sequence,
                    kind,
                    amount,
                    balance_before: before,
                    balance_after: after,
                    outcome: TransactionOutcome::Applied,
                });
                tracing::info!(
                    "{}: {}${}, Balance: ${} -> ${}",
                    kind,
                    sign(kind),
                    amount,
                    before,
                    after
                );
                Ok(after)
            }
            Err(err) => {
                state.log.push(Transaction {
                    sequence,
                    kind,
                    amount,
                    balance_before: before,
                    balance_after: before,
                    outcome: TransactionOutcome::Rejected,
                });
                tracing::warn!(
                    "{}: {}${} FAILED ({}), Balance: ${}",
                    kind,
                    sign(kind),
                    amount,
                    err,
                    before
                );
                Err(err)
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the balance cannot hold the result.
    pub fn deposit(&self, amount: u64) -> LedgerResult<u64> {
        self.apply(TransactionKind::Deposit, amount)
    }

    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientFunds`] if `amount` exceeds the balance.
    pub fn withdraw(&self, amount: u64) -> LedgerResult<u64> {
        self.apply(TransactionKind::Withdrawal, amount)
    }

    #[must_use]
    pub fn balance(&self) -> u64 {
        self.lock().balance
    }

    /// `history` returns a snapshot of the log in lock-acquisition order.
    #[must_use]
    pub fn history(&self) -> Vec<Transaction> {
        self.lock().log.clone()
    }

    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.lock().log.len()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

fn sign(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Deposit => "+",
        TransactionKind::Withdrawal => "-",
    }
}
