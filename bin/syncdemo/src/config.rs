use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_more::derive::From;
use ewe_synca::TransactionKind;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, From)]
pub enum ConfigError {
    IOError(std::io::Error),

    DeserializationFailed(toml::de::Error),

    #[from(ignore)]
    InvalidPath(PathBuf),
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub fn from_path<T, V>(target: V) -> ConfigResult<T>
where
    T: DeserializeOwned,
    V: Into<PathBuf>,
{
    let target_path = target.into();
    if !target_path.is_file() {
        return Err(ConfigError::InvalidPath(target_path));
    }

    let config_content = std::fs::read_to_string(target_path)?;
    from_str(&config_content)
}

pub fn from_str<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config_obj: T = toml::from_str(content)?;
    Ok(config_obj)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionEntryKind {
    Deposit,
    Withdrawal,
}

impl From<TransactionEntryKind> for TransactionKind {
    fn from(value: TransactionEntryKind) -> Self {
        match value {
            TransactionEntryKind::Deposit => TransactionKind::Deposit,
            TransactionEntryKind::Withdrawal => TransactionKind::Withdrawal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransactionEntry {
    pub kind: TransactionEntryKind,
    pub amount: u64,
}

/// Scenario knobs. Every field is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Concurrent actors racing on the counters
    pub actors: usize,
    pub initial_balance: u64,
    pub transactions: Vec<TransactionEntry>,
    pub workers: usize,
    pub jobs: u64,
    pub job_duration_ms: u64,
    pub select_timeout_ms: u64,
    pub slow_task_ms: u64,
    pub task_timeout_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        let tx = |kind, amount| TransactionEntry { kind, amount };
        Self {
            actors: 1000,
            initial_balance: 1000,
            transactions: vec![
                tx(TransactionEntryKind::Deposit, 200),
                tx(TransactionEntryKind::Withdrawal, 150),
                tx(TransactionEntryKind::Deposit, 300),
                tx(TransactionEntryKind::Withdrawal, 100),
                tx(TransactionEntryKind::Withdrawal, 50),
            ],
            workers: 3,
            jobs: 5,
            job_duration_ms: 50,
            select_timeout_ms: 300,
            slow_task_ms: 2000,
            task_timeout_ms: 1000,
        }
    }
}

impl DemoConfig {
    /// `load` reads `path` when given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(target) => from_path(target),
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn job_duration(&self) -> Duration {
        Duration::from_millis(self.job_duration_ms)
    }

    #[must_use]
    pub fn select_timeout(&self) -> Duration {
        Duration::from_millis(self.select_timeout_ms)
    }

    #[must_use]
    pub fn slow_task(&self) -> Duration {
        Duration::from_millis(self.slow_task_ms)
    }

    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: DemoConfig = from_str("").unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config: DemoConfig = from_str(
            r#"
            workers = 8
            initial_balance = 50

            [[transactions]]
            kind = "withdrawal"
            amount = 75
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 8);
        assert_eq!(config.initial_balance, 50);
        assert_eq!(config.jobs, 5);
        assert_eq!(
            config.transactions,
            vec![TransactionEntry {
                kind: TransactionEntryKind::Withdrawal,
                amount: 75
            }]
        );
    }

    #[test]
    fn unknown_transaction_kind_is_rejected() {
        let result: ConfigResult<DemoConfig> = from_str(
            r#"
            [[transactions]]
            kind = "transfer"
            amount = 1
            "#,
        );
        assert!(matches!(result, Err(ConfigError::DeserializationFailed(_))));
    }

    #[test]
    fn missing_file_is_an_invalid_path() {
        let result = DemoConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(ConfigError::InvalidPath(_))));
    }
}
