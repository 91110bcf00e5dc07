use crate::model::PaymentStatus;
use serde::{Deserialize, Serialize};

/// Largest `before`/`after` a loaded config may ask for.
pub const MAX_YEAR_WINDOW: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearWindowConfig {
    /// Years offered before the current academic year.
    pub before: u32,
    /// Years offered after the current academic year.
    pub after: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCountingConfig {
    /// Payment statuses that count towards `total_paid` when the service
    /// layer fetches payments. Unverified offline payments stay `pending`
    /// and are excluded by default.
    pub counted_statuses: Vec<PaymentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub year_window: YearWindowConfig,
    pub payments: PaymentCountingConfig,
}

impl EngineConfig {
    /// Load from a JSON file.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let window = &self.year_window;
        if window.before > MAX_YEAR_WINDOW || window.after > MAX_YEAR_WINDOW {
            anyhow::bail!(
                "year_window.before/after must be at most {MAX_YEAR_WINDOW}, got {}/{}",
                window.before,
                window.after
            );
        }
        if self.payments.counted_statuses.is_empty() {
            anyhow::bail!("payments.counted_statuses must not be empty");
        }
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self::default()
    }

    pub fn counts_payment(&self, status: PaymentStatus) -> bool {
        self.payments.counted_statuses.contains(&status)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            year_window: YearWindowConfig {
                before: 5,
                after: 1,
            },
            payments: PaymentCountingConfig {
                counted_statuses: vec![PaymentStatus::Paid],
            },
        }
    }
}
