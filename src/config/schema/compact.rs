use crate::compact::SizeCeiling;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Where tasks without a due date go relative to dated (including overdue) ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UndatedPolicy {
    First,
    #[default]
    Last,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactConfig {
    /// Webhook body size limit in bytes; the posted body stays strictly below it.
    #[serde(default = "default_size_ceiling_bytes")]
    pub size_ceiling_bytes: usize,
    #[serde(default)]
    pub undated: UndatedPolicy,
}

fn default_size_ceiling_bytes() -> usize {
    2048
}

impl Default for CompactConfig {
    fn default() -> Self {
        Self {
            size_ceiling_bytes: default_size_ceiling_bytes(),
            undated: UndatedPolicy::default(),
        }
    }
}

impl CompactConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ceiling().map(|_| ())
    }

    pub fn ceiling(&self) -> Result<SizeCeiling, ConfigError> {
        SizeCeiling::new(self.size_ceiling_bytes).map_err(|e| ConfigError::Validation(e.to_string()))
    }
}
