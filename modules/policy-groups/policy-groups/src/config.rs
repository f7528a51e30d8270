use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the `policy_groups` module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyGroupsConfig {
    /// Upper bound on the serialized size of a submitted policy document.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

impl Default for PolicyGroupsConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

fn default_max_document_bytes() -> usize {
    1_048_576
}

impl From<PolicyGroupsConfig> for ServiceConfig {
    fn from(config: PolicyGroupsConfig) -> Self {
        Self {
            max_document_bytes: config.max_document_bytes,
        }
    }
}
