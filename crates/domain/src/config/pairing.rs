use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingConfig {
    #[serde(default = "d_ttl_days")]
    pub token_ttl_days: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            token_ttl_days: d_ttl_days(),
        }
    }
}

fn d_ttl_days() -> u32 {
    30
}
