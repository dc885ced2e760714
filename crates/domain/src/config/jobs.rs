use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsConfig {
    /// Must be >= 1.
    #[serde(default = "d_max_concurrent")]
    pub max_concurrent: usize,
    /// Hard wall-clock timeout per job. Must be > 0.
    #[serde(default = "d_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: d_max_concurrent(),
            timeout_seconds: d_timeout_seconds(),
        }
    }
}

fn d_max_concurrent() -> usize {
    1
}
fn d_timeout_seconds() -> u64 {
    3600
}
