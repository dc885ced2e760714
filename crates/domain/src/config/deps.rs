use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepsConfig {
    #[serde(default = "d_default_safer")]
    pub default_safer: bool,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            default_safer: d_default_safer(),
        }
    }
}

fn d_default_safer() -> bool {
    true
}
