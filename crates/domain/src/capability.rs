use serde::{Deserialize, Serialize};

/// A named operation that requires explicit per-origin approval before
/// the daemon will perform it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    OpenTerminal,
    OpenVscode,
    #[serde(rename = "deps/install")]
    DepsInstall,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenTerminal => "open-terminal",
            Self::OpenVscode => "open-vscode",
            Self::DepsInstall => "deps/install",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_names() {
        assert_eq!(Capability::OpenTerminal.to_string(), "open-terminal");
        assert_eq!(Capability::OpenVscode.to_string(), "open-vscode");
        assert_eq!(Capability::DepsInstall.to_string(), "deps/install");
    }

    #[test]
    fn serde_roundtrip() {
        let cap = Capability::DepsInstall;
        let json = serde_json::to_string(&cap).unwrap();
        assert_eq!(json, "\"deps/install\"");
        let back: Capability = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cap);
    }
}
