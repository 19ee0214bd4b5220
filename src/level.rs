use serde::Deserialize;
use std::fmt;

/// Severity attached to a cop's diagnostics, configurable per cop.
///
/// `Allow` silences the cop, `Error` drives a non-zero exit code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopLevel {
    Allow,
    #[default]
    Warn,
    Error,
}

impl CopLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopLevel::Allow => "allow",
            CopLevel::Warn => "warning",
            CopLevel::Error => "error",
        }
    }
}

impl fmt::Display for CopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
