use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    /// Read-only, expected idempotent.
    Query,
    /// Side-effecting, never retried by the bridge.
    Mutation,
    /// Long-lived stream of values.
    Subscription,
}

impl ProcedureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
            ProcedureKind::Subscription => "subscription",
        }
    }

    pub const fn is_streaming(self) -> bool {
        matches!(self, ProcedureKind::Subscription)
    }
}

impl Display for ProcedureKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}
