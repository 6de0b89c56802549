pub mod attendance;
pub mod cycle;
pub mod ledger;
pub mod lending;
pub mod payroll;
pub mod roster;

use thiserror::Error;

pub use lending::AdvanceCap;
pub use payroll::PayrollPolicy;

/// Business rules chosen at deployment time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policies {
    pub payroll: PayrollPolicy,
    pub advance_cap: AdvanceCap,
}

#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownPolicy {
    pub kind: &'static str,
    pub value: String,
}
