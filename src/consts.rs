/// Monthly attendance considered complete, in hours
pub const REQUIRED_HOURS: f64 = 160.0;

/// Tolerance for floating point drift on loan balances
pub const BALANCE_EPSILON: f64 = 0.01;

pub const RECENT_SESSIONS_LIMIT: u64 = 50;

pub const ADMIN_PIN_HEADER: &str = "X-Admin-Pin";
