pub mod prelude;

pub mod advance;
pub mod loan;
pub mod loan_payment;
pub mod work_group;
pub mod work_session;
pub mod worker;
