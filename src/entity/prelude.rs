pub use super::advance::Entity as Advance;
pub use super::loan::Entity as Loan;
pub use super::loan_payment::Entity as LoanPayment;
pub use super::work_group::Entity as WorkGroup;
pub use super::work_session::Entity as WorkSession;
pub use super::worker::Entity as Worker;
