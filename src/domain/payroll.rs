//! Monthly payroll summary.
//!
//! Everything here is recomputed from stored rows on every call. Per-worker
//! figures follow the worker's own pay cycle while fleet totals for advances,
//! loans and payouts follow the calendar month.

use std::str::FromStr;

use chrono::{Months, NaiveDate};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    consts::REQUIRED_HOURS,
    domain::{cycle, ledger, roster::{self, WorkerView}, AdvanceCap, Policies, UnknownPolicy},
    entity::{prelude::*, worker},
    error::Result,
    utils::{self, round_to},
};

/// How attendance turns into earned salary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayrollPolicy {
    /// Full salary every cycle, hours are tracked for monitoring only
    #[default]
    Fixed,
    /// Salary scaled by the share of required hours worked, capped at the full salary
    Proportional,
}

impl FromStr for PayrollPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "proportional" => Ok(Self::Proportional),
            _ => Err(UnknownPolicy { kind: "payroll policy", value: s.to_owned() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    FullSalaryNoAdvances,
    FullSalaryWithAdvances,
    FullSalaryExcessAdvances,
    CompletedNoAdvances,
    CompletedWithAdvances,
    IncompleteNoAdvances,
    IncompleteWithAdvances,
    DebtExceedsEarnings,
}

impl PayrollPolicy {
    pub fn earned_salary(self, salary: f64, hours: f64) -> f64 {
        match self {
            PayrollPolicy::Fixed => salary,
            PayrollPolicy::Proportional if hours >= REQUIRED_HOURS => salary,
            PayrollPolicy::Proportional => salary * hours / REQUIRED_HOURS,
        }
    }

    pub fn classify(self, hours: f64, earned: f64, advances: f64) -> PaymentStatus {
        match self {
            PayrollPolicy::Fixed => {
                if advances == 0.0 {
                    PaymentStatus::FullSalaryNoAdvances
                } else if advances <= earned {
                    PaymentStatus::FullSalaryWithAdvances
                } else {
                    PaymentStatus::FullSalaryExcessAdvances
                }
            }
            PayrollPolicy::Proportional => {
                let complete = hours >= REQUIRED_HOURS;

                match (advances > earned, complete, advances > 0.0) {
                    (true, _, _) => PaymentStatus::DebtExceedsEarnings,
                    (false, true, false) => PaymentStatus::CompletedNoAdvances,
                    (false, true, true) => PaymentStatus::CompletedWithAdvances,
                    (false, false, false) => PaymentStatus::IncompleteNoAdvances,
                    (false, false, true) => PaymentStatus::IncompleteWithAdvances,
                }
            }
        }
    }

    fn formula(self) -> &'static str {
        match self {
            PayrollPolicy::Fixed => "Fixed monthly salary (hours tracked for attendance only)",
            PayrollPolicy::Proportional => "Salary x hours worked / required hours, full salary once required hours are met",
        }
    }
}

/// A worker counts as paid this month once a salary payment moved `next_payment` into next month
pub fn is_paid_this_month(next_payment: Option<NaiveDate>, today: NaiveDate) -> bool {
    let next_month = utils::first_of_month(today) + Months::new(1);

    next_payment.is_some_and(|np| utils::same_month(np, next_month))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleInfo {
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkProgress {
    pub hours_worked: f64,
    pub required_hours: f64,
    pub hours_remaining: f64,
    pub completion_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryCalculation {
    pub monthly_salary: f64,
    pub earned_salary: f64,
    /// Unpaid advances, whenever they were given
    pub advances_taken: f64,
    pub final_payment: f64,
    pub remaining_debt: f64,
    pub advances_this_month: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerPayroll {
    pub worker: WorkerView,
    pub cycle_info: CycleInfo,
    pub work_progress: WorkProgress,
    pub salary_calculation: SalaryCalculation,
    pub payment_status: PaymentStatus,
    pub unpaid_advances_count: u64,
    pub is_paid_this_month: bool,
    pub amount_paid: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayrollTotals {
    pub total_earned_payroll: f64,
    pub total_advances_given: f64,
    pub total_final_payments: f64,
    pub total_workers: usize,
    pub total_loans_this_month: f64,
    pub total_advances_this_month: f64,
    pub total_paid_to_workers_this_month: f64,
    pub total_loans_given: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub required_hours_per_month: f64,
    pub payroll_policy: PayrollPolicy,
    pub advance_cap: AdvanceCap,
    pub payment_formula: String,
    pub cycle_calculation: String,
    pub advance_policy: String,
    pub attendance_tracking: String,
}

impl SystemInfo {
    fn describe(policies: Policies) -> Self {
        let advance_policy = match policies.advance_cap {
            AdvanceCap::Salary => "Advances deducted from monthly salary, unpaid advances capped at the salary",
            AdvanceCap::Uncapped => "Advances deducted from monthly salary",
        };

        Self {
            required_hours_per_month: REQUIRED_HOURS,
            payroll_policy: policies.payroll,
            advance_cap: policies.advance_cap,
            payment_formula: policies.payroll.formula().to_owned(),
            cycle_calculation: "Based on individual hire dates (e.g., 15th to 14th of the next month)".to_owned(),
            advance_policy: advance_policy.to_owned(),
            attendance_tracking: "Clock in/out maintained for monitoring purposes".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub workers: Vec<WorkerPayroll>,
    pub totals: PayrollTotals,
    pub system_info: SystemInfo,
}

pub async fn summarize<C: ConnectionTrait>(db: &C, policies: Policies, today: NaiveDate) -> Result<PaymentSummary> {
    let policy = policies.payroll;

    let workers = Worker::find()
        .filter(worker::Column::IsActive.eq(true))
        .order_by_asc(worker::Column::Code)
        .all(db).await?;
    let workers = roster::worker_views(db, workers).await?;

    let advances_this_month = ledger::advances_in_month(db, today).await?;

    let mut totals = PayrollTotals {
        total_workers: workers.len(),
        total_advances_this_month: advances_this_month.iter().fold(0.0, |sum, a| sum + a.amount),
        total_loans_this_month: ledger::loans_in_month(db, today).await?,
        total_loans_given: ledger::total_loans_given(db).await?,
        ..Default::default()
    };

    let mut summaries = Vec::with_capacity(workers.len());
    for view in workers {
        let worker = &view.worker;

        let cycle = cycle::cycle_for(worker.hire_date, today);
        let hours = ledger::hours_in_range(db, worker.id, cycle.start, cycle.end).await?;
        let unpaid = ledger::unpaid_advances(db, worker.id).await?;
        let advances_this_worker_month = advances_this_month.iter()
            .filter(|a| a.worker_id == worker.id)
            .fold(0.0, |sum, a| sum + a.amount);

        let earned = policy.earned_salary(worker.salary, hours);
        let final_payment = (earned - unpaid.total).max(0.0);
        let remaining_debt = (unpaid.total - earned).max(0.0);

        let is_paid = is_paid_this_month(worker.next_payment, today);
        let amount_paid = match worker.next_payment {
            // No salary is paid out in the hire month, only advances
            Some(_) if utils::same_month(worker.hire_date, today) => 0.0,
            Some(next_payment) if is_paid => {
                let advanced = ledger::advances_since_last_payment(db, worker.id, next_payment).await?;
                (earned - advanced).max(0.0)
            }
            _ => 0.0,
        };

        totals.total_earned_payroll += earned;
        totals.total_advances_given += unpaid.total;
        totals.total_final_payments += final_payment;
        totals.total_paid_to_workers_this_month += amount_paid;

        debug!(worker = %worker.code, hours, earned, unpaid = unpaid.total, amount_paid, "payroll computed");

        summaries.push(WorkerPayroll {
            cycle_info: CycleInfo {
                cycle_start: cycle.start,
                cycle_end: cycle.end,
                days_remaining: cycle.days_remaining(today),
            },
            work_progress: WorkProgress {
                hours_worked: round_to(hours, 2),
                required_hours: REQUIRED_HOURS,
                hours_remaining: round_to((REQUIRED_HOURS - hours).max(0.0), 2),
                completion_percentage: round_to(100.0 * hours / REQUIRED_HOURS, 1),
            },
            salary_calculation: SalaryCalculation {
                monthly_salary: worker.salary,
                earned_salary: round_to(earned, 2),
                advances_taken: round_to(unpaid.total, 2),
                final_payment: round_to(final_payment, 2),
                remaining_debt: round_to(remaining_debt, 2),
                advances_this_month: round_to(advances_this_worker_month, 2),
            },
            payment_status: policy.classify(hours, earned, unpaid.total),
            unpaid_advances_count: unpaid.count,
            is_paid_this_month: is_paid,
            amount_paid: round_to(amount_paid, 2),
            worker: view,
        });
    }

    let totals = PayrollTotals {
        total_earned_payroll: round_to(totals.total_earned_payroll, 2),
        total_advances_given: round_to(totals.total_advances_given, 2),
        total_final_payments: round_to(totals.total_final_payments, 2),
        total_loans_this_month: round_to(totals.total_loans_this_month, 2),
        total_advances_this_month: round_to(totals.total_advances_this_month, 2),
        total_paid_to_workers_this_month: round_to(totals.total_paid_to_workers_this_month, 2),
        total_loans_given: round_to(totals.total_loans_given, 2),
        ..totals
    };

    Ok(PaymentSummary {
        workers: summaries,
        totals,
        system_info: SystemInfo::describe(policies),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{lending, roster::WorkerChanges},
        test_utils::*,
    };

    fn proportional() -> Policies {
        Policies { payroll: PayrollPolicy::Proportional, ..Default::default() }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Fixed".parse::<PayrollPolicy>().unwrap(), PayrollPolicy::Fixed);
        assert_eq!(" proportional ".parse::<PayrollPolicy>().unwrap(), PayrollPolicy::Proportional);
        assert!("hourly".parse::<PayrollPolicy>().is_err());
    }

    #[test]
    fn test_earned_salary() {
        assert_eq!(PayrollPolicy::Fixed.earned_salary(60_000.0, 0.0), 60_000.0);
        assert_eq!(PayrollPolicy::Proportional.earned_salary(60_000.0, 80.0), 30_000.0);
        assert_eq!(PayrollPolicy::Proportional.earned_salary(60_000.0, 200.0), 60_000.0);
    }

    #[test]
    fn test_classify_fixed() {
        let fixed = PayrollPolicy::Fixed;

        assert_eq!(fixed.classify(0.0, 1_000.0, 0.0), PaymentStatus::FullSalaryNoAdvances);
        assert_eq!(fixed.classify(0.0, 1_000.0, 1_000.0), PaymentStatus::FullSalaryWithAdvances);
        assert_eq!(fixed.classify(0.0, 1_000.0, 1_000.5), PaymentStatus::FullSalaryExcessAdvances);
    }

    #[test]
    fn test_classify_proportional() {
        let proportional = PayrollPolicy::Proportional;

        assert_eq!(proportional.classify(160.0, 1_000.0, 0.0), PaymentStatus::CompletedNoAdvances);
        assert_eq!(proportional.classify(170.0, 1_000.0, 10.0), PaymentStatus::CompletedWithAdvances);
        assert_eq!(proportional.classify(80.0, 500.0, 0.0), PaymentStatus::IncompleteNoAdvances);
        assert_eq!(proportional.classify(80.0, 500.0, 500.0), PaymentStatus::IncompleteWithAdvances);
        assert_eq!(proportional.classify(80.0, 500.0, 600.0), PaymentStatus::DebtExceedsEarnings);
        assert_eq!(proportional.classify(0.0, 0.0, 1.0), PaymentStatus::DebtExceedsEarnings);
    }

    #[test]
    fn test_is_paid_this_month() {
        let today = date(2024, 9, 20);

        assert!(is_paid_this_month(Some(date(2024, 10, 15)), today));
        assert!(is_paid_this_month(Some(date(2024, 10, 31)), today));
        assert!(!is_paid_this_month(Some(date(2024, 9, 25)), today));
        assert!(!is_paid_this_month(Some(date(2024, 11, 1)), today));
        assert!(!is_paid_this_month(None, today));
        assert!(is_paid_this_month(Some(date(2025, 1, 5)), date(2024, 12, 31)));
    }

    #[actix_web::test]
    async fn test_fixed_salary_ignores_hours() -> Result<()> {
        let db = setup_test_db().await?;
        let worker = create_test_worker(&db, "W-1", 60_000.0, date(2024, 7, 15)).await?;

        insert_session(&db, worker.id, date(2024, 9, 14), Some(10.0)).await;
        insert_session(&db, worker.id, date(2024, 9, 16), Some(8.0)).await;

        let summary = summarize(&db, Policies::default(), date(2024, 9, 20)).await?;
        let payroll = &summary.workers[0];

        assert_eq!(payroll.cycle_info, CycleInfo {
            cycle_start: date(2024, 9, 15),
            cycle_end: date(2024, 10, 14),
            days_remaining: 24,
        });
        assert_eq!(payroll.work_progress, WorkProgress {
            hours_worked: 8.0,
            required_hours: 160.0,
            hours_remaining: 152.0,
            completion_percentage: 5.0,
        });
        assert_eq!(payroll.salary_calculation.earned_salary, 60_000.0);
        assert_eq!(payroll.salary_calculation.final_payment, 60_000.0);
        assert_eq!(payroll.payment_status, PaymentStatus::FullSalaryNoAdvances);
        assert!(!payroll.is_paid_this_month);
        assert_eq!(payroll.amount_paid, 0.0);

        Ok(())
    }

    #[actix_web::test]
    async fn test_fixed_salary_with_advances() -> Result<()> {
        let db = setup_test_db().await?;
        let now = at(date(2024, 9, 20), 10, 0);
        let modest = create_test_worker(&db, "W-1", 60_000.0, date(2024, 7, 15)).await?;
        let indebted = create_test_worker(&db, "W-2", 40_000.0, date(2024, 7, 15)).await?;

        lending::give_advance(&db, modest.id, 20_000.0, None, AdvanceCap::Salary, now).await?;
        insert_advance(&db, indebted.id, 30_000.0, date(2024, 8, 1), false).await;
        lending::give_advance(&db, indebted.id, 20_000.0, None, AdvanceCap::Uncapped, now).await?;

        let summary = summarize(&db, Policies::default(), date(2024, 9, 20)).await?;
        let (modest, indebted) = (&summary.workers[0], &summary.workers[1]);

        assert_eq!(modest.payment_status, PaymentStatus::FullSalaryWithAdvances);
        assert_eq!(modest.salary_calculation.final_payment, 40_000.0);
        assert_eq!(modest.unpaid_advances_count, 1);

        assert_eq!(indebted.payment_status, PaymentStatus::FullSalaryExcessAdvances);
        assert_eq!(indebted.salary_calculation.advances_taken, 50_000.0);
        assert_eq!(indebted.salary_calculation.advances_this_month, 20_000.0);
        assert_eq!(indebted.salary_calculation.final_payment, 0.0);
        assert_eq!(indebted.salary_calculation.remaining_debt, 10_000.0);

        assert_eq!(summary.totals.total_earned_payroll, 100_000.0);
        assert_eq!(summary.totals.total_advances_given, 70_000.0);
        assert_eq!(summary.totals.total_final_payments, 40_000.0);
        assert_eq!(summary.totals.total_advances_this_month, 40_000.0);

        Ok(())
    }

    #[actix_web::test]
    async fn test_proportional_salary() -> Result<()> {
        let db = setup_test_db().await?;
        let worker = create_test_worker(&db, "W-1", 60_000.0, date(2024, 7, 15)).await?;

        for day in 15..25 {
            insert_session(&db, worker.id, date(2024, 9, day), Some(8.0)).await;
        }

        let summary = summarize(&db, proportional(), date(2024, 9, 25)).await?;
        let payroll = &summary.workers[0];
        assert_eq!(payroll.work_progress.hours_worked, 80.0);
        assert_eq!(payroll.work_progress.completion_percentage, 50.0);
        assert_eq!(payroll.salary_calculation.earned_salary, 30_000.0);
        assert_eq!(payroll.payment_status, PaymentStatus::IncompleteNoAdvances);

        insert_advance(&db, worker.id, 35_000.0, date(2024, 9, 1), false).await;

        let summary = summarize(&db, proportional(), date(2024, 9, 25)).await?;
        let payroll = &summary.workers[0];
        assert_eq!(payroll.payment_status, PaymentStatus::DebtExceedsEarnings);
        assert_eq!(payroll.salary_calculation.remaining_debt, 5_000.0);
        assert_eq!(payroll.salary_calculation.final_payment, 0.0);
        assert_eq!(summary.system_info.payroll_policy, PayrollPolicy::Proportional);

        Ok(())
    }

    #[actix_web::test]
    async fn test_amount_paid_after_payroll_run() -> Result<()> {
        let db = setup_test_db().await?;
        let today = date(2024, 9, 20);
        let worker = create_test_worker(&db, "W-1", 60_000.0, date(2024, 5, 10)).await?;

        insert_advance(&db, worker.id, 5_000.0, date(2024, 9, 12), false).await;
        insert_advance(&db, worker.id, 1_000.0, date(2024, 9, 1), false).await;

        let changes = WorkerChanges { next_payment: Some(Some(date(2024, 10, 10))), ..Default::default() };
        roster::update_worker(&db, worker.id, changes, at(today, 9, 0)).await?;

        let summary = summarize(&db, Policies::default(), today).await?;
        let payroll = &summary.workers[0];

        assert!(payroll.is_paid_this_month);
        assert_eq!(payroll.unpaid_advances_count, 0);
        assert_eq!(payroll.salary_calculation.final_payment, 60_000.0);
        assert_eq!(payroll.amount_paid, 55_000.0);
        assert_eq!(summary.totals.total_paid_to_workers_this_month, 55_000.0);
        assert_eq!(summary.totals.total_advances_this_month, 6_000.0);

        Ok(())
    }

    #[actix_web::test]
    async fn test_no_salary_in_hire_month() -> Result<()> {
        let db = setup_test_db().await?;
        let worker = create_test_worker(&db, "W-1", 60_000.0, date(2024, 9, 5)).await?;
        assert_eq!(worker.next_payment, Some(date(2024, 10, 5)));

        let summary = summarize(&db, Policies::default(), date(2024, 9, 20)).await?;
        let payroll = &summary.workers[0];

        assert!(payroll.is_paid_this_month);
        assert_eq!(payroll.amount_paid, 0.0);
        assert_eq!(summary.totals.total_paid_to_workers_this_month, 0.0);

        Ok(())
    }

    #[actix_web::test]
    async fn test_fleet_totals() -> Result<()> {
        let db = setup_test_db().await?;
        let now = at(date(2024, 9, 20), 10, 0);
        let active = create_test_worker(&db, "W-1", 30_000.0, date(2024, 1, 15)).await?;
        let retired = create_test_worker(&db, "W-2", 45_000.0, date(2024, 1, 15)).await?;

        insert_loan(&db, active.id, 10_000.0, date(2024, 9, 2)).await;
        insert_loan(&db, retired.id, 7_500.0, date(2024, 3, 2)).await;
        insert_advance(&db, retired.id, 2_000.0, date(2024, 9, 3), false).await;

        let changes = WorkerChanges { is_active: Some(false), ..Default::default() };
        roster::update_worker(&db, retired.id, changes, now).await?;

        let summary = summarize(&db, Policies::default(), date(2024, 9, 20)).await?;

        assert_eq!(summary.totals.total_workers, 1);
        assert_eq!(summary.workers[0].worker.worker.id, active.id);
        assert_eq!(summary.totals.total_earned_payroll, 30_000.0);
        assert_eq!(summary.totals.total_advances_given, 0.0);
        assert_eq!(summary.totals.total_loans_this_month, 10_000.0);
        assert_eq!(summary.totals.total_loans_given, 17_500.0);
        assert_eq!(summary.totals.total_advances_this_month, 2_000.0);
        assert_eq!(summary.system_info.required_hours_per_month, 160.0);

        Ok(())
    }

    #[actix_web::test]
    async fn test_empty_fleet() -> Result<()> {
        let db = setup_test_db().await?;

        let summary = summarize(&db, Policies::default(), date(2024, 9, 20)).await?;

        assert!(summary.workers.is_empty());
        assert_eq!(summary.totals, PayrollTotals::default());

        Ok(())
    }
}
