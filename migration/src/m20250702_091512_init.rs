use sea_orm_migration::prelude::*;

use crate::util::{default_table_statement, mutable_table_statement, owned_by, DefaultColumn};

#[derive(DeriveMigrationName)]
pub struct Migration;

// Partial indexes are not expressible through the index builder, both PostgreSQL and SQLite accept this form
const ACTIVE_GROUP_NAME_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_work_group_active_name
    ON work_group (name)
    WHERE is_active
"#;

const ACTIVE_GROUP_LEADER_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_work_group_active_leader
    ON work_group (team_leader_id)
    WHERE is_active AND team_leader_id IS NOT NULL
"#;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // `team_leader_id` has no constraint: the two tables reference each other and
        // SQLite cannot add a foreign key after the fact. Worker deletion clears it instead.
        manager
            .create_table(mutable_table_statement()
                .table(WorkGroup::Table)
                .col(ColumnDef::new(WorkGroup::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(WorkGroup::TeamLeaderId)
                    .uuid())
                .col(ColumnDef::new(WorkGroup::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .take()
            ).await?;

        let db = manager.get_connection();
        db.execute_unprepared(ACTIVE_GROUP_NAME_INDEX).await?;
        db.execute_unprepared(ACTIVE_GROUP_LEADER_INDEX).await?;

        manager
            .create_table(mutable_table_statement()
                .table(Worker::Table)
                .col(ColumnDef::new(Worker::Code)
                    .text()
                    .unique_key()
                    .not_null())
                .col(ColumnDef::new(Worker::Name)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Worker::Phone)
                    .text())
                .col(ColumnDef::new(Worker::Position)
                    .text()
                    .not_null())
                .col(ColumnDef::new(Worker::Salary)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Worker::HireDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Worker::NextPayment)
                    .date())
                .col(ColumnDef::new(Worker::Birthday)
                    .date())
                .col(ColumnDef::new(Worker::IsActive)
                    .boolean()
                    .not_null()
                    .default(true))
                .col(ColumnDef::new(Worker::GroupId)
                    .uuid())
                .foreign_key(ForeignKey::create()
                    .from(Worker::Table, Worker::GroupId)
                    .to(WorkGroup::Table, DefaultColumn::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .on_update(ForeignKeyAction::Cascade))
                .take()
            ).await?;

        manager
            .create_table(mutable_table_statement()
                .table(WorkSession::Table)
                .col(ColumnDef::new(WorkSession::WorkerId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(WorkSession::Date)
                    .date()
                    .not_null())
                .col(ColumnDef::new(WorkSession::ClockIn)
                    .timestamp_with_time_zone()
                    .not_null())
                .col(ColumnDef::new(WorkSession::ClockOut)
                    .timestamp_with_time_zone())
                .col(ColumnDef::new(WorkSession::HoursWorked)
                    .double())
                .foreign_key(&mut owned_by(WorkSession::Table, WorkSession::WorkerId, Worker::Table))
                .take()
            ).await?;

        // One attendance record per worker and day, concurrent clock-ins lose here
        manager
            .create_index(Index::create()
                .if_not_exists()
                .name("idx_work_session_worker_date")
                .table(WorkSession::Table)
                .col(WorkSession::WorkerId)
                .col(WorkSession::Date)
                .unique()
                .take()
            ).await?;

        manager
            .create_table(mutable_table_statement()
                .table(Advance::Table)
                .col(ColumnDef::new(Advance::WorkerId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Advance::Amount)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Advance::Reason)
                    .text())
                .col(ColumnDef::new(Advance::DateGiven)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Advance::IsPaidBack)
                    .boolean()
                    .not_null()
                    .default(false))
                .foreign_key(&mut owned_by(Advance::Table, Advance::WorkerId, Worker::Table))
                .take()
            ).await?;

        manager
            .create_table(mutable_table_statement()
                .table(Loan::Table)
                .col(ColumnDef::new(Loan::WorkerId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(Loan::TotalAmount)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Loan::AmountPaidBack)
                    .double()
                    .not_null()
                    .default(0.0))
                .col(ColumnDef::new(Loan::RemainingBalance)
                    .double()
                    .not_null())
                .col(ColumnDef::new(Loan::Reason)
                    .text())
                .col(ColumnDef::new(Loan::DateGiven)
                    .date()
                    .not_null())
                .col(ColumnDef::new(Loan::IsFullyPaid)
                    .boolean()
                    .not_null()
                    .default(false))
                .foreign_key(&mut owned_by(Loan::Table, Loan::WorkerId, Worker::Table))
                .take()
            ).await?;

        // Installments are append-only, hence no `updated_at`
        manager
            .create_table(default_table_statement()
                .table(LoanPayment::Table)
                .col(ColumnDef::new(LoanPayment::LoanId)
                    .uuid()
                    .not_null())
                .col(ColumnDef::new(LoanPayment::PaymentAmount)
                    .double()
                    .not_null())
                .col(ColumnDef::new(LoanPayment::PaymentDate)
                    .date()
                    .not_null())
                .col(ColumnDef::new(LoanPayment::Notes)
                    .text())
                .foreign_key(&mut owned_by(LoanPayment::Table, LoanPayment::LoanId, Loan::Table))
                .take()
            ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(
            Table::drop()
                .table(LoanPayment::Table)
                .take()
        ).await?;

        manager.drop_table(
            Table::drop()
                .table(Loan::Table)
                .take()
        ).await?;

        manager.drop_table(
            Table::drop()
                .table(Advance::Table)
                .take()
        ).await?;

        manager.drop_table(
            Table::drop()
                .table(WorkSession::Table)
                .take()
        ).await?;

        manager.drop_table(
            Table::drop()
                .table(Worker::Table)
                .take()
        ).await?;

        manager.drop_table(
            Table::drop()
                .table(WorkGroup::Table)
                .take()
        ).await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum WorkGroup {
    Table,
    Name,
    TeamLeaderId,
    IsActive,
}

#[derive(DeriveIden)]
enum Worker {
    Table,
    Code,
    Name,
    Phone,
    Position,
    Salary,
    HireDate,
    NextPayment,
    Birthday,
    IsActive,
    GroupId,
}

#[derive(DeriveIden)]
enum WorkSession {
    Table,
    WorkerId,
    Date,
    ClockIn,
    ClockOut,
    HoursWorked,
}

#[derive(DeriveIden)]
enum Advance {
    Table,
    WorkerId,
    Amount,
    Reason,
    DateGiven,
    IsPaidBack,
}

#[derive(DeriveIden)]
enum Loan {
    Table,
    WorkerId,
    TotalAmount,
    AmountPaidBack,
    RemainingBalance,
    Reason,
    DateGiven,
    IsFullyPaid,
}

#[derive(DeriveIden)]
enum LoanPayment {
    Table,
    LoanId,
    PaymentAmount,
    PaymentDate,
    Notes,
}
