use sea_orm_migration::prelude::*;

/// Every table carries an application generated UUID key and a creation timestamp
pub(crate) fn default_table_statement() -> TableCreateStatement {
    TableCreateStatement::new()
        .if_not_exists()
        .col(ColumnDef::new(DefaultColumn::Id)
            .uuid()
            .primary_key()
            .take())
        .col(ColumnDef::new(DefaultColumn::CreatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .take()
}

/// Same as [`default_table_statement`] plus `updated_at`, for rows that are mutated after insert
pub(crate) fn mutable_table_statement() -> TableCreateStatement {
    default_table_statement()
        .col(ColumnDef::new(DefaultColumn::UpdatedAt)
            .timestamp_with_time_zone()
            .not_null()
            .take())
        .take()
}

/// Inline foreign key, SQLite cannot add constraints to an existing table
pub(crate) fn owned_by(
    table: impl IntoTableRef,
    column: impl IntoIden,
    owner: impl IntoTableRef,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .from(table, column)
        .to(owner, DefaultColumn::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::Cascade)
        .take()
}

#[derive(DeriveIden)]
pub(crate) enum DefaultColumn {
    Id,
    CreatedAt,
    UpdatedAt,
}
