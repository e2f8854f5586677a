// migrations/m202610010001_create_runs.rs
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
pub enum Runs {
    Table,
    Id,
    EventId,
    TaskId,
    Author,
    SolutionSource,
    SolutionHash,
    Verdict,
    Comment,
    InvokerId,
    InvokerPort,
    CreatedAt,
    UpdatedAt,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202610010001_create_runs"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Runs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Runs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Runs::EventId).string().not_null())
                    .col(ColumnDef::new(Runs::TaskId).string().not_null())
                    .col(ColumnDef::new(Runs::Author).string().not_null())
                    .col(ColumnDef::new(Runs::SolutionSource).text().not_null())
                    .col(ColumnDef::new(Runs::SolutionHash).string().not_null())
                    .col(ColumnDef::new(Runs::Verdict).string_len(2).not_null())
                    .col(
                        ColumnDef::new(Runs::Comment)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Runs::InvokerId).string().null())
                    .col(ColumnDef::new(Runs::InvokerPort).integer().null())
                    .col(
                        ColumnDef::new(Runs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Runs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Runs::Table).to_owned())
            .await
    }
}
