// migrations/m202610010002_index_run_hashes.rs
use sea_orm_migration::prelude::*;

use super::m202610010001_create_runs::Runs;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202610010002_index_run_hashes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // duplicate-solution lookups go by task and hash
        manager
            .create_index(
                Index::create()
                    .name("idx_runs_task_hash")
                    .table(Runs::Table)
                    .col(Runs::TaskId)
                    .col(Runs::SolutionHash)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_runs_event_author")
                    .table(Runs::Table)
                    .col(Runs::EventId)
                    .col(Runs::Author)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_runs_event_author").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_runs_task_hash").to_owned())
            .await
    }
}
