use colored::*;
use futures::FutureExt;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use migration::Migrator;

const STATUS_COLUMN: usize = 60;

pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    sea_orm::Database::connect(url).await
}

/// Applies pending migrations one at a time so each gets its own status line.
/// Returns how many were applied.
pub async fn apply_pending(db: &DatabaseConnection) -> Result<usize, DbErr> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        println!("{}", "Schema is up to date".dimmed());
        return Ok(0);
    }

    println!("Applying {} migration(s)...", pending.len());
    for migration in &pending {
        let label = format!("  {}", migration.name().bold());
        print!("{}{} ", label, ".".repeat(STATUS_COLUMN.saturating_sub(label.len())));
        io::stdout().flush().ok();

        let start = Instant::now();
        match AssertUnwindSafe(Migrator::up(db, Some(1))).catch_unwind().await {
            Ok(Ok(())) => println!("{} {}", "done".green(), format!("({:.2?})", start.elapsed()).dimmed()),
            Ok(Err(e)) => {
                println!("{}", "failed".red());
                return Err(e);
            }
            Err(_) => {
                println!("{}", "panicked".red());
                return Err(DbErr::Migration(format!("{} panicked", migration.name())));
            }
        }
    }
    Ok(pending.len())
}

/// Prints every known migration with whether it has been applied.
pub async fn print_status(db: &DatabaseConnection) -> Result<(), DbErr> {
    let applied = Migrator::get_applied_migrations(db).await?;
    let pending = Migrator::get_pending_migrations(db).await?;
    for migration in &applied {
        println!("{} {}", "applied".green(), migration.name());
    }
    for migration in &pending {
        println!("{} {}", "pending".yellow(), migration.name());
    }
    Ok(())
}
