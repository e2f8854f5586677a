use std::{env, fs, path::Path, process};

use colored::*;

mod runner;

/// `migration [status|clean|fresh]` against `DATABASE_PATH`. Without a
/// command, pending migrations are applied.
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = common::config::database_path();
    let command = env::args().nth(1);

    if matches!(command.as_deref(), Some("clean") | Some("fresh")) {
        remove_database(&db_path);
        if command.as_deref() == Some("clean") {
            return;
        }
    }

    ensure_parent_dir(&db_path);
    let url = format!("sqlite://{}?mode=rwc", db_path);
    let db = match runner::connect(&url).await {
        Ok(db) => db,
        Err(e) => exit_with(format!("Cannot open {}: {}", db_path, e)),
    };

    let outcome = match command.as_deref() {
        Some("status") => runner::print_status(&db).await,
        _ => runner::apply_pending(&db).await.map(|_| ()),
    };
    if let Err(e) = outcome {
        exit_with(format!("Migration failed: {}", e));
    }
}

fn exit_with(message: String) -> ! {
    eprintln!("{}", message.red());
    process::exit(1);
}

fn remove_database(path: &str) {
    let file = Path::new(path);
    if !file.exists() {
        println!("Nothing to delete at {}", file.display());
        return;
    }
    match fs::remove_file(file) {
        Ok(()) => println!("Deleted {}", file.display()),
        Err(e) => exit_with(format!("Cannot delete {}: {}", file.display(), e)),
    }
}

fn ensure_parent_dir(path: &str) {
    let Some(parent) = Path::new(path).parent() else {
        return;
    };
    if !parent.as_os_str().is_empty() {
        if let Err(e) = fs::create_dir_all(parent) {
            exit_with(format!("Cannot create {}: {}", parent.display(), e));
        }
    }
}
