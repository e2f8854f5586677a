//! Persistence of judging runs.
//!
//! [`models::run`] is the sea-orm entity behind the `runs` table. The judge
//! talks to it through [`RunStore`], implemented over a database connection
//! by [`SqlRunStore`] and in memory by [`InMemoryRunStore`].

pub mod models;
pub mod store;
pub mod test_utils;

pub use models::run::{Model as Run, NewRun};
pub use store::{InMemoryRunStore, RunStore, SqlRunStore, StoreError};

use std::path::Path;

/// Turns a configured database path into a connection URL. DSNs are used as
/// is; anything else is a SQLite file created on first use.
pub fn database_url(path_or_url: &str) -> String {
    if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        return path_or_url.to_string();
    }
    // SQLite won't create intermediate dirs
    if let Some(parent) = Path::new(path_or_url).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    format!("sqlite://{path_or_url}?mode=rwc")
}
