use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use thiserror::Error;
use tracing::debug;

use crate::models::run::{Model as Run, NewRun};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),

    #[error("run {0} does not exist")]
    NotFound(i64),
}

/// Where judged runs are recorded.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create(&self, run: NewRun) -> Result<Run, StoreError>;

    /// Overwrites the verdict, comment and invoker of an existing run.
    async fn save(&self, run: &Run) -> Result<Run, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<Run>, StoreError>;

    async fn for_event(&self, event_id: &str) -> Result<Vec<Run>, StoreError>;
}

/// [`RunStore`] over a sea-orm connection.
#[derive(Clone)]
pub struct SqlRunStore {
    db: DatabaseConnection,
}

impl SqlRunStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects to `url` and applies pending migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let db = Database::connect(url).await?;
        migration::Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl RunStore for SqlRunStore {
    async fn create(&self, run: NewRun) -> Result<Run, StoreError> {
        let run = Run::create(&self.db, run).await?;
        debug!(run = run.id, task = %run.task_id, verdict = %run.verdict, "run stored");
        Ok(run)
    }

    async fn save(&self, run: &Run) -> Result<Run, StoreError> {
        match run.save(&self.db).await {
            Ok(saved) => Ok(saved),
            Err(DbErr::RecordNotUpdated) => Err(StoreError::NotFound(run.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: i64) -> Result<Option<Run>, StoreError> {
        Ok(Run::find_by_id(&self.db, id).await?)
    }

    async fn for_event(&self, event_id: &str) -> Result<Vec<Run>, StoreError> {
        Ok(Run::find_all_for_event(&self.db, event_id).await?)
    }
}

/// Process-local [`RunStore`], for tests and dry runs.
#[derive(Default)]
pub struct InMemoryRunStore {
    rows: Mutex<Vec<Run>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<Run> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn create(&self, run: NewRun) -> Result<Run, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let mut row = Run {
            id: rows.last().map_or(1, |r| r.id + 1),
            event_id: run.event_id,
            task_id: run.task_id,
            author: run.author,
            solution_source: run.solution_source,
            solution_hash: run.solution_hash,
            verdict: String::new(),
            comment: String::new(),
            invoker_id: None,
            invoker_port: None,
            created_at: now,
            updated_at: now,
        };
        row.set_outcome(run.verdict, run.comment, run.invoker);
        rows.push(row.clone());
        Ok(row)
    }

    async fn save(&self, run: &Run) -> Result<Run, StoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let row = rows
            .iter_mut()
            .find(|r| r.id == run.id)
            .ok_or(StoreError::NotFound(run.id))?;
        row.verdict = run.verdict.clone();
        row.comment = run.comment.clone();
        row.invoker_id = run.invoker_id.clone();
        row.invoker_port = run.invoker_port;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn get(&self, id: i64) -> Result<Option<Run>, StoreError> {
        Ok(self.runs().into_iter().find(|r| r.id == id))
    }

    async fn for_event(&self, event_id: &str) -> Result<Vec<Run>, StoreError> {
        Ok(self
            .runs()
            .into_iter()
            .filter(|r| r.event_id == event_id)
            .collect())
    }
}
