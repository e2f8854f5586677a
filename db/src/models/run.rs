//! The outcome of judging one task of one submission.

use chrono::{DateTime, Utc};
use common::Verdict;
use common::verdict::UnknownVerdict;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ActiveValue::Unchanged, QueryOrder};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub event_id: String,
    pub task_id: String,

    /// Submitter identity as given by the delivery layer.
    pub author: String,

    /// The located unit as submitted, replayed on rejudge.
    #[sea_orm(column_type = "Text")]
    pub solution_source: String,

    /// Hex SHA-256 of the normalized token stream.
    pub solution_hash: String,

    /// Verdict tag (`OK`, `WA`, ...).
    pub verdict: String,

    #[sea_orm(column_type = "Text")]
    pub comment: String,

    /// Sandbox that executed the last test, if any test was dispatched.
    pub invoker_id: Option<String>,
    pub invoker_port: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Everything needed to record a fresh run.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRun {
    pub event_id: String,
    pub task_id: String,
    pub author: String,
    pub solution_source: String,
    pub solution_hash: String,
    pub verdict: Verdict,
    pub comment: String,
    pub invoker: Option<(String, u16)>,
}

impl Model {
    pub async fn create(db: &DbConn, run: NewRun) -> Result<Model, DbErr> {
        let now = Utc::now();
        let (invoker_id, invoker_port) = split_invoker(run.invoker);

        let active = ActiveModel {
            event_id: Set(run.event_id),
            task_id: Set(run.task_id),
            author: Set(run.author),
            solution_source: Set(run.solution_source),
            solution_hash: Set(run.solution_hash),
            verdict: Set(run.verdict.tag().to_string()),
            comment: Set(run.comment),
            invoker_id: Set(invoker_id),
            invoker_port: Set(invoker_port),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        active.insert(db).await
    }

    /// Writes the judging outcome of this row back in place. Source, hash
    /// and authorship are never touched.
    pub async fn save(&self, db: &DbConn) -> Result<Model, DbErr> {
        let active = ActiveModel {
            id: Unchanged(self.id),
            verdict: Set(self.verdict.clone()),
            comment: Set(self.comment.clone()),
            invoker_id: Set(self.invoker_id.clone()),
            invoker_port: Set(self.invoker_port),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        active.update(db).await
    }

    pub async fn find_by_id(db: &DbConn, id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(id).one(db).await
    }

    pub async fn find_all_for_event(db: &DbConn, event_id: &str) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Earlier runs of the same task with an identical normalized solution.
    pub async fn find_same_solution(
        db: &DbConn,
        task_id: &str,
        solution_hash: &str,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::TaskId.eq(task_id))
            .filter(Column::SolutionHash.eq(solution_hash))
            .order_by_asc(Column::CreatedAt)
            .all(db)
            .await
    }

    pub fn verdict(&self) -> Result<Verdict, UnknownVerdict> {
        self.verdict.parse()
    }

    /// Replaces the judging outcome; call [`save`](Model::save) to persist.
    pub fn set_outcome(&mut self, verdict: Verdict, comment: impl Into<String>, invoker: Option<(String, u16)>) {
        let (invoker_id, invoker_port) = split_invoker(invoker);
        self.verdict = verdict.tag().to_string();
        self.comment = comment.into();
        self.invoker_id = invoker_id;
        self.invoker_port = invoker_port;
    }

    pub fn invoker(&self) -> Option<(String, u16)> {
        match (&self.invoker_id, self.invoker_port) {
            (Some(id), Some(port)) => u16::try_from(port).ok().map(|port| (id.clone(), port)),
            _ => None,
        }
    }
}

fn split_invoker(invoker: Option<(String, u16)>) -> (Option<String>, Option<i32>) {
    match invoker {
        Some((id, port)) => (Some(id), Some(i32::from(port))),
        None => (None, None),
    }
}
