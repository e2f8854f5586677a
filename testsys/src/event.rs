//! Events group tasks under a submission window.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::source::Locator;
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub tasks: Vec<Arc<Task>>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start,
            deadline,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(Arc::new(task));
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }

    pub fn task(&self, id: &str) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn locators(&self) -> Vec<Locator> {
        self.tasks.iter().map(|task| task.locator.clone()).collect()
    }

    /// Task statements joined in order; tasks without one are skipped.
    pub fn render_statement(&self) -> String {
        self.tasks
            .iter()
            .filter_map(|task| task.statement.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Looks up the current definition of a task, e.g. for rejudging.
pub trait TaskResolver: Send + Sync {
    fn resolve(&self, event_id: &str, task_id: &str) -> Option<Arc<Task>>;
}

/// Read-only registry of events, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    events: HashMap<String, Arc<Event>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: Event) -> Arc<Event> {
        let event = Arc::new(event);
        self.events.insert(event.id.clone(), Arc::clone(&event));
        event
    }

    pub fn event(&self, id: &str) -> Option<&Arc<Event>> {
        self.events.get(id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Arc<Event>> {
        self.events.values()
    }
}

impl TaskResolver for Catalog {
    fn resolve(&self, event_id: &str, task_id: &str) -> Option<Arc<Task>> {
        self.events.get(event_id)?.task(task_id).cloned()
    }
}
