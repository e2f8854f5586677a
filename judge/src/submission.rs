use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use testsys::SourceContainer;

/// One inbound submission to an event. Immutable once created.
#[derive(Clone)]
pub struct Submission {
    pub event_id: String,
    /// Submitter identity; also the `student_id` handed to checkers that ask
    /// for extended info.
    pub author: String,
    pub container: Arc<dyn SourceContainer>,
    pub arrived_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(
        event_id: impl Into<String>,
        author: impl Into<String>,
        container: impl SourceContainer + 'static,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            author: author.into(),
            container: Arc::new(container),
            arrived_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("event_id", &self.event_id)
            .field("author", &self.author)
            .field("arrived_at", &self.arrived_at)
            .finish_non_exhaustive()
    }
}
