//! Judging orchestration.
//!
//! A submission is split into located units by its container; each task of
//! the event then runs through the [`testing`] pipeline (validation, test
//! generation, then per test: reference run, request preparation, sandbox
//! dispatch and checking). Results stream to a [`ProgressSink`] after every
//! task and are recorded through a [`db::RunStore`].

pub mod orchestrator;
pub mod progress;
pub mod result;
pub mod runner;
pub mod submission;
pub mod testing;

pub use orchestrator::Orchestrator;
pub use progress::{ChannelSink, NullSink, Progress, ProgressSink};
pub use result::JudgeResult;
pub use runner::{derive_seed, Runner};
pub use submission::Submission;
