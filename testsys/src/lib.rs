//! Test system building blocks: source ingestion and location, static
//! validation, seeded test generation, answer checking and the task/event
//! catalog the judge consumes.

pub mod check;
pub mod event;
pub mod generate;
pub mod source;
pub mod task;
pub mod validate;

pub use check::{CheckResult, Checker, ExtendedInfo};
pub use event::{Catalog, Event, TaskResolver};
pub use generate::{ArgList, Arguments, Gen, TestCase};
pub use source::{CodeUnit, Locator, NotebookContainer, SourceContainer};
pub use task::{Executor, Invocation, Solution, Task};
pub use validate::Validator;
