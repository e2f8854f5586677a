//! Typed artefact store and step pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s whose declared needs are
//! checked against the produces of their predecessors when the pipeline is
//! composed. Steps exchange data exclusively through an [`ArtefactStore`]:
//! the root [`Artefactory`] or an [`IndexedView`] over one collection index.

pub mod artefact;
pub mod error;
pub mod indexed;
pub mod pipeline;
pub mod step;
pub mod store;

pub use artefact::{Artefact, ArtefactCollection, ArtefactKey, Shape, ITEM_SUFFIX};
pub use error::{ArtefactError, PipelineError};
pub use indexed::IndexedView;
pub use pipeline::{Completion, ForEach, Pipeline, PipelineStep};
pub use step::{Flow, Step};
pub use store::{AnyValue, ArtefactStore, Artefactory, StoreExt};
