use async_trait::async_trait;

use crate::artefact::ArtefactKey;
use crate::error::PipelineError;
use crate::store::ArtefactStore;

/// What the pipeline driver should do after a step returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Skip every remaining step of the enclosing pipeline.
    Stop,
}

/// One unit of work in a [`Pipeline`](crate::Pipeline).
///
/// A step reads only what it lists in `needs` and writes only what it lists in
/// `produces`; both lists feed the composition check.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn needs(&self) -> Vec<ArtefactKey>;

    fn produces(&self) -> Vec<ArtefactKey>;

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError>;
}
