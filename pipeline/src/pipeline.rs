use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::artefact::{ArtefactCollection, ArtefactKey};
use crate::error::PipelineError;
use crate::indexed::IndexedView;
use crate::step::{Flow, Step};
use crate::store::{ArtefactStore, Artefactory};

/// How a pipeline run ended when no error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Interrupted { step: String },
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }
}

/// `need` is met by `available` if the same value is stored there; an item is
/// met by its collection and vice versa.
fn satisfied(available: &[ArtefactKey], need: &ArtefactKey) -> bool {
    let need = need.storage_key();
    available.iter().any(|key| key.storage_key() == need)
}

fn push_unique(keys: &mut Vec<ArtefactKey>, key: ArtefactKey) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

/// Ordered steps over a shared store.
///
/// Composition through [`then`](Pipeline::then) and [`chain`](Pipeline::chain)
/// rejects a step whose needs are neither entry artefacts nor produced by an
/// earlier step, so a mis-wired pipeline fails when it is built rather than
/// halfway through a run.
#[derive(Clone, Default)]
pub struct Pipeline {
    entries: Vec<ArtefactKey>,
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    /// Starts an empty pipeline whose inputs are `entries`.
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ArtefactKey>,
    {
        Self {
            entries: entries.into_iter().collect(),
            steps: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ArtefactKey] {
        &self.entries
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Everything a new step may rely on: entries plus all produces so far.
    fn available(&self) -> Vec<ArtefactKey> {
        let mut available = self.entries.clone();
        for step in &self.steps {
            for key in step.produces() {
                push_unique(&mut available, key);
            }
        }
        available
    }

    /// `(needs, produces)`: what the pipeline consumes from outside and what
    /// it writes.
    pub fn signature(&self) -> (Vec<ArtefactKey>, Vec<ArtefactKey>) {
        let mut needs = self.entries.clone();
        let mut produces = Vec::new();
        for step in &self.steps {
            for need in step.needs() {
                if !satisfied(&produces, &need) && !satisfied(&needs, &need) {
                    needs.push(need);
                }
            }
            for key in step.produces() {
                push_unique(&mut produces, key);
            }
        }
        (needs, produces)
    }

    pub fn then<S: Step + 'static>(self, step: S) -> Result<Self, PipelineError> {
        self.then_shared(Arc::new(step))
    }

    pub fn then_shared(mut self, step: Arc<dyn Step>) -> Result<Self, PipelineError> {
        let available = self.available();
        for need in step.needs() {
            if !satisfied(&available, &need) {
                return Err(PipelineError::Chaining {
                    step: step.name().to_string(),
                    needs: need.to_string(),
                });
            }
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Appends every step of `other`, whose unresolved needs must be covered
    /// by this pipeline.
    pub fn chain(mut self, other: Pipeline) -> Result<Self, PipelineError> {
        let available = self.available();
        let (needs, _) = other.signature();
        for need in needs {
            if !satisfied(&available, &need) {
                let step = other
                    .steps
                    .iter()
                    .find(|s| s.needs().iter().any(|n| n.storage_key() == need.storage_key()))
                    .map(|s| s.name().to_string())
                    .unwrap_or_else(|| "<entry>".to_string());
                return Err(PipelineError::Chaining {
                    step,
                    needs: need.to_string(),
                });
            }
        }
        self.steps.extend(other.steps);
        Ok(self)
    }

    /// A store declaring every artefact this pipeline touches.
    pub fn artefactory(&self) -> Artefactory {
        let (needs, produces) = self.signature();
        let mut store = Artefactory::new(needs.into_iter().chain(produces));
        for step in &self.steps {
            for key in step.needs() {
                store.declare(key);
            }
        }
        store
    }

    /// Runs the steps in order. A step returning [`Flow::Stop`] ends the run
    /// early with [`Completion::Interrupted`]; the store keeps whatever was
    /// written up to that point.
    pub async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Completion, PipelineError> {
        for step in &self.steps {
            debug!(step = step.name(), "processing step");
            if step.process(&mut *store).await? == Flow::Stop {
                debug!(step = step.name(), "pipeline interrupted");
                return Ok(Completion::Interrupted {
                    step: step.name().to_string(),
                });
            }
        }
        Ok(Completion::Finished)
    }

    /// Like [`process`](Pipeline::process) but surfaces an interruption as
    /// [`PipelineError::Interrupted`].
    pub async fn process_strict(&self, store: &mut dyn ArtefactStore) -> Result<(), PipelineError> {
        match self.process(store).await? {
            Completion::Finished => Ok(()),
            Completion::Interrupted { step } => Err(PipelineError::Interrupted(step)),
        }
    }

    /// Runs over an owned store and hands it back with the outcome.
    pub async fn execute(
        &self,
        mut store: Artefactory,
    ) -> Result<(Artefactory, Completion), PipelineError> {
        let completion = self.process(&mut store).await?;
        Ok((store, completion))
    }

    /// Wraps the pipeline as a single step for nesting in another pipeline.
    pub fn as_step(self, name: impl Into<String>) -> PipelineStep {
        let (needs, produces) = self.signature();
        PipelineStep {
            name: name.into(),
            needs,
            produces,
            pipeline: self,
        }
    }
}

/// A nested pipeline. An interruption inside stops the outer pipeline too.
pub struct PipelineStep {
    name: String,
    needs: Vec<ArtefactKey>,
    produces: Vec<ArtefactKey>,
    pipeline: Pipeline,
}

#[async_trait]
impl Step for PipelineStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        self.needs.clone()
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        self.produces.clone()
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        Ok(match self.pipeline.process(store).await? {
            Completion::Finished => Flow::Continue,
            Completion::Interrupted { .. } => Flow::Stop,
        })
    }
}

/// Runs `body` once per element of a collection, through an [`IndexedView`]
/// pinned to that element's index. Iteration stops at the first interrupted
/// element and the interruption propagates.
pub struct ForEach {
    name: String,
    over: ArtefactKey,
    body: Pipeline,
}

impl ForEach {
    pub fn new<T>(name: impl Into<String>, over: &ArtefactCollection<T>, body: Pipeline) -> Self {
        Self {
            name: name.into(),
            over: over.key().clone(),
            body,
        }
    }
}

#[async_trait]
impl Step for ForEach {
    fn name(&self) -> &str {
        &self.name
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        let mut needs = vec![self.over.clone()];
        for key in self.body.signature().0 {
            push_unique(&mut needs, key);
        }
        needs
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        let mut produces = Vec::new();
        for key in self.body.signature().1 {
            push_unique(&mut produces, key.storage_key());
            push_unique(&mut produces, key);
        }
        produces
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let len = store.collection_len(&self.over)?;
        let group = self.over.group().map(str::to_string);
        for index in 0..len {
            let mut view = IndexedView::new(&mut *store, group.clone(), index);
            if !self.body.process(&mut view).await?.is_finished() {
                debug!(step = %self.name, index, "stopping fan-out");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }
}
