use thiserror::Error;

/// Misuse of the artefact store. These are configuration errors: a step
/// touched something the pipeline never declared, or used the wrong type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArtefactError {
    #[error("artefact {key} is missing: {details}")]
    MissingArtefact { key: String, details: String },

    #[error("artefact {0} is not expected to appear in this artefactory")]
    UnsupportedArtefact(String),

    #[error("artefact {key} of type {expected} is assigned a value of type {actual}")]
    WrongArtefactType {
        key: String,
        expected: String,
        actual: String,
    },
}

impl ArtefactError {
    pub(crate) fn missing(key: impl ToString, details: impl Into<String>) -> Self {
        ArtefactError::MissingArtefact {
            key: key.to_string(),
            details: details.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Artefact(#[from] ArtefactError),

    #[error("artefact {needs} is needed by step '{step}' but not produced by any predecessor")]
    Chaining { step: String, needs: String },

    #[error("pipeline interrupted at step '{0}'")]
    Interrupted(String),

    #[error("step '{step}' failed: {message}")]
    Step { step: String, message: String },
}
