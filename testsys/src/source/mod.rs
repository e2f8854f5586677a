//! Ingestion of submitted source: tokenizer, outline parser, located code
//! units and the notebook container.

pub mod lexer;
pub mod locator;
pub mod notebook;
pub mod syntax;
pub mod unit;

pub use locator::Locator;
pub use notebook::{CollectReport, ContainerError, NotebookContainer, SourceContainer};
pub use syntax::{parse_module, NodeKind, SyntaxNode};
pub use unit::CodeUnit;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line})")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}
