use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::locator::Locator;
use super::syntax::{parse_module, NodeKind};
use super::unit::CodeUnit;
use super::SyntaxError;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("no 'cells' field found in .json-like content")]
    MissingCells,

    #[error("container is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read container: {0}")]
    Io(#[from] std::io::Error),
}

/// What [`SourceContainer::collect`] found.
#[derive(Debug, Default, Clone)]
pub struct CollectReport {
    /// Cell index to the reason it could not be parsed.
    pub malformed: BTreeMap<usize, SyntaxError>,
    /// Matches seen after a locator already had its unit.
    pub ignored_repeats: HashMap<Locator, usize>,
    pub located: HashMap<Locator, CodeUnit>,
}

impl CollectReport {
    pub fn get(&self, locator: &Locator) -> Option<&CodeUnit> {
        self.located.get(locator)
    }
}

/// A bundle of submitted source that can be searched for located units.
pub trait SourceContainer: Send + Sync {
    fn collect(&self, locators: &[Locator]) -> CollectReport;
}

/// Code cells of a Jupyter notebook.
#[derive(Debug, Clone)]
pub struct NotebookContainer {
    cells: Vec<String>,
}

impl NotebookContainer {
    pub fn from_json(content: &Value) -> Result<Self, ContainerError> {
        let cells = content
            .get("cells")
            .and_then(Value::as_array)
            .ok_or(ContainerError::MissingCells)?;

        let cells = cells
            .iter()
            .filter(|cell| cell.get("cell_type").and_then(Value::as_str) == Some("code"))
            .map(|cell| match cell.get("source") {
                Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
                Some(Value::String(text)) => text.clone(),
                _ => String::new(),
            })
            .collect();
        Ok(Self { cells })
    }

    pub fn parse(content: &str) -> Result<Self, ContainerError> {
        Self::from_json(&serde_json::from_str(content)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// A container holding `source` as its only cell.
    pub fn single(source: impl Into<String>) -> Self {
        Self {
            cells: vec![source.into()],
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

impl SourceContainer for NotebookContainer {
    fn collect(&self, locators: &[Locator]) -> CollectReport {
        let mut report = CollectReport::default();

        for (index, cell) in self.cells.iter().enumerate() {
            let module = match parse_module(cell) {
                Ok(module) => module,
                Err(err) => {
                    debug!(cell = index, error = %err, "skipping malformed cell");
                    report.malformed.insert(index, err);
                    continue;
                }
            };

            for node in module
                .walk()
                .filter(|n| matches!(n.kind, NodeKind::FunctionDef | NodeKind::ClassDef))
            {
                for locator in locators.iter().filter(|l| l.matches(node)) {
                    if report.located.contains_key(locator) {
                        *report.ignored_repeats.entry(locator.clone()).or_default() += 1;
                        continue;
                    }
                    match CodeUnit::extract(cell, node) {
                        Ok(unit) => {
                            report.located.insert(locator.clone(), unit);
                        }
                        Err(err) => {
                            report.malformed.insert(index, err);
                        }
                    }
                }
            }
        }

        report
    }
}
