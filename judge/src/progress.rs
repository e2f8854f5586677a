//! Two-phase progress reporting: a snapshot after every judged item and one
//! final snapshot.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::result::JudgeResult;

pub type Results<K> = BTreeMap<K, JudgeResult>;

#[async_trait]
pub trait ProgressSink<K: Send + Sync>: Send + Sync {
    /// Everything judged so far, after each item.
    async fn step(&self, partial: &Results<K>);

    /// Called exactly once when judging ends.
    async fn done(&self, all: &Results<K>);
}

/// Ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl<K: Send + Sync> ProgressSink<K> for NullSink {
    async fn step(&self, _partial: &Results<K>) {}

    async fn done(&self, _all: &Results<K>) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress<K> {
    Step(Results<K>),
    Done(Results<K>),
}

/// Forwards progress into a channel drained by the delivery layer. A closed
/// receiver is not an error: judging carries on without an audience.
#[derive(Debug, Clone)]
pub struct ChannelSink<K> {
    tx: mpsc::UnboundedSender<Progress<K>>,
}

impl<K> ChannelSink<K> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Progress<K>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl<K: Clone + Send + Sync> ProgressSink<K> for ChannelSink<K> {
    async fn step(&self, partial: &Results<K>) {
        if self.tx.send(Progress::Step(partial.clone())).is_err() {
            debug!("progress receiver dropped");
        }
    }

    async fn done(&self, all: &Results<K>) {
        if self.tx.send(Progress::Done(all.clone())).is_err() {
            debug!("progress receiver dropped");
        }
    }
}
