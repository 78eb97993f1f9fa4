//! Shared fakes for pipeline and service tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    ChainDirectory, DataType, JobState, MessageCountSnapshot, TeleporterMessage, TimeWindow,
};
use crate::error::PipelineError;
use crate::persistence::{ChainDirectoryStore, JobStateStore, SnapshotStore};
use crate::upstream::{MessageApi, MessagePage};

/// Builds a message with a fixed in-the-past timestamp.
pub(crate) fn message(source: &str, destination: &str) -> TeleporterMessage {
    TeleporterMessage {
        source_chain_id: source.to_string(),
        destination_chain_id: destination.to_string(),
        // No timestamp: always in-range by policy, which keeps window
        // arithmetic out of job-level tests.
        source_timestamp: None,
        destination_timestamp: None,
    }
}

/// Upstream fake that pops one scripted result per call, then serves empty
/// terminal pages. Records every call's window.
#[derive(Debug, Default)]
pub(crate) struct ScriptedApi {
    responses: Mutex<VecDeque<Result<MessagePage, PipelineError>>>,
    calls: Mutex<Vec<TimeWindow>>,
}

impl ScriptedApi {
    pub(crate) fn new(responses: Vec<Result<MessagePage, PipelineError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Convenience: one single-page response per chunk, each carrying the
    /// given messages.
    pub(crate) fn pages_of(messages: Vec<Vec<TeleporterMessage>>) -> Arc<Self> {
        Self::new(
            messages
                .into_iter()
                .map(|m| {
                    Ok(MessagePage {
                        messages: m,
                        next_page_token: None,
                    })
                })
                .collect(),
        )
    }

    pub(crate) fn call_windows(&self) -> Vec<TimeWindow> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageApi for ScriptedApi {
    async fn fetch_page(
        &self,
        window: TimeWindow,
        _page_token: Option<&str>,
    ) -> Result<MessagePage, PipelineError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(window);
        }
        let popped = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        popped.unwrap_or_else(|| Ok(MessagePage::default()))
    }
}

/// In-memory [`JobStateStore`].
#[derive(Debug, Default)]
pub(crate) struct MemoryJobStateStore {
    states: Mutex<HashMap<DataType, JobState>>,
}

impl MemoryJobStateStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn with_state(state: JobState) -> Arc<Self> {
        let store = Self::default();
        if let Ok(mut states) = store.states.lock() {
            states.insert(state.data_type, state);
        }
        Arc::new(store)
    }

    pub(crate) fn get(&self, data_type: DataType) -> Option<JobState> {
        self.states.lock().ok().and_then(|s| s.get(&data_type).cloned())
    }
}

#[async_trait]
impl JobStateStore for MemoryJobStateStore {
    async fn load(&self, data_type: DataType) -> Result<Option<JobState>, PipelineError> {
        Ok(self.get(data_type))
    }

    async fn upsert(&self, state: &JobState) -> Result<(), PipelineError> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| PipelineError::Persistence("lock poisoned".to_string()))?;
        states.insert(state.data_type, state.clone());
        Ok(())
    }
}

/// In-memory append-only [`SnapshotStore`].
#[derive(Debug, Default)]
pub(crate) struct MemorySnapshotStore {
    snapshots: Mutex<Vec<MessageCountSnapshot>>,
}

impl MemorySnapshotStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn all(&self) -> Vec<MessageCountSnapshot> {
        self.snapshots.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn append(&self, snapshot: &MessageCountSnapshot) -> Result<(), PipelineError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| PipelineError::Persistence("lock poisoned".to_string()))?;
        snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn latest(
        &self,
        data_type: DataType,
    ) -> Result<Option<MessageCountSnapshot>, PipelineError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|s| s.data_type == data_type)
            .max_by_key(|s| s.updated_at))
    }

    async fn history(
        &self,
        data_type: DataType,
        limit: u32,
    ) -> Result<Vec<MessageCountSnapshot>, PipelineError> {
        let mut matching: Vec<MessageCountSnapshot> = self
            .all()
            .into_iter()
            .filter(|s| s.data_type == data_type)
            .collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }
}

/// Fixed chain directory.
#[derive(Debug, Default)]
pub(crate) struct StaticChains {
    directory: ChainDirectory,
}

impl StaticChains {
    pub(crate) fn new(pairs: Vec<(&str, &str)>) -> Arc<Self> {
        Arc::new(Self {
            directory: ChainDirectory::from_pairs(
                pairs
                    .into_iter()
                    .map(|(id, name)| (id.to_string(), name.to_string())),
            ),
        })
    }
}

#[async_trait]
impl ChainDirectoryStore for StaticChains {
    async fn load_directory(&self) -> Result<ChainDirectory, PipelineError> {
        Ok(self.directory.clone())
    }
}
