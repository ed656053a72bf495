use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::check::CheckResult;
use crate::error::eval_error::EvalError;
use crate::error::{Error, Result};
use crate::task::model::TaskRecord;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Soft bound on stored tasks; only terminal records are evicted.
    pub max_tasks: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_tasks: 1024 }
    }
}

/// Outcome of applying a run's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer run (or a re-dispatch) replaced the one that produced the results.
    Stale,
    Missing,
}

/// In-memory task store keyed by task id.
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
    next_generation: AtomicU64,
    config: RegistryConfig,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl TaskRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            config,
        }
    }

    /// Process-unique, strictly increasing run id.
    pub fn allocate_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Stores `record`, replacing any record with the same task id.
    pub async fn insert(&self, record: TaskRecord) -> Option<TaskRecord> {
        let task_id = record.task_id().to_string();
        let mut tasks = self.tasks.write().await;

        if !tasks.contains_key(&task_id) && tasks.len() >= self.config.max_tasks {
            let oldest = tasks
                .values()
                .filter(|r| r.evaluation.status.is_terminal())
                .min_by_key(|r| r.sent_at)
                .map(|r| r.task_id().to_string());
            match oldest {
                Some(evicted) => {
                    tasks.remove(&evicted);
                    info!("Evicted task {} to stay within {} tasks", evicted, self.config.max_tasks);
                }
                None => warn!(
                    "Task registry holds {} unfinished tasks, exceeding its bound",
                    tasks.len()
                ),
            }
        }

        tasks.insert(task_id, record)
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn contains(&self, task_id: &str) -> bool {
        self.tasks.read().await.contains_key(task_id)
    }

    pub async fn all(&self) -> BTreeMap<String, TaskRecord> {
        self.tasks
            .read()
            .await
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Atomic read-modify-write of one record. `f` runs under the write lock;
    /// if it returns an error, whatever it changed is still kept, so validate
    /// before mutating.
    pub async fn update<T, F>(&self, task_id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut TaskRecord) -> Result<T>,
    {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::EvalError(EvalError::TaskNotFound(task_id.to_string())))?;
        f(record)
    }

    /// Compare-and-set completion on the run's generation.
    pub async fn complete(
        &self,
        task_id: &str,
        generation: u64,
        results: Vec<CheckResult>,
    ) -> Completion {
        let mut tasks = self.tasks.write().await;
        let Some(record) = tasks.get_mut(task_id) else {
            return Completion::Missing;
        };
        if record.evaluation.complete(generation, results) {
            Completion::Applied
        } else {
            Completion::Stale
        }
    }
}
