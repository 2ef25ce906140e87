#![forbid(unsafe_code)]

//! Bounded-parallel mirror run.
//!
//! Entries are handed out in discovery order; a permit from the semaphore is
//! acquired before each task is spawned, so at most `max_parallel` items are
//! being resolved or downloaded at any time. Each task runs the blocking
//! pipeline (resolve → name → skip-check → write) on the blocking pool and
//! reports an [`ItemStatus`]; failures stay inside their task.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::catalog::CatalogEntry;
use crate::error::TaskError;
use crate::naming::OutputIdentity;
use crate::persistence::{PersistenceWriter, WrittenArtifacts, artifacts_exist};
use crate::resolver::ItemResolver;

#[derive(Debug)]
pub enum ItemStatus {
    Downloaded {
        file_name: String,
        artifacts: WrittenArtifacts,
    },
    Skipped {
        file_name: String,
    },
    Failed(TaskError),
}

#[derive(Debug)]
pub struct ItemReport {
    pub entry: CatalogEntry,
    pub status: ItemStatus,
}

/// Outcome of a whole run, one report per entry in discovery order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|status| matches!(status, ItemStatus::Downloaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, ItemStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, ItemStatus::Failed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&CatalogEntry, &TaskError)> {
        self.items.iter().filter_map(|item| match &item.status {
            ItemStatus::Failed(err) => Some((&item.entry, err)),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&ItemStatus) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(&item.status)).count()
    }
}

/// The per-item work, shared read-only by every task.
struct ItemPipeline {
    resolver: ItemResolver,
    writer: PersistenceWriter,
    output_root: PathBuf,
    skip_existing: bool,
}

impl ItemPipeline {
    fn process(&self, entry: &CatalogEntry) -> ItemStatus {
        match self.try_process(entry) {
            Ok(status) => status,
            Err(err) => {
                warn!("Couldn't retrieve or store {entry}: {err}");
                ItemStatus::Failed(err)
            }
        }
    }

    fn try_process(&self, entry: &CatalogEntry) -> Result<ItemStatus, TaskError> {
        let item = self.resolver.resolve(entry)?;
        let identity = OutputIdentity::new(&self.output_root, &item.descriptor);

        if self.skip_existing {
            let exists = artifacts_exist(&identity).map_err(|source| TaskError::SkipCheck {
                path: identity.path.clone(),
                source,
            })?;
            if exists {
                info!("Skipping already existing movie '{}'", identity.file_name);
                return Ok(ItemStatus::Skipped {
                    file_name: identity.file_name,
                });
            }
        }

        info!("Downloading movie '{}'...", identity.file_name);
        let artifacts = self.writer.write(&item, &identity)?;
        info!("Finished movie '{}'", identity.file_name);
        Ok(ItemStatus::Downloaded {
            file_name: identity.file_name,
            artifacts,
        })
    }
}

pub struct DownloadOrchestrator {
    pipeline: Arc<ItemPipeline>,
    max_parallel: usize,
}

impl DownloadOrchestrator {
    pub fn new(
        resolver: ItemResolver,
        writer: PersistenceWriter,
        output_root: impl Into<PathBuf>,
        skip_existing: bool,
        max_parallel: usize,
    ) -> Self {
        Self {
            pipeline: Arc::new(ItemPipeline {
                resolver,
                writer,
                output_root: output_root.into(),
                skip_existing,
            }),
            max_parallel: max_parallel.max(1),
        }
    }

    pub async fn run(&self, entries: Vec<CatalogEntry>) -> BatchReport {
        let limit = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<ItemReport>> = Vec::with_capacity(entries.len());

        for (index, entry) in entries.iter().enumerate() {
            slots.push(None);
            // Blocks while `max_parallel` tasks are still running.
            let Ok(permit) = limit.clone().acquire_owned().await else {
                break;
            };
            let pipeline = Arc::clone(&self.pipeline);
            let entry = entry.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let worker_entry = entry.clone();
                let status =
                    match tokio::task::spawn_blocking(move || pipeline.process(&worker_entry))
                        .await
                    {
                        Ok(status) => status,
                        Err(err) => {
                            warn!("Worker for {entry} stopped unexpectedly: {err}");
                            ItemStatus::Failed(TaskError::Aborted(err.to_string()))
                        }
                    };
                (index, ItemReport { entry, status })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(err) => warn!("Download task ended without a report: {err}"),
            }
        }

        let items = entries
            .into_iter()
            .zip(slots.into_iter().chain(std::iter::repeat_with(|| None)))
            .map(|(entry, slot)| {
                slot.unwrap_or_else(|| ItemReport {
                    entry,
                    status: ItemStatus::Failed(TaskError::Aborted("task never reported".into())),
                })
            })
            .collect();
        BatchReport { items }
    }
}
