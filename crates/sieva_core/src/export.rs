//! Asynchronous bulk CSV export.
//!
//! An export job snapshots nothing: it streams the same filtered, sorted
//! read path the service exposes, one page at a time, into a row sink.
//! Callers get back an opaque code immediately and poll it for the
//! result location; job status lives in the key-value store under a
//! TTL, so abandoned jobs age out on their own.

use crate::error::{CoreError, CoreResult};
use crate::query::{PageRequest, PageSpec};
use crate::runner::TaskRunner;
use crate::service::EntityService;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sieva_model::{
    Entity, FIELD_CREATE_TIME, FIELD_ID, FIELD_IS_DISABLED, FIELD_UPDATE_TIME,
};
use sieva_storage::{ExportSinkFactory, KeyValueStore, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Length of the generated job codes.
const CODE_LEN: usize = 12;

/// Attempts at claiming a fresh code before giving up.
const CODE_ATTEMPTS: usize = 8;

/// The lifecycle of one export job, as recorded in the key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportStatus {
    /// The job is queued or running.
    Pending,
    /// The job completed; the output is at `location`.
    Ready {
        /// Sink location string (a file path for file sinks).
        location: String,
    },
    /// The job failed and will not produce output.
    Failed {
        /// Failure description.
        message: String,
    },
}

/// The export pipeline for one entity type.
pub struct Exporter<E: Entity> {
    service: Arc<EntityService<E>>,
    kv: Arc<dyn KeyValueStore>,
    sinks: Arc<dyn ExportSinkFactory>,
    runner: Arc<dyn TaskRunner>,
    page_size: u64,
    ttl: Duration,
}

impl<E: Entity> Exporter<E> {
    /// Creates an exporter over the service's read path.
    ///
    /// Page size and status TTL come from the service configuration.
    #[must_use]
    pub fn new(
        service: Arc<EntityService<E>>,
        kv: Arc<dyn KeyValueStore>,
        sinks: Arc<dyn ExportSinkFactory>,
        runner: Arc<dyn TaskRunner>,
    ) -> Self {
        let page_size = service.config().export_page_size;
        let ttl = service.config().export_ttl;
        Self {
            service,
            kv,
            sinks,
            runner,
            page_size,
            ttl,
        }
    }

    /// Starts an export job and returns its opaque code.
    ///
    /// The filter and sort of `request` drive the job; its page
    /// parameters are ignored, since the job streams every page itself.
    ///
    /// # Errors
    ///
    /// Propagates key-value store failures from the code claim.
    pub fn start(&self, request: PageRequest<E>) -> CoreResult<String> {
        let code = self.claim_code()?;
        info!(collection = E::collection(), %code, "export job started");

        let service = Arc::clone(&self.service);
        let sinks = Arc::clone(&self.sinks);
        let kv = Arc::clone(&self.kv);
        let job_code = code.clone();
        let page_size = self.page_size;
        let ttl = self.ttl;

        self.runner.run_async(Box::new(move || {
            let status = match write_all(&service, sinks.as_ref(), &job_code, &request, page_size)
            {
                Ok(location) => ExportStatus::Ready { location },
                Err(err) => {
                    warn!(code = %job_code, %err, "export job failed");
                    ExportStatus::Failed {
                        message: err.to_string(),
                    }
                }
            };
            if let Err(err) = record_status(kv.as_ref(), &job_code, &status, ttl) {
                warn!(code = %job_code, %err, "failed to record export status");
            }
        }));

        Ok(code)
    }

    /// Polls a job, returning the output location once ready.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownExport`] for codes never issued or expired,
    /// [`CoreError::NotReady`] while the job is still running, and the
    /// recorded failure for jobs that did not complete.
    pub fn poll(&self, code: &str) -> CoreResult<String> {
        match self.status(code)? {
            ExportStatus::Ready { location } => Ok(location),
            ExportStatus::Pending => Err(CoreError::NotReady {
                code: code.to_string(),
            }),
            ExportStatus::Failed { message } => {
                Err(CoreError::Storage(StorageError::backend(message)))
            }
        }
    }

    /// Reads a job's raw status record.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownExport`] for codes never issued or expired.
    pub fn status(&self, code: &str) -> CoreResult<ExportStatus> {
        match self.kv.get(&status_key(code))? {
            Some(raw) => decode_status(&raw),
            None => Err(CoreError::UnknownExport {
                code: code.to_string(),
            }),
        }
    }

    /// Claims a fresh code by storing its Pending record, regenerating
    /// on the (unlikely) collision with a live job.
    fn claim_code(&self) -> CoreResult<String> {
        let pending = encode_status(&ExportStatus::Pending)?;
        for _ in 0..CODE_ATTEMPTS {
            let code: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(CODE_LEN)
                .map(char::from)
                .collect();
            if self
                .kv
                .set_if_absent(&status_key(&code), &pending, self.ttl)?
            {
                return Ok(code);
            }
        }
        Err(CoreError::Storage(StorageError::backend(
            "could not allocate a unique export code",
        )))
    }
}

impl<E: Entity> std::fmt::Debug for Exporter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("collection", &E::collection())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn status_key(code: &str) -> String {
    format!("export:{code}")
}

fn encode_status(status: &ExportStatus) -> CoreResult<String> {
    serde_json::to_string(status)
        .map_err(|e| CoreError::Storage(StorageError::backend(e.to_string())))
}

fn decode_status(raw: &str) -> CoreResult<ExportStatus> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::Storage(StorageError::backend(e.to_string())))
}

fn record_status(
    kv: &dyn KeyValueStore,
    code: &str,
    status: &ExportStatus,
    ttl: Duration,
) -> CoreResult<()> {
    kv.set(&status_key(code), &encode_status(status)?, ttl)?;
    Ok(())
}

/// Streams every matching page into a fresh sink and returns its
/// location. The header row lists base fields first, then declared
/// columns; each data cell is rendered with CSV quoting.
fn write_all<E: Entity>(
    service: &EntityService<E>,
    sinks: &dyn ExportSinkFactory,
    code: &str,
    request: &PageRequest<E>,
    page_size: u64,
) -> CoreResult<String> {
    let descriptor = service.registry().describe::<E>();
    let mut sink = sinks.create(code)?;

    let mut header: Vec<String> = [
        FIELD_ID,
        FIELD_CREATE_TIME,
        FIELD_UPDATE_TIME,
        FIELD_IS_DISABLED,
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    header.extend(descriptor.columns().map(|d| d.name.clone()));
    sink.write_row(&header)?;

    let page_size = i64::try_from(page_size).unwrap_or(i64::MAX);
    let mut number: i64 = 1;
    loop {
        let paged = request.clone().page(PageSpec::new(number, page_size));
        let page = service.search(&paged)?;
        for item in &page.items {
            let cells: Vec<String> = header
                .iter()
                .map(|name| item.field(name).to_csv_cell())
                .collect();
            sink.write_row(&cells)?;
        }
        if page.is_last() {
            break;
        }
        number += 1;
    }

    Ok(sink.finish()?)
}
