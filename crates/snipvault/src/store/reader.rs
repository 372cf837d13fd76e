use super::backend::StorageBackend;
use super::retry::RetryPolicy;
use crate::error::Result;
use crate::model::Record;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type ReadOutcome<T> = Result<Arc<Vec<T>>>;
type SharedRead<T> = Shared<BoxFuture<'static, ReadOutcome<T>>>;

/// Reads one collection file, sharing a single in-flight read between all
/// callers that arrive while it is pending.
pub struct CoalescingReader<T: Record, B: StorageBackend> {
    backend: Arc<B>,
    path: PathBuf,
    retry: RetryPolicy,
    in_flight: Mutex<Option<SharedRead<T>>>,
    reads_started: AtomicU64,
}

impl<T: Record, B: StorageBackend> CoalescingReader<T, B> {
    pub fn new(backend: Arc<B>, path: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            backend,
            path,
            retry,
            in_flight: Mutex::new(None),
            reads_started: AtomicU64::new(0),
        }
    }

    /// Number of underlying reads started (coalesced callers count once).
    pub fn reads_started(&self) -> u64 {
        self.reads_started.load(Ordering::Relaxed)
    }

    pub async fn read(&self) -> ReadOutcome<T> {
        let shared = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!(path = %self.path.display(), "joining in-flight read");
                    pending.clone()
                }
                None => {
                    let pending = self.start().boxed().shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let outcome = shared.clone().await;

        let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&shared)) {
            *slot = None;
        }
        outcome
    }

    /// Detaches the pending read, if any. Callers already waiting on it still
    /// get its result; new callers start a fresh read.
    pub fn invalidate(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    fn start(&self) -> impl std::future::Future<Output = ReadOutcome<T>> + Send + 'static {
        self.reads_started.fetch_add(1, Ordering::Relaxed);
        let backend = self.backend.clone();
        let path = self.path.clone();
        let retry = self.retry;

        async move {
            let backend = &backend;
            let file = path.as_path();
            retry
                .run("read", file, move || async move {
                    let records = match backend.read(file).await? {
                        None => Vec::new(),
                        Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
                        Some(bytes) => serde_json::from_slice::<Vec<T>>(&bytes)?,
                    };
                    tracing::debug!(
                        path = %file.display(),
                        count = records.len(),
                        kind = T::KIND,
                        "loaded collection"
                    );
                    Ok(Arc::new(records))
                })
                .await
        }
    }
}
