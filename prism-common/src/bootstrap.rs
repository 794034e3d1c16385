//! Lazily initialized, migrated backend shared by all callers
//!
//! **Lifecycle:** uninitialized → initialized on first [`Bootstrap::backend`]
//! call → reused until [`Bootstrap::shutdown`].
//!
//! The slot mutex is held for the whole initialization: concurrent first
//! callers wait for the one doing the work and then receive the same
//! `Arc<Backend>`. A failed initialization leaves the slot empty, so the next
//! caller retries.

use crate::config::{DatabaseDriver, Params};
use crate::db;
use crate::Result;
use once_cell::sync::Lazy;
use sqlx::AnyPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Initialized backing store
#[derive(Debug)]
pub struct Backend {
    params: Arc<Params>,
    pool: AnyPool,
}

impl Backend {
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn driver(&self) -> DatabaseDriver {
        self.params.database_driver
    }
}

/// Injectable handle owning at most one [`Backend`]
#[derive(Debug)]
pub struct Bootstrap {
    params: Arc<Params>,
    slot: Mutex<Option<Arc<Backend>>>,
    initializations: AtomicUsize,
}

impl Bootstrap {
    pub fn new(params: Params) -> Self {
        Self {
            params: Arc::new(params),
            slot: Mutex::new(None),
            initializations: AtomicUsize::new(0),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get the backend, connecting and migrating on first use
    pub async fn backend(&self) -> Result<Arc<Backend>> {
        let mut slot = self.slot.lock().await;

        if let Some(backend) = slot.as_ref() {
            return Ok(Arc::clone(backend));
        }

        info!(driver = %self.params.database_driver, "Initializing sandbox backend");

        let pool = db::connect(&self.params).await?;
        let applied = db::run_migrations(&pool).await?;
        self.initializations.fetch_add(1, Ordering::SeqCst);

        debug!(migrations_applied = applied, "Sandbox backend ready");

        let backend = Arc::new(Backend {
            params: Arc::clone(&self.params),
            pool,
        });
        *slot = Some(Arc::clone(&backend));

        Ok(backend)
    }

    /// Whether a backend is currently held
    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Number of completed initializations over the lifetime of this handle
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    /// Close the pool and return to the uninitialized state
    ///
    /// Outstanding `Arc<Backend>` clones keep their (now closed) pool.
    pub async fn shutdown(&self) {
        let backend = self.slot.lock().await.take();

        if let Some(backend) = backend {
            backend.pool.close().await;
            info!("Sandbox backend shut down");
        }
    }
}

static SANDBOX: Lazy<Bootstrap> = Lazy::new(|| Bootstrap::new(Params::sandbox()));

/// Process-wide bootstrap over the compiled-default sandbox parameters
///
/// Intended for short-lived test processes; prefer passing a [`Bootstrap`]
/// explicitly everywhere else.
pub fn sandbox() -> &'static Bootstrap {
    &SANDBOX
}
