//! Backend selection and wiring.
//!
//! # Design
//! The app's object graph is built by plain factory functions: `open_source`
//! picks a `TodoDataSource` for the configured backend and `spawn_store`
//! hands it to a `TodoService` and a `TodoStore`. Debug builds default to the
//! in-memory stub and release builds to the remote API; environment variables
//! override either.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::bucket::DateBucket;
use crate::clock::{Clock, SystemClock};
use crate::error::TodoError;
use crate::service::TodoService;
use crate::snapshot::ConflictPolicy;
use crate::source::{LocalDataSource, RemoteDataSource, StubDataSource, TodoDataSource};
use crate::store::{StoreOptions, TodoStore};

pub const DEFAULT_API_URL: &str = "https://mocking.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Bundled sample list kept in memory.
    Stub,
    Remote { base_url: String },
    Local { path: PathBuf },
    /// SQLite database that lives only as long as the process.
    LocalInMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: Backend,
    /// Artificial delay applied to every stub call.
    pub stub_latency: Duration,
    pub conflict_policy: ConflictPolicy,
    pub initial_filter: DateBucket,
}

impl AppConfig {
    /// Defaults for the current build profile.
    pub fn for_build() -> Self {
        let backend = if cfg!(debug_assertions) {
            Backend::Stub
        } else {
            Backend::Remote {
                base_url: DEFAULT_API_URL.to_string(),
            }
        };
        Self::with_backend(backend)
    }

    pub fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            stub_latency: Duration::ZERO,
            conflict_policy: ConflictPolicy::default(),
            initial_filter: DateBucket::default(),
        }
    }

    /// `for_build()` with `TODO_*` environment overrides applied.
    pub fn from_env() -> Result<Self, TodoError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, TodoError> {
        let mut config = Self::for_build();

        if let Some(kind) = lookup("TODO_BACKEND") {
            config.backend = match kind.trim().to_ascii_lowercase().as_str() {
                "stub" => Backend::Stub,
                "remote" => Backend::Remote {
                    base_url: lookup("TODO_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                },
                "local" => Backend::Local {
                    path: lookup("TODO_DB_PATH")
                        .map(PathBuf::from)
                        .ok_or_else(|| TodoError::Config("TODO_DB_PATH is required for the local backend".to_string()))?,
                },
                "memory" => Backend::LocalInMemory,
                other => {
                    return Err(TodoError::Config(format!("unknown TODO_BACKEND `{other}`")));
                }
            };
        } else if let (Backend::Remote { base_url }, Some(url)) =
            (&mut config.backend, lookup("TODO_API_URL"))
        {
            *base_url = url;
        }

        if let Some(ms) = lookup("TODO_STUB_LATENCY_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|e| TodoError::Config(format!("TODO_STUB_LATENCY_MS `{ms}`: {e}")))?;
            config.stub_latency = Duration::from_millis(ms);
        }

        if let Some(policy) = lookup("TODO_CONFLICT_POLICY") {
            config.conflict_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "accept_latest" => ConflictPolicy::AcceptLatest,
                "reject" => ConflictPolicy::Reject,
                other => {
                    return Err(TodoError::Config(format!(
                        "unknown TODO_CONFLICT_POLICY `{other}`"
                    )));
                }
            };
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_build()
    }
}

/// Builds the data source selected by `config.backend`.
pub fn open_source(config: &AppConfig) -> Result<Arc<dyn TodoDataSource>, TodoError> {
    let source: Arc<dyn TodoDataSource> = match &config.backend {
        Backend::Stub => Arc::new(StubDataSource::with_sample_data()?.with_latency(config.stub_latency)),
        Backend::Remote { base_url } => Arc::new(RemoteDataSource::new(base_url)?),
        Backend::Local { path } => Arc::new(LocalDataSource::open(path)?),
        Backend::LocalInMemory => Arc::new(LocalDataSource::in_memory()?),
    };
    info!(
        "event=source_open module=config status=ok backend={:?}",
        config.backend
    );
    Ok(source)
}

/// Wires the configured source into a running store using the system clock.
/// Must be called from within a Tokio runtime.
pub fn spawn_store(config: &AppConfig) -> Result<TodoStore, TodoError> {
    spawn_store_with_clock(config, Arc::new(SystemClock))
}

pub fn spawn_store_with_clock(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<TodoStore, TodoError> {
    let service = TodoService::new(open_source(config)?);
    let options = StoreOptions {
        filter: config.initial_filter,
        conflict_policy: config.conflict_policy,
    };
    Ok(TodoStore::spawn_with(service, clock, options))
}
