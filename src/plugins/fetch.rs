//! Single-slot fetch bookkeeping
//!
//! Every fetch gets a ticket carrying a generation number. Issuing a new
//! ticket makes all older ones stale, and stale results are dropped instead
//! of overwriting newer data.

use crate::{
    core::map::{lock_host, SharedHost},
    data::geojson::FeatureCollection,
    query::client::QueryClient,
    Result,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

/// Last known state of the plugin's remote fetches
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FetchStatus {
    #[default]
    Idle,
    Pending {
        generation: u64,
        query: String,
    },
    Loaded {
        generation: u64,
        features: usize,
    },
    Failed {
        generation: u64,
        message: String,
    },
}

impl FetchStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchStatus::Pending { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchStatus::Failed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// What happened to one fetch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { features: usize },
    /// A newer fetch was issued before this one finished
    Stale,
    Failed,
}

/// Identifies one fetch; only the most recently issued ticket is current
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }
}

/// Issues tickets and holds the shared status
#[derive(Debug, Clone, Default)]
pub struct FetchTracker {
    latest: Arc<AtomicU64>,
    status: Arc<Mutex<FetchStatus>>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new fetch, invalidating every older ticket
    pub fn issue(&self, query: &str) -> FetchTicket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_status(FetchStatus::Pending {
            generation,
            query: query.to_string(),
        });
        FetchTicket {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Invalidates every outstanding ticket without starting a fetch
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        if self.status().is_pending() {
            self.set_status(FetchStatus::Idle);
        }
    }

    pub fn status(&self) -> FetchStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    fn set_status(&self, status: FetchStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }
}

/// Pushes fetched features into the injected source
#[derive(Clone)]
pub struct ResultApplier {
    host: SharedHost,
    source_name: String,
    tracker: FetchTracker,
}

impl ResultApplier {
    pub fn new(host: SharedHost, source_name: impl Into<String>, tracker: FetchTracker) -> Self {
        Self {
            host,
            source_name: source_name.into(),
            tracker,
        }
    }

    /// Runs the query and applies its result
    pub async fn run(
        self,
        client: Arc<dyn QueryClient>,
        query: String,
        ticket: FetchTicket,
    ) -> FetchOutcome {
        log::info!("fetch #{} started", ticket.generation());
        let result = client.query(&query).await;
        self.apply(&ticket, result)
    }

    /// Replaces the source contents on success; failures leave them untouched
    pub fn apply(&self, ticket: &FetchTicket, result: Result<FeatureCollection>) -> FetchOutcome {
        if !ticket.is_current() {
            log::debug!("discarding stale fetch #{}", ticket.generation());
            return FetchOutcome::Stale;
        }

        let applied = result.and_then(|collection| {
            let mut host = lock_host(&self.host)?;
            host.set_source_data(&self.source_name, &collection)?;
            Ok(collection.len())
        });

        match applied {
            Ok(features) => {
                log::info!(
                    "fetch #{} applied {} features to '{}'",
                    ticket.generation(),
                    features,
                    self.source_name
                );
                self.tracker.set_status(FetchStatus::Loaded {
                    generation: ticket.generation(),
                    features,
                });
                FetchOutcome::Applied { features }
            }
            Err(e) => {
                log::warn!("fetch #{} failed: {}", ticket.generation(), e);
                self.tracker.set_status(FetchStatus::Failed {
                    generation: ticket.generation(),
                    message: e.to_string(),
                });
                FetchOutcome::Failed
            }
        }
    }
}
