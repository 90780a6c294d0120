use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tracing::debug;

use crate::{
    config::DEFAULT_SEARCH_LIMIT,
    model::Location,
    observable::Observable,
    resolver::{self, LocationResolver, QueryKind},
};

/// Search box state: the latest result list and whether a search is running.
#[derive(Debug)]
pub struct LocationSearch {
    resolver: LocationResolver,
    limit: u32,
    results: Observable<Vec<Location>>,
    is_loading: Observable<bool>,
    /// Id of the most recent search; only its results are published.
    latest: AtomicU64,
    running: AtomicUsize,
}

impl LocationSearch {
    pub fn new(resolver: LocationResolver) -> Self {
        Self::with_limit(resolver, DEFAULT_SEARCH_LIMIT)
    }

    pub fn with_limit(resolver: LocationResolver, limit: u32) -> Self {
        Self {
            resolver,
            limit,
            results: Observable::new(Vec::new()),
            is_loading: Observable::new(false),
            latest: AtomicU64::new(0),
            running: AtomicUsize::new(0),
        }
    }

    pub fn results(&self) -> &Observable<Vec<Location>> {
        &self.results
    }

    pub fn is_loading(&self) -> &Observable<bool> {
        &self.is_loading
    }

    /// Routes the query to a zip or place-name lookup and publishes the
    /// outcome. Queries under two characters leave the state untouched.
    ///
    /// When searches overlap, the one started last wins: an older search that
    /// finishes afterwards is dropped, and loading stays up until all of them
    /// are done.
    pub async fn search(&self, text: &str) {
        let query = text.trim();
        if !resolver::is_searchable(query) {
            debug!(query, "query too short, skipping search");
            return;
        }

        let kind = resolver::classify(query);
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = Running::begin(self);

        let found: Vec<Location> = match kind {
            QueryKind::ZipLike => self.resolver.search_by_zip(query).await.into_iter().collect(),
            QueryKind::NameLike => self.resolver.search_by_name(query, self.limit).await,
        };

        if self.latest.load(Ordering::SeqCst) == id {
            debug!(query, ?kind, count = found.len(), "search finished");
            self.results.set(found);
        } else {
            debug!(query, "newer search started, dropping results");
        }
    }
}

/// Keeps the loading flag up while any search is running.
struct Running<'a>(&'a LocationSearch);

impl<'a> Running<'a> {
    fn begin(search: &'a LocationSearch) -> Self {
        if search.running.fetch_add(1, Ordering::SeqCst) == 0 {
            search.is_loading.set(true);
        }
        Self(search)
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.is_loading.set(false);
        }
    }
}
