//! The lazy image load controller.
//!
//! Elements matched by the configured selectors are registered once and
//! watched by a single [`ViewportSession`]. When an element becomes visible
//! it is unobserved first and then loaded: the `data-src` URL is probed out
//! of band, and only a successful probe is copied into the element's `src`.
//! A failed probe swaps in the catalog fallback for the element's
//! `data-type`, or marks the element with `image-load-error` when the
//! catalog has nothing for that type. Every element settles at most once.
//!
//! Loads run as detached tokio tasks, so [`ImageLoadController::observe`]
//! and [`ImageLoadController::handle_intersections`] must be called from
//! within a runtime. A load keeps running when nobody waits for it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use inkwell_config::{LazyImageConfig, ObservationMode};
use inkwell_model::{
    ContentType, ElementId, FallbackCatalog, FallbackLookup, Rect, RootMargin,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::dom::{Document, SelectorList};
use crate::error::LoaderError;
use crate::probe::{ImageProbe, ProbeError};
use crate::visibility::{IntersectionEntry, ViewportSession};

/// Attribute holding the real image location.
pub const SOURCE_ATTRIBUTE: &str = "data-src";
/// Attribute holding the fallback key.
pub const TYPE_ATTRIBUTE: &str = "data-type";
/// Class added to settled images and their containers.
pub const LOADED_CLASS: &str = "loaded";
/// Class added when neither the image nor a fallback could be shown.
pub const LOAD_ERROR_CLASS: &str = "image-load-error";

/// Callback run after an element received a usable source.
pub type OnLoad = Arc<dyn Fn(&dyn Document, ElementId) + Send + Sync>;

/// Resolved controller settings.
#[derive(Clone)]
pub struct LoaderOptions {
    pub margin: RootMargin,
    pub threshold: f32,
    pub selectors: SelectorList,
    /// Ancestors marked `loaded` by the default callback.
    pub containers: SelectorList,
    pub catalog: FallbackCatalog,
    pub mode: ObservationMode,
    pub probe_timeout: Option<Duration>,
    /// Replaces the default class marking when set.
    pub on_load: Option<OnLoad>,
}

impl fmt::Debug for LoaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderOptions")
            .field("margin", &self.margin)
            .field("threshold", &self.threshold)
            .field("selectors", &self.selectors.as_str())
            .field("containers", &self.containers.as_str())
            .field("catalog_entries", &self.catalog.len())
            .field("mode", &self.mode)
            .field("probe_timeout", &self.probe_timeout)
            .field("custom_on_load", &self.on_load.is_some())
            .finish()
    }
}

impl LoaderOptions {
    pub fn from_config(config: &LazyImageConfig) -> Result<Self, LoaderError> {
        config.validate()?;
        Ok(Self {
            margin: config.root_margin()?,
            threshold: config.threshold,
            selectors: SelectorList::parse_all(&config.selectors)?,
            containers: SelectorList::parse_all(&config.container_selectors)?,
            catalog: config.catalog()?,
            mode: config.mode,
            probe_timeout: config.probe_timeout(),
            on_load: None,
        })
    }

    pub fn with_on_load<F>(mut self, on_load: F) -> Self
    where
        F: Fn(&dyn Document, ElementId) + Send + Sync + 'static,
    {
        self.on_load = Some(Arc::new(on_load));
        self
    }

    pub fn with_catalog(mut self, catalog: FallbackCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

/// Terminal result of loading one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Loaded {
        source: String,
    },
    Fallback {
        source: String,
        reason: ProbeError,
    },
    Failed {
        content_type: ContentType,
        reason: ProbeError,
    },
}

impl Settlement {
    /// Whether the element ended up showing an image.
    pub fn shows_image(&self) -> bool {
        !matches!(self, Settlement::Failed { .. })
    }
}

/// Where an element stands from the controller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementState {
    Unobserved,
    /// Registered and waiting to become visible.
    Observed,
    /// A probe is in flight.
    Loading,
    /// Registered but given up on because it had no `data-src`.
    Abandoned,
    Settled(Settlement),
}

/// Result of one load task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    MissingSource,
    Settled(Settlement),
}

#[derive(Debug, Clone)]
enum Registration {
    Observed,
    Loading,
    Abandoned,
    Settled(Settlement),
}

struct Inner {
    document: Arc<dyn Document>,
    probe: Arc<dyn ImageProbe>,
    session: ViewportSession,
    options: LoaderOptions,
    registry: DashMap<ElementId, Registration>,
    /// Handles of loads not yet collected by `drain`. Finished ones are
    /// reaped at the start of every observe or visibility batch.
    tasks: Mutex<VecDeque<JoinHandle<(ElementId, LoadOutcome)>>>,
    /// Signalled whenever a registration leaves the `Loading` state.
    settled: Notify,
    connected: AtomicBool,
}

/// Owns one observation session and the registry of managed elements.
#[derive(Clone)]
pub struct ImageLoadController {
    inner: Arc<Inner>,
}

impl fmt::Debug for ImageLoadController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoadController")
            .field("options", &self.inner.options)
            .field("registered", &self.inner.registry.len())
            .field("observing", &self.inner.session.observed_count())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl ImageLoadController {
    pub fn new(
        options: LoaderOptions,
        document: Arc<dyn Document>,
        probe: Arc<dyn ImageProbe>,
    ) -> Self {
        let session = ViewportSession::new(options.margin, options.threshold);
        Self {
            inner: Arc::new(Inner {
                document,
                probe,
                session,
                options,
                registry: DashMap::new(),
                tasks: Mutex::new(VecDeque::new()),
                settled: Notify::new(),
                connected: AtomicBool::new(true),
            }),
        }
    }

    /// Whether both handles refer to the same controller.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.inner.options
    }

    pub fn session(&self) -> &ViewportSession {
        &self.inner.session
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Register every matching element that is not registered yet.
    ///
    /// Safe to call after every render: registered elements are skipped and
    /// entries for elements that left the document are dropped.
    pub fn observe(&self) {
        if !self.is_connected() {
            log::warn!("observe() called on a disconnected image loader");
            return;
        }
        self.reap_finished();
        self.prune_detached();

        let inner = &self.inner;
        let mut registered = 0usize;
        for id in inner.document.query_all(&inner.options.selectors) {
            if inner.registry.contains_key(&id) {
                continue;
            }
            inner.registry.insert(id, Registration::Observed);
            inner.document.remove_attribute(id, "loading");
            registered += 1;

            match inner.options.mode {
                ObservationMode::Lazy => {
                    inner.session.observe(id);
                }
                ObservationMode::Eager => self.begin_load(id),
            }
        }

        if registered > 0 {
            log::debug!(
                "Registered {} image(s), {} awaiting visibility",
                registered,
                inner.session.observed_count()
            );
        }
    }

    fn prune_detached(&self) {
        let inner = &self.inner;
        let detached: Vec<ElementId> = inner
            .registry
            .iter()
            .filter(|entry| !inner.document.contains(*entry.key()))
            .map(|entry| *entry.key())
            .collect();
        for id in detached {
            inner.session.unobserve(id);
            inner.registry.remove(&id);
        }
        inner.settled.notify_waiters();
    }

    fn reap_finished(&self) {
        self.inner
            .tasks
            .lock()
            .retain(|handle| !handle.is_finished());
    }

    /// Loads whose handles are still tracked, finished or not.
    pub fn tracked_loads(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Visibility callback: start loads for entries that crossed the
    /// threshold. Each element is unobserved before its load starts, so a
    /// repeated report for the same element is ignored.
    pub fn handle_intersections(&self, entries: &[IntersectionEntry]) {
        self.reap_finished();
        for entry in entries {
            if !self.inner.session.is_visible(entry) {
                continue;
            }
            if self.inner.session.unobserve(entry.target) {
                self.begin_load(entry.target);
            }
        }
    }

    /// Measure observed elements against `viewport` and dispatch the
    /// resulting entries.
    pub fn scroll_to(&self, viewport: Rect) {
        if !self.is_connected() {
            return;
        }
        let entries = self
            .inner
            .session
            .entries(self.inner.document.as_ref(), viewport);
        self.handle_intersections(&entries);
    }

    fn begin_load(&self, id: ElementId) {
        self.inner.registry.insert(id, Registration::Loading);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let outcome = inner.load(id).await;
            (id, outcome)
        });
        self.inner.tasks.lock().push_back(handle);
    }

    /// Wait until no load is in flight and return the outcomes of the
    /// tracked loads collected on the way.
    ///
    /// Cancelling the returned future never cancels a load: a handle
    /// dropped mid-wait only detaches its task, which still settles.
    pub async fn drain(&self) -> Vec<(ElementId, LoadOutcome)> {
        let mut outcomes = Vec::new();
        loop {
            let next = self.inner.tasks.lock().pop_front();
            let Some(handle) = next else {
                break;
            };
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => log::error!("Image load task failed: {err}"),
            }
        }

        // Loads whose handles an earlier, cancelled drain let go of.
        loop {
            let notified = self.inner.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending_loads() == 0 {
                break;
            }
            notified.await;
        }
        outcomes
    }

    pub fn state(&self, id: ElementId) -> ElementState {
        match self.inner.registry.get(&id).as_deref() {
            None => ElementState::Unobserved,
            Some(Registration::Observed) => ElementState::Observed,
            Some(Registration::Loading) => ElementState::Loading,
            Some(Registration::Abandoned) => ElementState::Abandoned,
            Some(Registration::Settled(settlement)) => {
                ElementState::Settled(settlement.clone())
            }
        }
    }

    pub fn pending_loads(&self) -> usize {
        self.inner
            .registry
            .iter()
            .filter(|entry| matches!(entry.value(), Registration::Loading))
            .count()
    }

    /// Forget an element so the next [`observe`](Self::observe) registers
    /// it again. Refused while its load is in flight.
    pub fn reset_element(&self, id: ElementId) -> bool {
        if matches!(
            self.inner.registry.get(&id).as_deref(),
            Some(Registration::Loading)
        ) {
            return false;
        }
        self.inner.session.unobserve(id);
        self.inner.registry.remove(&id).is_some()
    }

    /// Stop the session and clear the registry. Loads already in flight
    /// still finish and write to their elements.
    pub fn disconnect(&self) {
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner.session.disconnect();
            self.inner.registry.clear();
            self.inner.settled.notify_waiters();
            self.reap_finished();
            log::debug!("Image loader disconnected");
        }
    }
}

impl Inner {
    async fn load(&self, id: ElementId) -> LoadOutcome {
        let source = self
            .document
            .attribute(id, SOURCE_ATTRIBUTE)
            .filter(|src| !src.trim().is_empty());
        let Some(source) = source else {
            log::warn!(
                "No data-src attribute found: {}",
                self.document.describe(id)
            );
            self.record(id, Registration::Abandoned);
            return LoadOutcome::MissingSource;
        };

        let probed = match self.options.probe_timeout {
            Some(limit) => {
                tokio::time::timeout(limit, self.probe.probe(&source))
                    .await
                    .unwrap_or(Err(ProbeError::Timeout(limit)))
            }
            None => self.probe.probe(&source).await,
        };

        let settlement = match probed {
            Ok(_) => {
                self.document.set_source(id, &source);
                self.mark_loaded(id);
                Settlement::Loaded { source }
            }
            Err(reason) => self.recover(id, reason),
        };

        self.record(id, Registration::Settled(settlement.clone()));
        LoadOutcome::Settled(settlement)
    }

    fn recover(&self, id: ElementId, reason: ProbeError) -> Settlement {
        let content_type = ContentType::from_attribute(
            self.document.attribute(id, TYPE_ATTRIBUTE).as_deref(),
        );

        match self.options.catalog.lookup(&content_type) {
            FallbackLookup::Available(url) => {
                self.document.set_source(id, url);
                self.mark_loaded(id);
                log::warn!(
                    "Using fallback image for: {} ({})",
                    self.document.describe(id),
                    reason
                );
                Settlement::Fallback {
                    source: url.to_string(),
                    reason,
                }
            }
            FallbackLookup::Missing => {
                log::error!(
                    "No fallback image found for type: {}",
                    content_type
                );
                self.document.add_class(id, LOAD_ERROR_CLASS);
                Settlement::Failed {
                    content_type,
                    reason,
                }
            }
        }
    }

    fn mark_loaded(&self, id: ElementId) {
        match &self.options.on_load {
            Some(on_load) => on_load(self.document.as_ref(), id),
            None => mark_loaded(
                self.document.as_ref(),
                id,
                &self.options.containers,
            ),
        }
    }

    /// Update an existing registration. Entries cleared by a disconnect or
    /// reset stay cleared.
    fn record(&self, id: ElementId, registration: Registration) {
        if let Some(mut entry) = self.registry.get_mut(&id) {
            *entry = registration;
        }
        self.settled.notify_waiters();
    }
}

/// Default success behaviour: add `loaded` to the image and to its nearest
/// container.
pub fn mark_loaded(
    document: &dyn Document,
    id: ElementId,
    containers: &SelectorList,
) {
    document.add_class(id, LOADED_CLASS);
    if let Some(container) = document.closest(id, containers) {
        document.add_class(container, LOADED_CLASS);
    }
}
