//! Shared fixtures for the image loader integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inkwell_config::LazyImageConfig;
use inkwell_core::probe::Result as ProbeResult;
use inkwell_core::{
    ElementSpec, ImageLoadController, ImageProbe, LoaderOptions, ProbeError,
    ProbedImage, SharedPage,
};
use inkwell_model::{ElementId, Rect};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const VIEWPORT: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 1280.0,
    height: 800.0,
};

/// Probe that succeeds unless the URL was marked as failing, and records
/// every call.
#[derive(Debug, Default)]
pub struct StubProbe {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: Mutex::new(urls.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make a failing URL succeed from now on.
    pub fn heal(&self, url: &str) {
        self.failing.lock().remove(url);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl ImageProbe for StubProbe {
    async fn probe(&self, url: &str) -> ProbeResult<ProbedImage> {
        *self.calls.lock().entry(url.to_string()).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(url) {
            return Err(ProbeError::Status {
                status: 404,
                url: url.to_string(),
            });
        }
        Ok(ProbedImage {
            width: 640,
            height: 480,
            bytes: 1024,
        })
    }

    fn supports_url(&self, _url: &str) -> bool {
        true
    }
}

/// Probe that holds every request until the test releases it.
#[derive(Debug)]
pub struct GatedProbe {
    gate: Semaphore,
    calls: Mutex<usize>,
}

impl GatedProbe {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: Mutex::new(0),
        }
    }

    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl ImageProbe for GatedProbe {
    async fn probe(&self, url: &str) -> ProbeResult<ProbedImage> {
        *self.calls.lock() += 1;
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| ProbeError::Network(format!("{url}: {err}")))?;
        permit.forget();
        Ok(ProbedImage::default())
    }

    fn supports_url(&self, _url: &str) -> bool {
        true
    }
}

pub fn default_options() -> LoaderOptions {
    LoaderOptions::from_config(&LazyImageConfig::default())
        .expect("default config is valid")
}

pub fn controller(
    page: &SharedPage,
    probe: Arc<dyn ImageProbe>,
    options: LoaderOptions,
) -> ImageLoadController {
    ImageLoadController::new(options, Arc::new(page.clone()), probe)
}

/// Append `div.article-image > img.article-img` at vertical offset `y`.
/// Returns `(container, image)`.
pub fn add_image(
    page: &SharedPage,
    src: Option<&str>,
    kind: Option<&str>,
    alt: &str,
    y: f32,
) -> (ElementId, ElementId) {
    let mut page = page.write();
    let root = page.root();
    let container = page
        .append(
            root,
            ElementSpec::new("div")
                .class("article-image")
                .rect(Rect::new(0.0, y, 400.0, 240.0)),
        )
        .expect("root exists");

    let mut spec = ElementSpec::new("img")
        .class("article-img")
        .attr("alt", alt)
        .attr("loading", "lazy")
        .rect(Rect::new(0.0, y, 400.0, 240.0));
    if let Some(src) = src {
        spec = spec.attr("data-src", src);
    }
    if let Some(kind) = kind {
        spec = spec.attr("data-type", kind);
    }
    let image = page.append(container, spec).expect("container exists");
    (container, image)
}

pub fn source(page: &SharedPage, id: ElementId) -> Option<String> {
    page.read()
        .get(id)
        .and_then(|element| element.source())
        .map(str::to_string)
}

pub fn has_class(page: &SharedPage, id: ElementId, class: &str) -> bool {
    page.read()
        .get(id)
        .is_some_and(|element| element.has_class(class))
}
