//! Application-owned holder for the single image loader.
//!
//! The first [`LoaderSlot::get_instance`] call builds the controller; later
//! calls return the same one and ignore their options until
//! [`LoaderSlot::disconnect`] empties the slot.

use std::fmt;
use std::sync::Arc;

use inkwell_config::LazyImageConfig;
use parking_lot::Mutex;

use crate::controller::{ImageLoadController, LoaderOptions};
use crate::dom::Document;
use crate::error::Result;
use crate::probe::ImageProbe;

pub struct LoaderSlot {
    document: Arc<dyn Document>,
    probe: Arc<dyn ImageProbe>,
    current: Mutex<Option<ImageLoadController>>,
}

impl fmt::Debug for LoaderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderSlot")
            .field("current", &*self.current.lock())
            .finish_non_exhaustive()
    }
}

impl LoaderSlot {
    pub fn new(document: Arc<dyn Document>, probe: Arc<dyn ImageProbe>) -> Self {
        Self {
            document,
            probe,
            current: Mutex::new(None),
        }
    }

    /// Return the live controller, building it from `options` (or the
    /// default configuration) if the slot is empty.
    pub fn get_instance(
        &self,
        options: Option<LoaderOptions>,
    ) -> Result<ImageLoadController> {
        let mut current = self.current.lock();
        if let Some(controller) = current.as_ref() {
            if options.is_some() {
                log::debug!(
                    "Image loader already running; ignoring new options"
                );
            }
            return Ok(controller.clone());
        }

        let options = match options {
            Some(options) => options,
            None => LoaderOptions::from_config(&LazyImageConfig::default())?,
        };
        let controller = ImageLoadController::new(
            options,
            Arc::clone(&self.document),
            Arc::clone(&self.probe),
        );
        *current = Some(controller.clone());
        Ok(controller)
    }

    pub fn current(&self) -> Option<ImageLoadController> {
        self.current.lock().clone()
    }

    /// Tear down the live controller, if any. The next `get_instance` call
    /// builds a fresh one.
    pub fn disconnect(&self) {
        if let Some(controller) = self.current.lock().take() {
            controller.disconnect();
        }
    }
}
