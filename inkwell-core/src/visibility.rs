//! Viewport observation session.
//!
//! One [`ViewportSession`] backs one image loader. It keeps the set of
//! observed elements and, given the current viewport, reports how much of
//! each element falls inside the viewport grown by the root margin.

use std::collections::BTreeSet;

use inkwell_model::{ElementId, Rect, RootMargin};
use parking_lot::Mutex;

use crate::dom::Document;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    /// Fraction of the target's area inside the expanded viewport.
    pub ratio: f32,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    pub fn outside(target: ElementId) -> Self {
        Self {
            target,
            ratio: 0.0,
            is_intersecting: false,
        }
    }
}

/// Threshold used when the configured one is not a number.
const DEFAULT_THRESHOLD: f32 = 0.1;

#[derive(Debug)]
pub struct ViewportSession {
    margin: RootMargin,
    threshold: f32,
    observed: Mutex<BTreeSet<ElementId>>,
}

impl ViewportSession {
    pub fn new(margin: RootMargin, threshold: f32) -> Self {
        let threshold = if threshold.is_nan() {
            DEFAULT_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self {
            margin,
            threshold,
            observed: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn margin(&self) -> RootMargin {
        self.margin
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Start observing `id`; returns false if it was already observed.
    pub fn observe(&self, id: ElementId) -> bool {
        self.observed.lock().insert(id)
    }

    pub fn unobserve(&self, id: ElementId) -> bool {
        self.observed.lock().remove(&id)
    }

    pub fn is_observing(&self, id: ElementId) -> bool {
        self.observed.lock().contains(&id)
    }

    pub fn observed_count(&self) -> usize {
        self.observed.lock().len()
    }

    pub fn disconnect(&self) {
        self.observed.lock().clear();
    }

    /// Whether an entry is visible enough to trigger a load.
    pub fn is_visible(&self, entry: &IntersectionEntry) -> bool {
        entry.is_intersecting && entry.ratio >= self.threshold
    }

    /// Intersection entries for every observed element still in the
    /// document. Elements that left the document are dropped from the
    /// session.
    pub fn entries(
        &self,
        document: &dyn Document,
        viewport: Rect,
    ) -> Vec<IntersectionEntry> {
        let root = self.margin.expand(&viewport);
        let snapshot: Vec<ElementId> =
            self.observed.lock().iter().copied().collect();

        let mut entries = Vec::with_capacity(snapshot.len());
        for id in snapshot {
            if !document.contains(id) {
                self.unobserve(id);
                continue;
            }
            let entry = match document.layout_rect(id) {
                Some(rect) => Self::measure(id, &rect, &root),
                None => IntersectionEntry::outside(id),
            };
            entries.push(entry);
        }
        entries
    }

    fn measure(id: ElementId, target: &Rect, root: &Rect) -> IntersectionEntry {
        let Some(overlap) = target.intersection(root) else {
            return IntersectionEntry::outside(id);
        };
        let area = target.area();
        let ratio = if area > 0.0 {
            (overlap.area() / area).clamp(0.0, 1.0)
        } else {
            1.0
        };
        IntersectionEntry {
            target: id,
            ratio,
            is_intersecting: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSpec, SharedPage};

    fn page_with_image(rect: Rect) -> (SharedPage, ElementId) {
        let shared = SharedPage::default();
        let img = {
            let mut page = shared.write();
            let root = page.root();
            page.append(root, ElementSpec::new("img").rect(rect)).unwrap()
        };
        (shared, img)
    }

    #[test]
    fn margin_pulls_elements_below_the_fold_into_view() {
        let (page, img) = page_with_image(Rect::new(0.0, 820.0, 100.0, 100.0));
        let viewport = Rect::new(0.0, 0.0, 1024.0, 800.0);

        let tight = ViewportSession::new(RootMargin::uniform(0.0), 0.1);
        tight.observe(img);
        let entry = tight.entries(&page, viewport)[0];
        assert!(!entry.is_intersecting);

        let loose = ViewportSession::new(RootMargin::uniform(50.0), 0.1);
        loose.observe(img);
        let entry = loose.entries(&page, viewport)[0];
        assert!(entry.is_intersecting);
        assert!((entry.ratio - 0.3).abs() < 1e-4);
        assert!(loose.is_visible(&entry));
    }

    #[test]
    fn ratio_below_threshold_is_not_visible() {
        let (page, img) = page_with_image(Rect::new(0.0, 795.0, 100.0, 100.0));
        let session = ViewportSession::new(RootMargin::uniform(0.0), 0.1);
        session.observe(img);
        let entry = session.entries(&page, Rect::new(0.0, 0.0, 800.0, 800.0))[0];
        assert!(entry.is_intersecting);
        assert!(!session.is_visible(&entry));
    }

    #[test]
    fn unlaid_out_elements_never_intersect() {
        let shared = SharedPage::default();
        let img = {
            let mut page = shared.write();
            let root = page.root();
            page.append(root, ElementSpec::new("img")).unwrap()
        };
        let session = ViewportSession::new(RootMargin::default(), 0.0);
        session.observe(img);
        let entries = session.entries(&shared, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(entries, vec![IntersectionEntry::outside(img)]);
    }

    #[test]
    fn nan_threshold_falls_back_to_default() {
        let (page, img) = page_with_image(Rect::new(0.0, 0.0, 100.0, 100.0));
        let session = ViewportSession::new(RootMargin::uniform(0.0), f32::NAN);
        assert_eq!(session.threshold(), DEFAULT_THRESHOLD);

        session.observe(img);
        let entry = session.entries(&page, Rect::new(0.0, 0.0, 800.0, 800.0))[0];
        assert!(session.is_visible(&entry));
        assert_eq!(ViewportSession::new(RootMargin::default(), 4.0).threshold(), 1.0);
    }

    #[test]
    fn removed_elements_leave_the_session() {
        let (page, img) = page_with_image(Rect::new(0.0, 0.0, 10.0, 10.0));
        let session = ViewportSession::new(RootMargin::default(), 0.1);
        assert!(session.observe(img));
        assert!(!session.observe(img));

        page.write().remove(img).unwrap();
        assert!(session.entries(&page, Rect::new(0.0, 0.0, 10.0, 10.0)).is_empty());
        assert!(!session.is_observing(img));
    }
}
