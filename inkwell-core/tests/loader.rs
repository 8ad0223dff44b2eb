mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    GatedProbe, StubProbe, VIEWPORT, add_image, controller, default_options,
    has_class, source,
};
use inkwell_config::ObservationMode;
use inkwell_core::{
    ElementState, IntersectionEntry, LoadOutcome, ProbeError, Settlement,
    SharedPage,
};
use inkwell_model::{ContentType, FallbackCatalog, Rect};

const COVER: &str = "https://cdn.example.test/cover.jpg";
const BROKEN: &str = "https://cdn.example.test/missing.jpg";

#[tokio::test]
async fn visible_image_receives_its_source_once() {
    let page = SharedPage::default();
    let (container, img) = add_image(&page, Some(COVER), None, "Cover", 100.0);
    let probe = Arc::new(StubProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.observe();
    assert_eq!(loader.session().observed_count(), 1);
    assert_eq!(loader.state(img), ElementState::Observed);
    assert_eq!(source(&page, img), None);

    loader.scroll_to(VIEWPORT);
    let outcomes = loader.drain().await;
    assert_eq!(outcomes.len(), 1);

    assert_eq!(source(&page, img).as_deref(), Some(COVER));
    assert!(has_class(&page, img, "loaded"));
    assert!(has_class(&page, container, "loaded"));
    assert_eq!(
        loader.state(img),
        ElementState::Settled(Settlement::Loaded {
            source: COVER.to_string()
        })
    );

    // Later renders and scrolls leave a settled element alone.
    loader.observe();
    loader.scroll_to(VIEWPORT);
    assert!(loader.drain().await.is_empty());
    assert_eq!(probe.calls(COVER), 1);
}

#[tokio::test]
async fn images_below_the_margin_wait_for_scroll() {
    let page = SharedPage::default();
    // Starts at the bottom edge; only the 50px margin overlaps it.
    let (_, near) = add_image(&page, Some(COVER), None, "Near", 800.0);
    let (_, far) = add_image(&page, Some(BROKEN), None, "Far", 2000.0);
    let probe = Arc::new(StubProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;
    assert!(matches!(loader.state(near), ElementState::Settled(_)));
    assert_eq!(loader.state(far), ElementState::Observed);
    assert_eq!(probe.calls(BROKEN), 0);

    loader.scroll_to(Rect::new(0.0, 1600.0, 1280.0, 800.0));
    loader.drain().await;
    assert_eq!(source(&page, far).as_deref(), Some(BROKEN));
}

#[tokio::test]
async fn reentering_the_viewport_while_loading_does_not_reload() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let probe = Arc::new(GatedProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    assert_eq!(loader.state(img), ElementState::Loading);

    loader.scroll_to(VIEWPORT);
    loader.handle_intersections(&[IntersectionEntry {
        target: img,
        ratio: 1.0,
        is_intersecting: true,
    }]);
    assert_eq!(loader.pending_loads(), 1);
    assert!(!loader.reset_element(img));

    probe.release(1);
    let outcomes = loader.drain().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(probe.calls(), 1);
    assert!(matches!(loader.state(img), ElementState::Settled(_)));
}

#[tokio::test]
async fn failed_design_image_uses_catalog_fallback() {
    let page = SharedPage::default();
    let (container, img) =
        add_image(&page, Some(BROKEN), Some("design"), "Palette", 0.0);
    let loader = controller(
        &page,
        Arc::new(StubProbe::failing([BROKEN])),
        default_options(),
    );

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    let expected = FallbackCatalog::default()
        .url_for(&ContentType::Design)
        .map(str::to_string);
    assert!(expected.is_some());
    assert_eq!(source(&page, img), expected);
    assert!(has_class(&page, img, "loaded"));
    assert!(has_class(&page, container, "loaded"));
    assert!(!has_class(&page, img, "image-load-error"));
    assert!(matches!(
        loader.state(img),
        ElementState::Settled(Settlement::Fallback {
            reason: ProbeError::Status { status: 404, .. },
            ..
        })
    ));
}

#[tokio::test]
async fn missing_type_falls_back_as_technology() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(BROKEN), None, "Untyped", 0.0);
    let loader = controller(
        &page,
        Arc::new(StubProbe::failing([BROKEN])),
        default_options(),
    );

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    let technology = FallbackCatalog::default()
        .url_for(&ContentType::Technology)
        .map(str::to_string);
    assert_eq!(source(&page, img), technology);
}

#[tokio::test]
async fn unknown_type_without_fallback_is_marked_as_error() {
    let page = SharedPage::default();
    let (container, img) =
        add_image(&page, Some(BROKEN), Some("unknown-tag"), "Mystery", 0.0);
    let loader = controller(
        &page,
        Arc::new(StubProbe::failing([BROKEN])),
        default_options(),
    );

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    assert_eq!(source(&page, img), None);
    assert!(has_class(&page, img, "image-load-error"));
    assert!(!has_class(&page, img, "loaded"));
    assert!(!has_class(&page, container, "loaded"));
    match loader.state(img) {
        ElementState::Settled(settlement) => {
            assert!(!settlement.shows_image());
            assert!(matches!(
                settlement,
                Settlement::Failed { content_type: ContentType::Other(ref tag), .. }
                    if tag == "unknown-tag"
            ));
        }
        other => panic!("expected a settled element, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_data_src_is_abandoned_without_probing() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, None, Some("design"), "Empty", 0.0);
    // Still registered through the `.article-img` selector.
    let probe = Arc::new(StubProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    let outcomes = loader.drain().await;

    assert_eq!(outcomes, vec![(img, LoadOutcome::MissingSource)]);
    assert_eq!(loader.state(img), ElementState::Abandoned);
    assert_eq!(probe.total_calls(), 0);
    assert_eq!(source(&page, img), None);
}

#[tokio::test]
async fn observe_drops_native_lazy_loading() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let loader =
        controller(&page, Arc::new(StubProbe::new()), default_options());

    loader.observe();
    let guard = page.read();
    let element = guard.get(img).expect("image exists");
    assert_eq!(element.attribute("loading"), None);
}

#[tokio::test]
async fn eager_mode_loads_on_observe() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), None, "Cover", 5000.0);
    let probe = Arc::new(StubProbe::new());
    let mut options = default_options();
    options.mode = ObservationMode::Eager;
    let loader = controller(&page, probe.clone(), options);

    loader.observe();
    assert_eq!(loader.session().observed_count(), 0);
    loader.drain().await;
    assert_eq!(source(&page, img).as_deref(), Some(COVER));

    loader.observe();
    assert!(loader.drain().await.is_empty());
    assert_eq!(probe.calls(COVER), 1);
}

#[tokio::test]
async fn removed_elements_are_pruned_and_late_writes_are_harmless() {
    let page = SharedPage::default();
    let (container, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let probe = Arc::new(GatedProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    page.write().remove(container).expect("container exists");

    probe.release(1);
    let outcomes = loader.drain().await;
    assert_eq!(outcomes.len(), 1);
    assert!(!page.read().contains(img));

    loader.observe();
    assert_eq!(loader.state(img), ElementState::Unobserved);
}

#[tokio::test(start_paused = true)]
async fn probe_timeout_takes_the_fallback_path() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), Some("ai"), "Slow", 0.0);
    let probe = Arc::new(StubProbe::new().with_delay(Duration::from_secs(60)));
    let mut options = default_options();
    options.probe_timeout = Some(Duration::from_secs(5));
    let loader = controller(&page, probe, options);

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    assert_eq!(
        source(&page, img).as_deref(),
        FallbackCatalog::default().url_for(&ContentType::Ai)
    );
    assert!(matches!(
        loader.state(img),
        ElementState::Settled(Settlement::Fallback {
            reason: ProbeError::Timeout(_),
            ..
        })
    ));
}

#[tokio::test]
async fn reset_element_allows_a_retry() {
    let page = SharedPage::default();
    let (_, img) =
        add_image(&page, Some(BROKEN), Some("unknown-tag"), "Retry", 0.0);
    let probe = Arc::new(StubProbe::failing([BROKEN]));
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;
    assert!(has_class(&page, img, "image-load-error"));

    probe.heal(BROKEN);
    assert!(loader.reset_element(img));
    assert_eq!(loader.state(img), ElementState::Unobserved);

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;
    assert_eq!(source(&page, img).as_deref(), Some(BROKEN));
    assert_eq!(probe.calls(BROKEN), 2);
}

#[tokio::test]
async fn custom_on_load_replaces_class_marking() {
    let page = SharedPage::default();
    let (container, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let options = default_options()
        .with_on_load(|document, id| document.add_class(id, "faded-in"));
    let loader = controller(&page, Arc::new(StubProbe::new()), options);

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    assert!(has_class(&page, img, "faded-in"));
    assert!(!has_class(&page, img, "loaded"));
    assert!(!has_class(&page, container, "loaded"));
}

#[tokio::test]
async fn disconnected_loader_stops_observing() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let probe = Arc::new(StubProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.disconnect();
    assert!(!loader.is_connected());
    assert_eq!(loader.session().observed_count(), 0);

    loader.observe();
    loader.scroll_to(VIEWPORT);
    assert!(loader.drain().await.is_empty());
    assert_eq!(loader.state(img), ElementState::Unobserved);
    assert_eq!(probe.total_calls(), 0);
}

#[tokio::test]
async fn type_tags_are_matched_exactly() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(BROKEN), Some("Design"), "Palette", 0.0);
    let loader = controller(
        &page,
        Arc::new(StubProbe::failing([BROKEN])),
        default_options(),
    );

    loader.observe();
    loader.scroll_to(VIEWPORT);
    loader.drain().await;

    assert_eq!(source(&page, img), None);
    assert!(has_class(&page, img, "image-load-error"));
}

#[tokio::test]
async fn cancelled_drain_leaves_the_load_running() {
    let page = SharedPage::default();
    let (_, img) = add_image(&page, Some(COVER), None, "Cover", 0.0);
    let probe = Arc::new(GatedProbe::new());
    let loader = controller(&page, probe.clone(), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    let waited =
        tokio::time::timeout(Duration::from_millis(20), loader.drain()).await;
    assert!(waited.is_err());
    assert_eq!(loader.state(img), ElementState::Loading);

    probe.release(1);
    loader.drain().await;
    assert_eq!(
        loader.state(img),
        ElementState::Settled(Settlement::Loaded {
            source: COVER.to_string()
        })
    );
    assert_eq!(source(&page, img).as_deref(), Some(COVER));
    assert!(loader.reset_element(img));
    assert_eq!(probe.calls(), 1);
}

#[tokio::test]
async fn finished_loads_are_reaped_by_the_next_batch() {
    let page = SharedPage::default();
    let (_, near) = add_image(&page, Some(COVER), None, "Near", 0.0);
    let (_, far) = add_image(&page, Some(BROKEN), None, "Far", 2000.0);
    let loader =
        controller(&page, Arc::new(StubProbe::new()), default_options());

    loader.observe();
    loader.scroll_to(VIEWPORT);
    while loader.pending_loads() > 0 {
        tokio::task::yield_now().await;
    }
    assert!(matches!(loader.state(near), ElementState::Settled(_)));
    assert_eq!(loader.tracked_loads(), 1);

    loader.scroll_to(Rect::new(0.0, 1600.0, 1280.0, 800.0));
    assert_eq!(loader.tracked_loads(), 1);

    let outcomes = loader.drain().await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].0, far);
    assert_eq!(loader.tracked_loads(), 0);
}
