use std::time::Duration;

use rust_photobooth::filters::{DrawStatus, FilterKind, FilterRegistry, FrameContext};
use rust_photobooth::processing::canvas::Canvas;
use rust_photobooth::processing::sampler::SampleView;

const SAMPLE_W: u32 = 36;
const SAMPLE_H: u32 = 24;

fn gradient() -> Vec<u8> {
    let mut pixels = Vec::with_capacity((SAMPLE_W * SAMPLE_H * 4) as usize);
    for y in 0..SAMPLE_H {
        for x in 0..SAMPLE_W {
            pixels.extend_from_slice(&[(x * 7) as u8, (y * 10) as u8, ((x + y) * 4) as u8, 255]);
        }
    }
    pixels
}

fn ctx(ms: u64) -> FrameContext {
    FrameContext {
        elapsed: Duration::from_millis(ms),
    }
}

#[test]
fn short_buffers_are_skipped_without_painting() {
    let full = gradient();
    let short = &full[..full.len() - 4];
    for kind in FilterKind::ALL {
        let mut filter = kind.instantiate();
        let mut canvas = Canvas::new(90, 60);
        filter.setup(&mut canvas);
        let before = canvas.snapshot();
        let view = SampleView::new(SAMPLE_W, SAMPLE_H, short);
        assert_eq!(filter.draw(&mut canvas, &view, &ctx(0)), DrawStatus::Skipped, "{kind}");
        assert_eq!(canvas.snapshot(), before, "{kind} painted on a short buffer");
    }
}

#[test]
fn every_filter_paints_any_display_size() {
    let pixels = gradient();
    let view = SampleView::new(SAMPLE_W, SAMPLE_H, &pixels);
    for kind in FilterKind::ALL {
        for (w, h) in [(150, 100), (31, 20), (3, 2)] {
            let mut filter = kind.instantiate();
            let mut canvas = Canvas::new(w, h);
            filter.setup(&mut canvas);
            for frame in 0..3 {
                let status = filter.draw(&mut canvas, &view, &ctx(frame * 33));
                assert_eq!(status, DrawStatus::Drawn, "{kind} at {w}x{h}");
            }
            assert_eq!((canvas.width(), canvas.height()), (w, h));
        }
    }
}

#[test]
fn fresh_instances_share_no_state() {
    let pixels = gradient();
    let view = SampleView::new(SAMPLE_W, SAMPLE_H, &pixels);
    for kind in [FilterKind::FadeTrail, FilterKind::TimeEcho, FilterKind::QuadOverlay] {
        let mut first = kind.instantiate();
        let mut canvas_a = Canvas::new(60, 40);
        first.setup(&mut canvas_a);
        for frame in 0..5 {
            first.draw(&mut canvas_a, &view, &ctx(frame));
        }

        let mut again = kind.instantiate();
        let mut canvas_b = Canvas::new(60, 40);
        again.setup(&mut canvas_b);
        again.draw(&mut canvas_b, &view, &ctx(0));

        let mut reference = kind.instantiate();
        let mut canvas_c = Canvas::new(60, 40);
        reference.setup(&mut canvas_c);
        reference.draw(&mut canvas_c, &view, &ctx(0));

        assert_eq!(canvas_b.snapshot(), canvas_c.snapshot(), "{kind}");
    }
}

#[test]
fn registry_selects_by_index_and_name() {
    let mut registry = FilterRegistry::new(FilterKind::ALL.to_vec(), 0).unwrap();
    assert_eq!(registry.len(), 11);
    assert_eq!(registry.select(3).unwrap(), FilterKind::HueClusters);
    assert_eq!(registry.select_named("time-echo").unwrap(), FilterKind::TimeEcho);
    assert_eq!(registry.select_named("2").unwrap(), FilterKind::StripeFlip);
    assert!(registry.select(11).is_err());
    assert!(registry.select_named("sepia").is_err());
    assert_eq!(registry.active(), FilterKind::StripeFlip);
    assert_eq!(registry.previous(), FilterKind::SignalDots);
    registry.select(10).unwrap();
    assert_eq!(registry.next(), FilterKind::CmyHalftone);
}
