use rust_photobooth::processing::sampler::{NotReady, PixelSampler, SampleOutcome};
use rust_photobooth::video::VideoFrame;

fn grey(width: u32, height: u32, v: u8) -> VideoFrame {
    VideoFrame::solid(width, height, [v, v, v, 255])
}

#[test]
fn sample_has_fixed_dimensions_for_any_source() {
    let mut sampler = PixelSampler::new(36, 24, 1.5, true);
    for (w, h) in [(1920, 1080), (720, 1280), (640, 480), (37, 23)] {
        let outcome = sampler.sample(&grey(w, h, 90)).unwrap();
        let SampleOutcome::Ready(view) = outcome else {
            panic!("{w}x{h} should sample");
        };
        assert_eq!((view.width(), view.height()), (36, 24));
        assert_eq!(view.pixels().len(), 36 * 24 * 4);
    }
}

#[test]
fn not_ready_leaves_previous_sample_untouched() {
    let mut sampler = PixelSampler::new(36, 24, 1.5, false);
    assert!(sampler.sample(&grey(640, 480, 200)).unwrap().is_ready());
    let before = sampler.last().unwrap().pixels().to_vec();

    let outcome = sampler.sample(&VideoFrame::new(0, 0, Vec::new())).unwrap();
    assert!(matches!(outcome, SampleOutcome::NotReady(NotReady::NoDimensions)));

    let truncated = VideoFrame::new(640, 480, vec![0; 100]);
    let outcome = sampler.sample(&truncated).unwrap();
    assert!(matches!(outcome, SampleOutcome::NotReady(NotReady::Undecodable)));

    assert_eq!(sampler.last().unwrap().pixels(), &before[..]);
}

#[test]
fn nothing_sampled_before_first_frame() {
    let sampler = PixelSampler::new(36, 24, 1.5, true);
    assert!(sampler.last().is_none());
    assert!(sampler.current_crop().is_none());
}

#[test]
fn crop_follows_source_size() {
    let mut sampler = PixelSampler::new(36, 24, 1.5, true);
    sampler.sample(&grey(1920, 1080, 10)).unwrap();
    let crop = sampler.current_crop().unwrap();
    assert!((crop.sx - 150.0).abs() < 1e-9);
    sampler.sample(&grey(720, 1280, 10)).unwrap();
    let crop = sampler.current_crop().unwrap();
    assert!((crop.sy - 400.0).abs() < 1e-9);
}
