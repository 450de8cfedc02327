use criterion::{black_box, criterion_group, criterion_main, Criterion};
use still_replace::analysis::FrameComparator;
use still_replace::video::{FormatDescriptor, Frame, PixelFormat};

fn make_frames(format: &FormatDescriptor, delta: u8) -> (Frame, Frame) {
    let size = format.min_size();
    let reference: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let candidate = reference.iter().map(|b| b.wrapping_add(delta)).collect();
    (
        Frame::with_sequence(reference, 0),
        Frame::with_sequence(candidate, 1),
    )
}

fn bench_should_replace(c: &mut Criterion) {
    let format = FormatDescriptor::resolve(PixelFormat::Rgbx, 1280, 720).unwrap();

    // Identical frames: the first channel already exceeds the threshold.
    let (reference, candidate) = make_frames(&format, 0);
    let comparator = FrameComparator::new(0, 50);
    c.bench_function("should_replace_match_720p", |b| {
        let reference = reference.map_read(&format).unwrap();
        let candidate = candidate.map_read(&format).unwrap();
        b.iter(|| comparator.should_replace(black_box(&reference), black_box(&candidate)));
    });

    // Differing frames: every channel is scanned.
    let (reference, candidate) = make_frames(&format, 40);
    c.bench_function("should_replace_miss_720p", |b| {
        let reference = reference.map_read(&format).unwrap();
        let candidate = candidate.map_read(&format).unwrap();
        b.iter(|| comparator.should_replace(black_box(&reference), black_box(&candidate)));
    });

    let top_rows = FrameComparator::new(32, 50);
    c.bench_function("should_replace_miss_32_lines", |b| {
        let reference = reference.map_read(&format).unwrap();
        let candidate = candidate.map_read(&format).unwrap();
        b.iter(|| top_rows.should_replace(black_box(&reference), black_box(&candidate)));
    });
}

fn bench_score(c: &mut Criterion) {
    let format = FormatDescriptor::resolve(PixelFormat::Gray8, 640, 480).unwrap();
    let (reference, candidate) = make_frames(&format, 3);
    let comparator = FrameComparator::new(0, 50);

    c.bench_function("score_gray_480p", |b| {
        let reference = reference.map_read(&format).unwrap();
        let candidate = candidate.map_read(&format).unwrap();
        b.iter(|| comparator.score(black_box(&reference), black_box(&candidate)));
    });
}

criterion_group!(benches, bench_should_replace, bench_score);
criterion_main!(benches);
