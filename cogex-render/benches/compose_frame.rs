use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use tiny_skia::Color;

use cogex_render::{pixmap_from_rgba, FrameComposer};

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn composer() -> FrameComposer {
    FrameComposer::new(
        WIDTH,
        HEIGHT,
        Color::from_rgba8(240, 240, 240, 255),
        Color::BLACK,
    )
    .unwrap()
}

/// Full-screen composition plus the copy into the window surface, i.e. the
/// work done between the dispatch loop asking for a screen and `render()`.
pub fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_frame");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    group.bench_function("blank", |b| {
        let mut composer = composer();
        b.iter(|| composer.compose_blank());
    });

    group.bench_function("fixation", |b| {
        let mut composer = composer();
        b.iter(|| composer.compose_fixation());
    });

    // opaque photo takes the row-copy path
    let photo = pixmap_from_rgba(800, 600, &[90, 120, 150, 255].repeat(800 * 600)).unwrap();
    group.bench_function("opaque_picture_800x600", |b| {
        let mut composer = composer();
        b.iter(|| composer.compose_centered(black_box(&photo)));
    });

    // text-like pixmap with transparency takes the blend path
    let word = pixmap_from_rgba(300, 60, &[0, 0, 0, 160].repeat(300 * 60)).unwrap();
    group.bench_function("translucent_word_300x60", |b| {
        let mut composer = composer();
        b.iter(|| composer.compose_centered(black_box(&word)));
    });

    group.bench_function("copy_to_surface", |b| {
        let mut composer = composer();
        composer.compose_fixation();
        let mut frame = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
        b.iter(|| composer.copy_to(black_box(&mut frame)).unwrap());
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_compose
}

criterion_main!(benches);
