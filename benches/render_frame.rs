//! Per-frame cost of each act at a common terminal size.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cortex_splash::cascade::{Cascade, CascadeOptions};
use cortex_splash::geometry::TorusRenderer;
use cortex_splash::{ColorDepth, FrameBuffer, Palette};

const WIDTH: usize = 120;
const HEIGHT: usize = 40;

fn bench_acts(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    group.sample_size(50);

    group.bench_function("geometry_120x40", |b| {
        let mut buffer = FrameBuffer::new(WIDTH, HEIGHT).expect("buffer");
        let mut torus = TorusRenderer::new(WIDTH, HEIGHT, true);
        b.iter(|| {
            buffer.clear();
            black_box(torus.compute_frame(&mut buffer, false))
        });
    });

    group.bench_function("cascade_120x40", |b| {
        let mut buffer = FrameBuffer::new(WIDTH, HEIGHT).expect("buffer");
        let options = CascadeOptions {
            seed: Some(1),
            ..CascadeOptions::default()
        };
        let mut cascade = Cascade::new(WIDTH, HEIGHT, options).expect("cascade");
        b.iter(|| {
            buffer.clear();
            cascade.update();
            cascade.composite_into(&mut buffer);
            black_box(buffer.filled_cells())
        });
    });

    group.bench_function("snapshot_truecolor_120x40", |b| {
        let mut buffer = FrameBuffer::new(WIDTH, HEIGHT).expect("buffer");
        let mut torus = TorusRenderer::new(WIDTH, HEIGHT, true);
        torus.compute_frame(&mut buffer, false);
        let palette = Palette::cyber();
        b.iter(|| black_box(buffer.snapshot(&palette, ColorDepth::TrueColor)));
    });

    group.finish();
}

criterion_group!(benches, bench_acts);
criterion_main!(benches);
