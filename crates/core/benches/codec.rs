use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vga_core::codec::{decode_columns, planes_to_nibbles};

/// Build a run-length stream for a solid image with short alternating runs,
/// the shape background art actually compresses to.
fn rle_stream(width: usize, height: usize) -> Vec<u8> {
    let mut src = Vec::new();
    let mut left = width * height;
    let mut colour = 0u8;
    while left > 0 {
        let run = left.min(96);
        // Repeat header counts run - 1, then the byte to repeat.
        let mut chunk = run;
        while chunk > 0 {
            let n = chunk.min(128);
            src.push((n - 1) as u8);
            src.push(colour);
            chunk -= n;
        }
        colour = colour.wrapping_add(3);
        left -= run;
    }
    src
}

/// Interleaved 4-plane data for a width x height image.
fn plane_stream(width: usize, height: usize) -> Vec<u8> {
    let groups = width / 16 * height;
    let mut src = Vec::with_capacity(groups * 8);
    for g in 0..groups {
        for plane in 0..4u16 {
            let word = (g as u16).rotate_left(plane as u32) ^ 0x5AA5;
            src.extend_from_slice(&word.to_be_bytes());
        }
    }
    src
}

fn bench_rle(c: &mut Criterion) {
    let mut group = c.benchmark_group("rle_decode");
    for (w, h) in [(32usize, 50usize), (320, 200)] {
        let src = rle_stream(w, h);
        let mut dst = vec![0u8; w * h];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", w, h)),
            &src,
            |b, src| {
                b.iter(|| {
                    decode_columns(black_box(src), w, h, black_box(&mut dst)).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_planar(c: &mut Criterion) {
    let mut group = c.benchmark_group("planar_decode");
    for (w, h) in [(32usize, 50usize), (320, 200)] {
        let src = plane_stream(w, h);
        let mut dst = vec![0u8; w / 2 * h];
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", w, h)),
            &src,
            |b, src| {
                b.iter(|| {
                    planes_to_nibbles(black_box(src), w, h, black_box(&mut dst)).unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_rle, bench_planar);
criterion_main!(benches);
