use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lane_geometry_core::{
    combined_gradient_threshold, estimate_curvature, estimate_offset, fit_lane_lines, BinaryMask,
    GradientThresholdParams, GrayImage, PolynomialFit, UnitSystem,
};

const W: usize = 1280;
const H: usize = 720;

fn lane_x(c: f64, y: usize) -> f64 {
    let dy = y as f64 - H as f64;
    2e-4 * dy * dy + c
}

fn lane_mask() -> BinaryMask {
    BinaryMask::from_fn(W, H, |x, y| {
        let xf = x as f64;
        (xf - lane_x(300.0, y)).abs() <= 4.0 || (xf - lane_x(1000.0, y)).abs() <= 4.0
    })
}

fn road_gray() -> GrayImage {
    let mask = lane_mask();
    GrayImage {
        width: W,
        height: H,
        data: mask.data.iter().map(|&v| if v != 0 { 220 } else { 60 }).collect(),
    }
}

fn bench_estimators(c: &mut Criterion) {
    let left = PolynomialFit::new(2e-4, -0.288, 403.68);
    let right = PolynomialFit::new(2e-4, -0.288, 1103.68);
    let ys: Vec<f64> = (0..H).map(|y| y as f64).collect();

    c.bench_function("curvature_pixels", |b| {
        b.iter(|| estimate_curvature(black_box(&ys), left, right, UnitSystem::Pixels))
    });
    c.bench_function("curvature_meters", |b| {
        b.iter(|| estimate_curvature(black_box(&ys), left, right, UnitSystem::Meters))
    });
    c.bench_function("offset_meters", |b| {
        b.iter(|| estimate_offset(black_box(1280.0), 720.0, left, right, UnitSystem::Meters))
    });
}

fn bench_mask_path(c: &mut Criterion) {
    let mask = lane_mask();
    let gray = road_gray();
    let params = GradientThresholdParams::default();

    c.bench_function("fit_lane_lines_1280x720", |b| {
        b.iter(|| fit_lane_lines(black_box(&mask), 100))
    });
    c.bench_function("combined_gradient_1280x720", |b| {
        b.iter(|| combined_gradient_threshold(black_box(&gray.view()), &params))
    });
}

criterion_group!(benches, bench_estimators, bench_mask_path);
criterion_main!(benches);
