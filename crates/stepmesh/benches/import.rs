//! Import and NURBS evaluation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stepmesh::{import_step, ImportOptions};
use stepmesh_math::Point3;
use stepmesh_nurbs::{BSplineCurve, BSplineSurface};

const BLOCK: &str = include_str!("../tests/fixtures/block.step");
const CYLINDER: &str = include_str!("../tests/fixtures/cylinder.step");

fn import_block(c: &mut Criterion) {
    let options = ImportOptions::default();
    c.bench_function("import_block", |b| {
        b.iter(|| import_step(black_box(BLOCK.as_bytes()), &options))
    });
}

fn import_cylinder(c: &mut Criterion) {
    let fine = ImportOptions::with_segments(128);
    c.bench_function("import_cylinder_128", |b| {
        b.iter(|| import_step(black_box(CYLINDER.as_bytes()), &fine))
    });
}

fn nurbs_eval(c: &mut Criterion) {
    let points: Vec<Point3> = (0..12)
        .map(|i| Point3::new(i as f64, (i as f64 * 0.7).sin(), 0.0))
        .collect();
    let Ok(curve) = BSplineCurve::clamped_uniform(points, 3) else {
        return;
    };
    c.bench_function("curve_eval_1000", |b| {
        b.iter(|| {
            for i in 0..1000 {
                black_box(curve.eval(i as f64 / 999.0));
            }
        })
    });

    let rows: Vec<Vec<Point3>> = (0..6)
        .map(|i| {
            (0..6)
                .map(|j| Point3::new(i as f64, j as f64, ((i * j) as f64 * 0.3).cos()))
                .collect()
        })
        .collect();
    let knots = vec![0.0, 0.0, 0.0, 0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0, 1.0, 1.0, 1.0];
    let Ok(surface) = BSplineSurface::from_rows(rows, None, knots.clone(), knots, 3, 3) else {
        return;
    };
    c.bench_function("surface_eval_32x32", |b| {
        b.iter(|| {
            for i in 0..32 {
                for j in 0..32 {
                    black_box(surface.eval(i as f64 / 31.0, j as f64 / 31.0));
                }
            }
        })
    });
}

criterion_group!(benches, import_block, import_cylinder, nurbs_eval);
criterion_main!(benches);
