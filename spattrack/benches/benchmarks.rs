use criterion::{criterion_group, criterion_main, Criterion};
use demgrid::DemGrid;
use geo::geometry::Coord;
use ndarray::Array2;
use spattrack::{spatial_distance, DistanceOptions};

fn distance_maps(c: &mut Criterion) {
    let mut group = c.benchmark_group("Distance Maps");

    let values = Array2::from_shape_fn((60, 60), |(row, col)| {
        ((row as f64 * 0.3).sin() + (col as f64 * 0.2).cos()) * 40.0
    });
    let dem = DemGrid::from_parts(values, 0.0, 600.0, 10.0, "").unwrap();
    let stations = vec![
        Coord { x: 105.0, y: 105.0 },
        Coord { x: 495.0, y: 495.0 },
    ];
    let options = DistanceOptions::default();

    group.bench_function("60x60_two_stations", |b| {
        b.iter(|| spatial_distance(&stations, &dem, &options).unwrap())
    });
}

criterion_group!(benches, distance_maps);
criterion_main!(benches);
