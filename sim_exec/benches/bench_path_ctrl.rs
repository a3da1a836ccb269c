//! # Path Correction Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::Vector3;
use sim_lib::{
    path_ctrl::{InputData, Params, PathCtrl},
    traj::{PathSample, Trajectory, NUM_GATES},
};
use util::module::State;

/// Number of samples in the benchmark trajectory, a 20 s traversal at 60 Hz.
const NUM_SAMPLES: usize = 1201;

fn path_ctrl_benchmark(c: &mut Criterion) {
    // ---- Build a helical trajectory past a row of gates ----

    let gates: Vec<Vector3<f64>> = (0..NUM_GATES)
        .map(|g| Vector3::new(0.02 * g as f64, 0.01, 0.0))
        .collect();

    let samples = (0..NUM_SAMPLES)
        .map(|i| {
            let s = i as f64 / (NUM_SAMPLES - 1) as f64;
            let theta = s * 8.0 * std::f64::consts::PI;
            PathSample {
                time_s: s,
                gate_positions_m: gates.clone(),
                tooltip_position_m: Vector3::new(
                    0.02 * NUM_GATES as f64 * s,
                    0.01 * theta.cos(),
                    0.01 * theta.sin(),
                ),
            }
        })
        .collect();

    let traj = Trajectory::new(samples).unwrap();

    // Live gates displaced along +Y as by the shaker table
    let live_gates_m: Vec<Vector3<f64>> = gates
        .iter()
        .map(|g| g + Vector3::new(0.0, 0.005, 0.0))
        .collect();

    let mut ctrl = PathCtrl::new(Params { max_accel_mss: 2.0 }).unwrap();

    c.bench_function("path_ctrl tick", |b| {
        ctrl.begin(traj.clone());
        let mut index = 0;

        b.iter(|| {
            let input = InputData {
                index,
                dt_s: 1.0 / 60.0,
                time_s: (index + 1) as f64 / 60.0,
                live_gates_m: live_gates_m.clone(),
            };

            black_box(ctrl.proc(&input).unwrap());

            index = (index + 1) % (NUM_SAMPLES - 1);
        })
    });
}

criterion_group!(benches, path_ctrl_benchmark);
criterion_main!(benches);
