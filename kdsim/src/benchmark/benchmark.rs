use std::time::Instant;

use crate::simulation::accumulator::{accumulate, Neighborhood};
use crate::simulation::engine::{Engine, Simulation};
use crate::simulation::forces::{Contribution, Gravity, Interaction, InteractionSet};
use crate::simulation::params::Parameters;
use crate::simulation::states::{NVec3, Particle, ParticleStore};

const BENCH_K: usize = 16;

/// Helper to build a deterministic 3D store of size `n` (no rand needed)
fn make_store3(n: usize) -> ParticleStore<3> {
    let side = (n as f64).cbrt() * 0.5;
    let result = ParticleStore::initialize(n, |i| {
        let i_f = i as f64;
        let mut p = Particle::at(NVec3::new(
            (i_f * 0.37).sin() * side,
            (i_f * 0.13).cos() * side,
            (i_f * 0.07).sin() * side,
        ));
        p.temperature = 300.0 + (i % 7) as f64;
        p
    });
    match result {
        Ok(store) => store,
        Err(err) => panic!("benchmark store for n = {n} is invalid: {err}"),
    }
}

fn make_gravity() -> InteractionSet<3> {
    InteractionSet::new().with(Gravity { g: 0.1, eps2: 1e-4 })
}

/// Naive all-pairs sum over every other particle, for comparison only
fn accumulate_direct(store: &ParticleStore<3>, forces: &InteractionSet<3>) -> Vec<NVec3> {
    let n = store.len();
    let mut out = vec![NVec3::zeros(); n];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut total = Contribution::zero();
        for j in 0..n {
            if i != j {
                total += forces.contribution(store.view(i), store.view(j));
            }
        }
        *slot = total.force;
    }
    out
}

/// Time one accumulator pass for N = 1k / 10k / 100k with fixed k
///
/// A k-nearest pass should grow roughly like N log N; the direct all-pairs
/// sum is only timed where it finishes in reasonable time.
pub fn bench_accumulate() {
    let forces = make_gravity();

    println!("N,k,build_ms,accumulate_ms,accumulate_parallel_ms,direct_ms");
    for n in [1_000, 10_000, 100_000] {
        let store = make_store3(n);

        let t0 = Instant::now();
        let index = store.spatial_index();
        let build_ms = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        let seq = accumulate(&store, &index, &forces, BENCH_K, false);
        let seq_ms = t1.elapsed().as_secs_f64() * 1000.0;

        let t2 = Instant::now();
        let par = accumulate(&store, &index, &forces, BENCH_K, true);
        let par_ms = t2.elapsed().as_secs_f64() * 1000.0;

        if let Err(err) = seq.and(par) {
            println!("# N = {n}: accumulate failed: {err}");
            continue;
        }

        let direct_ms = if n <= 10_000 {
            let t3 = Instant::now();
            let _ = accumulate_direct(&store, &forces);
            format!("{:.3}", t3.elapsed().as_secs_f64() * 1000.0)
        } else {
            "-".to_string()
        };

        println!("{n},{BENCH_K},{build_ms:.3},{seq_ms:.3},{par_ms:.3},{direct_ms}");
    }
}

/// Benchmark full simulation ticks for a range of n
/// Paste output directly into a spreadsheet to graph
pub fn bench_step_curve() {
    println!("N,step_ms");

    for n in (2_000..=40_000).step_by(2_000) {
        let steps = if n <= 10_000 { 3 } else { 1 };

        let engine = Engine {
            dimension: 3,
            total_ticks: u64::MAX,
            neighborhood: Neighborhood::Nearest(BENCH_K),
            parallel: true,
        };
        let parameters = Parameters {
            g: 0.1,
            ..Parameters::default()
        };
        let forces = parameters.interactions::<3>();

        let mut sim = match Simulation::new(engine, parameters, make_store3(n), forces) {
            Ok(sim) => sim,
            Err(err) => {
                println!("# N = {n}: {err}");
                continue;
            }
        };

        let t0 = Instant::now();
        for _ in 0..steps {
            if let Err(err) = sim.step() {
                println!("# N = {n}: {err}");
                break;
            }
        }
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / steps as f64;

        println!("{},{:.6}", n, ms);
    }
}
