use std::time::Instant;

use crate::engine::params::{BackendKind, RunConfig};
use crate::engine::runner::run_blocked;
use crate::error::EngineError;
use crate::kernels::Gravity;
use crate::spatial::index::SpatialIndex;
use crate::spatial::states::NVec4;

/// Helper to build `n` deterministic points, no rand needed
fn make_points(n: usize, extent: f64) -> Vec<NVec4> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            NVec4::new(
                ((i_f * 0.37).sin() * 0.5 + 0.5) * extent,
                ((i_f * 0.13).cos() * 0.5 + 0.5) * extent,
                ((i_f * 0.07).sin() * 0.5 + 0.5) * extent,
                1.0,
            )
        })
        .collect()
}

/// Time the exact CPU baseline against the batched path on both backends.
///
/// Every point is also a query. Output is CSV so it can be pasted straight
/// into a spreadsheet.
pub fn bench_traversal(num_threads: usize) -> Result<(), EngineError> {
    let ns = [1_000, 2_000, 4_000, 8_000, 16_000, 32_000, 64_000];

    let base = RunConfig {
        num_threads,
        theta: 0.5,
        ..RunConfig::default()
    };

    println!("N,cpu_ms,inline_ms,threaded_ms,batches");

    for n in ns {
        let points = make_points(n, 1000.0);
        let index = SpatialIndex::build(&points, base.octree_params())?;
        let config = base.clone();

        let cpu = RunConfig {
            cpu: true,
            ..config.clone()
        };
        let inline = RunConfig {
            backend: BackendKind::Inline,
            ..config.clone()
        };
        let threaded = RunConfig {
            backend: BackendKind::Threaded,
            ..config
        };

        // Warm up
        run_blocked(&index, &points, &inline, Gravity::default())?;

        let t0 = Instant::now();
        run_blocked(&index, &points, &cpu, Gravity::default())?;
        let ms_cpu = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        run_blocked(&index, &points, &inline, Gravity::default())?;
        let ms_inline = t1.elapsed().as_secs_f64() * 1000.0;

        let t2 = Instant::now();
        let report = run_blocked(&index, &points, &threaded, Gravity::default())?;
        let ms_threaded = t2.elapsed().as_secs_f64() * 1000.0;

        println!(
            "{},{:.3},{:.3},{:.3},{}",
            n,
            ms_cpu,
            ms_inline,
            ms_threaded,
            report.total_batches()
        );
    }

    Ok(())
}
