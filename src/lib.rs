use std::sync::{atomic::AtomicBool, Arc};

use log::info;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{json, Value};

pub mod algorithms;

use algorithms::error::ScheduleError;
use algorithms::input::{Problem, TimetableInput};
use algorithms::models::{GwoParameters, OptimizationResult};
use algorithms::optimizer::ProgressReporter;

/// Outcome of `num_runs` independent optimizer runs.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSummary {
    pub best: OptimizationResult,
    /// 1-based index of the run that produced `best`.
    pub best_run: usize,
    pub all_best_fitness: Vec<f64>,
    pub fitness_histories: Vec<Vec<f64>>,
}

impl ExperimentSummary {
    pub fn mean_fitness(&self) -> f64 {
        if self.all_best_fitness.is_empty() {
            return f64::INFINITY;
        }
        self.all_best_fitness.iter().sum::<f64>() / self.all_best_fitness.len() as f64
    }
}

/// Runs the optimizer `num_runs` times in parallel, one run per rayon task.
///
/// With a seed, run `i` is seeded `seed + i` so the batch is reproducible.
pub fn run_experiments(
    problem: &Problem,
    params: &GwoParameters,
    stop_flag: Arc<AtomicBool>,
    progress: Option<&(dyn ProgressReporter + Sync)>,
) -> Result<ExperimentSummary, ScheduleError> {
    params.validate()?;
    let num_runs = params.num_runs.unwrap_or(1);
    info!("Running {} GWO experiment(s)", num_runs);

    let results = (0..num_runs)
        .into_par_iter()
        .map(|run| -> Result<OptimizationResult, ScheduleError> {
            let run_params = GwoParameters {
                seed: params.seed.map(|seed| seed.wrapping_add(run as u64)),
                ..params.clone()
            };
            let mut gwo = problem
                .optimizer(run_params)?
                .with_run_info(run + 1, num_runs);
            let progress = progress.map(|p| p as &dyn ProgressReporter);
            Ok(gwo.optimize(progress, stop_flag.clone()))
        })
        .collect::<Result<Vec<_>, ScheduleError>>()?;

    let all_best_fitness: Vec<f64> = results.iter().map(|r| r.best_fitness).collect();
    let fitness_histories = results.iter().map(|r| r.fitness_history.clone()).collect();
    let (best_index, best) = results
        .into_iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.best_fitness
                .total_cmp(&b.best_fitness)
                .then(b.coverage.placed.cmp(&a.coverage.placed))
        })
        .ok_or_else(|| ScheduleError::InvalidParameters("no runs executed".to_string()))?;

    Ok(ExperimentSummary {
        best,
        best_run: best_index + 1,
        all_best_fitness,
        fitness_histories,
    })
}

/// Service entry point: prepares the input and runs the experiments on the
/// blocking pool so the caller's runtime stays responsive.
pub async fn process_gwo(
    input: TimetableInput,
    params: GwoParameters,
    stop_flag: Arc<AtomicBool>,
) -> Result<Value, ScheduleError> {
    let problem = input.prepare()?;
    params.validate()?;

    let summary = tokio::task::spawn_blocking(move || {
        run_experiments(&problem, &params, stop_flag, None)
    })
    .await
    .map_err(|e| ScheduleError::Worker(e.to_string()))??;

    let result = json!({
        "success": true,
        "fitness": summary.best.best_fitness,
        "all_best_fitness": summary.all_best_fitness,
        "fitness_history": summary.best.fitness_history,
        "coverage": summary.best.coverage,
        "unplaced": summary.best.unplaced,
        "conflicts": summary.best.conflicts,
        "schedule": summary.best.schedule,
    });

    Ok(result)
}
