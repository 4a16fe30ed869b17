use std::collections::BTreeMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info, warn};
use serde::Serialize;

use super::error::ScheduleError;
use super::input::Problem;
use super::models::GwoParameters;
use crate::run_experiments;

/// Inclusive search ranges for the tunable parameters.
#[derive(Debug, Clone)]
pub struct ParamRange {
    pub population_size: (usize, usize),
    pub max_iterations: (usize, usize),
    pub population_step: usize,
    pub iteration_step: usize,
}

impl Default for ParamRange {
    fn default() -> Self {
        Self {
            population_size: (10, 50),
            max_iterations: (30, 150),
            population_step: 10,
            iteration_step: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TuningReport {
    pub best_params: GwoParameters,
    pub best_fitness: f64,
    /// Every trial, keyed by the parameter being varied.
    pub experiments: BTreeMap<String, Vec<(GwoParameters, f64)>>,
}

#[derive(Debug, Clone, Copy)]
enum Tunable {
    PopulationSize,
    MaxIterations,
}

impl Tunable {
    fn name(self) -> &'static str {
        match self {
            Tunable::PopulationSize => "population_size",
            Tunable::MaxIterations => "max_iterations",
        }
    }

    fn apply(self, params: &mut GwoParameters, value: usize) {
        match self {
            Tunable::PopulationSize => params.population_size = value,
            Tunable::MaxIterations => params.max_iterations = value,
        }
    }
}

fn range_int(start: usize, end: usize, step: usize) -> Vec<usize> {
    (start.max(1)..=end).step_by(step.max(1)).collect()
}

/// Coordinate search: sweeps population size with the lower iteration bound,
/// fixes the best value, then sweeps iterations. Each trial is scored by the
/// mean best fitness over `base.num_runs` runs.
///
/// Setting `stop_flag` ends the sweep before the next trial; the report then
/// holds only the trials that ran.
pub fn optimize_by_range(
    problem: &Problem,
    range: &ParamRange,
    base: &GwoParameters,
    stop_flag: Arc<AtomicBool>,
) -> Result<TuningReport, ScheduleError> {
    info!(
        "Tuning GWO: population {:?} step {}, iterations {:?} step {}",
        range.population_size, range.population_step, range.max_iterations, range.iteration_step
    );

    let mut best_params = GwoParameters {
        population_size: range.population_size.0.max(1),
        max_iterations: range.max_iterations.0.max(1),
        ..base.clone()
    };
    let mut best_fitness = f64::INFINITY;
    let mut experiments: BTreeMap<String, Vec<(GwoParameters, f64)>> = BTreeMap::new();

    let steps = [
        (
            Tunable::PopulationSize,
            range_int(range.population_size.0, range.population_size.1, range.population_step),
        ),
        (
            Tunable::MaxIterations,
            range_int(range.max_iterations.0, range.max_iterations.1, range.iteration_step),
        ),
    ];

    for (tunable, values) in steps {
        if values.is_empty() {
            return Err(ScheduleError::InvalidParameters(format!(
                "empty search range for {}",
                tunable.name()
            )));
        }
        info!("Tuning parameter: {}", tunable.name());

        let mut step_best: Option<(usize, f64)> = None;
        for (i, &value) in values.iter().enumerate() {
            if stop_flag.load(Ordering::Relaxed) {
                warn!("Tuning stopped before {} = {}", tunable.name(), value);
                break;
            }
            let mut trial = best_params.clone();
            tunable.apply(&mut trial, value);

            let summary = run_experiments(problem, &trial, stop_flag.clone(), None)?;
            let fitness = summary.mean_fitness();
            debug!(
                "[{}/{}] {} = {} -> mean fitness {:.4}",
                i + 1,
                values.len(),
                tunable.name(),
                value,
                fitness
            );

            experiments
                .entry(tunable.name().to_string())
                .or_default()
                .push((trial, fitness));

            if step_best.map_or(true, |(_, best)| fitness < best) {
                step_best = Some((value, fitness));
            }
        }

        if let Some((value, fitness)) = step_best {
            tunable.apply(&mut best_params, value);
            best_fitness = fitness;
            info!("Best {} = {} (mean fitness {:.4})", tunable.name(), value, fitness);
        }
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }
    }

    Ok(TuningReport {
        best_params,
        best_fitness,
        experiments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::{demand, problem};

    #[test]
    fn ranges_include_both_ends() {
        assert_eq!(range_int(10, 30, 10), vec![10, 20, 30]);
        assert_eq!(range_int(0, 2, 0), vec![1, 2]);
        assert!(range_int(5, 4, 1).is_empty());
    }

    #[test]
    fn sweeps_each_parameter_in_turn() {
        let (grid, demands) = problem(1, 2, 3, vec![demand(1, "A", 1), demand(2, "B", 2)]);
        let problem = Problem {
            grid,
            demands,
            preferences: vec![],
        };
        let range = ParamRange {
            population_size: (2, 4),
            max_iterations: (5, 10),
            population_step: 2,
            iteration_step: 5,
        };
        let base = GwoParameters {
            seed: Some(3),
            num_runs: Some(2),
            ..GwoParameters::default()
        };

        let report =
            optimize_by_range(&problem, &range, &base, Arc::new(AtomicBool::new(false))).unwrap();

        assert_eq!(report.experiments["population_size"].len(), 2);
        assert_eq!(report.experiments["max_iterations"].len(), 2);
        assert!(report.experiments["population_size"]
            .iter()
            .all(|(p, _)| p.max_iterations == 5));
        assert_eq!(report.best_params.num_runs, Some(2));
        assert_eq!(report.best_fitness, 0.0);
    }

    #[test]
    fn empty_range_is_rejected() {
        let (grid, demands) = problem(1, 1, 1, vec![demand(1, "A", 1)]);
        let problem = Problem {
            grid,
            demands,
            preferences: vec![],
        };
        let range = ParamRange {
            population_size: (5, 2),
            ..ParamRange::default()
        };
        let result = optimize_by_range(
            &problem,
            &range,
            &GwoParameters::default(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(ScheduleError::InvalidParameters(_))));
    }

    #[test]
    fn raised_stop_flag_ends_the_sweep() {
        let (grid, demands) = problem(1, 1, 2, vec![demand(1, "A", 1)]);
        let problem = Problem {
            grid,
            demands,
            preferences: vec![],
        };
        let range = ParamRange {
            population_size: (2, 6),
            max_iterations: (5, 15),
            population_step: 2,
            iteration_step: 5,
        };

        let report = optimize_by_range(
            &problem,
            &range,
            &GwoParameters::default(),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        assert!(report.experiments.is_empty());
        assert_eq!(report.best_params.population_size, 2);
        assert_eq!(report.best_params.max_iterations, 5);
        assert_eq!(report.best_fitness, f64::INFINITY);
    }
}
