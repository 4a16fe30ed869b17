use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::checker::ScheduleChecker;
use super::demand::DemandList;
use super::error::ScheduleError;
use super::grid::Grid;
use super::models::{
    Coverage, GwoParameters, OptimizationProgress, OptimizationResult, Preference,
};
use super::schedule::Schedule;
use super::wolf::{Leaders, RepairOutcome, Wolf};

/// Chance per wolf per generation of being replaced by a fresh random wolf.
pub const RESTART_PROBABILITY: f64 = 0.05;

const A_START: f64 = 2.0;

/// Receives one progress event per generation and one when the run ends.
pub trait ProgressReporter {
    fn report(&self, progress: &OptimizationProgress);
}

impl<F: Fn(&OptimizationProgress)> ProgressReporter for F {
    fn report(&self, progress: &OptimizationProgress) {
        self(progress)
    }
}

/// Linearly decays from 2.0 at the first generation toward 0.0.
pub fn convergence_coefficient(iteration: usize, max_iterations: usize) -> f64 {
    A_START - iteration as f64 * (A_START / max_iterations.max(1) as f64)
}

// ============================================================================
// GWO IMPLEMENTATION
// ============================================================================
pub struct GWO {
    population: Vec<Wolf>,
    best_schedule: Option<Schedule>,
    best_fitness: f64,
    fitness_history: Vec<f64>,
    grid: Arc<Grid>,
    demands: Arc<DemandList>,
    checker: ScheduleChecker,
    parameters: GwoParameters,
    rng: StdRng,
    run_info: Option<(usize, usize)>,
}

impl GWO {
    pub fn new(
        grid: Arc<Grid>,
        demands: Arc<DemandList>,
        time_preferences: Vec<Preference>,
        parameters: GwoParameters,
    ) -> Result<Self, ScheduleError> {
        parameters.validate()?;
        let rng = match parameters.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(GWO {
            population: Vec::with_capacity(parameters.population_size),
            best_schedule: None,
            best_fitness: f64::INFINITY,
            fitness_history: Vec::with_capacity(parameters.max_iterations),
            grid,
            demands,
            checker: ScheduleChecker::new(time_preferences),
            parameters,
            rng,
            run_info: None,
        })
    }

    /// Tags progress events with `(current_run, total_runs)`.
    pub fn with_run_info(mut self, current_run: usize, total_runs: usize) -> Self {
        self.run_info = Some((current_run, total_runs));
        self
    }

    pub fn checker(&self) -> &ScheduleChecker {
        &self.checker
    }

    /// Main GWO loop. Stops on a zero-penalty leader, an exhausted budget, or
    /// the stop flag (checked between generations).
    pub fn optimize(
        &mut self,
        progress: Option<&dyn ProgressReporter>,
        stop_flag: Arc<AtomicBool>,
    ) -> OptimizationResult {
        let start_time = Instant::now();
        self.reset_optimization();

        info!(
            "Starting GWO: {} demands, {} slots, population {}, {} iterations",
            self.demands.len(),
            self.grid.len(),
            self.parameters.population_size,
            self.parameters.max_iterations
        );

        if self.grid.is_empty() {
            return self.empty_grid_result(progress, &start_time);
        }

        self.initialize_population();

        let mut iterations = 0;
        for iteration in 0..self.parameters.max_iterations {
            if stop_flag.load(Ordering::Relaxed) {
                info!("Stop requested after {} iterations", iteration);
                break;
            }
            iterations = iteration + 1;

            // Reserved for leader weighting; the discrete repair ignores it.
            let a = convergence_coefficient(iteration, self.parameters.max_iterations);

            self.rank_population();
            self.update_best();
            self.fitness_history.push(self.best_fitness);
            debug!(
                "Iteration {}/{} - Best Fitness: {}",
                iteration + 1,
                self.parameters.max_iterations,
                self.best_fitness
            );
            self.emit_progress(progress, iteration + 1, &start_time, a, false);

            if self.best_fitness <= 0.0 {
                if let Some(coverage) = self.best_schedule.as_ref().map(Schedule::coverage) {
                    if !coverage.is_complete() {
                        warn!(
                            "Zero penalty reached with only {}/{} demands placed",
                            coverage.placed, coverage.total
                        );
                    }
                }
                break;
            }

            self.update_all_wolves();
        }

        let result = self.finish(iterations);
        self.emit_progress(progress, iterations, &start_time, 0.0, true);
        info!(
            "GWO finished in {:.2?}: best fitness {}, {}/{} demands placed",
            start_time.elapsed(),
            result.best_fitness,
            result.coverage.placed,
            result.coverage.total
        );
        result
    }

    fn reset_optimization(&mut self) {
        self.population.clear();
        self.best_schedule = None;
        self.best_fitness = f64::INFINITY;
        self.fitness_history.clear();
    }

    fn initialize_population(&mut self) {
        self.population = (0..self.parameters.population_size)
            .map(|_| {
                Wolf::new(
                    self.grid.clone(),
                    self.demands.clone(),
                    &self.checker,
                    &mut self.rng,
                )
            })
            .collect();
    }

    fn rank_population(&mut self) {
        self.population.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
    }

    /// Copies the alpha out when it beats the best seen so far.
    fn update_best(&mut self) {
        if let Some(alpha) = self.population.first() {
            if alpha.fitness < self.best_fitness {
                self.best_fitness = alpha.fitness;
                self.best_schedule = Some(alpha.schedule.clone());
            }
        }
    }

    /// Moves every wolf and returns the pack's combined repair counts.
    fn update_all_wolves(&mut self) -> RepairOutcome {
        let leaders = Leaders::from_ranked(&self.population);
        let Self {
            population,
            grid,
            demands,
            checker,
            rng,
            ..
        } = self;

        let mut total = RepairOutcome::default();
        let mut restarts = 0;
        for wolf in population.iter_mut() {
            if rng.random::<f64>() < RESTART_PROBABILITY {
                *wolf = Wolf::new(grid.clone(), demands.clone(), checker, rng);
                restarts += 1;
            } else {
                total += wolf.update_position(&leaders, checker, rng);
            }
        }
        debug!(
            "Repaired {} demands, dropped {}, restarted {} wolves",
            total.repaired, total.dropped, restarts
        );
        total
    }

    fn finish(&mut self, iterations: usize) -> OptimizationResult {
        let mut best = match self.best_schedule.take() {
            Some(schedule) => schedule,
            None => {
                self.rank_population();
                match self.population.first() {
                    Some(wolf) => wolf.schedule.clone(),
                    None => Schedule::empty(self.grid.clone(), self.demands.clone()),
                }
            }
        };

        let report = self.checker.detect(&best);
        best.annotate(&report);
        let best_fitness = self.checker.evaluate(&best);
        self.best_fitness = best_fitness;

        let unplaced = best.unplaced();
        if !unplaced.is_empty() {
            warn!(
                "{} of {} demands could not be placed: {:?}",
                unplaced.len(),
                self.demands.len(),
                unplaced
            );
        }

        let result = OptimizationResult {
            schedule: best.to_output(),
            best_fitness,
            fitness_history: self.fitness_history.clone(),
            coverage: best.coverage(),
            unplaced,
            conflicts: report.summary(),
            iterations,
        };
        self.best_schedule = Some(best);
        result
    }

    /// Nothing can be placed: every demand counts as a full penalty.
    fn empty_grid_result(
        &mut self,
        progress: Option<&dyn ProgressReporter>,
        start_time: &Instant,
    ) -> OptimizationResult {
        warn!(
            "Slot grid is empty; none of the {} demands can be placed",
            self.demands.len()
        );
        self.best_fitness = self.demands.len() as f64;
        self.emit_progress(progress, 0, start_time, 0.0, true);

        OptimizationResult {
            schedule: Vec::new(),
            best_fitness: self.best_fitness,
            fitness_history: Vec::new(),
            coverage: Coverage {
                placed: 0,
                total: self.demands.len(),
            },
            unplaced: self.demands.ids().collect(),
            conflicts: Default::default(),
            iterations: 0,
        }
    }

    fn emit_progress(
        &self,
        progress: Option<&dyn ProgressReporter>,
        iteration: usize,
        start_time: &Instant,
        convergence: f64,
        is_finished: bool,
    ) {
        if let Some(reporter) = progress {
            reporter.report(&OptimizationProgress {
                iteration,
                elapsed_time: start_time.elapsed(),
                best_fitness: self.best_fitness,
                convergence,
                current_run: self.run_info.map(|(run, _)| run),
                total_runs: self.run_info.map(|(_, total)| total),
                is_finished,
            });
        }
    }

    /// Best schedule of the last run, annotated.
    pub fn best_schedule(&self) -> Option<&Schedule> {
        self.best_schedule.as_ref()
    }
}
