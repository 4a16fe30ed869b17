use std::sync::Arc;

use hashbrown::HashMap;
use log::trace;
use rand::Rng;

use super::checker::ScheduleChecker;
use super::demand::DemandList;
use super::grid::Grid;
use super::models::DemandId;
use super::placement::{place_initial, repair, RepairMode};
use super::schedule::Schedule;

/// Plain-mode retries before falling back to relaxed and forced placement.
pub const STRICT_REPAIR_ATTEMPTS: usize = 5;

/// One member of the pack: a candidate schedule and its penalty.
#[derive(Debug, Clone)]
pub struct Wolf {
    pub schedule: Schedule,
    pub fitness: f64,
}

/// How a position update went for one wolf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub repaired: usize,
    /// Demands cleared and left unplaced for this generation.
    pub dropped: usize,
}

impl std::ops::AddAssign for RepairOutcome {
    fn add_assign(&mut self, other: Self) {
        self.repaired += other.repaired;
        self.dropped += other.dropped;
    }
}

impl Wolf {
    /// Random wolf from a fresh constructive placement.
    pub fn new<R: Rng>(
        grid: Arc<Grid>,
        demands: Arc<DemandList>,
        checker: &ScheduleChecker,
        rng: &mut R,
    ) -> Self {
        let schedule = place_initial(grid, demands, rng).schedule;
        let fitness = checker.evaluate(&schedule);
        Self { schedule, fitness }
    }

    /// Moves the wolf toward the leaders by re-placing each demand involved
    /// in a hard conflict, then re-scores it.
    pub fn update_position<R: Rng>(
        &mut self,
        leaders: &Leaders,
        checker: &ScheduleChecker,
        rng: &mut R,
    ) -> RepairOutcome {
        let mut outcome = RepairOutcome::default();
        let report = checker.detect(&self.schedule);
        if report.conflict_ids.is_empty() {
            return outcome;
        }

        let demands = self.schedule.shared_demands();
        for id in report.conflict_ids {
            if self.schedule.placement(id).is_none() || leaders.guide(id).is_none() {
                continue;
            }
            let Some(demand) = demands.get(id) else {
                continue;
            };

            self.schedule.clear_demand(id);
            let placed = (0..STRICT_REPAIR_ATTEMPTS)
                .any(|_| repair(&mut self.schedule, demand, RepairMode::Strict, rng))
                || repair(&mut self.schedule, demand, RepairMode::Relaxed, rng)
                || repair(&mut self.schedule, demand, RepairMode::Force, rng);

            if placed {
                outcome.repaired += 1;
            } else {
                trace!("Demand {} left unplaced after repair", id);
                outcome.dropped += 1;
            }
        }

        self.fitness = checker.evaluate(&self.schedule);
        outcome
    }
}

/// Placement snapshot of the alpha, beta and delta wolves: demand to the
/// first grid index of its run.
#[derive(Debug, Clone, Default)]
pub struct Leaders {
    alpha: HashMap<DemandId, usize>,
    beta: HashMap<DemandId, usize>,
    delta: HashMap<DemandId, usize>,
}

impl Leaders {
    /// Takes the three leaders from a population sorted by ascending fitness.
    /// Smaller packs reuse the last available wolf.
    pub fn from_ranked(population: &[Wolf]) -> Self {
        let Some(last) = population.len().checked_sub(1) else {
            return Self::default();
        };
        let snapshot = |rank: usize| starts(&population[rank.min(last)].schedule);

        Self {
            alpha: snapshot(0),
            beta: snapshot(1),
            delta: snapshot(2),
        }
    }

    /// Run start of `demand` in the first leader that has it placed.
    pub fn guide(&self, demand: DemandId) -> Option<usize> {
        [&self.alpha, &self.beta, &self.delta]
            .into_iter()
            .find_map(|leader| leader.get(&demand).copied())
    }
}

fn starts(schedule: &Schedule) -> HashMap<DemandId, usize> {
    schedule
        .demands()
        .ids()
        .filter_map(|id| Some((id, *schedule.placement(id)?.first()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::grid::generate_grid;
    use crate::algorithms::test_support::{days, demand, period, problem, rooms};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn leaders_fall_back_in_rank_order() {
        let (grid, demands) = problem(1, 1, 3, vec![demand(1, "A", 1), demand(2, "B", 1)]);
        let mut alpha = Schedule::empty(grid.clone(), demands.clone());
        alpha.occupy(1, &[2]);
        let mut beta = Schedule::empty(grid, demands);
        beta.occupy(1, &[0]);
        beta.occupy(2, &[1]);

        let pack = vec![
            Wolf {
                schedule: alpha,
                fitness: 0.0,
            },
            Wolf {
                schedule: beta,
                fitness: 1.0,
            },
        ];
        let leaders = Leaders::from_ranked(&pack);

        assert_eq!(leaders.guide(1), Some(2));
        assert_eq!(leaders.guide(2), Some(1));
        assert_eq!(leaders.guide(3), None);
        assert_eq!(Leaders::from_ranked(&[]).guide(1), None);
    }

    #[test]
    fn update_resolves_teacher_clash() {
        // Two rooms x two periods; both demands of lecturer 1 start at 08:00.
        let (grid, demands) = problem(1, 2, 2, vec![demand(1, "A", 1), demand(1, "B", 1)]);
        let checker = ScheduleChecker::default();
        let mut schedule = Schedule::empty(grid, demands);
        schedule.occupy(1, &[0]);
        schedule.occupy(2, &[2]);
        let mut wolf = Wolf {
            fitness: checker.evaluate(&schedule),
            schedule,
        };
        assert_eq!(wolf.fitness, 1.0);

        let leaders = Leaders::from_ranked(std::slice::from_ref(&wolf));
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = wolf.update_position(&leaders, &checker, &mut rng);

        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.repaired, 2);
        assert_eq!(wolf.schedule.coverage().placed, 2);
        assert_eq!(wolf.fitness, checker.evaluate(&wolf.schedule));
    }

    #[test]
    fn clean_wolf_is_left_alone() {
        let (grid, demands) = problem(1, 1, 2, vec![demand(1, "A", 1)]);
        let checker = ScheduleChecker::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut wolf = Wolf::new(grid, demands, &checker, &mut rng);
        let before = wolf.schedule.placement(1).map(<[usize]>::to_vec);

        let leaders = Leaders::from_ranked(std::slice::from_ref(&wolf));
        let outcome = wolf.update_position(&leaders, &checker, &mut rng);

        assert_eq!(outcome, RepairOutcome::default());
        assert_eq!(wolf.schedule.placement(1).map(<[usize]>::to_vec), before);
        assert_eq!(wolf.fitness, 0.0);
    }

    #[test]
    fn repair_falls_back_to_relaxed_window() {
        // A 3-minute break splits every room, so no strict 2-slot window exists.
        let periods = vec![period(1, "08:00", "08:50"), period(2, "08:53", "09:40")];
        let grid = generate_grid(&days(&["Senin"]), &rooms(&["A", "B"]), &periods);
        let demands = DemandList::new(vec![demand(1, "A", 2), demand(1, "B", 1)]);
        let checker = ScheduleChecker::default();
        let mut schedule = Schedule::empty(Arc::new(grid), Arc::new(demands));
        schedule.occupy(1, &[0, 1]);
        schedule.occupy(2, &[2]);
        let mut wolf = Wolf {
            fitness: checker.evaluate(&schedule),
            schedule,
        };
        assert!(wolf.fitness > 0.0);

        let leaders = Leaders::from_ranked(std::slice::from_ref(&wolf));
        let mut rng = StdRng::seed_from_u64(13);
        let outcome = wolf.update_position(&leaders, &checker, &mut rng);

        // Slot 2 is still held when demand 1 is re-placed, leaving room A's
        // relaxed window as the only fit.
        assert_eq!(outcome, RepairOutcome { repaired: 2, dropped: 0 });
        assert_eq!(wolf.schedule.placement(1), Some(&[0, 1][..]));
        assert_eq!(wolf.schedule.coverage().placed, 2);
    }
}
