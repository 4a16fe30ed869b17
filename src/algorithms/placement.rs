use std::sync::Arc;

use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use super::demand::DemandList;
use super::grid::Grid;
use super::models::{Demand, DemandId};
use super::schedule::Schedule;

/// Largest gap tolerated between consecutive slots of a run in relaxed mode.
pub const RELAXED_GAP_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairMode {
    /// Same day, same room, zero gap between consecutive slots.
    Strict,
    /// Same day, same room, gaps up to [`RELAXED_GAP_MINUTES`].
    Relaxed,
    /// Single-credit demands only: any empty slot.
    Force,
}

/// A freshly constructed schedule and the demands it could not hold.
#[derive(Debug, Clone)]
pub struct Placement {
    pub schedule: Schedule,
    pub unplaced: Vec<DemandId>,
}

/// Start indices of every empty window that can hold `credits` slots.
pub fn candidate_starts(schedule: &Schedule, credits: u32, mode: RepairMode) -> Vec<usize> {
    let len = credits as usize;
    if len == 0 || len > schedule.len() {
        return Vec::new();
    }

    match mode {
        RepairMode::Force if len == 1 => schedule.free_slots().collect(),
        RepairMode::Force => Vec::new(),
        RepairMode::Strict | RepairMode::Relaxed => {
            let max_gap = if mode == RepairMode::Strict {
                0
            } else {
                RELAXED_GAP_MINUTES
            };
            (0..=schedule.len() - len)
                .filter(|&start| window_fits(schedule, start, len, max_gap))
                .collect()
        }
    }
}

fn window_fits(schedule: &Schedule, start: usize, len: usize, max_gap: u32) -> bool {
    let end = start + len;
    if !(start..end).all(|i| schedule.is_free(i)) {
        return false;
    }
    // A gap only exists between slots sharing day and room.
    (start..end - 1).all(|i| matches!(schedule.grid().gap_after(i), Some(gap) if gap <= max_gap))
}

/// Builds one schedule by placing every demand, in random order, on a random
/// strictly contiguous empty window.
pub fn place_initial<R: Rng>(
    grid: Arc<Grid>,
    demands: Arc<DemandList>,
    rng: &mut R,
) -> Placement {
    let mut order: Vec<&Demand> = demands.iter().collect();
    order.shuffle(rng);

    let mut schedule = Schedule::empty(grid.clone(), demands.clone());
    let mut unplaced = Vec::new();

    for demand in order {
        if !repair(&mut schedule, demand, RepairMode::Strict, rng) {
            debug!(
                "Failed to place demand {}: {} - {} - {}",
                demand.id, demand.class, demand.course, demand.lecturer
            );
            unplaced.push(demand.id);
        }
    }
    unplaced.sort_unstable();

    Placement { schedule, unplaced }
}

/// Places `demand` on a random empty window allowed by `mode`.
///
/// Returns `false` without touching the schedule when no window exists.
pub fn repair<R: Rng>(
    schedule: &mut Schedule,
    demand: &Demand,
    mode: RepairMode,
    rng: &mut R,
) -> bool {
    let starts = candidate_starts(schedule, demand.credits, mode);
    if starts.is_empty() {
        return false;
    }

    let start = starts[rng.random_range(0..starts.len())];
    let run: Vec<usize> = (start..start + demand.credits as usize).collect();
    trace!("Demand {} -> slots {:?} ({:?})", demand.id, run, mode);
    schedule.occupy(demand.id, &run);
    true
}
