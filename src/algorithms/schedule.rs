use std::sync::Arc;

use hashbrown::HashMap;

use super::checker::ConflictReport;
use super::demand::DemandList;
use super::grid::Grid;
use super::models::{
    Coverage, Demand, DemandId, Occupancy, OptimizedSlot, SlotState, SlotStatus, TimeSlot,
};

/// One candidate timetable: an occupancy state per grid slot.
///
/// The grid and roster are shared between every schedule of a run; only the
/// occupancy vector and the per-demand run index are owned.
#[derive(Debug, Clone)]
pub struct Schedule {
    grid: Arc<Grid>,
    demands: Arc<DemandList>,
    cells: Vec<SlotState>,
    runs: HashMap<DemandId, Vec<usize>>,
}

impl Schedule {
    pub fn empty(grid: Arc<Grid>, demands: Arc<DemandList>) -> Self {
        Self {
            cells: vec![SlotState::Empty; grid.len()],
            runs: HashMap::with_capacity(demands.len()),
            grid,
            demands,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn demands(&self) -> &DemandList {
        &self.demands
    }

    pub fn shared_demands(&self) -> Arc<DemandList> {
        Arc::clone(&self.demands)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn state(&self, index: usize) -> SlotState {
        self.cells[index]
    }

    #[inline]
    pub fn is_free(&self, index: usize) -> bool {
        self.cells[index].is_empty()
    }

    /// Slot indices of the demand's run, in grid order.
    pub fn placement(&self, demand: DemandId) -> Option<&[usize]> {
        self.runs.get(&demand).map(Vec::as_slice)
    }

    /// Places `demand` on `indices`, replacing any previous run it had.
    pub fn occupy(&mut self, demand: DemandId, indices: &[usize]) {
        self.clear_demand(demand);
        debug_assert!(indices.iter().all(|&i| self.is_free(i)));

        for &index in indices {
            self.cells[index] = SlotState::Occupied(Occupancy {
                demand,
                status: SlotStatus::default(),
            });
        }
        let mut run = indices.to_vec();
        run.sort_unstable();
        self.runs.insert(demand, run);
    }

    /// Empties the demand's slots and returns the indices it held.
    pub fn clear_demand(&mut self, demand: DemandId) -> Vec<usize> {
        let run = self.runs.remove(&demand).unwrap_or_default();
        for &index in &run {
            self.cells[index] = SlotState::Empty;
        }
        run
    }

    pub fn free_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(i, _)| i)
    }

    /// Every occupied slot with its grid cell and demand.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &TimeSlot, &Demand)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(i, cell)| {
            let demand = self.demands.get(cell.demand()?)?;
            Some((i, self.grid.slot(i), demand))
        })
    }

    pub fn coverage(&self) -> Coverage {
        Coverage {
            placed: self.runs.len(),
            total: self.demands.len(),
        }
    }

    pub fn unplaced(&self) -> Vec<DemandId> {
        self.demands
            .ids()
            .filter(|id| !self.runs.contains_key(id))
            .collect()
    }

    /// Marks occupied slots red for hard conflicts and yellow for
    /// preference violations.
    pub fn annotate(&mut self, report: &ConflictReport) {
        for cell in self.cells.iter_mut() {
            if let SlotState::Occupied(occupancy) = cell {
                occupancy.status = report.status_of(occupancy.demand);
            }
        }
    }

    pub fn to_output(&self) -> Vec<OptimizedSlot> {
        self.cells
            .iter()
            .zip(self.grid.slots())
            .map(|(cell, slot)| {
                let occupant = match cell {
                    SlotState::Empty => None,
                    SlotState::Occupied(occupancy) => self
                        .demands
                        .get(occupancy.demand)
                        .map(|demand| (demand, occupancy.status)),
                };
                OptimizedSlot::new(slot, occupant)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::{demand, problem};

    #[test]
    fn occupy_and_clear_keep_index_in_sync() {
        let (grid, demands) = problem(1, 2, 3, vec![demand(1, "A", 2), demand(2, "B", 1)]);
        let mut schedule = Schedule::empty(grid, demands);

        schedule.occupy(1, &[1, 0]);
        assert_eq!(schedule.placement(1), Some(&[0, 1][..]));
        assert_eq!(schedule.state(0).demand(), Some(1));
        assert_eq!(schedule.coverage(), Coverage { placed: 1, total: 2 });
        assert_eq!(schedule.unplaced(), vec![2]);

        schedule.occupy(1, &[4, 5]);
        assert!(schedule.is_free(0));
        assert_eq!(schedule.placement(1), Some(&[4, 5][..]));

        assert_eq!(schedule.clear_demand(1), vec![4, 5]);
        assert!(schedule.placement(1).is_none());
        assert_eq!(schedule.free_slots().count(), 6);
    }

    #[test]
    fn output_carries_demand_fields() {
        let (grid, demands) = problem(1, 1, 2, vec![demand(7, "TI-A", 1)]);
        let mut schedule = Schedule::empty(grid, demands);
        schedule.occupy(1, &[1]);

        let output = schedule.to_output();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].demand_id, None);
        assert_eq!(output[0].status, None);
        assert_eq!(output[1].demand_id, Some(1));
        assert_eq!(output[1].lecturer_id, Some(7));
        assert_eq!(output[1].class.as_deref(), Some("TI-A"));
        assert_eq!(output[1].slot_id, 2);
    }
}
