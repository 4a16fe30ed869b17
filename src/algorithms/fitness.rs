use serde::{Deserialize, Serialize};

use super::checker::{ConflictReport, ScheduleChecker};
use super::schedule::Schedule;

/// Per-category penalty weights. Lower total is better.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub teacher: f64,
    pub room: f64,
    pub room_consistency: f64,
    pub class: f64,
    pub preference: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            teacher: 1.0,
            room: 1.0,
            room_consistency: 1.0,
            class: 1.0,
            preference: 0.5,
        }
    }
}

impl FitnessWeights {
    pub fn penalty(&self, report: &ConflictReport) -> f64 {
        self.teacher * report.teacher_conflicts.len() as f64
            + self.room * report.room_conflicts.len() as f64
            + self.room_consistency * report.room_consistency_conflicts.len() as f64
            + self.class * report.class_conflicts.len() as f64
            + self.preference * report.preference_conflict_ids.len() as f64
    }
}

/// Penalty of `schedule` under the checker's preferences and weights.
pub fn fitness(schedule: &Schedule, checker: &ScheduleChecker) -> f64 {
    checker.evaluate(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::checker::RoomConsistencyConflict;
    use crate::algorithms::test_support::{demand, problem};
    use std::collections::BTreeSet;

    #[test]
    fn weighted_sum_of_categories() {
        let report = ConflictReport {
            teacher_conflicts: vec![(1, 2), (3, 4)],
            room_conflicts: vec![(5, 6)],
            class_conflicts: vec![(1, 7)],
            room_consistency_conflicts: vec![RoomConsistencyConflict {
                demand_id: 9,
                rooms: vec!["A".to_string(), "B".to_string()],
                slot_ids: vec![8, 9],
            }],
            conflict_ids: BTreeSet::from([1, 2, 9]),
            preference_conflict_ids: BTreeSet::from([4, 5, 6]),
        };

        assert_eq!(FitnessWeights::default().penalty(&report), 2.0 + 1.0 + 1.0 + 1.0 + 1.5);
    }

    #[test]
    fn clean_report_scores_zero() {
        let report = ConflictReport::default();
        assert!(report.is_clean());
        assert_eq!(FitnessWeights::default().penalty(&report), 0.0);
    }

    #[test]
    fn custom_weights_scale_the_penalty() {
        let (grid, demands) = problem(1, 2, 1, vec![demand(1, "A", 1), demand(1, "B", 1)]);
        let mut schedule = Schedule::empty(grid, demands);
        schedule.occupy(1, &[0]);
        schedule.occupy(2, &[1]);

        let weights = FitnessWeights {
            teacher: 3.0,
            ..FitnessWeights::default()
        };
        assert_eq!(fitness(&schedule, &ScheduleChecker::default()), 1.0);
        assert_eq!(
            fitness(&schedule, &ScheduleChecker::default().with_weights(weights)),
            3.0
        );
    }
}
