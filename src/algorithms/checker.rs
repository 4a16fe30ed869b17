use std::collections::BTreeSet;
use std::hash::Hash;

use hashbrown::HashMap;
use serde::Serialize;

use super::fitness::FitnessWeights;
use super::models::{
    ConflictSummary, Demand, DemandId, LecturerId, Preference, PreferenceRule, SlotStatus,
    TimeSlot,
};
use super::schedule::Schedule;

/// A demand whose run spans more than one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomConsistencyConflict {
    pub demand_id: DemandId,
    pub rooms: Vec<String>,
    pub slot_ids: Vec<usize>,
}

/// Everything wrong with one schedule.
///
/// Slot pairs are grid slot ids, earlier start first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub teacher_conflicts: Vec<(usize, usize)>,
    pub room_conflicts: Vec<(usize, usize)>,
    pub class_conflicts: Vec<(usize, usize)>,
    pub room_consistency_conflicts: Vec<RoomConsistencyConflict>,
    /// Demands touched by any hard conflict.
    pub conflict_ids: BTreeSet<DemandId>,
    /// Demands placed against their lecturer's preferences.
    pub preference_conflict_ids: BTreeSet<DemandId>,
}

impl ConflictReport {
    pub fn hard_conflict_count(&self) -> usize {
        self.teacher_conflicts.len()
            + self.room_conflicts.len()
            + self.class_conflicts.len()
            + self.room_consistency_conflicts.len()
    }

    pub fn is_clean(&self) -> bool {
        self.hard_conflict_count() == 0 && self.preference_conflict_ids.is_empty()
    }

    pub fn status_of(&self, demand: DemandId) -> SlotStatus {
        SlotStatus {
            red: self.conflict_ids.contains(&demand),
            yellow: self.preference_conflict_ids.contains(&demand),
        }
    }

    pub fn summary(&self) -> ConflictSummary {
        ConflictSummary {
            teacher_conflicts: self.teacher_conflicts.len(),
            room_conflicts: self.room_conflicts.len(),
            class_conflicts: self.class_conflicts.len(),
            room_consistency_conflicts: self.room_consistency_conflicts.len(),
            conflict_ids: self.conflict_ids.iter().copied().collect(),
            preference_conflict_ids: self.preference_conflict_ids.iter().copied().collect(),
        }
    }
}

#[derive(Clone, Copy)]
struct Entry<'a> {
    index: usize,
    slot: &'a TimeSlot,
    demand: &'a Demand,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleChecker {
    time_preferences: HashMap<LecturerId, Vec<PreferenceRule>>,
    weights: FitnessWeights,
}

impl ScheduleChecker {
    pub fn new(time_preferences: Vec<Preference>) -> Self {
        let mut by_lecturer: HashMap<LecturerId, Vec<PreferenceRule>> = HashMap::new();
        for pref in time_preferences {
            by_lecturer.entry(pref.lecturer_id).or_default().push(pref.rule);
        }

        Self {
            time_preferences: by_lecturer,
            weights: FitnessWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Penalty of the schedule; zero means conflict-free and preference-clean.
    pub fn evaluate(&self, schedule: &Schedule) -> f64 {
        self.weights.penalty(&self.detect(schedule))
    }

    pub fn detect(&self, schedule: &Schedule) -> ConflictReport {
        let entries: Vec<Entry> = schedule
            .occupied()
            .map(|(index, slot, demand)| Entry { index, slot, demand })
            .collect();

        let mut report = ConflictReport::default();
        self.check_room_consistency(schedule, &mut report);
        Self::check_teacher_conflicts(&entries, &mut report);
        Self::check_room_conflicts(&entries, &mut report);
        Self::check_class_conflicts(&entries, &mut report);
        self.check_preferences(&entries, &mut report);

        report.teacher_conflicts.sort_unstable();
        report.room_conflicts.sort_unstable();
        report.class_conflicts.sort_unstable();
        report
    }

    fn check_room_consistency(&self, schedule: &Schedule, report: &mut ConflictReport) {
        for demand_id in schedule.demands().ids() {
            let Some(run) = schedule.placement(demand_id) else {
                continue;
            };
            let rooms: BTreeSet<&str> = run
                .iter()
                .map(|&i| schedule.grid().slot(i).room.as_str())
                .collect();
            if rooms.len() > 1 {
                report.conflict_ids.insert(demand_id);
                report.room_consistency_conflicts.push(RoomConsistencyConflict {
                    demand_id,
                    rooms: rooms.into_iter().map(str::to_string).collect(),
                    slot_ids: run.iter().map(|&i| schedule.grid().slot(i).id).collect(),
                });
            }
        }
    }

    // Same lecturer, same day, overlapping windows, different demands.
    fn check_teacher_conflicts(entries: &[Entry], report: &mut ConflictReport) {
        for group in group_by(entries, |e| (e.demand.lecturer_id, e.slot.day.to_lowercase())) {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if b.slot.start_minute < a.slot.end_minute && a.demand.id != b.demand.id {
                        report.teacher_conflicts.push((a.slot.id, b.slot.id));
                        report.conflict_ids.insert(a.demand.id);
                        report.conflict_ids.insert(b.demand.id);
                    }
                }
            }
        }
    }

    // Same room, same day, overlapping windows, different classes.
    fn check_room_conflicts(entries: &[Entry], report: &mut ConflictReport) {
        for group in group_by(entries, |e| (e.slot.room.clone(), e.slot.day.to_lowercase())) {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if b.slot.start_minute < a.slot.end_minute && a.demand.class != b.demand.class
                    {
                        report.room_conflicts.push((a.slot.id, b.slot.id));
                        report.conflict_ids.insert(a.demand.id);
                        report.conflict_ids.insert(b.demand.id);
                    }
                }
            }
        }
    }

    // Same class and semester on one day; groups are start-sorted so the scan
    // stops at the first slot starting after `a` ends.
    fn check_class_conflicts(entries: &[Entry], report: &mut ConflictReport) {
        let key = |e: &Entry| (e.demand.class.clone(), e.slot.day.to_lowercase(), e.demand.semester);
        for group in group_by(entries, key) {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if b.slot.start_minute >= a.slot.end_minute {
                        break;
                    }
                    if a.demand.id == b.demand.id {
                        continue;
                    }
                    report.class_conflicts.push((a.slot.id, b.slot.id));
                    report.conflict_ids.insert(a.demand.id);
                    report.conflict_ids.insert(b.demand.id);
                }
            }
        }
    }

    fn check_preferences(&self, entries: &[Entry], report: &mut ConflictReport) {
        for entry in entries {
            let Some(rules) = self.time_preferences.get(&entry.demand.lecturer_id) else {
                continue;
            };
            if rules.iter().any(|rule| rule.is_violated_by(entry.slot)) {
                report.preference_conflict_ids.insert(entry.demand.id);
            }
        }
    }
}

/// Groups entries by `key`, each group sorted by start time then grid index.
fn group_by<'a, K, F>(entries: &[Entry<'a>], key: F) -> Vec<Vec<Entry<'a>>>
where
    K: Hash + Eq,
    F: Fn(&Entry<'a>) -> K,
{
    let mut groups: HashMap<K, Vec<Entry<'a>>> = HashMap::new();
    for entry in entries {
        groups.entry(key(entry)).or_default().push(*entry);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|e| (e.slot.start_minute, e.index));
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::demand::DemandList;
    use crate::algorithms::grid::generate_grid;
    use crate::algorithms::test_support::{days, demand, period, problem, rooms};
    use std::sync::Arc;

    fn schedule_with(
        n_rooms: usize,
        n_periods: u32,
        roster: Vec<Demand>,
        runs: &[(DemandId, &[usize])],
    ) -> Schedule {
        let (grid, demands) = problem(1, n_rooms, n_periods, roster);
        let mut schedule = Schedule::empty(grid, demands);
        for (id, run) in runs {
            schedule.occupy(*id, run);
        }
        schedule
    }

    #[test]
    fn same_teacher_same_time_is_one_conflict() {
        // Two rooms x one period: slot 0 is R1, slot 1 is R2, same hour.
        let schedule = schedule_with(
            2,
            1,
            vec![demand(1, "A", 1), demand(1, "B", 1)],
            &[(1, &[0]), (2, &[1])],
        );
        let report = ScheduleChecker::default().detect(&schedule);

        assert_eq!(report.teacher_conflicts, vec![(1, 2)]);
        assert!(report.room_conflicts.is_empty());
        assert!(report.class_conflicts.is_empty());
        assert_eq!(report.conflict_ids, BTreeSet::from([1, 2]));
        assert_eq!(report.status_of(1), SlotStatus { red: true, yellow: false });
    }

    #[test]
    fn non_overlapping_or_different_teacher_is_clean() {
        // Two rooms x two periods: R1 = slots 0,1 and R2 = slots 2,3.
        let schedule = schedule_with(
            2,
            2,
            vec![demand(1, "A", 1), demand(1, "B", 1), demand(2, "C", 1)],
            &[(1, &[0]), (2, &[3]), (3, &[2])],
        );
        let report = ScheduleChecker::default().detect(&schedule);

        assert!(report.is_clean());
        assert_eq!(report.hard_conflict_count(), 0);
    }

    #[test]
    fn same_class_same_semester_overlap() {
        let schedule = schedule_with(
            2,
            2,
            vec![demand(1, "A", 2), demand(2, "A", 1)],
            &[(1, &[0, 1]), (2, &[3])],
        );
        let report = ScheduleChecker::default().detect(&schedule);

        // Slot 4 (R2, 09:00) overlaps slot 2 (R1, 09:00) of the same class.
        assert_eq!(report.class_conflicts, vec![(2, 4)]);
        assert!(report.teacher_conflicts.is_empty());
        assert_eq!(report.conflict_ids, BTreeSet::from([1, 2]));
    }

    #[test]
    fn consecutive_slots_of_one_run_are_not_conflicts() {
        let schedule = schedule_with(1, 3, vec![demand(1, "A", 3)], &[(1, &[0, 1, 2])]);
        assert!(ScheduleChecker::default().detect(&schedule).is_clean());
    }

    #[test]
    fn split_run_is_a_room_consistency_conflict() {
        // One period, two rooms: a two-credit run forced across both.
        let schedule = schedule_with(2, 1, vec![demand(1, "A", 2)], &[(1, &[0, 1])]);
        let report = ScheduleChecker::default().detect(&schedule);

        assert_eq!(report.room_consistency_conflicts.len(), 1);
        let conflict = &report.room_consistency_conflicts[0];
        assert_eq!(conflict.rooms, vec!["R1".to_string(), "R2".to_string()]);
        assert_eq!(conflict.slot_ids, vec![1, 2]);
        assert!(report.conflict_ids.contains(&1));
    }

    #[test]
    fn preferences_mark_yellow_only() {
        let schedule = schedule_with(1, 3, vec![demand(1, "A", 1)], &[(1, &[2])]);
        let checker = ScheduleChecker::new(vec![Preference {
            lecturer_id: 1,
            rule: PreferenceRule::AvailableWindow { start: 480, end: 600 },
        }]);
        let report = checker.detect(&schedule);

        assert_eq!(report.hard_conflict_count(), 0);
        assert_eq!(report.preference_conflict_ids, BTreeSet::from([1]));
        assert_eq!(report.status_of(1), SlotStatus { red: false, yellow: true });
        assert_eq!(checker.evaluate(&schedule), 0.5);
    }

    #[test]
    fn detect_is_idempotent() {
        let schedule = schedule_with(
            2,
            2,
            vec![demand(1, "A", 1), demand(1, "A", 1), demand(1, "B", 1)],
            &[(1, &[0]), (2, &[2]), (3, &[1])],
        );
        let checker = ScheduleChecker::new(vec![Preference {
            lecturer_id: 1,
            rule: PreferenceRule::RestrictedDay {
                day: "day1".to_string(),
            },
        }]);

        let first = checker.detect(&schedule);
        let second = checker.detect(&schedule);
        assert_eq!(first, second);
        assert!(!first.is_clean());
    }

    /// One room whose two periods overlap by half an hour.
    fn overlapping_room(roster: Vec<Demand>) -> Schedule {
        let periods = vec![period(1, "08:00", "09:00"), period(2, "08:30", "09:30")];
        let grid = generate_grid(&days(&["Senin"]), &rooms(&["A"]), &periods);
        let mut schedule = Schedule::empty(Arc::new(grid), Arc::new(DemandList::new(roster)));
        schedule.occupy(1, &[0]);
        schedule.occupy(2, &[1]);
        schedule
    }

    #[test]
    fn overlapping_periods_in_one_room_clash_across_classes() {
        let schedule = overlapping_room(vec![demand(1, "A", 1), demand(2, "B", 1)]);
        let report = ScheduleChecker::default().detect(&schedule);

        assert_eq!(report.room_conflicts, vec![(1, 2)]);
        assert!(report.teacher_conflicts.is_empty());
        assert!(report.class_conflicts.is_empty());
        assert_eq!(report.conflict_ids, BTreeSet::from([1, 2]));
        assert_eq!(report.status_of(2), SlotStatus { red: true, yellow: false });
    }

    #[test]
    fn same_class_overlap_is_not_a_room_conflict() {
        let schedule = overlapping_room(vec![demand(1, "A", 1), demand(2, "A", 1)]);
        let report = ScheduleChecker::default().detect(&schedule);

        assert!(report.room_conflicts.is_empty());
        assert_eq!(report.class_conflicts, vec![(1, 2)]);
    }
}
