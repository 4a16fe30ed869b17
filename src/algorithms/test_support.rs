use std::sync::Arc;

use super::demand::DemandList;
use super::grid::{generate_grid, Grid};
use super::models::{Day, Demand, PeriodRecord, Room, TimePeriod};

pub(crate) fn days(names: &[&str]) -> Vec<Day> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| Day {
            id: i as u32 + 1,
            name: n.to_string(),
        })
        .collect()
}

pub(crate) fn rooms(names: &[&str]) -> Vec<Room> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| Room {
            id: i as u32 + 1,
            name: n.to_string(),
        })
        .collect()
}

pub(crate) fn period(id: u32, start: &str, end: &str) -> TimePeriod {
    TimePeriod::parse(&PeriodRecord {
        id,
        start: start.to_string(),
        end: end.to_string(),
    })
    .unwrap()
}

/// `count` back-to-back one-hour periods from 08:00.
pub(crate) fn hourly_periods(count: u32) -> Vec<TimePeriod> {
    (0..count)
        .map(|i| {
            period(
                i + 1,
                &format!("{:02}:00", 8 + i),
                &format!("{:02}:00", 9 + i),
            )
        })
        .collect()
}

pub(crate) fn demand(lecturer_id: u32, class: &str, credits: u32) -> Demand {
    Demand {
        id: 0,
        lecturer_id,
        lecturer: format!("Dosen {}", lecturer_id),
        course_id: lecturer_id * 100 + credits,
        course: format!("MK {} {}", lecturer_id, class),
        class: class.to_string(),
        credits,
        semester: 1,
        method: "Teori".to_string(),
    }
}

/// Grid of `n_days` x `n_rooms` x `n_periods` hourly slots plus a roster.
pub(crate) fn problem(
    n_days: usize,
    n_rooms: usize,
    n_periods: u32,
    demands: Vec<Demand>,
) -> (Arc<Grid>, Arc<DemandList>) {
    let day_names: Vec<String> = (1..=n_days).map(|i| format!("Day{}", i)).collect();
    let room_names: Vec<String> = (1..=n_rooms).map(|i| format!("R{}", i)).collect();
    let day_refs: Vec<&str> = day_names.iter().map(String::as_str).collect();
    let room_refs: Vec<&str> = room_names.iter().map(String::as_str).collect();

    let grid = generate_grid(&days(&day_refs), &rooms(&room_refs), &hourly_periods(n_periods));
    (Arc::new(grid), Arc::new(DemandList::new(demands)))
}
