use super::models::{Day, Room, TimePeriod, TimeSlot};

/// The fully enumerated slot space, ordered day, then room, then period.
///
/// `gaps[i]` holds the minutes between the end of slot `i` and the start of
/// slot `i + 1` when both share a day and room, `None` otherwise.
#[derive(Debug, Clone)]
pub struct Grid {
    slots: Vec<TimeSlot>,
    gaps: Vec<Option<u32>>,
}

impl Grid {
    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> &TimeSlot {
        &self.slots[index]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Gap to the following slot, if it is in the same day and room.
    #[inline]
    pub fn gap_after(&self, index: usize) -> Option<u32> {
        self.gaps.get(index).copied().flatten()
    }
}

/// Builds the grid from days, rooms and periods.
///
/// Periods are ordered chronologically before enumeration so neighbouring
/// indices within one day and room are always time-adjacent.
pub fn generate_grid(days: &[Day], rooms: &[Room], periods: &[TimePeriod]) -> Grid {
    let mut periods: Vec<&TimePeriod> = periods.iter().collect();
    periods.sort_by_key(|p| (p.start_minute, p.end_minute));

    let mut slots = Vec::with_capacity(days.len() * rooms.len() * periods.len());
    for day in days {
        for room in rooms {
            for period in &periods {
                slots.push(TimeSlot {
                    id: slots.len() + 1,
                    day: day.name.clone(),
                    room: room.name.clone(),
                    start: period.start.clone(),
                    end: period.end.clone(),
                    start_minute: period.start_minute,
                    end_minute: period.end_minute,
                });
            }
        }
    }

    let gaps = (0..slots.len())
        .map(|i| {
            let current = &slots[i];
            let next = slots.get(i + 1)?;
            if current.day != next.day || current.room != next.room {
                return None;
            }
            Some(next.start_minute.abs_diff(current.end_minute))
        })
        .collect();

    Grid { slots, gaps }
}
