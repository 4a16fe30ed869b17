use hashbrown::HashMap;

use super::error::ScheduleError;
use super::models::{Course, CourseId, Demand, DemandId, Lecturer, LecturerId, TeachingRecord};

/// The flattened roster of demands, identified `1..=len` in roster order.
#[derive(Debug, Clone, Default)]
pub struct DemandList {
    demands: Vec<Demand>,
}

impl DemandList {
    /// Wraps already-built demands, renumbering them sequentially.
    pub fn new(demands: Vec<Demand>) -> Self {
        let demands = demands
            .into_iter()
            .enumerate()
            .map(|(i, demand)| Demand {
                id: i as DemandId + 1,
                ..demand
            })
            .collect();
        Self { demands }
    }

    pub fn get(&self, id: DemandId) -> Option<&Demand> {
        let index = (id as usize).checked_sub(1)?;
        self.demands.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Demand> {
        self.demands.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = DemandId> + '_ {
        self.demands.iter().map(|d| d.id)
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }
}

/// Joins teaching records with their lecturer and course rows.
pub fn build_demands(
    lecturers: &[Lecturer],
    courses: &[Course],
    teaching: &[TeachingRecord],
) -> Result<DemandList, ScheduleError> {
    let lecturer_map: HashMap<LecturerId, &Lecturer> =
        lecturers.iter().map(|l| (l.id, l)).collect();
    let course_map: HashMap<CourseId, &Course> = courses.iter().map(|c| (c.id, c)).collect();

    let demands = teaching
        .iter()
        .map(|record| {
            let lecturer = lecturer_map
                .get(&record.lecturer_id)
                .ok_or(ScheduleError::UnknownLecturer(record.lecturer_id))?;
            let course = course_map
                .get(&record.course_id)
                .ok_or(ScheduleError::UnknownCourse(record.course_id))?;
            if course.credits == 0 {
                return Err(ScheduleError::InvalidRecord(format!(
                    "course {} ({}) has zero credits",
                    course.id, course.name
                )));
            }

            Ok(Demand {
                id: 0,
                lecturer_id: lecturer.id,
                lecturer: lecturer.name.clone(),
                course_id: course.id,
                course: course.name.clone(),
                class: record.class.clone(),
                credits: course.credits,
                semester: course.semester,
                method: course.method.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DemandList::new(demands))
}
