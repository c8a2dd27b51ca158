//! Read-only projections over the store. Everything here is recomputed from
//! the current lists on each call and handed out as owned values.

use crate::error::StoreError;
use crate::model::{Student, StudentId, SubmissionStatus, Tutorial};
use crate::store::Store;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub id: StudentId,
    pub name: String,
    pub student_no: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub handle: Option<String>,
    pub tutorials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialRoster {
    pub tutorial: String,
    pub assignments: Vec<String>,
    pub students: Vec<StudentView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRow {
    pub assignment: String,
    pub due: Option<NaiveDate>,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRow {
    pub student_id: StudentId,
    pub name: String,
    pub weeks: Vec<bool>,
    pub present: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub tutorial: String,
    pub weeks: usize,
    pub rows: Vec<AttendanceRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub not_submitted: usize,
    pub submitted: usize,
    pub graded: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOverview {
    pub tutorial: String,
    pub assignment: String,
    pub due: Option<NaiveDate>,
    pub counts: StatusCounts,
}

pub fn student_view(store: &Store, student: &Student) -> StudentView {
    StudentView {
        id: student.id,
        name: student.name.clone(),
        student_no: student.student_no.clone(),
        phone: student.phone.clone(),
        email: student.email.clone(),
        handle: student.handle.clone(),
        tutorials: student
            .tutorials
            .iter()
            .filter_map(|id| store.tutorial(*id))
            .map(|t| t.name.clone())
            .collect(),
    }
}

fn tutorial_named<'a>(store: &'a Store, name: &str) -> Result<&'a Tutorial, StoreError> {
    store
        .tutorial_by_name(name)
        .ok_or_else(|| StoreError::TutorialNotFound(name.to_string()))
}

fn enrolled<'a>(store: &'a Store, tutorial: &Tutorial) -> Vec<&'a Student> {
    let mut students: Vec<&Student> = store
        .students()
        .iter()
        .filter(|s| s.in_tutorial(tutorial.id))
        .collect();
    students.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.student_no.cmp(&b.student_no)));
    students
}

pub fn tutorial_roster(store: &Store, tutorial: &str) -> Result<TutorialRoster, StoreError> {
    let tutorial = tutorial_named(store, tutorial)?;
    Ok(TutorialRoster {
        tutorial: tutorial.name.clone(),
        assignments: store
            .assignments_of(tutorial)
            .iter()
            .map(|a| a.name.clone())
            .collect(),
        students: enrolled(store, tutorial)
            .into_iter()
            .map(|s| student_view(store, s))
            .collect(),
    })
}

pub fn rosters(store: &Store) -> Vec<TutorialRoster> {
    store
        .tutorials()
        .iter()
        .filter_map(|t| tutorial_roster(store, &t.name).ok())
        .collect()
}

/// Submissions of one student in one tutorial, in the tutorial's assignment
/// order. Assignments without a record show as not submitted.
pub fn student_submissions(
    store: &Store,
    student: StudentId,
    tutorial: &str,
) -> Result<Vec<SubmissionRow>, StoreError> {
    let tutorial = tutorial_named(store, tutorial)?;
    let student = store
        .student(student)
        .ok_or_else(|| StoreError::StudentNotFound(student.to_string()))?;
    if !student.in_tutorial(tutorial.id) {
        return Err(StoreError::NotEnrolled {
            tutorial: tutorial.name.clone(),
            student: student.name.clone(),
        });
    }

    Ok(store
        .assignments_of(tutorial)
        .into_iter()
        .map(|a| SubmissionRow {
            assignment: a.name.clone(),
            due: a.due,
            status: store
                .submission(a.id, student.id)
                .map(|s| s.status)
                .unwrap_or(SubmissionStatus::NotSubmitted),
        })
        .collect())
}

pub fn attendance_sheet(store: &Store, tutorial: &str) -> Result<AttendanceSheet, StoreError> {
    let tutorial = tutorial_named(store, tutorial)?;
    let rows = enrolled(store, tutorial)
        .into_iter()
        .map(|s| {
            let weeks = store
                .attendance(tutorial.id, s.id)
                .map(|a| a.weeks.clone())
                .unwrap_or_else(|| vec![false; store.weeks()]);
            AttendanceRow {
                student_id: s.id,
                name: s.name.clone(),
                present: weeks.iter().filter(|p| **p).count(),
                weeks,
            }
        })
        .collect();
    Ok(AttendanceSheet {
        tutorial: tutorial.name.clone(),
        weeks: store.weeks(),
        rows,
    })
}

pub fn assignment_overview(
    store: &Store,
    tutorial: &str,
    assignment: &str,
) -> Result<AssignmentOverview, StoreError> {
    let owner = tutorial_named(store, tutorial)?;
    let assignment = store
        .assignment_in(owner.id, assignment)
        .ok_or_else(|| StoreError::AssignmentNotFound {
            tutorial: owner.name.clone(),
            assignment: assignment.to_string(),
        })?;

    let mut counts = StatusCounts::default();
    for student in enrolled(store, owner) {
        let status = store
            .submission(assignment.id, student.id)
            .map(|s| s.status)
            .unwrap_or(SubmissionStatus::NotSubmitted);
        match status {
            SubmissionStatus::NotSubmitted => counts.not_submitted += 1,
            SubmissionStatus::Submitted => counts.submitted += 1,
            SubmissionStatus::Graded => counts.graded += 1,
        }
    }
    Ok(AssignmentOverview {
        tutorial: owner.name.clone(),
        assignment: assignment.name.clone(),
        due: assignment.due,
        counts,
    })
}

/// Case-insensitive substring search over name, student number, email and
/// handle. Every keyword must hit some field. An empty keyword list matches
/// everyone.
pub fn find_students(store: &Store, keywords: &[String], tutorial: Option<&str>) -> Vec<StudentView> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let tutorial = tutorial.map(|name| store.tutorial_by_name(name).map(|t| t.id));

    store
        .students()
        .iter()
        .filter(|s| match tutorial {
            None => true,
            Some(Some(id)) => s.in_tutorial(id),
            Some(None) => false,
        })
        .filter(|s| {
            let hay = [
                Some(s.name.as_str()),
                Some(s.student_no.as_str()),
                s.email.as_deref(),
                s.handle.as_deref(),
            ];
            needles.iter().all(|n| {
                hay.iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(n.as_str()))
            })
        })
        .map(|s| student_view(store, s))
        .collect()
}
