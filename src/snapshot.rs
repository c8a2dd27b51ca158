use crate::error::StoreError;
use crate::model::{NewAssignment, NewStudent, SubmissionStatus};
use crate::store::Store;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name-keyed copy of the whole store. Students are keyed by student number,
/// which survives a reload where generated ids do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub weeks: usize,
    #[serde(default)]
    pub tutorials: Vec<TutorialRecord>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub submissions: Vec<SubmissionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialRecord {
    pub name: String,
    #[serde(default)]
    pub assignments: Vec<AssignmentRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub name: String,
    #[serde(default)]
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    pub student_no: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub tutorials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub tutorial: String,
    pub student_no: String,
    pub weeks: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub tutorial: String,
    pub assignment: String,
    pub student_no: String,
    pub status: SubmissionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("snapshot has {found} weeks, configured for {expected}")]
    WeekCountMismatch { expected: usize, found: usize },
    #[error("attendance for {student_no} in {tutorial} has {found} weeks, expected {expected}")]
    BadAttendanceRow {
        tutorial: String,
        student_no: String,
        expected: usize,
        found: usize,
    },
    #[error("snapshot references unknown student number {0}")]
    UnknownStudent(String),
}

pub fn capture(store: &Store) -> Snapshot {
    let tutorials = store
        .tutorials()
        .iter()
        .map(|t| TutorialRecord {
            name: t.name.clone(),
            assignments: store
                .assignments_of(t)
                .into_iter()
                .map(|a| AssignmentRecord {
                    name: a.name.clone(),
                    due: a.due,
                })
                .collect(),
        })
        .collect();

    let tutorial_name = |id| store.tutorial(id).map(|t| t.name.clone());
    let student_no = |id| store.student(id).map(|s| s.student_no.clone());

    let students = store
        .students()
        .iter()
        .map(|s| StudentRecord {
            name: s.name.clone(),
            student_no: s.student_no.clone(),
            phone: s.phone.clone(),
            email: s.email.clone(),
            handle: s.handle.clone(),
            tutorials: s.tutorials.iter().filter_map(|t| tutorial_name(*t)).collect(),
        })
        .collect();

    let attendance = store
        .attendances()
        .iter()
        .filter_map(|a| {
            Some(AttendanceRecord {
                tutorial: tutorial_name(a.tutorial)?,
                student_no: student_no(a.student)?,
                weeks: a.weeks.clone(),
            })
        })
        .collect();

    let submissions = store
        .submissions()
        .iter()
        .filter_map(|s| {
            let assignment = store.assignment(s.assignment)?;
            Some(SubmissionRecord {
                tutorial: tutorial_name(assignment.tutorial)?,
                assignment: assignment.name.clone(),
                student_no: student_no(s.student)?,
                status: s.status,
            })
        })
        .collect();

    Snapshot {
        weeks: store.weeks(),
        tutorials,
        students,
        attendance,
        submissions,
    }
}

/// Rebuilds a store through the public operations, in dependency order:
/// tutorials, assignments, students, attendance, submissions.
pub fn restore(snapshot: &Snapshot, weeks: usize) -> Result<Store, RestoreError> {
    if snapshot.weeks != weeks {
        return Err(RestoreError::WeekCountMismatch {
            expected: weeks,
            found: snapshot.weeks,
        });
    }
    let mut store = Store::new(weeks);

    for tutorial in &snapshot.tutorials {
        store.add_tutorial(&tutorial.name)?;
    }
    for tutorial in &snapshot.tutorials {
        for assignment in &tutorial.assignments {
            store.add_assignment(
                &tutorial.name,
                NewAssignment {
                    name: assignment.name.clone(),
                    due: assignment.due,
                },
            )?;
        }
    }
    for s in &snapshot.students {
        store.add_student(NewStudent {
            name: s.name.clone(),
            student_no: s.student_no.clone(),
            phone: s.phone.clone(),
            email: s.email.clone(),
            handle: s.handle.clone(),
            tutorials: s.tutorials.clone(),
        })?;
    }

    let resolve = |store: &Store, no: &str| {
        store
            .students()
            .iter()
            .find(|s| s.student_no == no)
            .map(|s| s.id)
            .ok_or_else(|| RestoreError::UnknownStudent(no.to_string()))
    };

    for row in &snapshot.attendance {
        if row.weeks.len() != weeks {
            return Err(RestoreError::BadAttendanceRow {
                tutorial: row.tutorial.clone(),
                student_no: row.student_no.clone(),
                expected: weeks,
                found: row.weeks.len(),
            });
        }
        let student = resolve(&store, &row.student_no)?;
        let Some(tutorial) = store.tutorial_by_name(&row.tutorial) else {
            return Err(StoreError::TutorialNotFound(row.tutorial.clone()).into());
        };
        // Checked up front so an all-absent row is refused like any other.
        if !store.student(student).is_some_and(|s| s.in_tutorial(tutorial.id)) {
            return Err(StoreError::NotEnrolled {
                tutorial: row.tutorial.clone(),
                student: row.student_no.clone(),
            }
            .into());
        }
        for (week, present) in row.weeks.iter().enumerate() {
            if *present {
                store.set_attendance(&row.tutorial, student, week, true)?;
            }
        }
    }
    for row in &snapshot.submissions {
        let student = resolve(&store, &row.student_no)?;
        store.set_submission_status(&row.tutorial, &row.assignment, student, row.status)?;
    }

    Ok(store)
}
