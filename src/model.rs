use crate::identity::Identity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

entity_id!(StudentId);
entity_id!(TutorialId);
entity_id!(AssignmentId);

/// Caller-side description of a student. Tutorials are given by name and are
/// resolved (or dropped) by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub student_no: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub handle: Option<String>,
    pub tutorials: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub student_no: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub handle: Option<String>,
    /// Ordered, no repeats.
    pub tutorials: Vec<TutorialId>,
}

impl Student {
    pub fn in_tutorial(&self, tutorial: TutorialId) -> bool {
        self.tutorials.contains(&tutorial)
    }

    /// Name of the first identity field `other` shares with `self`.
    /// Unset optional fields never match each other.
    pub fn identity_clash(&self, other: &Student) -> Option<&'static str> {
        fn both(a: &Option<String>, b: &Option<String>) -> bool {
            matches!((a, b), (Some(a), Some(b)) if a == b)
        }

        if self.name == other.name {
            Some("name")
        } else if self.student_no == other.student_no {
            Some("studentNo")
        } else if both(&self.phone, &other.phone) {
            Some("phone")
        } else if both(&self.email, &other.email) {
            Some("email")
        } else if both(&self.handle, &other.handle) {
            Some("handle")
        } else {
            None
        }
    }

    pub fn matches_key(&self, key: &str) -> bool {
        self.name == key
            || self.student_no == key
            || self.phone.as_deref() == Some(key)
            || self.email.as_deref() == Some(key)
            || self.handle.as_deref() == Some(key)
    }
}

impl Identity for Student {
    fn same_identity(&self, other: &Self) -> bool {
        self.id == other.id || self.identity_clash(other).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub id: TutorialId,
    pub name: String,
    pub assignments: Vec<AssignmentId>,
}

impl Tutorial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TutorialId::new(),
            name: name.into(),
            assignments: Vec::new(),
        }
    }
}

impl Identity for Tutorial {
    fn same_identity(&self, other: &Self) -> bool {
        self.id == other.id || self.name == other.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAssignment {
    pub name: String,
    pub due: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub tutorial: TutorialId,
    pub name: String,
    pub due: Option<NaiveDate>,
}

impl Identity for Assignment {
    // Names are only unique within the owning tutorial.
    fn same_identity(&self, other: &Self) -> bool {
        self.id == other.id || (self.tutorial == other.tutorial && self.name == other.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub tutorial: TutorialId,
    pub student: StudentId,
    pub weeks: Vec<bool>,
}

impl Attendance {
    pub fn absent(tutorial: TutorialId, student: StudentId, weeks: usize) -> Self {
        Self {
            tutorial,
            student,
            weeks: vec![false; weeks],
        }
    }

    pub fn present_count(&self) -> usize {
        self.weeks.iter().filter(|p| **p).count()
    }
}

impl Identity for Attendance {
    fn same_identity(&self, other: &Self) -> bool {
        self.tutorial == other.tutorial && self.student == other.student
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    NotSubmitted,
    Submitted,
    Graded,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::NotSubmitted,
        SubmissionStatus::Submitted,
        SubmissionStatus::Graded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::NotSubmitted => "NOT_SUBMITTED",
            SubmissionStatus::Submitted => "SUBMITTED",
            SubmissionStatus::Graded => "GRADED",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        SubmissionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == norm)
            .ok_or_else(|| {
                format!("status must be one of: NOT_SUBMITTED, SUBMITTED, GRADED (got {s:?})")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub assignment: AssignmentId,
    pub student: StudentId,
    pub status: SubmissionStatus,
}

impl Identity for Submission {
    fn same_identity(&self, other: &Self) -> bool {
        self.assignment == other.assignment && self.student == other.student
    }
}
