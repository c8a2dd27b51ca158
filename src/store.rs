use crate::error::{InvariantViolation, StoreError};
use crate::identity::{has_duplicates, Identity, IdentityError, IdentityList};
use crate::model::{
    Assignment, AssignmentId, Attendance, NewAssignment, NewStudent, Student, StudentId,
    Submission, SubmissionStatus, Tutorial, TutorialId,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Owner of every entity. Cross-references between kinds are ids, resolved
/// against the lists held here.
#[derive(Debug, Clone, PartialEq)]
pub struct Store {
    weeks: usize,
    students: IdentityList<Student>,
    tutorials: IdentityList<Tutorial>,
    assignments: IdentityList<Assignment>,
    attendances: IdentityList<Attendance>,
    submissions: IdentityList<Submission>,
}

// A list operation the store already validated came back with an error.
fn unexpected(what: &str, e: IdentityError) -> StoreError {
    StoreError::Invariant(InvariantViolation(format!("{what}: {e}")))
}

fn upsert<T: Identity + Clone>(list: &mut IdentityList<T>, item: T) -> Result<(), IdentityError> {
    if list.contains_identity(&item) {
        let key = item.clone();
        list.replace(&key, item)
    } else {
        list.add(item);
        Ok(())
    }
}

impl Store {
    pub fn new(weeks: usize) -> Self {
        Self {
            weeks,
            students: IdentityList::new(),
            tutorials: IdentityList::new(),
            assignments: IdentityList::new(),
            attendances: IdentityList::new(),
            submissions: IdentityList::new(),
        }
    }

    pub fn weeks(&self) -> usize {
        self.weeks
    }

    pub fn students(&self) -> &IdentityList<Student> {
        &self.students
    }

    pub fn tutorials(&self) -> &IdentityList<Tutorial> {
        &self.tutorials
    }

    pub fn assignments(&self) -> &IdentityList<Assignment> {
        &self.assignments
    }

    pub fn attendances(&self) -> &IdentityList<Attendance> {
        &self.attendances
    }

    pub fn submissions(&self) -> &IdentityList<Submission> {
        &self.submissions
    }

    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.find_by(|s| s.id == id)
    }

    /// Canonical instance for a caller-held (possibly stale) copy.
    #[cfg(test)]
    pub fn find_student(&self, stale: &Student) -> Option<&Student> {
        self.students.find(stale)
    }

    /// Resolves a lookup key to one student. A key that parses as an id is
    /// looked up by id only. Any other key must match exactly one student on
    /// some identity field; several matches are reported with their student
    /// numbers.
    pub fn find_student_by_key(&self, key: &str) -> Result<&Student, StoreError> {
        let key = key.trim();
        if let Ok(id) = key.parse::<StudentId>() {
            return self
                .student(id)
                .ok_or_else(|| StoreError::StudentNotFound(key.to_string()));
        }
        let matches: Vec<&Student> = self.students.iter().filter(|s| s.matches_key(key)).collect();
        match matches.as_slice() {
            [] => Err(StoreError::StudentNotFound(key.to_string())),
            [one] => Ok(*one),
            many => Err(StoreError::AmbiguousStudent {
                key: key.to_string(),
                candidates: many.iter().map(|s| s.student_no.clone()).collect(),
            }),
        }
    }

    pub fn tutorial(&self, id: TutorialId) -> Option<&Tutorial> {
        self.tutorials.find_by(|t| t.id == id)
    }

    pub fn tutorial_by_name(&self, name: &str) -> Option<&Tutorial> {
        self.tutorials.find_by(|t| t.name == name)
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.assignments.find_by(|a| a.id == id)
    }

    pub fn assignment_in(&self, tutorial: TutorialId, name: &str) -> Option<&Assignment> {
        self.assignments
            .find_by(|a| a.tutorial == tutorial && a.name == name)
    }

    /// Assignments of `tutorial` in the tutorial's own order.
    pub fn assignments_of(&self, tutorial: &Tutorial) -> Vec<&Assignment> {
        tutorial
            .assignments
            .iter()
            .filter_map(|id| self.assignment(*id))
            .collect()
    }

    pub fn attendance(&self, tutorial: TutorialId, student: StudentId) -> Option<&Attendance> {
        self.attendances
            .find_by(|a| a.tutorial == tutorial && a.student == student)
    }

    pub fn submission(&self, assignment: AssignmentId, student: StudentId) -> Option<&Submission> {
        self.submissions
            .find_by(|s| s.assignment == assignment && s.student == student)
    }

    fn require_tutorial(&self, name: &str) -> Result<Tutorial, StoreError> {
        self.tutorial_by_name(name)
            .cloned()
            .ok_or_else(|| StoreError::TutorialNotFound(name.to_string()))
    }

    fn require_student(&self, id: StudentId) -> Result<Student, StoreError> {
        self.student(id)
            .cloned()
            .ok_or_else(|| StoreError::StudentNotFound(id.to_string()))
    }

    fn require_assignment(&self, tutorial: &Tutorial, name: &str) -> Result<Assignment, StoreError> {
        self.assignment_in(tutorial.id, name)
            .cloned()
            .ok_or_else(|| StoreError::AssignmentNotFound {
                tutorial: tutorial.name.clone(),
                assignment: name.to_string(),
            })
    }

    // Unknown names are dropped rather than reported; repeats collapse.
    fn resolve_tutorials(&self, names: &[String]) -> Vec<TutorialId> {
        let mut ids = Vec::new();
        for name in names {
            match self.tutorial_by_name(name) {
                Some(t) if !ids.contains(&t.id) => ids.push(t.id),
                Some(_) => {}
                None => debug!(tutorial = %name, "dropping unknown tutorial reference"),
            }
        }
        ids
    }

    fn draft_of(&self, student: &Student) -> NewStudent {
        NewStudent {
            name: student.name.clone(),
            student_no: student.student_no.clone(),
            phone: student.phone.clone(),
            email: student.email.clone(),
            handle: student.handle.clone(),
            tutorials: student
                .tutorials
                .iter()
                .filter_map(|id| self.tutorial(*id))
                .map(|t| t.name.clone())
                .collect(),
        }
    }

    fn owned_assignments(&self, tutorial: TutorialId) -> HashSet<AssignmentId> {
        self.assignments
            .iter()
            .filter(|a| a.tutorial == tutorial)
            .map(|a| a.id)
            .collect()
    }

    pub fn add_student(&mut self, new: NewStudent) -> Result<Student, StoreError> {
        let student = Student {
            id: StudentId::new(),
            tutorials: self.resolve_tutorials(&new.tutorials),
            name: new.name,
            student_no: new.student_no,
            phone: new.phone,
            email: new.email,
            handle: new.handle,
        };
        if let Some(existing) = self.students.find(&student) {
            let field = existing.identity_clash(&student).unwrap_or("id");
            return Err(StoreError::DuplicateStudent { field });
        }

        self.students.add(student.clone());
        for tutorial in &student.tutorials {
            self.attendances
                .add(Attendance::absent(*tutorial, student.id, self.weeks));
        }
        info!(student = %student.id, name = %student.name, "student added");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(student)
    }

    /// Replaces the student `id` with `edit`. Attendance follows the new
    /// tutorial set: records are created for joined tutorials, and dropped
    /// (with the student's submissions there) for tutorials left.
    pub fn set_student(&mut self, id: StudentId, edit: NewStudent) -> Result<Student, StoreError> {
        let old = self.require_student(id)?;
        let new = Student {
            id,
            tutorials: self.resolve_tutorials(&edit.tutorials),
            name: edit.name,
            student_no: edit.student_no,
            phone: edit.phone,
            email: edit.email,
            handle: edit.handle,
        };
        if let Some(field) = self
            .students
            .iter()
            .filter(|s| s.id != id)
            .find_map(|s| s.identity_clash(&new))
        {
            return Err(StoreError::DuplicateStudent { field });
        }

        self.students
            .replace(&old, new.clone())
            .map_err(|e| unexpected("replace student", e))?;

        for tutorial in new.tutorials.iter().filter(|t| !old.in_tutorial(**t)) {
            self.attendances
                .add(Attendance::absent(*tutorial, id, self.weeks));
        }
        for tutorial in old.tutorials.iter().filter(|t| !new.in_tutorial(**t)) {
            let owned = self.owned_assignments(*tutorial);
            self.attendances
                .retain(|a| !(a.tutorial == *tutorial && a.student == id));
            self.submissions
                .retain(|s| !(s.student == id && owned.contains(&s.assignment)));
            debug!(student = %id, tutorial = %tutorial, "student left tutorial");
        }

        info!(student = %id, "student updated");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(new)
    }

    pub fn enroll_student(&mut self, tutorial: &str, student: StudentId) -> Result<Student, StoreError> {
        let tutorial = self.require_tutorial(tutorial)?;
        let current = self.require_student(student)?;
        if current.in_tutorial(tutorial.id) {
            return Ok(current);
        }
        let mut draft = self.draft_of(&current);
        draft.tutorials.push(tutorial.name);
        self.set_student(student, draft)
    }

    pub fn unenroll_student(&mut self, tutorial: &str, student: StudentId) -> Result<Student, StoreError> {
        let tutorial = self.require_tutorial(tutorial)?;
        let current = self.require_student(student)?;
        if !current.in_tutorial(tutorial.id) {
            return Err(StoreError::NotEnrolled {
                tutorial: tutorial.name,
                student: current.name,
            });
        }
        let mut draft = self.draft_of(&current);
        draft.tutorials.retain(|name| *name != tutorial.name);
        self.set_student(student, draft)
    }

    pub fn remove_student(&mut self, id: StudentId) -> Result<Student, StoreError> {
        let student = self.require_student(id)?;
        self.students.remove(&student);
        self.attendances.retain(|a| a.student != id);
        self.submissions.retain(|s| s.student != id);
        info!(student = %id, name = %student.name, "student removed");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(student)
    }

    pub fn add_tutorial(&mut self, name: &str) -> Result<Tutorial, StoreError> {
        let tutorial = Tutorial::new(name);
        if !self.tutorials.add(tutorial.clone()) {
            return Err(StoreError::DuplicateTutorial(name.to_string()));
        }
        info!(tutorial = %tutorial.id, name = %name, "tutorial added");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(tutorial)
    }

    pub fn rename_tutorial(&mut self, name: &str, new_name: &str) -> Result<Tutorial, StoreError> {
        let old = self.require_tutorial(name)?;
        let renamed = Tutorial {
            name: new_name.to_string(),
            ..old.clone()
        };
        self.tutorials
            .replace(&old, renamed.clone())
            .map_err(|e| match e {
                IdentityError::DuplicateIdentity => {
                    StoreError::DuplicateTutorial(new_name.to_string())
                }
                IdentityError::NotFound => unexpected("rename tutorial", e),
            })?;
        info!(tutorial = %renamed.id, from = %name, to = %new_name, "tutorial renamed");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(renamed)
    }

    /// Removes the tutorial and everything hanging off it: memberships,
    /// attendance, its assignments and their submissions.
    pub fn remove_tutorial(&mut self, name: &str) -> Result<Tutorial, StoreError> {
        let tutorial = self.require_tutorial(name)?;
        let id = tutorial.id;

        // The only fallible step runs first.
        let students: Vec<Student> = self
            .students
            .iter()
            .cloned()
            .map(|mut s| {
                s.tutorials.retain(|t| *t != id);
                s
            })
            .collect();
        self.students
            .set_all(students)
            .map_err(|e| unexpected("rewrite students", e))?;

        let owned = self.owned_assignments(id);
        self.attendances.retain(|a| a.tutorial != id);
        self.submissions.retain(|s| !owned.contains(&s.assignment));
        self.assignments.retain(|a| a.tutorial != id);
        self.tutorials.remove(&tutorial);

        info!(
            tutorial = %id,
            name = %tutorial.name,
            assignments = owned.len(),
            "tutorial removed"
        );
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(tutorial)
    }

    pub fn add_assignment(&mut self, tutorial: &str, new: NewAssignment) -> Result<Assignment, StoreError> {
        let owner = self.require_tutorial(tutorial)?;
        let assignment = Assignment {
            id: AssignmentId::new(),
            tutorial: owner.id,
            name: new.name,
            due: new.due,
        };
        if self.assignments.contains_identity(&assignment) {
            return Err(StoreError::DuplicateAssignment {
                tutorial: owner.name,
                assignment: assignment.name,
            });
        }

        let mut updated = owner.clone();
        updated.assignments.push(assignment.id);
        self.tutorials
            .replace(&owner, updated)
            .map_err(|e| unexpected("link assignment", e))?;
        self.assignments.add(assignment.clone());

        info!(tutorial = %owner.name, assignment = %assignment.name, "assignment added");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(assignment)
    }

    pub fn set_assignment(
        &mut self,
        tutorial: &str,
        name: &str,
        edit: NewAssignment,
    ) -> Result<Assignment, StoreError> {
        let owner = self.require_tutorial(tutorial)?;
        let old = self.require_assignment(&owner, name)?;
        let new = Assignment {
            name: edit.name,
            due: edit.due,
            ..old.clone()
        };
        self.assignments
            .replace(&old, new.clone())
            .map_err(|e| match e {
                IdentityError::DuplicateIdentity => StoreError::DuplicateAssignment {
                    tutorial: owner.name.clone(),
                    assignment: new.name.clone(),
                },
                IdentityError::NotFound => unexpected("replace assignment", e),
            })?;
        info!(tutorial = %owner.name, assignment = %new.name, "assignment updated");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(new)
    }

    pub fn remove_assignment(&mut self, tutorial: &str, name: &str) -> Result<Assignment, StoreError> {
        let owner = self.require_tutorial(tutorial)?;
        let assignment = self.require_assignment(&owner, name)?;

        let mut updated = owner.clone();
        updated.assignments.retain(|a| *a != assignment.id);
        self.tutorials
            .replace(&owner, updated)
            .map_err(|e| unexpected("unlink assignment", e))?;
        self.submissions.retain(|s| s.assignment != assignment.id);
        self.assignments.remove(&assignment);

        info!(tutorial = %owner.name, assignment = %assignment.name, "assignment removed");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(assignment)
    }

    /// Creates the submission on first use, otherwise rewrites its status.
    /// Any status may follow any other.
    pub fn set_submission_status(
        &mut self,
        tutorial: &str,
        assignment: &str,
        student: StudentId,
        status: SubmissionStatus,
    ) -> Result<Submission, StoreError> {
        let owner = self.require_tutorial(tutorial)?;
        let assignment = self.require_assignment(&owner, assignment)?;
        let student = self.require_student(student)?;
        if !student.in_tutorial(owner.id) {
            return Err(StoreError::NotEnrolled {
                tutorial: owner.name,
                student: student.name,
            });
        }

        let submission = Submission {
            assignment: assignment.id,
            student: student.id,
            status,
        };
        upsert(&mut self.submissions, submission.clone())
            .map_err(|e| unexpected("upsert submission", e))?;

        debug!(
            tutorial = %owner.name,
            assignment = %assignment.name,
            student = %student.id,
            status = %status,
            "submission status set"
        );
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(submission)
    }

    /// Marks one week for the (tutorial, student) pair.
    ///
    /// # Panics
    ///
    /// If `week >= self.weeks()`. Callers validate the index first.
    pub fn set_attendance(
        &mut self,
        tutorial: &str,
        student: StudentId,
        week: usize,
        present: bool,
    ) -> Result<Attendance, StoreError> {
        assert!(
            week < self.weeks,
            "week index {week} out of range for {} weeks",
            self.weeks
        );
        let owner = self.require_tutorial(tutorial)?;
        let student = self.require_student(student)?;
        if !student.in_tutorial(owner.id) {
            return Err(StoreError::NotEnrolled {
                tutorial: owner.name,
                student: student.name,
            });
        }

        let mut record = self
            .attendance(owner.id, student.id)
            .cloned()
            .unwrap_or_else(|| Attendance::absent(owner.id, student.id, self.weeks));
        record.weeks[week] = present;
        upsert(&mut self.attendances, record.clone())
            .map_err(|e| unexpected("upsert attendance", e))?;

        debug!(tutorial = %owner.name, student = %student.id, week, present, "attendance set");
        debug_assert_eq!(self.verify(), Ok(()));
        Ok(record)
    }

    pub fn clear(&mut self) {
        self.students.clear();
        self.tutorials.clear();
        self.assignments.clear();
        self.attendances.clear();
        self.submissions.clear();
        info!("store cleared");
    }

    /// Checks every cross-entity invariant. Mutations run this in debug builds.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let fail = |msg: String| Err(InvariantViolation(msg));

        if has_duplicates(self.students.as_slice())
            || has_duplicates(self.tutorials.as_slice())
            || has_duplicates(self.assignments.as_slice())
            || has_duplicates(self.attendances.as_slice())
            || has_duplicates(self.submissions.as_slice())
        {
            return fail("duplicate identity in a list".to_string());
        }

        for tutorial in &self.tutorials {
            for id in &tutorial.assignments {
                match self.assignment(*id) {
                    Some(a) if a.tutorial == tutorial.id => {}
                    _ => return fail(format!("tutorial {} lists foreign assignment {id}", tutorial.name)),
                }
            }
        }
        for assignment in &self.assignments {
            let listed = self
                .tutorial(assignment.tutorial)
                .is_some_and(|t| t.assignments.contains(&assignment.id));
            if !listed {
                return fail(format!("assignment {} has no owning tutorial", assignment.id));
            }
        }

        for student in &self.students {
            let unique: HashSet<_> = student.tutorials.iter().collect();
            if unique.len() != student.tutorials.len() {
                return fail(format!("student {} repeats a tutorial", student.id));
            }
            for tutorial in &student.tutorials {
                if self.tutorial(*tutorial).is_none() {
                    return fail(format!("student {} references missing tutorial {tutorial}", student.id));
                }
                if self.attendance(*tutorial, student.id).is_none() {
                    return fail(format!("no attendance for student {} in {tutorial}", student.id));
                }
            }
        }

        for record in &self.attendances {
            let enrolled = self
                .student(record.student)
                .is_some_and(|s| s.in_tutorial(record.tutorial));
            if !enrolled {
                return fail(format!(
                    "attendance for {} in {} without enrollment",
                    record.student, record.tutorial
                ));
            }
            if record.weeks.len() != self.weeks {
                return fail(format!("attendance for {} has {} weeks", record.student, record.weeks.len()));
            }
        }

        for submission in &self.submissions {
            if self.assignment(submission.assignment).is_none() {
                return fail(format!("submission references missing assignment {}", submission.assignment));
            }
            if self.student(submission.student).is_none() {
                return fail(format!("submission references missing student {}", submission.student));
            }
        }

        Ok(())
    }
}
