use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::PrimitiveDateTime;

use crate::db::models::{Answer, Assignment, AssignmentOption, Question, Submission};
use crate::db::types::SubmissionStatus;

use super::grading::{self, AnswerKey};
use super::store::{ensure_accepting, AssignmentStore, StoreError};
use super::types::{
    AnswerEntry, AssignmentDraft, AssignmentTree, QuestionTree, SaveReceipt,
    StudentAssignmentRow, SubmissionSummary, SubmissionWithAnswers, SubmitReceipt,
};
use super::validation::retain_known_questions;

/// Test double with the same transactional rules as the Postgres store: each
/// write works on a copy of the state and swaps it in only on success.
#[derive(Default)]
pub(crate) struct MemoryAssignmentStore {
    state: Mutex<MemoryState>,
    unavailable: AtomicBool,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    assignments: BTreeMap<i64, Assignment>,
    questions: BTreeMap<i64, Question>,
    options: BTreeMap<i64, AssignmentOption>,
    submissions: BTreeMap<i64, Submission>,
    answers: BTreeMap<(i64, i64), Answer>,
    enrollments: HashSet<(i64, String)>,
}

impl MemoryState {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn questions_of(&self, assignment_id: i64) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .questions
            .values()
            .filter(|question| question.assignment_id == assignment_id)
            .cloned()
            .collect();
        questions.sort_by_key(|question| question.position);
        questions
    }

    fn tree(&self, assignment_id: i64) -> Option<AssignmentTree> {
        let assignment = self.assignments.get(&assignment_id)?.clone();
        let questions = self
            .questions_of(assignment_id)
            .into_iter()
            .map(|question| {
                let mut options: Vec<AssignmentOption> = self
                    .options
                    .values()
                    .filter(|option| option.question_id == question.id)
                    .cloned()
                    .collect();
                options.sort_by(|left, right| left.label.cmp(&right.label));
                QuestionTree { question, options }
            })
            .collect();
        Some(AssignmentTree { assignment, questions })
    }

    fn write_draft(&mut self, assignment_id: i64, draft: &AssignmentDraft) {
        for question in &draft.questions {
            let existing = self
                .questions
                .values()
                .find(|row| row.assignment_id == assignment_id && row.position == question.position)
                .map(|row| row.id);
            let question_id = existing.unwrap_or_else(|| self.allocate());
            self.questions.insert(
                question_id,
                Question {
                    id: question_id,
                    assignment_id,
                    position: question.position,
                    question_text: question.question_text.clone(),
                    marks: question.marks,
                },
            );

            for option in &question.options {
                let existing = self
                    .options
                    .values()
                    .find(|row| row.question_id == question_id && row.label == option.label.as_str())
                    .map(|row| row.id);
                let option_id = existing.unwrap_or_else(|| self.allocate());
                self.options.insert(
                    option_id,
                    AssignmentOption {
                        id: option_id,
                        question_id,
                        label: option.label.as_str().to_string(),
                        option_text: option.text.clone(),
                        is_correct: option.is_correct,
                    },
                );
            }
        }

        let positions: HashSet<i32> = draft.questions.iter().map(|q| q.position).collect();
        let removed: HashSet<i64> = self
            .questions
            .values()
            .filter(|row| row.assignment_id == assignment_id && !positions.contains(&row.position))
            .map(|row| row.id)
            .collect();
        self.questions.retain(|id, _| !removed.contains(id));
        self.options.retain(|_, option| !removed.contains(&option.question_id));
        self.answers.retain(|(_, question_id), _| !removed.contains(question_id));
    }

    fn find_submission(&self, assignment_id: i64, student_id: i64) -> Option<&Submission> {
        self.submissions
            .values()
            .find(|row| row.assignment_id == assignment_id && row.student_id == student_id)
    }

    /// Mirrors `touch_draft` plus the answer upserts of the Postgres store.
    fn stage_answers(
        &mut self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<(i64, usize, usize), StoreError> {
        let assignment =
            self.assignments.get(&assignment_id).ok_or(StoreError::AssignmentNotFound)?;
        ensure_accepting(assignment, now)?;

        let submission_id = match self.find_submission(assignment_id, student_id) {
            Some(row) if row.status == SubmissionStatus::Submitted => {
                return Err(StoreError::AlreadySubmitted)
            }
            Some(row) => row.id,
            None => {
                let id = self.allocate();
                self.submissions.insert(
                    id,
                    Submission {
                        id,
                        assignment_id,
                        student_id,
                        status: SubmissionStatus::InProgress,
                        last_saved_at: None,
                        submitted_at: None,
                        score: None,
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };
        if let Some(row) = self.submissions.get_mut(&submission_id) {
            row.last_saved_at = Some(now);
            row.updated_at = now;
        }

        let known: HashSet<i64> =
            self.questions_of(assignment_id).into_iter().map(|question| question.id).collect();
        let (entries, skipped) = retain_known_questions(entries, &known);
        for entry in &entries {
            self.answers.insert(
                (submission_id, entry.question_id),
                Answer {
                    submission_id,
                    question_id: entry.question_id,
                    selected_label: entry.selected.map(|label| label.as_str().to_string()),
                    correct: None,
                    updated_at: now,
                },
            );
        }

        Ok((submission_id, entries.len(), skipped))
    }

    fn answer_key(&self, assignment_id: i64) -> Vec<AnswerKey> {
        self.questions_of(assignment_id)
            .into_iter()
            .map(|question| AnswerKey {
                question_id: question.id,
                correct_label: self
                    .options
                    .values()
                    .find(|option| option.question_id == question.id && option.is_correct)
                    .map(|option| option.label.clone()),
                marks: question.marks,
            })
            .collect()
    }

    fn answers_of(&self, submission_id: i64) -> Vec<Answer> {
        self.answers
            .values()
            .filter(|answer| answer.submission_id == submission_id)
            .cloned()
            .collect()
    }
}

impl MemoryAssignmentStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Simulates a storage outage: every call fails with `StoreError::Timeout`.
    pub(crate) fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Records a confirmed course selection for the student listing.
    pub(crate) fn enroll(&self, student_id: i64, course_code: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.enrollments.insert((student_id, course_code.to_lowercase()));
        }
    }

    pub(crate) fn assignment_count(&self) -> usize {
        self.state.lock().map(|state| state.assignments.len()).unwrap_or_default()
    }

    pub(crate) fn answer_rows(&self, submission_id: i64) -> Vec<Answer> {
        self.state.lock().map(|state| state.answers_of(submission_id)).unwrap_or_default()
    }

    pub(crate) fn submission(&self, assignment_id: i64, student_id: i64) -> Option<Submission> {
        let state = self.state.lock().ok()?;
        state.find_submission(assignment_id, student_id).cloned()
    }

    /// Moves a deadline so tests can cross it without sleeping.
    pub(crate) fn set_deadline(&self, assignment_id: i64, deadline: PrimitiveDateTime) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(assignment) = state.assignments.get_mut(&assignment_id) {
                assignment.deadline = deadline;
            }
        }
    }

    fn read<T>(&self, read: impl FnOnce(&MemoryState) -> T) -> Result<T, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        let state = self.state.lock().map_err(|_| StoreError::Timeout)?;
        Ok(read(&state))
    }

    fn transact<T>(
        &self,
        write: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        let mut state = self.state.lock().map_err(|_| StoreError::Timeout)?;
        let mut working = state.clone();
        let value = write(&mut working)?;
        *state = working;
        Ok(value)
    }
}

#[async_trait]
impl AssignmentStore for MemoryAssignmentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.read(|_| ())
    }

    async fn create_assignment(
        &self,
        draft: &AssignmentDraft,
        created_by: &str,
        now: PrimitiveDateTime,
    ) -> Result<i64, StoreError> {
        self.transact(|state| {
            let id = state.allocate();
            state.assignments.insert(
                id,
                Assignment {
                    id,
                    course_id: draft.course_id.clone(),
                    title: draft.title.clone(),
                    description: draft.description.clone(),
                    deadline: draft.deadline,
                    created_by: Some(created_by.to_string()),
                    created_at: now,
                    updated_at: now,
                },
            );
            state.write_draft(id, draft);
            Ok(id)
        })
    }

    async fn update_assignment(
        &self,
        assignment_id: i64,
        draft: &AssignmentDraft,
        now: PrimitiveDateTime,
    ) -> Result<Option<AssignmentTree>, StoreError> {
        self.transact(|state| {
            let Some(assignment) = state.assignments.get_mut(&assignment_id) else {
                return Ok(None);
            };
            assignment.course_id = draft.course_id.clone();
            assignment.title = draft.title.clone();
            assignment.description = draft.description.clone();
            assignment.deadline = draft.deadline;
            assignment.updated_at = now;

            state.write_draft(assignment_id, draft);
            Ok(state.tree(assignment_id))
        })
    }

    async fn find_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, StoreError> {
        self.read(|state| state.assignments.get(&assignment_id).cloned())
    }

    async fn load_assignment_tree(
        &self,
        assignment_id: i64,
    ) -> Result<Option<AssignmentTree>, StoreError> {
        self.read(|state| state.tree(assignment_id))
    }

    async fn list_submissions(
        &self,
        assignment_id: i64,
    ) -> Result<Vec<SubmissionSummary>, StoreError> {
        self.read(|state| {
            let mut rows: Vec<SubmissionSummary> = state
                .submissions
                .values()
                .filter(|row| row.assignment_id == assignment_id)
                .map(|row| SubmissionSummary {
                    submission_id: row.id,
                    student_id: row.student_id,
                    status: row.status,
                    score: row.score,
                    submitted_at: row.submitted_at,
                    last_saved_at: row.last_saved_at,
                })
                .collect();
            rows.sort_by(|left, right| {
                right
                    .submitted_at
                    .cmp(&left.submitted_at)
                    .then(right.last_saved_at.cmp(&left.last_saved_at))
                    .then(right.submission_id.cmp(&left.submission_id))
            });
            rows
        })
    }

    async fn save_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SaveReceipt, StoreError> {
        self.transact(|state| {
            let (submission_id, saved, skipped) =
                state.stage_answers(assignment_id, student_id, entries, now)?;
            Ok(SaveReceipt { submission_id, last_saved_at: now, saved, skipped })
        })
    }

    async fn submit_answers(
        &self,
        assignment_id: i64,
        student_id: i64,
        entries: &[AnswerEntry],
        now: PrimitiveDateTime,
    ) -> Result<SubmitReceipt, StoreError> {
        self.transact(|state| {
            let (submission_id, _, skipped) =
                state.stage_answers(assignment_id, student_id, entries, now)?;

            let key = state.answer_key(assignment_id);
            let selections: HashMap<i64, Option<String>> = state
                .answers_of(submission_id)
                .into_iter()
                .map(|answer| (answer.question_id, answer.selected_label))
                .collect();
            let grade = grading::grade(&key, &selections);

            for answer in state.answers.values_mut() {
                if answer.submission_id == submission_id {
                    answer.correct = Some(grade.correct_question_ids.contains(&answer.question_id));
                }
            }
            if let Some(row) = state.submissions.get_mut(&submission_id) {
                row.status = SubmissionStatus::Submitted;
                row.score = Some(grade.score);
                row.submitted_at = Some(now);
                row.updated_at = now;
            }

            Ok(SubmitReceipt { submission_id, grade, submitted_at: now, skipped })
        })
    }

    async fn list_for_student(
        &self,
        student_id: i64,
    ) -> Result<Vec<StudentAssignmentRow>, StoreError> {
        self.read(|state| {
            let mut rows: Vec<StudentAssignmentRow> = state
                .assignments
                .values()
                .filter(|assignment| {
                    state
                        .enrollments
                        .contains(&(student_id, assignment.course_id.to_lowercase()))
                })
                .map(|assignment| {
                    let submission = state.find_submission(assignment.id, student_id);
                    StudentAssignmentRow {
                        assignment_id: assignment.id,
                        title: assignment.title.clone(),
                        description: assignment.description.clone(),
                        deadline: assignment.deadline,
                        submission_status: submission.map(|row| row.status),
                        score: submission.and_then(|row| row.score),
                        submitted_at: submission.and_then(|row| row.submitted_at),
                    }
                })
                .collect();
            rows.sort_by(|left, right| {
                right
                    .deadline
                    .cmp(&left.deadline)
                    .then(right.assignment_id.cmp(&left.assignment_id))
            });
            rows
        })
    }

    async fn find_submission(
        &self,
        assignment_id: i64,
        student_id: i64,
    ) -> Result<Option<SubmissionWithAnswers>, StoreError> {
        self.read(|state| {
            state.find_submission(assignment_id, student_id).cloned().map(|submission| {
                let answers = state.answers_of(submission.id);
                SubmissionWithAnswers { submission, answers }
            })
        })
    }
}
