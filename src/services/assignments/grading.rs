use std::collections::{BTreeSet, HashMap};

/// Correct answer for one question of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnswerKey {
    pub(crate) question_id: i64,
    pub(crate) correct_label: Option<String>,
    pub(crate) marks: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Grade {
    pub(crate) correct_question_ids: BTreeSet<i64>,
    pub(crate) correct_count: i64,
    pub(crate) total_q: i64,
    pub(crate) score: f64,
    pub(crate) marks_awarded: f64,
    pub(crate) marks_total: f64,
}

/// Grades stored selections against the key. Every question in the key counts
/// toward the denominator; unanswered questions and unknown labels are wrong.
/// The score is unweighted, marks are reported alongside it.
pub(crate) fn grade(key: &[AnswerKey], selections: &HashMap<i64, Option<String>>) -> Grade {
    let mut correct_question_ids = BTreeSet::new();
    let mut marks_awarded = 0.0;
    let mut marks_total = 0.0;

    for entry in key {
        marks_total += entry.marks;

        let Some(expected) = entry.correct_label.as_deref() else {
            continue;
        };
        let selected = selections.get(&entry.question_id).and_then(|value| value.as_deref());
        if selected == Some(expected) {
            correct_question_ids.insert(entry.question_id);
            marks_awarded += entry.marks;
        }
    }

    let correct_count = correct_question_ids.len() as i64;
    let total_q = key.len() as i64;

    Grade {
        correct_question_ids,
        correct_count,
        total_q,
        score: percentage(correct_count, total_q),
        marks_awarded,
        marks_total,
    }
}

/// `round(correct / total * 100, 2)`, zero when there is nothing to grade.
pub(crate) fn percentage(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    ((correct as f64 / total as f64) * 10_000.0).round() / 100.0
}
