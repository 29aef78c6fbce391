// src/services/grading.rs
//
// Pure scoring logic shared by quiz and mock exam submissions.

use std::collections::{HashMap, HashSet};

use crate::models::{
    mock_exam::MockAnswerInput,
    question::QuestionWithOptions,
    submission::{AnswerDetail, SubmittedAnswer},
};

/// Result of grading a quiz submission.
#[derive(Debug)]
pub struct GradedQuiz {
    pub details: Vec<AnswerDetail>,
    pub correct_answers: i32,
}

/// `round(100 * correct / total)`, and 0 when nothing can be scored.
pub fn percentage(correct: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (100.0 * f64::from(correct) / f64::from(total)).round()
}

fn index(questions: &[QuestionWithOptions]) -> HashMap<&str, &QuestionWithOptions> {
    questions
        .iter()
        .map(|q| (q.question.id.as_str(), q))
        .collect()
}

/// An answer is correct iff the selected option exists on the question and is
/// flagged correct. Missing or foreign option ids are simply wrong.
fn is_correct(question: &QuestionWithOptions, selected: Option<&str>) -> bool {
    selected
        .and_then(|id| question.option(id))
        .is_some_and(|o| o.is_correct)
}

/// Grades every submitted answer in order. Unknown question ids still get a
/// detail row so the client sees what was ignored.
pub fn grade_quiz(answers: &[SubmittedAnswer], questions: &[QuestionWithOptions]) -> GradedQuiz {
    let by_id = index(questions);
    let mut correct_answers = 0;

    let details = answers
        .iter()
        .map(|answer| {
            let selected_id = answer.selected_option_id.as_deref();
            let Some(question) = by_id.get(answer.question_id.as_str()) else {
                return AnswerDetail {
                    question_id: answer.question_id.clone(),
                    question_text: None,
                    selected_option_id: answer.selected_option_id.clone(),
                    selected_option_text: None,
                    correct_option_id: None,
                    correct_option_text: None,
                    explanation: None,
                    is_correct: false,
                };
            };

            let selected = selected_id.and_then(|id| question.option(id));
            let correct = question.correct_option();
            let hit = is_correct(question, selected_id);
            if hit {
                correct_answers += 1;
            }

            AnswerDetail {
                question_id: answer.question_id.clone(),
                question_text: Some(question.question.question_text.clone()),
                selected_option_id: answer.selected_option_id.clone(),
                selected_option_text: selected.map(|o| o.answer_text.clone()),
                correct_option_id: correct.map(|o| o.id.clone()),
                correct_option_text: correct.map(|o| o.answer_text.clone()),
                explanation: question.question.explanation.clone(),
                is_correct: hit,
            }
        })
        .collect();

    GradedQuiz {
        details,
        correct_answers,
    }
}

/// Counts correct mock answers. Each question id is graded once (first
/// occurrence wins), only questions of `certification_id` count, and grading
/// stops after `max_questions` of them so the result never exceeds the exam size.
pub fn grade_mock(
    answers: &[MockAnswerInput],
    questions: &[QuestionWithOptions],
    certification_id: &str,
    max_questions: i32,
) -> i32 {
    let by_id = index(questions);
    let mut seen = HashSet::new();
    let mut graded = 0;
    let mut correct = 0;

    for answer in answers {
        if graded >= max_questions {
            break;
        }
        if !seen.insert(answer.question_id.as_str()) {
            continue;
        }
        let Some(question) = by_id.get(answer.question_id.as_str()) else {
            continue;
        };
        if question.question.certification_id != certification_id {
            continue;
        }
        graded += 1;
        if is_correct(question, answer.selected_answer.as_deref()) {
            correct += 1;
        }
    }

    correct
}
