//! Survey blocks shown between games.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::session::StageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    Choice { options: &'static [&'static str] },
    Text { placeholder: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: &'static str,
    pub prompt: &'static str,
    pub kind: QuestionKind,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyBlock {
    pub id: &'static str,
    /// Heading of the block's intro card.
    pub title: &'static str,
    pub blurb: &'static str,
    pub questions: Vec<Question>,
}

impl SurveyBlock {
    pub fn question_ids(&self) -> Vec<&'static str> {
        self.questions.iter().map(|q| q.id).collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurveyError {
    #[error("Missing: {question_id}")]
    Missing { question_id: &'static str },

    #[error("{question_id} is not a question of this block")]
    UnknownQuestion { question_id: String },

    #[error("{answer:?} is not an option of {question_id}")]
    InvalidOption { question_id: &'static str, answer: String },
}

const fn choice(
    id: &'static str,
    prompt: &'static str,
    options: &'static [&'static str],
) -> Question {
    Question {
        id,
        prompt,
        kind: QuestionKind::Choice { options },
        required: true,
    }
}

const fn text(id: &'static str, prompt: &'static str, placeholder: &'static str) -> Question {
    Question {
        id,
        prompt,
        kind: QuestionKind::Text { placeholder },
        required: true,
    }
}

/// The question block for a survey stage; `None` for game and bookend stages.
pub fn block(stage: StageId) -> Option<SurveyBlock> {
    let (id, title, blurb, questions) = match stage {
        StageId::Q1 => (
            "Q1",
            "Terminal Block 1",
            "Answer a few questions, then proceed.",
            vec![
                choice("Q1_mood", "How locked in are you?", &["Not at all", "Somewhat", "Fully dialed"]),
                choice("Q1_simon_strategy", "Simon strategy?", &["Pure memory", "Chunking", "Random hope"]),
                text("Q1_comment", "One sentence about the experience so far:", "It felt..."),
            ],
        ),
        StageId::Q2 => (
            "Q2",
            "Terminal Block 2",
            "More questions.",
            vec![
                choice("Q2_pressure", "How stressful was the timer?", &["Not stressful", "Medium", "High"]),
                choice("Q2_memory_feel", "Memory game felt:", &["Fair", "Tricky", "Rude"]),
                text("Q2_notes", "What did you do to go faster?", "I tried..."),
            ],
        ),
        StageId::Q3 => (
            "Q3",
            "Terminal Block 3",
            "Almost done.",
            vec![
                choice("Q3_focus", "How focused were you?", &["Low", "Medium", "High"]),
                choice("Q3_verbal_difficulty", "Verbal memory difficulty:", &["Easy", "Medium", "Hard"]),
                text("Q3_feedback", "One improvement suggestion:", "I would change..."),
            ],
        ),
        StageId::Q4 => (
            "Q4",
            "Terminal Block 4",
            "Final questions.",
            vec![
                choice("Q4_math_fun", "Math race felt:", &["Fun", "Okay", "Pain"]),
                choice("Q4_overall", "Overall experience:", &["Good", "Neutral", "Bad"]),
                text("Q4_final", "Any final comment:", "Final thoughts..."),
            ],
        ),
        _ => return None,
    };
    Some(SurveyBlock {
        id,
        title,
        blurb,
        questions,
    })
}

/// Answers collected for one showing of a block.
#[derive(Debug, Clone)]
pub struct SurveyForm {
    block: SurveyBlock,
    answers: BTreeMap<&'static str, String>,
}

impl SurveyForm {
    pub fn new(block: SurveyBlock) -> Self {
        Self {
            block,
            answers: BTreeMap::new(),
        }
    }

    pub fn block(&self) -> &SurveyBlock {
        &self.block
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    /// Record a selection or text entry. Choice answers must be one of the
    /// question's options.
    pub fn answer(&mut self, question_id: &str, value: &str) -> Result<(), SurveyError> {
        let question = self
            .block
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| SurveyError::UnknownQuestion {
                question_id: question_id.to_string(),
            })?;
        if let QuestionKind::Choice { options } = question.kind {
            if !options.contains(&value) {
                return Err(SurveyError::InvalidOption {
                    question_id: question.id,
                    answer: value.to_string(),
                });
            }
        }
        self.answers.insert(question.id, value.to_string());
        Ok(())
    }

    /// Discard everything collected so far.
    pub fn clear(&mut self) {
        self.answers.clear();
    }

    /// Validate and return one `(question id, answer)` per question, in block
    /// order. Optional questions left blank yield `None`. The first missing
    /// required question is reported.
    pub fn submit(&self) -> Result<Vec<(&'static str, Option<String>)>, SurveyError> {
        let mut out = Vec::with_capacity(self.block.questions.len());
        for q in &self.block.questions {
            let value = self
                .answers
                .get(q.id)
                .filter(|v| match q.kind {
                    QuestionKind::Choice { .. } => !v.is_empty(),
                    QuestionKind::Text { .. } => !v.trim().is_empty(),
                })
                .cloned();
            if q.required && value.is_none() {
                return Err(SurveyError::Missing { question_id: q.id });
            }
            out.push((q.id, value));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(stage: StageId) -> SurveyForm {
        let mut form = SurveyForm::new(block(stage).unwrap());
        for q in form.block().questions.clone() {
            let value = match q.kind {
                QuestionKind::Choice { options } => options[0],
                QuestionKind::Text { .. } => "fine",
            };
            form.answer(q.id, value).unwrap();
        }
        form
    }

    #[test]
    fn only_survey_stages_have_blocks() {
        for stage in StageId::ALL {
            assert_eq!(block(stage).is_some(), stage.is_survey(), "{stage}");
        }
        assert_eq!(block(StageId::Q3).unwrap().id, "Q3");
    }

    #[test]
    fn complete_form_yields_answers_in_question_order() {
        let answers = filled(StageId::Q1).submit().unwrap();
        let ids: Vec<_> = answers.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, ["Q1_mood", "Q1_simon_strategy", "Q1_comment"]);
        assert_eq!(answers[0].1.as_deref(), Some("Not at all"));
        assert_eq!(answers[2].1.as_deref(), Some("fine"));
    }

    #[test]
    fn whitespace_text_counts_as_missing() {
        let mut form = filled(StageId::Q2);
        form.answer("Q2_notes", "   \n").unwrap();
        assert_eq!(
            form.submit(),
            Err(SurveyError::Missing {
                question_id: "Q2_notes"
            })
        );
    }

    #[test]
    fn first_missing_question_is_reported() {
        let mut form = SurveyForm::new(block(StageId::Q4).unwrap());
        form.answer("Q4_final", "done").unwrap();
        let err = form.submit().unwrap_err();
        assert_eq!(err.to_string(), "Missing: Q4_math_fun");
    }

    #[test]
    fn choices_outside_the_option_list_are_rejected() {
        let mut form = SurveyForm::new(block(StageId::Q3).unwrap());
        assert!(matches!(
            form.answer("Q3_focus", "Extreme"),
            Err(SurveyError::InvalidOption { .. })
        ));
        assert!(matches!(
            form.answer("Q9_nope", "x"),
            Err(SurveyError::UnknownQuestion { .. })
        ));
        assert!(form.answer_for("Q3_focus").is_none());
    }

    #[test]
    fn optional_blank_answers_become_none() {
        let mut b = block(StageId::Q1).unwrap();
        b.questions[2].required = false;
        let mut form = SurveyForm::new(b);
        form.answer("Q1_mood", "Somewhat").unwrap();
        form.answer("Q1_simon_strategy", "Chunking").unwrap();
        let answers = form.submit().unwrap();
        assert_eq!(answers[2], ("Q1_comment", None));
    }

    #[test]
    fn clear_discards_collected_answers() {
        let mut form = filled(StageId::Q1);
        form.clear();
        assert!(form.submit().is_err());
    }
}
