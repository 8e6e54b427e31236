// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multiple-choice quiz generation over the retrieval path.
//!
//! A secondary mode reusing the same retrieval + generation contract as
//! grounded answering: retrieve the single best passage for a topic, ask
//! the model for MCQs as JSON, parse defensively. Every failure degrades
//! to an empty question list.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::answerer::{Answerer, GenerationOptions};
use super::retriever::Retriever;

/// One generated multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    /// Option label ("A".."D") to option text. BTreeMap keeps label order.
    pub options: BTreeMap<String, String>,
    pub correct_answer: String,
    pub explanation: String,
}

pub struct QuizGenerator {
    retriever: Retriever,
    answerer: Arc<dyn Answerer>,
}

impl QuizGenerator {
    pub fn new(retriever: Retriever, answerer: Arc<dyn Answerer>) -> Self {
        Self { retriever, answerer }
    }

    /// Generate up to `num_questions` MCQs about `topic`.
    ///
    /// Empty retrieval, backend failure, and unparseable output all yield
    /// an empty Vec; the quiz path is fail-soft end to end.
    pub async fn generate(&self, topic: &str, num_questions: usize) -> Vec<QuizQuestion> {
        let retrieved = self.retriever.retrieve(topic, 1).await;
        let Some(best) = retrieved.first() else {
            warn!(topic, "no context retrieved for quiz topic");
            return Vec::new();
        };

        let prompt = quiz_prompt(&best.passage.text, num_questions);
        let options = GenerationOptions {
            temperature: 0.4,
            max_output_tokens: None,
            json_output: true,
        };

        let raw = match self.answerer.generate_raw(&prompt, options).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, topic, "quiz generation failed");
                return Vec::new();
            }
        };

        match extract_questions(&raw) {
            Some(questions) => questions,
            None => {
                warn!(topic, "quiz output was not parseable JSON");
                Vec::new()
            }
        }
    }
}

fn quiz_prompt(context: &str, num_questions: usize) -> String {
    format!(
        "You are an expert exam question setter AI.\n\
Generate {num_questions} multiple-choice questions (MCQs) from the provided technical context.\n\
CONTEXT:\n\
\"{context}\"\n\
Guidelines:\n\
Each question must:\n\
Be conceptual or problem-solving oriented.\n\
Test understanding, application, or analysis, not just recall.\n\
Avoid superficial questions (e.g., asking the meaning of headings or formatting in the text).\n\
Format:\n\
Each question must have 4 options: A, B, C, D.\n\
Exactly 1 option must be correct.\n\
Provide a clear explanation for why the chosen option is correct.\n\
Output Format: JSON array with {num_questions} objects:\n\
[ {{ \"question\": \"...\", \"options\": {{\"A\": \"...\", \"B\": \"...\", \"C\": \"...\", \"D\": \"...\"}}, \
\"correct_answer\": \"A\", \"explanation\": \"...\" }}, ... ]\n\
Avoid questions that can be answered by simply spotting words in the text."
    )
}

/// Parse model output into questions: strict JSON first, then the first
/// `[...]` block for models that wrap JSON in prose.
fn extract_questions(raw: &str) -> Option<Vec<QuizQuestion>> {
    let trimmed = raw.trim();
    if let Ok(questions) = serde_json::from_str::<Vec<QuizQuestion>>(trimmed) {
        return Some(questions);
    }

    let array_block = Regex::new(r"(?s)\[.*\]").ok()?;
    let captured = array_block.find(trimmed)?;
    serde_json::from_str::<Vec<QuizQuestion>>(captured.as_str()).ok()
}
