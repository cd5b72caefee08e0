use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::generic_types::Party;

/// Errors raised while building a [`Scenario`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("scenario has no question")]
    MissingQuestion,
    #[error("scenario needs at least two options, found {0}")]
    TooFewOptions(usize),
    #[error("duplicate scenario option: '{0}'")]
    DuplicateOption(String),
}

/// The fixed business question and its options.
///
/// A scenario is supplied once when a session starts and never changes
/// afterwards; sessions hold it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Company or category the question is about (e.g. "Rivian").
    pub subject: String,
    pub question: String,
    pub options: Vec<String>,
}

impl Scenario {
    /// Creates a validated scenario.
    pub fn new(
        subject: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, ScenarioError> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(ScenarioError::MissingQuestion);
        }
        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(ScenarioError::TooFewOptions(options.len()));
        }
        let mut seen = HashSet::new();
        for option in &options {
            if !seen.insert(option.to_lowercase()) {
                return Err(ScenarioError::DuplicateOption(option.clone()));
            }
        }
        Ok(Self {
            subject: subject.into().trim().to_string(),
            question,
            options,
        })
    }

    /// Parses the markdown scenario format.
    ///
    /// An optional `# Subject` heading comes first, the next non-empty line is
    /// the question and every following non-empty line is an option. Options
    /// may carry list markers (`-`, `*`, `1.`, `2)`). Without a heading the
    /// subject is the first word of the question.
    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        let mut subject = None;
        let mut question = None;
        let mut options = Vec::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(heading) = line.strip_prefix('#') {
                if subject.is_none() && question.is_none() {
                    subject = Some(heading.trim_start_matches('#').trim().to_string());
                }
                continue;
            }
            if question.is_none() {
                question = Some(line.to_string());
            } else {
                options.push(strip_list_marker(line).to_string());
            }
        }

        let question = question.ok_or(ScenarioError::MissingQuestion)?;
        let subject = subject.unwrap_or_else(|| {
            question
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        Self::new(subject, question, options)
    }

    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    /// Picks the agent's side: the option after the user's, wrapping around.
    ///
    /// Always differs from `user_choice` because a scenario has at least two
    /// options.
    pub fn alternate_to(&self, user_choice: usize) -> usize {
        (user_choice + 1) % self.options.len()
    }
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return rest.trim();
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

/// A side taken in the scenario by one of the parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub owner: Party,
    /// Index into [`Scenario::options`].
    pub choice: usize,
}
