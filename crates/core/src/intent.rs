//! Interpretation of free-text user replies.
//!
//! The controller only needs to understand three kinds of reply: the opening
//! position with its rationale, the answer to the elaboration offer, and the
//! continue/end choice at a checkpoint. Everything else is passed through to
//! the generation runtime untouched.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::scenario::Scenario;

/// Words beyond the option's own wording needed to count as a rationale.
const MIN_RATIONALE_WORDS: usize = 3;

const STOPWORDS: &[&str] = &[
    "from", "with", "that", "this", "their", "they", "them", "into", "than", "then", "which",
    "what", "would", "should", "could", "about", "have", "will", "your", "mine", "also",
];

/// Words that only serve to make the selection and never count as rationale.
const SELECTION_WORDS: &[&str] = &[
    "i", "im", "id", "ill", "pick", "choose", "chose", "go", "going", "with", "the", "option",
    "choice", "number", "one", "my", "position", "is", "a", "an", "for", "think", "say", "take",
    "ok", "okay", "so", "um", "uh", "hmm", "lets", "let", "s",
];

const ORDINALS: &[&str] = &["first", "second", "third", "fourth", "fifth", "sixth"];

const YES_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "sure", "ok", "okay", "please", "elaborate", "absolutely",
    "definitely", "certainly", "y",
];
const NO_WORDS: &[&str] = &["no", "nope", "nah", "not", "skip", "pass", "n"];
const NO_PHRASES: &[&str] = &["don't", "do not", "no thanks", "rather not"];

/// Tokens that flip the meaning of the clause they appear in.
const NEGATIONS: &[&str] = &["no", "not", "nope", "nah", "dont", "cant", "wont", "never"];

/// Hedges carry no argument on their own.
const HEDGES: &[&str] = &[
    "not", "sure", "yet", "maybe", "dunno", "idk", "know", "really", "guess", "perhaps",
    "probably", "no", "dont", "unsure", "kinda", "just",
];

/// Cues after which options named in the same clause are being rejected.
const REJECTIONS: &[&str] = &[
    "disagree", "against", "not", "instead", "rather", "reject", "dont", "wouldnt", "never",
    "avoid",
];

const END_WORDS: &[&str] = &["end", "stop", "finish", "done", "wrap", "enough", "quit", "over"];
const CONTINUE_WORDS: &[&str] = &["continue", "keep", "more", "proceed", "another", "again"];

/// The user's opening stance as read from their reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionClaim {
    /// Index into the scenario options.
    pub choice: usize,
    pub has_rationale: bool,
}

/// Answer to the elaboration offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Yes,
    No,
    Unclear,
}

/// Answer to the continue-or-end question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointChoice {
    Continue,
    End,
    Unclear,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|t| t.trim_matches('\'').to_lowercase().replace('\'', ""))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Splits a reply into clauses on punctuation.
fn clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split([',', ';', '.', '!', '?', ':'])
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn is_argument_word(token: &str) -> bool {
    !SELECTION_WORDS.contains(&token) && !HEDGES.contains(&token) && token.parse::<usize>().is_err()
}

fn keywords(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .map(String::as_str)
        .filter(|t| t.len() >= 4 && !STOPWORDS.contains(t))
        .collect()
}

/// Reads which option the user picked and whether they argued for it.
///
/// Explicit selections ("option 2", "the second one", a leading "2") win over
/// wording. Otherwise each option is scored by how many of its keywords the
/// reply mentions; ties go to the option mentioned first. Returns `None` when
/// no option can be identified.
pub fn detect_position(scenario: &Scenario, text: &str) -> Option<PositionClaim> {
    let tokens = tokenize(text);
    let choice = explicit_choice(scenario, &tokens).or_else(|| fuzzy_choice(scenario, text))?;

    let option_tokens = tokenize(&scenario.options[choice]);
    let extra = tokens
        .iter()
        .filter(|t| !option_tokens.contains(t))
        .filter(|t| is_argument_word(t))
        .count();

    Some(PositionClaim {
        choice,
        has_rationale: extra >= MIN_RATIONALE_WORDS,
    })
}

/// Returns true if a reply carries an argument on its own, for when the
/// position was named in an earlier turn.
pub fn has_argument(text: &str) -> bool {
    tokenize(text).iter().filter(|t| is_argument_word(t)).count() >= MIN_RATIONALE_WORDS
}

fn explicit_choice(scenario: &Scenario, tokens: &[String]) -> Option<usize> {
    let count = scenario.options.len();
    let index_of = |token: &str| -> Option<usize> {
        if let Ok(n) = token.parse::<usize>() {
            return (1..=count).contains(&n).then(|| n - 1);
        }
        if token.len() == 1 {
            let letter = token.chars().next()?;
            let n = (letter as usize).checked_sub('a' as usize)?;
            return (n < count).then_some(n);
        }
        None
    };

    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).map(String::as_str);
        match token.as_str() {
            "option" | "choice" | "number" => {
                if let Some(n) = next.and_then(index_of) {
                    return Some(n);
                }
            }
            t if ORDINALS.contains(&t) => {
                if matches!(next, Some("one" | "option" | "choice")) {
                    let n = ORDINALS.iter().position(|o| *o == t)?;
                    if n < count {
                        return Some(n);
                    }
                }
            }
            _ => {}
        }
    }

    // A bare leading number, e.g. "2, because ...".
    tokens
        .first()
        .filter(|t| t.parse::<usize>().is_ok())
        .and_then(|t| index_of(t))
}

fn fuzzy_choice(scenario: &Scenario, text: &str) -> Option<usize> {
    let matcher = SkimMatcherV2::default().ignore_case();

    // Words after a rejection cue ("not", "rather than", "disagree with")
    // name the option being argued against, so they do not count.
    let mut user_words: Vec<(usize, String)> = Vec::new();
    let mut at = 0;
    for clause in clauses(text) {
        let mut rejecting = false;
        for token in tokenize(clause) {
            if REJECTIONS.contains(&token.as_str()) {
                rejecting = true;
            } else if !rejecting && token.len() >= 4 && !STOPWORDS.contains(&token.as_str()) {
                user_words.push((at, token));
            }
            at += 1;
        }
    }

    let similar = |keyword: &str, word: &str| {
        let (long, short) = if keyword.len() >= word.len() {
            (keyword, word)
        } else {
            (word, keyword)
        };
        short.len() * 2 >= long.len() && matcher.fuzzy_match(long, short).is_some()
    };

    let mut best: Option<(usize, usize, usize)> = None;
    let mut tied = false;
    for (choice, option) in scenario.options.iter().enumerate() {
        let option_tokens = tokenize(option);
        let mut hits = 0;
        let mut first_at = usize::MAX;
        for keyword in keywords(&option_tokens) {
            if let Some((at, _)) = user_words.iter().find(|(_, w)| similar(keyword, w.as_str())) {
                hits += 1;
                first_at = first_at.min(*at);
            }
        }
        if hits == 0 {
            continue;
        }
        match best {
            Some((_, best_hits, best_at))
                if hits < best_hits || (hits == best_hits && first_at > best_at) => {}
            Some((_, best_hits, best_at)) if hits == best_hits && first_at == best_at => {
                tied = true;
            }
            _ => {
                best = Some((choice, hits, first_at));
                tied = false;
            }
        }
    }

    if tied { None } else { best.map(|(choice, _, _)| choice) }
}

/// Reads the answer to "would you like me to elaborate?".
///
/// Clauses are read in order and the first one that answers decides, so in
/// "yes, I'm not sure what the case says" the leading yes wins. Within a
/// clause a negation beats a yes word, except for "why not".
pub fn consent(text: &str) -> Consent {
    for clause in clauses(&text.to_lowercase()) {
        if clause.contains("why not") {
            return Consent::Yes;
        }
        let tokens = tokenize(clause);
        let said = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

        if NO_PHRASES.iter().any(|p| clause.contains(p)) || said(NO_WORDS) {
            return Consent::No;
        }
        if said(YES_WORDS) || clause.contains("go ahead") || clause.contains("go for it") {
            return Consent::Yes;
        }
    }
    Consent::Unclear
}

/// Reads the answer to "continue or end?".
///
/// A negated clause flips its meaning: "I don't want to continue" and "no
/// more" ask to end, "don't stop" asks to go on.
pub fn checkpoint_choice(text: &str) -> CheckpointChoice {
    let mut wants_end = false;
    let mut wants_more = false;
    for clause in clauses(&text.to_lowercase()) {
        let tokens = tokenize(clause);
        let said = |words: &[&str]| tokens.iter().any(|t| words.contains(&t.as_str()));

        let end = said(END_WORDS);
        let more = said(CONTINUE_WORDS) || clause.contains("go on");
        if said(NEGATIONS) {
            wants_end |= more;
            wants_more |= end;
        } else {
            wants_end |= end;
            wants_more |= more;
        }
    }
    match (wants_end, wants_more) {
        (true, false) => CheckpointChoice::End,
        (false, true) => CheckpointChoice::Continue,
        _ => CheckpointChoice::Unclear,
    }
}
