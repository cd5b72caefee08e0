//! Length and style rules for agent turns.

const FILLERS: &[&str] = &["hmm", "uh", "uhs", "um", "ums", "so", "like", "well", "yeah"];

const CASE_MARKERS: &[&str] = &["the case", "case says", "case mentions", "in the case", "case notes"];

/// Splits text into sentences on `.`, `?` and `!`.
///
/// Runs of terminal punctuation ("?!", "...") close a single sentence, and a
/// trailing fragment without punctuation counts as a sentence.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '?' | '!') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if matches!(next, '.' | '?' | '!' | '"' | '\'' | ')') {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            // "3.5" is not a sentence break.
            let followed_by_space = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if followed_by_space {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    out.push(sentence);
                }
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Keeps at most `max` sentences of `text`.
pub fn cap_sentences(text: &str, max: usize) -> String {
    sentences(text)
        .into_iter()
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the sentence ends in a question mark, ignoring closing quotes.
pub fn is_question(sentence: &str) -> bool {
    sentence
        .trim_end()
        .trim_end_matches(['"', '\'', ')'])
        .ends_with('?')
}

/// Keeps at most `max` sentences of `text` that are not questions.
///
/// Used when a fixed question will close the turn, so the generated part
/// must not ask one of its own.
pub fn cap_statements(text: &str, max: usize) -> String {
    sentences(text)
        .into_iter()
        .filter(|s| !is_question(s))
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn has_filler(text: &str) -> bool {
    text.split(|c: char| !c.is_alphabetic())
        .any(|w| FILLERS.contains(&w.to_lowercase().as_str()))
}

/// Returns true if the text explicitly points at the case.
pub fn mentions_case(text: &str) -> bool {
    let lower = text.to_lowercase();
    CASE_MARKERS.iter().any(|m| lower.contains(m))
}
