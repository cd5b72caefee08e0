//! Prompt Composition
//!
//! Builds the per-turn system prompt from the persona text, the scenario and
//! the current directive. Replies that must not depend on the generation
//! runtime (the opening and its re-prompts, which must never leak the agent's
//! position) are scripted here instead.

use std::fmt::Write;

use crate::{
    generic_types::GenerationSettings,
    phase::{EXCHANGE_TURNS_PER_CHECKPOINT, Phase},
    scenario::Scenario,
    session::{Directive, Elaboration, MissingOpening, StudySession},
};

/// Lists options inline: "(1) A or (2) B", "(1) A, (2) B, or (3) C".
pub fn enumerate_options(scenario: &Scenario) -> String {
    let items: Vec<String> = scenario
        .options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("({}) {}", i + 1, o))
        .collect();
    match items.as_slice() {
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
        [] => String::new(),
    }
}

/// The first agent message: restates the question, lists every option and
/// asks for a position with an opening argument.
pub fn opening_message(scenario: &Scenario) -> String {
    let question = scenario.question.trim_end();
    let terminator = if question.ends_with(['?', '.', '!']) { "" } else { "?" };
    format!(
        "Hmm, so the case asks: {question}{terminator} The options are {}, so um, which one would you pick, and what's your quick opening argument?",
        enumerate_options(scenario)
    )
}

/// Returns a fixed reply for directives that are not rendered by the runtime.
pub fn scripted_reply(session: &StudySession, directive: &Directive) -> Option<String> {
    let scenario = session.scenario();
    match directive {
        Directive::PresentScenario => Some(opening_message(scenario)),
        Directive::RequestOpening {
            missing: MissingOpening::Position,
        } => Some(format!(
            "Hmm, sorry, I couldn't tell which side you're on, so is it {}, and uh, why?",
            enumerate_options(scenario)
        )),
        Directive::RequestOpening {
            missing: MissingOpening::Rationale,
        } => Some(
            "Okay, so um, before I pick my side, what's your opening argument for that one?"
                .to_string(),
        ),
        Directive::ClarifyCheckpoint => Some(
            "Sorry, uh, I didn't quite catch that, so do you want to keep going or wrap up here?"
                .to_string(),
        ),
        _ => None,
    }
}

/// The fixed question that closes a turn whose phase hinges on the
/// student's answer. It is appended after the generated part, so capping
/// never removes it.
pub fn closing_question(session: &StudySession, directive: &Directive) -> Option<String> {
    match directive {
        Directive::DisclosePosition { .. } => {
            Some("Want me to, um, elaborate on that from the case?".to_string())
        }
        Directive::Checkpoint => {
            Some("So, um, do you want to keep going or wrap it up here?".to_string())
        }
        Directive::Summary => Some(format!(
            "So, hmm, you started out with \"{}\", did I change your mind at all?",
            session.user_option().unwrap_or("your position")
        )),
        _ => None,
    }
}

fn turn_instructions(session: &StudySession, directive: &Directive) -> String {
    let agent = session.agent_option().unwrap_or("your position");
    let user = session.user_option().unwrap_or("their position");
    match directive {
        Directive::DisclosePosition { .. } => format!(
            "{} Your position is \"{agent}\". The student chose \"{user}\".",
            Phase::Disclose.directive()
        ),
        Directive::Challenge { elaboration } => {
            let lead = match elaboration {
                Elaboration::NotRequested => String::new(),
                Elaboration::Facts(_) | Elaboration::Unavailable => format!(
                    "The student asked you to elaborate. {} ",
                    Phase::Elaborate.directive()
                ),
            };
            format!(
                "{lead}{} Your position is \"{agent}\"; theirs is \"{user}\".",
                Phase::Challenge.directive()
            )
        }
        Directive::Exchange { turn } => format!(
            "{} This is turn {turn} of {EXCHANGE_TURNS_PER_CHECKPOINT} before the next pause. Always refer to some part of the case and say that it is from the case.",
            Phase::Exchange { agent_turns: 0 }.directive()
        ),
        Directive::Checkpoint => Phase::Checkpoint.directive().to_string(),
        Directive::Summary => format!(
            "{} Their initial position was \"{user}\", argued as: \"{}\". Spend your reply on the critique; the restatement and the question are added for you.",
            Phase::Summary.directive(),
            session.opening_argument().unwrap_or_default()
        ),
        Directive::Farewell => {
            "Acknowledge their answer in one short sentence and end the conversation.".to_string()
        }
        // Scripted or not yet renderable.
        Directive::PresentScenario
        | Directive::RequestOpening { .. }
        | Directive::ClarifyCheckpoint
        | Directive::Elaborate { .. } => session.phase().directive().to_string(),
    }
}

fn case_section(directive: &Directive) -> Option<String> {
    let Directive::Challenge { elaboration } = directive else {
        return None;
    };
    match elaboration {
        Elaboration::NotRequested => None,
        Elaboration::Facts(facts) => {
            let mut out = String::from("Use only these passages from the case:\n");
            for fact in facts {
                let _ = writeln!(out, "- {}", fact.text.trim());
            }
            Some(out)
        }
        Elaboration::Unavailable => Some(
            "No case content could be retrieved. Do not invent details about the case; argue from general reasoning and say the case doesn't cover it."
                .to_string(),
        ),
    }
}

/// Builds the full system prompt for one agent turn.
pub fn compose_system_prompt(
    persona: &str,
    session: &StudySession,
    directive: &Directive,
    settings: &GenerationSettings,
) -> String {
    let scenario = session.scenario();
    let mut prompt = String::with_capacity(persona.len() + 1024);
    prompt.push_str(persona.trim_end());

    let _ = write!(
        prompt,
        "\n\n# Scenario\n\nCompany or category: {}\nQuestion: {}\nOptions:\n",
        scenario.subject, scenario.question
    );
    for (i, option) in scenario.options.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, option);
    }

    let _ = write!(
        prompt,
        "\n# Current Context for This Turn\n\n**Phase:** {}\n**What to do now:** {}\n",
        session.phase().label(),
        turn_instructions(session, directive)
    );
    if let Some(case) = case_section(directive) {
        let _ = writeln!(prompt, "**Case content:** {}", case.trim_end());
    }
    let mut budget = settings.max_sentences;
    if let Some(question) = closing_question(session, directive) {
        budget = budget.saturating_sub(1).max(1);
        let _ = writeln!(
            prompt,
            "**Closing question:** \"{question}\" is added after your reply. Do not ask it yourself and end on a statement."
        );
    }
    let _ = writeln!(
        prompt,
        "**Length:** no more than {budget} sentences, casual, with fillers like \"hmm\", \"um\", \"so\" at natural pauses."
    );
    prompt
}
