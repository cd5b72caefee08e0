//! Walks the Rivian battery-sourcing discussion from opening to farewell.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use study_partner_core::{
    Command,
    case_db::StaticCaseDatabase,
    conductor::Conductor,
    generic_types::{GenerationSettings, Party, Turn},
    llm_client::LLMClient,
    phase::Phase,
    scenario::Scenario,
    utterance,
};

const SCENARIO: &str = "# Rivian\n\nRivian should prioritize securing supply for their EV batteries through which of the following options?\n\nBuying from multiple battery suppliers\nDeveloping in-house manufacturing capabilities\n";

/// Replies with a canned line and remembers every system prompt it saw.
#[derive(Default)]
struct RecordingRuntime {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LLMClient for RecordingRuntime {
    async fn generate(&self, system_prompt: String, _history: Vec<Turn>) -> Result<String> {
        self.prompts.lock().unwrap().push(system_prompt);
        Ok("Hmm, so the case says Rivian signed with Samsung, which is like renting vs owning a house. Um, doesn't that cut your way? And a third sentence.".to_string())
    }
}

#[tokio::test]
async fn full_discussion_follows_the_phase_order() {
    let runtime = Arc::new(RecordingRuntime::default());
    let conductor = Conductor::new(
        runtime.clone(),
        Arc::new(StaticCaseDatabase::new(vec![
            "Rivian sources cells from Samsung SDI.".to_string(),
        ])),
        "You are a helpful classmate.".to_string(),
        GenerationSettings::default(),
    );
    let mut session = study_partner_core::session::StudySession::new(Scenario::parse(SCENARIO).unwrap());

    let opening = conductor.open(&mut session).await.unwrap();
    assert!(opening.text().contains("Buying from multiple battery suppliers"));
    assert!(opening.text().contains("Developing in-house manufacturing capabilities"));
    assert!(runtime.prompts.lock().unwrap().is_empty());

    conductor
        .respond(&mut session, "Multi-supplier, because relying on a single partner is too risky")
        .await
        .unwrap();
    assert_eq!(session.phase(), Phase::Disclose);
    assert_eq!(
        session.agent_option(),
        Some("Developing in-house manufacturing capabilities")
    );
    let disclosure = &session.turns().last().unwrap().content;
    assert!(disclosure.starts_with("Hmm, so the case says Rivian signed with Samsung"));
    assert!(disclosure.ends_with("elaborate on that from the case?"));
    assert!(runtime.prompts.lock().unwrap()[0]
        .contains("Your position is \"Developing in-house manufacturing capabilities\""));

    conductor.respond(&mut session, "yes, elaborate").await.unwrap();
    assert!(runtime.prompts.lock().unwrap()[1].contains("Rivian sources cells from Samsung SDI."));

    for reply in ["suppliers compete on price", "and volume discounts"] {
        conductor.respond(&mut session, reply).await.unwrap();
    }
    conductor.respond(&mut session, "hmm ok").await.unwrap();
    assert_eq!(session.phase(), Phase::Checkpoint);

    conductor.respond(&mut session, "continue").await.unwrap();
    conductor.respond(&mut session, "one more point").await.unwrap();
    conductor.respond(&mut session, "last point").await.unwrap();
    assert_eq!(session.checkpoints(), 2);

    conductor.respond(&mut session, "let's end").await.unwrap();
    assert_eq!(session.phase(), Phase::Summary);
    let last = conductor.respond(&mut session, "a bit").await.unwrap();
    assert!(matches!(last, Command::SessionComplete(_)));

    // Every agent turn stays within two sentences.
    for turn in session.turns().iter().filter(|t| t.party == Party::Agent) {
        assert!(utterance::sentences(&turn.content).len() <= 2, "{}", turn.content);
    }

    // Exactly two exchange turns between consecutive checkpoints.
    let agent_phases: Vec<Phase> = session
        .turns()
        .iter()
        .filter(|t| t.party == Party::Agent)
        .map(|t| t.phase)
        .collect();
    let checkpoints: Vec<usize> = agent_phases
        .iter()
        .enumerate()
        .filter(|(_, p)| **p == Phase::Checkpoint)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(checkpoints.len(), 2);
    let between = agent_phases[checkpoints[0] + 1..checkpoints[1]]
        .iter()
        .filter(|p| matches!(p, Phase::Exchange { .. }))
        .count();
    assert_eq!(between, 2);
}
