//! Turn Conductor
//!
//! Drives a [`StudySession`] through one agent turn at a time against the two
//! external collaborators: the generation runtime that words each reply and
//! the case database consulted when the student asks for elaboration.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    Command,
    case_db::{CaseFact, CaseFactSource},
    generic_types::GenerationSettings,
    llm_client::LLMClient,
    prompt,
    session::{Directive, StudySession},
    utterance,
};

pub struct Conductor {
    llm: Arc<dyn LLMClient>,
    cases: Arc<dyn CaseFactSource>,
    persona: String,
    settings: GenerationSettings,
}

impl Conductor {
    /// Creates a conductor.
    ///
    /// # Arguments
    ///
    /// * `llm` - Generation runtime used for every unscripted reply.
    /// * `cases` - Case database queried once per elaboration request.
    /// * `persona` - Base system prompt describing the study partner.
    /// * `settings` - Sentence cap and sampling settings.
    pub fn new(
        llm: Arc<dyn LLMClient>,
        cases: Arc<dyn CaseFactSource>,
        persona: String,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            llm,
            cases,
            persona,
            settings,
        }
    }

    /// Speaks the opening message of a fresh session.
    pub async fn open(&self, session: &mut StudySession) -> Result<Command> {
        let directive = session.opening()?;
        let text = self.render(session, &directive).await?;
        session.accept_agent_turn(&text)?;
        Ok(Command::SpeakText(text))
    }

    /// Handles one user reply and produces the agent's answer.
    ///
    /// On error the session may hold a half-applied turn; callers keep their
    /// own copy and only store the session back on success.
    pub async fn respond(&self, session: &mut StudySession, user_text: &str) -> Result<Command> {
        let mut directive = session.accept_user_turn(user_text)?;
        if let Directive::Elaborate { query } = &directive {
            let facts = self.lookup(query).await;
            directive = session.finish_elaboration(facts)?;
        }

        let text = self.render(session, &directive).await?;
        session.accept_agent_turn(&text)?;

        if session.phase().is_terminal() {
            Ok(Command::SessionComplete(text))
        } else {
            Ok(Command::SpeakText(text))
        }
    }

    async fn lookup(&self, query: &str) -> Vec<CaseFact> {
        match self.cases.query(query).await {
            Ok(facts) => {
                if facts.is_empty() {
                    warn!("Case lookup returned no passages");
                }
                facts
            }
            Err(e) => {
                warn!(error = ?e, "Case lookup failed; continuing without case content");
                Vec::new()
            }
        }
    }

    async fn render(&self, session: &StudySession, directive: &Directive) -> Result<String> {
        if let Some(text) = prompt::scripted_reply(session, directive) {
            return Ok(text);
        }

        let system_prompt =
            prompt::compose_system_prompt(&self.persona, session, directive, &self.settings);
        debug!(phase = session.phase().label(), ?directive, "Rendering agent turn");

        let raw = self
            .llm
            .generate(system_prompt, session.turns().to_vec())
            .await
            .context("Generation runtime failed")?;
        if raw.trim().is_empty() {
            bail!("Generation runtime returned an empty reply");
        }
        let text = match prompt::closing_question(session, directive) {
            Some(question) => {
                let budget = self.settings.max_sentences.saturating_sub(1);
                let body = utterance::cap_statements(&raw, budget);
                if body.is_empty() {
                    warn!("Generated reply had no statement before the closing question");
                    question
                } else {
                    format!("{body} {question}")
                }
            }
            None => utterance::cap_sentences(&raw, self.settings.max_sentences),
        };

        if matches!(directive, Directive::Exchange { .. }) && !utterance::mentions_case(&text) {
            warn!("Exchange turn does not refer to the case");
        }
        if !utterance::has_filler(&text) {
            debug!("Agent turn has no filler words");
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        case_db::MockCaseFactSource, llm_client::MockLLMClient, phase::Phase, scenario::Scenario,
    };
    use anyhow::anyhow;

    fn rivian() -> Scenario {
        Scenario::new(
            "Rivian",
            "Rivian should prioritize securing supply for their EV batteries through which of the following options?",
            vec![
                "Buying from multiple battery suppliers".to_string(),
                "Developing in-house manufacturing capabilities".to_string(),
            ],
        )
        .unwrap()
    }

    fn conductor(llm: MockLLMClient, cases: MockCaseFactSource) -> Conductor {
        Conductor::new(
            Arc::new(llm),
            Arc::new(cases),
            "You are a classmate.".to_string(),
            GenerationSettings::default(),
        )
    }

    #[tokio::test]
    async fn opening_is_scripted() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate().never();
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        let Command::SpeakText(text) = conductor.open(&mut session).await.unwrap() else {
            panic!("expected speech");
        };
        assert!(text.contains("(1) Buying from multiple battery suppliers"));
        assert_eq!(session.turns().len(), 1);
    }

    #[tokio::test]
    async fn disclosure_keeps_the_elaboration_offer() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate().times(1).returning(|_, _| {
            Ok("Hmm, I'll take in-house. So, um, the case says Rivian wants control of cell chemistry. Want me to elaborate from the case?".to_string())
        });
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        let command = conductor
            .respond(&mut session, "Multi-supplier, because relying on one partner is risky")
            .await
            .unwrap();
        let Command::SpeakText(text) = command else {
            panic!("expected speech");
        };
        assert_eq!(
            text,
            "Hmm, I'll take in-house. Want me to, um, elaborate on that from the case?"
        );
        assert_eq!(utterance::sentences(&text).len(), 2);
        assert_eq!(session.phase(), Phase::Disclose);
    }

    #[tokio::test]
    async fn exchange_replies_are_capped_to_two_sentences() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate().returning(|_, _| {
            Ok("Hmm, so the case says control matters. Um, isn't that like owning a bakery? Extra. More.".to_string())
        });
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        for reply in [
            "Multi-supplier, because relying on one partner is risky",
            "no",
        ] {
            conductor.respond(&mut session, reply).await.unwrap();
        }
        let command = conductor
            .respond(&mut session, "suppliers compete on price")
            .await
            .unwrap();
        assert_eq!(
            command.text(),
            "Hmm, so the case says control matters. Um, isn't that like owning a bakery?"
        );
    }

    #[tokio::test]
    async fn checkpoint_and_summary_end_on_their_question() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate().returning(|_, _| {
            Ok("Hmm, fair point on price. Should we keep going? Also this.".to_string())
        });
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        for reply in [
            "Multi-supplier, because relying on one partner is risky",
            "no",
            "suppliers compete on price",
            "and they scale faster",
        ] {
            conductor.respond(&mut session, reply).await.unwrap();
        }
        let checkpoint = conductor.respond(&mut session, "fair").await.unwrap();
        assert_eq!(session.phase(), Phase::Checkpoint);
        assert_eq!(
            checkpoint.text(),
            "Hmm, fair point on price. So, um, do you want to keep going or wrap it up here?"
        );

        let summary = conductor.respond(&mut session, "let's end").await.unwrap();
        assert_eq!(session.phase(), Phase::Summary);
        assert!(summary.text().starts_with("Hmm, fair point on price."));
        assert!(summary.text().ends_with("did I change your mind at all?"));
        assert_eq!(utterance::sentences(summary.text()).len(), 2);
    }

    #[tokio::test]
    async fn consent_triggers_one_lookup_and_quotes_it() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Ok("In-house, want more?".to_string()));
        llm.expect_generate()
            .withf(|prompt, _| prompt.contains("- Rivian opened a pack plant in Normal."))
            .times(1)
            .returning(|_, _| Ok("Hmm, so the case says they opened a pack plant.".to_string()));

        let mut cases = MockCaseFactSource::new();
        cases
            .expect_query()
            .times(1)
            .returning(|_| Ok(vec![CaseFact::new("Rivian opened a pack plant in Normal.")]));

        let conductor = conductor(llm, cases);
        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        conductor
            .respond(&mut session, "Multi-supplier, because relying on one partner is risky")
            .await
            .unwrap();
        conductor.respond(&mut session, "yes").await.unwrap();
        assert_eq!(session.phase(), Phase::Exchange { agent_turns: 0 });
    }

    #[tokio::test]
    async fn failed_lookup_forbids_invented_case_content() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate()
            .times(1)
            .returning(|_, _| Ok("In-house, want more?".to_string()));
        llm.expect_generate()
            .withf(|prompt, _| prompt.contains("Do not invent details about the case"))
            .times(1)
            .returning(|_, _| Ok("Um, the case doesn't cover it, but think of a bakery.".to_string()));

        let mut cases = MockCaseFactSource::new();
        cases
            .expect_query()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        let conductor = conductor(llm, cases);
        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        conductor
            .respond(&mut session, "Multi-supplier, because relying on one partner is risky")
            .await
            .unwrap();
        conductor.respond(&mut session, "yes").await.unwrap();
        assert_eq!(session.phase(), Phase::Exchange { agent_turns: 0 });
    }

    #[tokio::test]
    async fn declining_never_queries_the_case() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate()
            .times(2)
            .returning(|_, _| Ok("Hmm, the case, though.".to_string()));
        let mut cases = MockCaseFactSource::new();
        cases.expect_query().never();

        let conductor = conductor(llm, cases);
        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        conductor
            .respond(&mut session, "Multi-supplier, because relying on one partner is risky")
            .await
            .unwrap();
        conductor.respond(&mut session, "no thanks").await.unwrap();
        assert_eq!(session.phase(), Phase::Exchange { agent_turns: 0 });
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate()
            .returning(|_, _| Err(anyhow!("rate limited")));
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        let err = conductor
            .respond(&mut session, "Multi-supplier, because relying on one partner is risky")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Generation runtime failed"));
    }

    #[tokio::test]
    async fn answering_the_summary_completes_the_session() {
        let mut llm = MockLLMClient::new();
        llm.expect_generate()
            .returning(|_, _| Ok("Hmm, so the case says otherwise.".to_string()));
        let conductor = conductor(llm, MockCaseFactSource::new());

        let mut session = StudySession::new(rivian());
        conductor.open(&mut session).await.unwrap();
        for reply in [
            "Multi-supplier, because relying on one partner is risky",
            "no",
            "suppliers compete on price",
            "and they scale faster",
            "fair",
            "let's end",
        ] {
            let command = conductor.respond(&mut session, reply).await.unwrap();
            assert!(matches!(command, Command::SpeakText(_)));
        }
        assert_eq!(session.phase(), Phase::Summary);

        let command = conductor.respond(&mut session, "not really").await.unwrap();
        assert!(matches!(command, Command::SessionComplete(_)));
    }
}
