//! Case Fact Lookup
//!
//! The case narrative lives in an external database. This module defines the
//! contract the discussion relies on ("given the current discussion context,
//! return relevant case text") and the clients that fulfil it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A passage of case content returned by the case database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseFact {
    pub text: String,
}

impl CaseFact {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Defines the contract for any source of case content.
///
/// Implementations may return an empty list; callers treat that the same as
/// a failed lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaseFactSource: Send + Sync {
    /// Returns case passages relevant to `query`.
    async fn query(&self, query: &str) -> Result<Vec<CaseFact>>;
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<String>,
}

/// A `CaseFactSource` backed by the vector-database query API.
///
/// Speaks `POST {base_url}/query` with `{"query": ...}` and expects
/// `{"results": [...]}` back.
pub struct HttpCaseDatabase {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCaseDatabase {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/query", self.base_url)
    }
}

#[async_trait]
impl CaseFactSource for HttpCaseDatabase {
    async fn query(&self, query: &str) -> Result<Vec<CaseFact>> {
        debug!(endpoint = %self.endpoint(), "Querying case database");
        let response: QueryResponse = self
            .client
            .post(self.endpoint())
            .json(&QueryRequest { query })
            .send()
            .await
            .context("Case database request failed")?
            .error_for_status()
            .context("Case database returned an error status")?
            .json()
            .await
            .context("Case database response was not valid JSON")?;

        Ok(response
            .results
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .map(CaseFact::new)
            .collect())
    }
}

/// A `CaseFactSource` that always answers with the same passages.
///
/// Used for local runs without a case database and in tests.
pub struct StaticCaseDatabase {
    passages: Vec<CaseFact>,
}

impl StaticCaseDatabase {
    pub fn new(passages: Vec<String>) -> Self {
        Self {
            passages: passages.into_iter().map(CaseFact::new).collect(),
        }
    }

    pub fn empty() -> Self {
        Self { passages: vec![] }
    }
}

#[async_trait]
impl CaseFactSource for StaticCaseDatabase {
    async fn query(&self, _query: &str) -> Result<Vec<CaseFact>> {
        Ok(self.passages.clone())
    }
}
