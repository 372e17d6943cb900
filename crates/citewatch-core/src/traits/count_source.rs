// # Count Source Trait
//
// Defines the interface for fetching an author's total citation count.
//
// ## Implementations
//
// - Google Scholar: `citewatch-source-scholar` crate
//
// ## Usage
//
// ```rust,ignore
// use citewatch_core::{AuthorSelector, CountSource};
//
// #[tokio::main]
// async fn main() -> Result<(), Box<dyn std::error::Error>> {
//     let source = /* CountSource implementation */;
//
//     let observation = source
//         .fetch(&AuthorSelector::Id("qc6CJjYAAAAJ".into()))
//         .await?;
//     println!("{} citations", observation.citations);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::AuthorSelector;
use crate::error::FetchError;

/// A single reading of an author's citation count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Total citations at the time of the fetch
    pub citations: u64,
    /// Display name the source resolved, when it reports one
    pub author_name: Option<String>,
}

impl Observation {
    /// Create an observation without a resolved name
    pub fn new(citations: u64) -> Self {
        Self {
            citations,
            author_name: None,
        }
    }

    /// Attach the resolved display name
    pub fn with_author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self
    }
}

/// Trait for citation count sources
///
/// # Contract
///
/// - Id selectors are exact lookups.
/// - Name selectors search and take the first match. This may pick the
///   wrong person; callers that care should configure an id.
/// - Every failure is reported as a [`FetchError`]; implementations never
///   panic on bad upstream data.
/// - Implementations must not retry. The engine's fixed cadence is the
///   retry policy.
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Fetch the current total citation count for the selected author
    ///
    /// # Returns
    ///
    /// - `Ok(Observation)`: The current count
    /// - `Err(FetchError)`: NotFound, RateLimited, Network or Parse
    async fn fetch(&self, selector: &AuthorSelector) -> Result<Observation, FetchError>;

    /// Name of the source, for logs
    fn source_name(&self) -> &'static str;
}
