//! Consolidation
//!
//! Merges per-item fragments into one artifact with a single prompt call.
//! Blank fragments are dropped first; when nothing remains the merge call is
//! never made.

use std::future::Future;
use tracing::info;

use crate::types::Result;

/// Outcome of a consolidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consolidation {
    /// Output of the merge call
    Merged(String),
    /// No non-empty fragments; nothing was merged
    Skipped,
}

impl Consolidation {
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Merged(text) => Some(text),
            Self::Skipped => None,
        }
    }
}

/// Join non-blank fragments in collection order
pub fn join_fragments<S: AsRef<str>>(fragments: &[S], separator: &str) -> Option<String> {
    let kept: Vec<&str> = fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|f| !f.trim().is_empty())
        .collect();

    (!kept.is_empty()).then(|| kept.join(separator))
}

/// Join `fragments` and hand the result to `merge`, or skip when empty
pub async fn consolidate<S, F, Fut>(
    label: &str,
    fragments: &[S],
    separator: &str,
    merge: F,
) -> Result<Consolidation>
where
    S: AsRef<str>,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let Some(joined) = join_fragments(fragments, separator) else {
        info!("{}: Skipped (no fragments to consolidate)", label);
        return Ok(Consolidation::Skipped);
    };

    info!(
        "{}: Consolidating {} fragments ({} chars)",
        label,
        fragments.len(),
        joined.len()
    );

    merge(joined).await.map(Consolidation::Merged)
}
