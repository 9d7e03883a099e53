//! Ordered candidate patterns for finding pieces of the host UI
//!
//! The host exposes no stable contract, so each lookup tries a fixed list of
//! structural patterns in priority order and stops at the first one that
//! matches anything.

use crate::dom::{parse_selector, HostDocument, NodeId};
use crate::error::AssistResult;
use scraper::Selector;

/// A single structural pattern
#[derive(Debug, Clone)]
pub struct Candidate {
    pattern: String,
    selector: Selector,
}

impl Candidate {
    pub fn parse(pattern: &str) -> AssistResult<Self> {
        Ok(Self {
            pattern: pattern.to_string(),
            selector: parse_selector(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    /// Position of the winning candidate in the list
    pub index: usize,
    pub node: NodeId,
}

/// Candidate patterns in priority order, first match wins
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
}

impl CandidateList {
    /// Parse every pattern up front so a bad one fails at load time
    pub fn parse<I, S>(patterns: I) -> AssistResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let candidates = patterns
            .into_iter()
            .map(|p| Candidate::parse(p.as_ref()))
            .collect::<AssistResult<Vec<_>>>()?;
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.pattern())
    }

    /// Try each candidate in order against the whole document
    pub fn locate(&self, doc: &HostDocument) -> Option<Located> {
        self.candidates.iter().enumerate().find_map(|(index, candidate)| {
            let hit = doc.query_first(candidate.selector());
            tracing::debug!(
                "Candidate {} '{}' {}",
                index,
                candidate.pattern(),
                if hit.is_some() { "matched" } else { "missed" }
            );
            hit.map(|node| Located { index, node })
        })
    }

    /// Anchor mode: the element to insert next to
    pub fn locate_element(&self, doc: &HostDocument) -> Option<NodeId> {
        self.locate(doc).map(|found| found.node)
    }

    /// Content mode: trimmed text of the first match
    ///
    /// A match with no text still wins; later candidates are not consulted.
    pub fn locate_text(&self, doc: &HostDocument) -> Option<String> {
        let found = self.locate(doc)?;
        doc.text_content(found.node).map(|text| text.trim().to_string())
    }
}
