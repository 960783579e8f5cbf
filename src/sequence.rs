use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// An ordered list of unique domains. Position 1 is the most relevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DomainRanking {
    domains: Vec<String>,
}

impl DomainRanking {
    /// Builds a ranking from identifiers that were already extracted.
    /// Later duplicates and empty strings are skipped.
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        build_sequence(identifiers, |id| Some(id.into()), None)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.domains
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.domains.get(index).map(String::as_str)
    }

    /// Domain → 1-indexed rank. Build once and reuse for repeated lookups.
    pub fn rank_map(&self) -> HashMap<&str, usize> {
        self.domains
            .iter()
            .enumerate()
            .map(|(i, d)| (d.as_str(), i + 1))
            .collect()
    }
}

/// Collapses raw records into a ranking of unique identifiers.
///
/// `extract` maps a record to its identifier; records yielding `None` or an
/// empty string are skipped, as are repeats of an identifier already seen.
/// Collection stops once `cap` identifiers have been gathered.
pub fn build_sequence<I, F>(records: I, mut extract: F, cap: Option<usize>) -> DomainRanking
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut domains = Vec::new();

    for record in records {
        if cap.is_some_and(|max| domains.len() >= max) {
            break;
        }
        let Some(domain) = extract(record) else {
            continue;
        };
        if domain.is_empty() || !seen.insert(domain.clone()) {
            continue;
        }
        domains.push(domain);
    }

    DomainRanking { domains }
}
