//! Container-paragraph filter.
//!
//! When segmentation layers disagree, one pass can emit a merged
//! super-paragraph next to the pieces it was built from. A *container* is
//! a prose paragraph that contains at least `min_contained` other distinct
//! candidates from the same run, either verbatim after normalization or
//! with a longest common substring covering `coverage` of the candidate.
//! Containers are removed; structured blocks never are.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::dedup::normalize_for_hash;
use crate::segment::Segment;

/// Upper bound on `len(a) * len(b)` for the longest-common-substring pass.
/// Larger pairs are checked for exact containment only.
const LCS_BUDGET: usize = 4_000_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContainerFilterConfig {
    /// Paragraphs shorter than this (normalized chars) are never containers.
    pub min_container_chars: usize,
    /// How many distinct contained paragraphs make a container.
    pub min_contained: usize,
    /// Fraction of a candidate that must appear as one common substring.
    pub coverage: f64,
}

impl Default for ContainerFilterConfig {
    fn default() -> Self {
        Self {
            min_container_chars: 100,
            min_contained: 2,
            coverage: 0.9,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerFilter {
    config: ContainerFilterConfig,
}

impl ContainerFilter {
    pub fn new(config: ContainerFilterConfig) -> Self {
        Self { config }
    }

    /// Remove container paragraphs, preserving the order of survivors.
    ///
    /// Segments flagged as structured are never removed. If removal would
    /// leave fewer than two paragraphs, the input is returned unchanged.
    pub fn filter(&self, segments: Vec<Segment>) -> Vec<String> {
        let normalized: Vec<Vec<char>> = segments
            .iter()
            .map(|s| normalize_for_hash(&s.text).chars().collect())
            .collect();

        let containers: Vec<bool> = segments
            .iter()
            .enumerate()
            .map(|(i, s)| !s.structured && self.is_container(i, &normalized))
            .collect();

        let paragraphs = segments.into_iter().map(|s| s.text);
        let removed = containers.iter().filter(|c| **c).count();
        if removed == 0 {
            return paragraphs.collect();
        }
        let remaining = containers.len() - removed;
        if remaining < 2 {
            warn!(
                removed,
                remaining, "container filter would leave too few paragraphs; keeping all"
            );
            return paragraphs.collect();
        }

        debug!(removed, remaining, "container paragraphs removed");
        paragraphs
            .zip(containers)
            .filter_map(|(p, container)| if container { None } else { Some(p) })
            .collect()
    }

    fn is_container(&self, i: usize, normalized: &[Vec<char>]) -> bool {
        let host = &normalized[i];
        if host.len() < self.config.min_container_chars {
            return false;
        }

        let mut seen: HashSet<&[char]> = HashSet::new();
        for (j, guest) in normalized.iter().enumerate() {
            if j == i || guest.is_empty() || guest.len() >= host.len() {
                continue;
            }
            if seen.contains(guest.as_slice()) {
                continue;
            }
            if self.contains(host, guest) {
                seen.insert(guest.as_slice());
                if seen.len() >= self.config.min_contained {
                    return true;
                }
            }
        }
        false
    }

    fn contains(&self, host: &[char], guest: &[char]) -> bool {
        if host.windows(guest.len()).any(|w| w == guest) {
            return true;
        }
        let needed = (guest.len() as f64 * self.config.coverage).ceil() as usize;
        if needed > host.len() || host.len().saturating_mul(guest.len()) > LCS_BUDGET {
            return false;
        }
        has_common_substring(host, guest, needed)
    }
}

/// True if `a` and `b` share a common substring of at least `needed` chars.
///
/// Stops scanning as soon as such a run is found.
pub fn has_common_substring(a: &[char], b: &[char], needed: usize) -> bool {
    if needed == 0 {
        return true;
    }
    if a.len() < needed || b.len() < needed {
        return false;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y { prev[j] + 1 } else { 0 };
            if curr[j + 1] >= needed {
                return true;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    false
}
