//! Hand-off of terminal state into the next phase's initial state.

use flight_core::{State, StateSchema, names};
use indexmap::IndexMap;

use super::error::ConfigurationError;

/// Carry upstream variable `from` into downstream variable `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub from: String,
    pub to: String,
}

impl Link {
    /// Carry a variable under its own name.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            from: name.clone(),
            to: name,
        }
    }

    pub fn renamed(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Which variables cross each phase boundary, and under what names.
///
/// The default links apply to every hop; a hop-specific list replaces them entirely for the
/// boundary into that phase. Values are copied bit for bit.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuity {
    links: Vec<Link>,
    hops: IndexMap<usize, Vec<Link>>,
}

impl Default for Continuity {
    /// Mass, distance, and altitude under their own names.
    fn default() -> Self {
        Self::carrying([names::MASS, names::DISTANCE, names::ALTITUDE])
    }
}

impl Continuity {
    /// Carry `variables` under their own names at every hop.
    pub fn carrying<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            links: variables.into_iter().map(Link::same).collect(),
            hops: IndexMap::new(),
        }
    }

    /// Carry nothing unless a hop says otherwise.
    pub fn none() -> Self {
        Self::carrying(std::iter::empty::<String>())
    }

    /// Deliver upstream `from` as downstream `to` at every hop, replacing any default link of
    /// `from`.
    pub fn with_rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let link = Link::renamed(from, to);
        match self.links.iter_mut().find(|l| l.from == link.from) {
            Some(existing) => *existing = link,
            None => self.links.push(link),
        }
        self
    }

    /// Replace the links used for the boundary into phase `into_phase` (1-based hop target).
    pub fn with_hop(mut self, into_phase: usize, links: Vec<Link>) -> Self {
        self.hops.insert(into_phase, links);
        self
    }

    pub fn default_links(&self) -> &[Link] {
        &self.links
    }

    /// Links applied when entering phase `into_phase`.
    pub fn links_into(&self, into_phase: usize) -> &[Link] {
        self.hops
            .get(&into_phase)
            .map(Vec::as_slice)
            .unwrap_or(&self.links)
    }

    pub(crate) fn hop_targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.hops.keys().copied()
    }

    /// Check one hop against the schemas on either side of it.
    pub(crate) fn validate_hop(
        &self,
        into_phase: usize,
        upstream: &StateSchema,
        downstream: &StateSchema,
    ) -> Result<(), ConfigurationError> {
        let links = self.links_into(into_phase);
        for (position, link) in links.iter().enumerate() {
            if links[..position].iter().any(|earlier| earlier.to == link.to) {
                return Err(ConfigurationError::DuplicateLinkTarget {
                    index: into_phase,
                    variable: link.to.clone(),
                });
            }
            let from = upstream.variable(&link.from).ok_or_else(|| {
                ConfigurationError::ContinuityUpstream {
                    variable: link.from.clone(),
                }
            })?;
            let to = downstream.variable(&link.to).ok_or_else(|| {
                ConfigurationError::ContinuityDownstream {
                    variable: link.to.clone(),
                }
            })?;
            if from.dimension != to.dimension {
                return Err(ConfigurationError::ContinuityDimension {
                    from: link.from.clone(),
                    to: link.to.clone(),
                });
            }
        }
        Ok(())
    }

    /// Downstream initial values taken from `terminal`. Links whose source is absent are skipped;
    /// planning rejects them beforehand.
    pub fn apply(&self, into_phase: usize, terminal: &State) -> State {
        self.links_into(into_phase)
            .iter()
            .filter_map(|link| terminal.get(&link.from).map(|value| (link.to.clone(), value)))
            .collect()
    }
}
