//! Deterministic, non-interactive resolution strategies.

use serde::{Deserialize, Serialize};

use super::revisions::{ConflictCandidate, Side};

/// Marker text that makes the automated sentinel rule pick its side.
pub const DEFAULT_SENTINEL: &str = "reset to my";

/// What an automated strategy decided for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    KeepCurrent,
    TakeIncoming,
    /// Leave the path conflicted.
    Unresolved,
}

impl Choice {
    pub fn side(self) -> Option<Side> {
        match self {
            Self::KeepCurrent => Some(Side::Current),
            Self::TakeIncoming => Some(Side::Incoming),
            Self::Unresolved => None,
        }
    }
}

/// Picks a side for a conflicted path without operator input.
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn choose(&self, path: &str, candidate: &ConflictCandidate) -> Choice;
}

/// The side whose text exactly equals the sentinel wins, current first.
/// Paths where neither side matches stay unresolved.
#[derive(Debug, Clone)]
pub struct SentinelStrategy {
    sentinel: String,
}

impl SentinelStrategy {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }
}

impl Default for SentinelStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_SENTINEL)
    }
}

impl ResolutionStrategy for SentinelStrategy {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn choose(&self, _path: &str, candidate: &ConflictCandidate) -> Choice {
        if candidate.current_text() == Some(self.sentinel.as_str()) {
            Choice::KeepCurrent
        } else if candidate.incoming_text() == Some(self.sentinel.as_str()) {
            Choice::TakeIncoming
        } else {
            Choice::Unresolved
        }
    }
}

/// Always take one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferSide(pub Side);

impl ResolutionStrategy for PreferSide {
    fn name(&self) -> &'static str {
        match self.0 {
            Side::Current => "keep_current",
            Side::Incoming => "take_incoming",
        }
    }

    fn choose(&self, _path: &str, _candidate: &ConflictCandidate) -> Choice {
        match self.0 {
            Side::Current => Choice::KeepCurrent,
            Side::Incoming => Choice::TakeIncoming,
        }
    }
}

/// Strategy names accepted in configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Sentinel,
    KeepCurrent,
    TakeIncoming,
}

impl StrategyKind {
    /// Build the strategy; `sentinel` only matters for [`StrategyKind::Sentinel`].
    pub fn build(self, sentinel: &str) -> Box<dyn ResolutionStrategy> {
        match self {
            Self::Sentinel => Box::new(SentinelStrategy::new(sentinel)),
            Self::KeepCurrent => Box::new(PreferSide(Side::Current)),
            Self::TakeIncoming => Box::new(PreferSide(Side::Incoming)),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentinel" => Ok(Self::Sentinel),
            "keep_current" => Ok(Self::KeepCurrent),
            "take_incoming" => Ok(Self::TakeIncoming),
            other => Err(format!(
                "unknown strategy '{}': use sentinel, keep_current or take_incoming",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(current: &str, incoming: &str) -> ConflictCandidate {
        ConflictCandidate::new(Some(current.into()), Some(incoming.into()))
    }

    #[test]
    fn test_sentinel_on_current_keeps_current() {
        let strategy = SentinelStrategy::default();
        assert_eq!(
            strategy.choose("a.xml", &candidate("reset to my", "X")),
            Choice::KeepCurrent
        );
    }

    #[test]
    fn test_sentinel_on_incoming_takes_incoming() {
        let strategy = SentinelStrategy::default();
        assert_eq!(
            strategy.choose("a.xml", &candidate("Y", "reset to my")),
            Choice::TakeIncoming
        );
    }

    #[test]
    fn test_no_sentinel_leaves_unresolved() {
        let strategy = SentinelStrategy::default();
        assert_eq!(strategy.choose("a.xml", &candidate("Y", "X")), Choice::Unresolved);
        assert_eq!(
            strategy.choose("a.xml", &candidate("reset to my\n", "X")),
            Choice::Unresolved
        );
        assert_eq!(
            strategy.choose("a.xml", &ConflictCandidate::new(None, None)),
            Choice::Unresolved
        );
    }

    #[test]
    fn test_prefer_side() {
        let c = candidate("Y", "X");
        assert_eq!(PreferSide(Side::Current).choose("a", &c), Choice::KeepCurrent);
        assert_eq!(PreferSide(Side::Incoming).choose("a", &c), Choice::TakeIncoming);
        assert_eq!(Choice::TakeIncoming.side(), Some(Side::Incoming));
    }

    #[test]
    fn test_strategy_kind_parse_and_build() {
        assert_eq!("keep_current".parse::<StrategyKind>(), Ok(StrategyKind::KeepCurrent));
        assert!("merge".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::TakeIncoming.build("").name(), "take_incoming");
        assert_eq!(StrategyKind::Sentinel.build("mine").name(), "sentinel");
    }
}
