//! Match lifecycle rules

use serde::{Deserialize, Serialize};

/// How `start_match_randomized` fills the two fresh teams from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSampling {
    /// Shuffle four distinct players into the two teams
    WithoutReplacement,
    /// Four independent uniform draws; a player may fill several slots
    WithReplacement,
}

/// When a player may leave a team of an open match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeavePolicy {
    /// Any member may leave while the match is open
    Always,
    /// Only while the team is not yet full
    LegacyNotFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRules {
    pub team_sampling: TeamSampling,
    pub leave_policy: LeavePolicy,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            team_sampling: TeamSampling::WithoutReplacement,
            leave_policy: LeavePolicy::Always,
        }
    }
}
