//! Match scheduling.
//!
//! Everything here is a pure function of the roster and config, so a
//! generation's match set and per-episode seeds can be rebuilt exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::{AgentId, Roster};
use crate::settings::LeagueConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ChampionSelfPlay,
    Paired,
    Challenger,
    Wildcard,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchKind::ChampionSelfPlay => "champion_self_play",
            MatchKind::Paired => "paired",
            MatchKind::Challenger => "challenger",
            MatchKind::Wildcard => "wildcard",
        };
        f.write_str(s)
    }
}

/// One game to play. `first` moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMatch {
    /// Position within its match set
    pub index: u32,
    pub kind: MatchKind,
    pub first: AgentId,
    pub second: AgentId,
}

/// Build the training match set for one generation.
///
/// Champion self-play games come first, then `paired_games` games for every
/// ordered pair of distinct training agents, in roster order.
pub fn build_match_set(roster: &Roster, config: &LeagueConfig) -> Vec<ScheduledMatch> {
    let champion = roster.champion().id;
    let trainees: Vec<AgentId> = roster.training_agents().map(|a| a.id).collect();

    let mut matches = Vec::new();
    let mut push = |kind, first, second| {
        matches.push(ScheduledMatch {
            index: matches.len() as u32,
            kind,
            first,
            second,
        })
    };

    for _ in 0..config.champion_self_play_games {
        push(MatchKind::ChampionSelfPlay, champion, champion);
    }
    for &a in &trainees {
        for &b in &trainees {
            if a == b {
                continue;
            }
            for _ in 0..config.paired_games {
                push(MatchKind::Paired, a, b);
            }
        }
    }
    matches
}

/// `games` matches between `challenger` and `champion`, alternating seats.
/// The challenger moves first in even-indexed games.
pub fn head_to_head(
    kind: MatchKind,
    challenger: AgentId,
    champion: AgentId,
    games: u32,
) -> Vec<ScheduledMatch> {
    (0..games)
        .map(|index| {
            let (first, second) = if index % 2 == 0 {
                (challenger, champion)
            } else {
                (champion, challenger)
            };
            ScheduledMatch {
                index,
                kind,
                first,
                second,
            }
        })
        .collect()
}

/// Seed for one episode, stable across runs and resumes.
pub fn derive_seed(league_seed: u64, generation: u64, kind: MatchKind, index: u32) -> u64 {
    let stream = match kind {
        MatchKind::ChampionSelfPlay | MatchKind::Paired => 0u64,
        MatchKind::Challenger => 1,
        MatchKind::Wildcard => 2,
    };
    let mut x = splitmix64(league_seed ^ splitmix64(generation));
    x = splitmix64(x ^ (stream << 32 | index as u64));
    x
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}
