//! Agents, roles and the roster.
//!
//! The roster owns every agent in the league and enforces the one invariant
//! the rest of the league leans on: exactly one agent holds the Champion
//! role. Role changes only happen through [`Roster::promote`], which swaps
//! the Champion and a training agent in one step.

use engine_config::DrawWeighting;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LeagueError;

/// Stable agent identifier, never reused within a league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

/// Role an agent plays in the league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "name", rename_all = "snake_case")]
pub enum Role {
    Champion,
    TrainingAgent(String),
    Wildcard,
}

impl Role {
    pub fn is_champion(&self) -> bool {
        matches!(self, Role::Champion)
    }

    pub fn training_name(&self) -> Option<&str> {
        match self {
            Role::TrainingAgent(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Champion => write!(f, "champion"),
            Role::TrainingAgent(name) => write!(f, "{name}"),
            Role::Wildcard => write!(f, "wildcard"),
        }
    }
}

/// Reference to a set of evaluator weights held by the training collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightsVersion {
    pub tag: String,
    pub version: u64,
}

impl WeightsVersion {
    pub fn new(tag: impl Into<String>, version: u64) -> Self {
        Self {
            tag: tag.into(),
            version,
        }
    }
}

impl fmt::Display for WeightsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.tag, self.version)
    }
}

/// Cumulative results of an agent's league games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStats {
    pub games: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub total_reward: f64,
}

impl MatchStats {
    /// Record one game from this agent's perspective (+1 win, -1 loss, 0 draw).
    pub fn record(&mut self, reward: f32) {
        self.games += 1;
        self.total_reward += reward as f64;
        if reward > 0.0 {
            self.wins += 1;
        } else if reward < 0.0 {
            self.losses += 1;
        } else {
            self.draws += 1;
        }
    }

    /// `(wins + w * draws) / games`, or 0 before the first game.
    pub fn win_rate(&self, weighting: DrawWeighting) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        (self.wins as f64 + weighting.weight() * self.draws as f64) / self.games as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: Role,
    pub weights: WeightsVersion,
    pub stats: MatchStats,
}

impl Agent {
    /// Name used in logs and violation records.
    pub fn label(&self) -> String {
        self.role.to_string()
    }
}

/// A change (or confirmation) of the Champion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChampionEvent {
    Promoted {
        generation: u64,
        champion: AgentId,
        previous: AgentId,
        win_rate: f64,
    },
    Defended {
        generation: u64,
        champion: AgentId,
        challenger: AgentId,
        win_rate: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    agents: Vec<Agent>,
    /// Position of the Champion in `agents`
    champion: usize,
    next_id: u32,
    #[serde(default)]
    history: Vec<ChampionEvent>,
}

impl Roster {
    /// Create a roster with a Champion and named training agents.
    pub fn new(
        champion: WeightsVersion,
        training: Vec<(String, WeightsVersion)>,
    ) -> Result<Self, LeagueError> {
        let mut roster = Self {
            agents: Vec::with_capacity(training.len() + 2),
            champion: 0,
            next_id: 0,
            history: Vec::new(),
        };
        roster.push(Role::Champion, champion);

        for (name, weights) in training {
            if name.trim().is_empty() {
                return Err(LeagueError::Roster("training agent name is empty".into()));
            }
            if roster
                .agents
                .iter()
                .any(|a| a.role.training_name() == Some(name.as_str()))
            {
                return Err(LeagueError::Roster(format!(
                    "duplicate training agent '{name}'"
                )));
            }
            roster.push(Role::TrainingAgent(name), weights);
        }

        Ok(roster)
    }

    fn push(&mut self, role: Role, weights: WeightsVersion) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.agents.push(Agent {
            id,
            role,
            weights,
            stats: MatchStats::default(),
        });
        id
    }

    /// Verify the roster invariants. Used on rosters read from a checkpoint.
    pub fn check(&self) -> Result<(), LeagueError> {
        let champions = self.agents.iter().filter(|a| a.role.is_champion()).count();
        if champions != 1 {
            return Err(LeagueError::Roster(format!(
                "expected exactly one champion, found {champions}"
            )));
        }
        if !self
            .agents
            .get(self.champion)
            .is_some_and(|a| a.role.is_champion())
        {
            return Err(LeagueError::Roster("champion index is stale".into()));
        }
        let wildcards = self
            .agents
            .iter()
            .filter(|a| a.role == Role::Wildcard)
            .count();
        if wildcards > 1 {
            return Err(LeagueError::Roster(format!(
                "expected at most one wildcard, found {wildcards}"
            )));
        }
        if self.agents.iter().any(|a| a.id.0 >= self.next_id) {
            return Err(LeagueError::Roster("agent id beyond next_id".into()));
        }
        Ok(())
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AgentId) -> Result<&mut Agent, LeagueError> {
        self.agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(LeagueError::UnknownAgent(id))
    }

    pub fn champion(&self) -> &Agent {
        &self.agents[self.champion]
    }

    /// Training agents in roster order.
    pub fn training_agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents
            .iter()
            .filter(|a| matches!(a.role, Role::TrainingAgent(_)))
    }

    pub fn wildcard(&self) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role == Role::Wildcard)
    }

    pub fn history(&self) -> &[ChampionEvent] {
        &self.history
    }

    /// Training agent with the best cumulative win rate. Ties go to the
    /// agent listed first.
    pub fn best_training_agent(&self, weighting: DrawWeighting) -> Option<AgentId> {
        let mut best: Option<(AgentId, f64)> = None;
        for agent in self.training_agents() {
            let rate = agent.stats.win_rate(weighting);
            if best.map_or(true, |(_, b)| rate > b) {
                best = Some((agent.id, rate));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Swap roles: the challenger becomes Champion and the previous Champion
    /// takes over the challenger's training name.
    pub fn promote(
        &mut self,
        challenger: AgentId,
        generation: u64,
        win_rate: f64,
    ) -> Result<ChampionEvent, LeagueError> {
        let idx = self
            .agents
            .iter()
            .position(|a| a.id == challenger)
            .ok_or(LeagueError::UnknownAgent(challenger))?;
        let name = match &self.agents[idx].role {
            Role::TrainingAgent(name) => name.clone(),
            _ => return Err(LeagueError::NotTrainingAgent(challenger)),
        };

        let previous = self.champion;
        self.agents[idx].role = Role::Champion;
        self.agents[previous].role = Role::TrainingAgent(name);
        self.champion = idx;

        let event = ChampionEvent::Promoted {
            generation,
            champion: challenger,
            previous: self.agents[previous].id,
            win_rate,
        };
        self.history.push(event.clone());
        Ok(event)
    }

    /// Record that the Champion held off a challenger.
    pub fn record_defense(
        &mut self,
        challenger: AgentId,
        generation: u64,
        win_rate: f64,
    ) -> ChampionEvent {
        let event = ChampionEvent::Defended {
            generation,
            champion: self.champion().id,
            challenger,
            win_rate,
        };
        self.history.push(event.clone());
        event
    }

    /// Drop any existing Wildcard and add a fresh one with new stats.
    pub fn replace_wildcard(&mut self, weights: WeightsVersion) -> AgentId {
        let champion_id = self.champion().id;
        self.agents.retain(|a| a.role != Role::Wildcard);
        if let Some(idx) = self.agents.iter().position(|a| a.id == champion_id) {
            self.champion = idx;
        }
        self.push(Role::Wildcard, weights)
    }

    /// Add one game result to an agent's cumulative stats.
    pub fn record_result(&mut self, agent: AgentId, reward: f32) -> Result<(), LeagueError> {
        self.get_mut(agent)?.stats.record(reward);
        Ok(())
    }

    /// Point an agent at new weights.
    pub fn apply_weights(
        &mut self,
        agent: AgentId,
        weights: WeightsVersion,
    ) -> Result<(), LeagueError> {
        self.get_mut(agent)?.weights = weights;
        Ok(())
    }
}
