//! Shared fixtures for the league integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use engine_core::{
    CancelToken, GameRules, GameStatus, MoveEffect, PieceInventory, PieceKind, Side,
};
use league::{
    Collaborators, EventSink, EvaluatorProvider, LeagueConfig, LeagueEvent, LeagueSnapshot,
    LocalTrainer, MemoryCheckpointStore, PersistenceCollaborator, PersistenceError,
    WeightsVersion,
};
use mcts::{EvalResult, Evaluator, EvaluatorError, MctsConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const TOKEN: PieceKind = PieceKind("token");

/// Each side names a number once; the higher number wins.
#[derive(Debug)]
pub struct Showdown;

#[derive(Debug, Clone, PartialEq)]
pub struct ShowdownState {
    pub picks: [Option<u8>; 2],
}

impl GameRules for Showdown {
    type State = ShowdownState;
    type Move = u8;

    fn name(&self) -> &'static str {
        "showdown"
    }

    fn initial_state(&self) -> ShowdownState {
        ShowdownState { picks: [None; 2] }
    }

    fn side_to_move(&self, state: &ShowdownState) -> Side {
        if state.picks[0].is_none() {
            Side::First
        } else {
            Side::Second
        }
    }

    fn legal_moves(&self, state: &ShowdownState) -> Vec<u8> {
        if self.status(state).is_terminal() {
            Vec::new()
        } else {
            vec![0, 1, 2]
        }
    }

    fn apply(&self, state: &ShowdownState, mv: &u8) -> ShowdownState {
        let mut next = state.clone();
        next.picks[self.side_to_move(state).index()] = Some(*mv);
        next
    }

    fn status(&self, state: &ShowdownState) -> GameStatus {
        match state.picks {
            [Some(a), Some(b)] if a > b => GameStatus::Won(Side::First),
            [Some(a), Some(b)] if a < b => GameStatus::Won(Side::Second),
            [Some(_), Some(_)] => GameStatus::Drawn,
            _ => GameStatus::Ongoing,
        }
    }

    fn inventory(&self, _state: &ShowdownState) -> PieceInventory {
        let mut inv = PieceInventory::new();
        inv.add(Side::First, TOKEN, 1);
        inv.add(Side::Second, TOKEN, 1);
        inv
    }

    fn move_effect(&self, state: &ShowdownState, _mv: &u8) -> MoveEffect {
        MoveEffect::quiet(self.side_to_move(state))
    }
}

/// [`Showdown`] whose inventory hands each side an extra token for every
/// number it names, so the validator rejects every move.
#[derive(Debug)]
pub struct Forged;

impl GameRules for Forged {
    type State = ShowdownState;
    type Move = u8;

    fn name(&self) -> &'static str {
        "forged-showdown"
    }

    fn initial_state(&self) -> ShowdownState {
        Showdown.initial_state()
    }

    fn side_to_move(&self, state: &ShowdownState) -> Side {
        Showdown.side_to_move(state)
    }

    fn legal_moves(&self, state: &ShowdownState) -> Vec<u8> {
        Showdown.legal_moves(state)
    }

    fn apply(&self, state: &ShowdownState, mv: &u8) -> ShowdownState {
        Showdown.apply(state, mv)
    }

    fn status(&self, state: &ShowdownState) -> GameStatus {
        Showdown.status(state)
    }

    fn inventory(&self, state: &ShowdownState) -> PieceInventory {
        let mut inv = PieceInventory::new();
        for (side, pick) in [Side::First, Side::Second].into_iter().zip(state.picks) {
            inv.add(side, TOKEN, 1 + u32::from(pick.is_some()));
        }
        inv
    }

    fn move_effect(&self, state: &ShowdownState, mv: &u8) -> MoveEffect {
        Showdown.move_effect(state, mv)
    }
}

/// Always names 1.
pub struct Steady;

impl Evaluator<Showdown> for Steady {
    fn evaluate(
        &self,
        _rules: &Showdown,
        _state: &ShowdownState,
        _legal: &[u8],
    ) -> Result<EvalResult<u8>, EvaluatorError> {
        Ok(EvalResult {
            priors: vec![(1, 1.0)],
            value: 0.0,
        })
    }
}

/// Pops one entry per move: `true` names 2 (beats [`Steady`]), `false`
/// names 0. Goes offline once the script runs out.
#[derive(Default)]
pub struct Scripted {
    script: Mutex<VecDeque<bool>>,
}

impl Scripted {
    pub fn new(wins: usize, losses: usize) -> Self {
        let script = std::iter::repeat(true)
            .take(wins)
            .chain(std::iter::repeat(false).take(losses))
            .collect();
        Self {
            script: Mutex::new(script),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl Evaluator<Showdown> for Scripted {
    fn evaluate(
        &self,
        _rules: &Showdown,
        _state: &ShowdownState,
        _legal: &[u8],
    ) -> Result<EvalResult<u8>, EvaluatorError> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(true) => Ok(EvalResult {
                priors: vec![(2, 1.0)],
                value: 0.0,
            }),
            Some(false) => Ok(EvalResult {
                priors: vec![(0, 1.0)],
                value: 0.0,
            }),
            None => Err(EvaluatorError::Unavailable("script exhausted".into())),
        }
    }
}

/// Hands out "w0", "w1", ... The agent holding `scripted_tag` plays from
/// the script, everyone else plays [`Steady`].
pub struct ShowdownProvider {
    next_tag: AtomicU64,
    scripted_tag: Option<String>,
    scripted: Arc<Scripted>,
}

impl ShowdownProvider {
    pub fn steady() -> Self {
        Self {
            next_tag: AtomicU64::new(0),
            scripted_tag: None,
            scripted: Arc::new(Scripted::default()),
        }
    }

    /// A new league hands its training agents weights first, so the single
    /// training agent gets "w0".
    pub fn scripted(tag: &str, scripted: Arc<Scripted>) -> Self {
        Self {
            next_tag: AtomicU64::new(0),
            scripted_tag: Some(tag.to_string()),
            scripted,
        }
    }
}

impl EvaluatorProvider<Showdown> for ShowdownProvider {
    fn evaluator(
        &self,
        weights: &WeightsVersion,
    ) -> Result<Arc<dyn Evaluator<Showdown>>, EvaluatorError> {
        if self.scripted_tag.as_deref() == Some(weights.tag.as_str()) {
            Ok(self.scripted.clone())
        } else {
            Ok(Arc::new(Steady))
        }
    }

    fn fresh_weights(&self) -> WeightsVersion {
        let n = self.next_tag.fetch_add(1, Ordering::Relaxed);
        WeightsVersion::new(format!("w{n}"), 0)
    }
}

/// Keeps every event; optionally cancels when `cancel_when` matches.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<LeagueEvent>>,
    cancel: Option<(CancelToken, fn(&LeagueEvent) -> bool)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling(token: CancelToken, cancel_when: fn(&LeagueEvent) -> bool) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            cancel: Some((token, cancel_when)),
        }
    }

    pub fn events(&self) -> Vec<LeagueEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Ids of every played episode, in emission order.
    pub fn episode_ids(&self) -> Vec<u64> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                LeagueEvent::EpisodeCompleted { episode_id, .. }
                | LeagueEvent::EpisodeFailed { episode_id, .. } => Some(*episode_id),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for Recorder {
    fn emit(&self, event: LeagueEvent) {
        if let Some((token, cancel_when)) = &self.cancel {
            if cancel_when(&event) {
                token.cancel();
            }
        }
        self.events.lock().unwrap().push(event);
    }
}

/// Every save fails.
pub struct BrokenStore;

#[async_trait]
impl PersistenceCollaborator for BrokenStore {
    async fn save(&self, _snapshot: &LeagueSnapshot) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("disk full".into()))
    }

    async fn load(&self, generation_index: u64) -> Result<LeagueSnapshot, PersistenceError> {
        Err(PersistenceError::NotFound(generation_index))
    }

    async fn latest(&self) -> Result<Option<LeagueSnapshot>, PersistenceError> {
        Ok(None)
    }
}

/// One training agent, no training-set games, a challenger check every
/// generation and greedy zero-simulation search.
pub fn showdown_config() -> LeagueConfig {
    let mut config = LeagueConfig::default();
    config.training_agents = vec!["Alpha".into()];
    config.champion_self_play_games = 0;
    config.paired_games = 0;
    config.challenger_interval = 1;
    config.challenger_games = 20;
    config.challenger_threshold = 0.55;
    config.wildcard_interval = 0;
    config.checkpoint_interval = 0;
    config.max_concurrent_episodes = 4;
    config.seed = 11;
    config.log_violations = false;
    config.episode.search = MctsConfig::for_testing()
        .with_simulations(0)
        .with_temperature(0.0)
        .with_dirichlet(0.0, 0.0);
    config.episode.temp_threshold = 0;
    config.episode.evaluator_retries = 0;
    config.episode.uniform_fallback = false;
    config
}

pub fn showdown_collaborators(
    provider: ShowdownProvider,
    events: Arc<dyn EventSink>,
) -> Collaborators<Showdown> {
    Collaborators {
        evaluators: Arc::new(provider),
        trainer: Arc::new(LocalTrainer::new()),
        persistence: Arc::new(MemoryCheckpointStore::new()),
        events,
    }
}

/// Small, fast settings for full checkers leagues.
pub fn checkers_config(seed: u64) -> LeagueConfig {
    let mut config = LeagueConfig::default();
    config.training_agents = vec!["Alpha".into(), "Beta".into()];
    config.champion_self_play_games = 1;
    config.paired_games = 1;
    config.challenger_interval = 2;
    config.challenger_games = 2;
    config.wildcard_interval = 3;
    config.wildcard_games = 2;
    config.wildcard_trend_window = 3;
    config.checkpoint_interval = 1;
    config.max_concurrent_episodes = 2;
    config.seed = seed;
    config.log_violations = false;
    config.episode.search = MctsConfig::for_testing()
        .with_simulations(4)
        .with_temperature(1.0)
        .with_dirichlet(0.3, 0.25);
    config.episode.temp_threshold = 4;
    config.episode.max_moves = 24;
    config
}
