//! Generational league for self-play training.
//!
//! The league owns a roster of agents (one Champion, named training agents
//! and an occasional Wildcard) and advances it one generation at a time:
//!
//! ```text
//!  LeagueScheduler
//!    ├─ Scheduling      build_match_set(roster, config)
//!    ├─ Running         EpisodeRunner x N  ──> mcts::MctsSearch ──> Evaluator
//!    │                                            └─> validation::validate
//!    ├─ Aggregating     GenerationStats, TrainingCollaborator::train
//!    ├─ ChallengerCheck best training agent vs Champion, maybe promote
//!    ├─ WildcardCheck   fresh baseline vs Champion, trend point only
//!    └─ Checkpointing   PersistenceCollaborator::save(LeagueSnapshot)
//! ```
//!
//! Collaborators (training, evaluator construction, persistence, events) are
//! traits; [`local`] has in-process implementations.
//!
//! # Example
//!
//! ```no_run
//! use games_checkers::Checkers;
//! use league::{
//!     Collaborators, JsonCheckpointStore, LeagueConfig, LeagueScheduler, LocalEvaluators,
//!     LocalTrainer, TracingSink,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), league::LeagueError> {
//! let collaborators = Collaborators {
//!     evaluators: Arc::new(LocalEvaluators::new()),
//!     trainer: Arc::new(LocalTrainer::new()),
//!     persistence: Arc::new(JsonCheckpointStore::new("./data/checkpoints")),
//!     events: Arc::new(TracingSink),
//! };
//! let mut league =
//!     LeagueScheduler::new(Arc::new(Checkers::mini()), LeagueConfig::default(), collaborators)?;
//! league.run(10).await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod collaborators;
pub mod episode;
pub mod error;
pub mod events;
pub mod generation;
pub mod local;
pub mod persistence;
pub mod schedule;
pub mod scheduler;
pub mod settings;
pub mod stats;

pub use agent::{Agent, AgentId, ChampionEvent, MatchStats, Role, Roster, WeightsVersion};
pub use collaborators::{
    Collaborators, EvaluatorProvider, LeagueSnapshot, PersistenceCollaborator,
    TrainingCollaborator, WeightsUpdate,
};
pub use episode::{
    EpisodeConfig, EpisodeFailure, EpisodeOutcome, EpisodeRunner, EpisodeSearchStats,
    EpisodeSpec, EpisodeStatus, Ply, Seat, TerminalReason, TerminalResult,
};
pub use error::{LeagueError, PersistenceError, TrainingError};
pub use events::{
    ChannelSink, EventSink, FanoutSink, LeagueEvent, NullSink, SinkViolationLog, TracingSink,
};
pub use generation::{
    ChallengerReport, Decision, Generation, GenerationStats, Phase, SeriesScore, WildcardReport,
};
pub use local::{LocalEvaluators, LocalTrainer, MemoryCheckpointStore, TrainingBatch};
pub use persistence::JsonCheckpointStore;
pub use schedule::{build_match_set, derive_seed, head_to_head, MatchKind, ScheduledMatch};
pub use scheduler::LeagueScheduler;
pub use settings::{is_due, LeagueConfig};
pub use stats::{trend_slope, LeagueStatistics, TrendPoint};
