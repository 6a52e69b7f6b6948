//! Violation records and the sinks that receive them.
//!
//! A [`ViolationRecord`] carries enough context to reproduce a rejected
//! move: where it happened (generation, episode, ply), who tried it, and the
//! boards on either side of the transition.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

use crate::validator::{ValidationResult, ViolationKind};

/// Number of recent records kept by [`ViolationStats`].
pub const RECENT_VIOLATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl From<ViolationKind> for Severity {
    fn from(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::PieceCreated
            | ViolationKind::IllegalPromotion
            | ViolationKind::CountIncreased => Severity::Error,
            ViolationKind::CaptureMismatch => Severity::Warning,
        }
    }
}

/// Where a move was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationContext {
    pub game: String,
    pub agent: String,
    pub generation: u64,
    pub episode_id: u64,
    /// Ply index within the episode (0-based)
    pub move_number: u32,
}

/// One rejected move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Highest-precedence violation of the transition
    pub kind: ViolationKind,
    /// Every violation of the transition, joined
    pub description: String,
    #[serde(flatten)]
    pub context: ViolationContext,
    pub board_before: String,
    pub board_after: String,
    pub attempted_move: String,
    pub severity: Severity,
    pub timestamp: u64,
}

impl ViolationRecord {
    /// Build a record from a failed validation. Returns `None` when the
    /// result has no violations.
    pub fn from_result(
        result: &ValidationResult,
        context: ViolationContext,
        attempted_move: String,
        board_before: String,
        board_after: String,
    ) -> Option<Self> {
        let kind = result.primary_kind()?;
        Some(Self {
            kind,
            description: result.summary(),
            context,
            board_before,
            board_after,
            attempted_move,
            severity: Severity::from(kind),
            timestamp: result.timestamp,
        })
    }
}

/// Fire-and-forget receiver of violation records.
///
/// Implementations must not block gameplay and must swallow their own
/// failures.
pub trait ViolationLog: Send + Sync {
    fn record(&self, record: &ViolationRecord);
}

impl<T: ViolationLog + ?Sized> ViolationLog for Arc<T> {
    fn record(&self, record: &ViolationRecord) {
        (**self).record(record)
    }
}

/// Writes each record as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingViolationLog;

impl ViolationLog for TracingViolationLog {
    fn record(&self, record: &ViolationRecord) {
        let ctx = &record.context;
        match record.severity {
            Severity::Error => error!(
                kind = %record.kind,
                agent = %ctx.agent,
                generation = ctx.generation,
                episode_id = ctx.episode_id,
                move_number = ctx.move_number,
                attempted_move = %record.attempted_move,
                "Move rejected: {}",
                record.description
            ),
            _ => warn!(
                kind = %record.kind,
                agent = %ctx.agent,
                generation = ctx.generation,
                episode_id = ctx.episode_id,
                move_number = ctx.move_number,
                attempted_move = %record.attempted_move,
                "Move rejected: {}",
                record.description
            ),
        }
    }
}

/// Forwards every record to several logs in order.
#[derive(Default, Clone)]
pub struct ViolationFanout {
    logs: Vec<Arc<dyn ViolationLog>>,
}

impl ViolationFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, log: Arc<dyn ViolationLog>) -> Self {
        self.logs.push(log);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

impl ViolationLog for ViolationFanout {
    fn record(&self, record: &ViolationRecord) {
        for log in &self.logs {
            log.record(record);
        }
    }
}

/// Serializable view of [`ViolationStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub total: u64,
    pub by_kind: BTreeMap<ViolationKind, u64>,
    /// Agents with at least one rejected move
    pub agents: BTreeSet<String>,
    /// Most recent records, oldest first
    pub recent: Vec<ViolationRecord>,
}

#[derive(Debug, Default)]
struct StatsInner {
    total: u64,
    by_kind: BTreeMap<ViolationKind, u64>,
    agents: BTreeSet<String>,
    recent: VecDeque<ViolationRecord>,
}

/// In-memory violation counters.
#[derive(Debug, Default)]
pub struct ViolationStats {
    inner: Mutex<StatsInner>,
}

impl ViolationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore counters from a previously taken summary.
    pub fn from_summary(summary: ViolationSummary) -> Self {
        let inner = StatsInner {
            total: summary.total,
            by_kind: summary.by_kind,
            agents: summary.agents,
            recent: summary.recent.into_iter().collect(),
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    pub fn snapshot(&self) -> ViolationSummary {
        let inner = self.lock();
        ViolationSummary {
            total: inner.total,
            by_kind: inner.by_kind.clone(),
            agents: inner.agents.clone(),
            recent: inner.recent.iter().cloned().collect(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatsInner> {
        // A panic while holding the lock leaves plain counters behind
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ViolationLog for ViolationStats {
    fn record(&self, record: &ViolationRecord) {
        let mut inner = self.lock();
        inner.total += 1;
        *inner.by_kind.entry(record.kind).or_insert(0) += 1;
        inner.agents.insert(record.context.agent.clone());
        if inner.recent.len() == RECENT_VIOLATIONS {
            inner.recent.pop_front();
        }
        inner.recent.push_back(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Violation, ValidationResult};
    use engine_core::Side;

    fn failed(kind: ViolationKind) -> ValidationResult {
        ValidationResult {
            ok: false,
            violations: vec![Violation {
                kind,
                side: Side::First,
                piece: None,
                description: "test".into(),
            }],
            timestamp: 1_700_000_000,
        }
    }

    fn record(agent: &str, move_number: u32, kind: ViolationKind) -> ViolationRecord {
        ViolationRecord::from_result(
            &failed(kind),
            ViolationContext {
                game: "checkers".into(),
                agent: agent.into(),
                generation: 3,
                episode_id: 12,
                move_number,
            },
            "17-22".into(),
            "before".into(),
            "after".into(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_ok_result_is_none() {
        let ok = ValidationResult {
            ok: true,
            violations: vec![],
            timestamp: 0,
        };
        let ctx = ViolationContext {
            game: "checkers".into(),
            agent: "Alpha".into(),
            generation: 0,
            episode_id: 0,
            move_number: 0,
        };
        assert!(ViolationRecord::from_result(&ok, ctx, String::new(), String::new(), String::new())
            .is_none());
    }

    #[test]
    fn test_severity_follows_kind() {
        assert_eq!(record("a", 0, ViolationKind::PieceCreated).severity, Severity::Error);
        assert_eq!(
            record("a", 0, ViolationKind::CaptureMismatch).severity,
            Severity::Warning
        );
    }

    #[test]
    fn test_stats_counts_and_recent_window() {
        let stats = ViolationStats::new();
        for i in 0..12 {
            stats.record(&record("Alpha", i, ViolationKind::PieceCreated));
        }
        stats.record(&record("Beta", 99, ViolationKind::CountIncreased));

        let summary = stats.snapshot();
        assert_eq!(summary.total, 13);
        assert_eq!(summary.by_kind[&ViolationKind::PieceCreated], 12);
        assert_eq!(summary.by_kind[&ViolationKind::CountIncreased], 1);
        assert_eq!(summary.agents.len(), 2);
        assert_eq!(summary.recent.len(), RECENT_VIOLATIONS);
        assert_eq!(summary.recent.last().unwrap().context.move_number, 99);
        assert_eq!(summary.recent[0].context.move_number, 3);
    }

    #[test]
    fn test_summary_roundtrip_restores_stats() {
        let stats = ViolationStats::new();
        stats.record(&record("Alpha", 1, ViolationKind::IllegalPromotion));

        let json = serde_json::to_string(&stats.snapshot()).unwrap();
        let summary: ViolationSummary = serde_json::from_str(&json).unwrap();
        let restored = ViolationStats::from_summary(summary);
        assert_eq!(restored.total(), 1);
        assert_eq!(restored.snapshot(), stats.snapshot());
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("Alpha", 4, ViolationKind::PieceCreated)).unwrap();
        assert_eq!(json["kind"], "piece_created");
        assert_eq!(json["agent"], "Alpha");
        assert_eq!(json["severity"], "ERROR");
        assert_eq!(json["move_number"], 4);
    }

    #[test]
    fn test_fanout_reaches_every_log() {
        let a = Arc::new(ViolationStats::new());
        let b = Arc::new(ViolationStats::new());
        let fanout = ViolationFanout::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingViolationLog));

        fanout.record(&record("Alpha", 0, ViolationKind::PieceCreated));
        assert_eq!(a.total(), 1);
        assert_eq!(b.total(), 1);
    }
}
