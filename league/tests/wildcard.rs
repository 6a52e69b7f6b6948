//! Wildcard audits and the Champion-strength trend.

mod common;

use common::{showdown_collaborators, showdown_config, Recorder, Showdown, ShowdownProvider};
use league::{AgentId, Decision, LeagueEvent, LeagueScheduler, Role};
use std::sync::Arc;

#[tokio::test]
async fn test_wildcard_audits_record_trend_points() {
    let recorder = Arc::new(Recorder::new());
    let mut config = showdown_config();
    config.challenger_interval = 0;
    config.wildcard_interval = 1;
    config.wildcard_games = 4;
    config.wildcard_trend_window = 3;
    let mut league = LeagueScheduler::new(
        Arc::new(Showdown),
        config,
        showdown_collaborators(ShowdownProvider::steady(), recorder.clone()),
    )
    .unwrap();

    let mut wildcards = Vec::new();
    for index in 0..3 {
        let generation = league.run_generation().await.unwrap();
        let report = match generation.decisions() {
            [Decision::WildcardRecorded(report)] => report.clone(),
            other => panic!("expected a wildcard report, got {other:?}"),
        };
        assert_eq!(report.generation, index);
        assert_eq!(report.champion, AgentId(0));
        // Steady against steady: every game is drawn
        assert_eq!(report.score.draws, 4);
        assert!((report.champion_score - 0.5).abs() < 1e-9);
        if index == 0 {
            assert_eq!(report.trend, None);
        } else {
            assert_eq!(report.trend, Some(0.0));
        }
        wildcards.push(report.wildcard);
    }

    // A fresh wildcard each audit, and only one on the roster
    assert_eq!(wildcards, vec![AgentId(2), AgentId(3), AgentId(4)]);
    let roster = league.roster();
    assert!(roster.check().is_ok());
    assert_eq!(roster.wildcard().map(|a| a.id), Some(AgentId(4)));
    assert_eq!(
        roster.agents().iter().filter(|a| a.role == Role::Wildcard).count(),
        1
    );
    // Audits never promote and never count toward match stats
    assert_eq!(roster.champion().id, AgentId(0));
    assert!(roster.history().is_empty());
    assert_eq!(roster.champion().stats.games, 0);

    let statistics = league.statistics();
    let generations: Vec<u64> = statistics
        .wildcard_trend
        .iter()
        .map(|p| p.generation)
        .collect();
    assert_eq!(generations, vec![0, 1, 2]);
    assert!(statistics.wildcard_trend.iter().all(|p| p.games == 4));
    assert_eq!(statistics.trend(3), Some(0.0));

    let recorded = recorder
        .events()
        .iter()
        .filter(|e| matches!(e, LeagueEvent::WildcardRecorded(_)))
        .count();
    assert_eq!(recorded, 3);
}

#[tokio::test]
async fn test_wildcard_not_run_when_disabled() {
    let recorder = Arc::new(Recorder::new());
    let mut config = showdown_config();
    config.challenger_interval = 0;
    config.wildcard_interval = 0;
    let mut league = LeagueScheduler::new(
        Arc::new(Showdown),
        config,
        showdown_collaborators(ShowdownProvider::steady(), recorder.clone()),
    )
    .unwrap();

    league.run(3).await.unwrap();
    assert!(league.roster().wildcard().is_none());
    assert!(league.statistics().wildcard_trend.is_empty());
    assert!(recorder.episode_ids().is_empty());
}
