//! MCTS benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p mcts`
//!
//! These benchmarks measure:
//! - Full MCTS search with varying simulation counts
//! - Search from different game states (opening, near-terminal)
//! - Batched leaf evaluation
//! - Tree operations (selection, backpropagation, policy extraction)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use engine_core::{GameRules, Side};
use games_checkers::{Checkers, CheckersState};
use mcts::{MaterialEvaluator, MctsConfig, MctsSearch, MctsTree, UniformEvaluator};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn search_once<E: mcts::Evaluator<Checkers>>(
    rules: &Checkers,
    evaluator: &E,
    config: &MctsConfig,
    state: &CheckersState,
) {
    let mut rng = ChaCha20Rng::seed_from_u64(42);
    let mut search = MctsSearch::new(
        rules,
        evaluator,
        config.clone(),
        state.clone(),
        rules.legal_moves(state),
    )
    .unwrap();
    black_box(search.run(&mut rng).unwrap());
}

// =============================================================================
// Full MCTS Search Benchmarks
// =============================================================================

fn bench_mcts_search_simulations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_search_simulations");

    for (name, rules) in [("mini", Checkers::mini()), ("standard", Checkers::standard())] {
        let state = rules.initial_state();
        for sims in [50, 200, 800] {
            group.throughput(Throughput::Elements(sims as u64));
            group.bench_with_input(BenchmarkId::new(name, sims), &sims, |b, &sims| {
                let config = MctsConfig::for_testing().with_simulations(sims);
                b.iter(|| search_once(&rules, &UniformEvaluator, &config, &state));
            });
        }
    }

    group.finish();
}

fn bench_mcts_game_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_game_phases");
    let rules = Checkers::mini();
    let config = MctsConfig::for_testing().with_simulations(200);

    group.bench_function("opening", |b| {
        let state = rules.initial_state();
        b.iter(|| search_once(&rules, &UniformEvaluator, &config, &state));
    });

    // King can take the last opposing man
    group.bench_function("near_terminal", |b| {
        let state = CheckersState::from_rows(
            &["......", "......", "......", "..x...", ".o.X..", "x....."],
            Side::First,
        )
        .unwrap();
        b.iter(|| search_once(&rules, &UniformEvaluator, &config, &state));
    });

    group.bench_function("material_evaluator", |b| {
        let state = rules.initial_state();
        let evaluator = MaterialEvaluator::default();
        b.iter(|| search_once(&rules, &evaluator, &config, &state));
    });

    group.finish();
}

// =============================================================================
// Batching Benchmarks
// =============================================================================

fn bench_mcts_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_batching");
    let rules = Checkers::standard();
    let state = rules.initial_state();

    for batch in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("eval_batch", batch), &batch, |b, &batch| {
            let config = MctsConfig::for_testing()
                .with_simulations(400)
                .with_eval_batch_size(batch);
            b.iter(|| search_once(&rules, &UniformEvaluator, &config, &state));
        });
    }

    group.finish();
}

// =============================================================================
// Tree Operation Benchmarks
// =============================================================================

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcts_tree_ops");

    group.bench_function("allocate_node", |b| {
        b.iter(|| {
            let mut tree: MctsTree<u32, u8> = MctsTree::new(0, None);
            for i in 0..100u8 {
                tree.add_child(tree.root(), i % 9, 0.11, i as u32, None);
            }
            black_box(tree.len())
        });
    });

    group.bench_function("select_child", |b| {
        let mut tree: MctsTree<u32, u8> = MctsTree::new(0, None);
        for i in 0..9u8 {
            let child_id = tree.add_child(tree.root(), i, (i as f32 + 1.0) / 45.0, i as u32, None);
            let child = tree.get_mut(child_id);
            child.visit_count = (i as u32 + 1) * 10;
            child.value_sum = (i as f32 - 4.0) * 0.1 * child.visit_count as f32;
        }
        tree.get_mut(tree.root()).visit_count = 450;

        b.iter(|| black_box(tree.select_child(tree.root(), 1.25)));
    });

    group.bench_function("backpropagate_depth_5", |b| {
        b.iter_batched(
            || {
                let mut tree: MctsTree<u32, u8> = MctsTree::new(0, None);
                let mut parent = tree.root();
                for i in 0..5u8 {
                    let terminal = (i == 4).then_some(1.0);
                    parent = tree.add_child(parent, i, 0.5, i as u32, terminal);
                }
                (tree, parent)
            },
            |(mut tree, leaf)| {
                tree.backpropagate(leaf, 1.0);
                black_box(tree)
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("root_policy", |b| {
        let mut tree: MctsTree<u32, u8> = MctsTree::new(0, None);
        for i in 0..9u8 {
            let child_id = tree.add_child(tree.root(), i, 1.0 / 9.0, i as u32, None);
            tree.get_mut(child_id).visit_count = (i as u32 + 1) * 50;
        }

        b.iter(|| black_box(tree.root_policy()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mcts_search_simulations,
    bench_mcts_game_phases,
    bench_mcts_batching,
    bench_tree_operations,
);
criterion_main!(benches);
