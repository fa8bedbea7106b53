//! Property tests for coloring and ordering.
//!
//! Random DAGs are generated block by block, each block picking a random
//! non-empty subset of the earlier blocks as parents, with hashes shuffled so
//! that hash order and insertion order disagree.

use consensus::consensus::ghostdag::{is_k_cluster, MaxClusterSearch};
use consensus::{color, ConsensusManager, DagStore, Hash};
use phantom_core::config::{ColoringStrategyKind, ConsensusParams};
use phantom_core::ghostdag::BlockColor;
use phantom_core::KType;
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

type Blocks = Vec<(Hash, Vec<Hash>)>;

fn dag_strategy(max_blocks: usize) -> impl Strategy<Value = Blocks> {
    (1..=max_blocks)
        .prop_flat_map(|n| (vec(any::<u32>(), n), Just((0..n as u64).collect::<Vec<u64>>()).prop_shuffle()))
        .prop_map(|(masks, ids)| {
            let mut blocks = Vec::with_capacity(ids.len());
            for (i, mask) in masks.iter().enumerate() {
                let mut parents: Vec<usize> = (0..i).filter(|j| mask & (1u32 << j) != 0).collect();
                if parents.is_empty() && i > 0 {
                    parents.push(*mask as usize % i);
                }
                let parents = parents.into_iter().map(|j| Hash::from_u64_word(ids[j])).collect();
                blocks.push((Hash::from_u64_word(ids[i]), parents));
            }
            blocks
        })
}

fn build_dag(blocks: &Blocks) -> DagStore {
    let mut dag = DagStore::new();
    for (hash, parents) in blocks {
        dag.add_block(*hash, parents.clone()).unwrap_or_else(|e| panic!("add {hash} failed: {e}"));
    }
    dag
}

fn build_manager(params: ConsensusParams, blocks: &Blocks) -> ConsensusManager {
    let manager = ConsensusManager::new(params).unwrap_or_else(|e| panic!("bad params: {e}"));
    for (hash, parents) in blocks {
        manager.add_block(*hash, parents.clone()).unwrap_or_else(|e| panic!("add {hash} failed: {e}"));
    }
    manager
}

fn params(k: KType, strategy: ColoringStrategyKind) -> ConsensusParams {
    ConsensusParams::with_k(i64::from(k)).unwrap_or_else(|e| panic!("bad k: {e}")).with_strategy(strategy)
}

/// Another topological order of the same blocks, picking the available block
/// with the lowest priority first.
fn reorder(blocks: &Blocks, priorities: &[u32]) -> Blocks {
    let mut placed = HashSet::new();
    let mut result = Vec::with_capacity(blocks.len());
    while result.len() < blocks.len() {
        let next = (0..blocks.len())
            .filter(|i| !placed.contains(&blocks[*i].0) && blocks[*i].1.iter().all(|p| placed.contains(p)))
            .min_by_key(|i| (priorities[*i % priorities.len()], *i))
            .unwrap_or_else(|| panic!("no block is ready"));
        placed.insert(blocks[next].0);
        result.push(blocks[next].clone());
    }
    result
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn blue_set_is_k_cluster(blocks in dag_strategy(12), k in 0u16..4) {
        let dag = build_dag(&blocks);
        let max_cluster = MaxClusterSearch::new(k, 1_000_000).run(&dag).unwrap_or_else(|e| panic!("search failed: {e}"));
        for strategy in [ColoringStrategyKind::Greedy, ColoringStrategyKind::Exact] {
            let coloring = color(&dag, &params(k, strategy)).unwrap_or_else(|e| panic!("{strategy} failed: {e}"));
            let blues = coloring.blue_set();
            prop_assert!(is_k_cluster(&dag, &blues, k).unwrap_or(false), "{} blue set is not a {}-cluster", strategy, k);
            prop_assert!(blues.len() <= max_cluster.len());
            prop_assert_eq!(blues.len() + coloring.red_set().len(), dag.len());
        }
    }

    #[test]
    fn strategies_agree_at_extreme_k(blocks in dag_strategy(12)) {
        let dag = build_dag(&blocks);
        for k in [0, blocks.len() as KType] {
            let greedy = color(&dag, &params(k, ColoringStrategyKind::Greedy)).unwrap_or_else(|e| panic!("{e}"));
            let exact = color(&dag, &params(k, ColoringStrategyKind::Exact)).unwrap_or_else(|e| panic!("{e}"));
            prop_assert_eq!(&greedy, &exact);
        }

        let everything = color(&dag, &params(blocks.len() as KType, ColoringStrategyKind::Greedy)).unwrap_or_else(|e| panic!("{e}"));
        prop_assert!(everything.red_set().is_empty());
    }

    #[test]
    fn insertion_order_does_not_matter(blocks in dag_strategy(12), priorities in vec(any::<u32>(), 12), k in 0i64..4) {
        let reordered = reorder(&blocks, &priorities);
        for strategy in [ColoringStrategyKind::Greedy, ColoringStrategyKind::Exact] {
            let params = ConsensusParams::with_k(k).unwrap_or_else(|e| panic!("{e}")).with_strategy(strategy);
            let first = build_manager(params.clone(), &blocks);
            let second = build_manager(params, &reordered);

            let first_coloring = serde_json::to_string(&first.coloring().unwrap_or_else(|e| panic!("{e}"))).unwrap_or_default();
            let second_coloring = serde_json::to_string(&second.coloring().unwrap_or_else(|e| panic!("{e}"))).unwrap_or_default();
            prop_assert!(!first_coloring.is_empty());
            prop_assert_eq!(first_coloring, second_coloring);

            let first_order = serde_json::to_string(&first.total_order().unwrap_or_else(|e| panic!("{e}"))).unwrap_or_default();
            let second_order = serde_json::to_string(&second.total_order().unwrap_or_else(|e| panic!("{e}"))).unwrap_or_default();
            prop_assert_eq!(first_order, second_order);
        }
    }

    #[test]
    fn total_order_extends_the_dag(blocks in dag_strategy(16), k in 0i64..5) {
        let manager = build_manager(ConsensusParams::with_k(k).unwrap_or_else(|e| panic!("{e}")), &blocks);
        let order = manager.total_order().unwrap_or_else(|e| panic!("{e}"));
        prop_assert_eq!(order.len(), blocks.len());

        let position: HashMap<Hash, usize> = order.iter().enumerate().map(|(i, hash)| (*hash, i)).collect();
        prop_assert_eq!(position.len(), blocks.len());
        for (hash, parents) in &blocks {
            for parent in parents {
                prop_assert!(position[parent] < position[hash], "{} ordered before its parent {}", hash, parent);
            }
        }
        prop_assert_eq!(manager.is_a_before_b(&order[0], &order[order.len() - 1]).unwrap_or(None), Some(true));
    }

    #[test]
    fn final_colors_are_stable_under_honest_growth(delays in vec(0usize..2, 1..30)) {
        // Block i sees every block but the last `delay` ones and points at the
        // tips of what it sees.
        let manager = build_manager(ConsensusParams::with_k(3).unwrap_or_else(|e| panic!("{e}")).with_finality_depth(3), &Vec::new());
        let mut parents_of: Vec<Vec<usize>> = Vec::new();
        let mut settled: BTreeMap<Hash, BlockColor> = BTreeMap::new();

        for (i, delay) in delays.iter().enumerate() {
            let visible = i - (*delay).min(i.saturating_sub(1));
            let referenced: HashSet<usize> = parents_of[..visible.min(parents_of.len())].iter().flatten().copied().collect();
            let parents: Vec<usize> = (0..visible.min(i)).filter(|j| !referenced.contains(j)).collect();
            manager
                .add_block(Hash::from_u64_word(i as u64), parents.iter().map(|j| Hash::from_u64_word(*j as u64)).collect())
                .unwrap_or_else(|e| panic!("add {i} failed: {e}"));
            parents_of.push(parents);

            let coloring = manager.coloring().unwrap_or_else(|e| panic!("{e}"));
            for (hash, color) in &settled {
                prop_assert_eq!(coloring.get(hash).color, *color, "final block {} changed color", hash);
            }
            for (hash, info) in &coloring.blocks {
                if info.is_final {
                    settled.entry(*hash).or_insert(info.color);
                }
            }
        }
    }
}
