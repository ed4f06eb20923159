//! Cross-engine consistency tests: every stream is replayed through the
//! direct-update tree and the content-table engine side by side, and both
//! are checked after every single add and delete against a brute-force
//! oracle computed from the live window. The same sweep verifies the DIU
//! history covers every windowed item and that the MFCI immediate-edge DAG
//! matches the subset relation transitively.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::engine::{Engine, EngineKind, SlidingWindowMiner};
use crate::itemset::{Item, Itemset};
use crate::{DirectUpdateTree, Mfci, StreamFci};

fn set(items: &[char]) -> Itemset<char> {
    items.iter().copied().collect()
}

fn ints(items: &[u32]) -> Itemset<u32> {
    items.iter().copied().collect()
}

/// Support by definition: count the window transactions containing `x`.
fn naive_support<T: Item>(window: &[Itemset<T>], x: &Itemset<T>) -> usize {
    window.iter().filter(|tx| tx.is_superset_of(x)).count()
}

/// Closed itemsets by definition. The closure of any itemset is the
/// intersection of all transactions containing it, so the closed sets are
/// exactly the non-empty intersections of transaction subsets: the pairwise
/// intersection fixed point of the window.
fn naive_closed<T: Item>(window: &[Itemset<T>]) -> BTreeSet<Itemset<T>> {
    let mut closed: BTreeSet<Itemset<T>> = window.iter().cloned().collect();
    loop {
        let mut fresh: Vec<Itemset<T>> = Vec::new();
        for a in &closed {
            for b in &closed {
                let shared = a.intersection(b);
                if !shared.is_empty() && !closed.contains(&shared) {
                    fresh.push(shared);
                }
            }
        }
        if fresh.is_empty() {
            return closed;
        }
        closed.extend(fresh);
    }
}

fn assert_engines_match<T: Item>(
    diu: &DirectUpdateTree<T>,
    mfci: &Mfci<T>,
    live: &[Itemset<T>],
    window: usize,
) {
    let expected = naive_closed(live);
    assert_eq!(
        diu.closed_itemsets(),
        expected,
        "direct-update tree diverges on window {live:?}"
    );
    assert_eq!(
        mfci.closed_itemsets(),
        expected,
        "content-table engine diverges on window {live:?}"
    );
    for x in &expected {
        let support = naive_support(live, x);
        assert_eq!(diu.support(x), support, "DIU support of {x} on {live:?}");
        assert_eq!(mfci.support(x), support, "MFCI support of {x} on {live:?}");
        assert!(support <= window, "support of {x} exceeds the window bound");
    }
    diu.assert_history_complete(live);
    mfci.assert_immediate_dag_consistent();
}

/// The sliding-window protocol with a consistency check after every delta.
fn replay_and_check<T: Item>(tdb: &[Itemset<T>], window: usize) {
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();

    for i in 0..tdb.len() {
        if i >= window {
            let old = &tdb[i - window];
            diu.delete(old).unwrap();
            mfci.delete(old).unwrap();
            assert_engines_match(&diu, &mfci, &tdb[i + 1 - window..i], window);
        }
        diu.add(&tdb[i]).unwrap();
        mfci.add(&tdb[i]).unwrap();
        let first = (i + 1).saturating_sub(window);
        assert_engines_match(&diu, &mfci, &tdb[first..=i], window);
    }
}

fn replay_all_windows<T: Item>(tdb: &[Itemset<T>]) {
    for window in 1..=tdb.len() {
        replay_and_check(tdb, window);
    }
}

// The fixed streams the original experiments were validated against.

fn diu_example() -> Vec<Itemset<char>> {
    vec![
        set(&['C', 'D']),
        set(&['A', 'B']),
        set(&['A', 'B', 'C']),
        set(&['A', 'B', 'C']),
    ]
}

fn diu_example_modified() -> Vec<Itemset<char>> {
    vec![
        set(&['C']),
        set(&['C', 'D']),
        set(&['A', 'B']),
        set(&['A', 'B', 'C']),
        set(&['A', 'B', 'C']),
    ]
}

fn mfci_example() -> Vec<Itemset<char>> {
    vec![
        set(&['A', 'C', 'T', 'W']),
        set(&['C', 'D', 'W']),
        set(&['A', 'C', 'T', 'W']),
        set(&['A', 'C', 'D', 'W']),
        set(&['A', 'C', 'D', 'T', 'W']),
        set(&['C', 'D', 'T']),
    ]
}

fn lecture_example_1() -> Vec<Itemset<char>> {
    vec![
        set(&['M', 'O', 'N', 'K', 'E', 'Y']),
        set(&['D', 'O', 'N', 'K', 'E', 'Y']),
        set(&['M', 'A', 'K', 'E']),
        set(&['M', 'U', 'C', 'K', 'Y']),
        set(&['C', 'O', 'K', 'E']),
    ]
}

fn lecture_example_2() -> Vec<Itemset<char>> {
    vec![
        set(&['a', 'b', 'd', 'e']),
        set(&['b', 'c', 'e']),
        set(&['a', 'b', 'd', 'e']),
        set(&['a', 'b', 'c', 'e']),
        set(&['a', 'b', 'c', 'd', 'e']),
        set(&['b', 'c', 'd']),
    ]
}

fn rank_order_example() -> Vec<Itemset<u32>> {
    vec![ints(&[1, 2]), ints(&[2, 3]), ints(&[3]), ints(&[1, 2])]
}

#[test]
fn diu_example_every_window() {
    replay_all_windows(&diu_example());
}

#[test]
fn diu_example_modified_every_window() {
    replay_all_windows(&diu_example_modified());
}

#[test]
fn mfci_example_every_window() {
    replay_all_windows(&mfci_example());
}

#[test]
fn lecture_example_1_every_window() {
    replay_all_windows(&lecture_example_1());
}

#[test]
fn lecture_example_2_every_window() {
    replay_all_windows(&lecture_example_2());
}

#[test]
fn rank_order_example_every_window() {
    replay_all_windows(&rank_order_example());
}

#[test]
fn diu_example_closed_sets_and_supports() {
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    for tx in diu_example() {
        diu.add(&tx).unwrap();
        mfci.add(&tx).unwrap();
    }

    let expected: BTreeSet<_> = [
        set(&['C']),
        set(&['C', 'D']),
        set(&['A', 'B']),
        set(&['A', 'B', 'C']),
    ]
    .into_iter()
    .collect();
    assert_eq!(diu.closed_itemsets(), expected);
    assert_eq!(mfci.closed_itemsets(), expected);

    for engine in [&diu as &dyn SlidingWindowMiner<char>, &mfci] {
        assert_eq!(engine.support(&set(&['C'])), 3);
        assert_eq!(engine.support(&set(&['C', 'D'])), 1);
        assert_eq!(engine.support(&set(&['A', 'B'])), 3);
        assert_eq!(engine.support(&set(&['A', 'B', 'C'])), 2);
        // {A} is not closed; its support comes from its closure {A,B}
        assert_eq!(engine.support(&set(&['A'])), 3);
    }
}

#[test]
fn aging_out_a_transaction_drops_its_itemsets() {
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    for tx in diu_example() {
        diu.add(&tx).unwrap();
        mfci.add(&tx).unwrap();
    }
    diu.delete(&set(&['C', 'D'])).unwrap();
    mfci.delete(&set(&['C', 'D'])).unwrap();

    let expected: BTreeSet<_> = [set(&['A', 'B']), set(&['A', 'B', 'C'])]
        .into_iter()
        .collect();
    assert_eq!(diu.closed_itemsets(), expected);
    assert_eq!(mfci.closed_itemsets(), expected);
    assert_eq!(diu.support(&set(&['A', 'B'])), 3);
    assert_eq!(mfci.support(&set(&['A', 'B'])), 3);
}

#[test]
fn duplicate_transactions_survive_a_single_delete() {
    let stream = [
        ints(&[1, 2]),
        ints(&[1, 2]),
        ints(&[2, 3]),
        ints(&[3]),
        ints(&[1, 2, 3, 4]),
    ];
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    for tx in &stream {
        diu.add(tx).unwrap();
        mfci.add(tx).unwrap();
    }
    diu.delete(&ints(&[1, 2])).unwrap();
    mfci.delete(&ints(&[1, 2])).unwrap();

    // one copy of {1,2} is still in the window, plus {1,2,3,4} contains it
    assert!(diu.closed_itemsets().contains(&ints(&[1, 2])));
    assert!(mfci.closed_itemsets().contains(&ints(&[1, 2])));
    assert_eq!(diu.support(&ints(&[1, 2])), 2);
    assert_eq!(mfci.support(&ints(&[1, 2])), 2);

    let live = [ints(&[1, 2]), ints(&[2, 3]), ints(&[3]), ints(&[1, 2, 3, 4])];
    assert_engines_match(&diu, &mfci, &live, 5);
}

#[test]
fn rank_order_example_supports_agree() {
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    for tx in rank_order_example() {
        diu.add(&tx).unwrap();
        mfci.add(&tx).unwrap();
    }

    assert_eq!(diu.closed_itemsets(), mfci.closed_itemsets());
    for x in [ints(&[2]), ints(&[3]), ints(&[1, 2])] {
        assert_eq!(diu.support(&x), mfci.support(&x), "support of {x}");
    }
    assert_eq!(diu.support(&ints(&[2])), 3);
    assert_eq!(diu.support(&ints(&[3])), 2);
    assert_eq!(diu.support(&ints(&[1, 2])), 2);
}

#[test]
fn adding_and_deleting_everything_restores_the_empty_state() {
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    let mut fci = StreamFci::new();
    let stream = mfci_example();
    for tx in &stream {
        diu.add(tx).unwrap();
        mfci.add(tx).unwrap();
        fci.add(tx).unwrap();
    }
    for tx in &stream {
        diu.delete(tx).unwrap();
        mfci.delete(tx).unwrap();
        fci.delete(tx).unwrap();
    }

    assert!(diu.is_empty());
    assert!(mfci.is_empty());
    assert!(fci.is_empty());
    assert!(diu.closed_itemsets().is_empty());
    assert!(mfci.closed_itemsets().is_empty());
    assert!(fci.closed_itemsets().is_empty());
}

#[test]
fn empty_window_queries_return_empty_sets() {
    let diu: DirectUpdateTree<u32> = DirectUpdateTree::new();
    let mfci: Mfci<u32> = Mfci::new();
    let fci: StreamFci<u32> = StreamFci::new();

    assert!(diu.closed_itemsets().is_empty());
    assert!(mfci.closed_frequent(5).is_empty());
    assert!(fci.closed_itemsets().is_empty());
    assert_eq!(diu.support(&ints(&[1])), 0);
    assert_eq!(mfci.support(&ints(&[1])), 0);
    assert_eq!(fci.support(&ints(&[1])), 0);
}

#[test]
fn threshold_filtering_matches_the_oracle() {
    let stream = mfci_example();
    let mut diu = DirectUpdateTree::new();
    let mut mfci = Mfci::new();
    for tx in &stream {
        diu.add(tx).unwrap();
        mfci.add(tx).unwrap();
    }

    for threshold in 0..=7 {
        let expected: BTreeSet<_> = naive_closed(&stream)
            .into_iter()
            .filter(|x| naive_support(&stream, x) >= threshold)
            .collect();
        assert_eq!(diu.closed_frequent(threshold), expected);
        assert_eq!(mfci.closed_frequent(threshold), expected);
    }
}

#[test]
fn shuffled_streams_stay_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..25 {
        let mut stream = diu_example();
        stream.shuffle(&mut rng);
        replay_all_windows(&stream);

        let mut stream = lecture_example_2();
        stream.shuffle(&mut rng);
        replay_all_windows(&stream);

        let mut stream = rank_order_example();
        stream.shuffle(&mut rng);
        replay_all_windows(&stream);
    }
}

#[test]
fn random_streams_stay_consistent() {
    let mut rng = StdRng::seed_from_u64(0xc105ed);
    for _ in 0..30 {
        let stream: Vec<Itemset<u32>> = (0..8)
            .map(|_| {
                let size = rng.gen_range(1..=4);
                (0..size).map(|_| rng.gen_range(0..6u32)).collect()
            })
            .collect();
        for window in [1, 2, 3, 5, 8] {
            replay_and_check(&stream, window);
        }
    }
}

#[test]
fn engine_kind_parses_and_builds() {
    assert_eq!("diu".parse::<EngineKind>().unwrap(), EngineKind::Diu);
    assert_eq!("mfci".parse::<EngineKind>().unwrap(), EngineKind::Mfci);
    assert_eq!(
        "stream-fci".parse::<EngineKind>().unwrap(),
        EngineKind::StreamFci
    );
    assert!("fp-growth".parse::<EngineKind>().is_err());

    for kind in EngineKind::ALL {
        let engine: Engine<u32> = kind.build();
        assert!(engine.closed_itemsets().is_empty());
    }
}

#[test]
fn tagged_engine_behaves_like_its_inner_type() {
    let stream = diu_example();
    let mut tagged = EngineKind::Mfci.build::<char>();
    let mut direct = Mfci::new();
    for tx in &stream {
        tagged.add(tx).unwrap();
        direct.add(tx).unwrap();
    }
    assert_eq!(tagged.closed_itemsets(), direct.closed_itemsets());
    assert_eq!(
        tagged.support(&set(&['A', 'B'])),
        direct.support(&set(&['A', 'B']))
    );
}
