use std::cell::Cell;
use std::rc::Rc;

use platynui_xdm::{CursorState, ErrorCode, SimpleNode, XdmAtomicValue as A, XdmItem as I, XdmSequenceStream};
use rstest::rstest;

type S = XdmSequenceStream<SimpleNode>;

fn ints(s: &S) -> Vec<i64> {
    s.materialize()
        .unwrap()
        .into_iter()
        .map(|it| match it {
            I::Atomic(A::Integer(i)) => i,
            other => panic!("expected integer, got {other}"),
        })
        .collect()
}

fn counting_generator(limit: i64, produced: Rc<Cell<usize>>, runs: Rc<Cell<usize>>) -> S {
    S::from_generator(move || {
        runs.set(runs.get() + 1);
        let produced = Rc::clone(&produced);
        (1..=limit).map(move |i| {
            produced.set(produced.get() + 1);
            Ok(I::Atomic(A::Integer(i)))
        })
    })
}

#[rstest]
fn lifecycle_not_started_iterating_finished() {
    let mut s = S::from_vec(vec![I::Atomic(A::Integer(7))]);
    assert_eq!(s.state(), CursorState::NotStarted);
    assert_eq!(s.current().unwrap_err().code_enum(), ErrorCode::FOER0000);
    assert!(s.move_next().unwrap());
    assert_eq!(s.state(), CursorState::Iterating);
    assert_eq!(s.current().unwrap(), &I::Atomic(A::Integer(7)));
    assert_eq!(s.position(), 1);
    assert!(!s.move_next().unwrap());
    assert_eq!(s.state(), CursorState::Finished);
    assert!(!s.move_next().unwrap());
    assert!(s.try_current().is_none());
}

#[rstest]
fn clone_replays_from_the_beginning() {
    let mut original = S::from_range_inclusive(1, 4);
    original.move_next().unwrap();
    original.move_next().unwrap();
    let mut copy = original.clone();
    assert!(copy.move_next().unwrap());
    assert_eq!(copy.current().unwrap(), &I::Atomic(A::Integer(1)));
    // advancing the copy does not move the original
    copy.move_next().unwrap();
    copy.move_next().unwrap();
    assert_eq!(original.current().unwrap(), &I::Atomic(A::Integer(2)));
    assert!(original.move_next().unwrap());
    assert_eq!(original.current().unwrap(), &I::Atomic(A::Integer(3)));
}

#[rstest]
#[case(1, 5, vec![1, 2, 3, 4, 5])]
#[case(3, 3, vec![3])]
#[case(5, 1, vec![])]
#[case(-2, 0, vec![-2, -1, 0])]
fn ranges(#[case] lo: i64, #[case] hi: i64, #[case] expected: Vec<i64>) {
    let s = S::from_range_inclusive(lo, hi);
    assert_eq!(s.count().unwrap(), expected.len());
    assert_eq!(ints(&s), expected);
    assert!(s.is_range());
    assert_eq!(s.range_bounds(), Some((lo, hi)));
}

#[rstest]
fn huge_range_counts_without_iterating() {
    let s = S::from_range_inclusive(1, 1_000_000_000_000);
    assert_eq!(s.count().unwrap(), 1_000_000_000_000);
    assert!(!s.is_single().unwrap());
    assert_eq!(s.first().unwrap(), Some(I::Atomic(A::Integer(1))));
}

#[rstest]
fn generator_clone_reinvokes_the_producer() {
    let produced = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0));
    let s = counting_generator(3, Rc::clone(&produced), Rc::clone(&runs));
    assert_eq!(ints(&s), vec![1, 2, 3]);
    assert_eq!(ints(&s.clone()), vec![1, 2, 3]);
    assert_eq!(runs.get(), 2);
    assert_eq!(produced.get(), 6);
}

#[rstest]
fn buffered_clones_share_the_cache() {
    let produced = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0));
    let source = counting_generator(10, Rc::clone(&produced), Rc::clone(&runs));
    let mut buffered = source.create_buffered();
    for _ in 0..3 {
        assert!(buffered.move_next().unwrap());
    }
    let mut copy = buffered.clone();
    let mut seen = Vec::new();
    for _ in 0..5 {
        assert!(copy.move_next().unwrap());
        seen.push(copy.current().unwrap().clone());
    }
    let expected: Vec<_> = (1..=5).map(|i| I::Atomic(A::Integer(i))).collect();
    assert_eq!(seen, expected);
    assert_eq!(buffered.cached_len(), Some(5));
    assert_eq!(produced.get(), 5);
    assert_eq!(runs.get(), 1);
}

#[rstest]
fn buffered_count_is_reused_by_later_clones() {
    let produced = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0));
    let buffered = counting_generator(4, Rc::clone(&produced), runs).create_buffered();
    assert_eq!(buffered.count().unwrap(), 4);
    assert_eq!(buffered.clone().count().unwrap(), 4);
    assert_eq!(ints(&buffered), vec![1, 2, 3, 4]);
    assert_eq!(produced.get(), 4);
}

#[rstest]
fn buffering_a_materialized_stream_is_a_restart() {
    let s = S::from_range_inclusive(1, 3);
    let b = s.create_buffered();
    assert!(b.is_range());
    assert_eq!(b.cached_len(), None);
}

#[rstest]
fn producer_error_finishes_the_stream() {
    let mut s = S::from_generator(|| {
        vec![
            Ok(I::Atomic(A::Integer(1))),
            Err(platynui_xdm::Error::from_code(ErrorCode::FOER0000, "boom")),
            Ok(I::Atomic(A::Integer(3))),
        ]
        .into_iter()
    });
    assert!(s.move_next().unwrap());
    assert_eq!(s.move_next().unwrap_err().code_enum(), ErrorCode::FOER0000);
    assert_eq!(s.state(), CursorState::Finished);
    assert!(!s.move_next().unwrap());
}

#[rstest]
fn empty_and_single() {
    let e = S::empty();
    assert!(e.is_empty().unwrap());
    assert_eq!(e.count().unwrap(), 0);
    let one = S::from_item(I::Atomic(A::from("x")));
    assert!(one.is_single().unwrap());
    assert_eq!(one.count().unwrap(), 1);
}

#[rstest]
fn concat_and_map_are_lazy_and_restartable() {
    let s = S::from_range_inclusive(1, 2).concat(S::from_range_inclusive(10, 11));
    assert_eq!(s.count().unwrap(), 4);
    let doubled = s.map(|it| match it {
        I::Atomic(A::Integer(i)) => Ok(I::Atomic(A::Integer(i * 2))),
        other => Ok(other),
    });
    assert_eq!(ints(&doubled), vec![2, 4, 20, 22]);
    assert_eq!(ints(&doubled.clone()), vec![2, 4, 20, 22]);
}

#[rstest]
fn count_after_exhaustion_uses_seen_items() {
    let produced = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0));
    let mut s = counting_generator(3, Rc::clone(&produced), Rc::clone(&runs));
    while s.move_next().unwrap() {}
    assert_eq!(s.count().unwrap(), 3);
    assert_eq!(runs.get(), 1);
}
