//! Property tests: every edit keeps a valid day valid.

use magnetic_timeline::{
    delete_block, insert_at_position, move_block, reflow, resize_block, split_block,
    validate_full_coverage, ReflowConfig, ReflowError, TimeBlock, MINUTES_PER_DAY,
};
use proptest::prelude::*;
use proptest::sample::Index;

/// A valid day of 1..=9 blocks. Only odd-indexed blocks may be locked, so
/// anchors never touch and every segment with time in it has an unlocked
/// block.
fn arb_day() -> impl Strategy<Value = Vec<TimeBlock>> {
    (
        prop::collection::btree_set(1i64..MINUTES_PER_DAY, 0..8),
        prop::collection::vec(any::<bool>(), 9),
    )
        .prop_map(|(cuts, locks)| {
            let bounds: Vec<i64> = std::iter::once(0)
                .chain(cuts)
                .chain(std::iter::once(MINUTES_PER_DAY))
                .collect();
            bounds
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    let block = TimeBlock::new(format!("b{i}"), w[0], w[1] - w[0]);
                    if i % 2 == 1 && locks[i] {
                        block.locked()
                    } else {
                        block
                    }
                })
                .collect()
        })
}

/// A valid day whose unlocked blocks are scattered to arbitrary starts.
/// Anchors stay where they were.
fn arb_scattered() -> impl Strategy<Value = Vec<TimeBlock>> {
    arb_day().prop_flat_map(|day| {
        let n = day.len();
        prop::collection::vec(0i64..MINUTES_PER_DAY, n).prop_map(move |starts| {
            day.iter()
                .zip(starts)
                .map(|(b, start)| {
                    let mut block = b.clone();
                    if !block.is_locked {
                        block.start_offset_minutes = start;
                    }
                    block
                })
                .collect()
        })
    })
}

fn pick<'a>(day: &'a [TimeBlock], index: &Index) -> &'a TimeBlock {
    &day[index.index(day.len())]
}

fn expected_failure(err: &ReflowError) -> bool {
    matches!(
        err,
        ReflowError::InfeasibleLayout { .. }
            | ReflowError::UnfillableGap { .. }
            | ReflowError::LockedAnchorViolation(_)
            | ReflowError::SplitOutOfRange { .. }
    )
}

fn anchors(day: &[TimeBlock]) -> Vec<(String, i64, i64)> {
    day.iter()
        .filter(|b| b.is_locked)
        .map(|b| (b.id.clone(), b.start_offset_minutes, b.duration_minutes))
        .collect()
}

proptest! {
    #[test]
    fn reflow_of_scattered_day_is_idempotent(blocks in arb_scattered()) {
        let config = ReflowConfig::default();
        match reflow(&blocks, &config) {
            Ok(once) => {
                prop_assert!(validate_full_coverage(&once).unwrap());
                prop_assert_eq!(anchors(&once), anchors(&blocks));
                let twice = reflow(&once, &config).unwrap();
                prop_assert_eq!(once, twice);
            }
            Err(e) => prop_assert!(expected_failure(&e), "unexpected error: {e}"),
        }
    }

    #[test]
    fn reflow_of_valid_day_is_identity(day in arb_day()) {
        prop_assert_eq!(reflow(&day, &ReflowConfig::default()).unwrap(), day);
    }

    #[test]
    fn insert_preserves_coverage_and_anchors(
        day in arb_day(),
        duration in 1i64..240,
        target in 0i64..=MINUTES_PER_DAY,
    ) {
        let new_block = TimeBlock::new("new", 0, duration);
        match insert_at_position(&day, new_block, target, &ReflowConfig::default()) {
            Ok(result) => {
                prop_assert!(validate_full_coverage(&result).unwrap());
                prop_assert_eq!(anchors(&result), anchors(&day));
                prop_assert_eq!(
                    result.iter().find(|b| b.id == "new").map(|b| b.duration_minutes),
                    Some(duration)
                );
            }
            Err(e) => prop_assert!(expected_failure(&e), "unexpected error: {e}"),
        }
    }

    #[test]
    fn resize_preserves_coverage_and_other_anchors(
        day in arb_day(),
        index in any::<Index>(),
        duration in 1i64..MINUTES_PER_DAY,
    ) {
        let target = pick(&day, &index).clone();
        match resize_block(&day, &target.id, duration, &ReflowConfig::default()) {
            Ok(result) => {
                prop_assert!(validate_full_coverage(&result).unwrap());
                if !target.is_locked {
                    prop_assert_eq!(anchors(&result), anchors(&day));
                }
            }
            Err(e) => prop_assert!(
                expected_failure(&e) || (target.is_locked && matches!(e, ReflowError::InvalidBlock(_))),
                "unexpected error: {e}"
            ),
        }
    }

    #[test]
    fn move_changes_only_the_target_rank(
        day in arb_day(),
        index in any::<Index>(),
        new_start in 0i64..MINUTES_PER_DAY,
    ) {
        let target = pick(&day, &index).clone();
        prop_assume!(!target.is_locked);
        match move_block(&day, &target.id, new_start, &ReflowConfig::default()) {
            Ok(result) => {
                prop_assert!(validate_full_coverage(&result).unwrap());
                prop_assert_eq!(anchors(&result), anchors(&day));
                let others = |blocks: &[TimeBlock]| -> Vec<String> {
                    blocks
                        .iter()
                        .filter(|b| b.id != target.id)
                        .map(|b| b.id.clone())
                        .collect()
                };
                prop_assert_eq!(others(&result), others(&day));
            }
            Err(e) => prop_assert!(expected_failure(&e), "unexpected error: {e}"),
        }
    }

    #[test]
    fn delete_preserves_coverage(day in arb_day(), index in any::<Index>()) {
        let target = pick(&day, &index).clone();
        match delete_block(&day, &target.id, &ReflowConfig::default()) {
            Ok(result) => {
                prop_assert!(validate_full_coverage(&result).unwrap());
                prop_assert_eq!(result.len(), day.len() - 1);
                if !target.is_locked {
                    prop_assert_eq!(anchors(&result), anchors(&day));
                }
            }
            Err(e) => prop_assert!(expected_failure(&e), "unexpected error: {e}"),
        }
    }

    #[test]
    fn split_halves_rejoin_to_the_original_span(
        day in arb_day(),
        index in any::<Index>(),
        offset in any::<Index>(),
    ) {
        let target = pick(&day, &index).clone();
        prop_assume!(!target.is_locked && target.duration_minutes >= 2);
        let minute = target.start_offset_minutes + 1 + offset.index(target.duration_minutes as usize - 1) as i64;

        let result = split_block(&day, &target.id, minute, None).unwrap();

        prop_assert!(validate_full_coverage(&result).unwrap());
        prop_assert_eq!(anchors(&result), anchors(&day));
        let position = result.iter().position(|b| b.id == target.id).unwrap();
        let (first, second) = (&result[position], &result[position + 1]);
        prop_assert_eq!(first.start_offset_minutes, target.start_offset_minutes);
        prop_assert_eq!(first.end_offset_minutes(), second.start_offset_minutes);
        prop_assert_eq!(second.end_offset_minutes(), target.end_offset_minutes());
        prop_assert_eq!(
            first.duration_minutes + second.duration_minutes,
            target.duration_minutes
        );
    }
}
