//! Gather worker outcomes into an ordered result set.
//!
//! Outcomes arrive in completion order. The collector keeps successes,
//! logs and keeps failures, tallies image flags, and sorts everything by
//! original index at the end, so the output is the same for every arrival
//! order.

use crate::error::UnitError;
use crate::output::{OrderedResultSet, TransformResult, TransformTally, UnitOutcome};
use crate::progress::ProgressCallback;
use tracing::warn;

/// Everything the collector produced.
#[derive(Debug)]
pub struct Collected {
    pub results: OrderedResultSet,
    /// Sorted by [`UnitError::position`].
    pub failures: Vec<UnitError>,
    pub tally: TransformTally,
}

pub struct Collector {
    total_items: usize,
    results: Vec<TransformResult>,
    failures: Vec<UnitError>,
    tally: TransformTally,
    progress: ProgressCallback,
}

impl Collector {
    /// `total_items` is the number of images or pages, for progress events.
    pub fn new(total_items: usize, progress: ProgressCallback) -> Self {
        Self {
            total_items,
            results: Vec::with_capacity(total_items),
            failures: Vec::new(),
            tally: TransformTally::default(),
            progress,
        }
    }

    pub fn accept(&mut self, outcome: UnitOutcome) {
        for result in outcome.results {
            if let Some(flags) = &result.flags {
                self.tally.record(flags);
            }
            self.progress.on_unit_complete(result.index, self.total_items);
            self.results.push(result);
        }
        for failure in outcome.failures {
            warn!("Skipping: {}", failure);
            // One event per lost item.
            let message = failure.to_string();
            let first = failure.position();
            for index in first..first + failure.lost_items() {
                self.progress.on_unit_error(index, self.total_items, &message);
            }
            self.failures.push(failure);
        }
    }

    pub fn finish(mut self) -> Collected {
        self.failures.sort_by_key(UnitError::position);
        Collected {
            results: OrderedResultSet::from_unsorted(self.results),
            failures: self.failures,
            tally: self.tally,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RotationAngle;
    use crate::output::ImageFlags;
    use crate::progress::{resolve, ConversionProgressCallback};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ok(index: usize, rotated: bool) -> UnitOutcome {
        UnitOutcome::success(
            index,
            TransformResult {
                index,
                encoded: vec![index as u8; 4],
                width: 100 + index as u32,
                height: 200,
                flags: Some(ImageFlags {
                    rotated,
                    rotation_angle: rotated.then_some(RotationAngle::Clockwise90),
                    ..ImageFlags::default()
                }),
            },
        )
    }

    fn failed(index: usize) -> UnitOutcome {
        UnitOutcome::failure(
            index,
            UnitError::ImageFailed {
                index,
                file: format!("{index}.jpg"),
                detail: "corrupt".into(),
            },
        )
    }

    fn outcomes() -> Vec<UnitOutcome> {
        vec![ok(0, true), ok(1, false), failed(2), ok(3, true), failed(4), ok(5, false)]
    }

    fn collect(order: &[usize]) -> Collected {
        let all = outcomes();
        let mut c = Collector::new(all.len(), resolve(&None));
        for &i in order {
            c.accept(all[i].clone());
        }
        c.finish()
    }

    #[test]
    fn arrival_order_does_not_change_the_result() {
        let reference = collect(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(reference.results.indices(), vec![0, 1, 3, 5]);

        for order in [[5, 4, 3, 2, 1, 0], [3, 0, 5, 2, 1, 4], [2, 4, 1, 5, 0, 3]] {
            let got = collect(&order);
            assert_eq!(got.results.clone().into_vec(), reference.results.clone().into_vec());
            assert_eq!(got.failures, reference.failures);
            assert_eq!(got.tally, reference.tally);
        }
    }

    #[test]
    fn failures_are_kept_sorted() {
        let got = collect(&[4, 5, 2, 0, 1, 3]);
        assert_eq!(
            got.failures.iter().map(UnitError::position).collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn tally_counts_rotations() {
        let got = collect(&[0, 1, 2, 3, 4, 5]);
        assert_eq!(got.tally.rotated, 2);
        assert!(got.tally.rotation_angles.contains(&-90));
    }

    #[test]
    fn multi_result_outcomes_are_flattened() {
        let mut c = Collector::new(4, resolve(&None));
        c.accept(UnitOutcome {
            unit: 1,
            results: vec![ok(3, false).results.remove(0), ok(2, false).results.remove(0)],
            failures: vec![],
        });
        c.accept(UnitOutcome {
            unit: 0,
            results: vec![ok(0, false).results.remove(0)],
            failures: vec![UnitError::PageFailed {
                page: 1,
                detail: "x".into(),
            }],
        });
        let got = c.finish();
        assert_eq!(got.results.indices(), vec![0, 2, 3]);
        assert_eq!(got.failures.len(), 1);
    }

    #[test]
    fn progress_sees_every_unit() {
        #[derive(Default)]
        struct Count {
            ok: AtomicUsize,
            err: AtomicUsize,
        }
        impl ConversionProgressCallback for Count {
            fn on_unit_complete(&self, _: usize, _: usize) {
                self.ok.fetch_add(1, Ordering::SeqCst);
            }
            fn on_unit_error(&self, _: usize, _: usize, _: &str) {
                self.err.fetch_add(1, Ordering::SeqCst);
            }
        }

        let count = Arc::new(Count::default());
        let mut c = Collector::new(6, count.clone());
        for o in outcomes() {
            c.accept(o);
        }
        assert_eq!(count.ok.load(Ordering::SeqCst), 4);
        assert_eq!(count.err.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropped_chunk_reports_every_lost_page() {
        #[derive(Default)]
        struct Lost(std::sync::Mutex<Vec<usize>>);
        impl ConversionProgressCallback for Lost {
            fn on_unit_error(&self, index: usize, total: usize, _: &str) {
                assert_eq!(total, 10);
                self.0.lock().unwrap().push(index);
            }
        }

        let lost = Arc::new(Lost::default());
        let mut c = Collector::new(10, lost.clone());
        c.accept(UnitOutcome::failure(
            1,
            UnitError::ChunkFailed {
                start: 3,
                end: 7,
                detail: "render failed".into(),
            },
        ));
        let got = c.finish();
        assert_eq!(*lost.0.lock().unwrap(), vec![3, 4, 5, 6]);
        assert_eq!(got.failures.len(), 1);
    }
}
