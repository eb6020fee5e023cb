//! Stream-to-list collection for range scans.
//!
//! Range scans produce an ordered sequence of records; callers want the
//! whole result at once. [`RowCollector`] buffers rows and reports exactly
//! one terminal outcome, and [`collect_scan`] drives a
//! [`StorageIterator`] through it with an optional per-row transform.

use crate::error::Result;
use crate::storage::{Record, StorageIterator};

/// One-shot accumulator for rows produced by a range scan.
///
/// State machine with two states, `accepting` and `done`. Rows pushed while
/// accepting are kept in arrival order; the first completion (success or
/// failure) moves to `done`, after which pushes are ignored and further
/// completions are no-ops. This guards against double end/teardown signals
/// from the underlying transport.
pub(crate) struct RowCollector<T> {
    state: State<T>,
}

enum State<T> {
    Accepting(Vec<T>),
    Done,
}

impl<T> RowCollector<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Accepting(Vec::new()),
        }
    }

    /// Appends a row. Ignored once the collector is done.
    pub(crate) fn push(&mut self, row: T) {
        if let State::Accepting(rows) = &mut self.state {
            rows.push(row);
        }
    }

    /// Completes successfully, yielding the collected rows.
    ///
    /// Returns `Some(rows)` on the first completion and `None` afterwards.
    pub(crate) fn complete_ok(&mut self) -> Option<Vec<T>> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Accepting(rows) => Some(rows),
            State::Done => None,
        }
    }

    /// Completes with failure, discarding any collected rows.
    ///
    /// Returns whether this call performed the transition to `done`.
    pub(crate) fn complete_err(&mut self) -> bool {
        matches!(
            std::mem::replace(&mut self.state, State::Done),
            State::Accepting(_)
        )
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

/// Drains a storage iterator into an ordered list, applying `row` to each
/// record.
///
/// Terminates with exactly one outcome: the transformed rows in iteration
/// order, or the first error from the iterator or the transform.
pub(crate) async fn collect_scan<T, F>(
    mut iter: Box<dyn StorageIterator + Send>,
    mut row: F,
) -> Result<Vec<T>>
where
    F: FnMut(Record) -> Result<T>,
{
    let mut collector = RowCollector::new();
    loop {
        match iter.next().await {
            Ok(Some(record)) => match row(record) {
                Ok(transformed) => collector.push(transformed),
                Err(err) => {
                    collector.complete_err();
                    return Err(err);
                }
            },
            Ok(None) => {
                return Ok(collector.complete_ok().unwrap_or_default());
            }
            Err(err) => {
                collector.complete_err();
                return Err(err.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::storage::{StorageError, StorageResult};

    /// Iterator stub that replays a scripted sequence of results.
    struct ScriptedIterator {
        steps: std::vec::IntoIter<StorageResult<Option<Record>>>,
    }

    impl ScriptedIterator {
        fn new(steps: Vec<StorageResult<Option<Record>>>) -> Box<Self> {
            Box::new(Self {
                steps: steps.into_iter(),
            })
        }
    }

    #[async_trait]
    impl StorageIterator for ScriptedIterator {
        async fn next(&mut self) -> StorageResult<Option<Record>> {
            self.steps.next().unwrap_or(Ok(None))
        }
    }

    fn record(key: &str) -> Record {
        Record::new(Bytes::from(key.to_string()), Bytes::from("v"))
    }

    #[test]
    fn should_keep_rows_in_arrival_order() {
        // given
        let mut collector = RowCollector::new();

        // when
        collector.push(1);
        collector.push(2);
        collector.push(3);

        // then
        assert_eq!(collector.complete_ok(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn should_complete_exactly_once() {
        // given
        let mut collector = RowCollector::new();
        collector.push("row");

        // when
        let first = collector.complete_ok();
        let second = collector.complete_ok();

        // then
        assert_eq!(first, Some(vec!["row"]));
        assert_eq!(second, None);
        assert!(collector.is_done());
    }

    #[test]
    fn should_ignore_rows_after_completion() {
        // given
        let mut collector = RowCollector::new();
        collector.complete_ok();

        // when
        collector.push(42);

        // then - a later (erroneous) completion signal yields nothing
        assert_eq!(collector.complete_ok(), None);
    }

    #[test]
    fn should_discard_rows_on_failure() {
        // given
        let mut collector = RowCollector::new();
        collector.push(1);

        // when
        let transitioned = collector.complete_err();

        // then
        assert!(transitioned);
        assert!(!collector.complete_err());
        assert_eq!(collector.complete_ok(), None);
    }

    #[tokio::test]
    async fn should_collect_all_rows_in_iteration_order() {
        // given
        let iter = ScriptedIterator::new(vec![
            Ok(Some(record("a"))),
            Ok(Some(record("b"))),
            Ok(Some(record("c"))),
            Ok(None),
        ]);

        // when
        let rows = collect_scan(iter, |r| {
            Ok(String::from_utf8_lossy(&r.key).into_owned())
        })
        .await
        .unwrap();

        // then
        assert_eq!(rows, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn should_return_empty_list_for_empty_scan() {
        // given
        let iter = ScriptedIterator::new(vec![Ok(None)]);

        // when
        let rows: Vec<Record> = collect_scan(iter, Ok).await.unwrap();

        // then
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn should_surface_mid_stream_error() {
        // given
        let iter = ScriptedIterator::new(vec![
            Ok(Some(record("a"))),
            Err(StorageError::Storage("scan failed".into())),
            Ok(Some(record("b"))),
        ]);

        // when
        let result: Result<Vec<Record>> = collect_scan(iter, Ok).await;

        // then
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_surface_transform_error() {
        // given
        let iter = ScriptedIterator::new(vec![Ok(Some(record("a"))), Ok(None)]);

        // when
        let result: Result<Vec<Record>> = collect_scan(iter, |_| {
            Err(crate::Error::Encoding("bad row".into()))
        })
        .await;

        // then
        assert!(result.is_err());
    }
}
