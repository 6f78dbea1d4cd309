//! Per-worker three stage pipeline: producer, relay and commit.
//!
//! ```text
//! ┌────────────┐  rendezvous  ┌────────────┐  rendezvous  ┌────────────┐
//! │  Producer  │─────────────>│   Relay    │─────────────>│   Commit   │──> CellStore
//! │ [start,end)│              │            │              │            │
//! └────────────┘              └────────────┘              └────────────┘
//! ```
//!
//! Both queues have zero capacity, so a send only completes once the next
//! stage takes the point. Dropping a stage's sender is the only end of
//! stream signal; each stage drops its sender after draining its input.

use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use indicatif::ProgressBar;
use log::debug;
use serde::Serialize;

use crate::cell_store::CellStore;
use crate::constants::PROGRESS_UPDATE_INTERVAL;
use crate::error::{DsmError, Result};
use crate::geometry::GridGeometry;
use crate::point::Point;
use crate::source::PointSource;

/// Half-open range of source indices owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Points a commit stage placed into cells or dropped as out of range.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerTally {
    pub committed: usize,
    pub discarded: usize,
}

impl WorkerTally {
    pub fn total(&self) -> usize {
        self.committed + self.discarded
    }
}

/// One worker's private grid.
pub struct Worker {
    id: usize,
    geometry: GridGeometry,
    cells: CellStore,
}

impl Worker {
    pub fn new(id: usize, geometry: GridGeometry) -> Self {
        Self {
            id,
            geometry,
            cells: CellStore::new(geometry.cell_count()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cells(&self) -> &CellStore {
        &self.cells
    }

    pub fn into_points(self) -> Vec<Point> {
        self.cells.into_points()
    }

    /// Start the commit, relay and producer threads for `partition` inside
    /// `scope`. Consumers are started first so the producer never waits on
    /// a stage that does not exist yet.
    pub fn spawn<'scope, 'env, S>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        source: &'env S,
        partition: Partition,
        progress: &ProgressBar,
    ) -> Result<WorkerHandles<'scope>>
    where
        S: PointSource + ?Sized,
    {
        let (ingest_tx, ingest_rx) = bounded::<Point>(0);
        let (commit_tx, commit_rx) = bounded::<Point>(0);

        debug!(
            "Worker {} starting on points [{}, {})",
            self.id, partition.start, partition.end
        );

        let geometry = self.geometry;
        let cells = &self.cells;
        let commit = thread::Builder::new()
            .name(format!("dsm-{}-commit", self.id))
            .spawn_scoped(scope, move || commit_points(commit_rx, &geometry, cells))?;

        let relay = thread::Builder::new()
            .name(format!("dsm-{}-relay", self.id))
            .spawn_scoped(scope, move || relay_points(ingest_rx, commit_tx))?;

        let progress = progress.clone();
        let producer = thread::Builder::new()
            .name(format!("dsm-{}-producer", self.id))
            .spawn_scoped(scope, move || {
                produce_points(source, partition, ingest_tx, &progress)
            })?;

        Ok(WorkerHandles {
            worker: self.id,
            producer,
            relay,
            commit,
        })
    }
}

/// Join handles for the three stages of one running worker.
pub struct WorkerHandles<'scope> {
    worker: usize,
    producer: ScopedJoinHandle<'scope, Result<usize>>,
    relay: ScopedJoinHandle<'scope, ()>,
    commit: ScopedJoinHandle<'scope, WorkerTally>,
}

impl WorkerHandles<'_> {
    /// Block until the commit stage has drained its queue, then collect the
    /// other stages. All three are joined before any outcome is inspected,
    /// so a panic is always reported as [`DsmError::WorkerPanicked`]. A
    /// producer read error fails the worker even though the downstream
    /// stages shut down cleanly.
    pub fn join(self) -> Result<WorkerTally> {
        let worker = self.worker;
        let panicked = |_| DsmError::WorkerPanicked { worker };

        let commit = self.commit.join();
        let relay = self.relay.join();
        let producer = self.producer.join();

        let tally = commit.map_err(panicked)?;
        relay.map_err(panicked)?;
        let produced = producer.map_err(panicked)??;

        debug!(
            "Worker {} finished: {} produced, {} committed, {} discarded",
            worker, produced, tally.committed, tally.discarded
        );
        Ok(tally)
    }
}

/// Read `partition` in index order and hand each point to the relay.
/// Returning drops `outbound`, which closes the queue on every path.
fn produce_points<S>(
    source: &S,
    partition: Partition,
    outbound: Sender<Point>,
    progress: &ProgressBar,
) -> Result<usize>
where
    S: PointSource + ?Sized,
{
    let mut sent = 0;
    for index in partition.start..partition.end {
        let point = source.point_at(index)?;
        if outbound.send(point).is_err() {
            // Downstream is gone; its join reports why.
            break;
        }
        sent += 1;
        if sent % PROGRESS_UPDATE_INTERVAL == 0 {
            progress.inc(PROGRESS_UPDATE_INTERVAL as u64);
        }
    }
    progress.inc((sent % PROGRESS_UPDATE_INTERVAL) as u64);
    Ok(sent)
}

/// Forward points unchanged until the producer closes its queue.
fn relay_points(inbound: Receiver<Point>, outbound: Sender<Point>) {
    for point in inbound {
        if outbound.send(point).is_err() {
            break;
        }
    }
}

/// Bin each point into its cell, dropping points that fall off the grid.
fn commit_points(inbound: Receiver<Point>, geometry: &GridGeometry, cells: &CellStore) -> WorkerTally {
    let mut tally = WorkerTally::default();
    for point in inbound {
        match geometry.locate(point.x, point.y) {
            Some(index) => {
                cells.try_update(index, point);
                tally.committed += 1;
            }
            None => tally.discarded += 1,
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::PointBounds;
    use crate::source::VecPointSource;

    fn grid_2x2() -> GridGeometry {
        GridGeometry::new(&PointBounds::from_xy(0.0, 0.0, 2.0, 2.0), 1.0).unwrap()
    }

    /// Source whose reads fail from a given index on.
    struct FailingSource {
        fail_from: usize,
        len: usize,
    }

    impl PointSource for FailingSource {
        fn total_point_count(&self) -> usize {
            self.len
        }

        fn bounding_box(&self) -> PointBounds {
            PointBounds::from_xy(0.0, 0.0, 2.0, 2.0)
        }

        fn point_at(&self, index: usize) -> Result<Point> {
            if index >= self.fail_from {
                Err(std::io::Error::other("disk went away").into())
            } else {
                Ok(Point::new(0.5, 0.5, index as f64, index as u32))
            }
        }
    }

    fn run_worker<S: PointSource>(source: &S, partition: Partition) -> (Result<WorkerTally>, Vec<Point>) {
        let worker = Worker::new(0, grid_2x2());
        let result = thread::scope(|scope| {
            worker
                .spawn(scope, source, partition, &ProgressBar::hidden())
                .and_then(WorkerHandles::join)
        });
        (result, worker.into_points())
    }

    #[test]
    fn test_partition_len() {
        assert_eq!(Partition::new(3, 7).len(), 4);
        assert!(Partition::new(5, 5).is_empty());
    }

    #[test]
    fn test_worker_keeps_cell_maxima_and_counts() {
        let source = VecPointSource::new(vec![
            Point::new(0.5, 0.5, 1.0, 1),
            Point::new(0.2, 0.7, 3.0, 2),
            Point::new(1.5, 1.5, 2.0, 3),
            Point::new(-1.0, 0.5, 9.0, 4),
        ]);
        let (tally, cells) = run_worker(&source, Partition::new(0, 4));
        let tally = tally.unwrap();

        assert_eq!(tally.committed, 3);
        assert_eq!(tally.discarded, 1);
        assert_eq!(cells[0].label, 2);
        assert!(cells[1].is_sentinel());
        assert!(cells[2].is_sentinel());
        assert_eq!(cells[3].label, 3);
    }

    #[test]
    fn test_worker_reads_only_its_partition() {
        let source = VecPointSource::new(vec![
            Point::new(0.5, 0.5, 10.0, 1),
            Point::new(0.5, 0.5, 1.0, 2),
            Point::new(1.5, 0.5, 1.0, 3),
        ]);
        let (tally, cells) = run_worker(&source, Partition::new(1, 3));
        assert_eq!(tally.unwrap().total(), 2);
        assert_eq!(cells[0].label, 2);
        assert_eq!(cells[1].label, 3);
    }

    #[test]
    fn test_empty_partition_leaves_sentinels() {
        let source = VecPointSource::new(vec![Point::new(0.5, 0.5, 1.0, 1)]);
        let (tally, cells) = run_worker(&source, Partition::new(1, 1));
        assert_eq!(tally.unwrap(), WorkerTally::default());
        assert!(cells.iter().all(Point::is_sentinel));
    }

    #[test]
    fn test_read_failure_fails_worker_without_hanging() {
        let source = FailingSource { fail_from: 3, len: 10 };
        let (result, cells) = run_worker(&source, Partition::new(0, 10));
        assert!(matches!(result, Err(DsmError::Io(_))));
        // Points read before the failure were still committed.
        assert_eq!(cells[0].z, 2.0);
    }

    #[test]
    fn test_relay_preserves_order_and_closes() {
        let (in_tx, in_rx) = bounded(0);
        let (out_tx, out_rx) = bounded(0);
        let received = thread::scope(|scope| {
            scope.spawn(move || relay_points(in_rx, out_tx));
            scope.spawn(move || {
                for label in 0..100u32 {
                    in_tx.send(Point::new(0.0, 0.0, 0.0, label)).unwrap();
                }
            });
            out_rx.iter().map(|p| p.label).collect::<Vec<_>>()
        });
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_commit_equal_elevations_keep_first_arrival() {
        let (tx, rx) = bounded(0);
        let cells = CellStore::new(4);
        let geometry = grid_2x2();
        let tally = thread::scope(|scope| {
            let handle = scope.spawn(|| commit_points(rx, &geometry, &cells));
            for label in [7, 8, 9] {
                tx.send(Point::new(0.5, 0.5, 4.0, label)).unwrap();
            }
            drop(tx);
            handle.join().unwrap()
        });
        assert_eq!(tally.committed, 3);
        assert_eq!(cells.snapshot(0).label, 7);
    }
}
