use super::{
    extractor::{ContourExtractor, SliceQuality},
    marching_squares::{CellStateGrid, ClippingArea, GridMappingError},
};
use crate::core::traits::Real;
use crate::polyline::PolyLine;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

/// Source of cell state grids for slicing (consumed interface).
///
/// Implementations typically threshold an externally evaluated signed distance field at
/// iso-value 0, see [DistanceMap::to_cell_states](crate::field::DistanceMap::to_cell_states).
pub trait SliceFieldSource<T>: Send + Sync
where
    T: Real,
{
    /// Cell states of the iso-surface at height `z` together with the world clipping area the
    /// grid maps into.
    fn cell_states(&self, z: T) -> (CellStateGrid, ClippingArea<T>);
}

/// Serializes slice computation around a [ContourExtractor] and runs it in a single background
/// task.
///
/// Two locks are involved: the compute lock (the "compute token") serializes field updates,
/// iso-line extraction and contour readback, while the extractor mutex hands readers a stable
/// snapshot of the finished contour without waiting on in-flight field work.
pub struct SliceScheduler<T = f64>
where
    T: Real,
{
    extractor: Arc<Mutex<ContourExtractor<T>>>,
    compute_lock: Arc<Mutex<()>>,
    source: Arc<dyn SliceFieldSource<T>>,
    slice_task: Option<JoinHandle<Result<(), GridMappingError>>>,
    last_height: Option<T>,
}

fn lock_ignoring_poison<M>(mutex: &Mutex<M>) -> MutexGuard<'_, M> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T> SliceScheduler<T>
where
    T: Real + Send + Sync,
{
    pub fn new(source: Arc<dyn SliceFieldSource<T>>) -> Self {
        SliceScheduler {
            extractor: Arc::new(Mutex::new(ContourExtractor::new())),
            compute_lock: Arc::new(Mutex::new(())),
            source,
            slice_task: None,
            last_height: None,
        }
    }

    /// Queues a background slice at height `z`.
    ///
    /// Requesting the height of the previous request is a no-op returning false. A request at a
    /// new height first joins the slice still in flight, then spawns the new one.
    pub fn request_contour_update(&mut self, z: T) -> bool {
        if let Some(last) = self.last_height {
            if (last - z).abs() < T::epsilon() {
                return false;
            }
        }

        if let Err(err) = self.wait_for_slice() {
            log::warn!("previous slice failed: {err}");
        }

        let extractor = Arc::clone(&self.extractor);
        let compute_lock = Arc::clone(&self.compute_lock);
        let source = Arc::clone(&self.source);

        self.slice_task = Some(std::thread::spawn(move || {
            let _token = lock_ignoring_poison(&compute_lock);
            let (mut grid, clip) = source.cell_states(z);

            let mut extractor = lock_ignoring_poison(&extractor);
            extractor.clear();
            extractor.add_iso_line_from_marching_squares(&mut grid, &clip)?;
            extractor.run_post_processing();
            Ok(())
        }));
        self.last_height = Some(z);

        true
    }

    /// True while a background slice has not completed yet.
    pub fn is_slicing_in_progress(&self) -> bool {
        self.slice_task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Joins the in-flight slice, surfacing its result. Returns `Ok(())` when nothing was in
    /// flight.
    pub fn wait_for_slice(&mut self) -> Result<(), GridMappingError> {
        match self.slice_task.take() {
            Some(task) => match task.join() {
                Ok(result) => result,
                Err(_) => {
                    log::error!("slice task panicked");
                    Ok(())
                }
            },
            None => Ok(()),
        }
    }

    /// Cloned snapshot of the closed contour set, taken under the extractor mutex.
    pub fn contour_snapshot(&self) -> Vec<PolyLine<T>> {
        lock_ignoring_poison(&self.extractor).contour().to_vec()
    }

    /// Snapshot of the quality record of the last finished slice.
    pub fn quality_snapshot(&self) -> SliceQuality<T> {
        *lock_ignoring_poison(&self.extractor).slice_quality()
    }

    /// Height of the most recently requested slice.
    pub fn last_height(&self) -> Option<T> {
        self.last_height
    }

    /// Shared handle to the extractor for callers that need more than a snapshot.
    pub fn extractor(&self) -> Arc<Mutex<ContourExtractor<T>>> {
        Arc::clone(&self.extractor)
    }
}
