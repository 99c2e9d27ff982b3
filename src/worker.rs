//! Background plate jobs.
//!
//! A [`PlateSession`] owns the live plate that viewers read. Mutating work runs
//! on a worker thread against a scratch clone of the plate and is swapped in
//! under the write lock only when the job finishes successfully, so readers
//! never observe a half-done split or arrangement. At most one mutating job
//! runs per session.

use crate::errors::PlateError;
use crate::export::{MeshWriter, save_merged};
use crate::float_types::Real;
use crate::merge::MergeMode;
use crate::mesh::Mesh;
use crate::plate::{Plate, SolidId};
use nalgebra::Matrix4;
use parking_lot::{RwLock, RwLockReadGuard};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;
use tracing::{debug, info, info_span, warn};

/// One progress report from a running job.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub ratio: Real,
    pub status: String,
}

/// How a job ended.
#[derive(Debug)]
pub enum JobStatus {
    Completed,
    Cancelled,
    Failed(PlateError),
}

/// What to do with the scratch plate once a job returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Swap the scratch plate in as the live plate
    Replace,
    /// Leave the live plate as it is
    Discard,
}

/// Handed to a running job for progress reporting and cancellation checks.
pub struct JobContext {
    progress: Sender<ProgressUpdate>,
    cancelled: Arc<AtomicBool>,
}

impl JobContext {
    /// Send a progress report. Reports after the receiver is gone are dropped.
    pub fn report(&self, ratio: Real, status: &str) {
        let _ = self.progress.send(ProgressUpdate {
            ratio: ratio.clamp(0.0, 1.0),
            status: status.to_string(),
        });
    }

    /// A progress callback forwarding to [`JobContext::report`].
    pub fn progress(&self) -> impl FnMut(Real, &str) + '_ {
        move |ratio, status| self.report(ratio, status)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err(PlateError::Cancelled)` once cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), PlateError> {
        if self.is_cancelled() {
            Err(PlateError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Clears the session's busy flag when the worker finishes, panics included.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, PlateError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PlateError::Busy)?;
        Ok(BusyGuard(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to a running job.
pub struct PlateJob {
    label: String,
    progress: Receiver<ProgressUpdate>,
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<JobStatus>,
}

impl PlateJob {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Ask the job to stop at its next checkpoint. The live plate stays untouched.
    pub fn cancel(&self) {
        debug!(label = %self.label, "cancel requested");
        self.cancelled.store(true, Ordering::Release);
    }

    /// Progress channel, for callers that want to block on updates.
    pub fn progress(&self) -> &Receiver<ProgressUpdate> {
        &self.progress
    }

    /// Every update received so far, without blocking.
    pub fn drain_progress(&self) -> Vec<ProgressUpdate> {
        self.progress.try_iter().collect()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job ends.
    pub fn wait(self) -> JobStatus {
        match self.handle.join() {
            Ok(status) => status,
            Err(_) => JobStatus::Failed(PlateError::WorkerPanicked),
        }
    }
}

/// The live plate plus its single-writer job slot.
#[derive(Clone, Default)]
pub struct PlateSession {
    plate: Arc<RwLock<Plate>>,
    busy: Arc<AtomicBool>,
}

impl PlateSession {
    pub fn new(plate: Plate) -> Self {
        PlateSession {
            plate: Arc::new(RwLock::new(plate)),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Read access to the live plate.
    pub fn read(&self) -> RwLockReadGuard<'_, Plate> {
        self.plate.read()
    }

    /// Clone of the live plate.
    pub fn snapshot(&self) -> Plate {
        self.plate.read().clone()
    }

    /// Whether a mutating job is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `job` on a worker thread against a scratch copy of the plate.
    ///
    /// Fails with [`PlateError::Busy`] while another job is running. The
    /// scratch plate replaces the live one only if the job returns
    /// [`Commit::Replace`] and was not cancelled in the meantime.
    pub fn spawn<F>(&self, label: &str, job: F) -> Result<PlateJob, PlateError>
    where
        F: FnOnce(&mut Plate, &JobContext) -> Result<Commit, PlateError> + Send + 'static,
    {
        let guard = BusyGuard::acquire(&self.busy)?;
        let (progress_tx, progress_rx) = channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let context = JobContext {
            progress: progress_tx,
            cancelled: cancelled.clone(),
        };
        let live = self.plate.clone();
        let job_label = label.to_string();

        let handle = std::thread::Builder::new()
            .name(format!("plate-{label}"))
            .spawn(move || {
                let _guard = guard;
                let _span = info_span!("plate_job", label = %job_label).entered();

                let mut scratch = live.read().clone();
                match job(&mut scratch, &context) {
                    Ok(Commit::Replace) if context.is_cancelled() => JobStatus::Cancelled,
                    Ok(Commit::Replace) => {
                        *live.write() = scratch;
                        info!("job committed");
                        JobStatus::Completed
                    },
                    Ok(Commit::Discard) => JobStatus::Completed,
                    Err(PlateError::Cancelled) => {
                        info!("job cancelled");
                        JobStatus::Cancelled
                    },
                    Err(err) => {
                        warn!(%err, "job failed");
                        JobStatus::Failed(err)
                    },
                }
            })?;

        Ok(PlateJob {
            label: label.to_string(),
            progress: progress_rx,
            cancelled,
            handle,
        })
    }

    /// Add meshes one by one, each placed next to what is already on the plate.
    pub fn import(&self, meshes: Vec<Mesh>) -> Result<PlateJob, PlateError> {
        self.spawn("import", move |plate, ctx| {
            let total = meshes.len().max(1) as Real;
            for (i, mesh) in meshes.into_iter().enumerate() {
                ctx.checkpoint()?;
                plate.add_solid(mesh, Matrix4::identity())?;
                ctx.report((i + 1) as Real / total, "Loading Parts");
            }
            Ok(Commit::Replace)
        })
    }

    /// Split one solid into its connected components.
    pub fn split_solid(&self, id: SolidId) -> Result<PlateJob, PlateError> {
        self.spawn("split", move |plate, ctx| {
            ctx.checkpoint()?;
            let mut progress = ctx.progress();
            plate.split_solid(id, &mut progress)?;
            ctx.checkpoint()?;
            Ok(Commit::Replace)
        })
    }

    /// Auto-arrange every solid.
    pub fn arrange(&self) -> Result<PlateJob, PlateError> {
        self.spawn("arrange", move |plate, ctx| {
            let mut progress = ctx.progress();
            plate.arrange_with(&mut progress, &mut || ctx.checkpoint())?;
            Ok(Commit::Replace)
        })
    }

    /// Merge the plate and hand it to `writer`. The live plate is not changed.
    pub fn save_merged<W>(
        &self,
        mut writer: W,
        path: PathBuf,
        mode: MergeMode,
    ) -> Result<PlateJob, PlateError>
    where
        W: MeshWriter + Send + 'static,
    {
        self.spawn("save", move |plate, ctx| {
            ctx.checkpoint()?;
            let mut progress = ctx.progress();
            save_merged(plate, &mut writer, &path, mode, &mut progress)?;
            Ok(Commit::Discard)
        })
    }
}
