mod support;

use meshplate::{
    Commit, JobStatus, MergeMode, Plate, PlateError, PlateSession,
    merge::merge_flat,
    mesh::{Mesh, shapes},
    progress::no_progress,
};
use nalgebra::Matrix4;
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::channel;
use support::{cube_at, init_tracing};

#[test]
fn import_job_commits_solids() {
    init_tracing();
    let session = PlateSession::default();
    let job = session
        .import(vec![shapes::cube(5.0), shapes::cube(3.0), shapes::tetrahedron(4.0)])
        .unwrap();
    assert_eq!(job.label(), "import");

    let status = job.wait();
    assert!(matches!(status, JobStatus::Completed));
    assert_eq!(session.read().len(), 3);
    assert!(!session.is_busy());
}

#[test]
fn progress_updates_arrive_in_order() {
    let session = PlateSession::default();
    let job = session
        .import(vec![shapes::cube(1.0), shapes::cube(1.0)])
        .unwrap();
    let updates: Vec<_> = job.progress().iter().collect();
    assert!(matches!(job.wait(), JobStatus::Completed));

    let ratios: Vec<_> = updates.iter().map(|u| u.ratio).collect();
    assert_eq!(ratios, vec![0.5, 1.0]);
    assert!(updates.iter().all(|u| u.status == "Loading Parts"));
}

#[test]
fn split_job_swaps_in_the_components() {
    let two = merge_flat(
        &[shapes::cube(2.0), cube_at(2.0, [6.0, 0.0, 0.0])],
        1e-6,
        &mut no_progress(),
    );
    let mut plate = Plate::default();
    let id = plate.add_solid(two, Matrix4::identity()).unwrap().id().unwrap();
    let session = PlateSession::new(plate);

    let job = session.split_solid(id).unwrap();
    assert!(matches!(job.wait(), JobStatus::Completed));

    let live = session.read();
    assert_eq!(live.len(), 2);
    assert!(live.get(id).is_none());
}

#[test]
fn cancelled_job_leaves_live_plate_untouched() {
    let session = PlateSession::default();
    let (gate_tx, gate_rx) = channel::<()>();

    let job = session
        .spawn("slow", move |plate, ctx| {
            plate.add_solid(shapes::cube(1.0), Matrix4::identity())?;
            let _ = gate_rx.recv();
            ctx.checkpoint()?;
            Ok(Commit::Replace)
        })
        .unwrap();

    job.cancel();
    gate_tx.send(()).unwrap();
    assert!(matches!(job.wait(), JobStatus::Cancelled));
    assert!(session.read().is_empty());
    assert!(!session.is_busy());
}

#[test]
fn cancel_after_success_still_discards() {
    let session = PlateSession::default();
    let (gate_tx, gate_rx) = channel::<()>();

    let job = session
        .spawn("late", move |plate, _ctx| {
            plate.add_solid(shapes::cube(1.0), Matrix4::identity())?;
            let _ = gate_rx.recv();
            Ok(Commit::Replace)
        })
        .unwrap();

    job.cancel();
    gate_tx.send(()).unwrap();
    assert!(matches!(job.wait(), JobStatus::Cancelled));
    assert!(session.read().is_empty());
}

#[test]
fn second_job_is_rejected_while_one_runs() {
    let session = PlateSession::default();
    let (gate_tx, gate_rx) = channel::<()>();

    let first = session
        .spawn("blocking", move |_plate, _ctx| {
            let _ = gate_rx.recv();
            Ok(Commit::Discard)
        })
        .unwrap();

    assert!(session.is_busy());
    assert!(matches!(session.arrange(), Err(PlateError::Busy)));

    gate_tx.send(()).unwrap();
    assert!(matches!(first.wait(), JobStatus::Completed));
    assert!(!session.is_busy());

    let next = session.arrange().unwrap();
    assert!(matches!(next.wait(), JobStatus::Completed));
}

#[test]
fn failing_job_reports_its_error() {
    let session = PlateSession::new(Plate::default());
    let job = session
        .spawn("broken", |plate, _ctx| {
            plate.add_solid(shapes::cube(1.0), Matrix4::identity())?;
            plate.remove(meshplate::SolidId(999))?;
            Ok(Commit::Replace)
        })
        .unwrap();

    match job.wait() {
        JobStatus::Failed(PlateError::UnknownSolid(id)) => assert_eq!(id.0, 999),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(session.read().is_empty());
}

#[test]
fn panicking_job_frees_the_session() {
    let session = PlateSession::default();
    let job = session
        .spawn("panics", |_plate, _ctx| -> Result<Commit, PlateError> {
            panic!("boom");
        })
        .unwrap();

    assert!(matches!(
        job.wait(),
        JobStatus::Failed(PlateError::WorkerPanicked)
    ));
    assert!(!session.is_busy());
}

#[test]
fn arrange_job_commits_layout() {
    let mut plate = Plate::default();
    for size in [2.0, 8.0, 4.0] {
        plate.add_solid(shapes::cube(size), Matrix4::identity()).unwrap();
    }
    let before: Vec<_> = plate.solids().iter().map(|s| s.transform).collect();
    let session = PlateSession::new(plate);

    assert!(matches!(session.arrange().unwrap().wait(), JobStatus::Completed));
    let after: Vec<_> = session.read().solids().iter().map(|s| s.transform).collect();
    assert_ne!(before, after);
}

#[test]
fn save_job_writes_without_changing_the_plate() {
    let mut plate = Plate::default();
    plate.add_solid(shapes::cube(2.0), Matrix4::identity()).unwrap();
    plate.add_solid(shapes::cube(2.0), Matrix4::identity()).unwrap();
    let session = PlateSession::new(plate);

    let written: Arc<Mutex<Vec<(usize, PathBuf)>>> = Arc::default();
    let sink = written.clone();
    let writer = move |mesh: &Mesh, path: &Path| -> io::Result<()> {
        sink.lock().push((mesh.face_count(), path.to_path_buf()));
        Ok(())
    };

    let job = session
        .save_merged(writer, PathBuf::from("out/plate.stl"), MergeMode::Flat)
        .unwrap();
    assert!(matches!(job.wait(), JobStatus::Completed));

    assert_eq!(*written.lock(), vec![(12, PathBuf::from("out/plate.stl"))]);
    assert_eq!(session.read().len(), 2);
}
