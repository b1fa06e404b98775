//! Watcher + debouncer pipeline against a real filesystem: bursts collapse
//! to single jobs, unrelated files are ignored, delete/recreate cycles keep
//! triggering.

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded, unbounded};
use tempfile::TempDir;

use common::write_png;
use snaptex::daemon::{Debouncer, FileWatch, PredictionJob};

const WINDOW: Duration = Duration::from_millis(250);
const JOB_WAIT: Duration = Duration::from_secs(5);

struct Pipeline {
    watch: FileWatch,
    jobs: Receiver<PredictionJob>,
    handle: std::thread::JoinHandle<()>,
}

impl Pipeline {
    fn start(target: &std::path::Path) -> Self {
        let (raw_tx, raw_rx) = unbounded();
        let (job_tx, job_rx) = bounded(8);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = std::thread::spawn(move || {
            Debouncer::new(WINDOW).run(&raw_rx, &job_tx, &shutdown);
        });
        let watch = FileWatch::start(target, raw_tx).expect("watch established");

        Self {
            watch,
            jobs: job_rx,
            handle,
        }
    }

    fn stop(self) {
        self.watch.stop();
        self.handle.join().unwrap();
    }
}

#[test]
fn burst_of_writes_collapses_to_one_job() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("snaptex.png");
    let pipeline = Pipeline::start(&target);

    for shade in [1u8, 2, 3] {
        write_png(&target, shade);
        std::thread::sleep(Duration::from_millis(60));
    }

    let job = pipeline.jobs.recv_timeout(JOB_WAIT).expect("one job");
    assert_eq!(job.id, 1);
    assert_eq!(job.path, target);

    // The burst produced exactly one job.
    assert!(
        pipeline
            .jobs
            .recv_timeout(WINDOW + Duration::from_millis(300))
            .is_err()
    );
    pipeline.stop();
}

#[test]
fn unrelated_files_in_the_directory_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("snaptex.png");
    let pipeline = Pipeline::start(&target);

    write_png(&tmp.path().join("other.png"), 9);
    write_png(&tmp.path().join("snaptex.png.bak"), 9);

    assert!(
        pipeline
            .jobs
            .recv_timeout(WINDOW + Duration::from_millis(500))
            .is_err()
    );
    pipeline.stop();
}

#[test]
fn delete_and_recreate_is_a_fresh_trigger() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("snaptex.png");
    let pipeline = Pipeline::start(&target);

    write_png(&target, 1);
    let first = pipeline.jobs.recv_timeout(JOB_WAIT).expect("first job");

    std::fs::remove_file(&target).unwrap();
    // Removal alone is not a trigger.
    assert!(
        pipeline
            .jobs
            .recv_timeout(WINDOW + Duration::from_millis(300))
            .is_err()
    );

    write_png(&target, 2);
    let second = pipeline.jobs.recv_timeout(JOB_WAIT).expect("second job");

    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
    pipeline.stop();
}

#[test]
fn watch_creates_missing_directory_at_start() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("nested").join("capture").join("snaptex.png");
    assert!(!target.parent().unwrap().exists());

    let pipeline = Pipeline::start(&target);
    assert!(target.parent().unwrap().is_dir());

    write_png(&target, 4);
    let job = pipeline.jobs.recv_timeout(JOB_WAIT).expect("job after mkdir");
    assert_eq!(job.path, target);
    pipeline.stop();
}
