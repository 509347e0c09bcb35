use crate::{Backend, CentroidState, PointStore, Result, RunOutcome, Termination};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Wall-clock stopwatch.
#[derive(Clone, Copy, Debug)]
pub struct Timer {
    started: Instant,
    elapsed: Option<Duration>,
}
impl Timer {
    pub fn start() -> Self {
        Self { started: Instant::now(), elapsed: None }
    }

    /// Stop the timer. Stopping twice keeps the first reading.
    pub fn stop(&mut self) -> Duration {
        *self.elapsed.get_or_insert_with(|| self.started.elapsed())
    }

    /// Elapsed seconds, up to now if the timer is still running.
    pub fn seconds(&self) -> f64 {
        self.elapsed.unwrap_or_else(|| self.started.elapsed()).as_secs_f64()
    }
}

/// Timing and result of one successful backend run.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    /// End-to-end wall-clock time, including device setup and transfers.
    pub elapsed: Duration,
    pub outcome: RunOutcome<i64>,
}

#[derive(Debug)]
pub struct BenchmarkRecord {
    pub backend: &'static str,
    pub result: Result<Measurement>,
}
impl BenchmarkRecord {
    pub fn centroids(&self) -> Option<&CentroidState<i64>> {
        self.result.as_ref().ok().map(|m| &m.outcome.centroids)
    }

    /// Flat, serializable view of this record.
    pub fn report(&self) -> ReportEntry {
        match &self.result {
            Ok(m) => ReportEntry {
                backend: self.backend,
                elapsed_seconds: Some(m.elapsed.as_secs_f64()),
                iterations: Some(m.outcome.iterations),
                termination: Some(m.outcome.termination),
                centroids: Some(m.outcome.centroids.to_rows()),
                error: None,
            },
            Err(err) => ReportEntry {
                backend: self.backend,
                elapsed_seconds: None,
                iterations: None,
                termination: None,
                centroids: None,
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportEntry {
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<Termination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centroids: Option<Vec<Vec<i64>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs several backends on the same input and times every run.
///
/// Backends run one after another, each on its own copy of the initial centroids. The harness
/// does not compare the results.
#[derive(Clone, Copy, Debug)]
pub struct BenchmarkHarness<'a> {
    points: &'a PointStore<i64>,
    initial: &'a CentroidState<i64>,
    iteration_limit: usize,
}
impl<'a> BenchmarkHarness<'a> {
    pub fn new(points: &'a PointStore<i64>, initial: &'a CentroidState<i64>, iteration_limit: usize) -> Self {
        Self { points, initial, iteration_limit }
    }

    /// Run every backend once, in order. A failing backend does not keep the following ones from running.
    pub fn run(&self, backends: &[Backend]) -> Vec<BenchmarkRecord> {
        backends.iter().map(|backend| self.run_one(backend)).collect()
    }

    pub fn run_one(&self, backend: &Backend) -> BenchmarkRecord {
        let centroids = self.initial.clone();
        let mut timer = Timer::start();
        let result = backend.run(self.points, centroids, self.iteration_limit);
        let elapsed = timer.stop();

        match &result {
            Ok(outcome) => info!(backend = backend.name(), seconds = elapsed.as_secs_f64(),
                iterations = outcome.iterations, "backend finished"),
            Err(err) => warn!(backend = backend.name(), %err, "backend failed"),
        }
        BenchmarkRecord { backend: backend.name(), result: result.map(|outcome| Measurement { elapsed, outcome }) }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::testing;
    use crate::{Accelerated, Error, Fault, Native};

    #[test]
    fn timer_keeps_first_reading() {
        let mut timer = Timer::start();
        let first = timer.stop();
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timer.stop(), first);
        assert_eq!(timer.seconds(), first.as_secs_f64());
    }

    #[test]
    fn records_follow_backend_order() {
        let points = testing::two_blobs();
        let initial = testing::centroids(&[&[-40, -40], &[40, 40]]);
        let harness = BenchmarkHarness::new(&points, &initial, 30);
        let records = harness.run(&[Backend::Native(Native::default()), Backend::Reference, Backend::Vectorized]);
        let names: Vec<_> = records.iter().map(|r| r.backend).collect();
        assert_eq!(names, ["native", "reference", "vectorized"]);
        assert!(records.iter().all(|r| r.centroids() == records[1].centroids()));
    }

    #[test]
    fn failing_backend_does_not_stop_the_others() {
        let points = testing::two_blobs();
        let initial = testing::centroids(&[&[-40, -40], &[40, 40]]);
        let broken = Accelerated::default().inject_fault(Fault::InitFailure);
        let records = BenchmarkHarness::new(&points, &initial, 30).run(&[Backend::Accelerated(broken), Backend::Reference]);
        assert!(matches!(records[0].result, Err(Error::BackendUnavailable { .. })));
        assert!(records[1].result.is_ok());

        let report = records[0].report();
        assert!(report.error.is_some());
        assert!(report.centroids.is_none());
    }

    #[test]
    fn report_serializes_outcome() {
        let points = testing::points(&[&[0, 0], &[0, 1], &[10, 10], &[10, 11]]);
        let initial = testing::centroids(&[&[0, 0], &[10, 10]]);
        let record = BenchmarkHarness::new(&points, &initial, 10).run_one(&Backend::Reference);
        let json = serde_json::to_value(record.report()).unwrap();
        assert_eq!(json["backend"], "reference");
        assert_eq!(json["iterations"], 1);
        assert_eq!(json["termination"], "converged");
        assert_eq!(json["centroids"], serde_json::json!([[0, 0], [10, 10]]));
        assert!(json.get("error").is_none());
    }
}
