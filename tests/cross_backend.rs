use lloyd_bench::*;
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

fn all_backends() -> Vec<Backend> {
    vec![
        Backend::Reference,
        Backend::Vectorized,
        Backend::Native(Native::default()),
        Backend::Native(Native::with_chunk_size(3)),
        Backend::Accelerated(Accelerated::new(PlatformKind::Simulated)),
        Backend::Accelerated(Accelerated::new(PlatformKind::Echo)),
    ]
}

/// Successful outcome, or the (iteration, centroid) of an empty cluster.
fn summarize(res: Result<RunOutcome<i64>>) -> std::result::Result<RunOutcome<i64>, (usize, usize)> {
    match res {
        Ok(outcome) => Ok(outcome),
        Err(Error::EmptyCluster { iteration, centroid }) => Err((iteration, centroid)),
        Err(err) => panic!("unexpected error: {}", err),
    }
}

#[test]
fn already_optimal_centroids_converge_in_one_iteration() {
    let points = PointStore::from_rows(vec![vec![0, 0], vec![0, 1], vec![10, 10], vec![10, 11]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![0, 0], vec![10, 10]]).unwrap();
    for backend in all_backends() {
        let res = backend.run(&points, initial.clone(), 10).unwrap();
        assert_eq!(res.iterations, 1, "{}", backend);
        assert_eq!(res.termination, Termination::Converged, "{}", backend);
        assert_eq!(res.centroids.to_rows(), vec![vec![0, 0], vec![10, 10]], "{}", backend);
    }
}

#[test]
fn backends_agree_on_generated_data() {
    let points = datagen::clustered_points(3000, 3, 5, 40, 1000, 99).unwrap();
    let initial = inits::random_sample(&points, 5, &mut StdRng::seed_from_u64(5)).unwrap();
    let want = summarize(Backend::Reference.run(&points, initial.clone(), 50));
    for backend in all_backends() {
        assert_eq!(summarize(backend.run(&points, initial.clone(), 50)), want, "{}", backend);
    }
}

#[test]
fn empty_cluster_is_reported_identically() {
    let points = PointStore::from_rows(vec![vec![1, 0], vec![2, 0], vec![3, 0]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![2, 0], vec![1337, 0]]).unwrap();
    for backend in all_backends() {
        assert_eq!(summarize(backend.run(&points, initial.clone(), 10)), Err((1, 1)), "{}", backend);
    }
}

#[test]
fn negative_means_are_truncated_toward_zero() {
    let points = PointStore::from_rows(vec![vec![-3], vec![-4], vec![100], vec![101]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![-3], vec![100]]).unwrap();
    for backend in all_backends() {
        let res = backend.run(&points, initial.clone(), 1).unwrap();
        assert_eq!(res.centroids.to_rows(), vec![vec![-3], vec![100]], "{}", backend);
    }
}

#[test]
fn equidistant_point_goes_to_lowest_centroid_on_every_backend() {
    // (5,0) is at squared distance 25 from both centroids
    let points = PointStore::from_rows(vec![vec![5, 0], vec![0, 0], vec![10, 0]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![0, 0], vec![10, 0]]).unwrap();
    for backend in all_backends() {
        let res = backend.run(&points, initial.clone(), 30).unwrap();
        assert_eq!(res.centroids.to_rows(), vec![vec![2, 0], vec![10, 0]], "{}", backend);
        assert_eq!(res.termination, Termination::Converged, "{}", backend);
    }
}

#[test]
fn overflow_is_an_error_on_every_backend() {
    let big = 1i64 << 40;
    // (2^41)^2 does not fit an i64
    let points = PointStore::from_rows(vec![vec![big, big], vec![-big, -big], vec![0, 0]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![big, big], vec![0, 0]]).unwrap();
    for backend in all_backends() {
        assert!(matches!(backend.run(&points, initial.clone(), 30), Err(Error::Overflow { iteration: 1 })), "{}", backend);
    }

    // distances fit, the cluster sum does not
    let points = PointStore::from_rows(vec![vec![i64::MAX - 1], vec![i64::MAX - 2]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![i64::MAX - 1]]).unwrap();
    for backend in all_backends() {
        assert!(matches!(backend.run(&points, initial.clone(), 30), Err(Error::Overflow { iteration: 1 })), "{}", backend);
    }
}

#[test]
fn malformed_centroid_state_is_rejected_by_every_backend() {
    let points = PointStore::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    let initial = CentroidState { k: 2, dims: 2, centroids: vec![1, 2, 3] };
    for backend in all_backends() {
        assert!(matches!(backend.run(&points, initial.clone(), 5), Err(Error::InvalidInput(_))), "{}", backend);
    }
}

#[test]
fn dimension_mismatch_is_rejected_by_every_backend() {
    let points = PointStore::from_rows(vec![vec![1, 2, 3]]).unwrap();
    let initial = CentroidState::from_rows(vec![vec![1, 2]]).unwrap();
    for backend in all_backends() {
        assert!(matches!(backend.run(&points, initial.clone(), 5), Err(Error::InvalidInput(_))), "{}", backend);
    }
}

#[test]
fn harness_times_every_backend_and_survives_failures() {
    let points = datagen::uniform_points(512, 2, 99, 42).unwrap();
    let initial = inits::first_k(&points, 2).unwrap();
    let mut backends = all_backends();
    backends.insert(1, Backend::Accelerated(
        Accelerated::default().inject_fault(Fault::Hang).timeout(Duration::from_millis(20))));

    let records = BenchmarkHarness::new(&points, &initial, 30).run(&backends);
    assert_eq!(records.len(), backends.len());
    assert!(matches!(records[1].result, Err(Error::BackendUnavailable { .. })));

    let reference = records[0].result.as_ref().map(|m| m.outcome.clone()).map_err(|e| e.to_string());
    for record in records.iter().enumerate().filter(|(i, _)| *i != 1).map(|(_, r)| r) {
        let got = record.result.as_ref().map(|m| m.outcome.clone()).map_err(|e| e.to_string());
        assert_eq!(got, reference, "{}", record.backend);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn backends_agree_on_random_inputs(
        (dims, rows) in (1usize..4).prop_flat_map(|d| (Just(d), prop::collection::vec(prop::collection::vec(-50i64..50, d), 1..40))),
        k in 1usize..5,
        limit in 0usize..8,
    ) {
        let k = k.min(rows.len());
        let points = PointStore::from_rows(rows).unwrap();
        prop_assert_eq!(points.dims(), dims);
        let initial = inits::first_k(&points, k).unwrap();

        let want = summarize(Backend::Reference.run(&points, initial.clone(), limit));
        if let Ok(outcome) = &want {
            prop_assert!(outcome.iterations <= limit);
        }
        for backend in all_backends() {
            prop_assert_eq!(summarize(backend.run(&points, initial.clone(), limit)), want.clone(), "{}", backend);
        }
    }
}
