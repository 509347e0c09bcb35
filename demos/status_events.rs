use lloyd_bench::*;

fn main() {
    let (sample_cnt, sample_dims, k, max_iter) = (20000, 2, 4, 2500);

    // Generate some random data
    let points = datagen::uniform_points(sample_cnt, sample_dims, 99, 42).unwrap();

    let conf = KMeansConfig::build()
        .init_done(&|s| println!("Initialization completed: {:?}", s.to_rows()))
        .iteration_done(&|s, nr| println!("Iteration {} - Centroids: {:?}", nr, s.to_rows()))
        .build();

    let initial = inits::first_k(&points, k).unwrap();
    let result = Backend::Reference.run_with_config(&points, initial, max_iter, &conf);

    match result {
        Ok(result) => println!("{:?} after {} iterations", result.termination, result.iterations),
        Err(err) => println!("Clustering failed: {}", err),
    }
}
