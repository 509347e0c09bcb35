use lloyd_bench::*;
use rand::{rngs::StdRng, SeedableRng};

fn main() {
    let (sample_cnt, sample_dims, k, max_iter) = (20000, 16, 4, 100);

    // Generate some random data
    let points = datagen::clustered_points(sample_cnt, sample_dims, k, 50, 10_000, 1337).unwrap();

    // Pick k random points as initial centroids
    let initial = inits::random_sample(&points, k, &mut StdRng::seed_from_u64(1337)).unwrap();
    let result = Backend::Native(Native::default()).run(&points, initial, max_iter).unwrap();

    println!("Centroids: {:?}", result.centroids.to_rows());
    println!("Iterations: {}", result.iterations);
    println!("Termination: {:?}", result.termination);
}
