use crate::{memory::*, CentroidState, Error, KMeansConfig, PointStore, Result, RunOutcome, Termination};
use tracing::{debug, info};

/// One full pass of Lloyd's algorithm: assign every point to its closest centroid, then replace
/// every centroid by the truncated integer mean of its points.
///
/// Implementations only differ in *how* they compute the pass. For identical inputs they have to
/// write bit-identical centroids into **next**, including the tie-break on equal distances
/// (lowest centroid index wins) and the toward-zero rounding of the mean.
pub trait LloydStep<T: Primitive> {
    /// Name used in log output.
    fn name(&self) -> &'static str;

    /// ## Arguments
    /// - **iteration**: Number of this pass (starting at 1), reported in [`crate::Error::EmptyCluster`]
    /// - **points**: The points to cluster
    /// - **current**: Centroids the pass starts from
    /// - **next**: Buffer of the same shape as **current**, fully overwritten with the new centroids
    fn step(&self, iteration: usize, points: &PointStore<T>, current: &CentroidState<T>, next: &mut CentroidState<T>)
        -> Result<()>;
}

/// State of a running calculation, as tracked by [`ConvergenceLogic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Converged,
    LimitReached,
}
impl LoopState {
    pub fn termination(self) -> Option<Termination> {
        match self {
            LoopState::Running => None,
            LoopState::Converged => Some(Termination::Converged),
            LoopState::LimitReached => Some(Termination::LimitReached),
        }
    }
}

/// Decides after every iteration whether the calculation goes on.
///
/// Before the first iteration there is nothing to compare against, so the loop always runs at
/// least once unless the limit is zero. A converged iteration wins over a simultaneously reached
/// limit.
#[derive(Clone, Debug)]
pub(crate) struct ConvergenceLogic {
    iteration_limit: usize,
    iterations: usize,
}
impl ConvergenceLogic {
    pub(crate) fn new(iteration_limit: usize) -> Self {
        Self { iteration_limit, iterations: 0 }
    }

    pub(crate) fn iterations(&self) -> usize { self.iterations }

    pub(crate) fn iteration_finished(&mut self) { self.iterations += 1; }

    pub(crate) fn state<T: Primitive>(&self, previous: &CentroidState<T>, current: &CentroidState<T>) -> LoopState {
        if self.iterations > 0 && previous == current {
            LoopState::Converged
        } else if self.iterations >= self.iteration_limit {
            LoopState::LimitReached
        } else {
            LoopState::Running
        }
    }
}


/// Outer convergence loop of Lloyd's algorithm, shared by all in-process backends.
pub struct ClusteringEngine;
impl ClusteringEngine {
    /// Run **step** until it reaches a fixed point or executed **iteration_limit** iterations.
    ///
    /// The engine owns two centroid buffers and swaps them every iteration: the one an iteration
    /// starts from becomes `previous`, the other one is overwritten by the step.
    ///
    /// ## Returns
    /// The final centroids together with the number of executed iterations, or
    /// [`crate::Error::EmptyCluster`] carrying the (1-based) iteration and the centroid index.
    /// [`crate::Error::Cancelled`] if the config's cancel flag was set while the loop was running.
    pub fn run<'a, T, S>(step: &S, points: &PointStore<T>, initial: CentroidState<T>, iteration_limit: usize,
                config: &KMeansConfig<'a, T>) -> Result<RunOutcome<T>>
            where T: Primitive, S: LloydStep<T> + ?Sized {
        initial.check_compatible(points)?;
        (config.init_done)(&initial);

        let mut previous = CentroidState::zeroed(initial.k, initial.dims);
        let mut current = initial;
        let mut logic = ConvergenceLogic::new(iteration_limit);

        let termination = loop {
            if let Some(termination) = logic.state(&previous, &current).termination() {
                break termination;
            }
            if config.cancelled() {
                info!(backend = step.name(), iterations = logic.iterations(), "clustering cancelled");
                return Err(Error::Cancelled { iterations: logic.iterations() });
            }
            std::mem::swap(&mut previous, &mut current);
            step.step(logic.iterations() + 1, points, &previous, &mut current)?;
            logic.iteration_finished();

            debug!(backend = step.name(), iteration = logic.iterations(), "iteration finished");
            (config.iteration_done)(&current, logic.iterations());
        };

        info!(backend = step.name(), iterations = logic.iterations(), ?termination, "clustering finished");
        Ok(RunOutcome { centroids: current, iterations: logic.iterations(), termination })
    }
}
