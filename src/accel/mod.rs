//! Offloading a whole clustering run to an accelerator.
//!
//! The host encodes the points as an Arrow record batch and the initial centroids plus the
//! iteration limit as 32-bit words, starts the kernel through the control register, polls the
//! status register and finally reads the resulting centroids back from the argument bank.
//! Only `i64` coordinates are supported, since every coordinate travels as two 32-bit words.

pub mod platform;
pub mod registers;
pub mod simulated;

pub use platform::{Device, Platform};
pub use simulated::{Fault, KernelShape, SimulatedPlatform};

use crate::variants::ClusteringBackend;
use crate::{columnar, CentroidState, Error, PointStore, Result, RunOutcome, Termination};
use registers::*;
use std::time::Duration;
use tracing::{debug, warn};

const BACKEND: &str = "accelerated";

/// Time the host waits for the kernel before giving up.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Platforms the accelerated backend can run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformKind {
    /// Software model of the kernel.
    Simulated,
    /// Software model that logs every register access.
    Echo,
}
impl PlatformKind {
    /// Bring up a platform whose kernel was generated for **shape**.
    pub fn create(self, shape: KernelShape, fault: Option<Fault>) -> Box<dyn Platform> {
        let platform = SimulatedPlatform::new(shape).with_fault(fault);
        match self {
            PlatformKind::Simulated => Box::new(platform),
            PlatformKind::Echo => Box::new(platform.echo()),
        }
    }
}
impl std::str::FromStr for PlatformKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "simulated" => Ok(PlatformKind::Simulated),
            "echo" => Ok(PlatformKind::Echo),
            other => Err(format!("unknown platform `{}`", other)),
        }
    }
}

/// Backend that runs the complete convergence loop on an accelerator.
///
/// Every run acquires a fresh [`Device`], which is released again when the run ends, also when
/// it ends with an error.
#[derive(Clone, Debug, PartialEq)]
pub struct Accelerated {
    platform: PlatformKind,
    timeout: Duration,
    fault: Option<Fault>,
}
impl Default for Accelerated {
    fn default() -> Self { Self::new(PlatformKind::Simulated) }
}
impl Accelerated {
    pub fn new(platform: PlatformKind) -> Self {
        Self { platform, timeout: DEFAULT_TIMEOUT, fault: None }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout; self
    }

    /// Make the simulated device misbehave.
    pub fn inject_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault); self
    }

    pub fn platform(&self) -> PlatformKind { self.platform }
}

impl ClusteringBackend<i64> for Accelerated {
    fn name(&self) -> &'static str { BACKEND }

    fn run(&self, points: &PointStore<i64>, centroids: CentroidState<i64>, iteration_limit: usize) -> Result<RunOutcome<i64>> {
        centroids.check_compatible(points)?;
        let (k, dims) = (centroids.k, centroids.dims);
        let args = encode_arguments(&centroids, iteration_limit)?;
        let batch = columnar::encode_points(points)?;

        let mut device = Device::acquire(self.platform.create(KernelShape { centroids: k, dims }, self.fault))?;
        device.reset()?;
        device.queue_record_batch(batch)?;
        device.set_range(0, points.len())?;
        device.set_arguments(&args)?;
        device.start()?;

        let status = device.wait_for_finish(self.timeout, POLL_INTERVAL)?;
        debug!(platform = device.platform_name(), status, "kernel finished");
        if status & STATUS_EMPTY_CLUSTER != 0 {
            let iteration = device.read(REG_RETURN0)? as usize;
            let centroid = device.read(REG_RETURN1)? as usize;
            return Err(Error::EmptyCluster { iteration, centroid });
        }
        if status & STATUS_FAULT != 0 || status & STATUS_DONE == 0 {
            let code = device.read(REG_RETURN0)?;
            if status & STATUS_FAULT != 0 && code == FAULT_OVERFLOW {
                let iteration = device.read(REG_RETURN1)? as usize;
                return Err(Error::Overflow { iteration });
            }
            warn!(platform = device.platform_name(), status, code, "kernel faulted");
            return Err(Error::unavailable(BACKEND, format!("kernel stopped with status {:#x}, code {}", status, code)));
        }

        let iterations = device.read(REG_RETURN0)? as usize;
        if iterations > iteration_limit {
            return Err(Error::encoding("kernel result",
                format!("kernel reports {} iterations for a limit of {}", iterations, iteration_limit)));
        }
        let termination = match device.read(REG_RETURN1)? {
            0 => Termination::LimitReached,
            _ => Termination::Converged,
        };
        let centroids = device.read_results(k, dims)?;
        Ok(RunOutcome { centroids, iterations, termination })
    }
}
