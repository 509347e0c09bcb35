use super::registers::*;
use crate::{CentroidState, Error, Result};
use arrow_array::RecordBatch;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const BACKEND: &str = "accelerated";

/// Low-level access to an accelerator: memory-mapped registers plus a queue for the input data.
///
/// Implementations only move words and buffers around. All register-level sequencing lives in
/// [`Device`], which is what backends talk to.
pub trait Platform: Send {
    fn name(&self) -> &'static str;

    /// Bring the platform up. Called exactly once by [`Device::acquire`].
    fn init(&mut self) -> Result<()>;

    /// Number of memory-mapped registers.
    fn register_count(&self) -> usize;

    fn write_mmio(&mut self, reg: usize, value: u32) -> Result<()>;

    fn read_mmio(&mut self, reg: usize) -> Result<u32>;

    /// Make a record batch available to the kernel.
    fn queue_record_batch(&mut self, batch: RecordBatch) -> Result<()>;

    /// Stop any running kernel and free every resource held by the platform.
    /// Must be safe to call in any state, also after a failed [`Platform::init`].
    fn release(&mut self);
}

/// Scoped handle on an initialized [`Platform`].
///
/// The platform is released when the handle is dropped, no matter whether the run succeeded,
/// failed or timed out.
pub struct Device {
    platform: Box<dyn Platform>,
}
impl Device {
    /// Initialize **platform** and take ownership of it.
    pub fn acquire(mut platform: Box<dyn Platform>) -> Result<Self> {
        if let Err(err) = platform.init() {
            platform.release();
            if matches!(err, Error::BackendUnavailable { .. }) {
                return Err(err);
            }
            return Err(Error::unavailable(BACKEND, format!("platform `{}` failed to initialize: {}", platform.name(), err)));
        }
        debug!(platform = platform.name(), registers = platform.register_count(), "device acquired");
        Ok(Self { platform })
    }

    pub fn platform_name(&self) -> &'static str { self.platform.name() }

    pub fn register_count(&self) -> usize { self.platform.register_count() }

    pub fn read(&mut self, reg: usize) -> Result<u32> { self.platform.read_mmio(reg) }

    pub fn write(&mut self, reg: usize, value: u32) -> Result<()> { self.platform.write_mmio(reg, value) }

    /// Pulse the reset bit of the control register.
    pub fn reset(&mut self) -> Result<()> {
        self.write(REG_CONTROL, CONTROL_RESET)?;
        self.write(REG_CONTROL, 0)
    }

    pub fn queue_record_batch(&mut self, batch: RecordBatch) -> Result<()> {
        self.platform.queue_record_batch(batch)
    }

    /// Restrict the kernel to rows `first..last` of the queued batch.
    pub fn set_range(&mut self, first: usize, last: usize) -> Result<()> {
        self.write(REG_FIRST_IDX, row_word(first)?)?;
        self.write(REG_LAST_IDX, row_word(last)?)
    }

    /// Write **args** into the argument bank.
    pub fn set_arguments(&mut self, args: &[u32]) -> Result<()> {
        if REG_ARGS_OFFSET + args.len() > self.register_count() {
            return Err(Error::unavailable(BACKEND, format!(
                "{} argument words exceed the register bank of {}", args.len(), self.register_count())));
        }
        for (i, &word) in args.iter().enumerate() {
            self.write(REG_ARGS_OFFSET + i, word)?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.write(REG_CONTROL, CONTROL_START)?;
        self.write(REG_CONTROL, 0)
    }

    /// Poll the status register until the kernel left the busy state.
    ///
    /// ## Returns
    /// The final status word, or [`Error::BackendUnavailable`] if the kernel is still busy after **timeout**.
    pub fn wait_for_finish(&mut self, timeout: Duration, poll_interval: Duration) -> Result<u32> {
        let started = Instant::now();
        loop {
            let status = self.read(REG_STATUS)?;
            if status & STATUS_BUSY == 0 {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                warn!(platform = self.platform_name(), ?timeout, "kernel did not finish in time");
                self.write(REG_CONTROL, CONTROL_STOP)?;
                return Err(Error::unavailable(BACKEND, format!("kernel still busy after {:?}", timeout)));
            }
            std::thread::sleep(poll_interval);
        }
    }

    /// Read **count** consecutive registers starting at **offset**.
    pub fn read_registers(&mut self, offset: usize, count: usize) -> Result<Vec<u32>> {
        (offset..offset + count).map(|reg| self.read(reg)).collect()
    }

    /// Read **k** centroids of **dims** coordinates back from the argument bank.
    pub fn read_results(&mut self, k: usize, dims: usize) -> Result<CentroidState<i64>> {
        let words = self.read_registers(REG_ARGS_OFFSET, k * dims * REGS_PER_DIM)?;
        unpack_centroids(&words, k, dims)
    }
}
impl Drop for Device {
    fn drop(&mut self) {
        debug!(platform = self.platform.name(), "device released");
        self.platform.release();
    }
}
