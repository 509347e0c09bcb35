use super::platform::Platform;
use super::registers::*;
use crate::engine::ClusteringEngine;
use crate::variants::Reference;
use crate::{columnar, Error, KMeansConfig, PointStore, Result, RunOutcome, Termination};
use arrow_array::RecordBatch;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, trace, warn};

const BACKEND: &str = "accelerated";

/// Failure modes the simulated device can be told to exhibit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// [`Platform::init`] fails, as if no device was present.
    InitFailure,
    /// The kernel never leaves the busy state until it is stopped or released.
    Hang,
}

/// Parameters the kernel was generated for. Like real hardware, the simulated kernel has a fixed
/// number of centroids and coordinates per point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelShape {
    pub centroids: usize,
    pub dims: usize,
}
impl KernelShape {
    /// Registers needed: control block, packed centroids and the iteration limit.
    pub fn register_count(&self) -> usize {
        REG_ARGS_OFFSET + self.centroids * self.dims * REGS_PER_DIM + 1
    }
}

/// Software model of a k-means accelerator behind a 32-bit register file.
///
/// Starting the kernel spawns a worker thread that decodes the queued record batch and the
/// argument registers, runs the clustering with the reference arithmetic, and writes the resulting
/// centroids back into the argument bank.
///
/// Every launch gets its own cancel flag. Stopping, resetting or releasing the device sets it; the
/// kernel checks it between iterations and leaves the registers untouched once it is set. A worker
/// that is still running when the device is released is detached instead of joined.
pub struct SimulatedPlatform {
    shape: KernelShape,
    registers: Arc<Mutex<Vec<u32>>>,
    batch: Option<RecordBatch>,
    worker: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    fault: Option<Fault>,
    echo: bool,
}
impl SimulatedPlatform {
    pub fn new(shape: KernelShape) -> Self {
        Self {
            shape,
            registers: Arc::new(Mutex::new(vec![0; shape.register_count()])),
            batch: None,
            worker: None,
            cancel: Arc::new(AtomicBool::new(false)),
            fault: None,
            echo: false,
        }
    }

    pub fn with_fault(mut self, fault: Option<Fault>) -> Self {
        self.fault = fault; self
    }

    /// Log every register access.
    pub fn echo(mut self) -> Self {
        self.echo = true; self
    }

    fn regs(&self) -> Result<MutexGuard<'_, Vec<u32>>> {
        self.registers.lock().map_err(|_| Error::unavailable(BACKEND, "register file poisoned by a crashed kernel"))
    }

    fn check_reg(&self, reg: usize) -> Result<()> {
        if reg >= self.shape.register_count() {
            return Err(Error::unavailable(BACKEND, format!(
                "register {} outside of the bank of {}", reg, self.shape.register_count())));
        }
        Ok(())
    }

    fn stop_worker(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if !worker.is_finished() {
                trace!("detaching cancelled kernel");
            } else if worker.join().is_err() {
                warn!("simulated kernel panicked");
            }
        }
    }

    fn launch(&mut self) -> Result<()> {
        if self.regs()?[REG_STATUS] & STATUS_BUSY != 0 {
            return Ok(());
        }
        let batch = self.batch.clone()
            .ok_or_else(|| Error::unavailable(BACKEND, "kernel started without a queued record batch"))?;
        self.stop_worker();
        self.cancel = Arc::new(AtomicBool::new(false));
        self.regs()?[REG_STATUS] = STATUS_BUSY;

        let (registers, cancel, fault, shape) = (self.registers.clone(), self.cancel.clone(), self.fault, self.shape);
        let worker = std::thread::Builder::new()
            .name("simulated-kernel".into())
            .spawn(move || kernel(registers, batch, shape, cancel, fault))
            .map_err(|e| Error::unavailable(BACKEND, format!("could not start kernel: {}", e)))?;
        self.worker = Some(worker);
        Ok(())
    }
}

impl Platform for SimulatedPlatform {
    fn name(&self) -> &'static str {
        if self.echo { "echo" } else { "simulated" }
    }

    fn init(&mut self) -> Result<()> {
        if self.fault == Some(Fault::InitFailure) {
            return Err(Error::unavailable(BACKEND, "simulated platform reports no device"));
        }
        self.regs()?[REG_STATUS] = STATUS_IDLE;
        Ok(())
    }

    fn register_count(&self) -> usize { self.shape.register_count() }

    fn write_mmio(&mut self, reg: usize, value: u32) -> Result<()> {
        self.check_reg(reg)?;
        if self.echo {
            info!(reg, value = %format!("{:#010x}", value), "mmio write");
        } else {
            trace!(reg, value, "mmio write");
        }
        if reg == REG_CONTROL {
            if value & CONTROL_RESET != 0 {
                self.stop_worker();
                let mut regs = self.regs()?;
                regs.iter_mut().for_each(|r| *r = 0);
                regs[REG_STATUS] = STATUS_IDLE;
            }
            if value & CONTROL_STOP != 0 {
                self.cancel.store(true, Ordering::Release);
            }
            if value & CONTROL_START != 0 {
                self.launch()?;
            }
        }
        self.regs()?[reg] = value;
        Ok(())
    }

    fn read_mmio(&mut self, reg: usize) -> Result<u32> {
        self.check_reg(reg)?;
        let value = self.regs()?[reg];
        if self.echo {
            info!(reg, value = %format!("{:#010x}", value), "mmio read");
        } else {
            trace!(reg, value, "mmio read");
        }
        Ok(value)
    }

    fn queue_record_batch(&mut self, batch: RecordBatch) -> Result<()> {
        if self.echo {
            info!(rows = batch.num_rows(), "record batch queued");
        }
        self.batch = Some(batch);
        Ok(())
    }

    fn release(&mut self) {
        self.stop_worker();
        self.batch = None;
    }
}
impl Drop for SimulatedPlatform {
    fn drop(&mut self) {
        self.stop_worker();
    }
}


fn kernel(registers: Arc<Mutex<Vec<u32>>>, batch: RecordBatch, shape: KernelShape, cancel: Arc<AtomicBool>, fault: Option<Fault>) {
    if fault == Some(Fault::Hang) {
        while !cancel.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(1));
        }
        return;
    }

    let outcome = compute(&registers, &batch, shape, &cancel);
    let mut regs = match registers.lock() {
        Ok(regs) => regs,
        Err(_) => return,
    };
    // checked under the lock, a reset that already cleared the bank must not see late results
    if cancel.load(Ordering::Acquire) {
        return;
    }
    match outcome {
        Ok(outcome) => {
            let words = pack_centroids(&outcome.centroids);
            regs[REG_ARGS_OFFSET..REG_ARGS_OFFSET + words.len()].copy_from_slice(&words);
            regs[REG_RETURN0] = outcome.iterations as u32;
            regs[REG_RETURN1] = (outcome.termination == Termination::Converged) as u32;
            regs[REG_STATUS] = STATUS_DONE | STATUS_IDLE;
        }
        Err(Error::EmptyCluster { iteration, centroid }) => {
            regs[REG_RETURN0] = iteration as u32;
            regs[REG_RETURN1] = centroid as u32;
            regs[REG_STATUS] = STATUS_EMPTY_CLUSTER | STATUS_IDLE;
        }
        Err(Error::Overflow { iteration }) => {
            regs[REG_RETURN0] = FAULT_OVERFLOW;
            regs[REG_RETURN1] = iteration as u32;
            regs[REG_STATUS] = STATUS_FAULT | STATUS_IDLE;
        }
        Err(Error::Cancelled { .. }) => {}
        Err(err) => {
            warn!(%err, "simulated kernel rejected its inputs");
            regs[REG_RETURN0] = FAULT_BAD_INPUT;
            regs[REG_STATUS] = STATUS_FAULT | STATUS_IDLE;
        }
    }
}

fn compute(registers: &Mutex<Vec<u32>>, batch: &RecordBatch, shape: KernelShape, cancel: &AtomicBool)
        -> Result<RunOutcome<i64>> {
    let (first, last, args) = {
        let regs = registers.lock().map_err(|_| Error::unavailable(BACKEND, "register file poisoned"))?;
        (regs[REG_FIRST_IDX] as usize, regs[REG_LAST_IDX] as usize, regs[REG_ARGS_OFFSET..].to_vec())
    };
    if first > last || last > batch.num_rows() {
        return Err(Error::InvalidInput(format!("row range {}..{} outside of {} rows", first, last, batch.num_rows())));
    }
    let (centroids, iteration_limit) = decode_arguments(&args, shape.centroids, shape.dims)?;

    let points = if first == last {
        PointStore::new(Vec::new(), 0, shape.dims)?
    } else {
        let all = columnar::decode_points(batch)?;
        if all.dims() != shape.dims {
            return Err(Error::encoding("record batch", format!(
                "points have {} coordinates, kernel was generated for {}", all.dims(), shape.dims)));
        }
        PointStore::new(all.as_slice()[first * shape.dims..last * shape.dims].to_vec(), last - first, shape.dims)?
    };
    let config = KMeansConfig::build().cancel(cancel).build();
    ClusteringEngine::run(&Reference, &points, centroids, iteration_limit, &config)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::platform::Device;
    use crate::helpers::testing;

    const SHAPE: KernelShape = KernelShape { centroids: 2, dims: 2 };

    fn loaded_device(fault: Option<Fault>, limit: usize) -> Device {
        let points = testing::points(&[&[0, 0], &[0, 1], &[10, 10], &[10, 11]]);
        let centroids = testing::centroids(&[&[0, 0], &[10, 10]]);
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(SHAPE).with_fault(fault))).unwrap();
        device.reset().unwrap();
        device.queue_record_batch(columnar::encode_points(&points).unwrap()).unwrap();
        device.set_range(0, points.len()).unwrap();
        device.set_arguments(&encode_arguments(&centroids, limit).unwrap()).unwrap();
        device
    }

    #[test]
    fn register_count_covers_arguments() {
        assert_eq!(SHAPE.register_count(), 10 + 8 + 1);
    }

    #[test]
    fn kernel_writes_centroids_back() {
        let mut device = loaded_device(None, 10);
        device.start().unwrap();
        let status = device.wait_for_finish(Duration::from_secs(10), Duration::from_micros(50)).unwrap();
        assert_eq!(status, STATUS_DONE | STATUS_IDLE);
        assert_eq!(device.read(REG_RETURN0).unwrap(), 1);
        assert_eq!(device.read(REG_RETURN1).unwrap(), 1);
        assert_eq!(device.read_results(2, 2).unwrap().to_rows(), vec![vec![0, 0], vec![10, 10]]);
    }

    #[test]
    fn empty_cluster_is_reported_in_status() {
        let points = testing::points(&[&[1, 0], &[2, 0], &[3, 0]]);
        let centroids = testing::centroids(&[&[2, 0], &[1337, 0]]);
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(SHAPE))).unwrap();
        device.queue_record_batch(columnar::encode_points(&points).unwrap()).unwrap();
        device.set_range(0, 3).unwrap();
        device.set_arguments(&encode_arguments(&centroids, 5).unwrap()).unwrap();
        device.start().unwrap();
        let status = device.wait_for_finish(Duration::from_secs(10), Duration::from_micros(50)).unwrap();
        assert_eq!(status & STATUS_EMPTY_CLUSTER, STATUS_EMPTY_CLUSTER);
        assert_eq!(device.read(REG_RETURN0).unwrap(), 1);
        assert_eq!(device.read(REG_RETURN1).unwrap(), 1);
    }

    #[test]
    fn hanging_kernel_times_out_and_is_released() {
        let mut device = loaded_device(Some(Fault::Hang), 10);
        device.start().unwrap();
        let res = device.wait_for_finish(Duration::from_millis(20), Duration::from_millis(1));
        assert!(matches!(res, Err(Error::BackendUnavailable { .. })));
        // release cancels the worker, dropping must not block on it
        drop(device);
    }

    #[test]
    fn overflow_is_reported_as_fault() {
        let big = 1i64 << 40;
        let points = testing::points(&[&[big, big], &[-big, -big]]);
        let centroids = testing::centroids(&[&[big, big], &[-big, -big + 1]]);
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(SHAPE))).unwrap();
        device.queue_record_batch(columnar::encode_points(&points).unwrap()).unwrap();
        device.set_range(0, 2).unwrap();
        device.set_arguments(&encode_arguments(&centroids, 5).unwrap()).unwrap();
        device.start().unwrap();
        let status = device.wait_for_finish(Duration::from_secs(10), Duration::from_micros(50)).unwrap();
        assert_eq!(status, STATUS_FAULT | STATUS_IDLE);
        assert_eq!(device.read(REG_RETURN0).unwrap(), FAULT_OVERFLOW);
        assert_eq!(device.read(REG_RETURN1).unwrap(), 1);
    }

    #[test]
    fn stop_cancels_a_running_kernel() {
        let shape = KernelShape { centroids: 8, dims: 8 };
        let points = crate::datagen::uniform_points(200_000, 8, 1000, 3).unwrap();
        let centroids = crate::inits::first_k(&points, 8).unwrap();
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(shape))).unwrap();
        device.queue_record_batch(columnar::encode_points(&points).unwrap()).unwrap();
        device.set_range(0, points.len()).unwrap();
        device.set_arguments(&encode_arguments(&centroids, 1000).unwrap()).unwrap();
        device.start().unwrap();
        device.write(REG_CONTROL, CONTROL_STOP).unwrap();

        let started = std::time::Instant::now();
        drop(device);
        assert!(started.elapsed() < Duration::from_millis(500), "release took {:?}", started.elapsed());
    }

    #[test]
    fn init_failure_is_reported() {
        let platform = SimulatedPlatform::new(SHAPE).with_fault(Some(Fault::InitFailure));
        assert!(matches!(Device::acquire(Box::new(platform)), Err(Error::BackendUnavailable { .. })));
    }

    #[test]
    fn start_without_batch_fails() {
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(SHAPE))).unwrap();
        assert!(matches!(device.start(), Err(Error::BackendUnavailable { .. })));
    }

    #[test]
    fn out_of_bank_access_fails() {
        let mut device = Device::acquire(Box::new(SimulatedPlatform::new(SHAPE))).unwrap();
        assert!(device.read(SHAPE.register_count()).is_err());
        assert!(device.write(SHAPE.register_count(), 1).is_err());
    }

    #[test]
    fn echo_platform_is_named() {
        assert_eq!(SimulatedPlatform::new(SHAPE).echo().name(), "echo");
    }
}
