//! Word-level encoding of centroids and arguments for the 32-bit register interface.

use crate::{CentroidState, Error, Result};

/// Control register. Writing [`CONTROL_START`] launches the kernel, [`CONTROL_RESET`] resets it.
pub const REG_CONTROL: usize = 0;
/// Status register, one of the `STATUS_*` values.
pub const REG_STATUS: usize = 1;
/// Return words. On [`STATUS_DONE`]: executed iterations and a converged flag. On
/// [`STATUS_EMPTY_CLUSTER`]: the iteration and the centroid index. On [`STATUS_FAULT`]: a fault code.
pub const REG_RETURN0: usize = 2;
pub const REG_RETURN1: usize = 3;
/// First (inclusive) and last (exclusive) row of the record batch the kernel processes.
pub const REG_FIRST_IDX: usize = 4;
pub const REG_LAST_IDX: usize = 5;
/// Start of the argument bank. Centroids are written here and the kernel writes its results back
/// into the same registers, two per coordinate.
pub const REG_ARGS_OFFSET: usize = 10;
pub const REGS_PER_DIM: usize = 2;

pub const CONTROL_START: u32 = 1;
pub const CONTROL_STOP: u32 = 2;
pub const CONTROL_RESET: u32 = 4;

pub const STATUS_IDLE: u32 = 1;
pub const STATUS_BUSY: u32 = 2;
pub const STATUS_DONE: u32 = 4;
pub const STATUS_EMPTY_CLUSTER: u32 = 8;
pub const STATUS_FAULT: u32 = 16;

/// Fault code in [`REG_RETURN0`]: the kernel could not interpret its inputs.
pub const FAULT_BAD_INPUT: u32 = 1;
/// Fault code in [`REG_RETURN0`]: coordinate arithmetic overflowed, [`REG_RETURN1`] holds the iteration.
pub const FAULT_OVERFLOW: u32 = 2;

/// Split a signed 64-bit value into its low and high 32-bit words (two's complement).
#[inline]
pub fn pack(value: i64) -> (u32, u32) {
    let bits = value as u64;
    ((bits & 0xFFFF_FFFF) as u32, (bits >> 32) as u32)
}

/// Reassemble a value split by [`pack`]. Lossless for every `i64`.
#[inline]
pub fn unpack(lo: u32, hi: u32) -> i64 {
    (((hi as u64) << 32) | lo as u64) as i64
}

/// Centroids as `[lo, hi]` word pairs in row-major order.
pub fn pack_centroids(centroids: &CentroidState<i64>) -> Vec<u32> {
    centroids.centroids.iter()
        .flat_map(|&v| { let (lo, hi) = pack(v); [lo, hi] })
        .collect()
}

/// Inverse of [`pack_centroids`].
pub fn unpack_centroids(words: &[u32], k: usize, dims: usize) -> Result<CentroidState<i64>> {
    if words.len() != k * dims * REGS_PER_DIM {
        return Err(Error::encoding("register read-back",
            format!("{} words cannot hold {} centroids of {} dimensions", words.len(), k, dims)));
    }
    let values = words.chunks_exact(REGS_PER_DIM).map(|w| unpack(w[0], w[1])).collect();
    CentroidState::new(values, k, dims)
}

/// Full argument list: the packed centroids followed by the iteration limit as one final word.
pub fn encode_arguments(centroids: &CentroidState<i64>, iteration_limit: usize) -> Result<Vec<u32>> {
    let limit = u32::try_from(iteration_limit).map_err(|_| Error::encoding("kernel arguments",
        format!("iteration limit {} does not fit a 32-bit register", iteration_limit)))?;
    let mut args = pack_centroids(centroids);
    args.push(limit);
    Ok(args)
}

/// Split an argument list written by [`encode_arguments`] back into centroids and iteration limit.
pub fn decode_arguments(words: &[u32], k: usize, dims: usize) -> Result<(CentroidState<i64>, usize)> {
    let (limit, packed) = words.split_last()
        .ok_or_else(|| Error::encoding("kernel arguments", "argument bank is empty"))?;
    Ok((unpack_centroids(packed, k, dims)?, *limit as usize))
}

/// Convert a row index into a register word.
pub fn row_word(row: usize) -> Result<u32> {
    u32::try_from(row).map_err(|_| Error::encoding("row range", format!("row {} does not fit a 32-bit register", row)))
}
