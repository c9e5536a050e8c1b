//! Linear algebra module.
//!
//! Contains the low level kernels of the factorization pipeline. Every kernel writes into a
//! caller-provided destination matrix, so a run can allocate all of its storage up front and fail
//! before any computation starts if that allocation is not possible.

pub mod cholesky;
pub mod reductions;
