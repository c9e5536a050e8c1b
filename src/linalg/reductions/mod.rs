//! Reductions over slices, each available with every [`Parallelism`](crate::Parallelism)
//! strategy.

pub mod argmax;
