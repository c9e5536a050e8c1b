/// Fork-join helpers dispatching on [`Parallelism`](crate::Parallelism).
pub mod thread;
