//! Reference host-memory engine for `nax-rs`.
//!
//! Every primitive is evaluated eagerly over row-major `Arc` buffers. The engine favours
//! readability over speed and serves as the ground truth for engine conformance tests.

pub mod cpu;

pub use cpu::{CpuArray, CpuBackend, TensorData};
