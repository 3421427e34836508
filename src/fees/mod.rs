//! Fee Model
//!
//! Turns fee-market quotes supplied by a provider into a [`Fee`](crate::types::Fee)
//! for a chosen tier. No I/O happens here.

mod estimator;

pub use estimator::*;
