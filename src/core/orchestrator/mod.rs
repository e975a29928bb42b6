//! Load-balancing executor
//!
//! ## Module Structure
//!
//! - `load_balancer` - Pool, default criteria and outstanding-request tracking
//! - `execute_impl` - Select, execute, fall back
//! - `statistics` - Request counters and load distribution

mod execute_impl;
pub mod load_balancer;
pub mod statistics;

#[cfg(test)]
mod tests;

pub use execute_impl::MAX_ITERATIONS;
pub use load_balancer::{ExecutionResult, LoadBalancer};
pub use statistics::LoadBalancingStatistics;
