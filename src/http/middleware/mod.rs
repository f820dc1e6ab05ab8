//! Cross-cutting request middleware.
//!
//! # Ordering (outermost first)
//! ```text
//! request_id (http/request.rs)       assigns ID, opens request span
//!   → access_log                      logs final status
//!   → metrics                         counts final status, pushes sample
//!   → cors                            answers preflight requests
//!   → timeout / body limit            protocol errors (408, 413)
//!   → faults                          turns faults into the uniform 500
//!   → handler
//! ```

pub mod access_log;
pub mod faults;
pub mod metrics;

pub use access_log::access_log_middleware;
pub use faults::fault_middleware;
pub use metrics::metrics_middleware;
