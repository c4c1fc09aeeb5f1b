//! Process supervision layer.
//!
//! The supervisor binds the listening socket and pre-forks worker
//! processes that inherit it; each worker runs the accept loop with a
//! bounded connection pool and watches the supervisor for liveness.

pub mod process;
pub mod socket;
pub mod supervisor;
pub mod tls;
pub mod worker;
