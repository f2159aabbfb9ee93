//! Retry module
//! - policy.rs: attempt limits, backoff shapes and the retry hook
//! - executor.rs: the retry loop
//! - aggregate.rs: attempt records and terminal errors

pub mod aggregate;
pub mod executor;
pub mod policy;

pub use aggregate::*;
pub use executor::*;
pub use policy::*;
