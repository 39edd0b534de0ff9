//! Synchronizer integration tests.
//!
//! These drive the coordinator end to end against a scriptable client on a
//! paused tokio clock.

pub(crate) mod harness;

mod refetch;
