//! Collectives over a joined bootstrap session.
//!
//! The ring all-gather runs over the two persistent ring connections; the
//! barrier and the intra-node all-gather are built on point-to-point
//! messages through each rank's public listener.

pub(crate) mod allgather;
pub(crate) mod barrier;
pub(crate) mod helpers;
pub(crate) mod intranode;

pub use barrier::dissemination_schedule;
