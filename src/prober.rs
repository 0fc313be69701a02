//! Prober Layer
//!
//! A prober performs exactly one ICMP echo round-trip and classifies the
//! result. The monitor only depends on the [`Prober`] trait, so tests can
//! substitute scripted probers for the real network.
//!
//! - [`Prober`]: Core trait for one echo request/reply attempt
//! - [`ProbeOutcome`]: Success, timeout or classified error
//! - [`IcmpProber`]: `surge-ping` backed implementation

mod icmp;
mod traits;

pub use icmp::{IcmpProber, resolve_host};
pub use traits::{ProbeError, ProbeOutcome, ProbeRequest, Prober};
