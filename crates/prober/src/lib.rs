//! Browser-driven key probing against the verification portal.
//!
//! One visible Chrome session per run: the operator logs in by hand, then
//! each key is injected, submitted and classified in turn.

pub mod classify;
pub mod error;
pub mod probe;
pub mod session;

pub use classify::classify_page;
pub use error::SessionError;
pub use probe::{PortalProber, ProbeConfig};
pub use session::{ChromeSession, KeySession};
