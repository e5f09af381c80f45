//! Registry Reachability Prober
//!
//! Bounded-time liveness checks against devfile registry URLs.
//!
//! A probe issues a single `HEAD` request and treats any HTTP response as
//! proof that the listener is up. It never retries: callers decide whether
//! and when to probe again.
//!
//! # Example
//!
//! ```no_run
//! use registry_probe::{HttpProber, Prober};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let prober = HttpProber::new()?;
//! prober
//!     .probe("https://registry.devfile.io", Duration::from_secs(10), true)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod prober;
#[cfg(feature = "test-util")]
pub mod mock;

pub use error::ProbeError;
pub use prober::{HttpProber, Prober, validate_url};
#[cfg(feature = "test-util")]
pub use mock::MockProber;
