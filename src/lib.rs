//! ElmorLabs PMD-USB power monitor.
//!
//! The PMD-USB measures voltage and current on four power delivery rails
//! (PCIE1, PCIE2, EPS1, EPS2) and answers a single-byte command protocol
//! over USB serial with fixed-length binary frames. This crate polls the
//! device on a fixed cadence, decodes each values frame into typed
//! readings, keeps a bounded in-memory window of recent samples, and feeds
//! immutable snapshots to the bundled terminal chart and CSV log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use pmdmon::config::DeviceConfig;
//! use pmdmon::{PmdUsb, PollLoop, SampleWindow};
//!
//! # fn main() -> pmdmon::Result<()> {
//! let mut session = PmdUsb::open(&DeviceConfig::default())?;
//! session.verify_identity()?;
//!
//! let mut window = SampleWindow::new(1000);
//! let stop = Arc::new(AtomicBool::new(false));
//! let poll = PollLoop::new(Duration::from_millis(100), stop);
//! poll.run(&mut session, &mut window, |snapshot| {
//!     if let Some(sample) = snapshot.last() {
//!         println!("{:?}", sample.readings);
//!     }
//! });
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod errors;
pub mod export;
pub mod logging;
pub mod mock_serial;
pub mod poll;
pub mod protocol;
pub mod tui;
pub mod types;
pub mod window;

pub use device::PmdUsb;
pub use errors::{DriverError, Result};
pub use poll::PollLoop;
pub use types::{Metric, Rail, Reading, Sample};
pub use window::SampleWindow;
