//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Injectable clocks and frame pacing for timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Clock and frame pacing helpers for the R-EMS playback loops.

pub mod clock;
pub mod scheduling;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduling::{FrameTicker, RateLimiter, SteppedTicker};
