//! # Scheduler
//!
//! Fixed-rate publish cycles.
//!
//! Responsibilities:
//! - Fire a callback once per period, first fire one period after `start`
//! - Never overlap cycles; stop after the in-flight cycle completes
//! - Run capture → convert → publish on each fire (`CaptureCycle`)
//!
//! ## Usage
//!
//! ```ignore
//! use scheduler::{CaptureCycle, PublishScheduler};
//!
//! let cycle = Arc::new(CaptureCycle::new(target, capturer, converter, color, depth)?);
//! let scheduler = PublishScheduler::new(blueprint.camera.publish_rate)?;
//! scheduler.start_cycle(cycle);
//! // ...
//! scheduler.stop().await;
//! ```

mod cycle;
mod schedule;

pub use cycle::CaptureCycle;
pub use schedule::PublishScheduler;
