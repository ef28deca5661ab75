//! Test support utilities for imagewatch.
//!
//! Provides deterministic doubles for every core port, a session event
//! recorder, and document and file fixture builders.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use imagewatch_core::{ProbeSignal, Tracker};
//! use imagewatch_test_support::{ManualLoader, MockDocument, PageBuilder, VirtualScheduler};
//!
//! let document = Rc::new(MockDocument::new());
//! let gallery = PageBuilder::gallery(&document, &["a.png", "b.png"]);
//! let loader = Rc::new(ManualLoader::new());
//! let scheduler = Rc::new(VirtualScheduler::new());
//!
//! let tracker = Tracker::new(document.clone(), loader.clone(), scheduler.clone());
//! let session = tracker.track(gallery.container);
//!
//! scheduler.run_ready();
//! loader.settle_all(ProbeSignal::Load);
//! scheduler.run_ready();
//! assert!(session.is_done());
//! ```

mod builders;
mod mocks;
mod recorder;

pub use builders::{FixtureFiles, Gallery, PageBuilder};
pub use mocks::{ManualLoader, MockDocument, VirtualScheduler};
pub use recorder::{Recorder, SessionEvent};
