//! # mikro-ui
//!
//! Framework-neutral UI state for Mikrocloud front ends.
//!
//! - [`Subject`] - a value with change notification and store semantics
//! - [`ScrollStore`] - "page is scrolled" flag fed by a [`ScrollSource`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod observable;
pub mod scroll;

pub use observable::{Subject, Subscription};
pub use scroll::{
    ManualScrollSource, SCROLL_THRESHOLD, ScrollSink, ScrollSource, ScrollStore, is_scrolled,
};
