//! Scroll-position store.
//!
//! Derives a single "page is scrolled" flag from scroll events. Events come
//! from an injected [`ScrollSource`]; the store itself never touches a
//! window or any other global.
//!
//! ```rust
//! use mikro_ui::scroll::{ManualScrollSource, ScrollStore};
//!
//! let source = ManualScrollSource::new();
//! let store = ScrollStore::attach(&source);
//! let _sub = store.subscribe(|scrolled| println!("scrolled: {scrolled}"));
//!
//! source.scroll_to(120.0);
//! assert!(store.current());
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::observable::{Subject, Subscription};

/// Vertical offset, in pixels, above which the page counts as scrolled.
pub const SCROLL_THRESHOLD: f64 = 20.0;

/// Whether `offset_y` is past [`SCROLL_THRESHOLD`].
#[must_use]
pub fn is_scrolled(offset_y: f64) -> bool {
    offset_y > SCROLL_THRESHOLD
}

/// Receiving end handed to a [`ScrollSource`].
///
/// Holds the store weakly, so a source outliving its store does not keep it
/// alive.
#[derive(Debug, Clone)]
pub struct ScrollSink {
    flag: Weak<Subject<bool>>,
}

impl ScrollSink {
    /// Report a new vertical offset. Returns `false` once the store is gone
    /// and the sink can be discarded.
    pub fn scrolled(&self, offset_y: f64) -> bool {
        let Some(flag) = self.flag.upgrade() else {
            return false;
        };
        let scrolled = is_scrolled(offset_y);
        if flag.set(scrolled) {
            trace!(offset_y, scrolled, "scroll flag changed");
        }
        true
    }
}

/// Producer of scroll events, e.g. a window or a terminal viewport.
pub trait ScrollSource {
    /// Start delivering events to `sink` until it reports the store gone.
    fn attach(&self, sink: ScrollSink);
}

/// Scroll source driven by hand. Used in tests and headless contexts.
#[derive(Debug, Clone, Default)]
pub struct ManualScrollSource {
    sinks: Arc<Mutex<Vec<ScrollSink>>>,
}

impl ManualScrollSource {
    /// Source with no attached stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a scroll event at `offset_y` to every attached store.
    pub fn scroll_to(&self, offset_y: f64) {
        let sinks: Vec<ScrollSink> = self.sinks.lock().clone();
        let mut any_dead = false;
        for sink in &sinks {
            any_dead |= !sink.scrolled(offset_y);
        }
        if any_dead {
            self.sinks.lock().retain(|s| s.flag.strong_count() > 0);
        }
    }

    /// Number of attached stores still alive.
    #[must_use]
    pub fn attached(&self) -> usize {
        self.sinks
            .lock()
            .iter()
            .filter(|s| s.flag.strong_count() > 0)
            .count()
    }
}

impl ScrollSource for ManualScrollSource {
    fn attach(&self, sink: ScrollSink) {
        self.sinks.lock().push(sink);
    }
}

/// Observable "page is scrolled" flag. Starts out `false`.
#[derive(Debug)]
pub struct ScrollStore {
    flag: Arc<Subject<bool>>,
}

impl ScrollStore {
    /// Store with no event source. Stays `false` until fed through
    /// [`ScrollStore::handle_scroll`].
    #[must_use]
    pub fn detached() -> Self {
        Self {
            flag: Arc::new(Subject::new(false)),
        }
    }

    /// Store fed by `source`.
    pub fn attach(source: &impl ScrollSource) -> Self {
        let store = Self::detached();
        source.attach(store.sink());
        store
    }

    /// A sink feeding this store, for custom sources.
    #[must_use]
    pub fn sink(&self) -> ScrollSink {
        ScrollSink {
            flag: Arc::downgrade(&self.flag),
        }
    }

    /// Feed one scroll event directly.
    pub fn handle_scroll(&self, offset_y: f64) {
        self.sink().scrolled(offset_y);
    }

    /// Whether the last event was past the threshold.
    #[must_use]
    pub fn current(&self) -> bool {
        self.flag.get()
    }

    /// Call `callback` now with the current flag and again on every change.
    pub fn subscribe(&self, callback: impl Fn(bool) + Send + Sync + 'static) -> Subscription {
        self.flag.subscribe(move |scrolled: &bool| callback(*scrolled))
    }
}

impl Default for ScrollStore {
    fn default() -> Self {
        Self::detached()
    }
}
