//! Live rendering surface contract.
//!
//! A surface is a platform component (an embedded web view, say) that can
//! display a styled document and print what it shows to PDF. It is
//! optional: callers without one pass `None` to the exporter and the static
//! writer is used instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::document::StyledDocument;
use crate::error::Result;
use crate::page::PageLayoutConfig;

/// Print settings handed to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    /// Print backgrounds and borders, not just text.
    pub print_backgrounds: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            print_backgrounds: true,
        }
    }
}

/// A display surface that can render styled documents and print them.
///
/// Surfaces are owned by the UI thread; the exporter borrows one for the
/// duration of an export and never moves it to another thread.
pub trait RenderSurface {
    /// Whether printing to PDF is available right now. A surface whose print
    /// support has not been initialised returns `false`.
    fn can_print(&self) -> bool;

    /// Replace the displayed document.
    fn load(&mut self, document: &StyledDocument) -> Result<()>;

    /// Whether the last loaded document has finished loading and settled.
    fn is_ready(&self) -> bool;

    /// Print the displayed document.
    fn print_to_pdf(&mut self, page: &PageLayoutConfig, options: &PrintOptions) -> Result<Vec<u8>>;
}

/// Bounded polling for surface readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl ReadinessPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Longest time the poll can wait.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for ReadinessPolicy {
    /// 50 ms × 120 attempts, about six seconds.
    fn default() -> Self {
        Self::new(Duration::from_millis(50), 120)
    }
}

/// Cooperative cancellation flag shared between the caller and an export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
