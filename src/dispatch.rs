//! Coordinate click dispatch and the suppression protocol
//!
//! Every bot-issued pointer action is bracketed by the suppression flag so
//! the manual-click observer never mistakes it for a human click. The flag
//! is mirrored into every reachable document before the click and cleared
//! in all of them afterwards - the clear runs even when the click itself
//! fails, which is also why this layer never surfaces errors: one failed
//! click must not abort a multi-stage retry loop.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::page::Page;
use crate::resolve::{DocumentHandle, FrameEvaluator, ResolvedTarget};

/// Per-document window global checked by the click observer
pub(crate) const SUPPRESS_FLAG: &str = "__mapmodBotClick";

/// Dispatches pointer clicks under the suppression protocol
pub struct ClickDispatcher {
    page: Page,
    settle: Duration,
    /// Last flag state successfully mirrored into each document
    mirrored: Mutex<HashMap<DocumentHandle, bool>>,
}

impl ClickDispatcher {
    pub fn new(page: Page, settle_ms: u64) -> Self {
        Self {
            page,
            settle: Duration::from_millis(settle_ms),
            mirrored: Mutex::new(HashMap::new()),
        }
    }

    /// Click a resolved target. Best-effort: never fails observably.
    pub async fn click(&self, target: &ResolvedTarget) {
        tracing::info!("clicking {}", target);
        self.click_at(target.x, target.y).await;
    }

    /// Click at top-level viewport coordinates under suppression
    pub async fn click_at(&self, x: f64, y: f64) {
        self.set_suppression(true).await;

        if let Err(e) = self.page.click_at(x, y).await {
            tracing::warn!("click at ({:.0}, {:.0}) failed: {}", x, y, e);
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        // Unconditional release - the observer must never stay deaf
        self.set_suppression(false).await;
    }

    /// Mirror the suppression flag into every reachable document, recording
    /// per-document state in the registry
    async fn set_suppression(&self, value: bool) {
        let statement = format!("() => {{ window.{} = {}; }}", SUPPRESS_FLAG, value);
        let applied = FrameEvaluator::new(&self.page).broadcast(&statement).await;

        let mut mirrored = self.mirrored.lock().unwrap();
        for (document, ok) in applied {
            if ok {
                mirrored.insert(document, value);
            } else {
                // Unreachable document (cross-origin, detached): its mirror
                // state is unknown, so drop it from the registry
                mirrored.remove(&document);
                tracing::debug!("could not mirror suppression={} into {}", value, document);
            }
        }
    }

    /// Whether any document is currently known to have the flag set
    pub fn suppressing(&self) -> bool {
        self.mirrored.lock().unwrap().values().any(|&v| v)
    }

    /// Registry snapshot (diagnostic)
    pub fn mirror_states(&self) -> Vec<(DocumentHandle, bool)> {
        let mut states: Vec<_> = self
            .mirrored
            .lock()
            .unwrap()
            .iter()
            .map(|(&d, &v)| (d, v))
            .collect();
        states.sort_by_key(|(d, _)| match d {
            DocumentHandle::Main => 0,
            DocumentHandle::Frame { index } => index + 1,
        });
        states
    }
}
