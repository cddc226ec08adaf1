//! # Mapmod
//!
//! Resilient browser automation for suggesting edits to map listings.
//!
//! Mapmod drives a mapping service's public UI - a surface it does not
//! control, with obfuscated class names, iframes and asynchronous panels -
//! to find a place listing and submit a name or address edit. The engine is
//! built around graceful degradation: ranked selector candidates, a
//! label-proximity fallback, a generic interactive-role scan, bounded
//! polling at every stage, and a suppression protocol that keeps bot clicks
//! out of the manual-click capture log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapmod::{Browser, EditFlow, EditRequest, EngineConfig, SessionProfile};
//!
//! #[tokio::main]
//! async fn main() -> mapmod::Result<()> {
//!     let config = EngineConfig::default();
//!     let profile = SessionProfile::persistent(".");
//!
//!     let browser = Browser::launch(config, &profile).await?;
//!     let page = browser.new_page("https://www.google.com/maps").await?;
//!
//!     let flow = EditFlow::new(page);
//!     let request = EditRequest::new("Test Cafe").with_name("New Name");
//!     let report = flow.run(&request).await;
//!
//!     println!("succeeded: {}", report.succeeded());
//!     browser.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## What it will not do
//!
//! Whether the remote service accepts an edit is out of this crate's hands;
//! the engine only guarantees that it attempts the documented interaction
//! sequence and reports what it did. Stages that cannot verify their effect
//! return [`StageOutcome::Assumed`] rather than pretending to be clean
//! successes.

pub mod browser;
pub mod cdp;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod observer;
pub mod page;
pub mod profile;
pub mod resolve;
pub mod stealth;

// Re-exports
pub use browser::Browser;
pub use dispatch::ClickDispatcher;
pub use error::{Error, Result};
pub use flow::{EditFlow, EditReport, EditRequest, StageOutcome};
pub use observer::{ClickObserver, ClickRecord};
pub use page::Page;
pub use profile::SessionProfile;
pub use resolve::{
    DocumentHandle, FrameEvaluator, ResolvedTarget, SelectorCandidate, Strategy, TargetResolver,
};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Headless mode (sign-in usually needs a visible window)
    pub headless: bool,
    /// Path to Chrome/Chromium binary (None = auto-discover)
    pub chrome_path: Option<String>,
    /// Custom user agent (None = random realistic)
    pub user_agent: Option<String>,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Where a run starts
    pub start_url: String,
    /// Settle delay after every bot click, in milliseconds
    pub click_delay_ms: u64,
    /// Settle period after submitting the search query
    pub search_settle_ms: u64,
    /// Info-panel poll ceiling
    pub panel_attempts: u32,
    /// Info-panel poll interval
    pub panel_interval_ms: u64,
    /// Place-name input poll ceiling
    pub field_attempts: u32,
    /// Place-name input poll interval
    pub field_interval_ms: u64,
    /// Confirmation-dialog poll ceiling
    pub confirm_attempts: u32,
    /// Confirmation-dialog poll interval
    pub confirm_interval_ms: u64,
    /// Passive wait when the edit menu cannot be opened automatically
    pub manual_wait_ms: u64,
    /// Dismiss the post-submit confirmation dialog when present
    pub confirm_after_submit: bool,
    /// Record genuine manual clicks for selector discovery
    pub capture_clicks: bool,
    /// Where click captures are persisted
    pub capture_dir: String,
    /// Where debug artifacts land (None = current directory)
    pub debug_dir: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            user_agent: None,
            viewport_width: 1920,
            viewport_height: 1080,
            start_url: "https://www.google.com/maps".to_string(),
            click_delay_ms: 500,
            search_settle_ms: 5000,
            panel_attempts: 3,
            panel_interval_ms: 1000,
            field_attempts: 20,
            field_interval_ms: 1000,
            confirm_attempts: 6,
            confirm_interval_ms: 500,
            manual_wait_ms: 45_000,
            confirm_after_submit: true,
            capture_clicks: false,
            capture_dir: "captured_clicks".to_string(),
            debug_dir: None,
        }
    }
}

impl EngineConfig {
    /// Fast config for tests: no settle delays, single-attempt polls
    pub fn fast() -> Self {
        Self {
            click_delay_ms: 0,
            search_settle_ms: 100,
            panel_attempts: 1,
            panel_interval_ms: 50,
            field_attempts: 2,
            field_interval_ms: 50,
            confirm_attempts: 2,
            confirm_interval_ms: 50,
            manual_wait_ms: 100,
            headless: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_ceilings() {
        let config = EngineConfig::default();
        assert_eq!(config.click_delay_ms, 500);
        assert_eq!(config.panel_attempts, 3);
        assert_eq!(config.field_attempts, 20);
        assert_eq!(config.confirm_attempts, 6);
        assert!(config.confirm_after_submit);
        assert!(!config.headless);
    }
}
