//! The interaction state machine
//!
//! Drives the end-to-end edit sequence: search, panel wait, edit menu, menu
//! entry, field fill, submit, confirmation. Stages run strictly in order
//! with bounded polls and tiered fallbacks; an individual miss degrades to
//! the next tier, and only exhausting every tier for a mandatory input
//! produces a failure. Resolve and click primitives never throw past their
//! own boundary, so one flaky DOM read cannot abort the run.

use crate::dispatch::ClickDispatcher;
use crate::page::Page;
use crate::resolve::{descriptors, FrameEvaluator, ResolvedTarget, TargetResolver};
use crate::EngineConfig;

/// Search-box discovery is a short poll; the blind-typing fallback follows
const SEARCH_ATTEMPTS: u32 = 3;
const SEARCH_INTERVAL_MS: u64 = 500;
/// Dialog/menu transitions get a fixed settle period
const MENU_SETTLE_MS: u64 = 2000;
/// Blind keyboard fallback for the edit control
const TAB_PRESSES: u32 = 5;
/// Address-input poll after its menu entry is clicked
const ADDRESS_ATTEMPTS: u32 = 5;

/// The caller's intent: one place, at least one changed field
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Location search query
    pub query: String,
    /// Replacement place name
    pub new_name: Option<String>,
    /// Replacement address
    pub new_address: Option<String>,
}

impl EditRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            new_name: None,
            new_address: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.new_name = Some(name.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.new_address = Some(address.into());
        self
    }

    /// A request with nothing to change is not runnable
    pub fn has_edit(&self) -> bool {
        self.new_name.is_some() || self.new_address.is_some()
    }
}

/// How a stage (or an edit path) ended
///
/// `Assumed` is the degraded/optimistic case: the stage could not verify its
/// effect (blind click, Enter surrogate, manual-intervention window) but the
/// sequence continues. It counts as success - the tool is meant for
/// supervised use - while staying distinguishable from `Completed` in logs
/// and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage verified its target and acted on it
    Completed,
    /// Optimistic success; the reason says what was skipped or unverified
    Assumed { reason: String },
    /// Every tier exhausted for a mandatory target
    Failed { reason: String },
}

impl StageOutcome {
    pub fn assumed(reason: impl Into<String>) -> Self {
        Self::Assumed {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Completed and Assumed both count as success
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Per-edit-type outcomes for one run
#[derive(Debug, Clone, Default)]
pub struct EditReport {
    pub name: Option<StageOutcome>,
    pub address: Option<StageOutcome>,
}

impl EditReport {
    /// True when at least one edit was attempted and none failed
    pub fn succeeded(&self) -> bool {
        let attempted = self.name.is_some() || self.address.is_some();
        attempted
            && self.name.iter().all(StageOutcome::is_success)
            && self.address.iter().all(StageOutcome::is_success)
    }
}

/// Orchestrates one edit session on an open page
pub struct EditFlow {
    page: Page,
    dispatcher: ClickDispatcher,
}

impl EditFlow {
    pub fn new(page: Page) -> Self {
        let settle = page.config().click_delay_ms;
        Self {
            dispatcher: ClickDispatcher::new(page.clone(), settle),
            page,
        }
    }

    fn config(&self) -> &EngineConfig {
        self.page.config()
    }

    fn resolver(&self) -> TargetResolver<'_> {
        TargetResolver::new(&self.page)
    }

    /// The dispatcher used for every bot click (exposed for diagnostics)
    pub fn dispatcher(&self) -> &ClickDispatcher {
        &self.dispatcher
    }

    /// Run the full sequence for one request
    pub async fn run(&self, request: &EditRequest) -> EditReport {
        let mut report = EditReport::default();

        let search = self.search_location(&request.query).await;
        tracing::info!("search stage: {:?}", search);

        self.wait_for_panel().await;

        let menu = self.open_edit_menu().await;
        tracing::info!("edit-menu stage: {:?}", menu);

        if let Some(new_name) = &request.new_name {
            report.name = Some(self.submit_name_change(&request.query, new_name).await);
        }

        if let Some(new_address) = &request.new_address {
            if report.name.is_some() {
                // Let the previous edit's dialogs clear
                self.page.wait(MENU_SETTLE_MS).await;
            }
            report.address = Some(self.submit_address_change(new_address).await);
        }

        report
    }

    // =========================================================================
    // Stage 1: Searching
    // =========================================================================

    /// Locate the search box and submit the query; falls back to typing into
    /// keyboard focus when no box resolves
    pub async fn search_location(&self, query: &str) -> StageOutcome {
        tracing::info!("searching for: {}", query);

        let mut target = None;
        for attempt in 1..=SEARCH_ATTEMPTS {
            target = self
                .resolver()
                .resolve_candidates(&descriptors::search_input())
                .await;
            if target.is_some() {
                break;
            }
            tracing::debug!("search box not found (attempt {})", attempt);
            self.page.wait(SEARCH_INTERVAL_MS).await;
        }

        let outcome = match target {
            Some(target) => {
                self.dispatcher.click(&target).await;
                let _ = self.page.select_all().await;
                if let Err(e) = self.page.type_text(query).await {
                    tracing::warn!("typing query failed: {}", e);
                }
                StageOutcome::Completed
            }
            None => {
                tracing::warn!("search box not found; typing into keyboard focus");
                if let Err(e) = self.page.type_text(query).await {
                    tracing::warn!("typing query failed: {}", e);
                }
                StageOutcome::assumed("search box not found; typed into keyboard focus")
            }
        };

        if let Err(e) = self.page.press_key("Enter").await {
            tracing::warn!("Enter after search failed: {}", e);
        }
        self.page.wait(self.config().search_settle_ms).await;

        outcome
    }

    // =========================================================================
    // Stage 2: PanelOpen
    // =========================================================================

    /// Poll for the info panel. Exhaustion is a warning, never a failure -
    /// panel selectors produce false negatives routinely.
    pub async fn wait_for_panel(&self) -> bool {
        for attempt in 1..=self.config().panel_attempts {
            if let Some(panel) = self
                .resolver()
                .resolve_candidates(&descriptors::panel_container())
                .await
            {
                tracing::info!("info panel loaded (attempt {}): {}", attempt, panel.detail);
                return true;
            }
            self.page.wait(self.config().panel_interval_ms).await;
        }

        tracing::warn!("info panel not detected; continuing anyway");
        false
    }

    // =========================================================================
    // Stage 3: MenuOpen
    // =========================================================================

    /// Open the suggest-an-edit flow: ranked candidates, then a fixed-offset
    /// click inside the panel, then blind keyboard navigation, then a long
    /// manual-intervention window
    pub async fn open_edit_menu(&self) -> StageOutcome {
        tracing::info!("looking for the suggest-an-edit control");

        if let Some(target) = self
            .resolver()
            .resolve_candidates(&descriptors::edit_control())
            .await
        {
            self.dispatcher.click(&target).await;
            return StageOutcome::Completed;
        }

        // Fallback (a): click a fixed offset inside the panel's box
        if let Some((x, y)) = self.panel_offset_point().await {
            tracing::info!("edit control not resolved; clicking inside the panel area");
            self.dispatcher.click_at(x, y).await;
            return StageOutcome::assumed("clicked a fixed offset inside the info panel");
        }

        // Fallback (b): blind keyboard navigation
        tracing::info!("panel not resolved either; trying keyboard navigation");
        let mut keys_ok = true;
        for _ in 0..TAB_PRESSES {
            if self.page.press_key("Tab").await.is_err() {
                keys_ok = false;
                break;
            }
            self.page.wait(300).await;
        }
        if keys_ok && self.page.press_key("Enter").await.is_ok() {
            return StageOutcome::assumed("keyboard Tab navigation; target unverified");
        }

        // Total exhaustion: leave evidence, give the operator a window
        let written = self.page.dump_debug_artifacts("edit_menu").await;
        tracing::warn!(
            "could not open the edit menu automatically; debug artifacts: {:?}",
            written
        );
        tracing::warn!(
            "waiting {}s for manual intervention",
            self.config().manual_wait_ms / 1000
        );
        self.page.wait(self.config().manual_wait_ms).await;

        StageOutcome::assumed("edit menu unresolved; manual intervention window elapsed")
    }

    /// Center-ish point just inside the panel's top-right corner
    async fn panel_offset_point(&self) -> Option<(f64, f64)> {
        let query = r#"() => {
            const panel = document.querySelector('[data-container-id], [role="complementary"]');
            if (!panel) return null;
            const r = panel.getBoundingClientRect();
            if (!(r.width > 0 && r.height > 0)) return null;
            return { x: r.x + r.width - 100, y: r.y + 100 };
        }"#;
        let (value, _) = FrameEvaluator::new(&self.page).evaluate(query).await?;
        Some((
            value.get("x")?.as_f64()?,
            value.get("y")?.as_f64()?,
        ))
    }

    // =========================================================================
    // Stages 4-6: name path
    // =========================================================================

    /// Pick the name menu entry, fill the place-name field, submit, confirm
    pub async fn submit_name_change(&self, hint: &str, new_name: &str) -> StageOutcome {
        tracing::info!("submitting name change to: {}", new_name);
        self.page.wait(MENU_SETTLE_MS).await;

        // Menu entry: hint containment beats multi-character beats anything
        match self.resolver().resolve_generic(Some(hint)).await {
            Some(entry) => {
                self.dispatcher.click(&entry).await;
                self.page.wait(MENU_SETTLE_MS).await;
            }
            None => tracing::warn!("no menu entry resolved; trying the field directly"),
        }

        // Poll for the place-name input: candidates plus label proximity
        for attempt in 1..=self.config().field_attempts {
            self.page.wait(self.config().field_interval_ms).await;

            let resolver = self.resolver();
            let found = match resolver
                .resolve_candidates(&descriptors::place_name_input())
                .await
            {
                Some(target) => Some(target),
                None => {
                    resolver
                        .resolve_by_label(descriptors::place_name_labels())
                        .await
                }
            };

            if let Some(target) = found {
                tracing::info!("place-name input found on attempt {}: {}", attempt, target);
                self.fill_field(&target, new_name).await;
                let submit = self.click_submit().await;
                if self.config().confirm_after_submit {
                    self.dismiss_confirmation().await;
                }
                return submit;
            }

            if attempt < self.config().field_attempts {
                tracing::debug!(
                    "still looking for the place-name input ({}/{})",
                    attempt,
                    self.config().field_attempts
                );
            }
        }

        // Poll exhausted: scan for any editable element that is not a search box
        tracing::warn!("place-name input not found; scanning editable elements");
        if let Some(target) = self.resolver().resolve_editable().await {
            tracing::info!("using fallback editable field: {}", target);
            self.fill_field(&target, new_name).await;
            let submit = self.click_submit().await;
            if self.config().confirm_after_submit {
                self.dismiss_confirmation().await;
            }
            return match submit {
                StageOutcome::Completed => {
                    StageOutcome::assumed("filled a fallback editable field")
                }
                other => other,
            };
        }

        // Total failure for a mandatory field
        match self.page.debug_screenshot("no_inputs").await {
            Ok(path) => tracing::warn!("no editable fields at all; screenshot: {}", path),
            Err(e) => tracing::debug!("debug screenshot failed: {}", e),
        }
        StageOutcome::failed("place-name input not found after exhausting every tier")
    }

    /// Click, select-all, type the replacement, pause
    async fn fill_field(&self, target: &ResolvedTarget, value: &str) {
        self.dispatcher.click(target).await;
        self.page.wait(500).await;
        if let Err(e) = self.page.select_all().await {
            tracing::debug!("select-all failed: {}", e);
        }
        self.page.wait(300).await;
        if let Err(e) = self.page.type_text(value).await {
            tracing::warn!("typing value failed: {}", e);
        }
        self.page.wait(1000).await;
    }

    /// Resolve and click the submit control; Enter is the surrogate of last
    /// resort and only earns an `Assumed`
    pub async fn click_submit(&self) -> StageOutcome {
        self.page.wait(MENU_SETTLE_MS).await;

        if let Some(target) = self
            .resolver()
            .resolve_submit(descriptors::submit_pool())
            .await
        {
            self.dispatcher.click(&target).await;
            tracing::info!("submitted");
            return StageOutcome::Completed;
        }

        tracing::warn!("submit control not found; pressing Enter");
        if self.page.press_key("Enter").await.is_ok() {
            self.page.wait(MENU_SETTLE_MS).await;
            StageOutcome::assumed("submit control not found; pressed Enter")
        } else {
            StageOutcome::assumed("submit control not found; Enter surrogate failed")
        }
    }

    /// Poll for a post-submit confirmation dialog and dismiss it. Absence is
    /// a normal outcome.
    pub async fn dismiss_confirmation(&self) -> bool {
        for _ in 1..=self.config().confirm_attempts {
            if let Some(target) = self
                .resolver()
                .resolve_confirmation(descriptors::confirmation_labels())
                .await
            {
                self.dispatcher.click(&target).await;
                tracing::info!("confirmation dismissed: {}", target.detail);
                return true;
            }
            self.page.wait(self.config().confirm_interval_ms).await;
        }
        tracing::debug!("no confirmation dialog appeared");
        false
    }

    // =========================================================================
    // Address path (mirrors stages 4-5, shorter descriptor list)
    // =========================================================================

    /// Pick the address menu entry or go straight to an address input
    pub async fn submit_address_change(&self, new_address: &str) -> StageOutcome {
        tracing::info!("submitting address change to: {}", new_address);
        self.page.wait(MENU_SETTLE_MS).await;

        let (entries, _) = self.resolver().interactive_entries().await;
        let menu_entry = entries.iter().find(|e| {
            e.text.to_lowercase().contains("address") || e.attrs.to_lowercase().contains("address")
        });

        let mut input = None;
        if let Some(entry) = menu_entry {
            tracing::info!("clicking address menu entry: {}", entry.text);
            self.dispatcher.click_at(entry.x, entry.y).await;
            self.page.wait(MENU_SETTLE_MS).await;

            for _ in 1..=ADDRESS_ATTEMPTS {
                let resolver = self.resolver();
                input = match resolver
                    .resolve_candidates(&descriptors::address_input())
                    .await
                {
                    Some(target) => Some(target),
                    None => resolver.resolve_by_label(descriptors::address_labels()).await,
                };
                if input.is_some() {
                    break;
                }
                self.page.wait(self.config().field_interval_ms).await;
            }
        } else {
            tracing::info!("no address menu entry; trying the input directly");
            input = self
                .resolver()
                .resolve_candidates(&descriptors::address_input())
                .await;
        }

        let Some(target) = input else {
            match self.page.debug_screenshot("no_address_input").await {
                Ok(path) => tracing::warn!("address input not found; screenshot: {}", path),
                Err(e) => tracing::debug!("debug screenshot failed: {}", e),
            }
            return StageOutcome::failed("address input not found");
        };

        tracing::info!("address input found: {}", target);
        self.fill_field(&target, new_address).await;

        let submit = self.click_submit().await;
        if self.config().confirm_after_submit {
            self.dismiss_confirmation().await;
        }
        submit
    }

    // =========================================================================
    // Sign-in check (simple polling collaborator)
    // =========================================================================

    /// Quick signed-in probe: a visible sign-in control means no, an
    /// account-labeled control means yes
    pub async fn is_signed_in(&self) -> bool {
        self.page.wait(2000).await;

        let query = r#"(() => {
            const texts = Array.from(document.querySelectorAll('a, button, [role="button"]'));
            const signin = texts.some(el =>
                (el.innerText || '').trim().toLowerCase() === 'sign in');
            const account = !!document.querySelector('[aria-label*="Account" i]');
            return { signin: signin, account: account };
        })()"#;

        match self.page.evaluate_value(query).await {
            Ok(value) => {
                let signin = value.get("signin").and_then(|v| v.as_bool()).unwrap_or(false);
                let account = value.get("account").and_then(|v| v.as_bool()).unwrap_or(false);
                let signed_in = !signin && account;
                if signed_in {
                    tracing::info!("signed in");
                } else {
                    tracing::info!("not signed in (sign-in control visible)");
                }
                signed_in
            }
            Err(e) => {
                tracing::warn!("could not determine sign-in status: {}", e);
                false
            }
        }
    }

    /// Give the operator a window to sign in manually
    pub async fn wait_for_signin(&self, secs: u64) {
        tracing::info!("waiting {}s for sign-in; complete it in the browser window", secs);
        self.page.wait(secs * 1000).await;
        tracing::info!("resuming");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumed_counts_as_success_but_stays_distinct() {
        let assumed = StageOutcome::assumed("blind click");
        assert!(assumed.is_success());
        assert_ne!(assumed, StageOutcome::Completed);
        assert!(!StageOutcome::failed("gone").is_success());
    }

    #[test]
    fn report_requires_an_attempt() {
        let empty = EditReport::default();
        assert!(!empty.succeeded());

        let ok = EditReport {
            name: Some(StageOutcome::Completed),
            address: None,
        };
        assert!(ok.succeeded());

        let degraded = EditReport {
            name: Some(StageOutcome::assumed("enter surrogate")),
            address: None,
        };
        assert!(degraded.succeeded());

        let failed = EditReport {
            name: Some(StageOutcome::Completed),
            address: Some(StageOutcome::failed("no input")),
        };
        assert!(!failed.succeeded());
    }

    #[test]
    fn request_needs_at_least_one_edit() {
        let bare = EditRequest::new("Test Cafe");
        assert!(!bare.has_edit());
        assert!(bare.clone().with_name("New Name").has_edit());
        assert!(bare.with_address("123 Main St").has_edit());
    }
}
