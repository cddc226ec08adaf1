//! Page Abstraction
//!
//! Thin high-level API over a CDP session: navigation, script evaluation,
//! raw input and debug artifacts. Element discovery lives in [`crate::resolve`];
//! this layer only knows how to ask the page questions and poke it.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cdp::{KeyEventType, MouseButton, MouseEventType, Session};
use crate::error::{Error, Result};
use crate::EngineConfig;

/// Escape a string for safe use in JavaScript string literals
pub(crate) fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace("${", "\\${")
}

/// A browser tab
#[derive(Clone)]
pub struct Page {
    session: Session,
    config: Arc<EngineConfig>,
}

impl Page {
    /// Create a new Page wrapping a CDP session
    pub(crate) fn new(session: Session, config: Arc<EngineConfig>) -> Self {
        Self { session, config }
    }

    /// Get the underlying CDP session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Engine configuration this page was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        let result = self.session.navigate(url).await?;
        if let Some(error) = result.error_text {
            return Err(Error::Navigation(error));
        }
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        Ok(())
    }

    /// Get the current URL
    pub async fn url(&self) -> Result<String> {
        let frame_tree = self.session.get_frame_tree().await?;
        Ok(frame_tree.frame.url)
    }

    /// Get the page title
    pub async fn title(&self) -> Result<String> {
        self.evaluate("document.title").await
    }

    /// Get the full document HTML
    pub async fn content(&self) -> Result<String> {
        self.evaluate("document.documentElement.outerHTML").await
    }

    // =========================================================================
    // JavaScript Evaluation
    // =========================================================================

    /// Evaluate JavaScript and deserialize the result
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::Script(format!(
                "{} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        if let Some(value) = result.result.value {
            let typed: T = serde_json::from_value(value)?;
            return Ok(typed);
        }

        Err(Error::Script("No value returned from evaluate".into()))
    }

    /// Evaluate JavaScript, tolerating null/undefined results
    pub async fn evaluate_value(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::Script(format!(
                "{} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        Ok(result.result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript without expecting a return value
    pub async fn execute(&self, expression: &str) -> Result<()> {
        let result = self.session.evaluate(expression).await?;

        if let Some(exception) = result.exception_details {
            return Err(Error::Script(format!(
                "{} at {}:{}",
                exception.text, exception.line_number, exception.column_number
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Raw Input
    // =========================================================================

    /// Press and release the left mouse button at viewport coordinates
    ///
    /// This is the raw primitive; callers that need the suppression protocol
    /// go through [`crate::dispatch::ClickDispatcher`].
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        self.session
            .dispatch_mouse_event(
                MouseEventType::MousePressed,
                x,
                y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await?;

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        self.session
            .dispatch_mouse_event(
                MouseEventType::MouseReleased,
                x,
                y,
                Some(MouseButton::Left),
                Some(1),
            )
            .await?;

        Ok(())
    }

    /// Type text into the focused element
    pub async fn type_text(&self, text: &str) -> Result<()> {
        self.session.insert_text(text).await
    }

    /// Press and release a named key (e.g. "Tab", "Enter")
    pub async fn press_key(&self, key: &str) -> Result<()> {
        // Enter needs a text payload or forms will not submit
        let text = if key == "Enter" { Some("\r") } else { None };

        self.session
            .dispatch_key_event(KeyEventType::KeyDown, Some(key), text, Some(key))
            .await?;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        self.session
            .dispatch_key_event(KeyEventType::KeyUp, Some(key), None, Some(key))
            .await?;
        Ok(())
    }

    /// Select all content in the focused element
    pub async fn select_all(&self) -> Result<()> {
        self.execute(
            r#"(() => {
                const el = document.activeElement;
                if (el && typeof el.select === 'function') { el.select(); }
                else { document.execCommand('selectAll'); }
            })()"#,
        )
        .await
    }

    /// Wait for a fixed duration
    pub async fn wait(&self, ms: u64) {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }

    // =========================================================================
    // Screenshots & Debug Artifacts
    // =========================================================================

    /// Capture a screenshot as PNG bytes
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        self.session.capture_screenshot(Some("png"), None).await
    }

    fn debug_path(&self, prefix: &str, ext: &str) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        match &self.config.debug_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(format!("{}/{}_{}.{}", dir, prefix, timestamp, ext))
            }
            None => Ok(format!("{}_{}.{}", prefix, timestamp, ext)),
        }
    }

    /// Save a timestamped debug screenshot, returning its path
    pub async fn debug_screenshot(&self, prefix: &str) -> Result<String> {
        let filename = self.debug_path(prefix, "png")?;
        let screenshot = self.screenshot().await?;
        tokio::fs::write(&filename, screenshot).await?;
        Ok(filename)
    }

    /// Save a timestamped dump of the full document HTML, returning its path
    pub async fn debug_html(&self, prefix: &str) -> Result<String> {
        let filename = self.debug_path(prefix, "html")?;
        let html = self.content().await?;
        tokio::fs::write(&filename, html).await?;
        Ok(filename)
    }

    /// Dump both debug artifacts, best-effort; returns what was written
    pub async fn dump_debug_artifacts(&self, prefix: &str) -> Vec<String> {
        let mut written = Vec::new();
        match self.debug_screenshot(prefix).await {
            Ok(path) => written.push(path),
            Err(e) => tracing::debug!("debug screenshot failed: {}", e),
        }
        match self.debug_html(prefix).await {
            Ok(path) => written.push(path),
            Err(e) => tracing::debug!("debug html dump failed: {}", e),
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_js_metacharacters() {
        assert_eq!(escape_js_string("a'b"), "a\\'b");
        assert_eq!(escape_js_string("a\"b"), "a\\\"b");
        assert_eq!(escape_js_string("a\\b"), "a\\\\b");
        assert_eq!(escape_js_string("a\nb"), "a\\nb");
        assert_eq!(escape_js_string("${x}"), "\\${x}");
    }

    #[test]
    fn escapes_template_backticks() {
        assert_eq!(escape_js_string("`tick`"), "\\`tick\\`");
    }
}
