//! Manual-click observer
//!
//! Debug/data-capture collaborator: records what a human actually clicks so
//! new selectors can be captured from real sessions. A capturing listener is
//! installed in every document; it ignores untrusted events and anything
//! that happens while that document's suppression flag is up, and pushes
//! snapshots onto a bounded in-page queue. A background task drains the
//! queue and persists each record (JSONL line, markup dump, screenshot)
//! without ever blocking the interaction flow.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::dispatch::SUPPRESS_FLAG;
use crate::error::Result;
use crate::page::Page;

/// In-page queue the listener feeds and the drain loop empties
const QUEUE: &str = "__mapmodClicks";
/// Queue cap; a stuck drain loop must not grow page memory unboundedly
const QUEUE_LIMIT: usize = 50;
/// Drain poll interval
const POLL_MS: u64 = 500;

/// Structured snapshot of one genuine manual click
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickRecord {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub r#type: String,
    pub role: String,
    pub name: String,
    pub value: String,
    pub placeholder: String,
    pub aria_label: String,
    pub aria_labelled_by: String,
    pub content_editable: String,
    pub data_value: String,
    pub jsname: String,
    pub text_content: String,
    pub outer_html: String,
    pub inner_html: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub is_visible: bool,
    pub is_editable: bool,
    /// Stamped on drain, not in the page
    pub ts: u64,
    /// Page URL at drain time
    pub url: String,
}

/// The capturing listener, installed once per document
fn listener_script() -> String {
    format!(
        r#"(function() {{
            if (window.__mapmodObserver) return;
            window.__mapmodObserver = true;
            window.{queue} = window.{queue} || [];
            document.addEventListener('click', function(ev) {{
                try {{
                    if (!ev.isTrusted || window.{flag}) {{ return; }}
                    const t = ev.target;
                    const rect = t.getBoundingClientRect();
                    const computed = window.getComputedStyle(t);
                    const info = {{
                        tagName: t.tagName,
                        id: t.id || '',
                        className: (typeof t.className === 'string') ? t.className : '',
                        type: t.type || '',
                        role: t.getAttribute('role') || '',
                        name: t.name || '',
                        value: t.value || '',
                        placeholder: t.placeholder || '',
                        ariaLabel: t.getAttribute('aria-label') || '',
                        ariaLabelledBy: t.getAttribute('aria-labelledby') || '',
                        contentEditable: t.contentEditable || '',
                        dataValue: t.getAttribute('data-value') || '',
                        jsname: t.getAttribute('jsname') || '',
                        textContent: (t.textContent || '').slice(0, 500),
                        outerHTML: (t.outerHTML || '').slice(0, 20000),
                        innerHTML: (t.innerHTML || '').slice(0, 1000),
                        x: rect.x,
                        y: rect.y,
                        width: rect.width,
                        height: rect.height,
                        isVisible: rect.width > 0 && rect.height > 0 &&
                            computed.visibility !== 'hidden' && computed.display !== 'none',
                        isEditable: (t.tagName === 'INPUT' || t.tagName === 'TEXTAREA') ||
                            (t.contentEditable === 'true') ||
                            (t.getAttribute('role') === 'textbox')
                    }};
                    if (window.{queue}.length < {limit}) {{ window.{queue}.push(info); }}
                }} catch (e) {{}}
            }}, true);
        }})()"#,
        queue = QUEUE,
        flag = SUPPRESS_FLAG,
        limit = QUEUE_LIMIT,
    )
}

/// Watches a page for genuine manual clicks
pub struct ClickObserver {
    page: Page,
    dir: PathBuf,
}

impl ClickObserver {
    /// Install the listener on `page` (current document and all future ones)
    pub async fn install(page: Page, dir: impl Into<PathBuf>) -> Result<Self> {
        let script = listener_script();
        page.session()
            .add_script_to_evaluate_on_new_document(&script)
            .await?;
        // The current document was loaded before the init script existed
        page.execute(&script).await?;

        Ok(Self {
            page,
            dir: dir.into(),
        })
    }

    /// Take everything queued since the last drain
    pub async fn drain(&self) -> Vec<ClickRecord> {
        let take = format!(
            "(() => {{ const q = window.{queue} || []; window.{queue} = []; return q; }})()",
            queue = QUEUE
        );

        let value = match self.page.evaluate_value(&take).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("click drain failed: {}", e);
                return Vec::new();
            }
        };

        let mut records: Vec<ClickRecord> = serde_json::from_value(value).unwrap_or_default();
        if records.is_empty() {
            return records;
        }

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let url = self.page.url().await.unwrap_or_default();
        for (i, record) in records.iter_mut().enumerate() {
            record.ts = ts + i as u64;
            record.url = url.clone();
        }
        records
    }

    /// Drain forever, logging and persisting each record
    ///
    /// Run this on its own task: `tokio::spawn(observer.run())`.
    pub async fn run(self) {
        loop {
            for record in self.drain().await {
                tracing::info!(
                    "manual click captured: <{} id='{}' class='{}'> at ({:.0}, {:.0})",
                    record.tag_name.to_lowercase(),
                    record.id,
                    record.class_name,
                    record.x,
                    record.y
                );
                if let Err(e) = self.persist(&record).await {
                    tracing::warn!("failed to persist click record: {}", e);
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(POLL_MS)).await;
        }
    }

    /// Append the JSONL line and write the markup dump plus a screenshot
    async fn persist(&self, record: &ClickRecord) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        tokio::fs::create_dir_all(&self.dir).await?;

        let line = serde_json::to_string(record)?;
        let mut log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("captured_clicks.jsonl"))
            .await?;
        log.write_all(line.as_bytes()).await?;
        log.write_all(b"\n").await?;

        let html_path = self.dir.join(format!("captured_click_{}.html", record.ts));
        tokio::fs::write(&html_path, &record.outer_html).await?;

        match self.page.screenshot().await {
            Ok(png) => {
                let png_path = self.dir.join(format!("captured_click_{}.png", record.ts));
                tokio::fs::write(&png_path, png).await?;
            }
            Err(e) => tracing::debug!("click screenshot failed: {}", e),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_guards_on_trust_and_suppression() {
        let script = listener_script();
        assert!(script.contains("ev.isTrusted"));
        assert!(script.contains(SUPPRESS_FLAG));
        assert!(script.contains("addEventListener('click'"));
    }

    #[test]
    fn listener_installs_once() {
        let script = listener_script();
        assert!(script.contains("__mapmodObserver"));
    }

    #[test]
    fn click_record_parses_page_fields() {
        let raw = serde_json::json!({
            "tagName": "INPUT",
            "className": "VfPpkd-fmcmS-wGMbrd",
            "ariaLabel": "Place name in English",
            "x": 120.5,
            "y": 330.0,
            "width": 240.0,
            "height": 32.0,
            "isVisible": true,
            "isEditable": true
        });
        let record: ClickRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.tag_name, "INPUT");
        assert_eq!(record.aria_label, "Place name in English");
        assert!(record.is_editable);
        assert_eq!(record.ts, 0);
    }

    #[test]
    fn click_record_serializes_camel_case() {
        let record = ClickRecord {
            tag_name: "BUTTON".into(),
            ..Default::default()
        };
        let line = serde_json::to_string(&record).unwrap();
        assert!(line.contains("\"tagName\":\"BUTTON\""));
        assert!(line.contains("\"isVisible\""));
    }
}
