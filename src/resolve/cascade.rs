//! The selector cascade
//!
//! Tier order is fixed: explicit candidates, label proximity, generic
//! interactive roles. A miss at every tier is `None`, never an error - the
//! state machine owns retry and backoff. Tie-breaks: lowest candidate index
//! wins over document order; within one candidate, first visible match in
//! document order wins.

use serde::Deserialize;
use serde_json::Value;

use crate::page::{escape_js_string, Page};
use crate::resolve::{
    DocumentHandle, FrameEvaluator, ResolvedTarget, SelectorCandidate, Strategy,
};

/// Visibility filter shared by every query: zero-area boxes, hidden computed
/// style and disabled controls never resolve
const VISIBLE_JS: &str = r#"
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        if (!(r.width > 0 && r.height > 0)) return false;
        const cs = window.getComputedStyle(el);
        if (cs.visibility === 'hidden' || cs.display === 'none') return false;
        return !el.disabled;
    };"#;

/// Element summary returned to Rust: center plus diagnostic fields
const DESCRIBE_JS: &str = r#"
    const describe = (el) => {
        const r = el.getBoundingClientRect();
        return {
            x: r.x + r.width / 2,
            y: r.y + r.height / 2,
            tag: el.tagName,
            id: el.id || '',
            className: (typeof el.className === 'string') ? el.className : '',
            placeholder: el.placeholder || '',
            ariaLabel: el.getAttribute('aria-label') || '',
            text: (el.innerText || el.textContent || '').trim().slice(0, 80)
        };
    };"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ElementInfo {
    x: f64,
    y: f64,
    tag: String,
    id: String,
    class_name: String,
    placeholder: String,
    aria_label: String,
    text: String,
}

impl ElementInfo {
    /// One-line summary for the log narration
    fn detail(&self) -> String {
        let mut out = self.tag.to_lowercase();
        if !self.id.is_empty() {
            out.push('#');
            out.push_str(&self.id);
        }
        if !self.aria_label.is_empty() {
            out.push_str(&format!(" aria='{}'", self.aria_label));
        } else if !self.placeholder.is_empty() {
            out.push_str(&format!(" placeholder='{}'", self.placeholder));
        } else if !self.text.is_empty() {
            out.push_str(&format!(" text='{}'", self.text));
        } else if !self.class_name.is_empty() {
            out.push_str(&format!(" class='{}'", self.class_name));
        }
        out
    }
}

/// A visible interactive element captured by the generic-role scan
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EntrySnapshot {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// aria-label and data-value, concatenated for hint matching
    pub attrs: String,
}

/// Pick a menu entry: hint containment outranks document order, icon-only
/// entries are skipped, and any visible entry beats nothing at all
pub fn pick_entry<'e>(entries: &'e [EntrySnapshot], hint: Option<&str>) -> Option<&'e EntrySnapshot> {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        let needle = hint.to_lowercase();
        if let Some(hit) = entries.iter().find(|e| {
            e.text.to_lowercase().contains(&needle) || e.attrs.to_lowercase().contains(&needle)
        }) {
            return Some(hit);
        }
    }

    // Entries with a single visible glyph are icon buttons, not menu items
    if let Some(hit) = entries.iter().find(|e| {
        let t = e.text.trim();
        t.chars().count() > 1 && !t.to_lowercase().contains("http")
    }) {
        return Some(hit);
    }

    entries.first()
}

/// Build the query for one candidate descriptor
fn candidate_query(candidate: &SelectorCandidate) -> String {
    match candidate {
        SelectorCandidate::Css(selector) => css_query(selector),
        SelectorCandidate::AttrContains { name, value } => {
            css_query(&format!("[{}*=\"{}\" i]", name, value))
        }
        SelectorCandidate::TextContains(needle) => {
            let needle = escape_js_string(&needle.to_lowercase());
            format!(
                r#"() => {{
                    {VISIBLE_JS}
                    {DESCRIBE_JS}
                    const pool = document.querySelectorAll(
                        'a, button, input, [role="button"], [role="menuitem"], label, span, div');
                    for (const el of pool) {{
                        const t = (el.innerText || el.textContent || el.value || '').toLowerCase();
                        if (!t.includes('{needle}')) continue;
                        if (!visible(el)) continue;
                        return describe(el);
                    }}
                    return null;
                }}"#
            )
        }
    }
}

fn css_query(selector: &str) -> String {
    let selector = escape_js_string(selector);
    format!(
        r#"() => {{
            {VISIBLE_JS}
            {DESCRIBE_JS}
            let nodes;
            try {{ nodes = document.querySelectorAll('{selector}'); }}
            catch (e) {{ return null; }}
            for (const el of nodes) {{
                if (!visible(el)) continue;
                return describe(el);
            }}
            return null;
        }}"#
    )
}

/// Build the label-proximity query: find label wording, search its nearest
/// container for an input-like descendant
fn label_query(labels: &[&str]) -> String {
    let needles = labels
        .iter()
        .map(|l| format!("'{}'", escape_js_string(&l.to_lowercase())))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"() => {{
            {VISIBLE_JS}
            {DESCRIBE_JS}
            const needles = [{needles}];
            const labels = Array.from(document.querySelectorAll('span, label')).filter(n => {{
                const t = (n.innerText || '').toLowerCase();
                return needles.some(needle => t.includes(needle));
            }});
            for (const lab of labels) {{
                const container = lab.closest('div, form, section');
                if (!container) continue;
                const input = container.querySelector('input, textarea, [contenteditable]');
                if (input && visible(input)) return describe(input);
            }}
            return null;
        }}"#
    )
}

/// Snapshot every visible element with an interactive role
fn entries_query() -> String {
    format!(
        r#"() => {{
            {VISIBLE_JS}
            const pool = document.querySelectorAll(
                '[role="menuitem"], [role="button"], div[data-value], button');
            const out = [];
            for (const el of pool) {{
                if (!visible(el)) continue;
                const r = el.getBoundingClientRect();
                out.push({{
                    x: r.x + r.width / 2,
                    y: r.y + r.height / 2,
                    text: (el.innerText || el.textContent || '').trim().slice(0, 80),
                    attrs: ((el.getAttribute('aria-label') || '') + ' ' +
                            (el.getAttribute('data-value') || '')).trim()
                }});
                if (out.length >= 40) break;
            }}
            return out;
        }}"#
    )
}

/// Submit search: exact trimmed "submit" text wins; otherwise submit/send
/// containment, clicking the nearest clickable ancestor of a matched leaf
fn submit_query(selectors: &[&str]) -> String {
    let list = selectors
        .iter()
        .map(|s| format!("'{}'", escape_js_string(s)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"() => {{
            {VISIBLE_JS}
            {DESCRIBE_JS}
            const selectors = [{list}];
            let contained = null;
            for (const selector of selectors) {{
                let nodes;
                try {{ nodes = document.querySelectorAll(selector); }}
                catch (e) {{ continue; }}
                for (const el of nodes) {{
                    if (!visible(el)) continue;
                    const t = (el.innerText || el.textContent || '').trim().toLowerCase();
                    if (t === 'submit') {{
                        const hit = describe(el);
                        hit.via = 'exact';
                        return hit;
                    }}
                    if (!contained && (t.includes('submit') || t.includes('send'))) {{
                        const clickable = el.closest('button, [role="button"]') || el;
                        const hit = describe(clickable);
                        hit.via = 'ancestor';
                        contained = hit;
                    }}
                }}
            }}
            return contained;
        }}"#
    )
}

/// Confirmation search: allow-listed labels inside dialog containers first,
/// then any labeled control inside an open dialog
fn confirmation_query(labels: &[&str]) -> String {
    let allow = labels
        .iter()
        .map(|l| format!("'{}'", escape_js_string(&l.to_lowercase())))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"() => {{
            {VISIBLE_JS}
            {DESCRIBE_JS}
            const allow = [{allow}];
            const dialogs = document.querySelectorAll('div[role="dialog"], div[aria-modal="true"]');
            for (const dialog of dialogs) {{
                for (const el of dialog.querySelectorAll('button, [role="button"]')) {{
                    if (!visible(el)) continue;
                    const t = (el.innerText || el.textContent || '').trim().toLowerCase();
                    if (allow.some(a => t === a || t.includes(a))) {{
                        const hit = describe(el);
                        hit.via = 'label';
                        return hit;
                    }}
                }}
            }}
            for (const dialog of dialogs) {{
                for (const el of dialog.querySelectorAll('button, [role="button"]')) {{
                    if (!visible(el)) continue;
                    const t = (el.innerText || el.textContent || '').trim();
                    if (t) {{
                        const hit = describe(el);
                        hit.via = 'any';
                        return hit;
                    }}
                }}
            }}
            return null;
        }}"#
    )
}

/// Fallback field scan: any visible editable element that is not a search box
fn editable_query() -> String {
    format!(
        r#"() => {{
            {VISIBLE_JS}
            {DESCRIBE_JS}
            const pool = document.querySelectorAll('input, textarea, [contenteditable]');
            for (const el of pool) {{
                if (!visible(el)) continue;
                const cls = (typeof el.className === 'string') ? el.className : '';
                const ph = (el.placeholder || el.getAttribute('placeholder') || '').toLowerCase();
                if (cls.includes('searchboxinput') || cls.includes('omnibox')) continue;
                if (ph.includes('search')) continue;
                return describe(el);
            }}
            return null;
        }}"#
    )
}

/// Resolves targets through the cascade tiers
pub struct TargetResolver<'a> {
    frames: FrameEvaluator<'a>,
}

impl<'a> TargetResolver<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self {
            frames: FrameEvaluator::new(page),
        }
    }

    fn target_from(value: Value, document: DocumentHandle, strategy: Strategy) -> Option<ResolvedTarget> {
        let info: ElementInfo = serde_json::from_value(value).ok()?;
        Some(ResolvedTarget {
            x: info.x,
            y: info.y,
            document,
            strategy,
            detail: info.detail(),
        })
    }

    /// Tier 1: try each candidate in priority order across the document tree
    pub async fn resolve_candidates(
        &self,
        candidates: &[SelectorCandidate],
    ) -> Option<ResolvedTarget> {
        for (index, candidate) in candidates.iter().enumerate() {
            let query = candidate_query(candidate);
            if let Some((value, document)) = self.frames.evaluate(&query).await {
                if let Some(target) = Self::target_from(value, document, Strategy::Candidate(index))
                {
                    tracing::debug!("resolved {}", target);
                    return Some(target);
                }
            }
        }
        None
    }

    /// Tier 2: label-proximity fallback
    pub async fn resolve_by_label(&self, labels: &[&str]) -> Option<ResolvedTarget> {
        let (value, document) = self.frames.evaluate(&label_query(labels)).await?;
        let target = Self::target_from(value, document, Strategy::LabelProximity)?;
        tracing::debug!("resolved {}", target);
        Some(target)
    }

    /// Tier 3 snapshot: all visible interactive-role elements
    pub async fn interactive_entries(&self) -> (Vec<EntrySnapshot>, DocumentHandle) {
        match self.frames.evaluate(&entries_query()).await {
            Some((value, document)) => {
                let entries = serde_json::from_value(value).unwrap_or_default();
                (entries, document)
            }
            None => (Vec::new(), DocumentHandle::Main),
        }
    }

    /// Tier 3: generic-role fallback, preferring hint containment
    pub async fn resolve_generic(&self, hint: Option<&str>) -> Option<ResolvedTarget> {
        let (entries, document) = self.interactive_entries().await;
        let entry = pick_entry(&entries, hint)?;
        let target = ResolvedTarget {
            x: entry.x,
            y: entry.y,
            document,
            strategy: Strategy::GenericRole,
            detail: if entry.text.is_empty() {
                entry.attrs.clone()
            } else {
                entry.text.clone()
            },
        };
        tracing::debug!("resolved {}", target);
        Some(target)
    }

    /// Full cascade: candidates, then labels, then generic roles
    pub async fn resolve(
        &self,
        candidates: &[SelectorCandidate],
        labels: &[&str],
        hint: Option<&str>,
    ) -> Option<ResolvedTarget> {
        if let Some(target) = self.resolve_candidates(candidates).await {
            return Some(target);
        }
        if !labels.is_empty() {
            if let Some(target) = self.resolve_by_label(labels).await {
                return Some(target);
            }
        }
        self.resolve_generic(hint).await
    }

    /// Submit control: exact "submit" text, else submit/send containment with
    /// a walk up to the nearest clickable ancestor
    pub async fn resolve_submit(&self, selectors: &[&str]) -> Option<ResolvedTarget> {
        let (value, document) = self.frames.evaluate(&submit_query(selectors)).await?;
        let strategy = match value.get("via").and_then(Value::as_str) {
            Some("exact") => Strategy::ExactText,
            _ => Strategy::TextAncestor,
        };
        let target = Self::target_from(value, document, strategy)?;
        tracing::debug!("resolved {}", target);
        Some(target)
    }

    /// Confirmation control inside an open dialog
    pub async fn resolve_confirmation(&self, labels: &[&str]) -> Option<ResolvedTarget> {
        let (value, document) = self.frames.evaluate(&confirmation_query(labels)).await?;
        let strategy = match value.get("via").and_then(Value::as_str) {
            Some("label") => Strategy::DialogLabel,
            _ => Strategy::DialogAny,
        };
        let target = Self::target_from(value, document, strategy)?;
        tracing::debug!("resolved {}", target);
        Some(target)
    }

    /// Last-resort editable-element scan (search boxes excluded)
    pub async fn resolve_editable(&self) -> Option<ResolvedTarget> {
        let (value, document) = self.frames.evaluate(&editable_query()).await?;
        let target = Self::target_from(value, document, Strategy::EditableScan)?;
        tracing::debug!("resolved {}", target);
        Some(target)
    }
}
