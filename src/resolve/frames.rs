//! Cross-document query evaluation
//!
//! Queries are zero-argument JS function expressions. The main document is
//! always asked first; only when it yields nothing are iframes tried, in DOM
//! registration order. A frame that throws (cross-origin, navigation race)
//! counts as "no result" - such faults never reach the caller.

use serde_json::Value;

use crate::page::{escape_js_string, Page};
use crate::resolve::DocumentHandle;

/// Runs queries against the main document and every reachable iframe
pub struct FrameEvaluator<'a> {
    page: &'a Page,
}

impl<'a> FrameEvaluator<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page }
    }

    /// Evaluate `query` across the document tree, returning the first
    /// non-empty result and the document that produced it
    ///
    /// Results from iframes that carry numeric `x`/`y` fields are shifted by
    /// the iframe's bounding rect so coordinates land in top-level viewport
    /// space.
    pub async fn evaluate(&self, query: &str) -> Option<(Value, DocumentHandle)> {
        // Main document has priority
        match self.page.evaluate_value(&format!("({})()", query)).await {
            Ok(value) if !is_empty(&value) => {
                return Some((value, DocumentHandle::Main));
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("main-document query failed: {}", e),
        }

        for index in 0..self.frame_count().await {
            match self
                .page
                .evaluate_value(&frame_query(index, query))
                .await
            {
                Ok(value) if !is_empty(&value) => {
                    return Some((value, DocumentHandle::Frame { index }));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("iframe[{}] query failed: {}", index, e);
                }
            }
        }

        None
    }

    /// Run `statement` (a zero-argument function expression) in every
    /// reachable document, returning per-document success
    ///
    /// Used by the click dispatcher to mirror the suppression flag. Unlike
    /// [`evaluate`](Self::evaluate), this does not stop at the first result.
    pub async fn broadcast(&self, statement: &str) -> Vec<(DocumentHandle, bool)> {
        let mut applied = Vec::new();

        let main_ok = self
            .page
            .execute(&format!("({})()", statement))
            .await
            .is_ok();
        applied.push((DocumentHandle::Main, main_ok));

        for index in 0..self.frame_count().await {
            let ok = matches!(
                self.page
                    .evaluate_value(&frame_statement(index, statement))
                    .await,
                Ok(Value::Bool(true))
            );
            applied.push((DocumentHandle::Frame { index }, ok));
        }

        applied
    }

    /// Number of iframes currently attached to the main document
    pub async fn frame_count(&self) -> usize {
        self.page
            .evaluate::<usize>("document.querySelectorAll('iframe').length")
            .await
            .unwrap_or(0)
    }
}

/// Wrap `query` to run inside iframe `index`, translating result coordinates
/// (single results and arrays of results alike)
fn frame_query(index: usize, query: &str) -> String {
    let escaped = escape_js_string(query);
    format!(
        r#"(() => {{
            const frame = document.querySelectorAll('iframe')[{index}];
            if (!frame || !frame.contentWindow) return null;
            let out;
            try {{
                const run = new frame.contentWindow.Function("return ({escaped})();");
                out = run.call(frame.contentWindow);
            }} catch (e) {{
                return null;
            }}
            const r = frame.getBoundingClientRect();
            const shift = (o) => {{
                if (o && typeof o.x === 'number' && typeof o.y === 'number') {{
                    o.x += r.x;
                    o.y += r.y;
                }}
            }};
            if (Array.isArray(out)) {{ out.forEach(shift); }} else {{ shift(out); }}
            return out;
        }})()"#,
    )
}

/// Wrap `statement` to run inside iframe `index`, reporting whether it ran
fn frame_statement(index: usize, statement: &str) -> String {
    let escaped = escape_js_string(statement);
    format!(
        r#"(() => {{
            const frame = document.querySelectorAll('iframe')[{index}];
            if (!frame || !frame.contentWindow) return false;
            try {{
                const run = new frame.contentWindow.Function("return ({escaped})();");
                run.call(frame.contentWindow);
                return true;
            }} catch (e) {{
                return false;
            }}
        }})()"#,
    )
}

/// Falsy/empty results do not count as a hit
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values_are_misses() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!(false)));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
    }

    #[test]
    fn results_are_hits() {
        assert!(!is_empty(&json!(true)));
        assert!(!is_empty(&json!({"x": 1.0, "y": 2.0})));
        assert!(!is_empty(&json!([1])));
        assert!(!is_empty(&json!("text")));
        assert!(!is_empty(&json!(0)));
    }

    #[test]
    fn frame_query_targets_the_right_iframe() {
        let js = frame_query(3, "() => null");
        assert!(js.contains("querySelectorAll('iframe')[3]"));
        assert!(js.contains("getBoundingClientRect"));
    }

    #[test]
    fn frame_query_escapes_the_inner_query() {
        let js = frame_query(0, r#"() => document.querySelector("input")"#);
        // The inner double quotes must not terminate the Function source
        assert!(js.contains(r#"\"input\""#));
    }
}
