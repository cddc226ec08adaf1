//! Ranked candidate descriptors per target role
//!
//! These tables encode everything learned about the target UI, including
//! selectors captured from real manual clicks (the obfuscated class and
//! jsname values). Order matters: captured selectors first, semantic
//! attributes next, loose text matches last.

use crate::resolve::SelectorCandidate;
use crate::resolve::SelectorCandidate as C;

/// The main search box
pub fn search_input() -> Vec<SelectorCandidate> {
    vec![
        C::css("input#searchboxinput"),
        C::css("#searchboxinput"),
        C::attr("placeholder", "Search"),
        C::attr("aria-label", "Search"),
        C::css("input.maps-sprite-searchbox-input"),
    ]
}

/// Visible info-panel container
pub fn panel_container() -> Vec<SelectorCandidate> {
    vec![C::css("[data-container-id]"), C::css("[role=\"complementary\"]")]
}

/// The "suggest an edit" control in the info panel
pub fn edit_control() -> Vec<SelectorCandidate> {
    vec![
        C::attr("aria-label", "Suggest an edit"),
        C::attr("title", "Suggest an edit"),
        C::css("[data-value=\"suggest\"]"),
        C::attr("jsaction", "suggest"),
        C::attr("id", "suggest"),
        C::attr("class", "suggest"),
        C::text("Suggest an edit"),
        C::css("[data-container-id] button"),
        C::css("div[role=\"menuitem\"]"),
        C::attr("aria-label", "Edit"),
        C::text("Suggest"),
        C::text("Edit"),
    ]
}

/// Place-name input inside the edit form
pub fn place_name_input() -> Vec<SelectorCandidate> {
    vec![
        C::css("input#i7"),
        C::css("input[jsname=\"YPqjbf\"]"),
        C::css("input[aria-label=\"Place name in English\"]"),
        C::css("input[placeholder=\"Add place name in English\"]"),
        C::css("input.VfPpkd-fmcmS-wGMbrd"),
        C::attr("aria-label", "Place name"),
        C::attr("placeholder", "place name"),
    ]
}

/// Label wordings that sit next to the place-name input
pub fn place_name_labels() -> &'static [&'static str] {
    &["place name"]
}

/// Address input, reached directly when the menu entry is missing
pub fn address_input() -> Vec<SelectorCandidate> {
    vec![
        C::attr("placeholder", "address"),
        C::attr("aria-label", "address"),
        C::css("textarea[placeholder*=\"address\" i]"),
        C::attr("placeholder", "location"),
        C::css("input[type=\"text\"]"),
    ]
}

/// Label wordings that sit next to the address input
pub fn address_labels() -> &'static [&'static str] {
    &["address"]
}

/// CSS pool the submit-text search walks over
///
/// The first three are captured from a real submit click; the rest widen the
/// net to anything button-like. Text filtering happens in the query itself.
pub fn submit_pool() -> &'static [&'static str] {
    &[
        "span[jsname=\"V67aGc\"]",
        "span.VfPpkd-vQzf8d",
        "div.VfPpkd-RLmnJb",
        "button",
        "[role=\"button\"]",
        "[aria-label*=\"Submit\" i]",
        "[aria-label*=\"Send\" i]",
    ]
}

/// Confirmation-button labels accepted inside a dialog
pub fn confirmation_labels() -> &'static [&'static str] {
    &["ok", "done", "got it", "close"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_selectors_rank_first() {
        let names = place_name_input();
        assert_eq!(names[0], C::css("input#i7"));

        let search = search_input();
        assert_eq!(search[0], C::css("input#searchboxinput"));
    }

    #[test]
    fn every_role_has_candidates() {
        assert!(!search_input().is_empty());
        assert!(!panel_container().is_empty());
        assert!(edit_control().len() >= 10);
        assert!(!place_name_input().is_empty());
        assert!(!address_input().is_empty());
        assert!(!submit_pool().is_empty());
        assert_eq!(confirmation_labels().len(), 4);
    }

    #[test]
    fn loose_text_matches_rank_last_for_edit_control() {
        let candidates = edit_control();
        let first_text = candidates
            .iter()
            .position(|c| matches!(c, C::TextContains(_)))
            .unwrap();
        let first_attr = candidates
            .iter()
            .position(|c| matches!(c, C::AttrContains { .. }))
            .unwrap();
        assert!(first_attr < first_text);
    }
}
