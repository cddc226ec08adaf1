//! Integration tests for mapmod
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use mapmod::{
    Browser, ClickObserver, DocumentHandle, EditFlow, EditRequest, EngineConfig, SelectorCandidate,
    SessionProfile, Strategy, TargetResolver,
};

/// Check if Chrome is available
fn chrome_available() -> bool {
    mapmod::stealth::find_chrome().is_ok()
}

async fn launch(config: EngineConfig) -> (Browser, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let browser = Browser::launch(config, &SessionProfile::fresh(dir.path()))
        .await
        .expect("Failed to launch browser");
    (browser, dir)
}

async fn launch_fast() -> (Browser, tempfile::TempDir) {
    launch(EngineConfig::fast()).await
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_browser_launch() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let version = browser.version().await.expect("Failed to get version");
    assert!(!version.is_empty());
    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_page_navigation() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.goto("data:text/html,<title>Test Title</title><h1>Hello</h1>")
        .await
        .expect("Failed to navigate");

    let content = page.content().await.expect("Failed to get content");
    assert!(content.contains("Hello"));

    let title = page.title().await.expect("Failed to get title");
    assert_eq!(title, "Test Title");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_candidate_priority_beats_document_order() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("data:text/html,<button id='second'>Two</button><button id='first'>One</button>")
        .await
        .expect("Failed to create page");

    // The lower-index candidate's match is LATER in document order; it must
    // still win.
    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_candidates(&[
            SelectorCandidate::css("[id='first']"),
            SelectorCandidate::css("[id='second']"),
        ])
        .await
        .expect("no candidate resolved");

    assert_eq!(target.strategy, Strategy::Candidate(0));
    assert!(target.detail.contains("first"));

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_invisible_match_falls_through_to_next_candidate() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page(
            "data:text/html,<button id='a' style='display:none'>A</button><button id='b'>B</button>",
        )
        .await
        .expect("Failed to create page");

    // Candidate A matches only a hidden element, so B must resolve
    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_candidates(&[
            SelectorCandidate::css("[id='a']"),
            SelectorCandidate::css("[id='b']"),
        ])
        .await
        .expect("no candidate resolved");

    assert_eq!(target.strategy, Strategy::Candidate(1));
    assert!(target.detail.contains("b"));
    assert!(target.x > 0.0 && target.y > 0.0);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_frame_evaluator_prefers_the_main_document() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    page.execute(
        r#"document.body.innerHTML =
            "<div class='marker'>main</div>" +
            "<iframe srcdoc=\"<div class='marker'>framed</div>\"></iframe>";"#,
    )
    .await
    .expect("Failed to build page");
    page.wait(300).await;

    let evaluator = mapmod::FrameEvaluator::new(&page);
    let query = r#"() => {
        const el = document.querySelector('.marker');
        return el ? el.textContent : null;
    }"#;

    let (value, document) = evaluator.evaluate(query).await.expect("no result");
    assert_eq!(document, DocumentHandle::Main);
    assert_eq!(value.as_str(), Some("main"));

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_frame_evaluator_falls_back_to_iframes_with_offset_coords() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    // Marker exists only inside the iframe, which sits 200px from the left
    page.execute(
        r#"document.body.innerHTML =
            "<iframe style='position:absolute; left:200px; top:50px; width:300px; height:200px'" +
            " srcdoc=\"<button class='marker' style='position:absolute; left:10px; top:10px;" +
            " width:40px; height:20px'>Hi</button>\"></iframe>";"#,
    )
    .await
    .expect("Failed to build page");
    page.wait(300).await;

    let evaluator = mapmod::FrameEvaluator::new(&page);
    let query = r#"() => {
        const el = document.querySelector('.marker');
        if (!el) return null;
        const r = el.getBoundingClientRect();
        return { x: r.x + r.width / 2, y: r.y + r.height / 2 };
    }"#;

    let (value, document) = evaluator.evaluate(query).await.expect("no result");
    assert_eq!(document, DocumentHandle::Frame { index: 0 });

    // Frame-local center (~30, ~20) must come back shifted into the
    // top-level viewport space
    let x = value.get("x").unwrap().as_f64().unwrap();
    let y = value.get("y").unwrap().as_f64().unwrap();
    assert!(x > 200.0, "x={} not offset by the iframe origin", x);
    assert!(y > 50.0, "y={} not offset by the iframe origin", y);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_suppression_flag_brackets_the_click() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("data:text/html,<button id='btn' style='width:100px;height:40px'>Click</button>")
        .await
        .expect("Failed to create page");

    // Record the flag state seen by the page at click time
    page.execute(
        r#"window.seen = [];
           document.addEventListener('click', (ev) => {
               window.seen.push({
                   trusted: ev.isTrusted,
                   flag: window.__mapmodBotClick === true
               });
           }, true);"#,
    )
    .await
    .expect("Failed to install probe");

    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_candidates(&[SelectorCandidate::css("[id='btn']")])
        .await
        .expect("button not resolved");

    let dispatcher = mapmod::ClickDispatcher::new(page.clone(), 0);
    dispatcher.click(&target).await;
    page.wait(200).await;

    let seen: Vec<serde_json::Value> = page.evaluate("window.seen").await.expect("probe read");
    assert_eq!(seen.len(), 1, "expected exactly one click event");
    assert_eq!(seen[0]["trusted"], serde_json::json!(true));
    assert_eq!(
        seen[0]["flag"],
        serde_json::json!(true),
        "suppression flag was not up during the click"
    );

    // Cleared afterwards, both in the page and in the registry
    let flag: bool = page
        .evaluate("window.__mapmodBotClick === true")
        .await
        .expect("flag read");
    assert!(!flag, "suppression flag still set after the click");
    assert!(!dispatcher.suppressing());
    assert!(
        dispatcher.mirror_states().iter().all(|(_, v)| !v),
        "registry still shows a mirrored flag"
    );

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_observer_ignores_bot_clicks_and_records_manual_ones() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, dir) = launch_fast().await;
    let page = browser
        .new_page("data:text/html,<button id='btn' style='width:100px;height:40px'>Click</button>")
        .await
        .expect("Failed to create page");

    let observer = ClickObserver::install(page.clone(), dir.path().join("captures"))
        .await
        .expect("Failed to install observer");

    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_candidates(&[SelectorCandidate::css("[id='btn']")])
        .await
        .expect("button not resolved");

    // A suppressed (bot) click must record nothing
    let dispatcher = mapmod::ClickDispatcher::new(page.clone(), 0);
    dispatcher.click(&target).await;
    page.wait(200).await;
    assert!(observer.drain().await.is_empty(), "bot click was recorded");

    // A synthetic JS click is untrusted and must record nothing either
    page.execute("document.getElementById('btn').click()")
        .await
        .expect("js click");
    page.wait(200).await;
    assert!(
        observer.drain().await.is_empty(),
        "untrusted click was recorded"
    );

    // A trusted, unsuppressed click records exactly one event
    page.click_at(target.x, target.y).await.expect("raw click");
    page.wait(200).await;
    let records = observer.drain().await;
    assert_eq!(records.len(), 1, "expected exactly one manual click record");
    assert_eq!(records[0].tag_name, "BUTTON");
    assert!(records[0].is_visible);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_panel_poll_succeeds_once_the_panel_appears() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let mut config = EngineConfig::fast();
    config.panel_attempts = 4;
    config.panel_interval_ms = 300;

    let (browser, _dir) = launch(config).await;
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");

    // The panel shows up only after the first attempt has already missed
    page.execute(
        r#"setTimeout(() => {
               const panel = document.createElement('div');
               panel.setAttribute('role', 'complementary');
               panel.style.cssText = 'width:300px;height:400px';
               panel.textContent = 'panel';
               document.body.appendChild(panel);
           }, 500);"#,
    )
    .await
    .expect("Failed to schedule panel");

    let flow = EditFlow::new(page);
    assert!(flow.wait_for_panel().await, "panel poll should succeed");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_panel_poll_exhaustion_degrades_without_failing() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page("data:text/html,<p>no panel here</p>")
        .await
        .expect("Failed to create page");

    let flow = EditFlow::new(page);
    assert!(!flow.wait_for_panel().await, "panel poll should exhaust");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_label_proximity_tier_finds_the_input() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page(
            "data:text/html,<div><span>Place name</span><input style='width:200px;height:24px'></div>",
        )
        .await
        .expect("Failed to create page");

    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_by_label(&["place name"])
        .await
        .expect("label tier missed");

    assert_eq!(target.strategy, Strategy::LabelProximity);
    assert!(target.detail.starts_with("input"));

    // The combined cascade lands on the same tier when candidates miss
    let target = resolver
        .resolve(
            &[SelectorCandidate::css("input[jsname='YPqjbf']")],
            &["place name"],
            None,
        )
        .await
        .expect("cascade missed");
    assert_eq!(target.strategy, Strategy::LabelProximity);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_generic_role_tier_prefers_hint_over_order() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page(
            "data:text/html,\
             <div role='menuitem' style='width:80px;height:20px'>×</div>\
             <div role='menuitem' style='width:80px;height:20px'>Hours</div>\
             <div role='menuitem' style='width:80px;height:20px'>Coffee Shop West</div>",
        )
        .await
        .expect("Failed to create page");

    let resolver = TargetResolver::new(&page);

    // Hint containment outranks the earlier multi-character entry
    let target = resolver
        .resolve_generic(Some("Coffee Shop"))
        .await
        .expect("generic tier missed");
    assert_eq!(target.strategy, Strategy::GenericRole);
    assert_eq!(target.detail, "Coffee Shop West");

    // Without a hint, the icon glyph is skipped and "Hours" wins
    let target = resolver.resolve_generic(None).await.expect("generic tier missed");
    assert_eq!(target.detail, "Hours");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_submit_resolution_prefers_exact_text() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page(
            "data:text/html,\
             <button style='width:100px;height:30px'>Send now</button>\
             <button style='width:100px;height:30px'>Submit</button>",
        )
        .await
        .expect("Failed to create page");

    // "Send now" is earlier in document order but only a containment match;
    // the exact-text button must win
    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_submit(&["button"])
        .await
        .expect("submit not resolved");

    assert_eq!(target.strategy, Strategy::ExactText);
    assert!(target.detail.contains("Submit") || target.detail.contains("submit"));

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_confirmation_resolution_requires_a_dialog() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, _dir) = launch_fast().await;
    let page = browser
        .new_page(
            "data:text/html,\
             <button style='width:80px;height:30px'>Got it</button>\
             <div role='dialog'><button style='width:80px;height:30px'>Got it</button></div>",
        )
        .await
        .expect("Failed to create page");

    let resolver = TargetResolver::new(&page);
    let target = resolver
        .resolve_confirmation(&["ok", "done", "got it", "close"])
        .await
        .expect("confirmation not resolved");

    assert_eq!(target.strategy, Strategy::DialogLabel);

    browser.close().await.expect("Failed to close browser");
}

/// Build the mock edit surface used by the end-to-end test: a search box
/// that reveals an info panel (after a delay), an edit control that opens a
/// menu, a menu entry that reveals a label+input form, a submit button and a
/// confirmation dialog.
const MOCK_SETUP: &str = r#"
    document.body.innerHTML =
        "<input id='searchboxinput' style='width:300px;height:30px'>" +
        "<div id='panel' role='complementary' style='display:none;width:400px;height:500px'>" +
        "  <button id='edit' aria-label='Suggest an edit'" +
        "          style='width:160px;height:32px'>Suggest an edit</button>" +
        "</div>" +
        "<div id='menu' style='display:none'>" +
        "  <div role='menuitem' style='width:200px;height:24px'>×</div>" +
        "  <div role='menuitem' style='width:200px;height:24px'>Hours</div>" +
        "  <div id='entry' role='menuitem' style='width:200px;height:24px'>Test Cafe Current</div>" +
        "</div>" +
        "<div id='form' style='display:none'>" +
        "  <div><span>Place name</span>" +
        "  <input id='nameInput' style='width:240px;height:28px'></div>" +
        "  <button id='submitBtn' style='width:100px;height:30px'>Submit</button>" +
        "</div>" +
        "<div id='dialog' role='dialog' style='display:none'>" +
        "  <button id='ok' style='width:80px;height:30px'>Got it</button>" +
        "</div>";

    const show = (id) => document.getElementById(id).style.display = 'block';
    window.__confirmed = false;

    document.getElementById('searchboxinput').addEventListener('keydown', (ev) => {
        if (ev.key === 'Enter') { setTimeout(() => show('panel'), 1200); }
    });
    document.getElementById('edit').addEventListener('click', () => show('menu'));
    document.getElementById('entry').addEventListener('click', () => show('form'));
    document.getElementById('submitBtn').addEventListener('click', () => show('dialog'));
    document.getElementById('ok').addEventListener('click', () => {
        window.__confirmed = true;
        document.getElementById('dialog').style.display = 'none';
    });
"#;

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_end_to_end_mock_edit() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let config = EngineConfig {
        headless: true,
        click_delay_ms: 100,
        search_settle_ms: 500,
        panel_attempts: 3,
        panel_interval_ms: 1000,
        field_attempts: 5,
        field_interval_ms: 500,
        confirm_attempts: 4,
        confirm_interval_ms: 250,
        manual_wait_ms: 100,
        ..EngineConfig::default()
    };

    let (browser, _dir) = launch(config).await;
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");
    page.execute(MOCK_SETUP).await.expect("Failed to build mock");

    let flow = EditFlow::new(page.clone());
    let request = EditRequest::new("Test Cafe").with_name("New Name");
    let report = flow.run(&request).await;

    // The mandatory field path must complete cleanly
    assert_eq!(report.name, Some(mapmod::StageOutcome::Completed));
    assert!(report.succeeded());

    // The replacement value actually landed in the field
    let value: String = page
        .evaluate("document.getElementById('nameInput').value")
        .await
        .expect("value read");
    assert_eq!(value, "New Name");

    // The confirmation dialog was found and dismissed
    let confirmed: bool = page
        .evaluate("window.__confirmed === true")
        .await
        .expect("confirm read");
    assert!(confirmed, "confirmation dialog was not dismissed");

    // No click left the suppression protocol engaged
    assert!(!flow.dispatcher().suppressing());

    browser.close().await.expect("Failed to close browser");
}
