//! Launch-time stealth
//!
//! Chrome discovery, launch flags that keep the automation banner and
//! fingerprint surface quiet, a realistic user agent, and the bootstrap
//! script every new document receives (navigator overrides plus the
//! suppression-flag seed the click observer relies on).

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::dispatch::SUPPRESS_FLAG;
use crate::error::{Error, Result};
use crate::EngineConfig;

/// Recent Chrome versions for user-agent generation
const CHROME_VERSIONS: &[&str] = &["126.0.0.0", "127.0.0.0", "128.0.0.0", "129.0.0.0", "130.0.0.0"];

/// macOS versions seen in real user agents
const MACOS_VERSIONS: &[&str] = &["10_15_7", "12_6_0", "13_4_0", "14_2_0", "14_4_0"];

/// Generate a random realistic user agent
pub fn random_user_agent() -> String {
    let mut rng = rand::thread_rng();
    let chrome = CHROME_VERSIONS.choose(&mut rng).unwrap();

    if rng.gen_bool(0.7) {
        let macos = MACOS_VERSIONS.choose(&mut rng).unwrap();
        format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X {}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
            macos, chrome
        )
    } else {
        format!(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
            chrome
        )
    }
}

/// Find an installed Chrome/Chromium binary
pub fn find_chrome() -> Result<PathBuf> {
    let candidates = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    } else {
        vec![]
    };

    for candidate in candidates {
        let path = Path::new(candidate);
        if path.exists() {
            return Ok(path.to_path_buf());
        }
    }

    Err(Error::ChromeNotFound)
}

/// Launch arguments for a quiet, natural-looking Chrome
pub fn launch_args(config: &EngineConfig) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".into(),
        "--disable-features=IsolateOrigins,site-per-process".into(),
        "--disable-site-isolation-trials".into(),
        "--disable-infobars".into(),
        "--disable-dev-shm-usage".into(),
        "--no-sandbox".into(),
        "--disable-setuid-sandbox".into(),
        "--no-first-run".into(),
        "--no-default-browser-check".into(),
        "--disable-default-apps".into(),
        "--disable-popup-blocking".into(),
        "--disable-sync".into(),
        "--disable-translate".into(),
        "--password-store=basic".into(),
        "--use-mock-keychain".into(),
        "--lang=en-US,en".into(),
        format!(
            "--window-size={},{}",
            config.viewport_width, config.viewport_height
        ),
    ];

    let user_agent = config.user_agent.clone().unwrap_or_else(random_user_agent);
    args.push(format!("--user-agent={}", user_agent));

    if config.headless {
        args.push("--headless=new".into());
    }

    args
}

/// Script injected into every new document before any page code runs
///
/// Hides the obvious automation signals and seeds the per-document
/// suppression flag so the manual-click observer has a defined value to
/// check from the first event on.
pub fn bootstrap_script() -> String {
    format!(
        r#"
        Object.defineProperty(navigator, 'webdriver', {{
            get: () => undefined
        }});
        Object.defineProperty(navigator, 'plugins', {{
            get: () => [1, 2, 3, 4, 5]
        }});
        Object.defineProperty(navigator, 'languages', {{
            get: () => ['en-US', 'en']
        }});
        window.{flag} = false;
        "#,
        flag = SUPPRESS_FLAG
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_looks_like_chrome() {
        let ua = random_user_agent();
        assert!(ua.starts_with("Mozilla/5.0"));
        assert!(ua.contains("Chrome/"));
    }

    #[test]
    fn headless_flag_follows_config() {
        let mut config = EngineConfig::default();
        config.headless = true;
        assert!(launch_args(&config).iter().any(|a| a == "--headless=new"));

        config.headless = false;
        assert!(!launch_args(&config).iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn bootstrap_seeds_suppression_flag() {
        let script = bootstrap_script();
        assert!(script.contains(SUPPRESS_FLAG));
        assert!(script.contains("webdriver"));
    }
}
