//! Mapmod CLI
//!
//! Searches for a place listing and submits a suggested name and/or address
//! edit. Sign-in state lives in the profile directory: run once with
//! `--signin-wait 60`, sign in by hand, and later runs reuse the session.
//!
//! Usage examples:
//!   $ mapmod --search "Starbucks Seattle" --name "Better Coffee Shop"
//!   $ mapmod --search "Target Store" --address "123 Main St, Seattle, WA"
//!   $ mapmod --search "Location" --name "New Name" --fresh-session --signin-wait 60

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use mapmod::{
    Browser, ClickObserver, EditFlow, EditRequest, EngineConfig, SessionProfile, StageOutcome,
};

/// Submit suggested edits to map listings
#[derive(Parser)]
#[command(name = "mapmod", version)]
struct Cli {
    /// Location to search for
    #[arg(short, long, env = "MAPMOD_SEARCH")]
    search: String,

    /// New name for the location
    #[arg(long, env = "MAPMOD_NAME")]
    name: Option<String>,

    /// New address for the location
    #[arg(long, env = "MAPMOD_ADDRESS")]
    address: Option<String>,

    /// Run the browser headless (not recommended: sign-in needs a window)
    #[arg(long, env = "MAPMOD_HEADLESS")]
    headless: bool,

    /// Seconds to wait for a manual sign-in before starting
    #[arg(long, default_value_t = 0, env = "MAPMOD_SIGNIN_WAIT")]
    signin_wait: u64,

    /// Start a fresh session (ignores any saved sign-in)
    #[arg(long, env = "MAPMOD_FRESH_SESSION")]
    fresh_session: bool,

    /// Record details of elements you click manually (selector discovery)
    #[arg(long, env = "MAPMOD_CAPTURE_CLICKS")]
    capture_clicks: bool,

    /// Delay in milliseconds after each automated click
    #[arg(long, default_value_t = 500, env = "MAPMOD_CLICK_DELAY_MS")]
    click_delay_ms: u64,

    /// Info-panel poll attempts (one second apart)
    #[arg(long, default_value_t = 3, env = "MAPMOD_PANEL_WAIT")]
    panel_wait: u32,

    /// Do not dismiss the post-submit confirmation dialog
    #[arg(long)]
    no_confirm: bool,

    /// Base directory for profiles and click captures
    #[arg(long, default_value = ".", env = "MAPMOD_DATA_DIR")]
    data_dir: PathBuf,
}

fn describe(outcome: &StageOutcome) -> String {
    match outcome {
        StageOutcome::Completed => "completed".to_string(),
        StageOutcome::Assumed { reason } => format!("assumed ({})", reason),
        StageOutcome::Failed { reason } => format!("FAILED ({})", reason),
    }
}

#[tokio::main]
async fn main() -> mapmod::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let request = {
        let mut request = EditRequest::new(cli.search.clone());
        request.new_name = cli.name.clone();
        request.new_address = cli.address.clone();
        request
    };
    if !request.has_edit() {
        eprintln!("error: at least one of --name or --address is required");
        std::process::exit(2);
    }

    let config = EngineConfig {
        headless: cli.headless,
        click_delay_ms: cli.click_delay_ms,
        panel_attempts: cli.panel_wait,
        confirm_after_submit: !cli.no_confirm,
        capture_clicks: cli.capture_clicks,
        capture_dir: cli
            .data_dir
            .join("captured_clicks")
            .to_string_lossy()
            .into_owned(),
        debug_dir: Some(cli.data_dir.join("debug").to_string_lossy().into_owned()),
        ..EngineConfig::default()
    };

    let profile = if cli.fresh_session {
        info!("new session - sign-in will not be remembered from earlier runs");
        SessionProfile::fresh(&cli.data_dir)
    } else {
        SessionProfile::persistent(&cli.data_dir)
    };

    let start_url = config.start_url.clone();
    let capture_dir = config.capture_dir.clone();
    let capture_clicks = config.capture_clicks;

    let browser = Browser::launch(config, &profile).await?;
    let page = browser.new_page(&start_url).await?;

    if capture_clicks {
        let observer = ClickObserver::install(page.clone(), &capture_dir).await?;
        tokio::spawn(observer.run());
        info!("manual-click capture enabled: {}", capture_dir);
    }

    let flow = EditFlow::new(page);

    // Sign-in gate
    if cli.signin_wait > 0 {
        flow.wait_for_signin(cli.signin_wait).await;
    } else if !flow.is_signed_in().await {
        warn!("not signed in - rerun with --signin-wait 60 and sign in once;");
        warn!("the session is saved in the profile directory for later runs");
        browser.close().await?;
        std::process::exit(1);
    }

    // Ctrl-C must still close the browser so the profile stays consistent
    let report = tokio::select! {
        report = flow.run(&request) => Some(report),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; shutting the browser down");
            None
        }
    };

    let Some(report) = report else {
        browser.close().await?;
        std::process::exit(130);
    };

    info!("edit run finished");
    if let Some(outcome) = &report.name {
        info!("  name edit: {}", describe(outcome));
    }
    if let Some(outcome) = &report.address {
        info!("  address edit: {}", describe(outcome));
    }
    info!("note: accepted edits are subject to the service's review process");

    // Leave the window up briefly so the operator can verify
    info!("keeping the browser open for 30s");
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;

    browser.close().await?;

    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
