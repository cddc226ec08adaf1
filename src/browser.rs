//! Browser Launcher
//!
//! Finds Chrome, launches it against the chosen profile directory with the
//! stealth flags, connects over CDP and hands out pages with the bootstrap
//! script pre-installed. Profile directories are never deleted - they ARE
//! the persisted session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cdp::{transport::launch_chrome, Connection, Transport};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::profile::SessionProfile;
use crate::stealth;
use crate::EngineConfig;

/// A running Chrome under CDP control
pub struct Browser {
    connection: Connection,
    config: Arc<EngineConfig>,
    profile_dir: PathBuf,
}

impl Browser {
    /// Launch Chrome with the given config and profile
    pub async fn launch(config: EngineConfig, profile: &SessionProfile) -> Result<Self> {
        let config = Arc::new(config);

        let profile_dir = profile.resolve()?;
        if profile.is_persistent() {
            tracing::info!("using persistent profile: {}", profile_dir.display());
        } else {
            tracing::info!("fresh profile: {}", profile_dir.display());
        }

        let chrome_path = match &config.chrome_path {
            Some(p) => PathBuf::from(p),
            None => stealth::find_chrome()?,
        };

        let mut args = stealth::launch_args(&config);
        args.push(format!("--user-data-dir={}", profile_dir.display()));

        tracing::info!("launching Chrome from {:?}", chrome_path);
        let (child, ws_url) = launch_chrome(&chrome_path, &args)?;

        let transport = Transport::new(child, &ws_url)?;
        let connection = Connection::new(transport);

        let version = connection.version().await?;
        tracing::info!("connected to Chrome: {}", version.product);

        Ok(Self {
            connection,
            config,
            profile_dir,
        })
    }

    /// Create a new page and navigate it
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let target_id = self.connection.create_target("about:blank").await?;
        let session = self.connection.attach_to_target(&target_id).await?;

        session.page_enable().await?;

        // Bootstrap must be registered before the first real navigation so
        // every document (frames included) starts with the overrides and a
        // defined suppression flag
        session
            .add_script_to_evaluate_on_new_document(&stealth::bootstrap_script())
            .await?;

        let nav = session.navigate(url).await?;
        if let Some(error) = nav.error_text {
            return Err(Error::Navigation(error));
        }

        // Brief settle for the load to start; callers poll from here
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        Ok(Page::new(session, Arc::clone(&self.config)))
    }

    /// Browser version string
    pub async fn version(&self) -> Result<String> {
        let v = self.connection.version().await?;
        Ok(v.product)
    }

    /// The profile directory this browser is running against
    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    /// Close the browser, leaving the profile directory intact
    pub async fn close(self) -> Result<()> {
        self.connection.close().await
    }
}
