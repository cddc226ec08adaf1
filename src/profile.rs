//! Browser profile selection
//!
//! A profile directory is one signed-in identity. Persistent runs reuse a
//! fixed directory so the sign-in survives between invocations; fresh runs
//! derive a directory that has never been used so no cookies or state carry
//! over.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Which browser profile a run should use
#[derive(Debug, Clone)]
pub enum SessionProfile {
    /// Reuse the fixed profile directory, creating it on first run
    Persistent(PathBuf),
    /// Derive an unused directory under the given base path
    Fresh(PathBuf),
}

impl SessionProfile {
    /// Persistent profile at the conventional location under `base`
    pub fn persistent(base: impl AsRef<Path>) -> Self {
        Self::Persistent(base.as_ref().join("browser_data"))
    }

    /// Fresh profile under `base`
    pub fn fresh(base: impl AsRef<Path>) -> Self {
        Self::Fresh(base.as_ref().to_path_buf())
    }

    /// Resolve to a concrete directory, creating it
    ///
    /// Fresh profiles get a time-suffixed name; if two runs land on the same
    /// second the suffix is incremented until an unused directory is found.
    pub fn resolve(&self) -> Result<PathBuf> {
        let dir = match self {
            Self::Persistent(dir) => dir.clone(),
            Self::Fresh(base) => {
                let stamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                let mut n = 0u64;
                loop {
                    let candidate = if n == 0 {
                        base.join(format!("browser_data_{}", stamp))
                    } else {
                        base.join(format!("browser_data_{}_{}", stamp, n))
                    };
                    if !candidate.exists() {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Whether this profile may carry a previous sign-in
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_resolves_to_fixed_dir() {
        let base = tempfile::tempdir().unwrap();
        let profile = SessionProfile::persistent(base.path());

        let first = profile.resolve().unwrap();
        let second = profile.resolve().unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with("browser_data"));
    }

    #[test]
    fn fresh_never_reuses_a_directory() {
        let base = tempfile::tempdir().unwrap();
        let profile = SessionProfile::fresh(base.path());

        let first = profile.resolve().unwrap();
        let second = profile.resolve().unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn fresh_is_not_persistent() {
        assert!(SessionProfile::persistent(".").is_persistent());
        assert!(!SessionProfile::fresh(".").is_persistent());
    }
}
