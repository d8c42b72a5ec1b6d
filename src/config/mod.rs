//! Profile locations and the store/engine configuration derived from them.
//!
//! A profile root is laid out as:
//!
//! ```text
//! Profiles/
//! ├── sample-providers.json      providers to run
//! └── Templates/
//!     ├── *.template.*           templates
//!     ├── Collections/           *.collections.json, *.collections.csv
//!     ├── Fonts/                 *.ttf, *.otf for Image providers
//!     └── Protos/                *.proto for Proto providers
//! ```

mod duration;

pub use duration::parse_duration;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use synth_engine::EngineConfig;
use synth_provider::Profile;
use synth_template::{StoreConfig, TEMPLATES_DIR};

pub const DEFAULT_PROFILE_ROOT: &str = "Profiles";
pub const DEFAULT_PROFILE_FILE: &str = "sample-providers.json";
pub const FONTS_DIR: &str = "Fonts";
pub const PROTOS_DIR: &str = "Protos";

#[derive(Parser, Debug, Clone)]
pub struct ProfileOpts {
    /// Directory holding the profile file and its Templates directory
    #[arg(long, default_value = DEFAULT_PROFILE_ROOT, env = "DATASYNTH_PROFILE_ROOT")]
    pub profile_root: PathBuf,

    /// Profile file, relative to the profile root unless absolute (.json, .yaml or .yml)
    #[arg(long, default_value = DEFAULT_PROFILE_FILE, env = "DATASYNTH_PROFILE")]
    pub profile: PathBuf,

    /// Seed for the one-time shuffle of CSV collections, for reproducible output
    #[arg(long, env = "DATASYNTH_SHUFFLE_SEED")]
    pub shuffle_seed: Option<u64>,
}

impl ProfileOpts {
    pub fn new(profile_root: impl Into<PathBuf>) -> Self {
        Self {
            profile_root: profile_root.into(),
            profile: PathBuf::from(DEFAULT_PROFILE_FILE),
            shuffle_seed: None,
        }
    }

    pub fn profile_path(&self) -> PathBuf {
        if self.profile.is_absolute() {
            self.profile.clone()
        } else {
            self.profile_root.join(&self.profile)
        }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.profile_root.join(TEMPLATES_DIR)
    }

    pub fn store_config(&self) -> StoreConfig {
        let config = StoreConfig::from_root(&self.profile_root);
        match self.shuffle_seed {
            Some(seed) => config.with_shuffle_seed(seed),
            None => config,
        }
    }

    /// Fonts and protos directories, set only when they exist.
    pub fn engine_config(&self) -> EngineConfig {
        let existing = |name: &str| {
            let dir = self.templates_dir().join(name);
            dir.is_dir().then_some(dir)
        };
        EngineConfig {
            fonts_dir: existing(FONTS_DIR),
            protos_dir: existing(PROTOS_DIR),
        }
    }

    pub fn load_profile(&self) -> anyhow::Result<Profile> {
        let path = self.profile_path();
        let profile = Profile::load(&path)
            .with_context(|| format!("Failed to load profile from {}", path.display()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_profile_root() {
        let opts = ProfileOpts::new("/data/Profiles");
        assert_eq!(
            opts.profile_path(),
            PathBuf::from("/data/Profiles/sample-providers.json")
        );
        assert_eq!(opts.templates_dir(), PathBuf::from("/data/Profiles/Templates"));

        let config = opts.store_config();
        assert_eq!(config.templates_dir, PathBuf::from("/data/Profiles/Templates"));
        assert_eq!(
            config.collections_dir,
            PathBuf::from("/data/Profiles/Templates/Collections")
        );
        assert_eq!(config.shuffle_seed, None);
    }

    #[test]
    fn test_absolute_profile_path_is_kept() {
        let mut opts = ProfileOpts::new("Profiles");
        opts.profile = PathBuf::from("/etc/datasynth/providers.yaml");
        assert_eq!(
            opts.profile_path(),
            PathBuf::from("/etc/datasynth/providers.yaml")
        );
    }

    #[test]
    fn test_engine_config_only_lists_existing_dirs() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("Templates").join(FONTS_DIR)).unwrap();
        let opts = ProfileOpts::new(root.path());

        let config = opts.engine_config();
        assert_eq!(
            config.fonts_dir,
            Some(root.path().join("Templates").join(FONTS_DIR))
        );
        assert_eq!(config.protos_dir, None);
    }

    #[test]
    fn test_shuffle_seed_is_forwarded() {
        let mut opts = ProfileOpts::new("Profiles");
        opts.shuffle_seed = Some(7);
        assert_eq!(opts.store_config().shuffle_seed, Some(7));
    }
}
