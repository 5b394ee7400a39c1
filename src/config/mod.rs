//! Site configuration management for `oxen.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[site]`    | Site metadata (name, author, url, license)       |
//! | `[build]`   | Content, output, templates, static, workers      |
//! | `[serve]`   | Preview server (port, interface, watch)          |
//! | `[extra]`   | User-defined fields, available to templates      |
//!
//! The file is optional; every field has a default. `--config-json` replaces
//! the file with an inline JSON document of the same shape.
//!
//! # Example
//!
//! ```toml
//! [site]
//! name = "Garden"
//! url = "https://notes.example.com"
//!
//! [build]
//! content = "notes"
//! output = "public"
//!
//! [serve]
//! port = 8080
//! ```

mod build;
pub mod defaults;
mod error;
mod handle;
mod serve;
mod site;

pub use error::ConfigError;
pub use handle::{cfg, init_config, reload_config};
pub use site::SiteSection;

use build::BuildSection;
use serve::ServeSection;

use crate::{
    cli::{Cli, Commands},
    utils::path::normalize_path,
};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing oxen.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Site metadata
    #[serde(default)]
    pub site: SiteSection,

    /// Build settings
    #[serde(default)]
    pub build: BuildSection,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeSection,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Parse configuration from an inline JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: SiteConfig = serde_json::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load, apply CLI overrides, and validate.
    ///
    /// Source precedence: `--config-json`, then the config file, then defaults.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = match &cli.config_json {
            Some(json) => Self::from_json(json)?,
            None if config_path.exists() => Self::from_path(&config_path)?,
            None => Self::default(),
        };
        config.update_with_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Source file consumed by the site index instead of being rendered.
    pub fn preamble_path(&self) -> &str {
        &self.build.preamble
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.update_path_with_root(cli, &root);

        if let Some(args) = cli.build_args() {
            self.build.force |= args.force;
            Self::update_option(&mut self.build.workers, args.workers.as_ref());
        }

        if let Commands::Serve {
            interface,
            port,
            watch,
            ..
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
            self.site.url = Some(format!(
                "http://{}:{}",
                self.serve.interface, self.serve.port
            ));
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, cli: &Cli, root: &Path) {
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        let root = normalize_path(&Self::expand_tilde(root));
        self.set_root(&root);

        self.config_path = normalize_path(&root.join(&cli.config));

        let resolve = |path: &Path| normalize_path(&root.join(Self::expand_tilde(path)));
        self.build.content = resolve(&self.build.content);
        self.build.output = resolve(&self.build.output);
        self.build.templates = resolve(&self.build.templates);
        self.build.static_dir = resolve(&self.build.static_dir);
    }

    /// Expand a leading `~` to the home directory.
    fn expand_tilde(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        }
    }

    /// Validate configuration after paths are resolved
    pub fn validate(&self) -> Result<()> {
        if !self.build.content.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.content] `{}` is not a directory",
                self.build.content.display()
            )));
        }

        if self.build.output == self.build.content {
            bail!(ConfigError::Validation(
                "[build.output] must differ from [build.content]".into()
            ));
        }

        if let Some(url) = &self.site.url
            && !url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[site.url] must start with http:// or https://".into()
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
