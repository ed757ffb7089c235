use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::ServeError;

/// Command-line flags; anything given here overrides the config file.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub listen_addr: Option<String>,

    /// Directory served as the mount root
    #[arg(short, long)]
    pub serve_dir: Option<PathBuf>,

    /// Mount pattern, e.g. `/*` or `/static/*`
    #[arg(short, long)]
    pub route: Option<String>,

    /// Index document for `/` and directories
    #[arg(short, long)]
    pub index: Option<String>,

    /// Serve the root index for unresolved paths
    #[arg(long)]
    pub spa: bool,

    /// Extensions that keep a 404 in SPA mode
    #[arg(long, value_delimiter = ',')]
    pub spa_exclude: Vec<String>,

    /// Drop the route's last segment when the request repeats it
    #[arg(long)]
    pub ignore_base: bool,

    /// Encoding tokens in priority order
    #[arg(long, value_delimiter = ',')]
    pub encodings: Option<Vec<String>>,

    /// File extensions matching `--encodings`, in the same order
    #[arg(long, value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Regex of request paths that bypass static lookup
    #[arg(long = "skip")]
    pub skip: Vec<String>,

    /// Second root tried before giving up
    #[arg(long)]
    pub fallback_dir: Option<PathBuf>,
}

impl Args {
    pub fn settings(&self) -> Result<Settings, ServeError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings);
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(addr) = &self.listen_addr {
            settings.listen_addr = addr.clone();
        }
        if let Some(dir) = &self.serve_dir {
            settings.root = dir.clone();
        }
        if let Some(route) = &self.route {
            settings.route = route.clone();
        }
        if let Some(index) = &self.index {
            settings.index = index.clone();
        }
        settings.html5 |= self.spa;
        settings.ignore_base |= self.ignore_base;
        if !self.spa_exclude.is_empty() {
            settings.spa_exclude = self.spa_exclude.clone();
        }
        if let Some(encodings) = &self.encodings {
            settings.encodings = encodings.clone();
        }
        if let Some(extensions) = &self.extensions {
            settings.extensions = extensions.clone();
        }
        settings.skip.extend(self.skip.iter().cloned());
        if self.fallback_dir.is_some() {
            settings.fallback_dir = self.fallback_dir.clone();
        }
    }
}
