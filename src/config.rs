use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compression::{
    EncodingTable, BROTLI_ENCODING, BROTLI_EXTENSION, GZIP_ENCODING, GZIP_EXTENSION,
};
use crate::error::ServeError;
use crate::file_serving::spa::SpaFallback;
use crate::http::Request;
use crate::logging::LoggingExt;

pub const DEFAULT_INDEX: &str = "index.html";
pub const DEFAULT_ROUTE: &str = "/*";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Decides per request whether the static mount steps aside for the next handler.
pub type Skipper = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

pub fn never_skip() -> Skipper {
    Arc::new(|_| false)
}

/// Skips requests whose escaped path matches any of `patterns`.
pub fn skip_matching(patterns: Vec<Regex>) -> Skipper {
    Arc::new(move |request| patterns.iter().any(|p| p.is_match(&request.path)))
}

/// Settings of one static mount. Read-only once the mount is built.
#[derive(Clone)]
pub struct StaticConfig {
    /// Directory served as `/`. Empty means the working directory.
    pub root: PathBuf,
    /// Document served for directories and `/`.
    pub index: String,
    pub spa: Option<SpaFallback>,
    pub encodings: EncodingTable,
    /// Drop the route's last segment when the request repeats it.
    pub ignore_base: bool,
    pub skipper: Skipper,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            index: DEFAULT_INDEX.to_string(),
            spa: None,
            encodings: EncodingTable::default(),
            ignore_base: false,
            skipper: never_skip(),
        }
    }
}

impl StaticConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Fills in defaults for blank fields and rejects what cannot be served.
    pub fn validated(mut self) -> Result<Self, ServeError> {
        if self.root.as_os_str().is_empty() {
            self.root = PathBuf::from(".");
        }
        if self.index.trim().is_empty() {
            self.index = DEFAULT_INDEX.to_string();
        }
        if self.index.contains('\0') || self.index.split('/').any(|s| s == "..") {
            return Err(ServeError::ConfigInvalid(format!(
                "invalid index document {:?}",
                self.index
            )));
        }
        Ok(self)
    }
}

impl fmt::Debug for StaticConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticConfig")
            .field("root", &self.root)
            .field("index", &self.index)
            .field("spa", &self.spa)
            .field("encodings", &self.encodings)
            .field("ignore_base", &self.ignore_base)
            .finish_non_exhaustive()
    }
}

/// Process settings, loadable from a TOML file and overridable from the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    /// Mount pattern, e.g. `/*` or `/static/*`.
    pub route: String,
    pub root: PathBuf,
    pub index: String,
    /// SPA fallback to the root index.
    pub html5: bool,
    pub ignore_base: bool,
    /// Encoding tokens in priority order; parallel to `extensions`.
    pub encodings: Vec<String>,
    pub extensions: Vec<String>,
    /// Regexes of request paths handed straight to the next handler.
    pub skip: Vec<String>,
    /// Extensions that never get the SPA fallback.
    pub spa_exclude: Vec<String>,
    /// Second root consulted when the first has no match.
    pub fallback_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            root: PathBuf::from("."),
            index: DEFAULT_INDEX.to_string(),
            html5: false,
            ignore_base: false,
            encodings: vec![BROTLI_ENCODING.to_string(), GZIP_ENCODING.to_string()],
            extensions: vec![BROTLI_EXTENSION.to_string(), GZIP_EXTENSION.to_string()],
            skip: Vec::new(),
            spa_exclude: Vec::new(),
            fallback_dir: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ServeError> {
        let data = path
            .log_operation("read config", || fs::read_to_string(path))
            .map_err(|e| ServeError::ConfigInvalid(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&data)
            .map_err(|e| ServeError::ConfigInvalid(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Config of the primary mount.
    pub fn static_config(&self) -> Result<StaticConfig, ServeError> {
        let patterns = self
            .skip
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ServeError::ConfigInvalid(format!("skip {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let skipper = if patterns.is_empty() {
            never_skip()
        } else {
            skip_matching(patterns)
        };

        StaticConfig {
            root: self.root.clone(),
            index: self.index.clone(),
            spa: self
                .html5
                .then(|| SpaFallback::excluding(&self.spa_exclude)),
            encodings: EncodingTable::new(&self.encodings, &self.extensions)?,
            ignore_base: self.ignore_base,
            skipper,
        }
        .validated()
    }

    /// Config of the fallback mount: same documents and encodings, no SPA, no skipping.
    pub fn fallback_config(&self) -> Result<Option<StaticConfig>, ServeError> {
        let Some(dir) = &self.fallback_dir else {
            return Ok(None);
        };
        StaticConfig {
            root: dir.clone(),
            index: self.index.clone(),
            spa: None,
            encodings: EncodingTable::new(&self.encodings, &self.extensions)?,
            ignore_base: self.ignore_base,
            skipper: never_skip(),
        }
        .validated()
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_factory_returns_independent_values() {
        let mut first = StaticConfig::default();
        first.index = "home.html".into();
        first.spa = Some(SpaFallback::new());

        let second = StaticConfig::default();
        assert_eq!(second.index, "index.html");
        assert!(second.spa.is_none());
        assert_eq!(second.root, PathBuf::from("."));
        assert!(!second.ignore_base);
        assert_eq!(second.encodings, EncodingTable::default());
        assert!(!(second.skipper)(&Request::get("/")));
    }

    #[test]
    fn blank_fields_take_defaults() {
        let config = StaticConfig {
            root: PathBuf::new(),
            index: " ".into(),
            ..StaticConfig::default()
        }
        .validated()
        .unwrap();
        assert_eq!(config.root, PathBuf::from("."));
        assert_eq!(config.index, "index.html");
    }

    #[test]
    fn index_may_not_climb() {
        let err = StaticConfig {
            index: "../secret.html".into(),
            ..StaticConfig::default()
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, ServeError::ConfigInvalid(_)));
    }

    #[test]
    fn settings_toml_custom_values() {
        let toml = r#"
            root = "/site"
            html5 = true
            encodings = ["zstd", "br"]
            extensions = [".zst", ".br"]
            skip = ["^/api/"]
            spa_exclude = ["js"]
        "#;
        let settings = Settings::from_toml(toml).unwrap();
        assert_eq!(settings.root, PathBuf::from("/site"));
        assert_eq!(settings.index, "index.html");
        assert_eq!(settings.route, "/*");
        assert!(settings.fallback_dir.is_none());

        let config = settings.static_config().unwrap();
        let tokens: Vec<_> = config.encodings.iter().map(|e| e.token.as_str()).collect();
        assert_eq!(tokens, ["zstd", "br"]);
        assert!(config.spa.as_ref().is_some_and(|s| !s.applies_to("/a.js")));
        assert!((config.skipper)(&Request::get("/api/users")));
        assert!(!(config.skipper)(&Request::get("/app")));
    }

    #[test]
    fn mismatched_encoding_lists_fail_at_construction() {
        let settings = Settings::from_toml(r#"encodings = ["br"]"#).unwrap();
        let err = settings.static_config().unwrap_err();
        assert!(matches!(err, ServeError::ConfigInvalid(_)));
    }

    #[test]
    fn bad_skip_regex_is_a_config_error() {
        let settings = Settings {
            skip: vec!["(".into()],
            ..Settings::default()
        };
        assert!(matches!(
            settings.static_config().unwrap_err(),
            ServeError::ConfigInvalid(_)
        ));
    }

    #[test]
    fn fallback_mount_never_uses_spa() {
        let settings = Settings {
            html5: true,
            fallback_dir: Some(PathBuf::from("/other")),
            ..Settings::default()
        };
        let fallback = settings.fallback_config().unwrap().unwrap();
        assert_eq!(fallback.root, PathBuf::from("/other"));
        assert!(fallback.spa.is_none());
        assert!(Settings::default().fallback_config().unwrap().is_none());
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Settings::load(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ServeError::ConfigInvalid(_)));

        let path = tmp.path().join("prestatic.toml");
        fs::write(&path, "index = \"app.html\"\n").unwrap();
        assert_eq!(Settings::load(&path).unwrap().index, "app.html");
    }
}
