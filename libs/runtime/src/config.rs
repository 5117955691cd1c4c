use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::home_dir::resolve_home_dir;

const DEFAULT_SUBDIR: &str = ".storefront";
const MEMORY_DSN: &str = "sqlite::memory:";

/// Main application configuration with strongly-typed global sections
/// and a per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    /// Uses [`default_logging_config`] when absent.
    pub logging: Option<LoggingConfig>,
    /// module_name → arbitrary YAML/JSON value, decoded by the module itself.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Normalized to an absolute path on load.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// e.g. "sqlite://database/storefront.db?mode=rwc" or "sqlite::memory:".
    /// Relative sqlite paths are resolved against `server.home_dir`.
    pub url: String,
    /// Pool size, defaults to 10.
    pub max_conns: Option<u32>,
}

/// Subsystem name (crate target prefix) → logging settings.
/// Key "default" applies to every target without its own entry.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Section {
    /// "trace" | "debug" | "info" | "warn" | "error" | "off"
    pub console_level: String,
    /// Log file, relative to home_dir unless absolute. Empty disables the file sink.
    #[serde(default)]
    pub file: String,
    /// Empty inherits the "default" section's file level.
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty => platform default resolved by resolve_home_dir()
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/storefront.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: Some(DatabaseConfig {
                url: "sqlite://database/storefront.db?mode=rwc".to_string(),
                max_conns: Some(10),
            }),
            logging: Some(default_logging_config()),
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Layered loading: defaults → YAML file → `APP__*` environment variables.
    /// `server.home_dir` is normalized to an absolute path and created.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            return Err(anyhow!("config file not found: {}", path.display()));
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            server: ServerConfig::default(),
            database: None,
            logging: None,
            modules: HashMap::new(),
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // APP__SERVER__PORT=3005 maps to server.port
            .merge(Env::prefixed("APP__").split("__"));

        let mut config: AppConfig = figment
            .extract()
            .with_context(|| format!("failed to load config from {}", path.display()))?;

        normalize_home_dir_inplace(&mut config.server)
            .context("failed to resolve server.home_dir")?;

        Ok(config)
    }

    /// Load from `config_path` when given, otherwise use built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut c = Self::default();
                normalize_home_dir_inplace(&mut c.server)
                    .context("failed to resolve server.home_dir (defaults)")?;
                Ok(c)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize config to YAML")
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.mock {
            let db = self.database.get_or_insert_with(|| DatabaseConfig {
                url: String::new(),
                max_conns: None,
            });
            db.url = MEMORY_DSN.to_string();
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    /// Decode the `modules.<name>` entry; a missing entry yields `T::default()`.
    pub fn module_config<T>(&self, name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(name) {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("invalid configuration for module '{name}'")),
        }
    }

    pub fn home_dir(&self) -> &Path {
        Path::new(&self.server.home_dir)
    }
}

impl DatabaseConfig {
    /// Connection URL with relative sqlite paths anchored at `base_dir`.
    /// Parent directories of file databases are created.
    pub fn resolved_url(&self, base_dir: &Path) -> Result<String> {
        let dsn = self.url.trim();
        if dsn.is_empty() {
            return Err(anyhow!("database.url is not configured"));
        }
        if dsn.starts_with("sqlite:") {
            return absolutize_sqlite_dsn(dsn, base_dir);
        }
        Ok(dsn.to_string())
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let configured = Some(server.home_dir.clone());
    let resolved: PathBuf = resolve_home_dir(configured, DEFAULT_SUBDIR, true)?;
    server.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }

    let rest = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("sqlite DSN must start with sqlite:// (got: {dsn})"))?;

    let (path_str, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if query.is_some_and(|q| q.contains("mode=memory")) {
        return Ok(dsn.to_string());
    }
    if path_str.is_empty() {
        return Err(anyhow!("empty sqlite path in DSN"));
    }

    let mut path = PathBuf::from(path_str);
    if path.is_relative() {
        path = base_dir.join(path);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create database dir {}", dir.display()))?;
    }

    let mut out = String::from("sqlite://");
    out.push_str(&path.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use tempfile::tempdir;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct DemoModuleConfig {
        #[serde(default)]
        answer: u32,
    }

    #[test]
    fn default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.home_dir, "");

        let db = config.database.as_ref().unwrap();
        assert_eq!(db.url, "sqlite://database/storefront.db?mode=rwc");
        assert_eq!(db.max_conns, Some(10));

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "info");
        assert_eq!(logging["default"].file, "logs/storefront.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn load_layered_reads_yaml_and_normalizes_home() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("home");
            jail.create_file(
                "cfg.yaml",
                &format!(
                    r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090
database:
  url: "sqlite://db/test.db"
  max_conns: 4
logging:
  default:
    console_level: debug
    file: "logs/default.log"
modules:
  storefront:
    storage:
      assets_dir: "assets"
"#,
                    home.display()
                ),
            )?;

            let config = AppConfig::load_layered("cfg.yaml").unwrap();

            assert_eq!(PathBuf::from(&config.server.home_dir), home);
            assert!(home.is_dir());
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.database.as_ref().unwrap().max_conns, Some(4));
            assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");
            assert_eq!(
                config.modules["storefront"]["storage"]["assets_dir"],
                serde_json::json!("assets")
            );
            Ok(())
        });
    }

    #[test]
    fn env_overrides_yaml() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("home");
            jail.create_file(
                "cfg.yaml",
                &format!(
                    "server:\n  home_dir: \"{}\"\n  host: \"127.0.0.1\"\n  port: 3001\n",
                    home.display()
                ),
            )?;
            jail.set_env("APP__SERVER__PORT", "4555");

            let config = AppConfig::load_layered("cfg.yaml").unwrap();
            assert_eq!(config.server.port, 4555);
            Ok(())
        });
    }

    #[test]
    fn minimal_yaml_leaves_optional_sections_empty() {
        Jail::expect_with(|jail| {
            let home = jail.directory().join("h");
            jail.create_file(
                "cfg.yaml",
                &format!(
                    "server:\n  home_dir: \"{}\"\n  host: localhost\n  port: 8080\n",
                    home.display()
                ),
            )?;

            let config = AppConfig::load_layered("cfg.yaml").unwrap();
            assert!(config.database.is_none());
            assert!(config.logging.is_none());
            assert!(config.modules.is_empty());
            Ok(())
        });
    }

    #[test]
    fn unknown_fields_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cfg.yaml",
                "server:\n  home_dir: \"/tmp\"\n  host: h\n  port: 1\n  colour: blue\n",
            )?;
            assert!(AppConfig::load_layered("cfg.yaml").is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_layered("/nonexistent/storefront.yaml").unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn cli_overrides_port_mock_and_verbosity() {
        let mut config = AppConfig::default();
        let args = CliArgs {
            port: Some(4000),
            verbose: 1,
            mock: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.database.as_ref().unwrap().url, MEMORY_DSN);
        assert_eq!(
            config.logging.as_ref().unwrap()["default"].console_level,
            "debug"
        );

        config.apply_cli_overrides(&CliArgs {
            verbose: 3,
            ..Default::default()
        });
        assert_eq!(
            config.logging.as_ref().unwrap()["default"].console_level,
            "trace"
        );
    }

    #[test]
    fn module_config_defaults_when_missing() {
        let mut config = AppConfig::default();
        let cfg: DemoModuleConfig = config.module_config("demo").unwrap();
        assert_eq!(cfg, DemoModuleConfig::default());

        config
            .modules
            .insert("demo".into(), serde_json::json!({ "answer": 42 }));
        let cfg: DemoModuleConfig = config.module_config("demo").unwrap();
        assert_eq!(cfg.answer, 42);

        config
            .modules
            .insert("demo".into(), serde_json::json!({ "answer": "many" }));
        assert!(config.module_config::<DemoModuleConfig>("demo").is_err());
    }

    #[test]
    fn sqlite_dsn_is_anchored_at_home() {
        let tmp = tempdir().unwrap();
        let db = DatabaseConfig {
            url: "sqlite://database/storefront.db?mode=rwc".into(),
            max_conns: None,
        };

        let url = db.resolved_url(tmp.path()).unwrap();
        let expected_path = tmp.path().join("database/storefront.db");
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("?mode=rwc"));
        assert!(url.contains(&expected_path.to_string_lossy().replace('\\', "/")));
        assert!(tmp.path().join("database").is_dir());
    }

    #[test]
    fn memory_and_foreign_dsns_pass_through() {
        let tmp = tempdir().unwrap();
        let mem = DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_conns: None,
        };
        assert_eq!(mem.resolved_url(tmp.path()).unwrap(), MEMORY_DSN);

        let pg = DatabaseConfig {
            url: "postgres://u:p@localhost/shop".into(),
            max_conns: None,
        };
        assert_eq!(
            pg.resolved_url(tmp.path()).unwrap(),
            "postgres://u:p@localhost/shop"
        );

        let empty = DatabaseConfig {
            url: "  ".into(),
            max_conns: None,
        };
        assert!(empty.resolved_url(tmp.path()).is_err());
    }

    #[test]
    fn to_yaml_roundtrip() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        let back: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.database.unwrap().url, config.database.unwrap().url);
    }
}
