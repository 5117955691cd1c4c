//! Console + rotating JSON file logging driven by [`LoggingConfig`].
//!
//! Every section key other than `default` names a target prefix (usually a crate
//! name such as `storefront` or `api_ingress`). Console output is filtered per
//! prefix; file output is routed to the section's own file when it has one and
//! to the default file otherwise.

use crate::config::{LoggingConfig, Section};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

const DEFAULT_KEY: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_level(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Relative paths are joined with `base_dir` (the server home).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

// -------- rotating file sink --------

#[derive(Clone)]
struct RotatingFile(Arc<Mutex<FileRotate<AppendCount>>>);

impl RotatingFile {
    fn open(path: &Path, section: &Section) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
        let rot = FileRotate::new(
            path,
            AppendCount::new(section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS)),
            ContentLimit::BytesSurpassed(max_bytes as usize),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        Ok(Self(Arc::new(Mutex::new(rot))))
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Writer that drops everything; used for targets without a file.
struct Discard;

impl Write for Discard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

enum SinkHandle {
    File(RotatingFile),
    Discard(Discard),
}

impl Write for SinkHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SinkHandle::File(f) => f.write(buf),
            SinkHandle::Discard(d) => d.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match self {
            SinkHandle::File(f) => f.flush(),
            SinkHandle::Discard(d) => d.flush(),
        }
    }
}

/// Routes JSON records to a file chosen by target prefix.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotatingFile>,
    by_prefix: Vec<(String, RotatingFile)>,
}

impl FileRouter {
    fn route(&self, target: &str) -> Option<&RotatingFile> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| matches_prefix(target, prefix))
            // longest prefix wins: "storefront::api" beats "storefront"
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, file)| file)
            .or(self.default.as_ref())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = SinkHandle;

    fn make_writer(&'a self) -> Self::Writer {
        match &self.default {
            Some(f) => SinkHandle::File(f.clone()),
            None => SinkHandle::Discard(Discard),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        match self.route(meta.target()) {
            Some(f) => SinkHandle::File(f.clone()),
            None => SinkHandle::Discard(Discard),
        }
    }
}

// -------- plan --------

/// Filters and sinks derived from a [`LoggingConfig`].
struct LogPlan {
    console: Targets,
    file: Targets,
    router: FileRouter,
}

fn build_plan(cfg: &LoggingConfig, base_dir: &Path) -> LogPlan {
    let default = cfg.get(DEFAULT_KEY);
    let default_console = default
        .map(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::INFO);

    let mut router = FileRouter::default();
    if let Some(section) = default.filter(|s| !s.file.trim().is_empty()) {
        router.default = open_sink(DEFAULT_KEY, section, base_dir);
    }

    let default_file_level = match (&router.default, default) {
        (Some(_), Some(s)) => parse_level(&s.file_level),
        _ => LevelFilter::OFF,
    };

    let mut console = Targets::new().with_default(default_console);
    let mut file = Targets::new().with_default(default_file_level);

    let mut subsystems: Vec<_> = cfg.iter().filter(|(k, _)| *k != DEFAULT_KEY).collect();
    subsystems.sort_by(|a, b| a.0.cmp(b.0));

    for (prefix, section) in subsystems {
        console = console.with_target(prefix.clone(), parse_level(&section.console_level));

        let own_sink = if section.file.trim().is_empty() {
            None
        } else {
            open_sink(prefix, section, base_dir)
        };

        let level = if section.file_level.trim().is_empty() {
            default_file_level
        } else {
            parse_level(&section.file_level)
        };

        match own_sink {
            Some(sink) => {
                router.by_prefix.push((prefix.clone(), sink));
                file = file.with_target(prefix.clone(), level);
            }
            // falls through to the default file, if any
            None if router.default.is_some() => file = file.with_target(prefix.clone(), level),
            None => file = file.with_target(prefix.clone(), LevelFilter::OFF),
        }
    }

    LogPlan {
        console,
        file,
        router,
    }
}

fn open_sink(name: &str, section: &Section, base_dir: &Path) -> Option<RotatingFile> {
    let path = resolve_log_path(&section.file, base_dir);
    match RotatingFile::open(&path, section) {
        Ok(sink) => Some(sink),
        Err(e) => {
            eprintln!(
                "failed to open log file for '{}': {} ({})",
                name,
                path.display(),
                e
            );
            None
        }
    }
}

// -------- public init --------

/// Install the global subscriber.
/// `base_dir` resolves relative log file paths (normally `server.home_dir`).
/// Subsequent calls are no-ops.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    let plan = build_plan(cfg, base_dir);
    let ansi = atty::is(atty::Stream::Stdout);

    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.console);

    let file_layer = if plan.router.is_empty() {
        None
    } else {
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(plan.router)
                .with_filter(plan.file),
        )
    };

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level("trace"), LevelFilter::TRACE);
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level(" Info "), LevelFilter::INFO);
        assert_eq!(parse_level("warning"), LevelFilter::WARN);
        assert_eq!(parse_level("off"), LevelFilter::OFF);
        assert_eq!(parse_level("none"), LevelFilter::OFF);
        assert_eq!(parse_level("loud"), LevelFilter::INFO);
    }

    #[test]
    fn prefix_matching_respects_module_boundaries() {
        assert!(matches_prefix("storefront", "storefront"));
        assert!(matches_prefix("storefront::domain::ledger", "storefront"));
        assert!(!matches_prefix("storefront_server", "storefront"));
        assert!(!matches_prefix("api", "api_ingress"));
    }

    #[test]
    fn relative_paths_resolve_under_home() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(&abs.to_string_lossy(), Path::new("/x")), abs);
    }

    #[test]
    fn sink_creation_makes_parent_dirs() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested/dir/app.log");
        let mut sink = RotatingFile::open(&path, &section("info", "x", "debug")).unwrap();
        sink.write_all(b"{\"msg\":\"hi\"}\n").unwrap();
        sink.flush().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn router_picks_longest_prefix_then_default() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("storefront".into(), section("info", "logs/sf.log", "debug"));
        cfg.insert(
            "storefront::api".into(),
            section("info", "logs/sf_api.log", "debug"),
        );
        cfg.insert("api_ingress".into(), section("warn", "", ""));

        let plan = build_plan(&cfg, tmp.path());
        let router = &plan.router;

        let pick = |target: &str| {
            let f = router.route(target).unwrap();
            router
                .by_prefix
                .iter()
                .find(|(_, sink)| Arc::ptr_eq(&sink.0, &f.0))
                .map(|(p, _)| p.clone())
                .unwrap_or_else(|| DEFAULT_KEY.to_string())
        };

        assert_eq!(pick("storefront::domain"), "storefront");
        assert_eq!(pick("storefront::api::rest"), "storefront::api");
        assert_eq!(pick("api_ingress"), DEFAULT_KEY);
        assert_eq!(pick("sea_orm::driver"), DEFAULT_KEY);
    }

    #[test]
    fn no_files_means_empty_router() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_KEY.into(), section("info", "", "debug"));
        cfg.insert("storefront".into(), section("debug", "", ""));

        let plan = build_plan(&cfg, tmp.path());
        assert!(plan.router.is_empty());
    }

    #[test]
    fn init_is_idempotent() {
        let tmp = tempdir().unwrap();
        let cfg = default_logging_config();
        init_logging_from_config(&cfg, tmp.path());
        init_logging_from_config(&cfg, tmp.path());
        tracing::info!("logging initialized twice without panicking");
    }
}
