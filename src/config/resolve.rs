//! Locating the configuration file.

use super::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "REPLCHECK_CONFIG";

/// Config file used when nothing else is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// A callback that finds a config path on its own, e.g. from a running process.
pub type DiscoveryFn = Box<dyn Fn() -> Option<PathBuf> + Send + Sync>;

/// One way of finding the configuration file.
pub enum ConfigSource {
    /// A path given on the command line.
    Explicit(PathBuf),
    /// `var` when set, else `fallback`.
    EnvDefault { var: String, fallback: PathBuf },
    /// An injected discovery callback.
    Discovery { name: String, discover: DiscoveryFn },
}

impl ConfigSource {
    /// `REPLCHECK_CONFIG`, falling back to `./config.yaml`.
    pub fn env_default() -> Self {
        ConfigSource::EnvDefault {
            var: CONFIG_ENV.to_string(),
            fallback: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn discovery(
        name: impl Into<String>,
        discover: impl Fn() -> Option<PathBuf> + Send + Sync + 'static,
    ) -> Self {
        ConfigSource::Discovery {
            name: name.into(),
            discover: Box::new(discover),
        }
    }

    /// The path this source points at, if it has one.
    pub fn candidate(&self) -> Option<PathBuf> {
        match self {
            ConfigSource::Explicit(path) => Some(path.clone()),
            ConfigSource::EnvDefault { var, fallback } => Some(
                std::env::var_os(var)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| fallback.clone()),
            ),
            ConfigSource::Discovery { discover, .. } => discover(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ConfigSource::Explicit(path) => format!("--config {}", path.display()),
            ConfigSource::EnvDefault { var, fallback } => {
                format!("${var} or {}", fallback.display())
            }
            ConfigSource::Discovery { name, .. } => format!("discovery via {name}"),
        }
    }
}

/// Try each source in order; the first one pointing at an existing file wins.
pub fn resolve_config_path(sources: &[ConfigSource]) -> Result<PathBuf, ConfigError> {
    for source in sources {
        match source.candidate() {
            Some(path) if path.is_file() => {
                info!("Using config {} ({})", path.display(), source.describe());
                return Ok(path);
            }
            Some(path) => debug!("{}: {} does not exist", source.describe(), path.display()),
            None => debug!("{}: nothing found", source.describe()),
        }
    }
    let tried: Vec<String> = sources.iter().map(ConfigSource::describe).collect();
    Err(ConfigError::NotFound {
        tried: tried.join(", "),
    })
}

/// Extract the value of `--config` (or `-c`) from an argument list.
pub fn find_config_arg<S: AsRef<str>>(args: &[S]) -> Option<PathBuf> {
    let mut iter = args.iter().map(AsRef::as_ref);
    while let Some(arg) = iter.next() {
        if let Some(value) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(value));
        }
        if arg == "--config" || arg == "-c" {
            return iter.next().map(PathBuf::from);
        }
    }
    None
}

/// Look through running processes for one whose command line mentions
/// `process_name` and carries a `--config` argument.
///
/// Linux only; returns `None` wherever `/proc` is unavailable.
pub fn discover_from_processes(process_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir("/proc").ok()?;
    let own_pid = std::process::id().to_string();
    for entry in entries.flatten() {
        let pid = entry.file_name();
        let pid = pid.to_string_lossy();
        if !pid.chars().all(|c| c.is_ascii_digit()) || pid == own_pid {
            continue;
        }
        let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let args: Vec<String> = raw
            .split(|b| *b == 0)
            .filter(|a| !a.is_empty())
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        if !args.iter().any(|a| a.contains(process_name)) {
            continue;
        }
        if let Some(path) = find_config_arg(&args) {
            let cwd = std::fs::read_link(entry.path().join("cwd")).ok();
            let path = absolutize(&path, cwd.as_deref());
            info!("Found running {} (pid {}) using {}", process_name, pid, path.display());
            return Some(path);
        }
    }
    None
}

fn absolutize(path: &Path, cwd: Option<&Path>) -> PathBuf {
    match cwd {
        Some(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_config_arg() {
        assert_eq!(
            find_config_arg(&["df2redis", "replicate", "--config", "/etc/r.yaml"]),
            Some(PathBuf::from("/etc/r.yaml"))
        );
        assert_eq!(
            find_config_arg(&["engine", "--config=conf/a.yaml"]),
            Some(PathBuf::from("conf/a.yaml"))
        );
        assert_eq!(
            find_config_arg(&["engine", "-c", "b.yaml"]),
            Some(PathBuf::from("b.yaml"))
        );
        assert_eq!(find_config_arg(&["engine", "--config"]), None);
        assert_eq!(find_config_arg::<&str>(&[]), None);
    }

    #[test]
    fn test_absolutize_relative_paths() {
        assert_eq!(
            absolutize(Path::new("conf.yaml"), Some(Path::new("/srv/engine"))),
            PathBuf::from("/srv/engine/conf.yaml")
        );
        assert_eq!(
            absolutize(Path::new("/etc/conf.yaml"), Some(Path::new("/srv"))),
            PathBuf::from("/etc/conf.yaml")
        );
    }

    #[test]
    fn test_first_existing_source_wins() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("found.yaml");
        std::fs::write(&real, "source: {}\n").unwrap();

        let discovered = real.clone();
        let sources = vec![
            ConfigSource::Explicit(dir.path().join("missing.yaml")),
            ConfigSource::discovery("test", || None),
            ConfigSource::discovery("test", move || Some(discovered.clone())),
        ];
        assert_eq!(resolve_config_path(&sources).unwrap(), real);
    }

    #[test]
    fn test_nothing_found_lists_sources() {
        let sources = vec![
            ConfigSource::Explicit(PathBuf::from("/nonexistent/a.yaml")),
            ConfigSource::discovery("ps", || None),
        ];
        match resolve_config_path(&sources) {
            Err(ConfigError::NotFound { tried }) => {
                assert!(tried.contains("--config /nonexistent/a.yaml"));
                assert!(tried.contains("discovery via ps"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_env_default_prefers_variable() {
        let dir = tempfile::tempdir().unwrap();
        let from_env = dir.path().join("env.yaml");
        std::fs::write(&from_env, "").unwrap();

        let var = "REPLCHECK_CONFIG_RESOLVE_TEST";
        let source = ConfigSource::EnvDefault {
            var: var.to_string(),
            fallback: PathBuf::from("fallback.yaml"),
        };
        std::env::remove_var(var);
        assert_eq!(source.candidate(), Some(PathBuf::from("fallback.yaml")));
        std::env::set_var(var, &from_env);
        assert_eq!(source.candidate(), Some(from_env));
        std::env::remove_var(var);
    }
}
