//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Debugger process settings
    #[serde(default)]
    pub debugger: DebuggerConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Breakpoint resolution settings
    #[serde(default)]
    pub symbols: SymbolConfig,
}

/// How to launch and talk to the debugger process
#[derive(Debug, Deserialize, Clone)]
pub struct DebuggerConfig {
    /// Executable name or path
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Additional arguments to pass to the debugger
    #[serde(default)]
    pub args: Vec<String>,

    /// Text on the debugger's stderr that means it accepts commands
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    /// Argument of the hardware reset command
    #[serde(default = "default_reset_target")]
    pub reset_target: String,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
            ready_marker: default_ready_marker(),
            reset_target: default_reset_target(),
        }
    }
}

fn default_program() -> PathBuf {
    PathBuf::from("mdb")
}

fn default_ready_marker() -> String {
    "WARNING: Unable to create a system terminal".to_string()
}

fn default_reset_target() -> String {
    "MCLR".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// How long the debugger may take to print its readiness line
    #[serde(default = "default_startup")]
    pub startup_secs: u64,

    /// Upper bound for any command to produce its completion marker
    #[serde(default = "default_command")]
    pub command_secs: u64,

    /// Default `wait` duration for run/continue
    #[serde(default = "default_run")]
    pub run_default_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_secs: default_startup(),
            command_secs: default_command(),
            run_default_ms: default_run(),
        }
    }
}

impl Timeouts {
    pub fn startup(&self) -> Duration {
        Duration::from_secs(self.startup_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

fn default_startup() -> u64 {
    60
}
fn default_command() -> u64 {
    30
}
fn default_run() -> u64 {
    15_000
}

/// Breakpoint resolution settings
#[derive(Debug, Deserialize, Clone)]
pub struct SymbolConfig {
    /// Map file records are only considered when their text starts with this tag
    #[serde(default = "default_region_tag")]
    pub region_tag: String,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            region_tag: default_region_tag(),
        }
    }
}

fn default_region_tag() -> String {
    "resetVec CODE".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Resolve the debugger executable
    ///
    /// Paths with a directory component are used as given, bare names are
    /// looked up in PATH
    pub fn debugger_program(&self) -> Result<PathBuf> {
        let program = &self.debugger.program;
        if program.components().count() > 1 {
            return Ok(program.clone());
        }
        which::which(program).map_err(|_| {
            Error::Config(format!(
                "Debugger '{}' not found in PATH. Set [debugger].program in the config file",
                program.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.debugger.program, PathBuf::from("mdb"));
        assert_eq!(config.debugger.reset_target, "MCLR");
        assert_eq!(config.timeouts.run_default_ms, 15_000);
        assert_eq!(config.symbols.region_tag, "resetVec CODE");
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
[debugger]
program = "/opt/microchip/mdb.sh"
args = ["--quiet"]

[timeouts]
command_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.debugger.args, vec!["--quiet"]);
        assert_eq!(config.timeouts.command(), Duration::from_secs(5));
        assert_eq!(config.timeouts.startup_secs, 60);
        assert_eq!(
            config.debugger_program().unwrap(),
            PathBuf::from("/opt/microchip/mdb.sh")
        );
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timeouts]\ncommand_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(Error::ConfigParse(_))
        ));
    }
}
