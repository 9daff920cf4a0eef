// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{OutputMode, ReportMode};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [telegram]
/// token = "123456:ABC"
///
/// [paths]
/// scripts = "/srv/app/scripts"
///
/// [commands.geos]
/// title = "GeoFences"
/// cmd = "php {scripts}/load/gps_resources.php"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub telegram: TelegramSection,

    #[serde(default)]
    pub rpc: RpcSection,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub limits: LimitsSection,

    #[serde(default)]
    pub log: LogSection,

    /// Named maintenance commands from `[commands.<name>]`.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,

    #[serde(default)]
    pub pull: PullSection,

    #[serde(default)]
    pub export: ExportSection,

    #[serde(default)]
    pub clear: ClearSection,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::new_unchecked`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub telegram: TelegramSection,
    pub rpc: RpcSection,
    pub paths: PathsSection,
    pub limits: LimitsSection,
    pub log: LogSection,
    pub commands: BTreeMap<String, CommandConfig>,
    pub pull: PullSection,
    pub export: ExportSection,
    pub clear: ClearSection,
}

impl ConfigFile {
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            telegram: raw.telegram,
            rpc: raw.rpc,
            paths: raw.paths,
            limits: raw.limits,
            log: raw.log,
            commands: raw.commands,
            pull: raw.pull,
            export: raw.export,
            clear: raw.clear,
        }
    }

    /// Expand the `[paths]` placeholders in a command or path template.
    pub fn expand(&self, template: &str) -> String {
        let scripts = self.paths.scripts.to_string_lossy();
        let git = self.paths.git.to_string_lossy();
        let out = self.paths.out.to_string_lossy();
        expand_placeholders(
            template,
            &[("scripts", scripts.as_ref()), ("git", git.as_ref()), ("out", out.as_ref())],
        )
    }
}

/// `[telegram]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bot token; the endpoint base becomes `{api_base}/bot{token}`.
    pub token: String,

    /// Chat that receives the startup notice. `0` disables it.
    #[serde(default)]
    pub admin_chat: u32,

    #[serde(default)]
    pub parse_mode: ReportMode,
}

impl TelegramSection {
    pub fn endpoint_base(&self) -> String {
        format!("{}/bot{}", self.api_base.trim_end_matches('/'), self.token)
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

/// `[rpc]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcSection {
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
}

fn default_socket() -> PathBuf {
    PathBuf::from("/run/adminagent.sock")
}

impl Default for RpcSection {
    fn default() -> Self {
        Self {
            socket: default_socket(),
        }
    }
}

/// `[paths]` section: locations substituted into command templates.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_scripts")]
    pub scripts: PathBuf,

    /// Source tree that `pull` runs in.
    #[serde(default = "default_git")]
    pub git: PathBuf,

    /// Directory export artifacts are written to.
    #[serde(default = "default_out")]
    pub out: PathBuf,

    /// Log file read by `tail`.
    #[serde(default = "default_tail_log")]
    pub tail_log: PathBuf,
}

fn default_scripts() -> PathBuf {
    PathBuf::from("/srv/app/scripts")
}

fn default_git() -> PathBuf {
    PathBuf::from("/srv/app")
}

fn default_out() -> PathBuf {
    PathBuf::from("/srv/app/out")
}

fn default_tail_log() -> PathBuf {
    PathBuf::from("/var/log/php/error.log")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            scripts: default_scripts(),
            git: default_git(),
            out: default_out(),
            tail_log: default_tail_log(),
        }
    }
}

/// `[limits]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitsSection {
    /// Upper bound on concurrently running jobs; `0` means unbounded.
    #[serde(default)]
    pub max_concurrent_jobs: usize,
}

/// `[log]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    /// Append logs to this file instead of stderr (unless `--console`).
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// `[commands.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Label used in the completion message. Defaults to the command name.
    #[serde(default)]
    pub title: Option<String>,

    /// Shell command line; `[paths]` placeholders are expanded.
    pub cmd: String,

    #[serde(default)]
    pub output: OutputMode,
}

/// `[pull]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PullSection {
    #[serde(default = "default_pull_title")]
    pub title: String,

    #[serde(default = "default_pull_cmd")]
    pub cmd: String,
}

fn default_pull_title() -> String {
    "Pull".to_string()
}

fn default_pull_cmd() -> String {
    "git pull".to_string()
}

impl Default for PullSection {
    fn default() -> Self {
        Self {
            title: default_pull_title(),
            cmd: default_pull_cmd(),
        }
    }
}

/// `[export]` section. `{order}` is replaced per job.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    #[serde(default = "default_export_title")]
    pub title: String,

    #[serde(default = "default_export_cmd")]
    pub cmd: String,

    /// Artifact the command writes; uploaded as a document on success.
    #[serde(default = "default_export_artifact")]
    pub artifact: String,
}

fn default_export_title() -> String {
    "Order export".to_string()
}

fn default_export_cmd() -> String {
    "php {scripts}/export.php {order}".to_string()
}

fn default_export_artifact() -> String {
    "{out}/order_{order}.xlsx".to_string()
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            title: default_export_title(),
            cmd: default_export_cmd(),
            artifact: default_export_artifact(),
        }
    }
}

/// `[clear]` section. `{orders}` is replaced by the space separated id list.
#[derive(Debug, Clone, Deserialize)]
pub struct ClearSection {
    #[serde(default = "default_clear_title")]
    pub title: String,

    #[serde(default = "default_clear_cmd")]
    pub cmd: String,

    #[serde(default = "default_clear_output")]
    pub output: OutputMode,
}

fn default_clear_title() -> String {
    "Clear orders".to_string()
}

fn default_clear_cmd() -> String {
    "php {scripts}/clear.php {orders}".to_string()
}

fn default_clear_output() -> OutputMode {
    OutputMode::Text
}

impl Default for ClearSection {
    fn default() -> Self {
        Self {
            title: default_clear_title(),
            cmd: default_clear_cmd(),
            output: default_clear_output(),
        }
    }
}

/// Replace every `{key}` in `template` with its value.
///
/// Unknown placeholders are left untouched.
pub fn expand_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Whether `template` contains `{key}`.
pub fn has_placeholder(template: &str, key: &str) -> bool {
    template.contains(&format!("{{{key}}}"))
}

/// Render an artifact path template for one order.
pub fn artifact_path(cfg: &ConfigFile, order: u32) -> PathBuf {
    let expanded = cfg.expand(&cfg.export.artifact);
    let order = order.to_string();
    PathBuf::from(expand_placeholders(&expanded, &[("order", order.as_str())]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_replaces_all_occurrences() {
        let s = expand_placeholders("{a}/{b}/{a}/{c}", &[("a", "x"), ("b", "y")]);
        assert_eq!(s, "x/y/x/{c}");
    }

    #[test]
    fn endpoint_base_strips_trailing_slash() {
        let t = TelegramSection {
            api_base: "http://localhost:8080/".into(),
            token: "T".into(),
            admin_chat: 0,
            parse_mode: ReportMode::Markdown,
        };
        assert_eq!(t.endpoint_base(), "http://localhost:8080/botT");
    }

    #[test]
    fn minimal_toml_gets_defaults() {
        let raw: RawConfigFile = toml::from_str("[telegram]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(raw.telegram.api_base, "https://api.telegram.org");
        assert_eq!(raw.pull.cmd, "git pull");
        assert_eq!(raw.clear.output, OutputMode::Text);
        assert_eq!(raw.limits.max_concurrent_jobs, 0);
        assert!(raw.commands.is_empty());
    }

    #[test]
    fn artifact_path_expands_out_and_order() {
        let mut raw: RawConfigFile = toml::from_str("[telegram]\ntoken = \"abc\"\n").unwrap();
        raw.paths.out = PathBuf::from("/tmp/out");
        let cfg = ConfigFile::new_unchecked(raw);
        assert_eq!(artifact_path(&cfg, 42), PathBuf::from("/tmp/out/order_42.xlsx"));
    }
}
