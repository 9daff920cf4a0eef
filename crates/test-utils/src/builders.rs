#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use adminagent::config::{
    ClearSection, CommandConfig, ConfigFile, ExportSection, LimitsSection, LogSection,
    PathsSection, PullSection, RawConfigFile, RpcSection, TelegramSection,
};
use adminagent::types::{OutputMode, ReportMode};

/// Builder for `ConfigFile` rooted in a scratch directory.
///
/// `scripts/`, `git/` and `out/` are created under `root`; the tail log is
/// `root/error.log` (not created) and the socket `root/agent.sock`.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new(root: &Path) -> Self {
        let paths = PathsSection {
            scripts: root.join("scripts"),
            git: root.join("git"),
            out: root.join("out"),
            tail_log: root.join("error.log"),
        };
        for dir in [&paths.scripts, &paths.git, &paths.out] {
            std::fs::create_dir_all(dir).expect("create scratch dir");
        }

        Self {
            config: RawConfigFile {
                telegram: TelegramSection {
                    api_base: "http://127.0.0.1:9".to_string(),
                    token: "TEST:TOKEN".to_string(),
                    admin_chat: 0,
                    parse_mode: ReportMode::Markdown,
                },
                rpc: RpcSection {
                    socket: root.join("agent.sock"),
                },
                paths,
                limits: LimitsSection::default(),
                log: LogSection::default(),
                commands: BTreeMap::new(),
                pull: PullSection::default(),
                export: ExportSection::default(),
                clear: ClearSection::default(),
            },
        }
    }

    pub fn command(self, name: &str, cmd: &str) -> Self {
        self.command_with(name, None, cmd, OutputMode::None)
    }

    pub fn command_with(
        mut self,
        name: &str,
        title: Option<&str>,
        cmd: &str,
        output: OutputMode,
    ) -> Self {
        self.config.commands.insert(
            name.to_string(),
            CommandConfig {
                title: title.map(str::to_string),
                cmd: cmd.to_string(),
                output,
            },
        );
        self
    }

    pub fn tail_log(mut self, path: &Path) -> Self {
        self.config.paths.tail_log = path.to_path_buf();
        self
    }

    pub fn pull_cmd(mut self, cmd: &str) -> Self {
        self.config.pull.cmd = cmd.to_string();
        self
    }

    pub fn export(mut self, cmd: &str, artifact: &str) -> Self {
        self.config.export.cmd = cmd.to_string();
        self.config.export.artifact = artifact.to_string();
        self
    }

    pub fn clear_cmd(mut self, cmd: &str) -> Self {
        self.config.clear.cmd = cmd.to_string();
        self
    }

    pub fn max_concurrent_jobs(mut self, n: usize) -> Self {
        self.config.limits.max_concurrent_jobs = n;
        self
    }

    pub fn api_base(mut self, base: &str) -> Self {
        self.config.telegram.api_base = base.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
