// src/config/validate.rs

use crate::config::model::{has_placeholder, ConfigFile, RawConfigFile};
use crate::errors::{AgentError, Result};
use crate::types::{OutputMode, ReportMode};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AgentError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_telegram(cfg)?;
    validate_commands(cfg)?;
    validate_templates(cfg)?;
    Ok(())
}

/// Command names are looked up verbatim from RPC input and end up in logs;
/// keep them to a plain identifier alphabet.
pub fn is_safe_command_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_telegram(cfg: &RawConfigFile) -> Result<()> {
    if cfg.telegram.token.trim().is_empty() {
        return Err(AgentError::Config(
            "[telegram].token must not be empty".to_string(),
        ));
    }
    if cfg.telegram.api_base.trim().is_empty() {
        return Err(AgentError::Config(
            "[telegram].api_base must not be empty".to_string(),
        ));
    }
    if cfg.telegram.parse_mode == ReportMode::Document {
        return Err(AgentError::Config(
            "[telegram].parse_mode must be \"markdown\", \"markdownv2\" or \"html\"".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, command) in cfg.commands.iter() {
        if !is_safe_command_name(name) {
            return Err(AgentError::Config(format!(
                "command name '{}' may only contain ASCII letters, digits, '-' and '_'",
                name
            )));
        }
        if command.cmd.trim().is_empty() {
            return Err(AgentError::Config(format!(
                "[commands.{}].cmd must not be empty",
                name
            )));
        }
        if command.output == OutputMode::Document {
            return Err(AgentError::Config(format!(
                "[commands.{}].output = \"document\" is only supported by [export]",
                name
            )));
        }
    }
    Ok(())
}

fn validate_templates(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pull.cmd.trim().is_empty() {
        return Err(AgentError::Config(
            "[pull].cmd must not be empty".to_string(),
        ));
    }

    // Each export job writes its own artifact; without `{order}` concurrent
    // exports would overwrite each other.
    if !has_placeholder(&cfg.export.cmd, "order") {
        return Err(AgentError::Config(
            "[export].cmd must contain the {order} placeholder".to_string(),
        ));
    }
    if !has_placeholder(&cfg.export.artifact, "order") {
        return Err(AgentError::Config(
            "[export].artifact must contain the {order} placeholder".to_string(),
        ));
    }

    if cfg.clear.output == OutputMode::Document {
        return Err(AgentError::Config(
            "[clear].output = \"document\" is only supported by [export]".to_string(),
        ));
    }
    if !has_placeholder(&cfg.clear.cmd, "orders") {
        return Err(AgentError::Config(
            "[clear].cmd must contain the {orders} placeholder".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(extra: &str) -> RawConfigFile {
        toml::from_str(&format!("[telegram]\ntoken = \"abc\"\n{extra}")).unwrap()
    }

    fn config_error(raw: RawConfigFile) -> String {
        match ConfigFile::try_from(raw) {
            Err(AgentError::Config(msg)) => msg,
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigFile::try_from(raw("")).is_ok());
    }

    #[test]
    fn empty_token_is_rejected() {
        let r: RawConfigFile = toml::from_str("[telegram]\ntoken = \" \"\n").unwrap();
        assert!(config_error(r).contains("token"));
    }

    #[test]
    fn document_parse_mode_is_rejected() {
        let r: RawConfigFile =
            toml::from_str("[telegram]\ntoken = \"abc\"\nparse_mode = \"document\"\n").unwrap();
        assert!(config_error(r).contains("[telegram].parse_mode"));

        let r: RawConfigFile =
            toml::from_str("[telegram]\ntoken = \"abc\"\nparse_mode = \"html\"\n").unwrap();
        assert!(ConfigFile::try_from(r).is_ok());
    }

    #[test]
    fn unsafe_command_name_is_rejected() {
        let msg = config_error(raw("[commands.\"geos; rm\"]\ncmd = \"true\"\n"));
        assert!(msg.contains("geos; rm"));
    }

    #[test]
    fn empty_command_line_is_rejected() {
        let msg = config_error(raw("[commands.cars]\ncmd = \"\"\n"));
        assert!(msg.contains("commands.cars"));
    }

    #[test]
    fn document_output_outside_export_is_rejected() {
        let msg = config_error(raw("[commands.cars]\ncmd = \"true\"\noutput = \"document\"\n"));
        assert!(msg.contains("commands.cars"));
    }

    #[test]
    fn export_without_order_placeholder_is_rejected() {
        let msg = config_error(raw("[export]\ncmd = \"php export.php\"\n"));
        assert!(msg.contains("[export].cmd"));

        let msg = config_error(raw("[export]\nartifact = \"/tmp/out.xlsx\"\n"));
        assert!(msg.contains("[export].artifact"));
    }

    #[test]
    fn clear_without_orders_placeholder_is_rejected() {
        let msg = config_error(raw("[clear]\ncmd = \"php clear.php\"\n"));
        assert!(msg.contains("{orders}"));
    }

    #[test]
    fn command_names() {
        assert!(is_safe_command_name("geos"));
        assert!(is_safe_command_name("cars_2"));
        assert!(is_safe_command_name("re-index"));
        assert!(!is_safe_command_name(""));
        assert!(!is_safe_command_name("foo bar"));
        assert!(!is_safe_command_name("$(evil)"));
        assert!(!is_safe_command_name(&"a".repeat(65)));
    }
}
