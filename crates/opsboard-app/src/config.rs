use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use opsboard_core::{Directory, Identity};
use serde::Deserialize;

use crate::intake::IntakeSettings;

/// Directory holding the dashboard's local files.
pub const CONFIG_DIR: &str = ".opsboard";
const CONFIG_FILE: &str = "config.toml";

/// Top-level project configuration loaded from `.opsboard/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Signed-in user.
    #[serde(default)]
    pub session: Identity,
    /// Assignable identities.
    #[serde(default)]
    pub directory: Directory,
    /// Intake parser tuning.
    #[serde(default)]
    pub intake: IntakeSettings,
}

impl ProjectConfig {
    /// Load configuration from a working directory; a missing file yields defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed or validated.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let config_path = Self::path_in(workdir);
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
        Ok(config)
    }

    /// Location of the config file under `workdir`.
    #[must_use]
    pub fn path_in(workdir: impl AsRef<Path>) -> PathBuf {
        workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE)
    }

    fn validate(&self) -> Result<()> {
        self.ensure_unique_identities()?;
        self.ensure_valid_intake()
    }

    fn ensure_unique_identities(&self) -> Result<()> {
        let mut aliases = HashSet::new();
        let mut emails = HashSet::new();
        for identity in self.directory.iter() {
            let alias = identity.alias.trim().to_lowercase();
            if !alias.is_empty() && !aliases.insert(alias) {
                bail!("duplicate directory alias detected: {}", identity.alias);
            }
            let email = identity.email.trim().to_lowercase();
            if !email.is_empty() && !emails.insert(email) {
                bail!("duplicate directory email detected: {}", identity.email);
            }
        }
        Ok(())
    }

    fn ensure_valid_intake(&self) -> Result<()> {
        let intake = &self.intake;
        for (name, hour) in [
            ("default_hour", intake.default_hour),
            ("morning_hour", intake.morning_hour),
            ("afternoon_hour", intake.afternoon_hour),
            ("evening_hour", intake.evening_hour),
        ] {
            if hour > 23 {
                bail!("intake.{name} must be between 0 and 23, got {hour}");
            }
        }
        if intake.year_rollover_days <= 0 {
            bail!(
                "intake.year_rollover_days must be positive, got {}",
                intake.year_rollover_days
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> Result<()> {
        let cfg_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&cfg_dir)?;
        let mut file = fs::File::create(cfg_dir.join(CONFIG_FILE))?;
        writeln!(file, "{body}")?;
        Ok(())
    }

    #[test]
    fn missing_config_returns_defaults() -> Result<()> {
        let dir = tempdir()?;
        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.intake, IntakeSettings::default());
        assert_eq!(cfg.session.assignee_key(), "self");
        assert_eq!(cfg.directory.iter().count(), 0);
        Ok(())
    }

    #[test]
    fn load_config_with_session_directory_and_intake() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            r#"
[session]
id = "u-dana"
email = "dana@example.com"
alias = "dana"

[[directory]]
id = "u-yossi"
email = "yossi@example.com"
alias = "Yossi"

[[directory]]
email = "office@example.com"

[intake]
default_hour = 10
evening_hour = 19
"#,
        )?;

        let cfg = ProjectConfig::from_workdir(dir.path())?;
        assert_eq!(cfg.session.alias, "dana");
        assert_eq!(cfg.directory.lookup("yossi").map(|who| who.id.as_str()), Some("u-yossi"));
        assert_eq!(cfg.directory.iter().count(), 2);
        assert_eq!(cfg.intake.default_hour, 10);
        assert_eq!(cfg.intake.evening_hour, 19);
        assert_eq!(cfg.intake.morning_hour, 9);
        assert_eq!(cfg.intake.year_rollover_days, 30);
        Ok(())
    }

    #[test]
    fn duplicate_aliases_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(
            dir.path(),
            "[[directory]]\nalias = \"Yossi\"\n\n[[directory]]\nalias = \"yossi\"",
        )?;
        let err = ProjectConfig::from_workdir(dir.path()).err();
        assert!(err.is_some_and(|err| format!("{err:#}").contains("duplicate directory alias")));
        Ok(())
    }

    #[test]
    fn out_of_range_hours_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[intake]\nmorning_hour = 24")?;
        assert!(ProjectConfig::from_workdir(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn non_positive_rollover_is_rejected() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[intake]\nyear_rollover_days = 0")?;
        assert!(ProjectConfig::from_workdir(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn malformed_toml_reports_path() -> Result<()> {
        let dir = tempdir()?;
        write_config(dir.path(), "[session\nalias = 1")?;
        let err = ProjectConfig::from_workdir(dir.path()).err();
        assert!(err.is_some_and(|err| err.to_string().contains("failed to parse")));
        Ok(())
    }
}
