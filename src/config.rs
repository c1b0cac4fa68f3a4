//! Project-wide settings: time-unit conversion constants and calculation policies.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::calculations::slack::TotalSlackCalculationType;
use crate::duration::TimeUnitDefaults;
use crate::error::CalendarResult;

const DEFAULT_DAYS_PER_WEEK: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub minutes_per_day: u32,
    /// Derived from `minutes_per_day` when unset.
    pub minutes_per_week: Option<u32>,
    pub days_per_month: u32,
    pub minutes_per_month: Option<u32>,
    pub minutes_per_year: Option<u32>,
    pub total_slack_calculation_type: TotalSlackCalculationType,
    /// Name given to the base calendar a new schedule starts with.
    pub default_calendar_name: String,
    /// Allocate unique IDs from the shared context when entities are added without one.
    pub auto_unique_ids: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            minutes_per_day: 480,
            minutes_per_week: None,
            days_per_month: 20,
            minutes_per_month: None,
            minutes_per_year: None,
            total_slack_calculation_type: TotalSlackCalculationType::default(),
            default_calendar_name: "Standard".to_string(),
            auto_unique_ids: true,
        }
    }
}

impl ProjectConfig {
    /// Defaults, then an optional TOML file, then `SCHEDULE_*` environment variables.
    pub fn load_from(config_path: Option<&Path>) -> CalendarResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("SCHEDULE_"));

        let config: Self = figment.extract()?;
        tracing::debug!(?config, "loaded project configuration");
        Ok(config)
    }
}

impl TimeUnitDefaults for ProjectConfig {
    fn minutes_per_day(&self) -> u32 {
        self.minutes_per_day
    }

    fn minutes_per_week(&self) -> u32 {
        self.minutes_per_week
            .unwrap_or(DEFAULT_DAYS_PER_WEEK * self.minutes_per_day)
    }

    fn minutes_per_month(&self) -> u32 {
        self.minutes_per_month
            .unwrap_or(self.minutes_per_day * self.days_per_month)
    }

    fn minutes_per_year(&self) -> u32 {
        self.minutes_per_year
            .unwrap_or(self.minutes_per_day * self.days_per_month * 12)
    }

    fn days_per_month(&self) -> u32 {
        self.days_per_month
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn derived_constants_follow_minutes_per_day() {
        let config = ProjectConfig {
            minutes_per_day: 420,
            ..ProjectConfig::default()
        };
        assert_eq!(config.minutes_per_week(), 2100);
        assert_eq!(config.minutes_per_month(), 8400);
        assert_eq!(config.minutes_per_year(), 100_800);
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "schedule.toml",
                r#"
                minutes_per_day = 450
                default_calendar_name = "Site"
                total_slack_calculation_type = "finish_slack"
                "#,
            )?;
            jail.set_env("SCHEDULE_DAYS_PER_MONTH", "22");

            let config = ProjectConfig::load_from(Some(Path::new("schedule.toml")))
                .map_err(|err| err.to_string())?;
            assert_eq!(config.minutes_per_day, 450);
            assert_eq!(config.days_per_month, 22);
            assert_eq!(config.default_calendar_name, "Site");
            assert_eq!(
                config.total_slack_calculation_type,
                TotalSlackCalculationType::FinishSlack
            );
            Ok(())
        });
    }
}
