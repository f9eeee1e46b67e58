use serde::Deserialize;

use equity_plan_core::calendar;
use equity_plan_core::loader::config::ClientConfig;
use equity_plan_core::CalendarDate;

use crate::input;

/// Contents of the optional `--config` YAML file.
///
/// ```yaml
/// client:
///   base_url: https://equity.example.com
///   auth_token: abc123
/// issue_date: 2024-01-31
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub client: Option<ClientConfig>,
    /// Stands in for "today" when opening a grant form.
    #[serde(default)]
    pub issue_date: Option<CalendarDate>,
}

impl CliConfig {
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        match path {
            Some(path) => {
                let cfg: CliConfig = input::file::read_yaml(path)?;
                if let Some(client) = &cfg.client {
                    client.validate()?;
                }
                tracing::debug!(path, ?cfg, "loaded config");
                Ok(cfg)
            }
            None => Ok(CliConfig::default()),
        }
    }

    /// Flag, then config file, then the local date.
    pub fn issue_date(&self, flag: Option<CalendarDate>) -> CalendarDate {
        flag.or(self.issue_date).unwrap_or_else(calendar::today)
    }
}
