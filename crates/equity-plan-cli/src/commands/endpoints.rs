use clap::Args;
use serde_json::{json, Value};

use equity_plan_core::loader::config::ClientConfig;

use crate::config::CliConfig;

/// Arguments for backend endpoint resolution
#[derive(Args)]
pub struct EndpointsArgs {
    /// Employee unique id
    #[arg(long)]
    pub unique_id: String,

    /// Grant id
    #[arg(long)]
    pub grant_id: u64,

    /// API base URL; overrides the config file
    #[arg(long)]
    pub base_url: Option<String>,
}

pub fn run_endpoints(args: EndpointsArgs, config: &CliConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let client = match (args.base_url, &config.client) {
        (Some(base_url), Some(file)) => ClientConfig {
            base_url,
            ..file.clone()
        },
        (Some(base_url), None) => ClientConfig::new(base_url, None),
        (None, Some(file)) => file.clone(),
        (None, None) => return Err("--base-url is required (or set client.base_url in --config)".into()),
    };
    client.validate()?;

    Ok(json!({
        "grant_schedule_url": client.grant_schedule_url(&args.unique_id, args.grant_id)?.as_str(),
        "grant_detail_url": client.grant_detail_url(&args.unique_id, args.grant_id)?.as_str(),
        "company_schedule_url": client.company_schedule_url()?.as_str(),
        "authenticated": client.authorization_header().is_some(),
    }))
}
