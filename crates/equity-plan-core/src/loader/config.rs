use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::EquityPlanError;
use crate::EquityPlanResult;

fn default_api_prefix() -> String {
    "api".to_string()
}

/// Where the backend lives and how to authenticate against it.
///
/// Always passed in explicitly; nothing here is read from globals.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Path under `base_url` where the API is mounted.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("api_prefix", &self.api_prefix)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            auth_token,
            api_prefix: default_api_prefix(),
        }
    }

    /// Check the base URL is absolute http(s).
    pub fn validate(&self) -> EquityPlanResult<()> {
        self.api_root().map(|_| ())
    }

    /// `base_url` + `api_prefix`, with a trailing slash.
    pub fn api_root(&self) -> EquityPlanResult<Url> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(invalid("base_url", "must not be empty"));
        }
        let mut url = Url::parse(trimmed).map_err(|e| invalid("base_url", &e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("base_url", "scheme must be http or https"));
        }
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid("base_url", "cannot be used as a base"))?;
            segments.pop_if_empty();
            segments.extend(self.api_prefix.split('/').filter(|s| !s.is_empty()));
            segments.push("");
        }
        Ok(url)
    }

    fn endpoint(&self, path: &[&str]) -> EquityPlanResult<Url> {
        let mut url = self.api_root()?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid("base_url", "cannot be used as a base"))?;
            segments.pop_if_empty();
            segments.extend(path);
            segments.push("");
        }
        Ok(url)
    }

    /// `equity/employees/{unique_id}/grants/{grant_id}/schedule/`
    pub fn grant_schedule_url(&self, unique_id: &str, grant_id: u64) -> EquityPlanResult<Url> {
        let grant = grant_id.to_string();
        self.endpoint(&["equity", "employees", unique_id, "grants", &grant, "schedule"])
    }

    /// `equity/schedule/all/`
    pub fn company_schedule_url(&self) -> EquityPlanResult<Url> {
        self.endpoint(&["equity", "schedule", "all"])
    }

    /// `equity/employees/{unique_id}/grants/{grant_id}/`
    pub fn grant_detail_url(&self, unique_id: &str, grant_id: u64) -> EquityPlanResult<Url> {
        let grant = grant_id.to_string();
        self.endpoint(&["equity", "employees", unique_id, "grants", &grant])
    }

    /// `Authorization` header value, when a token is configured.
    pub fn authorization_header(&self) -> Option<String> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("Bearer {t}"))
    }
}

fn invalid(field: &str, reason: &str) -> EquityPlanError {
    EquityPlanError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_endpoint_urls() {
        let cfg = ClientConfig::new("https://equity.example.com", Some("tok".into()));
        assert_eq!(
            cfg.grant_schedule_url("EMP-1", 7).unwrap().as_str(),
            "https://equity.example.com/api/equity/employees/EMP-1/grants/7/schedule/"
        );
        assert_eq!(
            cfg.company_schedule_url().unwrap().as_str(),
            "https://equity.example.com/api/equity/schedule/all/"
        );
        assert_eq!(
            cfg.grant_detail_url("EMP-1", 7).unwrap().as_str(),
            "https://equity.example.com/api/equity/employees/EMP-1/grants/7/"
        );
    }

    #[test]
    fn test_base_path_and_prefix_are_joined() {
        let mut cfg = ClientConfig::new("http://localhost:8000/backend/", None);
        cfg.api_prefix = "/v2/api/".into();
        assert_eq!(
            cfg.company_schedule_url().unwrap().as_str(),
            "http://localhost:8000/backend/v2/api/equity/schedule/all/"
        );
    }

    #[test]
    fn test_unique_id_is_escaped() {
        let cfg = ClientConfig::new("https://x.test", None);
        let url = cfg.grant_schedule_url("a/b c", 1).unwrap();
        assert_eq!(url.as_str(), "https://x.test/api/equity/employees/a%2Fb%20c/grants/1/schedule/");
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        for bad in ["", "   ", "not a url", "ftp://files.example.com", "mailto:ops@example.com"] {
            let err = ClientConfig::new(bad, None).validate().unwrap_err();
            assert!(matches!(err, EquityPlanError::InvalidInput { .. }), "{bad}");
        }
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(
            ClientConfig::new("https://x.test", Some(" abc ".into())).authorization_header(),
            Some("Bearer abc".to_string())
        );
        assert_eq!(ClientConfig::new("https://x.test", Some("".into())).authorization_header(), None);
        assert_eq!(ClientConfig::new("https://x.test", None).authorization_header(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let cfg = ClientConfig::new("https://x.test", Some("secret-token".into()));
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_prefix_defaults_when_missing() {
        let cfg: ClientConfig = serde_json::from_str(r#"{"base_url": "https://x.test"}"#).unwrap();
        assert_eq!(cfg.api_prefix, "api");
        assert_eq!(cfg.auth_token, None);
    }
}
