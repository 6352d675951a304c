//! RPC wire format: one JSON object per line over the profile's Unix
//! socket. A request carries a client-assigned id, a method name and an
//! opaque params blob; the response echoes the id with exactly one of
//! `result` or `error` populated.

use crate::browser::Link;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RespError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespError {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusResult {
    pub profile: String,
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabNewParams {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabSwitchParams {
    pub tab: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TabCloseParams {
    pub tab: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GotoParams {
    #[serde(default)]
    pub tab: u64,
    pub url: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClickParams {
    #[serde(default)]
    pub tab: u64,
    pub selector: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillParams {
    #[serde(default)]
    pub tab: u64,
    pub selector: String,
    pub value: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShotParams {
    #[serde(default)]
    pub tab: u64,
    pub path: String,
    #[serde(default)]
    pub full_page: bool,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractParams {
    #[serde(default)]
    pub tab: u64,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub main: bool,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalParams {
    #[serde(default)]
    pub tab: u64,
    pub js: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlParams {
    #[serde(default)]
    pub tab: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinksParams {
    #[serde(default)]
    pub tab: u64,
    #[serde(default)]
    pub filter: String,
}

/// Result rows for `Links`
pub type LinksResult = Vec<Link>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_missing_params() {
        let req = Request {
            id: "1".to_string(),
            method: "Status".to_string(),
            params: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"id":"1","method":"Status"}"#);
    }

    #[test]
    fn response_carries_result_xor_error() {
        let ok = Response {
            id: "2".to_string(),
            result: Some(serde_json::json!({"profile": "x", "tabs": []})),
            error: None,
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains("result"));
        assert!(!json.contains("error"));

        let err = Response {
            id: "2".to_string(),
            result: None,
            error: Some(RespError {
                message: "tab not found".to_string(),
            }),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("result"));
        assert!(json.contains("tab not found"));
    }

    #[test]
    fn params_default_tab_to_active() {
        let params: GotoParams =
            serde_json::from_str(r#"{"url":"https://example.com"}"#).unwrap();
        assert_eq!(params.tab, 0);
        assert_eq!(params.timeout_ms, 0);
        assert_eq!(params.url, "https://example.com");
    }

    #[test]
    fn tab_info_round_trips() {
        let info = TabInfo {
            id: 3,
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            active: true,
        };
        let back: TabInfo =
            serde_json::from_str(&serde_json::to_string(&info).unwrap()).unwrap();
        assert_eq!(back, info);
    }
}
