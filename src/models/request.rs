use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Headers sent with every request for a single item's page.
pub type DetailHeaders = BTreeMap<String, String>;

/// Body of a templated request: either form fields or a pre-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestBody {
    Form(BTreeMap<String, String>),
    Raw(String),
}

/// A stored HTTP request as captured from a retailer's site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RequestTemplate {
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub data: Option<RequestBody>,
}

impl RequestTemplate {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            data: None,
        }
    }
}

/// Request set used by one family's search loop.
///
/// `cookies` is fetched once when the session is created so the retailer
/// hands out the cookies its search endpoint expects; `search` is replayed
/// every broad cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SearchRequests {
    #[serde(default)]
    #[validate(nested)]
    pub cookies: Option<RequestTemplate>,
    #[validate(nested)]
    pub search: RequestTemplate,
}
