use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of artifact a group is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Js,
    Css,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Js => "js",
            ResourceType::Css => "css",
        }
    }

    /// MIME type served for this artifact kind
    pub fn content_type(&self) -> &'static str {
        match self {
            ResourceType::Js => "application/javascript",
            ResourceType::Css => "text/css",
        }
    }

    pub fn all() -> &'static [ResourceType] {
        &[ResourceType::Js, ResourceType::Css]
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(ResourceType::Js),
            "css" => Ok(ResourceType::Css),
            other => Err(format!("Unknown resource type: {other}")),
        }
    }
}
