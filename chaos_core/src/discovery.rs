use crate::activity::ActivitySpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub family: String,
}

impl PlatformInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            family: std::env::consts::FAMILY.to_string(),
        }
    }
}

/// Document returned to the host describing what this extension offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    pub id: String,
    pub date: DateTime<Utc>,
    pub target: String,
    pub platform: PlatformInfo,
    pub extension: ExtensionInfo,
    pub activities: Vec<ActivitySpec>,
    pub system: Option<Value>,
}

pub fn initialize_discovery_result(
    name: impl Into<String>,
    version: impl Into<String>,
    target: impl Into<String>,
) -> Discovery {
    Discovery {
        id: uuid::Uuid::new_v4().to_string(),
        date: Utc::now(),
        target: target.into(),
        platform: PlatformInfo::current(),
        extension: ExtensionInfo {
            name: name.into(),
            version: version.into(),
        },
        activities: Vec::new(),
        system: None,
    }
}
