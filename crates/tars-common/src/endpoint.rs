use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status reported by the platform for an endpoint.
///
/// Serialized with the platform's PascalCase names (`InService`, ...).
/// Values this build does not know about are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointStatus {
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    OutOfService,
    Deleting,
    Failed,
    Other(String),
}

impl EndpointStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::SystemUpdating => "SystemUpdating",
            Self::RollingBack => "RollingBack",
            Self::InService => "InService",
            Self::OutOfService => "OutOfService",
            Self::Deleting => "Deleting",
            Self::Failed => "Failed",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Creating" => Self::Creating,
            "Updating" => Self::Updating,
            "SystemUpdating" => Self::SystemUpdating,
            "RollingBack" => Self::RollingBack,
            "InService" => Self::InService,
            "OutOfService" => Self::OutOfService,
            "Deleting" => Self::Deleting,
            "Failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    /// The endpoint accepts invocations.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::InService)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EndpointStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EndpointStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// What the local process observes about a remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointRecord {
    pub name: String,
    pub status: EndpointStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl EndpointRecord {
    pub fn new(name: impl Into<String>, status: EndpointStatus) -> Self {
        Self {
            name: name.into(),
            status,
            failure_reason: None,
        }
    }

    pub fn with_failure(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_platform_names() {
        let s: EndpointStatus = serde_json::from_str("\"InService\"").unwrap();
        assert_eq!(s, EndpointStatus::InService);
        assert_eq!(serde_json::to_string(&EndpointStatus::Failed).unwrap(), "\"Failed\"");
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let s: EndpointStatus = serde_json::from_str("\"Hibernating\"").unwrap();
        assert_eq!(s, EndpointStatus::Other("Hibernating".to_string()));
        assert_eq!(s.to_string(), "Hibernating");
        assert!(!s.is_ready());
        assert!(!s.is_failed());
    }
}
