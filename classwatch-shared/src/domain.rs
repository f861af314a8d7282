use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Connectivity/lock state of a monitored tablet.
///
/// Transitions are operator-triggered through the status update
/// endpoint: `offline -> online -> {warning, blocked}`, `warning ->
/// blocked` on further violation, and `blocked -> online` via an
/// explicit unblock. Nothing changes state autonomously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabletStatus {
    Online,
    Offline,
    Warning,
    Blocked,
}

impl TabletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabletStatus::Online => "online",
            TabletStatus::Offline => "offline",
            TabletStatus::Warning => "warning",
            TabletStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for TabletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value: {0}")]
pub struct ParseEnumError(String);

impl FromStr for TabletStatus {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(TabletStatus::Online),
            "offline" => Ok(TabletStatus::Offline),
            "warning" => Ok(TabletStatus::Warning),
            "blocked" => Ok(TabletStatus::Blocked),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(ParseEnumError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tablet_status_round_trip() {
        for s in [
            TabletStatus::Online,
            TabletStatus::Offline,
            TabletStatus::Warning,
            TabletStatus::Blocked,
        ] {
            assert_eq!(s.as_str().parse::<TabletStatus>().unwrap(), s);
        }
        assert!("locked".parse::<TabletStatus>().is_err());
    }

    #[test]
    fn severity_serde_is_lowercase() {
        let v = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(v, "\"high\"");
        let back: Severity = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(back, Severity::Low);
    }
}
