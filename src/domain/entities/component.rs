//! Cache and data adapter configuration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::lookup::PluginConfig;

/// Which pluggable kind a [`Component`] configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Cache,
    DataAdapter,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::DataAdapter => "data_adapter",
        }
    }

    /// Human-readable label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cache => "Cache",
            Self::DataAdapter => "Data adapter",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(Self::Cache),
            "data_adapter" => Ok(Self::DataAdapter),
            other => Err(format!("unknown component kind '{other}'")),
        }
    }
}

/// A stored cache or data adapter configuration.
///
/// `name` is unique within its kind and is what tables reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: i64,
    pub kind: ComponentKind,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub config: PluginConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating or replacing a component.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComponent {
    pub kind: ComponentKind,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub config: PluginConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [ComponentKind::Cache, ComponentKind::DataAdapter] {
            assert_eq!(kind.as_str().parse::<ComponentKind>(), Ok(kind));
        }
        assert!("table".parse::<ComponentKind>().is_err());
    }
}
