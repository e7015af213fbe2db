use std::{borrow::Borrow, str::FromStr};

use bon::Builder;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{prelude::*, quantity::power::Kilowatts};

/// Low-voltage main distribution panel identifier, for example `LVMDP_1`.
#[derive(Clone, Debug, Display, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-friendly name: `LVMDP_1` becomes `LVMDP 1`.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.0.replacen('_', " ", 1)
    }
}

impl Borrow<str> for PanelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for PanelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim();
        ensure!(!id.is_empty(), "panel ID must not be empty");
        ensure!(
            id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            "panel ID `{id}` contains unsupported characters",
        );
        Ok(Self(id.to_owned()))
    }
}

/// Everything the engine needs to know about a single panel.
#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct PanelConfig {
    pub id: PanelId,

    /// Installed capacity, used for utilization.
    #[builder(default)]
    pub capacity: Kilowatts,
}

impl PanelConfig {
    /// Known plant panels come with their installed capacity.
    pub fn with_known_capacity(id: PanelId) -> Self {
        let capacity = match id.as_str() {
            "LVMDP_1" | "LVMDP_2" => Kilowatts(1000.0),
            "LVMDP_3" => Kilowatts(2000.0),
            "LVMDP_4" => Kilowatts(1540.0),
            _ => Kilowatts::ZERO,
        };
        Self { id, capacity }
    }
}
