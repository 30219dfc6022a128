use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BUNDLED_TABLE: &str = include_str!("../assets/regions.json");

/// One hand-curated entry; any field may be missing.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEntry {
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub population: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub politics: Option<String>,
    #[serde(default)]
    pub economics: Option<String>,
}

/// Region facts compiled into the client, keyed by region name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StaticTable {
    entries: BTreeMap<String, StaticEntry>,
}

impl StaticTable {
    pub fn new(entries: BTreeMap<String, StaticEntry>) -> Self {
        Self { entries }
    }

    /// The table shipped with the crate. An unreadable table is treated as empty.
    pub fn bundled() -> Self {
        match Self::from_json(BUNDLED_TABLE) {
            Ok(table) => {
                debug!(entries = table.len(), "bundled region table loaded");
                table
            }
            Err(e) => {
                warn!("bundled region table unreadable: {e}");
                Self::default()
            }
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self::new)
    }

    pub fn get(&self, name: &str) -> Option<&StaticEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
