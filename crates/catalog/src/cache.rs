use std::collections::BTreeMap;

use crate::info::RegionInfo;

/// Per-region resolution state. A region with no entry is unrequested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoState {
    Loading,
    Ready(RegionInfo),
    Error(String),
}

/// Cache of region info keyed by region name, owned by the view.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InfoCache {
    entries: BTreeMap<String, InfoState>,
}

impl InfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `name` as loading.
    ///
    /// Returns `false` (and changes nothing) when the region is already
    /// loading or ready; a failed region may be retried.
    pub fn begin(&mut self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(InfoState::Loading | InfoState::Ready(_)) => false,
            Some(InfoState::Error(_)) | None => {
                self.entries.insert(name.to_string(), InfoState::Loading);
                true
            }
        }
    }

    pub fn complete(&mut self, name: &str, info: RegionInfo) {
        self.entries.insert(name.to_string(), InfoState::Ready(info));
    }

    pub fn fail(&mut self, name: &str, message: impl Into<String>) {
        self.entries
            .insert(name.to_string(), InfoState::Error(message.into()));
    }

    pub fn get(&self, name: &str) -> Option<&InfoState> {
        self.entries.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::{InfoCache, InfoState};
    use crate::info::RegionInfo;

    #[test]
    fn begin_is_idempotent_while_loading_or_ready() {
        let mut cache = InfoCache::new();
        assert!(cache.begin("Peru"));
        assert!(!cache.begin("Peru"));
        assert_eq!(cache.get("Peru"), Some(&InfoState::Loading));

        cache.complete("Peru", RegionInfo::default());
        assert!(!cache.begin("Peru"));
        assert_eq!(cache.get("Peru"), Some(&InfoState::Ready(RegionInfo::default())));
    }

    #[test]
    fn failed_regions_can_be_retried() {
        let mut cache = InfoCache::new();
        cache.fail("", "empty region name");
        assert_eq!(cache.get(""), Some(&InfoState::Error("empty region name".into())));
        assert!(cache.begin(""));
        assert_eq!(cache.get(""), Some(&InfoState::Loading));
    }
}
