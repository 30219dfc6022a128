use serde::{Deserialize, Serialize};

pub const MISSING_FACT: &str = "—";
pub const MISSING_SUMMARY: &str = "No summary available.";
pub const MISSING_DETAIL: &str = "Data not provided.";

/// Descriptive text shown in the info panel for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub capital: String,
    pub population: String,
    /// Short summary paragraph.
    pub short: String,
    pub politics: String,
    pub economics: String,
}

impl Default for RegionInfo {
    fn default() -> Self {
        Self {
            capital: MISSING_FACT.to_string(),
            population: MISSING_FACT.to_string(),
            short: MISSING_SUMMARY.to_string(),
            politics: MISSING_DETAIL.to_string(),
            economics: MISSING_DETAIL.to_string(),
        }
    }
}

/// First non-blank candidate, trimmed.
pub(crate) fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{RegionInfo, first_text};

    #[test]
    fn default_info_is_all_placeholders() {
        let json = serde_json::to_value(RegionInfo::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "capital": "—",
                "population": "—",
                "short": "No summary available.",
                "politics": "Data not provided.",
                "economics": "Data not provided.",
            })
        );
    }

    #[test]
    fn first_text_skips_blanks() {
        assert_eq!(first_text([None, Some("  "), Some(" Rome ")]), Some("Rome".to_string()));
        assert_eq!(first_text([None, Some("")]), None);
    }
}
