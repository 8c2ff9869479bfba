//! Input schema for every chart section of a request document.
//!
//! Each section is an explicit struct with `#[serde(default)]` so missing keys
//! resolve to documented defaults at the dispatcher boundary. Nothing below the
//! dispatcher reads raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChartError, Result};

/// Chart sections understood by the dispatcher, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Prisma,
    Scree,
    SearchStrategy,
    TemporalDistribution,
    QualityAssessment,
    BubbleChart,
    TechnicalSynthesis,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Prisma,
        ChartKind::Scree,
        ChartKind::SearchStrategy,
        ChartKind::TemporalDistribution,
        ChartKind::QualityAssessment,
        ChartKind::BubbleChart,
        ChartKind::TechnicalSynthesis,
    ];

    /// Key of the section in the request document.
    pub fn key(self) -> &'static str {
        match self {
            ChartKind::Prisma => "prisma",
            ChartKind::Scree => "scree",
            ChartKind::SearchStrategy => "search_strategy",
            ChartKind::TemporalDistribution => "temporal_distribution",
            ChartKind::QualityAssessment => "quality_assessment",
            ChartKind::BubbleChart => "bubble_chart",
            ChartKind::TechnicalSynthesis => "technical_synthesis",
        }
    }

    /// Key under which the artifact is listed in the output manifest.
    pub fn manifest_key(self) -> &'static str {
        match self {
            ChartKind::SearchStrategy => "chart1",
            other => other.key(),
        }
    }

    /// Artifact file name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::Prisma => "prisma_flow",
            ChartKind::Scree => "scree_plot",
            ChartKind::SearchStrategy => "chart1_search",
            other => other.key(),
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

/// A request section resolved into its schema type.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartRequest {
    Prisma(StageCounts),
    Scree(ScreeRequest),
    SearchStrategy(Vec<SearchSource>),
    TemporalDistribution(TemporalRequest),
    QualityAssessment(QualityRequest),
    BubbleChart(KeywordRequest),
    TechnicalSynthesis(SynthesisRequest),
}

impl ChartRequest {
    pub fn from_value(kind: ChartKind, value: Value) -> Result<Self> {
        let invalid = |source| ChartError::InvalidChartData {
            chart: kind.key(),
            source,
        };
        Ok(match kind {
            ChartKind::Prisma => Self::Prisma(serde_json::from_value(value).map_err(invalid)?),
            ChartKind::Scree => Self::Scree(serde_json::from_value(value).map_err(invalid)?),
            ChartKind::SearchStrategy => {
                // A `null` section means "nothing to list", like an empty array.
                let sources = if value.is_null() {
                    Vec::new()
                } else {
                    serde_json::from_value(value).map_err(invalid)?
                };
                Self::SearchStrategy(sources)
            }
            ChartKind::TemporalDistribution => {
                Self::TemporalDistribution(serde_json::from_value(value).map_err(invalid)?)
            }
            ChartKind::QualityAssessment => {
                Self::QualityAssessment(serde_json::from_value(value).map_err(invalid)?)
            }
            ChartKind::BubbleChart => {
                Self::BubbleChart(serde_json::from_value(value).map_err(invalid)?)
            }
            ChartKind::TechnicalSynthesis => {
                Self::TechnicalSynthesis(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Prisma(_) => ChartKind::Prisma,
            Self::Scree(_) => ChartKind::Scree,
            Self::SearchStrategy(_) => ChartKind::SearchStrategy,
            Self::TemporalDistribution(_) => ChartKind::TemporalDistribution,
            Self::QualityAssessment(_) => ChartKind::QualityAssessment,
            Self::BubbleChart(_) => ChartKind::BubbleChart,
            Self::TechnicalSynthesis(_) => ChartKind::TechnicalSynthesis,
        }
    }
}

/// One bibliographic source feeding the identification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseHits {
    /// Defaults to `"Unknown"`.
    pub name: String,
    /// Defaults to 0.
    pub hits: i64,
}

impl Default for DatabaseHits {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            hits: 0,
        }
    }
}

impl DatabaseHits {
    pub fn new(name: impl Into<String>, hits: i64) -> Self {
        Self {
            name: name.into(),
            hits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExclusionReason {
    pub reason: String,
    pub count: i64,
}

/// Reason → count mapping in the order the caller wrote it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct ReasonCounts(pub Vec<ExclusionReason>);

impl ReasonCounts {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExclusionReason> {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for ReasonCounts {
    fn from_iter<T: IntoIterator<Item = (S, i64)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(reason, count)| ExclusionReason {
                    reason: reason.into(),
                    count,
                })
                .collect(),
        )
    }
}

impl TryFrom<Map<String, Value>> for ReasonCounts {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut reasons = Vec::with_capacity(map.len());
        for (reason, value) in map {
            let count = value
                .as_i64()
                .ok_or_else(|| format!("count for reason `{reason}` is not an integer"))?;
            reasons.push(ExclusionReason { reason, count });
        }
        Ok(Self(reasons))
    }
}

/// PRISMA stage counts. Every count defaults to 0 and no cross-stage
/// consistency is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageCounts {
    pub identified: i64,
    pub databases: Vec<DatabaseHits>,
    pub duplicates: i64,
    pub screened: i64,
    /// Records excluded at title/abstract screening. `None` means not reported.
    pub excluded: Option<i64>,
    pub screening_exclusion_reasons: ReasonCounts,
    pub retrieved: i64,
    pub not_retrieved: i64,
    pub assessed: i64,
    /// Reports excluded at full text. Derived from `assessed - included` when absent.
    pub excluded_fulltext: Option<i64>,
    pub excluded_reasons: ReasonCounts,
    pub protocol_exclusion_criteria: Vec<String>,
    pub included: i64,
}

impl StageCounts {
    /// Eligibility exclusions: the explicit count if present, otherwise
    /// `assessed - included` clamped at zero.
    pub fn eligibility_excluded(&self) -> i64 {
        self.excluded_fulltext
            .unwrap_or_else(|| (self.assessed - self.included).max(0))
    }

    /// True when the section carried no stage data at all (`{}` or only nulls).
    pub fn is_blank(&self) -> bool {
        *self == Self::default()
    }

    /// Explicitly supplied counts that are negative, by field name.
    pub fn negative_counts(&self) -> Vec<(&'static str, i64)> {
        let fields = [
            ("identified", Some(self.identified)),
            ("duplicates", Some(self.duplicates)),
            ("screened", Some(self.screened)),
            ("excluded", self.excluded),
            ("retrieved", Some(self.retrieved)),
            ("not_retrieved", Some(self.not_retrieved)),
            ("assessed", Some(self.assessed)),
            ("excluded_fulltext", self.excluded_fulltext),
            ("included", Some(self.included)),
        ];
        fields
            .into_iter()
            .filter_map(|(name, value)| value.filter(|v| *v < 0).map(|v| (name, v)))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeRequest {
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSource {
    /// Defaults to `"Unknown"`.
    pub name: String,
    pub hits: i64,
    /// Blank or missing strings are shown as `N/A`.
    pub search_string: Option<String>,
}

impl Default for SearchSource {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            hits: 0,
            search_string: None,
        }
    }
}

/// `{ "years": { "2019": 2, "2020": 5 } }`. Keys must parse as integers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalRequest {
    pub years: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRequest {
    pub questions: Vec<String>,
    pub yes: Vec<f64>,
    pub no: Vec<f64>,
    pub partial: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordEntry {
    /// Defaults to `"Unknown"`.
    pub keyword: String,
    pub count: i64,
}

impl Default for KeywordEntry {
    fn default() -> Self {
        Self {
            keyword: "Unknown".to_string(),
            count: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRequest {
    pub entries: Vec<KeywordEntry>,
}

/// Rows of free-form metrics; `study` and `tool` columns are required once
/// any row exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisRequest {
    pub studies: Vec<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_counts_default_missing_fields() {
        let counts: StageCounts = serde_json::from_str(r#"{"identified": 12}"#).unwrap();
        assert_eq!(counts.identified, 12);
        assert_eq!(counts.screened, 0);
        assert!(counts.excluded.is_none());
        assert!(counts.databases.is_empty());
    }

    #[test]
    fn reasons_keep_caller_order() {
        let counts: StageCounts = serde_json::from_str(
            r#"{"excluded_reasons": {"Wrong population": 4, "Abstract only": 2, "Duplicate report": 1}}"#,
        )
        .unwrap();
        let order: Vec<&str> = counts
            .excluded_reasons
            .iter()
            .map(|r| r.reason.as_str())
            .collect();
        assert_eq!(order, ["Wrong population", "Abstract only", "Duplicate report"]);
    }

    #[test]
    fn non_integer_reason_count_is_rejected() {
        let err = serde_json::from_str::<StageCounts>(r#"{"excluded_reasons": {"x": "many"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn derived_eligibility_exclusions_never_negative() {
        let counts = StageCounts {
            assessed: 10,
            included: 12,
            ..Default::default()
        };
        assert_eq!(counts.eligibility_excluded(), 0);
        let explicit = StageCounts {
            excluded_fulltext: Some(-3),
            ..Default::default()
        };
        assert_eq!(explicit.eligibility_excluded(), -3);
        assert_eq!(explicit.negative_counts(), vec![("excluded_fulltext", -3)]);
    }

    #[test]
    fn database_entries_fill_defaults() {
        let counts: StageCounts =
            serde_json::from_str(r#"{"databases": [{"hits": 4}, {"name": "Scopus"}]}"#).unwrap();
        assert_eq!(counts.databases[0], DatabaseHits::new("Unknown", 4));
        assert_eq!(counts.databases[1], DatabaseHits::new("Scopus", 0));
    }

    #[test]
    fn chart_kind_keys_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ChartKind::SearchStrategy.manifest_key(), "chart1");
        assert_eq!(ChartKind::Prisma.file_stem(), "prisma_flow");
        assert_eq!(ChartKind::from_key("word_cloud"), None);
    }

    #[test]
    fn wrong_section_shape_is_invalid_chart_data() {
        let err = ChartRequest::from_value(ChartKind::Scree, serde_json::json!({"scores": "high"}))
            .unwrap_err();
        assert!(matches!(err, ChartError::InvalidChartData { chart: "scree", .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn search_source_reads_camel_case() {
        let sources: Vec<SearchSource> =
            serde_json::from_str(r#"[{"name": "IEEE", "hits": 3, "searchString": "a AND b"}]"#)
                .unwrap();
        assert_eq!(sources[0].search_string.as_deref(), Some("a AND b"));
    }
}
