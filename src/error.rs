use thiserror::Error;

/// Failures surfaced by the chart pipeline.
///
/// `InputFormat` and `NotAMapping` abort a whole request. The other variants
/// are scoped to one chart; the dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("request is not valid JSON: {0}")]
    InputFormat(#[from] serde_json::Error),

    #[error("request must be a JSON object mapping chart names to chart data, found {found}")]
    NotAMapping { found: &'static str },

    #[error("invalid data for chart `{chart}`: {source}")]
    InvalidChartData {
        chart: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("chart `{chart}`: {message}")]
    MalformedChart {
        chart: &'static str,
        message: String,
    },
}

impl ChartError {
    pub(crate) fn malformed(chart: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedChart {
            chart,
            message: message.into(),
        }
    }

    /// True when the error should stop the whole request rather than one chart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InputFormat(_) | Self::NotAMapping { .. })
    }
}

pub type Result<T, E = ChartError> = std::result::Result<T, E>;
