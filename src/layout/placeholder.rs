use crate::request::ChartKind;
use crate::theme::Theme;

use super::{DiagramData, Layout, PlaceholderLayout};

const PLACEHOLDER_WIDTH: f32 = 800.0;
const PLACEHOLDER_HEIGHT: f32 = 480.0;

/// Centred message standing in for a chart that has nothing to draw.
pub(super) fn placeholder_layout(
    kind: ChartKind,
    lines: Vec<String>,
    color: String,
    theme: &Theme,
) -> Layout {
    Layout {
        kind,
        width: PLACEHOLDER_WIDTH,
        height: PLACEHOLDER_HEIGHT,
        diagram: DiagramData::Placeholder(PlaceholderLayout {
            lines,
            color,
            font_size: theme.font_size + 2.0,
        }),
    }
}

/// Placeholder for a section that arrived without any rows.
pub(super) fn empty_section_layout(kind: ChartKind, theme: &Theme) -> Layout {
    let message = match kind {
        ChartKind::Prisma => "No PRISMA data available",
        ChartKind::Scree => "No relevance data available",
        ChartKind::SearchStrategy => "No search strategy data available",
        ChartKind::TemporalDistribution => "No temporal distribution data available",
        ChartKind::QualityAssessment => "No quality assessment data available",
        ChartKind::BubbleChart => "No thematic keyword data available",
        ChartKind::TechnicalSynthesis => "No technical synthesis data available",
    };
    tracing::warn!(chart = kind.key(), "no data, rendering placeholder");
    placeholder_layout(
        kind,
        vec![message.to_string()],
        theme.placeholder_color.clone(),
        theme,
    )
}
