mod bars;
mod placeholder;
pub mod prisma;
mod scree;
mod table;
pub mod text;
pub(crate) mod types;
pub use types::*;

use bars::*;
use placeholder::*;
use scree::*;
use table::*;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::request::{ChartKind, ChartRequest};
use crate::theme::Theme;

pub use prisma::compute_flow_layout;

/// Lay out one chart section. Sections without enough data come back as a
/// placeholder layout; structurally broken sections are errors.
pub fn compute_layout(
    request: &ChartRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout> {
    let layout = match request {
        ChartRequest::Prisma(counts) if counts.is_blank() => {
            empty_section_layout(ChartKind::Prisma, theme)
        }
        ChartRequest::Prisma(counts) => flow_canvas(compute_flow_layout(counts, &config.prisma)),
        ChartRequest::Scree(scores) => compute_scree_layout(scores, theme, config),
        ChartRequest::SearchStrategy(sources) => compute_search_table(sources, theme, config),
        ChartRequest::TemporalDistribution(years) => {
            compute_temporal_layout(years, theme, config)?
        }
        ChartRequest::QualityAssessment(quality) => compute_quality_layout(quality, theme, config)?,
        ChartRequest::BubbleChart(keywords) => compute_keyword_layout(keywords, theme, config),
        ChartRequest::TechnicalSynthesis(synthesis) => {
            compute_synthesis_table(synthesis, theme, config)?
        }
    };
    tracing::debug!(
        chart = request.kind().key(),
        width = layout.width,
        height = layout.height,
        "computed layout"
    );
    Ok(layout)
}

/// Wrap a flow diagram in pixel dimensions: the visible unit range plus the
/// title band above it.
fn flow_canvas(flow: FlowLayout) -> Layout {
    let width = flow.canvas_width * flow.px_per_unit;
    let height = (flow.y_max - flow.y_min) * flow.px_per_unit + flow.title_band;
    Layout {
        kind: ChartKind::Prisma,
        width,
        height,
        diagram: DiagramData::Flow(flow),
    }
}

/// Linear map from data values to pixels. The range may be inverted, which
/// is how plot y axes grow upward.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f32, f32),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f32, f32)) -> Self {
        let domain = if (domain.1 - domain.0).abs() < f64::EPSILON {
            (domain.0 - 0.5, domain.1 + 0.5)
        } else {
            domain
        };
        Self { domain, range }
    }

    pub fn map(&self, value: f64) -> f32 {
        let t = (value - self.domain.0) / (self.domain.1 - self.domain.0);
        self.range.0 + (self.range.1 - self.range.0) * t as f32
    }
}

/// Step of 1, 2, 2.5 or 5 times a power of ten giving roughly `target`
/// intervals over `span`.
pub(crate) fn nice_step(span: f64, target: usize) -> f64 {
    if span <= 0.0 || !span.is_finite() {
        return 1.0;
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 2.5 {
        2.5
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick values on multiples of a nice step, inside `domain`.
pub(crate) fn value_ticks(domain: (f64, f64), target: usize) -> Vec<f64> {
    let (lo, hi) = if domain.0 <= domain.1 {
        domain
    } else {
        (domain.1, domain.0)
    };
    let step = nice_step(hi - lo, target);
    let mut value = (lo / step).ceil() * step;
    let mut ticks = Vec::new();
    while value <= hi + step * 1e-9 {
        // Avoid printing -0.00.
        ticks.push(if value.abs() < step * 1e-9 { 0.0 } else { value });
        value += step;
    }
    ticks
}

/// Whole-number ticks from `lo` to `hi`, thinned to at most about `max_count`.
pub(crate) fn integer_ticks(lo: i64, hi: i64, max_count: usize) -> Vec<i64> {
    if hi < lo {
        return Vec::new();
    }
    let span = (hi - lo) as f64;
    let step = nice_step(span, max_count).ceil().max(1.0) as i64;
    let start = if lo % step == 0 {
        lo
    } else {
        lo + (step - lo.rem_euclid(step))
    };
    (0..)
        .map(|i| start + i * step)
        .take_while(|value| *value <= hi)
        .collect()
}
