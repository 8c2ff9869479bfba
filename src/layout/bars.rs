use serde_json::Value;

use crate::config::{BarChartConfig, LayoutConfig};
use crate::error::{ChartError, Result};
use crate::request::{ChartKind, KeywordRequest, QualityRequest, TemporalRequest};
use crate::theme::{Theme, scale_rgb};

use super::text::{format_number, text_width, title_case};
use super::{
    AxisTick, BarChartLayout, BarLabel, BarRect, DiagramData, Layout, LegendEntry, LegendGlyph,
    LineStyle, LinearScale, Orientation, PlotFrame, Polyline, TextAnchor, empty_section_layout,
    integer_ticks, placeholder_layout, value_ticks,
};

const TEMPORAL_BAR_WIDTH: f64 = 0.8;
const KEYWORD_BAR_FRACTION: f32 = 0.65;
const LABEL_GAP: f32 = 4.0;

fn plot_frame(cfg: &BarChartConfig, margin_left: f32, plot_height: f32) -> PlotFrame {
    PlotFrame {
        x: margin_left,
        y: cfg.margin_top,
        width: cfg.plot_width,
        height: plot_height,
    }
}

fn bar_layout(cfg: &BarChartConfig, chart: BarChartLayout, kind: ChartKind) -> Layout {
    let width = chart.frame.right() + cfg.margin_right;
    let height = chart.frame.bottom() + cfg.margin_bottom;
    Layout {
        kind,
        width,
        height,
        diagram: DiagramData::Bars(chart),
    }
}

fn count_ticks(scale: &LinearScale, target: usize) -> Vec<AxisTick> {
    value_ticks(scale.domain, target)
        .into_iter()
        .filter(|value| *value >= 0.0)
        .map(|value| AxisTick {
            label: format_number(value),
            pos: scale.map(value),
        })
        .collect()
}

/// Publication counts per year with a least-squares trend.
pub(super) fn compute_temporal_layout(
    request: &TemporalRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout> {
    const CHART: &str = "temporal_distribution";
    if request.years.is_empty() {
        return Ok(empty_section_layout(ChartKind::TemporalDistribution, theme));
    }

    let mut series = Vec::with_capacity(request.years.len());
    for (key, value) in &request.years {
        let year: i64 = key.trim().parse().map_err(|_| {
            ChartError::malformed(CHART, format!("year `{key}` is not an integer"))
        })?;
        let count = match value {
            Value::Null => 0.0,
            Value::Number(number) => number.as_f64().unwrap_or(0.0),
            other => {
                return Err(ChartError::malformed(
                    CHART,
                    format!("count for {year} must be a number, found {other}"),
                ));
            }
        };
        series.push((year, count));
    }
    series.sort_by_key(|(year, _)| *year);

    let cfg = &config.bars;
    let frame = plot_frame(cfg, cfg.margin_left, cfg.plot_height);
    let first = series[0].0 as f64;
    let last = series[series.len() - 1].0 as f64;
    let x_scale = LinearScale::new((first - 0.6, last + 0.6), (frame.x, frame.right()));
    let max_count = series.iter().map(|(_, c)| *c).fold(0.0_f64, f64::max);
    let y_scale = LinearScale::new((0.0, (max_count * 1.15).max(1.0)), (frame.bottom(), frame.y));

    let half = TEMPORAL_BAR_WIDTH / 2.0;
    let bars = series
        .iter()
        .map(|(year, count)| {
            let x0 = x_scale.map(*year as f64 - half);
            let x1 = x_scale.map(*year as f64 + half);
            let top = y_scale.map(count.max(0.0));
            BarRect {
                x: x0,
                y: top,
                width: x1 - x0,
                height: frame.bottom() - top,
                color: theme.bar_fill.clone(),
                label: Some(BarLabel {
                    text: format_number(*count),
                    x: (x0 + x1) / 2.0,
                    y: top - LABEL_GAP,
                    anchor: TextAnchor::Middle,
                    color: theme.text_color.clone(),
                    bold: true,
                }),
            }
        })
        .collect();

    let x_ticks = series
        .iter()
        .map(|(year, _)| AxisTick {
            label: year.to_string(),
            pos: x_scale.map(*year as f64),
        })
        .collect();

    let mut legend = Vec::new();
    let trend = if series.len() >= 3 {
        let xs: Vec<f64> = series.iter().map(|(y, _)| *y as f64).collect();
        let ys: Vec<f64> = series.iter().map(|(_, c)| *c).collect();
        polyfit(&xs, &ys, 2.min(series.len() - 1)).map(|coefficients| {
            let samples = cfg.trend_samples.max(2);
            let points = (0..samples)
                .map(|i| {
                    let x = first + (last - first) * i as f64 / (samples - 1) as f64;
                    (x_scale.map(x), y_scale.map(coefficients.eval(x)))
                })
                .collect();
            legend.push(LegendEntry {
                label: "Trend".to_string(),
                color: theme.trend_color.clone(),
                glyph: LegendGlyph::Line(LineStyle::Dashed),
            });
            Polyline {
                points,
                color: theme.trend_color.clone(),
                style: LineStyle::Dashed,
                width: 2.0,
            }
        })
    } else {
        None
    };

    let chart = BarChartLayout {
        frame,
        title: "Temporal Distribution of Included Studies".to_string(),
        x_label: "Publication Year".to_string(),
        y_label: Some("Number of Studies".to_string()),
        bars,
        x_ticks,
        y_ticks: count_ticks(&y_scale, cfg.y_ticks),
        x_tick_rotation: 45.0,
        grid: Orientation::Horizontal,
        trend,
        legend,
    };
    Ok(bar_layout(cfg, chart, ChartKind::TemporalDistribution))
}

/// Polynomial in `x - center`, lowest degree first.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polynomial {
    center: f64,
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn eval(&self, x: f64) -> f64 {
        let t = x - self.center;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, coefficient| acc * t + coefficient)
    }
}

/// Least-squares polynomial fit of `degree` through the points. The x values
/// are centred first so year-sized inputs stay well conditioned. `None` when
/// the normal equations are singular.
pub(crate) fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Option<Polynomial> {
    if xs.len() != ys.len() || xs.is_empty() {
        return None;
    }
    let center = xs.iter().sum::<f64>() / xs.len() as f64;
    let size = degree + 1;
    let mut matrix = vec![vec![0.0; size + 1]; size];
    for (x, y) in xs.iter().zip(ys) {
        let t = x - center;
        let powers: Vec<f64> = (0..=2 * degree).map(|p| t.powi(p as i32)).collect();
        for row in 0..size {
            for col in 0..size {
                matrix[row][col] += powers[row + col];
            }
            matrix[row][size] += powers[row] * y;
        }
    }

    // Gauss-Jordan with partial pivoting.
    for col in 0..size {
        let pivot = (col..size).max_by(|a, b| {
            matrix[*a][col]
                .abs()
                .total_cmp(&matrix[*b][col].abs())
        })?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        let lead = matrix[col][col];
        for value in matrix[col].iter_mut() {
            *value /= lead;
        }
        for row in 0..size {
            if row != col {
                let factor = matrix[row][col];
                if factor != 0.0 {
                    for k in col..=size {
                        let delta = factor * matrix[col][k];
                        matrix[row][k] -= delta;
                    }
                }
            }
        }
    }
    Some(Polynomial {
        center,
        coefficients: matrix.iter().map(|row| row[size]).collect(),
    })
}

/// Yes/partial/no answers stacked per quality question.
pub(super) fn compute_quality_layout(
    request: &QualityRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout> {
    const CHART: &str = "quality_assessment";
    let count = request.questions.len();
    if count == 0 {
        return Ok(empty_section_layout(ChartKind::QualityAssessment, theme));
    }
    for (name, series) in [
        ("yes", &request.yes),
        ("partial", &request.partial),
        ("no", &request.no),
    ] {
        if series.len() != count {
            return Err(ChartError::malformed(
                CHART,
                format!(
                    "`{name}` has {} values for {count} questions",
                    series.len()
                ),
            ));
        }
    }

    let cfg = &config.bars;
    let frame = plot_frame(cfg, cfg.margin_left, cfg.plot_height);
    let totals: Vec<f64> = (0..count)
        .map(|i| request.yes[i].max(0.0) + request.partial[i].max(0.0) + request.no[i].max(0.0))
        .collect();
    let max_total = totals.iter().copied().fold(0.0_f64, f64::max);
    let y_scale = LinearScale::new((0.0, (max_total * 1.1).max(1.0)), (frame.bottom(), frame.y));
    let band = frame.width / count as f32;
    let bar_width = band * cfg.bar_fraction;

    let mut bars = Vec::new();
    let mut x_ticks = Vec::with_capacity(count);
    for (i, question) in request.questions.iter().enumerate() {
        let center = frame.x + band * (i as f32 + 0.5);
        x_ticks.push(AxisTick {
            label: question.clone(),
            pos: center,
        });
        let mut base = 0.0;
        let mut yes_bar = None;
        for (segment, (value, color)) in [
            (request.yes[i], &theme.quality_yes),
            (request.partial[i], &theme.quality_partial),
            (request.no[i], &theme.quality_no),
        ]
        .into_iter()
        .enumerate()
        {
            let value = value.max(0.0);
            if value <= 0.0 {
                continue;
            }
            let bottom = y_scale.map(base);
            let top = y_scale.map(base + value);
            if segment == 0 {
                yes_bar = Some(bars.len());
            }
            bars.push(BarRect {
                x: center - bar_width / 2.0,
                y: top,
                width: bar_width,
                height: bottom - top,
                color: color.clone(),
                label: None,
            });
            base += value;
        }

        if let Some(index) = yes_bar
            && totals[i] > 0.0
        {
            let yes = request.yes[i].max(0.0);
            let share = (yes / totals[i] * 100.0) as f32;
            if share >= cfg.min_percent_label {
                bars[index].label = Some(BarLabel {
                    text: format!("{share:.0}%"),
                    x: center,
                    y: y_scale.map(yes / 2.0),
                    anchor: TextAnchor::Middle,
                    color: theme.background.clone(),
                    bold: true,
                });
            }
        }
    }

    let legend = [
        ("Yes", &theme.quality_yes),
        ("Partial", &theme.quality_partial),
        ("No", &theme.quality_no),
    ]
    .into_iter()
    .map(|(label, color)| LegendEntry {
        label: label.to_string(),
        color: color.clone(),
        glyph: LegendGlyph::Patch,
    })
    .collect();

    let chart = BarChartLayout {
        frame,
        title: "Methodological Quality Assessment".to_string(),
        x_label: "Quality Criteria (Kitchenham)".to_string(),
        y_label: Some("Number of Studies".to_string()),
        bars,
        x_ticks,
        y_ticks: count_ticks(&y_scale, cfg.y_ticks),
        x_tick_rotation: 0.0,
        grid: Orientation::Horizontal,
        trend: None,
        legend,
    };
    Ok(bar_layout(cfg, chart, ChartKind::QualityAssessment))
}

/// Horizontal bars for the most frequent keywords, highest first.
pub(super) fn compute_keyword_layout(
    request: &KeywordRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Layout {
    if request.entries.is_empty() {
        return empty_section_layout(ChartKind::BubbleChart, theme);
    }
    let cfg = &config.bars;

    // Stable sort keeps input order between equal counts.
    let mut entries: Vec<_> = request.entries.iter().collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(cfg.keyword_limit);

    let max_count = entries.iter().map(|e| e.count).max().unwrap_or(0);
    if max_count <= 0 {
        tracing::warn!("keyword counts are all zero, rendering placeholder");
        return placeholder_layout(
            ChartKind::BubbleChart,
            vec!["Insufficient keyword data for thematic mapping".to_string()],
            theme.placeholder_color.clone(),
            theme,
        );
    }

    let labels: Vec<String> = entries.iter().map(|e| title_case(&e.keyword)).collect();
    let gutter = labels
        .iter()
        .map(|label| {
            text_width(
                label,
                theme.font_size,
                &theme.font_family,
                config.fast_text_metrics,
            )
        })
        .fold(0.0_f32, f32::max)
        + 24.0;
    let plot_height = cfg.keyword_row_height * entries.len() as f32;
    let frame = plot_frame(cfg, gutter.max(cfg.margin_left), plot_height);

    let x_max = max_count as f64 * cfg.keyword_x_headroom as f64;
    let x_scale = LinearScale::new((0.0, x_max), (frame.x, frame.right()));
    let label_offset = max_count as f64 * 0.02;
    let bar_height = cfg.keyword_row_height * KEYWORD_BAR_FRACTION;

    let mut bars = Vec::with_capacity(entries.len());
    let mut y_ticks = Vec::with_capacity(entries.len());
    for (row, (entry, label)) in entries.iter().zip(labels).enumerate() {
        let center = frame.y + cfg.keyword_row_height * (row as f32 + 0.5);
        let count = entry.count.max(0);
        let intensity = 0.4 + 0.6 * count as f32 / max_count as f32;
        let end = x_scale.map(count as f64);
        bars.push(BarRect {
            x: frame.x,
            y: center - bar_height / 2.0,
            width: end - frame.x,
            height: bar_height,
            color: scale_rgb(theme.keyword_base, intensity),
            label: Some(BarLabel {
                text: entry.count.to_string(),
                x: x_scale.map(count as f64 + label_offset),
                y: center,
                anchor: TextAnchor::Start,
                color: theme.series_color.clone(),
                bold: true,
            }),
        });
        y_ticks.push(AxisTick { label, pos: center });
    }

    let x_ticks = integer_ticks(0, x_max.floor() as i64, 6)
        .into_iter()
        .map(|value| AxisTick {
            label: value.to_string(),
            pos: x_scale.map(value as f64),
        })
        .collect();

    let chart = BarChartLayout {
        frame,
        title: "Thematic Keyword Concentration in Included Studies".to_string(),
        x_label: "Frequency (number of studies)".to_string(),
        y_label: None,
        bars,
        x_ticks,
        y_ticks,
        x_tick_rotation: 0.0,
        grid: Orientation::Vertical,
        trend: None,
        legend: Vec::new(),
    };
    bar_layout(cfg, chart, ChartKind::BubbleChart)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::KeywordEntry;
    use serde_json::json;

    fn temporal(years: Value) -> Result<Layout> {
        let request: TemporalRequest = serde_json::from_value(json!({ "years": years })).unwrap();
        compute_temporal_layout(&request, &Theme::academic(), &LayoutConfig::default())
    }

    fn bars_of(layout: &Layout) -> &BarChartLayout {
        match &layout.diagram {
            DiagramData::Bars(chart) => chart,
            other => panic!("expected bar chart, got {other:?}"),
        }
    }

    #[test]
    fn quadratic_fit_recovers_coefficients() {
        let xs = [2018.0, 2019.0, 2020.0, 2021.0, 2022.0];
        let ys: Vec<f64> = xs.iter().map(|x: &f64| 3.0 + 0.5 * (x - 2020.0).powi(2)).collect();
        let fit = polyfit(&xs, &ys, 2).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!((fit.eval(*x) - y).abs() < 1e-6);
        }
    }

    #[test]
    fn linear_fit_through_two_points() {
        let fit = polyfit(&[1.0, 3.0], &[2.0, 6.0], 1).unwrap();
        assert!((fit.eval(2.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn years_sorted_with_trend() {
        let layout = temporal(json!({"2021": 8, "2019": 2, "2020": 5})).unwrap();
        let chart = bars_of(&layout);
        let labels: Vec<&str> = chart.x_ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["2019", "2020", "2021"]);
        assert_eq!(chart.bars.len(), 3);
        assert!(chart.bars.windows(2).all(|w| w[0].x < w[1].x));
        let trend = chart.trend.as_ref().expect("trend with three years");
        assert_eq!(trend.points.len(), 100);
        assert_eq!(
            chart.bars[2].label.as_ref().map(|l| l.text.as_str()),
            Some("8")
        );
    }

    #[test]
    fn two_years_have_no_trend() {
        let layout = temporal(json!({"2020": 1, "2021": 4})).unwrap();
        assert!(bars_of(&layout).trend.is_none());
    }

    #[test]
    fn non_integer_year_is_rejected() {
        let err = temporal(json!({"2020": 1, "recent": 4})).unwrap_err();
        assert!(matches!(
            err,
            ChartError::MalformedChart {
                chart: "temporal_distribution",
                ..
            }
        ));
    }

    #[test]
    fn empty_years_render_placeholder() {
        let layout = temporal(json!({})).unwrap();
        assert!(matches!(layout.diagram, DiagramData::Placeholder(_)));
    }

    #[test]
    fn quality_bars_stack_and_label_yes_share() {
        let request = QualityRequest {
            questions: vec!["QA1".into(), "QA2".into()],
            yes: vec![8.0, 0.5],
            partial: vec![1.0, 4.5],
            no: vec![1.0, 5.0],
        };
        let layout =
            compute_quality_layout(&request, &Theme::academic(), &LayoutConfig::default()).unwrap();
        let chart = bars_of(&layout);
        assert_eq!(chart.bars.len(), 6);
        let labels: Vec<&str> = chart
            .bars
            .iter()
            .filter_map(|b| b.label.as_ref())
            .map(|l| l.text.as_str())
            .collect();
        // QA2 has a 5% yes share, below the label cut-off.
        assert_eq!(labels, vec!["80%"]);
        // Partial sits directly on top of yes.
        assert!((chart.bars[0].y - (chart.bars[1].y + chart.bars[1].height)).abs() < 1e-3);
        assert_eq!(chart.legend.len(), 3);
    }

    #[test]
    fn quality_length_mismatch_fails() {
        let request = QualityRequest {
            questions: vec!["QA1".into(), "QA2".into()],
            yes: vec![1.0],
            partial: vec![0.0, 0.0],
            no: vec![0.0, 0.0],
        };
        let err = compute_quality_layout(&request, &Theme::academic(), &LayoutConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("`yes` has 1 values for 2 questions"));
    }

    fn keywords(pairs: &[(&str, i64)]) -> Layout {
        let request = KeywordRequest {
            entries: pairs
                .iter()
                .map(|(keyword, count)| KeywordEntry {
                    keyword: keyword.to_string(),
                    count: *count,
                })
                .collect(),
        };
        let mut config = LayoutConfig::default();
        config.fast_text_metrics = true;
        compute_keyword_layout(&request, &Theme::academic(), &config)
    }

    #[test]
    fn keywords_sorted_highest_first_and_title_cased() {
        let layout = keywords(&[("testing", 3), ("deep learning", 9), ("nlp", 3), ("llm", 5)]);
        let chart = bars_of(&layout);
        let labels: Vec<&str> = chart.y_ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["Deep Learning", "Llm", "Testing", "Nlp"]);
        assert_eq!(chart.bars[0].color, "#3498db");
        assert!(chart.bars[0].width > chart.bars[1].width);
        assert!(chart.x_ticks.iter().all(|t| t.label.parse::<i64>().is_ok()));
    }

    #[test]
    fn keywords_capped_at_limit() {
        let entries: Vec<(String, i64)> = (0..20).map(|i| (format!("kw{i}"), i)).collect();
        let pairs: Vec<(&str, i64)> = entries.iter().map(|(k, c)| (k.as_str(), *c)).collect();
        let chart_layout = keywords(&pairs);
        let chart = bars_of(&chart_layout);
        assert_eq!(chart.bars.len(), 15);
        assert_eq!(chart.y_ticks[0].label, "Kw19");
    }

    #[test]
    fn zero_counts_render_placeholder() {
        let layout = keywords(&[("a", 0), ("b", 0)]);
        assert!(matches!(layout.diagram, DiagramData::Placeholder(_)));
    }
}
