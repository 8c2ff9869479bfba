use crate::config::LayoutConfig;
use crate::request::{ChartKind, ScreeRequest};
use crate::theme::Theme;
use crate::threshold::{InsufficientData, ThresholdDetector, ThresholdResult};

use super::{
    Annotation, AxisTick, DiagramData, Layout, LegendEntry, LegendGlyph, LineStyle, LinearScale,
    Orientation, PlotFrame, Polyline, ReferenceLine, TextAnchor, empty_section_layout,
    integer_ticks, placeholder_layout, value_ticks,
};

const REFERENCE_GRAY: &str = "#999999";

pub(super) fn compute_scree_layout(
    request: &ScreeRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Layout {
    let detector = ThresholdDetector::new().with_min_points(config.scree.min_points);
    match detector.detect(&request.scores) {
        Ok(result) => scree_plot(result, theme, config),
        Err(InsufficientData::Empty) => empty_section_layout(ChartKind::Scree, theme),
        Err(InsufficientData::BelowMinimum { count, required }) => {
            tracing::warn!(count, required, "insufficient scores for scree plot");
            placeholder_layout(
                ChartKind::Scree,
                vec![
                    format!("Insufficient data ({count} points)"),
                    format!("At least {required} references are required"),
                ],
                theme.warning_color.clone(),
                theme,
            )
        }
    }
}

fn scree_plot(result: ThresholdResult, theme: &Theme, config: &LayoutConfig) -> Layout {
    let cfg = &config.scree;
    let n = result.len();
    let frame = PlotFrame {
        x: cfg.margin_left,
        y: cfg.margin_top,
        width: cfg.plot_width,
        height: cfg.plot_height,
    };

    let x_pad = ((n - 1) as f64 * 0.04).max(0.5);
    let x_scale = LinearScale::new(
        (1.0 - x_pad, n as f64 + x_pad),
        (frame.x, frame.right()),
    );
    let max_score = result.ranked[0];
    let min_score = result.ranked[n - 1];
    let span = (max_score - min_score).max(0.1);
    // Headroom for the elbow annotation.
    let y_scale = LinearScale::new(
        (min_score.min(0.0), max_score + span * 0.15),
        (frame.bottom(), frame.y),
    );

    let points: Vec<(f32, f32)> = result
        .ranked
        .iter()
        .enumerate()
        .map(|(idx, score)| (x_scale.map((idx + 1) as f64), y_scale.map(*score)))
        .collect();
    let baseline = y_scale.map(min_score.min(0.0));
    let mut area = points.clone();
    area.push((points[n - 1].0, baseline));
    area.push((points[0].0, baseline));

    let x_ticks: Vec<AxisTick> = integer_ticks(1, n as i64, 10)
        .into_iter()
        .map(|rank| AxisTick {
            label: rank.to_string(),
            pos: x_scale.map(rank as f64),
        })
        .collect();
    let y_ticks: Vec<AxisTick> = value_ticks(y_scale.domain, cfg.y_ticks)
        .into_iter()
        .map(|value| AxisTick {
            label: format!("{value:.2}"),
            pos: y_scale.map(value),
        })
        .collect();

    let mut reference_lines = Vec::new();
    let mut annotations = Vec::new();
    let mut legend = vec![LegendEntry {
        label: "Relevance Score".to_string(),
        color: theme.series_color.clone(),
        glyph: LegendGlyph::LineWithMarker,
    }];

    reference_lines.push(ReferenceLine {
        orientation: Orientation::Horizontal,
        pos: y_scale.map(result.median),
        color: theme.placeholder_color.clone(),
        style: LineStyle::Dashed,
        width: 0.8,
        opacity: 0.8,
    });
    legend.push(LegendEntry {
        label: format!("Median: {}", super::text::format_percent(result.median)),
        color: theme.placeholder_color.clone(),
        glyph: LegendGlyph::Line(LineStyle::Dashed),
    });

    if let Some(elbow) = result.elbow {
        let elbow_x = x_scale.map(elbow.rank as f64);
        let elbow_y = y_scale.map(elbow.score);
        reference_lines.push(ReferenceLine {
            orientation: Orientation::Vertical,
            pos: elbow_x,
            color: theme.series_color.clone(),
            style: LineStyle::Dotted,
            width: 1.0,
            opacity: 0.7,
        });
        legend.push(LegendEntry {
            label: format!("Cut-off point (elbow): rank {}", elbow.rank),
            color: theme.series_color.clone(),
            glyph: LegendGlyph::Line(LineStyle::Dotted),
        });
        let offset_ranks = (n as f64 * 0.08).max(1.0);
        annotations.push(Annotation {
            lines: vec!["Elbow".to_string(), format!("(rank = {})", elbow.rank)],
            x: x_scale.map(elbow.rank as f64 + offset_ranks),
            y: y_scale.map(elbow.score + 0.05),
            anchor: TextAnchor::Start,
            color: theme.series_color.clone(),
            italic: true,
            target: Some((elbow_x, elbow_y)),
        });

        reference_lines.push(ReferenceLine {
            orientation: Orientation::Horizontal,
            pos: elbow_y,
            color: theme.threshold_color.clone(),
            style: LineStyle::Dashed,
            width: 1.2,
            opacity: 0.75,
        });
        legend.push(LegendEntry {
            label: format!("Confidence Threshold (score = {:.2})", elbow.score),
            color: theme.threshold_color.clone(),
            glyph: LegendGlyph::Line(LineStyle::Dashed),
        });
        annotations.push(Annotation {
            lines: vec![format!("Confidence Threshold = {:.2}", elbow.score)],
            x: x_scale.map(n as f64 * 0.6),
            y: y_scale.map(elbow.score + 0.04),
            anchor: TextAnchor::Middle,
            color: theme.threshold_color.clone(),
            italic: true,
            target: None,
        });
    }

    for (cut, style, share) in [
        (result.top_10, LineStyle::DashDot, "10%"),
        (result.top_25, LineStyle::Dotted, "25%"),
    ] {
        reference_lines.push(ReferenceLine {
            orientation: Orientation::Horizontal,
            pos: y_scale.map(cut.score),
            color: REFERENCE_GRAY.to_string(),
            style,
            width: 0.7,
            opacity: 0.6,
        });
        legend.push(LegendEntry {
            label: format!("Top {share} (>= {:.2})", cut.score),
            color: REFERENCE_GRAY.to_string(),
            glyph: LegendGlyph::Line(style),
        });
    }

    let width = cfg.margin_left + cfg.plot_width + cfg.margin_right;
    let height = cfg.margin_top + cfg.plot_height + cfg.margin_bottom;
    Layout {
        kind: ChartKind::Scree,
        width,
        height,
        diagram: DiagramData::Scree(super::ScreeLayout {
            frame,
            title: cfg.title.clone(),
            x_label: cfg.x_label.clone(),
            y_label: cfg.y_label.clone(),
            series: Polyline {
                points,
                color: theme.series_color.clone(),
                style: LineStyle::Solid,
                width: 1.2,
            },
            area,
            marker_radius: cfg.marker_radius,
            x_ticks,
            y_ticks,
            reference_lines,
            annotations,
            legend,
            threshold: result,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scree(scores: &[f64]) -> Layout {
        compute_scree_layout(
            &ScreeRequest {
                scores: scores.to_vec(),
            },
            &Theme::academic(),
            &LayoutConfig::default(),
        )
    }

    #[test]
    fn empty_scores_render_placeholder() {
        let layout = scree(&[]);
        let DiagramData::Placeholder(placeholder) = &layout.diagram else {
            panic!("expected placeholder");
        };
        assert_eq!(placeholder.lines, vec!["No relevance data available"]);
    }

    #[test]
    fn two_scores_report_count() {
        let layout = scree(&[0.4, 0.3]);
        let DiagramData::Placeholder(placeholder) = &layout.diagram else {
            panic!("expected placeholder");
        };
        assert_eq!(placeholder.lines[0], "Insufficient data (2 points)");
    }

    #[test]
    fn plot_marks_elbow_and_quantiles() {
        let layout = scree(&[0.1, 0.9, 0.3, 0.85, 0.2, 0.8]);
        let DiagramData::Scree(plot) = &layout.diagram else {
            panic!("expected scree plot");
        };
        assert_eq!(plot.series.points.len(), 6);
        assert_eq!(plot.threshold.elbow.unwrap().rank, 3);
        let labels: Vec<&str> = plot.legend.iter().map(|l| l.label.as_str()).collect();
        assert!(labels.contains(&"Median: 55.0%"));
        assert!(labels.contains(&"Cut-off point (elbow): rank 3"));
        assert!(labels.contains(&"Confidence Threshold (score = 0.80)"));
        assert!(labels.contains(&"Top 10% (>= 0.90)"));
        // Descending scores plot downward, which is increasing pixel y.
        assert!(plot.series.points.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(
            plot.series
                .points
                .iter()
                .all(|(x, y)| *x >= plot.frame.x && *x <= plot.frame.right() && *y >= plot.frame.y && *y <= plot.frame.bottom())
        );
    }

    #[test]
    fn flat_scores_draw_without_elbow() {
        let layout = scree(&[0.5, 0.5, 0.5]);
        let DiagramData::Scree(plot) = &layout.diagram else {
            panic!("expected scree plot");
        };
        assert!(plot.threshold.elbow.is_none());
        assert!(
            !plot
                .reference_lines
                .iter()
                .any(|l| l.orientation == Orientation::Vertical)
        );
    }
}
