use serde_json::{Map, Value};

use crate::config::{LayoutConfig, TableConfig};
use crate::error::{ChartError, Result};
use crate::request::{ChartKind, SearchSource, SynthesisRequest};
use crate::theme::Theme;

use super::text::{column_label, normalize_whitespace, wrap_chars};
use super::{Align, DiagramData, Layout, TableCell, TableLayout, empty_section_layout};

const MISSING: &str = "N/A";
const REQUIRED_COLUMNS: [&str; 2] = ["study", "tool"];

struct TableStyle<'a> {
    align: Align,
    header_fill: &'a str,
    header_text: &'a str,
    body_fill: &'a str,
    stripe_fill: &'a str,
    body_text: &'a str,
    border: &'a str,
}

/// Grid of wrapped cells. Row 0 is the header; body rows alternate between
/// the background and the stripe fill.
fn build_table(
    kind: ChartKind,
    title: &str,
    header: Vec<String>,
    body: Vec<Vec<Vec<String>>>,
    widths: &[f32],
    style: TableStyle<'_>,
    config: &LayoutConfig,
) -> Layout {
    let cfg = &config.table;
    let line_height = cfg.font_size * config.label_line_height;
    let mut cells = Vec::new();
    let mut y = cfg.margin + cfg.title_height;

    let header_row: Vec<Vec<String>> = header.into_iter().map(|label| vec![label]).collect();
    for (row, values) in std::iter::once(header_row).chain(body).enumerate() {
        let lines_in_row = values.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = lines_in_row as f32 * line_height + cfg.cell_padding_y * 2.0;
        let (fill, text_color) = if row == 0 {
            (style.header_fill, style.header_text)
        } else if row % 2 == 1 {
            (style.body_fill, style.body_text)
        } else {
            (style.stripe_fill, style.body_text)
        };
        let mut x = cfg.margin;
        for (column, (lines, width)) in values.into_iter().zip(widths).enumerate() {
            cells.push(TableCell {
                row,
                column,
                x,
                y,
                width: *width,
                height,
                lines,
                align: style.align,
                fill: fill.to_string(),
                text_color: text_color.to_string(),
                bold: row == 0,
            });
            x += width;
        }
        y += height;
    }

    Layout {
        kind,
        width: cfg.width,
        height: y + cfg.margin,
        diagram: DiagramData::Table(TableLayout {
            title: title.to_string(),
            title_y: cfg.margin + cfg.title_height / 2.0,
            cells,
            font_size: cfg.font_size,
            line_height,
            border_color: style.border.to_string(),
        }),
    }
}

fn inner_width(cfg: &TableConfig) -> f32 {
    (cfg.width - cfg.margin * 2.0).max(1.0)
}

/// Search sources with their hit counts and wrapped query strings.
pub(super) fn compute_search_table(
    sources: &[SearchSource],
    theme: &Theme,
    config: &LayoutConfig,
) -> Layout {
    if sources.is_empty() {
        return empty_section_layout(ChartKind::SearchStrategy, theme);
    }
    let cfg = &config.table;
    let body = sources
        .iter()
        .map(|source| {
            let query = source
                .search_string
                .as_deref()
                .map(normalize_whitespace)
                .filter(|query| !query.is_empty())
                .unwrap_or_else(|| MISSING.to_string());
            vec![
                vec![source.name.clone()],
                vec![source.hits.to_string()],
                wrap_chars(&query, cfg.search_wrap_chars),
            ]
        })
        .collect();
    let total = inner_width(cfg);
    let widths: Vec<f32> = cfg
        .search_column_fractions
        .iter()
        .map(|fraction| fraction * total)
        .collect();
    build_table(
        ChartKind::SearchStrategy,
        &cfg.search_title,
        vec![
            "Source".to_string(),
            "Results".to_string(),
            "Search String".to_string(),
        ],
        body,
        &widths,
        TableStyle {
            align: Align::Left,
            header_fill: &theme.search_header_fill,
            header_text: &theme.text_color,
            body_fill: &theme.background,
            stripe_fill: &theme.search_stripe_fill,
            body_text: &theme.text_color,
            border: &theme.table_border,
        },
        config,
    )
}

/// Column keys in display order: `study`, `tool`, then every other key in
/// first-seen order, skipping columns with no usable value.
fn synthesis_columns(studies: &[Map<String, Value>]) -> Result<Vec<String>> {
    for required in REQUIRED_COLUMNS {
        if !studies.iter().any(|row| row.contains_key(required)) {
            return Err(ChartError::malformed(
                "technical_synthesis",
                format!("required column `{required}` is missing"),
            ));
        }
    }
    let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for row in studies {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns.retain(|column| {
        if REQUIRED_COLUMNS.contains(&column.as_str()) {
            return true;
        }
        let any_value = studies
            .iter()
            .any(|row| row.get(column).is_some_and(|v| !v.is_null()));
        let all_blank = studies
            .iter()
            .all(|row| matches!(row.get(column), Some(Value::String(s)) if s.is_empty()));
        let keep = any_value && !all_blank;
        if !keep {
            tracing::debug!(column = column.as_str(), "dropping empty synthesis column");
        }
        keep
    });
    Ok(columns)
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Per-study metrics with a column for every key present in the data.
pub(super) fn compute_synthesis_table(
    request: &SynthesisRequest,
    theme: &Theme,
    config: &LayoutConfig,
) -> Result<Layout> {
    if request.studies.is_empty() {
        return Ok(empty_section_layout(ChartKind::TechnicalSynthesis, theme));
    }
    let cfg = &config.table;
    let columns = synthesis_columns(&request.studies)?;
    let header: Vec<String> = columns.iter().map(|c| column_label(c)).collect();
    let body: Vec<Vec<Vec<String>>> = request
        .studies
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| wrap_chars(&cell_text(row.get(column)), cfg.synthesis_wrap_chars))
                .collect()
        })
        .collect();

    // Columns share the width in proportion to their longest line.
    let demand: Vec<f32> = (0..columns.len())
        .map(|column| {
            let longest_body = body
                .iter()
                .flat_map(|row| row[column].iter())
                .map(|line| line.chars().count())
                .max()
                .unwrap_or(0);
            longest_body.max(header[column].chars().count()).max(3) as f32
        })
        .collect();
    let total_demand: f32 = demand.iter().sum();
    let total = inner_width(cfg);
    let widths: Vec<f32> = demand.iter().map(|d| d / total_demand * total).collect();

    Ok(build_table(
        ChartKind::TechnicalSynthesis,
        &cfg.synthesis_title,
        header,
        body,
        &widths,
        TableStyle {
            align: Align::Center,
            header_fill: &theme.table_header_fill,
            header_text: &theme.table_header_text,
            body_fill: &theme.background,
            stripe_fill: &theme.table_stripe_fill,
            body_text: &theme.text_color,
            border: &theme.table_border,
        },
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table_of(layout: &Layout) -> &TableLayout {
        match &layout.diagram {
            DiagramData::Table(table) => table,
            other => panic!("expected table, got {other:?}"),
        }
    }

    fn synthesis(studies: Value) -> Result<Layout> {
        let request: SynthesisRequest =
            serde_json::from_value(json!({ "studies": studies })).unwrap();
        compute_synthesis_table(&request, &Theme::academic(), &LayoutConfig::default())
    }

    #[test]
    fn search_table_wraps_and_fills_missing_queries() {
        let sources = vec![
            SearchSource {
                name: "Scopus".into(),
                hits: 120,
                search_string: Some(
                    "TITLE-ABS-KEY ( \"large language model\" OR llm ) AND ( \"requirements engineering\" )"
                        .into(),
                ),
            },
            SearchSource {
                name: "IEEE Xplore".into(),
                hits: 40,
                search_string: Some("   ".into()),
            },
        ];
        let layout = compute_search_table(&sources, &Theme::academic(), &LayoutConfig::default());
        let table = table_of(&layout);
        assert_eq!((table.rows(), table.columns()), (3, 3));
        assert_eq!(table.cell(0, 2).unwrap().lines, vec!["Search String"]);
        let query = table.cell(1, 2).unwrap();
        assert!(query.lines.len() > 1);
        assert!(query.lines.iter().all(|l| l.chars().count() <= 55));
        assert_eq!(table.cell(2, 2).unwrap().lines, vec!["N/A"]);
        assert_eq!(table.cell(1, 1).unwrap().lines, vec!["120"]);
        assert_eq!(table.cell(0, 0).unwrap().fill, "#e8e8e8");
        assert_eq!(table.cell(2, 0).unwrap().fill, "#f5f5f5");
        // Rows stack without gaps.
        let first = table.cell(1, 0).unwrap();
        assert_eq!(table.cell(2, 0).unwrap().y, first.y + first.height);
    }

    #[test]
    fn synthesis_columns_follow_first_seen_order() {
        let layout = synthesis(json!([
            {"tool": "GPT-4", "study": "S1", "precision": 0.91, "notes": ""},
            {"study": "S2", "tool": "BERT", "recall": 0.8, "notes": ""},
        ]))
        .unwrap();
        let table = table_of(&layout);
        let header: Vec<&str> = (0..table.columns())
            .map(|c| table.cell(0, c).unwrap().lines[0].as_str())
            .collect();
        assert_eq!(header, vec!["Study", "Tool", "Precision", "Recall"]);
        assert_eq!(table.cell(2, 2).unwrap().lines, vec!["N/A"]);
        assert_eq!(table.cell(1, 2).unwrap().lines, vec!["0.91"]);
        assert_eq!(table.cell(0, 0).unwrap().text_color, "#FFFFFF");
        let width: f32 = (0..table.columns())
            .map(|c| table.cell(0, c).unwrap().width)
            .sum();
        assert!((width - 940.0).abs() < 1e-2);
    }

    #[test]
    fn all_null_columns_are_dropped() {
        let layout = synthesis(json!([
            {"study": "S1", "tool": "T", "f1_score": null},
            {"study": "S2", "tool": "T"},
        ]))
        .unwrap();
        assert_eq!(table_of(&layout).columns(), 2);
    }

    #[test]
    fn missing_tool_column_fails() {
        let err = synthesis(json!([{"study": "S1", "accuracy": 0.9}])).unwrap_err();
        assert!(err.to_string().contains("required column `tool` is missing"));
    }

    #[test]
    fn empty_studies_render_placeholder() {
        let layout = synthesis(json!([])).unwrap();
        assert!(matches!(layout.diagram, DiagramData::Placeholder(_)));
    }
}
