use crate::theme::Theme;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// `height = max(min, base + lines * per_line)`, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSizing {
    pub min: f32,
    pub base: f32,
    pub per_line: f32,
}

impl BoxSizing {
    pub const fn new(min: f32, base: f32, per_line: f32) -> Self {
        Self {
            min,
            base,
            per_line,
        }
    }

    pub fn height(&self, lines: usize) -> f32 {
        self.min.max(self.base + lines as f32 * self.per_line)
    }
}

/// Geometry of the PRISMA flow diagram on its 0..100 canvas (y grows upward).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrismaConfig {
    pub phase_x: f32,
    pub phase_width: f32,
    pub main_x: f32,
    pub main_width: f32,
    pub side_x: f32,
    pub side_width: f32,
    pub top: f32,
    pub view_top: f32,
    pub bottom_margin: f32,
    pub header_height: f32,
    pub header_gap: f32,
    pub stage_gap: f32,
    pub arrow_inset: f32,
    /// How far a phase label reaches above its stage.
    pub phase_overhang: f32,
    /// Identification grows with the number of listed databases.
    pub identification: BoxSizing,
    /// Exclusion boxes grow with their number of label lines.
    pub screening_exclusion: BoxSizing,
    pub eligibility_exclusion: BoxSizing,
    pub removed_height: f32,
    pub screening_height: f32,
    pub retrieval_height: f32,
    pub not_retrieved_height: f32,
    pub eligibility_height: f32,
    pub included_height: f32,
    /// Text pitch for fixed-height boxes.
    pub line_pitch: f32,
    /// Text size in canvas units.
    pub text_size: f32,
    pub left_text_inset: f32,
    pub px_per_unit: f32,
    pub title_band: f32,
    pub title: String,
    pub subtitle: String,
}

impl Default for PrismaConfig {
    fn default() -> Self {
        Self {
            phase_x: 2.0,
            phase_width: 7.0,
            main_x: 14.0,
            main_width: 34.0,
            side_x: 62.0,
            side_width: 32.0,
            top: 94.0,
            view_top: 98.0,
            bottom_margin: 3.0,
            header_height: 3.0,
            header_gap: 1.0,
            stage_gap: 6.0,
            arrow_inset: 1.0,
            phase_overhang: 3.0,
            identification: BoxSizing::new(10.0, 5.0, 1.2),
            screening_exclusion: BoxSizing::new(6.0, 3.0, 1.3),
            eligibility_exclusion: BoxSizing::new(7.0, 3.0, 1.3),
            removed_height: 8.0,
            screening_height: 8.0,
            retrieval_height: 7.0,
            not_retrieved_height: 5.0,
            eligibility_height: 7.0,
            included_height: 8.0,
            line_pitch: 1.3,
            text_size: 1.0,
            left_text_inset: 2.0,
            px_per_unit: 10.0,
            title_band: 60.0,
            title: "PRISMA 2020 Flow Diagram".to_string(),
            subtitle: "Study selection process according to Page et al. (2021)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScreeConfig {
    pub min_points: usize,
    pub plot_width: f32,
    pub plot_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub y_ticks: usize,
    pub marker_radius: f32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl Default for ScreeConfig {
    fn default() -> Self {
        Self {
            min_points: crate::threshold::DEFAULT_MIN_POINTS,
            plot_width: 640.0,
            plot_height: 360.0,
            margin_left: 80.0,
            margin_right: 40.0,
            margin_top: 60.0,
            margin_bottom: 60.0,
            y_ticks: 5,
            marker_radius: 3.0,
            title: "Priority Screening Score Distribution (Scree Plot)".to_string(),
            x_label: "Reference Rank".to_string(),
            y_label: "Relevance Score".to_string(),
        }
    }
}

/// Shared geometry for bar charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BarChartConfig {
    pub plot_width: f32,
    pub plot_height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub bar_fraction: f32,
    pub y_ticks: usize,
    pub trend_samples: usize,
    /// Minimum share of "yes" answers, in percent, before its label is drawn.
    pub min_percent_label: f32,
    pub keyword_limit: usize,
    pub keyword_row_height: f32,
    pub keyword_x_headroom: f32,
}

impl Default for BarChartConfig {
    fn default() -> Self {
        Self {
            plot_width: 720.0,
            plot_height: 360.0,
            margin_left: 80.0,
            margin_right: 40.0,
            margin_top: 60.0,
            margin_bottom: 80.0,
            bar_fraction: 0.6,
            y_ticks: 5,
            trend_samples: 100,
            min_percent_label: 10.0,
            keyword_limit: 15,
            keyword_row_height: 30.0,
            keyword_x_headroom: 1.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    pub width: f32,
    pub margin: f32,
    pub title_height: f32,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub font_size: f32,
    pub search_wrap_chars: usize,
    pub search_column_fractions: [f32; 3],
    pub synthesis_wrap_chars: usize,
    pub search_title: String,
    pub synthesis_title: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            margin: 30.0,
            title_height: 50.0,
            cell_padding_x: 8.0,
            cell_padding_y: 6.0,
            font_size: 12.0,
            search_wrap_chars: 55,
            search_column_fractions: [0.15, 0.10, 0.75],
            synthesis_wrap_chars: 24,
            search_title: "Table 1. Data Sources and Search Strategy Results".to_string(),
            synthesis_title: "Technical Synthesis: Performance Metrics Comparison".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub label_line_height: f32,
    /// Skip font lookups and estimate text width from character classes.
    pub fast_text_metrics: bool,
    pub prisma: PrismaConfig,
    pub scree: ScreeConfig,
    pub bars: BarChartConfig,
    pub table: TableConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_line_height: 1.4,
            fast_text_metrics: false,
            prisma: PrismaConfig::default(),
            scree: ScreeConfig::default(),
            bars: BarChartConfig::default(),
            table: TableConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG as the primary artifact with an SVG vector copy alongside.
    #[default]
    Png,
    /// SVG only.
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Raster scale factor applied when rasterizing to PNG.
    pub scale: f32,
    pub format: OutputFormat,
    /// Also write an SVG next to each PNG.
    pub vector_copy: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            format: OutputFormat::Png,
            vector_copy: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    title_font_size: Option<f32>,
    text_color: Option<String>,
    line_color: Option<String>,
    background: Option<String>,
    header_fill: Option<String>,
    phase_fill: Option<String>,
    main_box_fill: Option<String>,
    side_box_fill: Option<String>,
    box_border: Option<String>,
    threshold_color: Option<String>,
    bar_fill: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    fast_text_metrics: Option<bool>,
    prisma: Option<Value>,
    scree: Option<Value>,
    bars: Option<Value>,
    table: Option<Value>,
    render: Option<Value>,
}

/// Merge `overrides` into `base` key by key, recursing into nested objects,
/// so a section only needs the fields it changes.
fn overlay<T: Serialize + DeserializeOwned>(base: &mut T, overrides: Value) -> anyhow::Result<()> {
    let mut merged = serde_json::to_value(&*base)?;
    merge_values(&mut merged, overrides);
    *base = serde_json::from_value(merged)?;
    Ok(())
}

fn merge_values(target: &mut Value, overrides: Value) {
    match (target, overrides) {
        (Value::Object(target), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match target.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, value) => *target = value,
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse a JSON5 configuration document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.title_font_size {
            config.theme.title_font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.header_fill {
            config.theme.header_fill = v;
        }
        if let Some(v) = vars.phase_fill {
            config.theme.phase_fill = v;
        }
        if let Some(v) = vars.main_box_fill {
            config.theme.main_box_fill = v;
        }
        if let Some(v) = vars.side_box_fill {
            config.theme.side_box_fill = v;
        }
        if let Some(v) = vars.box_border {
            config.theme.box_border = v;
        }
        if let Some(v) = vars.threshold_color {
            config.theme.threshold_color = v;
        }
        if let Some(v) = vars.bar_fill {
            config.theme.bar_fill = v;
        }
    }

    if let Some(v) = parsed.fast_text_metrics {
        config.layout.fast_text_metrics = v;
    }
    if let Some(v) = parsed.prisma {
        overlay(&mut config.layout.prisma, v)?;
    }
    if let Some(v) = parsed.scree {
        overlay(&mut config.layout.scree, v)?;
    }
    if let Some(v) = parsed.bars {
        overlay(&mut config.layout.bars, v)?;
    }
    if let Some(v) = parsed.table {
        overlay(&mut config.layout.table, v)?;
    }
    if let Some(v) = parsed.render {
        overlay(&mut config.render, v)?;
    }
    Ok(config)
}
