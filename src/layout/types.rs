use serde::Serialize;

use crate::request::ChartKind;
use crate::threshold::ThresholdResult;

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub kind: ChartKind,
    /// Output size in pixels.
    pub width: f32,
    pub height: f32,
    pub diagram: DiagramData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagramData {
    Flow(FlowLayout),
    Scree(ScreeLayout),
    Bars(BarChartLayout),
    Table(TableLayout),
    Placeholder(PlaceholderLayout),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Identification,
    Screening,
    Retrieval,
    Eligibility,
    Included,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Identification,
        Stage::Screening,
        Stage::Retrieval,
        Stage::Eligibility,
        Stage::Included,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxRole {
    /// Centre column, part of the vertical flow.
    Main,
    /// Right column, records leaving the flow at this stage.
    Side,
}

/// A text box on the flow canvas. `y` is the bottom edge; the canvas y axis
/// grows upward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGeometry {
    pub stage: Stage,
    pub role: BoxRole,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<String>,
    pub align: Align,
    /// Vertical distance between text baselines.
    pub line_pitch: f32,
}

impl BoxGeometry {
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Open-interval overlap on the vertical axis; touching edges do not count.
    pub fn overlaps_vertically(&self, other: &BoxGeometry) -> bool {
        self.y < other.top() && other.y < self.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowSpec {
    pub from: Stage,
    pub to: Stage,
    pub start: (f32, f32),
    pub end: (f32, f32),
}

/// Plain line joining a main box to its side box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectorSpec {
    pub stage: Stage,
    pub start: (f32, f32),
    pub end: (f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandLabel {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "primitive", rename_all = "snake_case")]
pub enum FlowPrimitive {
    Header(BandLabel),
    Phase(BandLabel),
    Box(BoxGeometry),
    Connector(ConnectorSpec),
    Arrow(ArrowSpec),
}

/// PRISMA flow geometry in draw order.
#[derive(Debug, Clone, Serialize)]
pub struct FlowLayout {
    pub primitives: Vec<FlowPrimitive>,
    /// Visible canvas range on the y axis.
    pub y_min: f32,
    pub y_max: f32,
    pub canvas_width: f32,
    pub px_per_unit: f32,
    pub title_band: f32,
    pub text_size: f32,
    pub left_text_inset: f32,
    pub title: String,
    pub subtitle: String,
    /// Eligibility exclusions shown in the diagram, explicit or derived.
    pub eligibility_excluded: i64,
}

impl FlowLayout {
    pub fn boxes(&self) -> impl Iterator<Item = &BoxGeometry> {
        self.primitives.iter().filter_map(|p| match p {
            FlowPrimitive::Box(b) => Some(b),
            _ => None,
        })
    }

    pub fn main_boxes(&self) -> impl Iterator<Item = &BoxGeometry> {
        self.boxes().filter(|b| b.role == BoxRole::Main)
    }

    pub fn side_boxes(&self) -> impl Iterator<Item = &BoxGeometry> {
        self.boxes().filter(|b| b.role == BoxRole::Side)
    }

    pub fn main_box(&self, stage: Stage) -> Option<&BoxGeometry> {
        self.main_boxes().find(|b| b.stage == stage)
    }

    pub fn side_box(&self, stage: Stage) -> Option<&BoxGeometry> {
        self.side_boxes().find(|b| b.stage == stage)
    }

    pub fn arrows(&self) -> impl Iterator<Item = &ArrowSpec> {
        self.primitives.iter().filter_map(|p| match p {
            FlowPrimitive::Arrow(a) => Some(a),
            _ => None,
        })
    }

    pub fn connectors(&self) -> impl Iterator<Item = &ConnectorSpec> {
        self.primitives.iter().filter_map(|p| match p {
            FlowPrimitive::Connector(c) => Some(c),
            _ => None,
        })
    }

    pub fn phase_labels(&self) -> impl Iterator<Item = &BandLabel> {
        self.primitives.iter().filter_map(|p| match p {
            FlowPrimitive::Phase(label) => Some(label),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// Plot area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotFrame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlotFrame {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub label: String,
    /// Pixel position along the axis.
    pub pos: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub orientation: Orientation,
    pub pos: f32,
    pub color: String,
    pub style: LineStyle,
    pub width: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub lines: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub anchor: TextAnchor,
    pub color: String,
    pub italic: bool,
    /// Arrow from the text towards this point.
    pub target: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendGlyph {
    Line(LineStyle),
    LineWithMarker,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub glyph: LegendGlyph,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    pub points: Vec<(f32, f32)>,
    pub color: String,
    pub style: LineStyle,
    pub width: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeLayout {
    pub frame: PlotFrame,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Polyline,
    /// Closed polygon under the series.
    pub area: Vec<(f32, f32)>,
    pub marker_radius: f32,
    pub x_ticks: Vec<AxisTick>,
    pub y_ticks: Vec<AxisTick>,
    pub reference_lines: Vec<ReferenceLine>,
    pub annotations: Vec<Annotation>,
    pub legend: Vec<LegendEntry>,
    pub threshold: ThresholdResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub anchor: TextAnchor,
    pub color: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub label: Option<BarLabel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarChartLayout {
    pub frame: PlotFrame,
    pub title: String,
    pub x_label: String,
    pub y_label: Option<String>,
    pub bars: Vec<BarRect>,
    pub x_ticks: Vec<AxisTick>,
    pub y_ticks: Vec<AxisTick>,
    /// Degrees; non-zero rotates x tick labels around their anchor.
    pub x_tick_rotation: f32,
    /// Grid lines are drawn across this axis' ticks.
    pub grid: Orientation,
    pub trend: Option<Polyline>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    pub row: usize,
    pub column: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub lines: Vec<String>,
    pub align: Align,
    pub fill: String,
    pub text_color: String,
    pub bold: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableLayout {
    pub title: String,
    pub title_y: f32,
    pub cells: Vec<TableCell>,
    pub font_size: f32,
    pub line_height: f32,
    pub border_color: String,
}

impl TableLayout {
    pub fn rows(&self) -> usize {
        self.cells.iter().map(|c| c.row + 1).max().unwrap_or(0)
    }

    pub fn columns(&self) -> usize {
        self.cells.iter().map(|c| c.column + 1).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.column == column)
    }
}

/// Stand-in chart for sections without enough data to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderLayout {
    pub lines: Vec<String>,
    pub color: String,
    pub font_size: f32,
}
