use crate::config::{LayoutConfig, RenderConfig};
use crate::layout::{
    Align, Annotation, AxisTick, BandLabel, BarChartLayout, BoxGeometry, BoxRole, DiagramData,
    FlowLayout, FlowPrimitive, Layout, LegendEntry, LegendGlyph, LineStyle, Orientation,
    PlaceholderLayout, PlotFrame, Polyline, ScreeLayout, TableLayout, TextAnchor,
};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const BAR_STROKE: &str = "#333333";

pub fn render_svg(layout: &Layout, theme: &Theme, config: &LayoutConfig) -> String {
    let mut svg = String::new();
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));
    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    match &layout.diagram {
        DiagramData::Flow(flow) => render_flow(&mut svg, flow, width, theme),
        DiagramData::Scree(scree) => render_scree(&mut svg, scree, theme),
        DiagramData::Bars(chart) => render_bars(&mut svg, chart, theme),
        DiagramData::Table(table) => render_table(&mut svg, table, width, theme, config),
        DiagramData::Placeholder(placeholder) => {
            render_placeholder(&mut svg, placeholder, width, height, theme)
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Flow canvas units to pixels. The canvas y axis grows upward.
struct FlowProjection {
    scale: f32,
    y_max: f32,
    offset: f32,
}

impl FlowProjection {
    fn new(flow: &FlowLayout) -> Self {
        Self {
            scale: flow.px_per_unit,
            y_max: flow.y_max,
            offset: flow.title_band,
        }
    }

    fn x(&self, x: f32) -> f32 {
        x * self.scale
    }

    fn y(&self, y: f32) -> f32 {
        self.offset + (self.y_max - y) * self.scale
    }

    fn len(&self, value: f32) -> f32 {
        value * self.scale
    }

    /// Pixel rectangle for a box whose `y` is its bottom edge.
    fn rect(&self, x: f32, y: f32, width: f32, height: f32) -> (f32, f32, f32, f32) {
        (self.x(x), self.y(y + height), self.len(width), self.len(height))
    }
}

fn render_flow(svg: &mut String, flow: &FlowLayout, width: f32, theme: &Theme) {
    let proj = FlowProjection::new(flow);
    let font_size = flow.text_size * flow.px_per_unit;

    svg.push_str(&text_svg(
        width / 2.0,
        flow.title_band * 0.45,
        TextAnchor::Middle,
        theme.title_font_size,
        &theme.text_color,
        TextStyle::Bold,
        &flow.title,
        theme,
    ));
    if !flow.subtitle.is_empty() {
        svg.push_str(&text_svg(
            width / 2.0,
            flow.title_band * 0.8,
            TextAnchor::Middle,
            theme.font_size,
            &theme.muted_text_color,
            TextStyle::Italic,
            &flow.subtitle,
            theme,
        ));
    }

    for primitive in &flow.primitives {
        match primitive {
            FlowPrimitive::Header(label) => {
                band_svg(svg, &proj, label, &theme.header_fill, theme);
                let (x, y, w, h) = proj.rect(label.x, label.y, label.width, label.height);
                svg.push_str(&text_svg(
                    x + w / 2.0,
                    y + h / 2.0 + font_size * 0.35,
                    TextAnchor::Middle,
                    font_size,
                    &theme.text_color,
                    TextStyle::Bold,
                    &label.text,
                    theme,
                ));
            }
            FlowPrimitive::Phase(label) => {
                band_svg(svg, &proj, label, &theme.phase_fill, theme);
                let (x, y, w, h) = proj.rect(label.x, label.y, label.width, label.height);
                let cx = x + w / 2.0;
                let cy = y + h / 2.0;
                svg.push_str(&format!(
                    "<g transform=\"rotate(-90 {cx:.2} {cy:.2})\">{}</g>",
                    text_svg(
                        cx,
                        cy + font_size * 0.35,
                        TextAnchor::Middle,
                        font_size * 1.1,
                        &theme.phase_text_color,
                        TextStyle::Bold,
                        &label.text,
                        theme,
                    )
                ));
            }
            FlowPrimitive::Box(geometry) => flow_box_svg(svg, &proj, geometry, flow, font_size, theme),
            FlowPrimitive::Connector(connector) => {
                svg.push_str(&connector_svg(&proj, connector.start, connector.end, theme));
            }
            FlowPrimitive::Arrow(arrow) => {
                svg.push_str(&arrow_svg(&proj, arrow.start, arrow.end, theme));
            }
        }
    }
}

fn band_svg(svg: &mut String, proj: &FlowProjection, label: &BandLabel, fill: &str, theme: &Theme) {
    let (x, y, w, h) = proj.rect(label.x, label.y, label.width, label.height);
    svg.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"3\" ry=\"3\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        theme.box_border
    ));
}

fn flow_box_svg(
    svg: &mut String,
    proj: &FlowProjection,
    geometry: &BoxGeometry,
    flow: &FlowLayout,
    font_size: f32,
    theme: &Theme,
) {
    let fill = match geometry.role {
        BoxRole::Main => &theme.main_box_fill,
        BoxRole::Side => &theme.side_box_fill,
    };
    let (x, y, w, h) = proj.rect(geometry.x, geometry.y, geometry.width, geometry.height);
    svg.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"1.2\"/>",
        theme.box_border
    ));

    let pitch = proj.len(geometry.line_pitch);
    let block = pitch * (geometry.lines.len().saturating_sub(1)) as f32;
    let first_baseline = y + h / 2.0 - block / 2.0 + font_size * 0.35;
    let (text_x, anchor) = match geometry.align {
        Align::Center => (x + w / 2.0, TextAnchor::Middle),
        Align::Left => (x + proj.len(flow.left_text_inset), TextAnchor::Start),
    };
    for (idx, line) in geometry.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        svg.push_str(&text_svg(
            text_x,
            first_baseline + pitch * idx as f32,
            anchor,
            font_size,
            &theme.text_color,
            TextStyle::Normal,
            line,
            theme,
        ));
    }
}

fn arrow_svg(proj: &FlowProjection, start: (f32, f32), end: (f32, f32), theme: &Theme) -> String {
    format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1.6\" marker-end=\"url(#arrow)\"/>",
        proj.x(start.0),
        proj.y(start.1),
        proj.x(end.0),
        proj.y(end.1),
        theme.line_color
    )
}

/// Plain side-box connector; only the vertical flow carries arrowheads.
fn connector_svg(proj: &FlowProjection, start: (f32, f32), end: (f32, f32), theme: &Theme) -> String {
    format!(
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"1.6\"/>",
        proj.x(start.0),
        proj.y(start.1),
        proj.x(end.0),
        proj.y(end.1),
        theme.line_color
    )
}

fn render_scree(svg: &mut String, scree: &ScreeLayout, theme: &Theme) {
    let frame = &scree.frame;
    plot_title(svg, frame, &scree.title, theme);
    grid_lines(svg, frame, &scree.y_ticks, Orientation::Horizontal, theme);

    svg.push_str(&format!(
        "<path d=\"{} Z\" fill=\"{}\" fill-opacity=\"0.3\" stroke=\"none\"/>",
        points_to_path(&scree.area),
        theme.area_fill
    ));
    for line in &scree.reference_lines {
        let (x1, y1, x2, y2) = match line.orientation {
            Orientation::Horizontal => (frame.x, line.pos, frame.right(), line.pos),
            Orientation::Vertical => (line.pos, frame.y, line.pos, frame.bottom()),
        };
        svg.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-opacity=\"{:.2}\"{}/>",
            line.color,
            line.width,
            line.opacity,
            dash_attr(line.style)
        ));
    }
    polyline_svg(svg, &scree.series);
    for (x, y) in &scree.series.points {
        svg.push_str(&format!(
            "<circle cx=\"{x:.2}\" cy=\"{y:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            scree.marker_radius, scree.series.color, theme.background
        ));
    }
    for annotation in &scree.annotations {
        annotation_svg(svg, annotation, theme);
    }

    axes_svg(svg, frame, &scree.x_ticks, &scree.y_ticks, 0.0, theme);
    axis_labels(svg, frame, &scree.x_label, Some(&scree.y_label), 0.0, theme);
    legend_svg(svg, frame, &scree.legend, theme);
}

fn render_bars(svg: &mut String, chart: &BarChartLayout, theme: &Theme) {
    let frame = &chart.frame;
    plot_title(svg, frame, &chart.title, theme);
    let grid_ticks = match chart.grid {
        Orientation::Horizontal => &chart.y_ticks,
        Orientation::Vertical => &chart.x_ticks,
    };
    grid_lines(svg, frame, grid_ticks, chart.grid, theme);

    for bar in &chart.bars {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"0.9\" stroke=\"{BAR_STROKE}\" stroke-width=\"0.6\"/>",
            bar.x,
            bar.y,
            bar.width.max(0.0),
            bar.height.max(0.0),
            bar.color
        ));
    }
    for label in chart.bars.iter().filter_map(|bar| bar.label.as_ref()) {
        svg.push_str(&text_svg(
            label.x,
            label.y + if label.anchor == TextAnchor::Start { theme.font_size * 0.35 } else { 0.0 },
            label.anchor,
            theme.font_size * 0.85,
            &label.color,
            if label.bold { TextStyle::Bold } else { TextStyle::Normal },
            &label.text,
            theme,
        ));
    }
    if let Some(trend) = &chart.trend {
        polyline_svg(svg, trend);
    }

    axes_svg(svg, frame, &chart.x_ticks, &chart.y_ticks, chart.x_tick_rotation, theme);
    axis_labels(
        svg,
        frame,
        &chart.x_label,
        chart.y_label.as_deref(),
        chart.x_tick_rotation,
        theme,
    );
    legend_svg(svg, frame, &chart.legend, theme);
}

fn plot_title(svg: &mut String, frame: &PlotFrame, title: &str, theme: &Theme) {
    svg.push_str(&text_svg(
        frame.x + frame.width / 2.0,
        frame.y - theme.title_font_size * 1.2,
        TextAnchor::Middle,
        theme.title_font_size,
        &theme.text_color,
        TextStyle::Bold,
        title,
        theme,
    ));
}

fn grid_lines(
    svg: &mut String,
    frame: &PlotFrame,
    ticks: &[AxisTick],
    orientation: Orientation,
    theme: &Theme,
) {
    for tick in ticks {
        let (x1, y1, x2, y2) = match orientation {
            Orientation::Horizontal => (frame.x, tick.pos, frame.right(), tick.pos),
            Orientation::Vertical => (tick.pos, frame.y, tick.pos, frame.bottom()),
        };
        svg.push_str(&format!(
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"0.5\" stroke-opacity=\"0.5\"/>",
            theme.grid_color
        ));
    }
}

fn axes_svg(
    svg: &mut String,
    frame: &PlotFrame,
    x_ticks: &[AxisTick],
    y_ticks: &[AxisTick],
    x_rotation: f32,
    theme: &Theme,
) {
    svg.push_str(&format!(
        "<path d=\"M {:.2} {:.2} L {:.2} {:.2} L {:.2} {:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"0.8\"/>",
        frame.x,
        frame.y,
        frame.x,
        frame.bottom(),
        frame.right(),
        frame.bottom(),
        theme.line_color
    ));
    let tick_size = theme.font_size * 0.85;
    for tick in x_ticks {
        let y = frame.bottom() + tick_size + 6.0;
        if x_rotation.abs() > f32::EPSILON {
            svg.push_str(&format!(
                "<g transform=\"rotate(-{x_rotation:.1} {:.2} {y:.2})\">{}</g>",
                tick.pos,
                text_svg(
                    tick.pos,
                    y,
                    TextAnchor::End,
                    tick_size,
                    &theme.text_color,
                    TextStyle::Normal,
                    &tick.label,
                    theme,
                )
            ));
        } else {
            svg.push_str(&text_svg(
                tick.pos,
                y,
                TextAnchor::Middle,
                tick_size,
                &theme.text_color,
                TextStyle::Normal,
                &tick.label,
                theme,
            ));
        }
    }
    for tick in y_ticks {
        svg.push_str(&text_svg(
            frame.x - 8.0,
            tick.pos + tick_size * 0.35,
            TextAnchor::End,
            tick_size,
            &theme.text_color,
            TextStyle::Normal,
            &tick.label,
            theme,
        ));
    }
}

fn axis_labels(
    svg: &mut String,
    frame: &PlotFrame,
    x_label: &str,
    y_label: Option<&str>,
    x_rotation: f32,
    theme: &Theme,
) {
    let x_offset = if x_rotation.abs() > f32::EPSILON { 58.0 } else { 42.0 };
    svg.push_str(&text_svg(
        frame.x + frame.width / 2.0,
        frame.bottom() + x_offset,
        TextAnchor::Middle,
        theme.font_size,
        &theme.text_color,
        TextStyle::Normal,
        x_label,
        theme,
    ));
    if let Some(label) = y_label {
        let x = frame.x - 55.0;
        let y = frame.y + frame.height / 2.0;
        svg.push_str(&format!(
            "<g transform=\"rotate(-90 {x:.2} {y:.2})\">{}</g>",
            text_svg(
                x,
                y,
                TextAnchor::Middle,
                theme.font_size,
                &theme.text_color,
                TextStyle::Normal,
                label,
                theme,
            )
        ));
    }
}

fn legend_svg(svg: &mut String, frame: &PlotFrame, entries: &[LegendEntry], theme: &Theme) {
    if entries.is_empty() {
        return;
    }
    let size = theme.font_size * 0.8;
    let row = size * 1.5;
    let longest = entries
        .iter()
        .map(|entry| crate::layout::text::estimate_text_width(&entry.label, size))
        .fold(0.0_f32, f32::max);
    let width = longest + 46.0;
    let height = row * entries.len() as f32 + 8.0;
    let x = frame.right() - width - 8.0;
    let y = frame.y + 8.0;
    svg.push_str(&format!(
        "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\" fill-opacity=\"0.9\" stroke=\"{}\" stroke-width=\"0.6\"/>",
        theme.background, theme.grid_color
    ));
    for (idx, entry) in entries.iter().enumerate() {
        let cy = y + 4.0 + row * (idx as f32 + 0.5);
        let gx = x + 8.0;
        let line_style = match entry.glyph {
            LegendGlyph::Line(style) => Some(style),
            LegendGlyph::LineWithMarker => Some(LineStyle::Solid),
            LegendGlyph::Patch => None,
        };
        if let Some(style) = line_style {
            svg.push_str(&format!(
                "<line x1=\"{gx:.2}\" y1=\"{cy:.2}\" x2=\"{:.2}\" y2=\"{cy:.2}\" stroke=\"{}\" stroke-width=\"1.4\"{}/>",
                gx + 24.0,
                entry.color,
                dash_attr(style)
            ));
            if matches!(entry.glyph, LegendGlyph::LineWithMarker) {
                svg.push_str(&format!(
                    "<circle cx=\"{:.2}\" cy=\"{cy:.2}\" r=\"3\" fill=\"{}\"/>",
                    gx + 12.0,
                    entry.color
                ));
            }
        } else {
            svg.push_str(&format!(
                "<rect x=\"{gx:.2}\" y=\"{:.2}\" width=\"24\" height=\"{:.2}\" fill=\"{}\" stroke=\"{BAR_STROKE}\" stroke-width=\"0.5\"/>",
                cy - size * 0.4,
                size * 0.8,
                entry.color
            ));
        }
        svg.push_str(&text_svg(
            gx + 32.0,
            cy + size * 0.35,
            TextAnchor::Start,
            size,
            &theme.text_color,
            TextStyle::Normal,
            &entry.label,
            theme,
        ));
    }
}

fn annotation_svg(svg: &mut String, annotation: &Annotation, theme: &Theme) {
    let size = theme.font_size * 0.85;
    if let Some((tx, ty)) = annotation.target {
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{tx:.2}\" y2=\"{ty:.2}\" stroke=\"{}\" stroke-width=\"1\" marker-end=\"url(#arrow)\"/>",
            annotation.x,
            annotation.y,
            annotation.color
        ));
    }
    let style = if annotation.italic {
        TextStyle::Italic
    } else {
        TextStyle::Normal
    };
    let block = size * 1.2 * annotation.lines.len().saturating_sub(1) as f32;
    for (idx, line) in annotation.lines.iter().enumerate() {
        svg.push_str(&text_svg(
            annotation.x + 4.0,
            annotation.y - block + size * 1.2 * idx as f32,
            annotation.anchor,
            size,
            &annotation.color,
            style,
            line,
            theme,
        ));
    }
}

fn polyline_svg(svg: &mut String, line: &Polyline) {
    svg.push_str(&format!(
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\" stroke-linejoin=\"round\"{}/>",
        points_to_path(&line.points),
        line.color,
        line.width,
        dash_attr(line.style)
    ));
}

fn render_table(
    svg: &mut String,
    table: &TableLayout,
    width: f32,
    theme: &Theme,
    config: &LayoutConfig,
) {
    svg.push_str(&text_svg(
        width / 2.0,
        table.title_y,
        TextAnchor::Middle,
        theme.title_font_size * 0.9,
        &theme.text_color,
        TextStyle::Bold,
        &table.title,
        theme,
    ));
    let padding_x = config.table.cell_padding_x;
    let padding_y = config.table.cell_padding_y;
    for cell in &table.cells {
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.5\"/>",
            cell.x, cell.y, cell.width, cell.height, cell.fill, table.border_color
        ));
        let (x, anchor) = match cell.align {
            Align::Left => (cell.x + padding_x, TextAnchor::Start),
            Align::Center => (cell.x + cell.width / 2.0, TextAnchor::Middle),
        };
        let style = if cell.bold {
            TextStyle::Bold
        } else {
            TextStyle::Normal
        };
        for (idx, line) in cell.lines.iter().enumerate() {
            svg.push_str(&text_svg(
                x,
                cell.y + padding_y + table.line_height * idx as f32 + table.font_size,
                anchor,
                table.font_size,
                &cell.text_color,
                style,
                line,
                theme,
            ));
        }
    }
}

fn render_placeholder(
    svg: &mut String,
    placeholder: &PlaceholderLayout,
    width: f32,
    height: f32,
    theme: &Theme,
) {
    let pitch = placeholder.font_size * 1.5;
    let block = pitch * placeholder.lines.len().saturating_sub(1) as f32;
    for (idx, line) in placeholder.lines.iter().enumerate() {
        svg.push_str(&text_svg(
            width / 2.0,
            height / 2.0 - block / 2.0 + pitch * idx as f32,
            TextAnchor::Middle,
            placeholder.font_size,
            &placeholder.color,
            TextStyle::Normal,
            line,
            theme,
        ));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextStyle {
    Normal,
    Bold,
    Italic,
}

#[allow(clippy::too_many_arguments)]
fn text_svg(
    x: f32,
    y: f32,
    anchor: TextAnchor,
    font_size: f32,
    fill: &str,
    style: TextStyle,
    content: &str,
    theme: &Theme,
) -> String {
    let anchor = match anchor {
        TextAnchor::Start => "start",
        TextAnchor::Middle => "middle",
        TextAnchor::End => "end",
    };
    let style = match style {
        TextStyle::Normal => "",
        TextStyle::Bold => " font-weight=\"bold\"",
        TextStyle::Italic => " font-style=\"italic\"",
    };
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-family=\"{}\" font-size=\"{font_size:.2}\" fill=\"{fill}\"{style} xml:space=\"preserve\">{}</text>",
        escape_xml(&theme.font_family),
        escape_xml(content)
    )
}

fn dash_attr(style: LineStyle) -> &'static str {
    match style {
        LineStyle::Solid => "",
        LineStyle::Dashed => " stroke-dasharray=\"6 4\"",
        LineStyle::Dotted => " stroke-dasharray=\"1.5 3\"",
        LineStyle::DashDot => " stroke-dasharray=\"6 3 1.5 3\"",
    }
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    if points.is_empty() {
        return String::new();
    }
    let mut d = String::new();
    d.push_str(&format!("M {:.2} {:.2}", points[0].0, points[0].1));
    for point in points.iter().skip(1) {
        d.push_str(&format!(" L {:.2} {:.2}", point.0, point.1));
    }
    d
}

/// Write an SVG document to `output`, or to stdout when no path is given.
pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

/// Rasterize an SVG document with resvg at `RenderConfig::scale`. Text
/// without a resolvable family falls back to the theme's first font family.
#[cfg(feature = "png")]
pub fn write_output_png(
    svg: &str,
    output: &Path,
    render_cfg: &RenderConfig,
    theme: &Theme,
) -> Result<()> {
    let mut opt = usvg::Options::default();
    if let Some(family) = primary_font_family(&theme.font_family) {
        opt.font_family = family;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let scale = if render_cfg.scale > 0.0 {
        render_cfg.scale
    } else {
        1.0
    };
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate {width}x{height} pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(
    _svg: &str,
    _output: &Path,
    _render_cfg: &RenderConfig,
    _theme: &Theme,
) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the `png` feature; rebuild with --features png or use --format svg"
    ))
}

/// First entry of a CSS font-family list, unquoted.
#[cfg_attr(not(feature = "png"), allow(dead_code))]
fn primary_font_family(families: &str) -> Option<String> {
    families
        .split(',')
        .map(|family| family.trim().trim_matches(|c| c == '"' || c == '\''))
        .find(|family| !family.is_empty())
        .map(str::to_string)
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
