use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// Body text size in pixels for plotted charts.
    pub font_size: f32,
    pub title_font_size: f32,
    pub text_color: String,
    pub muted_text_color: String,
    pub line_color: String,
    pub grid_color: String,
    pub background: String,
    pub header_fill: String,
    pub phase_fill: String,
    pub phase_text_color: String,
    pub main_box_fill: String,
    pub side_box_fill: String,
    pub box_border: String,
    pub series_color: String,
    pub area_fill: String,
    pub threshold_color: String,
    pub trend_color: String,
    pub bar_fill: String,
    pub quality_yes: String,
    pub quality_partial: String,
    pub quality_no: String,
    /// Base colour for keyword bars, scaled by relative frequency.
    pub keyword_base: (u8, u8, u8),
    pub table_header_fill: String,
    pub table_header_text: String,
    pub table_stripe_fill: String,
    /// Lighter header and stripe used by the search strategy table.
    pub search_header_fill: String,
    pub search_stripe_fill: String,
    pub table_border: String,
    pub placeholder_color: String,
    pub warning_color: String,
}

impl Theme {
    /// Serif journal style used for report figures.
    pub fn academic() -> Self {
        Self {
            font_family: "\"Times New Roman\", \"DejaVu Serif\", Georgia, serif".to_string(),
            font_size: 13.0,
            title_font_size: 16.0,
            text_color: "#222222".to_string(),
            muted_text_color: "#555555".to_string(),
            line_color: "#2c3e50".to_string(),
            grid_color: "#cccccc".to_string(),
            background: "#FFFFFF".to_string(),
            header_fill: "#f4d03f".to_string(),
            phase_fill: "#5dade2".to_string(),
            phase_text_color: "#FFFFFF".to_string(),
            main_box_fill: "#abebc6".to_string(),
            side_box_fill: "#fadbd8".to_string(),
            box_border: "#34495e".to_string(),
            series_color: "#333333".to_string(),
            area_fill: "#cccccc".to_string(),
            threshold_color: "#c0392b".to_string(),
            trend_color: "#e74c3c".to_string(),
            bar_fill: "#4a90e2".to_string(),
            quality_yes: "#27ae60".to_string(),
            quality_partial: "#f39c12".to_string(),
            quality_no: "#e74c3c".to_string(),
            keyword_base: (52, 152, 219),
            table_header_fill: "#34495e".to_string(),
            table_header_text: "#FFFFFF".to_string(),
            table_stripe_fill: "#ecf0f1".to_string(),
            search_header_fill: "#e8e8e8".to_string(),
            search_stripe_fill: "#f5f5f5".to_string(),
            table_border: "#333333".to_string(),
            placeholder_color: "#666666".to_string(),
            warning_color: "#996600".to_string(),
        }
    }

    /// Black-and-white variant for print-only submissions.
    pub fn grayscale() -> Self {
        Self {
            header_fill: "#d9d9d9".to_string(),
            phase_fill: "#595959".to_string(),
            main_box_fill: "#f2f2f2".to_string(),
            side_box_fill: "#ffffff".to_string(),
            box_border: "#000000".to_string(),
            line_color: "#000000".to_string(),
            threshold_color: "#000000".to_string(),
            trend_color: "#404040".to_string(),
            bar_fill: "#808080".to_string(),
            quality_yes: "#404040".to_string(),
            quality_partial: "#8c8c8c".to_string(),
            quality_no: "#d9d9d9".to_string(),
            keyword_base: (96, 96, 96),
            table_header_fill: "#404040".to_string(),
            table_stripe_fill: "#f2f2f2".to_string(),
            warning_color: "#404040".to_string(),
            ..Self::academic()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "academic" | "default" => Some(Self::academic()),
            "grayscale" | "print" => Some(Self::grayscale()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::academic()
    }
}

/// Scale an RGB colour by `factor` (clamped to the 0..=255 range) and format it as hex.
pub fn scale_rgb(base: (u8, u8, u8), factor: f32) -> String {
    let channel = |value: u8| -> u8 { (value as f32 * factor).round().clamp(0.0, 255.0) as u8 };
    format!(
        "#{:02x}{:02x}{:02x}",
        channel(base.0),
        channel(base.1),
        channel(base.2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_rgb_clamps() {
        assert_eq!(scale_rgb((52, 152, 219), 1.0), "#3498db");
        assert_eq!(scale_rgb((200, 200, 200), 2.0), "#ffffff");
        assert_eq!(scale_rgb((10, 20, 30), 0.0), "#000000");
    }

    #[test]
    fn named_themes() {
        assert!(Theme::by_name("academic").is_some());
        assert_eq!(Theme::by_name("print").unwrap().box_border, "#000000");
        assert!(Theme::by_name("neon").is_none());
    }
}
