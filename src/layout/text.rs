use once_cell::sync::Lazy;
use regex::Regex;

use crate::text_metrics;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Greedy word wrap at `width` characters. Words longer than the width are
/// split across lines.
pub fn wrap_chars(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in normalize_whitespace(text).split(' ') {
        if word.is_empty() {
            continue;
        }
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed <= width {
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.extend(word.iter());
                current_len += word.len();
                break;
            }
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            // Word alone is too long for a line.
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
    }
    if current_len > 0 {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Upper-case the first letter of every alphabetic run and lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(ch);
            previous_alpha = false;
        }
    }
    out
}

/// Column header from a snake_case key.
pub fn column_label(key: &str) -> String {
    title_case(&key.replace('_', " "))
}

pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 && value.abs() < 1e15 {
        format!("{}", value.round() as i64)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Width in pixels of `text` at `font_size`. Falls back to per-character
/// estimates when fonts are unavailable or fast metrics are requested.
pub fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if !fast
        && let Some(width) = text_metrics::measure_text_width(text, font_size, font_family)
        && width > 0.0
    {
        return width;
    }
    estimate_text_width(text, font_size)
}

pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.25,
        'i' | 'j' | 'l' | '!' | '\'' | '|' | '.' | ',' | ':' | ';' => 0.28,
        'f' | 'r' | 't' | '(' | ')' | '[' | ']' | '-' => 0.34,
        'm' | 'w' => 0.78,
        'M' | 'W' => 0.9,
        '%' | '@' => 0.83,
        c if c.is_ascii_digit() => 0.5,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii_lowercase() => 0.48,
        c if c.is_whitespace() => 0.25,
        _ => 0.6,
    }
}
