// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Text layout
//!
//! Glyph rendering belongs to the host. This module resolves fonts through
//! a [`FontManager`] collaborator, decodes inline formatting, wraps and
//! aligns lines, and produces a [`TextLayout`] with per-line offsets in text
//! units relative to the anchor.

use dxf_lite_core::{HorizontalAlignment, MTextAttachment, VerticalAlignment};
use nalgebra::{Matrix3, Point2, Vector2};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Default MTEXT line pitch as a multiple of the text height
const LINE_PITCH: f64 = 5.0 / 3.0;

/// Descender depth as a fraction of the text height
const DESCENT_RATIO: f64 = 0.2;

/// Resolved font used for measuring and drawing text
#[derive(Debug, Clone, PartialEq)]
pub struct FontHandle {
    pub name: String,
    /// Average glyph advance as a fraction of the text height
    pub advance_ratio: f64,
    /// Set when the requested style was not available
    pub fallback: bool,
}

impl FontHandle {
    pub fn new(name: impl Into<String>, advance_ratio: f64) -> Self {
        Self {
            name: name.into(),
            advance_ratio,
            fallback: false,
        }
    }

    pub fn fallback() -> Self {
        Self {
            name: "standard".to_string(),
            advance_ratio: 0.6,
            fallback: true,
        }
    }
}

/// External font collaborator
pub trait FontManager {
    fn resolve_style(&self, name: &str) -> Option<FontHandle>;

    fn default_font(&self) -> FontHandle {
        FontHandle::fallback()
    }

    /// Resolve `name`, degrading to the default font on miss
    fn resolve_or_default(&self, name: Option<&str>) -> FontHandle {
        name.and_then(|n| self.resolve_style(n)).unwrap_or_else(|| {
            let mut font = self.default_font();
            font.fallback = true;
            font
        })
    }
}

/// Font manager backed by a fixed name → font table
#[derive(Debug, Clone, Default)]
pub struct StaticFontManager {
    fonts: FxHashMap<String, FontHandle>,
}

impl StaticFontManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, font: FontHandle) {
        self.fonts.insert(name.to_ascii_lowercase(), font);
    }
}

impl FontManager for StaticFontManager {
    fn resolve_style(&self, name: &str) -> Option<FontHandle> {
        self.fonts.get(&name.to_ascii_lowercase()).cloned()
    }
}

/// Shared managers, so one font table can serve many conversions
impl<T: FontManager + ?Sized> FontManager for Arc<T> {
    fn resolve_style(&self, name: &str) -> Option<FontHandle> {
        (**self).resolve_style(name)
    }

    fn default_font(&self) -> FontHandle {
        (**self).default_font()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Baseline start relative to the anchor, before rotation
    pub offset: Vector2<f64>,
    pub width: f64,
}

/// Positioned text block
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub position: Point2<f64>,
    pub rotation: f64,
    pub height: f64,
    pub width_factor: f64,
    pub oblique: f64,
    pub font: FontHandle,
    pub lines: Vec<TextLine>,
}

impl TextLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.text.trim().is_empty())
    }

    /// Text-local → parent transform
    pub fn transform(&self) -> Matrix3<f64> {
        Matrix3::new_translation(&self.position.coords) * Matrix3::new_rotation(self.rotation)
    }

    /// Local bounding box spanning all lines (baseline to cap height)
    pub fn local_bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let mut lines = self.lines.iter();
        let first = lines.next()?;
        let mut min = Point2::new(first.offset.x, first.offset.y);
        let mut max = Point2::new(first.offset.x + first.width, first.offset.y + self.height);
        for line in lines {
            min.x = min.x.min(line.offset.x);
            min.y = min.y.min(line.offset.y);
            max.x = max.x.max(line.offset.x + line.width);
            max.y = max.y.max(line.offset.y + self.height);
        }
        Some((min, max))
    }
}

/// Width of `text` set in `font`
pub fn measure(text: &str, height: f64, width_factor: f64, font: &FontHandle) -> f64 {
    text.chars().count() as f64 * height * font.advance_ratio * width_factor
}

/// Single-line text parameters, already in the parent coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams<'a> {
    pub text: &'a str,
    pub position: Point2<f64>,
    pub align_point: Option<Point2<f64>>,
    pub rotation: f64,
    pub height: f64,
    pub width_factor: f64,
    pub oblique: f64,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
}

/// Lay out single-line text with its horizontal/vertical alignment
pub fn layout_text(params: &TextParams<'_>, font: FontHandle) -> TextLayout {
    let text = decode_special_codes(params.text);
    let mut height = params.height;
    let mut width_factor = params.width_factor;
    let mut rotation = params.rotation;
    let mut width = measure(&text, height, width_factor, &font);

    let fitted = match (params.halign, params.align_point) {
        (HorizontalAlignment::Aligned | HorizontalAlignment::Fit, Some(end)) => {
            let span = end - params.position;
            let length = span.norm();
            (length > 0.0 && width > 0.0).then_some((span, length))
        }
        _ => None,
    };

    let (anchor, offset) = if let Some((span, length)) = fitted {
        rotation = span.y.atan2(span.x);
        let stretch = length / width;
        if params.halign == HorizontalAlignment::Aligned {
            height *= stretch;
        }
        width_factor *= if params.halign == HorizontalAlignment::Fit { stretch } else { 1.0 };
        width = length;
        (params.position, Vector2::zeros())
    } else if params.halign == HorizontalAlignment::Left
        && params.valign == VerticalAlignment::Baseline
    {
        (params.position, Vector2::zeros())
    } else {
        let anchor = params.align_point.unwrap_or(params.position);
        let (x, y) = match params.halign {
            HorizontalAlignment::Middle => (-width / 2.0, -height / 2.0),
            halign => {
                let x = match halign {
                    HorizontalAlignment::Center => -width / 2.0,
                    HorizontalAlignment::Right => -width,
                    _ => 0.0,
                };
                let y = match params.valign {
                    VerticalAlignment::Baseline => 0.0,
                    VerticalAlignment::Bottom => height * DESCENT_RATIO,
                    VerticalAlignment::Middle => -height / 2.0,
                    VerticalAlignment::Top => -height,
                };
                (x, y)
            }
        };
        (anchor, Vector2::new(x, y))
    };

    TextLayout {
        position: anchor,
        rotation,
        height,
        width_factor,
        oblique: params.oblique,
        font,
        lines: vec![TextLine {
            text,
            offset,
            width,
        }],
    }
}

/// Multi-line text parameters, already in the parent coordinate system
#[derive(Debug, Clone, PartialEq)]
pub struct MTextParams<'a> {
    pub text: &'a str,
    pub position: Point2<f64>,
    pub width: Option<f64>,
    pub rotation: f64,
    pub height: f64,
    pub width_factor: f64,
    pub attachment: MTextAttachment,
    pub line_spacing: f64,
}

/// Lay out MTEXT: decode formatting, wrap paragraphs, apply the attachment point
pub fn layout_mtext(params: &MTextParams<'_>, font: FontHandle) -> TextLayout {
    let height = params.height;
    let measure_line = |line: &str| measure(line, height, params.width_factor, &font);

    let mut wrapped: Vec<String> = Vec::new();
    for paragraph in split_mtext_paragraphs(params.text) {
        match params.width {
            Some(limit) if limit > 0.0 => wrap_paragraph(&paragraph, limit, &measure_line, &mut wrapped),
            _ => wrapped.push(paragraph),
        }
    }

    let spacing = if params.line_spacing > 0.0 { params.line_spacing } else { 1.0 };
    let pitch = height * LINE_PITCH * spacing;
    let total_height = height + pitch * wrapped.len().saturating_sub(1) as f64;
    let shift_y = match params.attachment.row() {
        0 => 0.0,
        1 => total_height / 2.0,
        _ => total_height,
    };

    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measure_line(&text);
            let x = match params.attachment.column() {
                0 => 0.0,
                1 => -width / 2.0,
                _ => -width,
            };
            let y = shift_y - height - pitch * i as f64;
            TextLine {
                text,
                offset: Vector2::new(x, y),
                width,
            }
        })
        .collect();

    TextLayout {
        position: params.position,
        rotation: params.rotation,
        height,
        width_factor: params.width_factor,
        oblique: 0.0,
        font,
        lines,
    }
}

/// Greedy word wrap on regular spaces; overlong words get their own line
fn wrap_paragraph(
    paragraph: &str,
    limit: f64,
    measure_line: &impl Fn(&str) -> f64,
    out: &mut Vec<String>,
) {
    let mut current = String::new();
    for word in paragraph.split(' ') {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if measure_line(&candidate) <= limit {
            current = candidate;
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    out.push(current);
}

/// Replace `%%` control codes of single-line text
pub fn decode_special_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("%%") {
        out.push_str(&rest[..pos]);
        let code = rest[pos + 2..].chars().next();
        match code.map(|c| c.to_ascii_lowercase()) {
            Some('c') => out.push('\u{2300}'),
            Some('d') => out.push('\u{00B0}'),
            Some('p') => out.push('\u{00B1}'),
            Some('%') => out.push('%'),
            // Underline/overline toggles have no glyph
            Some('u') | Some('o') => {}
            Some(other) => {
                out.push_str("%%");
                out.push(other);
            }
            None => {
                out.push_str("%%");
                rest = "";
                continue;
            }
        }
        let consumed = pos + 2 + code.map_or(0, char::len_utf8);
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Strip MTEXT inline formatting and split into paragraphs
pub fn split_mtext_paragraphs(raw: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('P') | Some('N') => paragraphs.push(std::mem::take(&mut current)),
                Some('~') => current.push('\u{00A0}'),
                Some(literal @ ('\\' | '{' | '}')) => current.push(literal),
                Some('S') => {
                    // Stacked fraction "a^b;" / "a/b;" / "a#b;"
                    for s in chars.by_ref() {
                        match s {
                            ';' => break,
                            '^' | '#' => current.push('/'),
                            other => current.push(other),
                        }
                    }
                }
                Some('U') if chars.peek() == Some(&'+') => {
                    chars.next();
                    let hex: String = chars.by_ref().take(4).collect();
                    if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        current.push(decoded);
                    }
                }
                Some('A' | 'C' | 'F' | 'f' | 'H' | 'Q' | 'T' | 'W' | 'p' | 'c') => {
                    // Property codes run up to ';'
                    for s in chars.by_ref() {
                        if s == ';' {
                            break;
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k') => {}
                Some(other) => current.push(other),
                None => {}
            },
            '{' | '}' => {}
            other => current.push(other),
        }
    }
    paragraphs.push(current);

    paragraphs
        .into_iter()
        .map(|p| decode_special_codes(&p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn font() -> FontHandle {
        FontHandle::new("test", 0.5)
    }

    fn text_params(text: &str) -> TextParams<'_> {
        TextParams {
            text,
            position: Point2::new(10.0, 20.0),
            align_point: None,
            rotation: 0.0,
            height: 2.0,
            width_factor: 1.0,
            oblique: 0.0,
            halign: HorizontalAlignment::Left,
            valign: VerticalAlignment::Baseline,
        }
    }

    #[test]
    fn test_font_fallback() {
        let mut fonts = StaticFontManager::new();
        fonts.register("RomanS", FontHandle::new("romans.shx", 0.55));

        let found = fonts.resolve_or_default(Some("romans"));
        assert_eq!(found.name, "romans.shx");
        assert!(!found.fallback);

        let missing = fonts.resolve_or_default(Some("gothic"));
        assert!(missing.fallback);
        assert!(fonts.resolve_or_default(None).fallback);
    }

    #[test]
    fn test_left_baseline_text() {
        let layout = layout_text(&text_params("ABCD"), font());
        assert_eq!(layout.position, Point2::new(10.0, 20.0));
        assert_eq!(layout.lines[0].offset, Vector2::zeros());
        // 4 glyphs * 2.0 height * 0.5 advance
        assert_relative_eq!(layout.lines[0].width, 4.0);
    }

    #[test]
    fn test_centered_text_uses_align_point() {
        let params = TextParams {
            halign: HorizontalAlignment::Center,
            valign: VerticalAlignment::Top,
            align_point: Some(Point2::new(50.0, 50.0)),
            ..text_params("ABCD")
        };
        let layout = layout_text(&params, font());
        assert_eq!(layout.position, Point2::new(50.0, 50.0));
        assert_relative_eq!(layout.lines[0].offset, Vector2::new(-2.0, -2.0));
    }

    #[test]
    fn test_aligned_text_scales_height() {
        let params = TextParams {
            halign: HorizontalAlignment::Aligned,
            align_point: Some(Point2::new(10.0, 28.0)),
            ..text_params("ABCD")
        };
        let layout = layout_text(&params, font());
        assert_relative_eq!(layout.rotation, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(layout.height, 4.0);
        assert_relative_eq!(layout.lines[0].width, 8.0);
    }

    #[test]
    fn test_fit_text_scales_width_only() {
        let params = TextParams {
            halign: HorizontalAlignment::Fit,
            align_point: Some(Point2::new(18.0, 20.0)),
            ..text_params("ABCD")
        };
        let layout = layout_text(&params, font());
        assert_relative_eq!(layout.height, 2.0);
        assert_relative_eq!(layout.width_factor, 2.0);
    }

    #[test]
    fn test_special_codes() {
        assert_eq!(decode_special_codes("%%c50"), "\u{2300}50");
        assert_eq!(decode_special_codes("90%%d %%p0.5"), "90\u{00B0} \u{00B1}0.5");
        assert_eq!(decode_special_codes("100%%%"), "100%");
        assert_eq!(decode_special_codes("%%uunder%%u"), "under");
        assert_eq!(decode_special_codes("tail%%"), "tail%%");
    }

    #[test]
    fn test_mtext_formatting_stripped() {
        let paragraphs = split_mtext_paragraphs(r"{\fArial|b1;Title}\PLine\~two\P\S1^2;");
        assert_eq!(paragraphs, vec!["Title", "Line\u{00A0}two", "1/2"]);

        let escaped = split_mtext_paragraphs(r"a\\b\{c\}\U+00B0");
        assert_eq!(escaped, vec!["a\\b{c}\u{00B0}"]);
    }

    #[test]
    fn test_mtext_word_wrap() {
        // Each glyph is 1.0 wide; limit of 9 fits "aaa bbb" but not "aaa bbb ccc"
        let params = MTextParams {
            text: "aaa bbb ccc",
            position: Point2::origin(),
            width: Some(9.0),
            rotation: 0.0,
            height: 2.0,
            width_factor: 1.0,
            attachment: MTextAttachment::TopLeft,
            line_spacing: 1.0,
        };
        let layout = layout_mtext(&params, font());
        let texts: Vec<&str> = layout.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc"]);
        // Top-left: first baseline one text height below the anchor
        assert_relative_eq!(layout.lines[0].offset.y, -2.0);
        assert_relative_eq!(layout.lines[1].offset.y, -2.0 - 2.0 * LINE_PITCH);
    }

    #[test]
    fn test_mtext_bottom_right_attachment() {
        let params = MTextParams {
            text: "abcd",
            position: Point2::origin(),
            width: None,
            rotation: 0.0,
            height: 2.0,
            width_factor: 1.0,
            attachment: MTextAttachment::BottomRight,
            line_spacing: 1.0,
        };
        let layout = layout_mtext(&params, font());
        assert_relative_eq!(layout.lines[0].offset, Vector2::new(-4.0, 0.0));
    }
}
