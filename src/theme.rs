//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::game::Shape;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Keys for the seven piece colours, in [`Shape::color_index`] order.
const PIECE_KEYS: [&str; 7] = [
    "piece_i", "piece_o", "piece_t", "piece_l", "piece_j", "piece_s", "piece_z",
];

/// Classic piece colours (I, O, T, L, J, S, Z).
const CLASSIC_PIECES: [(u8, u8, u8); 7] = [
    (0x00, 0xf0, 0xf0),
    (0xf0, 0xf0, 0x00),
    (0xa0, 0x00, 0xf0),
    (0xf0, 0xa0, 0x00),
    (0x00, 0x00, 0xf0),
    (0x00, 0xf0, 0x00),
    (0xf0, 0x00, 0x00),
];

/// Piece palette and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Piece colours indexed by [`Shape::color_index`].
    pub pieces: [Color; 7],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Hints and disabled controls.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            pieces: CLASSIC_PIECES.map(rgb),
            bg: Color::Rgb(0x1c, 0x1f, 0x26),
            div_line: Color::Rgb(0x3f, 0x44, 0x4f),
            main_fg: Color::Rgb(0xab, 0xb2, 0xbf),
            title: Color::Rgb(0xe5, 0xc0, 0x7b),
            inactive_fg: Color::Rgb(0x5c, 0x63, 0x70),
        }
    }

    /// Load theme from a btop-style file. Without a path the classic theme is
    /// used; keys missing from the file keep their classic value.
    /// `palette` then overrides the piece colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            None => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    Color::Rgb(0x00, 0xff, 0xff),
                    Color::Rgb(0xff, 0xff, 0x00),
                    Color::Rgb(0xff, 0x00, 0xff),
                    Color::Rgb(0xff, 0x88, 0x00),
                    Color::Rgb(0x00, 0x88, 0xff),
                    Color::Rgb(0x00, 0xff, 0x00),
                    Color::Rgb(0xff, 0x00, 0x00),
                ];
                self.bg = Color::Black;
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito: no pair relies on red/green alone
                self.pieces = [
                    Color::Rgb(0x56, 0xb4, 0xe9),
                    Color::Rgb(0xf0, 0xe4, 0x42),
                    Color::Rgb(0xcc, 0x79, 0xa7),
                    Color::Rgb(0xe6, 0x9f, 0x00),
                    Color::Rgb(0x00, 0x72, 0xb2),
                    Color::Rgb(0x00, 0x9e, 0x73),
                    Color::Rgb(0xd5, 0x5e, 0x00),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let mut theme = Self::classic();
        let get = |key: &str| map.get(key).map(|v| parse_hex(v)).transpose();
        for (slot, key) in theme.pieces.iter_mut().zip(PIECE_KEYS) {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        for (slot, key) in [
            (&mut theme.bg, "bg"),
            (&mut theme.div_line, "div_line"),
            (&mut theme.main_fg, "main_fg"),
            (&mut theme.title, "title"),
            (&mut theme.inactive_fg, "inactive_fg"),
        ] {
            if let Some(c) = get(key)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    #[inline]
    pub fn piece_color(&self, shape: Shape) -> Color {
        self.pieces[shape.color_index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#00f0f0").unwrap();
        assert!(matches!(c, Color::Rgb(0x00, 0xf0, 0xf0)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#zzzzzz"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[piece_t]="#A000F0""##);
        assert_eq!(map.get("piece_t"), Some(&"#A000F0".to_string()));
    }

    #[test]
    fn test_classic_colours_follow_shapes() {
        let theme = Theme::classic();
        assert_eq!(theme.piece_color(Shape::I), Color::Rgb(0x00, 0xf0, 0xf0));
        assert_eq!(theme.piece_color(Shape::Z), Color::Rgb(0xf0, 0x00, 0x00));
        assert_eq!(theme.piece_color(Shape::J), Color::Rgb(0x00, 0x00, 0xf0));
    }

    #[test]
    fn test_partial_theme_keeps_defaults() {
        let map = parse_theme_file(
            "# comment\ntheme[piece_o]=\"#123456\"\ntheme[bg]='#000'\nnot a theme line\n",
        );
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.piece_color(Shape::O), Color::Rgb(0x12, 0x34, 0x56));
        assert_eq!(theme.bg, Color::Rgb(0, 0, 0));
        assert_eq!(theme.piece_color(Shape::I), Theme::classic().pieces[0]);
    }

    #[test]
    fn test_bad_colour_in_file_is_an_error() {
        let map = parse_theme_file("theme[title]=\"#nothex\"");
        assert!(Theme::from_map(&map).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Theme::load(
            Some(Path::new("/nonexistent/blockfall.theme")),
            crate::Palette::Normal,
        );
        assert!(matches!(result, Err(ThemeError::Io(_))));
    }
}
