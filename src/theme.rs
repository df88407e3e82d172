//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use slimematch::ItemType;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

/// One Dark palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Ordinary item colours, in [`ItemType::COLORS`] order.
    pub items: [Color; 6],
    pub slime: Color,
    pub growth: Color,
    pub death: Color,
    pub bomb: Color,
    pub block: Color,
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, turns).
    pub main_fg: Color,
    /// Highlight / titles / cursor.
    pub title: Color,
    /// Locked levels, empty cells.
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
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults: exact hex values from onedark.theme.
    pub const fn onedark_default() -> Self {
        Self {
            items: [
                rgb(0x61AFEF), // cpu_box / blue
                rgb(0xC678DD), // net_box / purple
                rgb(0xE5C07B), // title / yellow
                rgb(0x98C379), // mem_box / green
                rgb(0xD19A66), // proc_box / orange
                rgb(0xDCDFE4), // hi_fg-ish / white
            ],
            slime: rgb(0x56B6C2),  // proc_misc / cyan
            growth: rgb(0x7EC16E), // lighter than the green item
            death: rgb(0xE06C75),  // cpu_end / red
            bomb: rgb(0xE5C07B),
            block: rgb(0x5C6370),
            bg: rgb(0x31353F),          // meter_bg
            div_line: rgb(0x3F444F),    // div_line
            main_fg: rgb(0xABB2BF),     // main_fg
            title: rgb(0xE5C07B),       // title
            inactive_fg: rgb(0x5C6370), // inactive_fg
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or file is missing.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override item colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.items = [
                    rgb(0x0088FF),
                    rgb(0xFF00FF),
                    rgb(0xFFFF00),
                    rgb(0x00FF00),
                    rgb(0xFF8800),
                    rgb(0xFFFFFF),
                ];
                self.slime = rgb(0x00FFFF);
                self.death = rgb(0xFF0000);
            }
            crate::Palette::Colorblind => {
                // Paul Tol's bright scheme; slime and death kept off the red/green axis
                self.items = [
                    rgb(0x0077BB),
                    rgb(0xAA3377),
                    rgb(0xCCBB44),
                    rgb(0x009988),
                    rgb(0xEE7733),
                    rgb(0xBBBBBB),
                ];
                self.slime = rgb(0x33BBEE);
                self.death = rgb(0xCC3311);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let d = Self::onedark_default();
        // Keys match onedark.theme; anything missing keeps the One Dark value.
        Self {
            items: [
                get("cpu_box").unwrap_or(d.items[0]),
                get("net_box").unwrap_or(d.items[1]),
                get("cpu_mid").or_else(|| get("title")).unwrap_or(d.items[2]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(d.items[3]),
                get("proc_box").unwrap_or(d.items[4]),
                get("hi_fg").unwrap_or(d.items[5]),
            ],
            slime: get("proc_misc").unwrap_or(d.slime),
            growth: get("free_start").unwrap_or(d.growth),
            death: get("cpu_end").or_else(|| get("temp_end")).unwrap_or(d.death),
            bomb: get("title").unwrap_or(d.bomb),
            block: get("inactive_fg").unwrap_or(d.block),
            bg: get("meter_bg").unwrap_or(d.bg),
            div_line: get("div_line").unwrap_or(d.div_line),
            main_fg: get("main_fg").unwrap_or(d.main_fg),
            title: get("title").unwrap_or(d.title),
            inactive_fg: get("inactive_fg").unwrap_or(d.inactive_fg),
        }
    }

    /// Foreground colour for an item glyph.
    pub fn item_color(&self, kind: ItemType) -> Color {
        match kind {
            ItemType::Empty => self.inactive_fg,
            ItemType::Slime => self.slime,
            ItemType::Growth => self.growth,
            ItemType::Death => self.death,
            ItemType::BombHorizontal | ItemType::BombVertical | ItemType::BombSquare => self.bomb,
            ItemType::Block => self.block,
            colour => ItemType::COLORS
                .iter()
                .position(|&c| c == colour)
                .map_or(self.main_fg, |i| self.items[i]),
        }
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
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    if !s.is_ascii() {
        return Err(invalid());
    }
    let (r, g, b) = match s.len() {
        6 => (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?),
        3 => (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GG0000"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_file_overrides_items() {
        let map = parse_theme_file("theme[cpu_box]=\"#010203\"\ntheme[proc_misc]='#0A0B0C'");
        let theme = Theme::from_map(&map);
        assert!(matches!(theme.item_color(ItemType::Blue), Color::Rgb(1, 2, 3)));
        assert!(matches!(theme.item_color(ItemType::Slime), Color::Rgb(10, 11, 12)));
        assert_eq!(
            theme.item_color(ItemType::Purple),
            Theme::onedark_default().items[1]
        );
    }

    #[test]
    fn test_palettes_change_items() {
        let normal = Theme::onedark_default();
        let mut contrast = Theme::onedark_default();
        contrast.apply_palette(crate::Palette::HighContrast);
        assert_ne!(normal.items, contrast.items);
        assert_eq!(normal.bg, contrast.bg);
    }
}
