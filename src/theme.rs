//! Theme system for the TUI.
//!
//! Provides semantic color roles that map to ratatui `Style` values.
//! The `ThemeVariant` enum selects between Dark and Light palettes,
//! and `StyleMap` resolves role names to concrete styles.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants. The choice is persisted as a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Toggle: Dark → Light → Dark.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }

    /// Value stored in the `theme.variant` preference.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Feed --
    pub post_title: Style,
    pub post_selected: Style,
    pub post_meta: Style,
    pub post_excerpt: Style,
    pub avatar: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub empty_state: Style,
    pub hero: Style,

    // -- Forms (compose, login) --
    pub form_label: Style,
    pub form_input: Style,
    pub form_input_focused: Style,
    pub form_error: Style,
    pub form_warning: Style,

    // -- Reader --
    pub reader_heading: Style,
    pub reader_body: Style,
    pub reader_metadata: Style,
    pub reader_code_block: Style,
    pub reader_inline_code: Style,
    pub reader_emphasis: Style,
    pub reader_strong: Style,
    pub reader_link: Style,
    pub reader_quote: Style,
    pub reader_error: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub status_error: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
    pub location: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            post_title: Style::default().add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            post_meta: Style::default().fg(Color::Gray),
            post_excerpt: Style::default(),
            avatar: Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            tab_active: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::Gray),
            empty_state: Style::default().fg(Color::Cyan),
            hero: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),

            form_label: Style::default().add_modifier(Modifier::BOLD),
            form_input: Style::default(),
            form_input_focused: Style::default().fg(Color::Cyan),
            form_error: Style::default().fg(Color::Red),
            form_warning: Style::default().fg(Color::Yellow),

            reader_heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            reader_body: Style::default(),
            reader_metadata: Style::default().fg(Color::DarkGray),
            reader_code_block: Style::default().fg(Color::Yellow).bg(Color::Black),
            reader_inline_code: Style::default().fg(Color::Yellow),
            reader_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            reader_strong: Style::default().add_modifier(Modifier::BOLD),
            reader_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            reader_quote: Style::default().fg(Color::Gray),
            reader_error: Style::default().fg(Color::Red),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
            location: Style::default().fg(Color::DarkGray),
        }
    }

    /// Adapted for light terminal backgrounds.
    fn light() -> Self {
        Self {
            post_title: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::Blue).fg(Color::White),
            post_meta: Style::default().fg(Color::DarkGray),
            post_excerpt: Style::default().fg(Color::Black),
            avatar: Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            tab_active: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::DarkGray),
            empty_state: Style::default().fg(Color::Blue),
            hero: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),

            form_label: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            form_input: Style::default().fg(Color::Black),
            form_input_focused: Style::default().fg(Color::Blue),
            form_error: Style::default().fg(Color::Red),
            form_warning: Style::default().fg(Color::Magenta),

            reader_heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            reader_body: Style::default().fg(Color::Black),
            reader_metadata: Style::default().fg(Color::DarkGray),
            reader_code_block: Style::default().fg(Color::DarkGray).bg(Color::White),
            reader_inline_code: Style::default().fg(Color::DarkGray),
            reader_emphasis: Style::default().add_modifier(Modifier::ITALIC),
            reader_strong: Style::default().add_modifier(Modifier::BOLD),
            reader_link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            reader_quote: Style::default().fg(Color::DarkGray),
            reader_error: Style::default().fg(Color::Red),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_error: Style::default().bg(Color::Red).fg(Color::White),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
            location: Style::default().fg(Color::DarkGray),
        }
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// String-keyed style lookup, so render code can name roles (`"post_meta"`)
/// without matching on the palette struct.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

/// All semantic role names, in declaration order.
const ROLE_NAMES: [&str; 29] = [
    "post_title",
    "post_selected",
    "post_meta",
    "post_excerpt",
    "avatar",
    "tab_active",
    "tab_inactive",
    "empty_state",
    "hero",
    "form_label",
    "form_input",
    "form_input_focused",
    "form_error",
    "form_warning",
    "reader_heading",
    "reader_body",
    "reader_metadata",
    "reader_code_block",
    "reader_inline_code",
    "reader_emphasis",
    "reader_strong",
    "reader_link",
    "reader_quote",
    "reader_error",
    "status_bar",
    "status_error",
    "panel_border",
    "panel_border_focused",
    "location",
];

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        let styles: [Style; 29] = [
            p.post_title,
            p.post_selected,
            p.post_meta,
            p.post_excerpt,
            p.avatar,
            p.tab_active,
            p.tab_inactive,
            p.empty_state,
            p.hero,
            p.form_label,
            p.form_input,
            p.form_input_focused,
            p.form_error,
            p.form_warning,
            p.reader_heading,
            p.reader_body,
            p.reader_metadata,
            p.reader_code_block,
            p.reader_inline_code,
            p.reader_emphasis,
            p.reader_strong,
            p.reader_link,
            p.reader_quote,
            p.reader_error,
            p.status_bar,
            p.status_error,
            p.panel_border,
            p.panel_border_focused,
            p.location,
        ];

        let mut map = HashMap::with_capacity(ROLE_NAMES.len());
        for (name, style) in ROLE_NAMES.iter().zip(styles.iter()) {
            map.insert(*name, *style);
        }

        Self { map }
    }

    /// Resolve a role name to its `Style`. Returns `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_palette_focus_border_is_cyan() {
        let palette = ThemeVariant::Dark.palette();
        assert_eq!(
            palette.panel_border_focused,
            Style::default().fg(Color::Cyan)
        );
    }

    #[test]
    fn errors_are_red_in_both_variants() {
        for v in [ThemeVariant::Dark, ThemeVariant::Light] {
            let p = v.palette();
            assert_eq!(p.form_error.fg, Some(Color::Red));
            assert_eq!(p.reader_error.fg, Some(Color::Red));
        }
    }

    #[test]
    fn light_palette_differs_from_dark() {
        let dark = ThemeVariant::Dark.palette();
        let light = ThemeVariant::Light.palette();
        assert_ne!(dark.post_selected, light.post_selected);
        assert_ne!(dark.status_bar, light.status_bar);
    }

    #[test]
    fn variant_from_str_name() {
        assert_eq!(
            ThemeVariant::from_str_name("dark"),
            Some(ThemeVariant::Dark)
        );
        assert_eq!(
            ThemeVariant::from_str_name(" Light "),
            Some(ThemeVariant::Light)
        );
        assert_eq!(ThemeVariant::from_str_name("neon"), None);
    }

    #[test]
    fn variant_toggle_and_key_round_trip() {
        assert_eq!(ThemeVariant::Dark.next(), ThemeVariant::Light);
        assert_eq!(ThemeVariant::Light.next(), ThemeVariant::Dark);
        for v in [ThemeVariant::Dark, ThemeVariant::Light] {
            assert_eq!(ThemeVariant::from_str_name(v.key()), Some(v));
        }
    }

    #[test]
    fn style_map_resolves_known_roles() {
        let palette = ThemeVariant::Dark.palette();
        let sm = StyleMap::from_palette(&palette);

        assert_eq!(sm.resolve("post_selected"), palette.post_selected);
        assert_eq!(sm.resolve("reader_heading"), palette.reader_heading);
        assert_eq!(sm.resolve("location"), palette.location);
    }

    #[test]
    fn style_map_returns_default_for_unknown() {
        let sm = StyleMap::from_palette(&ThemeVariant::Dark.palette());
        assert_eq!(sm.resolve("nonexistent_role"), Style::default());
    }

    #[test]
    fn role_names_count_matches_palette_fields() {
        let sm = StyleMap::from_palette(&ThemeVariant::Light.palette());
        assert_eq!(sm.map.len(), ROLE_NAMES.len());
        for name in ROLE_NAMES {
            assert!(sm.map.contains_key(name), "Role '{}' missing", name);
        }
    }
}
