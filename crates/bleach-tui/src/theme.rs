//! Color themes for the bleach dashboard.

use ratatui::style::Color;
use tracing::warn;

/// Theme name identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    /// Cyan/magenta palette
    #[default]
    Default,
    /// Enhanced contrast for dark terminals
    Dark,
    /// For bright terminal backgrounds
    Light,
}

impl ThemeName {
    pub fn all() -> &'static [ThemeName] {
        &[ThemeName::Default, ThemeName::Dark, ThemeName::Light]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeName::Default => "Default",
            ThemeName::Dark => "Dark",
            ThemeName::Light => "Light",
        }
    }

    /// Parse a theme name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "default" => Some(ThemeName::Default),
            "dark" => Some(ThemeName::Dark),
            "light" => Some(ThemeName::Light),
            _ => None,
        }
    }
}

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Title bar and panel titles
    pub header: Color,
    /// Hotkey hints
    pub hotkey: Color,
    /// Normal text
    pub text: Color,
    /// Labels and secondary text
    pub text_dim: Color,
    /// Panel borders
    pub border: Color,
    /// Highlighted menu entry
    pub selection: Color,
    /// Menu entries while an operation owns the dashboard
    pub disabled: Color,
    pub status_healthy: Color,
    pub status_warning: Color,
    pub status_error: Color,
}

/// Complete theme definition.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn default_theme() -> Self {
        Self {
            name: ThemeName::Default,
            colors: ThemeColors {
                header: Color::Cyan,
                hotkey: Color::Yellow,
                text: Color::White,
                text_dim: Color::Gray,
                border: Color::Magenta,
                selection: Color::Cyan,
                disabled: Color::Rgb(80, 80, 80),
                status_healthy: Color::Green,
                status_warning: Color::Yellow,
                status_error: Color::Red,
            },
        }
    }

    pub fn dark_theme() -> Self {
        Self {
            name: ThemeName::Dark,
            colors: ThemeColors {
                header: Color::LightBlue,
                hotkey: Color::LightYellow,
                text: Color::White,
                text_dim: Color::DarkGray,
                border: Color::DarkGray,
                selection: Color::LightYellow,
                disabled: Color::Rgb(60, 60, 60),
                status_healthy: Color::LightGreen,
                status_warning: Color::LightYellow,
                status_error: Color::LightRed,
            },
        }
    }

    pub fn light_theme() -> Self {
        Self {
            name: ThemeName::Light,
            colors: ThemeColors {
                header: Color::Blue,
                hotkey: Color::DarkGray,
                text: Color::Black,
                text_dim: Color::DarkGray,
                border: Color::Gray,
                selection: Color::Rgb(0, 100, 255),
                disabled: Color::Rgb(160, 160, 160),
                status_healthy: Color::Green,
                status_warning: Color::Yellow,
                status_error: Color::Red,
            },
        }
    }

    pub fn by_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Default => Self::default_theme(),
            ThemeName::Dark => Self::dark_theme(),
            ThemeName::Light => Self::light_theme(),
        }
    }

    /// Resolve a configured theme name, falling back to the default.
    pub fn from_config(name: &str) -> Self {
        match ThemeName::parse(name) {
            Some(theme) => Self::by_name(theme),
            None => {
                warn!(theme = name, "unknown theme, using default");
                Self::default_theme()
            }
        }
    }

    /// Gauge color for a utilization percentage.
    pub fn usage_color(&self, pct: f64) -> Color {
        if pct >= 90.0 {
            self.colors.status_error
        } else if pct >= 70.0 {
            self.colors.status_warning
        } else {
            self.colors.status_healthy
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}
