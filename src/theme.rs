use crate::types::ThemeMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HUE: u16 = 252;
pub const DEFAULT_SATURATION: u8 = 100;
pub const DEFAULT_LIGHTNESS: u8 = 67;

pub struct ThemeDefinition {
    pub css: &'static str,
}

pub fn theme_definition(mode: ThemeMode) -> ThemeDefinition {
    match mode {
        ThemeMode::Dark => ThemeDefinition { css: DARK_THEME },
        ThemeMode::Light => ThemeDefinition { css: LIGHT_THEME },
    }
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }
}

/// Full stylesheet for `mode`: the accent variables, then the mode's palette.
pub fn stylesheet(mode: ThemeMode, settings: &ThemeSettings) -> String {
    format!(
        "{}\n{}\n",
        settings.root_style(),
        theme_definition(mode).css.trim()
    )
}

/// Primary accent colour as HSL channels, clamped to the slider ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ThemeChannels")]
pub struct ThemeSettings {
    hue: u16,
    saturation: u8,
    lightness: u8,
}

#[derive(Deserialize)]
struct ThemeChannels {
    hue: u16,
    saturation: u8,
    lightness: u8,
}

impl From<ThemeChannels> for ThemeSettings {
    fn from(raw: ThemeChannels) -> Self {
        Self::new(raw.hue, raw.saturation, raw.lightness)
    }
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self::new(DEFAULT_HUE, DEFAULT_SATURATION, DEFAULT_LIGHTNESS)
    }
}

impl ThemeSettings {
    pub fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue: hue.min(360),
            saturation: saturation.min(100),
            lightness: lightness.min(100),
        }
    }

    pub fn hue(&self) -> u16 {
        self.hue
    }

    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    pub fn lightness(&self) -> u8 {
        self.lightness
    }

    pub fn css_variables(&self) -> [(&'static str, String); 3] {
        [
            ("--primary-hue", self.hue.to_string()),
            ("--primary-saturation", format!("{}%", self.saturation)),
            ("--primary-lightness", format!("{}%", self.lightness)),
        ]
    }

    /// `:root` rule applying the accent colour.
    pub fn root_style(&self) -> String {
        let declarations = self
            .css_variables()
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        format!(":root {{ {declarations} }}")
    }
}

const DARK_THEME: &str = r#"
:root {
    --background: 240 10% 4%;
    --foreground: 0 0% 98%;
    --muted: 240 4% 16%;
    --muted-foreground: 240 5% 65%;
    --border: 240 4% 16%;
    --primary: var(--primary-hue) var(--primary-saturation) var(--primary-lightness);
    --primary-foreground: 0 0% 98%;
}
"#;

const LIGHT_THEME: &str = r#"
:root {
    --background: 0 0% 100%;
    --foreground: 240 10% 4%;
    --muted: 240 5% 96%;
    --muted-foreground: 240 4% 46%;
    --border: 240 6% 90%;
    --primary: var(--primary-hue) var(--primary-saturation) var(--primary-lightness);
    --primary-foreground: 0 0% 98%;
}
"#;
