//! Text styles applied to rendered text.

use deck_core::{Error, Result, Rgb};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where a piece of text appears on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    /// Title of the cover slide.
    MainTitle,
    SlideTitle,
    Subtitle,
    Body,
    /// Free-standing text boxes.
    Caption,
}

/// Font settings for one run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: String,
    /// Size in points.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
}

impl TextStyle {
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// Brand fonts and colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub regular_font: String,
    pub bold_font: String,
    pub primary: Rgb,
    pub main_text: Rgb,
    pub accent: Rgb,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            regular_font: "Noto Sans CJK JP Regular".to_string(),
            bold_font: "Noto Sans CJK JP Bold".to_string(),
            primary: Rgb::new(0, 51, 102),
            main_text: Rgb::new(51, 51, 51),
            accent: Rgb::new(255, 102, 0),
        }
    }
}

impl StyleConfig {
    /// Parse a JSON object such as `{"primary": {"r": 0, "g": 51, "b": 102}}`.
    ///
    /// Fields left out keep their default.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a style file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// The text style for a role.
    pub fn style(&self, role: TextRole) -> TextStyle {
        let base = TextStyle {
            font: self.regular_font.clone(),
            size: 18.0,
            bold: false,
            italic: false,
            color: self.main_text,
        };

        match role {
            TextRole::MainTitle => TextStyle {
                size: 32.0,
                bold: true,
                color: self.primary,
                ..base
            },
            TextRole::SlideTitle => TextStyle {
                size: 24.0,
                bold: true,
                color: self.primary,
                ..base
            },
            TextRole::Subtitle => TextStyle {
                font: self.bold_font.clone(),
                size: 14.0,
                ..base
            },
            TextRole::Body => base.with_size(14.0),
            TextRole::Caption => base,
        }
    }
}
