use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 介面主題。 / Visual theme selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Paper,
    Midnight,
    Black,
    Glass,
}

impl Theme {
    /// 依循環順序列出所有主題。 / All themes in cycling order.
    pub const ALL: [Theme; 4] = [Theme::Paper, Theme::Midnight, Theme::Black, Theme::Glass];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Paper => "paper",
            Theme::Midnight => "midnight",
            Theme::Black => "black",
            Theme::Glass => "glass",
        }
    }

    /// 是否為深色主題。 / Whether the theme renders light text on a dark background.
    pub fn is_dark(self) -> bool {
        matches!(self, Theme::Midnight | Theme::Black)
    }

    /// 取得循環中的下一個主題。 / Returns the theme that follows this one in the cycle.
    pub fn next(self) -> Theme {
        let index = Self::ALL.iter().position(|&theme| theme == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// 在紙張與午夜之間切換。 / Flips between the paper and midnight themes.
    pub fn toggled_dark(self) -> Theme {
        if self == Theme::Paper {
            Theme::Midnight
        } else {
            Theme::Paper
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme '{0}'")]
pub struct ThemeParseError(pub String);

impl FromStr for Theme {
    type Err = ThemeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .find(|theme| theme.name() == normalized)
            .ok_or_else(|| ThemeParseError(value.to_string()))
    }
}

/// 可見窗格配置。 / Which panes of the window are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Editor,
    Split,
    Preview,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::Editor, Layout::Split, Layout::Preview];

    pub fn name(self) -> &'static str {
        match self {
            Layout::Editor => "editor",
            Layout::Split => "split",
            Layout::Preview => "preview",
        }
    }

    /// 編輯 → 分割 → 預覽 → 編輯。 / Editor, then split, then preview, then back to editor.
    pub fn next(self) -> Layout {
        match self {
            Layout::Editor => Layout::Split,
            Layout::Split => Layout::Preview,
            Layout::Preview => Layout::Editor,
        }
    }

    pub fn shows_editor(self) -> bool {
        !matches!(self, Layout::Preview)
    }

    pub fn shows_preview(self) -> bool {
        !matches!(self, Layout::Editor)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layout '{0}'")]
pub struct LayoutParseError(pub String);

impl FromStr for Layout {
    type Err = LayoutParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name() == normalized)
            .ok_or_else(|| LayoutParseError(value.to_string()))
    }
}

const MIN_FONT_SIZE: u32 = 8;
const MAX_FONT_SIZE: u32 = 72;
const MIN_LINE_HEIGHT: f32 = 1.0;
const MAX_LINE_HEIGHT: f32 = 3.0;
const MAX_TAB_SIZE: u32 = 16;

/// 編輯器外觀設定。 / Appearance settings for the editing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default = "default_tab_size")]
    pub tab_size: u32,
    #[serde(default = "default_true")]
    pub word_wrap: bool,
    #[serde(default)]
    pub line_numbers: bool,
    #[serde(default)]
    pub minimap: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typewriter_mode: Option<bool>,
}

fn default_font_size() -> u32 {
    16
}

fn default_line_height() -> f32 {
    1.7
}

fn default_tab_size() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Paper,
            font_size: default_font_size(),
            line_height: default_line_height(),
            tab_size: default_tab_size(),
            word_wrap: true,
            line_numbers: false,
            minimap: false,
            typewriter_mode: None,
        }
    }
}

impl EditorConfig {
    /// 將超出範圍的值修正回可用區間。 / Pulls out-of-range values back into their valid ranges.
    pub fn sanitize(&mut self) {
        self.font_size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if !self.line_height.is_finite() {
            self.line_height = default_line_height();
        }
        self.line_height = self.line_height.clamp(MIN_LINE_HEIGHT, MAX_LINE_HEIGHT);
        if self.tab_size == 0 {
            self.tab_size = default_tab_size();
        }
        self.tab_size = self.tab_size.min(MAX_TAB_SIZE);
    }

    /// 套用部分更新；未指定的欄位保持不變。 / Applies a partial update, leaving unspecified fields untouched.
    pub fn apply(&mut self, patch: &EditorConfigPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
        if let Some(height) = patch.line_height {
            self.line_height = height;
        }
        if let Some(tab) = patch.tab_size {
            self.tab_size = tab;
        }
        if let Some(wrap) = patch.word_wrap {
            self.word_wrap = wrap;
        }
        if let Some(numbers) = patch.line_numbers {
            self.line_numbers = numbers;
        }
        if let Some(minimap) = patch.minimap {
            self.minimap = minimap;
        }
        if let Some(typewriter) = patch.typewriter_mode {
            self.typewriter_mode = Some(typewriter);
        }
        self.sanitize();
    }
}

/// `EditorConfig` 的部分更新。 / Partial update for an `EditorConfig`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorConfigPatch {
    pub theme: Option<Theme>,
    pub font_size: Option<u32>,
    pub line_height: Option<f32>,
    pub tab_size: Option<u32>,
    pub word_wrap: Option<bool>,
    pub line_numbers: Option<bool>,
    pub minimap: Option<bool>,
    pub typewriter_mode: Option<bool>,
}
