//! Replay scripts: one JSON input event per line.
//!
//! ```text
//! {"type":"pointer-down","x":100,"y":100}
//! {"type":"pointer-move","x":180,"y":140}
//! {"type":"pointer-up","x":180,"y":140}
//! {"type":"key","key":"z","mods":{"meta":true}}
//! {"type":"wait","ms":1200}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

#[cfg(test)]
#[path = "script_test.rs"]
mod script_test;

use canvas::doc::{FormatMark, ShapeKind};
use canvas::input::{Button, Modifiers, Tool};
use canvas::persist::Settings;
use serde::Deserialize;

/// Tool names accepted by the `tool` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolName {
    Select,
    Draw,
    Text,
    Rectangle,
    Circle,
    Triangle,
    Line,
    Arrow,
}

impl From<ToolName> for Tool {
    fn from(name: ToolName) -> Self {
        match name {
            ToolName::Select => Tool::Select,
            ToolName::Draw => Tool::Draw,
            ToolName::Text => Tool::Text,
            ToolName::Rectangle => Tool::Shape(ShapeKind::Rectangle),
            ToolName::Circle => Tool::Shape(ShapeKind::Circle),
            ToolName::Triangle => Tool::Shape(ShapeKind::Triangle),
            ToolName::Line => Tool::Shape(ShapeKind::Line),
            ToolName::Arrow => Tool::Shape(ShapeKind::Arrow),
        }
    }
}

/// Image half of a scripted clipboard.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipImage {
    pub data_url: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ScriptEvent {
    Viewport {
        width: f64,
        height: f64,
    },
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        mods: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
        #[serde(default)]
        mods: Modifiers,
    },
    PointerUp {
        x: f64,
        y: f64,
        #[serde(default)]
        button: Button,
        #[serde(default)]
        mods: Modifiers,
    },
    DoubleClick {
        x: f64,
        y: f64,
    },
    Wheel {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        #[serde(default)]
        mods: Modifiers,
    },
    GestureStart,
    GestureChange {
        scale: f64,
        #[serde(default)]
        rotation: f64,
    },
    GestureEnd,
    Key {
        key: String,
        #[serde(default)]
        mods: Modifiers,
    },
    Tool {
        tool: ToolName,
    },
    Color {
        color: String,
    },
    StrokeWidth {
        width: f64,
    },
    /// Replace the content of the text item being edited.
    Text {
        content: String,
    },
    EndText,
    Format {
        mark: FormatMark,
    },
    /// Set what the system clipboard holds.
    Clipboard {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        image: Option<ClipImage>,
    },
    Paste,
    /// Accept the paste overlay.
    PasteHere {
        x: f64,
        y: f64,
    },
    Focus {
        focused: bool,
    },
    ToggleOpen,
    DropFile {
        x: f64,
        y: f64,
        path: String,
        name: String,
        #[serde(default)]
        file_type: String,
    },
    DropImage {
        x: f64,
        y: f64,
        data_url: String,
        width: f64,
        height: f64,
    },
    Settings {
        settings: Settings,
    },
    ClearNote,
    ToggleFreeze,
    Wait {
        ms: u64,
    },
}

/// Parse one script line; `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<ScriptEvent>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}
