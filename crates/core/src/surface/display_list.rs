use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::traits::Surface;
use super::{Point, Rect, Stroke, TextStyle};

/// Average glyph advance as a fraction of the font size, used when no
/// real font metrics are available.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// One recorded drawing operation.
///
/// The core generates these; the frontend just replays them onto its canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
    },
    StrokeLine {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    StrokeRect {
        rect: Rect,
        stroke: Stroke,
    },
    FillRect {
        rect: Rect,
        color: String,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: String,
    },
    FillPolygon {
        points: Vec<Point>,
        color: String,
    },
    FillText {
        text: String,
        at: Point,
        style: TextStyle,
    },
}

/// A `Surface` that records commands instead of painting pixels.
///
/// `clear` drops everything recorded so far, so after a render the list
/// holds exactly one frame: a `Clear` followed by that frame's shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands other than the leading `Clear`.
    pub fn shapes(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|c| !matches!(c, DrawCommand::Clear { .. }))
    }

    /// Serialize the current frame for a frontend to replay.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(&self.commands)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize draw commands: {e}")))
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, width: f64, height: f64) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear { width, height });
    }

    fn stroke_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        self.commands.push(DrawCommand::StrokeLine {
            from,
            to,
            stroke: stroke.clone(),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            stroke: stroke.clone(),
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color: color.to_string(),
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn fill_polygon(&mut self, points: &[Point], color: &str) {
        self.commands.push(DrawCommand::FillPolygon {
            points: points.to_vec(),
            color: color.to_string(),
        });
    }

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            at,
            style: style.clone(),
        });
    }

    fn measure_text(&self, text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * GLYPH_WIDTH_RATIO
    }
}
