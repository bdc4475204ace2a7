/**
 * Whiteboard Canvas Schema
 *
 * This module defines the typed canvas state for a room's whiteboard.
 * The canvas holds three ordered element sequences (strokes, shapes,
 * text) plus background color and canvas size.
 *
 * # Validation
 *
 * Elements are distinct typed structs rather than free-form JSON maps.
 * Deserialization is strict (`deny_unknown_fields`), so malformed client
 * payloads are rejected at the boundary instead of being stored verbatim.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default canvas background color
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 800;

/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 600;

/// A 2D point on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// A freehand pen stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Stroke {
    /// Element id, assigned by the client
    pub id: String,
    /// Ordered polyline points
    pub points: Vec<Point>,
    /// Stroke color (CSS hex string)
    pub color: String,
    /// Stroke width in pixels
    pub width: f64,
    /// User who drew the stroke
    pub created_by: Uuid,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Shape primitive kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
    Arrow,
}

/// A geometric shape element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    /// Top-left corner (or line start)
    pub origin: Point,
    /// Bounding box size (or line end offset)
    pub size: CanvasSize,
    pub color: String,
    /// Fill color, if the shape is filled
    pub fill: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A text element placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextElement {
    pub id: String,
    pub position: Point,
    pub content: String,
    pub font_size: f64,
    pub color: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Complete canvas state for one whiteboard version
///
/// This is the unit of versioning: `replaceState` swaps the entire
/// structure and bumps the session version, and history rows snapshot it
/// whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CanvasState {
    pub strokes: Vec<Stroke>,
    pub shapes: Vec<Shape>,
    pub text_elements: Vec<TextElement>,
    pub background_color: String,
    pub canvas_size: CanvasSize,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::empty()
    }
}

impl CanvasState {
    /// The canonical empty canvas: no elements, white background,
    /// default size. Used for new sessions and for `clear`.
    pub fn empty() -> Self {
        Self {
            strokes: Vec::new(),
            shapes: Vec::new(),
            text_elements: Vec::new(),
            background_color: DEFAULT_BACKGROUND.to_string(),
            canvas_size: CanvasSize::default(),
        }
    }

    /// Total element count across strokes, shapes, and text
    pub fn element_count(&self) -> usize {
        self.strokes.len() + self.shapes.len() + self.text_elements.len()
    }

    /// True if the canvas carries no elements
    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stroke(user: Uuid) -> Stroke {
        Stroke {
            id: "stroke_0".to_string(),
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 10.0, y: 5.0 }],
            color: "#000000".to_string(),
            width: 2.0,
            created_by: user,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_canvas_defaults() {
        let canvas = CanvasState::empty();
        assert!(canvas.is_empty());
        assert_eq!(canvas.element_count(), 0);
        assert_eq!(canvas.background_color, DEFAULT_BACKGROUND);
        assert_eq!(canvas.canvas_size.width, DEFAULT_WIDTH);
        assert_eq!(canvas.canvas_size.height, DEFAULT_HEIGHT);
    }

    #[test]
    fn test_element_count_sums_all_sequences() {
        let user = Uuid::new_v4();
        let mut canvas = CanvasState::empty();
        canvas.strokes.push(sample_stroke(user));
        canvas.text_elements.push(TextElement {
            id: "text_0".to_string(),
            position: Point { x: 1.0, y: 2.0 },
            content: "hello".to_string(),
            font_size: 14.0,
            color: "#333333".to_string(),
            created_by: user,
            created_at: Utc::now(),
        });
        assert_eq!(canvas.element_count(), 2);
        assert!(!canvas.is_empty());
    }

    #[test]
    fn test_canvas_round_trips_through_json() {
        let user = Uuid::new_v4();
        let mut canvas = CanvasState::empty();
        canvas.strokes.push(sample_stroke(user));

        let json = serde_json::to_string(&canvas).unwrap();
        let back: CanvasState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, canvas);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        // Free-form blobs must not pass the boundary
        let json = r##"{
            "strokes": [],
            "shapes": [],
            "text_elements": [],
            "background_color": "#ffffff",
            "canvas_size": {"width": 800, "height": 600},
            "arbitrary_extra": {"nested": true}
        }"##;
        assert!(serde_json::from_str::<CanvasState>(json).is_err());
    }

    #[test]
    fn test_missing_required_fields_are_rejected() {
        let json = r#"{"strokes": [], "shapes": []}"#;
        assert!(serde_json::from_str::<CanvasState>(json).is_err());
    }
}
