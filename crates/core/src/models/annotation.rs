use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::errors::CoreError;
use crate::surface::Point;

/// The kinds of overlay the chart-annotation backend can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Support,
    Resistance,
    Trendline,
    Pattern,
    Entry,
    Exit,
    Signal,
}

impl AnnotationKind {
    /// Every recognized kind, in toolbar order.
    pub const ALL: [AnnotationKind; 7] = [
        AnnotationKind::Support,
        AnnotationKind::Resistance,
        AnnotationKind::Trendline,
        AnnotationKind::Pattern,
        AnnotationKind::Entry,
        AnnotationKind::Exit,
        AnnotationKind::Signal,
    ];

    /// Match a wire `type` string, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "support" => Some(AnnotationKind::Support),
            "resistance" => Some(AnnotationKind::Resistance),
            "trendline" => Some(AnnotationKind::Trendline),
            "pattern" => Some(AnnotationKind::Pattern),
            "entry" => Some(AnnotationKind::Entry),
            "exit" => Some(AnnotationKind::Exit),
            "signal" => Some(AnnotationKind::Signal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationKind::Support => "support",
            AnnotationKind::Resistance => "resistance",
            AnnotationKind::Trendline => "trendline",
            AnnotationKind::Pattern => "pattern",
            AnnotationKind::Entry => "entry",
            AnnotationKind::Exit => "exit",
            AnnotationKind::Signal => "signal",
        }
    }

    /// Number of percentage coordinates this kind needs.
    pub fn arity(self) -> usize {
        match self {
            AnnotationKind::Support
            | AnnotationKind::Resistance
            | AnnotationKind::Trendline
            | AnnotationKind::Pattern => 4,
            AnnotationKind::Entry | AnnotationKind::Exit | AnnotationKind::Signal => 2,
        }
    }

    /// Color used when the annotation doesn't bring its own.
    pub fn default_color(self) -> &'static str {
        match self {
            AnnotationKind::Support => "#5eaad8",
            AnnotationKind::Resistance => "#FEB2B2",
            AnnotationKind::Trendline => "#718096",
            AnnotationKind::Pattern => "#FBD38D",
            AnnotationKind::Entry => "#58d885",
            AnnotationKind::Exit => "#FEB2B2",
            AnnotationKind::Signal => "#5D5CDE",
        }
    }

    fn index(self) -> usize {
        match self {
            AnnotationKind::Support => 0,
            AnnotationKind::Resistance => 1,
            AnnotationKind::Trendline => 2,
            AnnotationKind::Pattern => 3,
            AnnotationKind::Entry => 4,
            AnnotationKind::Exit => 5,
            AnnotationKind::Signal => 6,
        }
    }
}

impl std::fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An annotation exactly as the backend sends it:
/// `{"type": "...", "coordinates": [...], "label": "...", "color": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnnotation {
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Percentages of the image width/height; meaning depends on `kind`
    #[serde(default)]
    pub coordinates: Vec<f64>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub color: Option<String>,
}

impl RawAnnotation {
    pub fn new(kind: impl Into<String>, coordinates: Vec<f64>) -> Self {
        Self {
            kind: kind.into(),
            coordinates,
            label: None,
            color: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Two endpoints, in percent of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A box given by its top-left corner and extent, in percent of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A single position, in percent of the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub x: f64,
    pub y: f64,
}

/// Geometry plus the optional presentation fields every annotation carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotated<G> {
    pub geometry: G,
    pub label: Option<String>,
    pub color: Option<String>,
}

/// A validated annotation. Each variant carries exactly the geometry its
/// kind needs, so drawing code never inspects coordinate counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Annotation {
    Support(Annotated<Segment>),
    Resistance(Annotated<Segment>),
    Trendline(Annotated<Segment>),
    Pattern(Annotated<Region>),
    Entry(Annotated<Marker>),
    Exit(Annotated<Marker>),
    Signal(Annotated<Marker>),
}

/// Why a raw annotation was left out of a set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationRejection {
    #[error("unrecognized annotation type '{0}'")]
    UnknownType(String),

    #[error("{kind} needs {expected} coordinates, got {found}")]
    MissingCoordinates {
        kind: AnnotationKind,
        expected: usize,
        found: usize,
    },

    #[error("malformed annotation: {0}")]
    Malformed(String),
}

impl Annotation {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Support(_) => AnnotationKind::Support,
            Annotation::Resistance(_) => AnnotationKind::Resistance,
            Annotation::Trendline(_) => AnnotationKind::Trendline,
            Annotation::Pattern(_) => AnnotationKind::Pattern,
            Annotation::Entry(_) => AnnotationKind::Entry,
            Annotation::Exit(_) => AnnotationKind::Exit,
            Annotation::Signal(_) => AnnotationKind::Signal,
        }
    }

    /// Label text, empty when the backend sent none.
    pub fn label(&self) -> &str {
        let label = match self {
            Annotation::Support(a) | Annotation::Resistance(a) | Annotation::Trendline(a) => {
                &a.label
            }
            Annotation::Pattern(a) => &a.label,
            Annotation::Entry(a) | Annotation::Exit(a) | Annotation::Signal(a) => &a.label,
        };
        label.as_deref().unwrap_or("")
    }

    /// The annotation's own color, or its kind's default.
    pub fn color(&self) -> &str {
        let color = match self {
            Annotation::Support(a) | Annotation::Resistance(a) | Annotation::Trendline(a) => {
                &a.color
            }
            Annotation::Pattern(a) => &a.color,
            Annotation::Entry(a) | Annotation::Exit(a) | Annotation::Signal(a) => &a.color,
        };
        color
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.kind().default_color())
    }

    /// Validate a raw annotation. Extra coordinates past the kind's arity
    /// are ignored.
    pub fn from_raw(raw: &RawAnnotation) -> Result<Annotation, AnnotationRejection> {
        let kind = AnnotationKind::parse(&raw.kind)
            .ok_or_else(|| AnnotationRejection::UnknownType(raw.kind.clone()))?;

        let c = &raw.coordinates;
        if c.len() < kind.arity() {
            return Err(AnnotationRejection::MissingCoordinates {
                kind,
                expected: kind.arity(),
                found: c.len(),
            });
        }
        if c[..kind.arity()].iter().any(|v| !v.is_finite()) {
            return Err(AnnotationRejection::Malformed(format!(
                "{kind} has non-finite coordinates"
            )));
        }

        let label = raw.label.clone();
        let color = raw.color.clone();
        let segment = || Annotated {
            geometry: Segment {
                x1: c[0],
                y1: c[1],
                x2: c[2],
                y2: c[3],
            },
            label: label.clone(),
            color: color.clone(),
        };
        let marker = || Annotated {
            geometry: Marker { x: c[0], y: c[1] },
            label: label.clone(),
            color: color.clone(),
        };

        Ok(match kind {
            AnnotationKind::Support => Annotation::Support(segment()),
            AnnotationKind::Resistance => Annotation::Resistance(segment()),
            AnnotationKind::Trendline => Annotation::Trendline(segment()),
            AnnotationKind::Pattern => Annotation::Pattern(Annotated {
                geometry: Region {
                    x: c[0],
                    y: c[1],
                    width: c[2],
                    height: c[3],
                },
                label: label.clone(),
                color: color.clone(),
            }),
            AnnotationKind::Entry => Annotation::Entry(marker()),
            AnnotationKind::Exit => Annotation::Exit(marker()),
            AnnotationKind::Signal => Annotation::Signal(marker()),
        })
    }
}

/// The immutable annotation collection of one rendering session.
///
/// Built once from the backend payload; rejected entries are logged and
/// counted but never reach a surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    #[serde(skip)]
    rejected: Vec<AnnotationRejection>,
}

impl AnnotationSet {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self {
            annotations,
            rejected: Vec::new(),
        }
    }

    /// Validate every raw annotation, keeping the good ones in order.
    pub fn from_raw(raw: &[RawAnnotation]) -> Self {
        let mut set = Self::default();
        for (index, item) in raw.iter().enumerate() {
            match Annotation::from_raw(item) {
                Ok(annotation) => set.annotations.push(annotation),
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping annotation");
                    set.rejected.push(reason);
                }
            }
        }
        set
    }

    /// Parse the backend's JSON annotation list.
    ///
    /// `null` counts as an empty list. Entries that are not objects of the
    /// expected shape are rejected individually; only a top level that is
    /// neither a list nor null is an error.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        let items = match value {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items,
            other => {
                return Err(CoreError::Deserialization(format!(
                    "annotations must be a list, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let mut set = Self::default();
        for (index, item) in items.into_iter().enumerate() {
            let parsed = serde_json::from_value::<RawAnnotation>(item)
                .map_err(|e| AnnotationRejection::Malformed(e.to_string()))
                .and_then(|raw| Annotation::from_raw(&raw));
            match parsed {
                Ok(annotation) => set.annotations.push(annotation),
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping annotation");
                    set.rejected.push(reason);
                }
            }
        }
        Ok(set)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn rejected(&self) -> &[AnnotationRejection] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Number of accepted annotations per kind; every kind is present.
    pub fn counts(&self) -> HashMap<AnnotationKind, usize> {
        let mut counts: HashMap<AnnotationKind, usize> =
            AnnotationKind::ALL.iter().map(|k| (*k, 0)).collect();
        for annotation in &self.annotations {
            *counts.entry(annotation.kind()).or_insert(0) += 1;
        }
        counts
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Per-kind show/hide flags. All kinds start visible.
///
/// Owned by whoever drives rendering; a fresh value goes with every new
/// annotation collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationVisibility {
    flags: [bool; 7],
}

impl Default for AnnotationVisibility {
    fn default() -> Self {
        Self { flags: [true; 7] }
    }
}

impl AnnotationVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, kind: AnnotationKind) -> bool {
        self.flags[kind.index()]
    }

    pub fn set(&mut self, kind: AnnotationKind, visible: bool) {
        self.flags[kind.index()] = visible;
    }

    /// Flip one kind and return its new state.
    pub fn toggle(&mut self, kind: AnnotationKind) -> bool {
        let flag = &mut self.flags[kind.index()];
        *flag = !*flag;
        *flag
    }

    pub fn show_all(&mut self) {
        self.flags = [true; 7];
    }

    /// Kinds currently hidden, in toolbar order.
    pub fn hidden(&self) -> Vec<AnnotationKind> {
        AnnotationKind::ALL
            .into_iter()
            .filter(|k| !self.is_visible(*k))
            .collect()
    }
}

/// Natural pixel size of a decoded chart image. Both sides are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    width: u32,
    height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Result<Self, CoreError> {
        if width == 0 || height == 0 {
            return Err(CoreError::ImageDecode(format!(
                "image has no drawable area ({width}x{height})"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Horizontal percent → pixels.
    pub fn x(&self, percent: f64) -> f64 {
        percent / 100.0 * f64::from(self.width)
    }

    /// Vertical percent → pixels.
    pub fn y(&self, percent: f64) -> f64 {
        percent / 100.0 * f64::from(self.height)
    }

    pub fn point(&self, x_percent: f64, y_percent: f64) -> Point {
        Point::new(self.x(x_percent), self.y(y_percent))
    }
}
