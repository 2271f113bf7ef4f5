use std::io::Cursor;

use crate::errors::CoreError;
use crate::models::annotation::{
    Annotated, Annotation, AnnotationVisibility, ImageSize, Marker, Region, Segment,
};
use crate::surface::{Point, Rect, Stroke, Surface, TextAlign, TextBaseline, TextStyle};

const LEVEL_LINE_WIDTH: f64 = 3.0;
const LEVEL_DASH: (f64, f64) = (5.0, 3.0);
const LEVEL_FONT: f64 = 16.0;

const TREND_LINE_WIDTH: f64 = 2.0;

const PATTERN_LINE_WIDTH: f64 = 2.0;
const PATTERN_DASH: (f64, f64) = (2.0, 2.0);

const LABEL_FONT: f64 = 14.0;
/// Gap between a shape and the baseline of its label.
const LABEL_GAP: f64 = 5.0;

const MARKER_RADIUS: f64 = 6.0;
const MARKER_LABEL_OFFSET: f64 = 10.0;
/// Triangle geometry relative to the marker center: near edge, far edge, half width.
const ARROW_NEAR: f64 = 5.0;
const ARROW_FAR: f64 = 15.0;
const ARROW_HALF_WIDTH: f64 = 8.0;

const SIGNAL_GLYPH: &str = "\u{26A1}";
const SIGNAL_GLYPH_FONT: f64 = 20.0;
const SIGNAL_BOX_HEIGHT: f64 = 20.0;
const SIGNAL_BOX_PADDING: f64 = 10.0;
/// Vertical distance from the glyph center to the label box center.
const SIGNAL_LABEL_RISE: f64 = 25.0;
const SIGNAL_BOX_FILL: &str = "rgba(255, 255, 255, 0.7)";

/// Turns annotation percentages into pixels and draws them on a `Surface`.
///
/// Rendering is always a full redraw: the surface is cleared and every
/// visible annotation is drawn again. Nothing is patched incrementally.
pub struct RenderService;

impl RenderService {
    pub fn new() -> Self {
        Self
    }

    /// Read the natural pixel size of a chart image (PNG, JPEG, GIF, WebP).
    ///
    /// Only the header is parsed. Without a size there is nothing to map
    /// percentages onto, so failure here must stop the render session.
    pub fn decode_image_size(&self, bytes: &[u8]) -> Result<ImageSize, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::ImageDecode("image is empty".into()));
        }
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CoreError::ImageDecode(e.to_string()))?;
        if reader.format().is_none() {
            return Err(CoreError::ImageDecode("unrecognized image format".into()));
        }
        let (width, height) = reader.into_dimensions()?;
        ImageSize::new(width, height)
    }

    /// Clear `surface` and draw every annotation whose kind is visible.
    /// Returns how many annotations were drawn.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        annotations: &[Annotation],
        visibility: &AnnotationVisibility,
        size: ImageSize,
    ) -> usize {
        surface.clear(f64::from(size.width()), f64::from(size.height()));

        let mut drawn = 0;
        for annotation in annotations
            .iter()
            .filter(|a| visibility.is_visible(a.kind()))
        {
            draw_annotation(surface, annotation, size);
            drawn += 1;
        }

        tracing::debug!(
            total = annotations.len(),
            drawn,
            width = size.width(),
            height = size.height(),
            "rendered annotations"
        );
        drawn
    }
}

impl Default for RenderService {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_annotation<S: Surface + ?Sized>(surface: &mut S, annotation: &Annotation, size: ImageSize) {
    let color = annotation.color();
    let label = annotation.label();
    match annotation {
        Annotation::Support(a) | Annotation::Resistance(a) => {
            draw_level(surface, a, size, color, label)
        }
        Annotation::Trendline(a) => draw_trendline(surface, a, size, color, label),
        Annotation::Pattern(a) => draw_pattern(surface, a, size, color, label),
        Annotation::Entry(a) => draw_entry(surface, a, size, color, label),
        Annotation::Exit(a) => draw_exit(surface, a, size, color, label),
        Annotation::Signal(a) => draw_signal(surface, a, size, color, label),
    }
}

fn endpoints(segment: &Segment, size: ImageSize) -> (Point, Point) {
    (
        size.point(segment.x1, segment.y1),
        size.point(segment.x2, segment.y2),
    )
}

fn label_text<S: Surface + ?Sized>(surface: &mut S, label: &str, at: Point, style: TextStyle) {
    if !label.is_empty() {
        surface.fill_text(label, at, &style);
    }
}

/// Support and resistance: dashed line, label left-aligned above the
/// top-left corner of the segment's bounding box.
fn draw_level<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Segment>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let (from, to) = endpoints(&a.geometry, size);
    let stroke = Stroke::dashed(color, LEVEL_LINE_WIDTH, LEVEL_DASH.0, LEVEL_DASH.1);
    surface.stroke_line(from, to, &stroke);

    let anchor = Point::new(
        from.x.min(to.x) + LABEL_GAP,
        from.y.min(to.y) - LABEL_GAP,
    );
    label_text(
        surface,
        label,
        anchor,
        TextStyle::new(color, LEVEL_FONT, TextAlign::Left, TextBaseline::Bottom),
    );
}

fn draw_trendline<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Segment>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let (from, to) = endpoints(&a.geometry, size);
    surface.stroke_line(from, to, &Stroke::solid(color, TREND_LINE_WIDTH));

    let anchor = from.midpoint(to).offset(0.0, -LABEL_GAP);
    label_text(
        surface,
        label,
        anchor,
        TextStyle::new(color, LABEL_FONT, TextAlign::Center, TextBaseline::Bottom),
    );
}

fn draw_pattern<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Region>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let r = &a.geometry;
    let rect = Rect::new(size.x(r.x), size.y(r.y), size.x(r.width), size.y(r.height));
    let stroke = Stroke::dashed(color, PATTERN_LINE_WIDTH, PATTERN_DASH.0, PATTERN_DASH.1);
    surface.stroke_rect(rect, &stroke);

    let anchor = Point::new(rect.x + rect.width / 2.0, rect.y - LABEL_GAP);
    label_text(
        surface,
        label,
        anchor,
        TextStyle::new(color, LABEL_FONT, TextAlign::Center, TextBaseline::Bottom),
    );
}

/// Entry: dot with an upward arrow beneath it.
fn draw_entry<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Marker>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let center = size.point(a.geometry.x, a.geometry.y);
    surface.fill_circle(center, MARKER_RADIUS, color);
    surface.fill_polygon(
        &[
            center.offset(0.0, ARROW_NEAR),
            center.offset(-ARROW_HALF_WIDTH, ARROW_FAR),
            center.offset(ARROW_HALF_WIDTH, ARROW_FAR),
        ],
        color,
    );
    label_text(
        surface,
        label,
        center.offset(0.0, -MARKER_LABEL_OFFSET),
        TextStyle::new(color, LABEL_FONT, TextAlign::Center, TextBaseline::Bottom),
    );
}

/// Exit: dot with a downward arrow above it; the label sits over the arrow.
fn draw_exit<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Marker>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let center = size.point(a.geometry.x, a.geometry.y);
    surface.fill_circle(center, MARKER_RADIUS, color);
    surface.fill_polygon(
        &[
            center.offset(0.0, -ARROW_NEAR),
            center.offset(-ARROW_HALF_WIDTH, -ARROW_FAR),
            center.offset(ARROW_HALF_WIDTH, -ARROW_FAR),
        ],
        color,
    );
    label_text(
        surface,
        label,
        center.offset(0.0, -(ARROW_FAR + LABEL_GAP)),
        TextStyle::new(color, LABEL_FONT, TextAlign::Center, TextBaseline::Bottom),
    );
}

/// Signal: lightning glyph with the label on a translucent box above it.
fn draw_signal<S: Surface + ?Sized>(
    surface: &mut S,
    a: &Annotated<Marker>,
    size: ImageSize,
    color: &str,
    label: &str,
) {
    let center = size.point(a.geometry.x, a.geometry.y);
    surface.fill_text(
        SIGNAL_GLYPH,
        center,
        &TextStyle::new(color, SIGNAL_GLYPH_FONT, TextAlign::Center, TextBaseline::Middle),
    );

    if label.is_empty() {
        return;
    }
    let label_center = center.offset(0.0, -SIGNAL_LABEL_RISE);
    let box_width = surface.measure_text(label, LABEL_FONT) + SIGNAL_BOX_PADDING;
    surface.fill_rect(
        Rect::centered(label_center, box_width, SIGNAL_BOX_HEIGHT),
        SIGNAL_BOX_FILL,
    );
    surface.fill_text(
        label,
        label_center,
        &TextStyle::new(color, LABEL_FONT, TextAlign::Center, TextBaseline::Middle),
    );
}
