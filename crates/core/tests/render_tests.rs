// ═══════════════════════════════════════════════════════════════════
// Render Tests — percent mapping, shapes, visibility, sessions
// ═══════════════════════════════════════════════════════════════════

use std::io::Cursor;

use market_lens_core::errors::CoreError;
use market_lens_core::models::annotation::{
    AnnotationKind, AnnotationSet, AnnotationVisibility, ImageSize, RawAnnotation,
};
use market_lens_core::services::render_service::RenderService;
use market_lens_core::services::render_session::RenderSession;
use market_lens_core::surface::{DisplayList, DrawCommand, Point, Rect, Surface, TextAlign};

// ═══════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════

fn size(w: u32, h: u32) -> ImageSize {
    ImageSize::new(w, h).unwrap()
}

fn set(raw: Vec<RawAnnotation>) -> AnnotationSet {
    AnnotationSet::from_raw(&raw)
}

fn render(raw: Vec<RawAnnotation>, w: u32, h: u32) -> DisplayList {
    let mut list = DisplayList::new();
    let annotations = set(raw);
    RenderService::new().render(
        &mut list,
        annotations.annotations(),
        &AnnotationVisibility::default(),
        size(w, h),
    );
    list
}

fn shapes(list: &DisplayList) -> Vec<DrawCommand> {
    list.shapes().cloned().collect()
}

fn close(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(w, h));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Counts calls instead of recording them.
#[derive(Default)]
struct CountingSurface {
    clears: usize,
    lines: usize,
    texts: usize,
}

impl Surface for CountingSurface {
    fn clear(&mut self, _w: f64, _h: f64) {
        self.clears += 1;
    }
    fn stroke_line(&mut self, _from: Point, _to: Point, _stroke: &market_lens_core::surface::Stroke) {
        self.lines += 1;
    }
    fn stroke_rect(&mut self, _rect: Rect, _stroke: &market_lens_core::surface::Stroke) {}
    fn fill_rect(&mut self, _rect: Rect, _color: &str) {}
    fn fill_circle(&mut self, _center: Point, _radius: f64, _color: &str) {}
    fn fill_polygon(&mut self, _points: &[Point], _color: &str) {}
    fn fill_text(&mut self, _text: &str, _at: Point, _style: &market_lens_core::surface::TextStyle) {
        self.texts += 1;
    }
    fn measure_text(&self, text: &str, size: f64) -> f64 {
        text.len() as f64 * size / 2.0
    }
}

// ═══════════════════════════════════════════════════════════════════
// Clearing & empty input
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_empty_annotations_only_clear() {
    let list = render(vec![], 800, 600);
    assert_eq!(
        list.commands(),
        &[DrawCommand::Clear {
            width: 800.0,
            height: 600.0
        }]
    );
}

#[test]
fn test_render_replaces_previous_frame() {
    let mut list = DisplayList::new();
    let service = RenderService::new();
    let first = set(vec![RawAnnotation::new("support", vec![0.0, 10.0, 100.0, 10.0])]);
    service.render(&mut list, first.annotations(), &AnnotationVisibility::default(), size(100, 100));
    assert_eq!(list.len(), 2);

    service.render(&mut list, &[], &AnnotationVisibility::default(), size(100, 100));
    assert_eq!(list.len(), 1);
}

// ═══════════════════════════════════════════════════════════════════
// Shapes
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_support_maps_percent_to_pixels() {
    let list = render(
        vec![RawAnnotation::new("support", vec![10.0, 50.0, 90.0, 50.0])],
        1000,
        500,
    );
    let shapes = shapes(&list);
    assert_eq!(shapes.len(), 1);
    match &shapes[0] {
        DrawCommand::StrokeLine { from, to, stroke } => {
            assert!(close(*from, Point::new(100.0, 250.0)));
            assert!(close(*to, Point::new(900.0, 250.0)));
            assert_eq!(stroke.dash, vec![5.0, 3.0]);
            assert_eq!(stroke.width, 3.0);
            assert_eq!(stroke.color, "#5eaad8");
        }
        other => panic!("expected a line, got {other:?}"),
    }
}

#[test]
fn test_level_label_sits_above_left_end() {
    let list = render(
        vec![RawAnnotation::new("resistance", vec![90.0, 20.0, 10.0, 30.0]).with_label("R1")],
        1000,
        500,
    );
    let shapes = shapes(&list);
    assert_eq!(shapes.len(), 2);
    match &shapes[1] {
        DrawCommand::FillText { text, at, style } => {
            assert_eq!(text, "R1");
            assert!(close(*at, Point::new(105.0, 95.0)));
            assert_eq!(style.size, 16.0);
            assert_eq!(style.align, TextAlign::Left);
            assert_eq!(style.color, "#FEB2B2");
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_trendline_is_solid_with_centered_label() {
    let list = render(
        vec![RawAnnotation::new("trendline", vec![0.0, 100.0, 100.0, 0.0]).with_label("Up")],
        200,
        100,
    );
    let shapes = shapes(&list);
    match &shapes[0] {
        DrawCommand::StrokeLine { stroke, .. } => {
            assert!(!stroke.is_dashed());
            assert_eq!(stroke.width, 2.0);
        }
        other => panic!("expected a line, got {other:?}"),
    }
    match &shapes[1] {
        DrawCommand::FillText { at, style, .. } => {
            assert!(close(*at, Point::new(100.0, 45.0)));
            assert_eq!(style.align, TextAlign::Center);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_pattern_draws_dashed_rectangle() {
    let list = render(
        vec![RawAnnotation::new("pattern", vec![10.0, 20.0, 30.0, 40.0]).with_label("Flag")],
        1000,
        500,
    );
    let shapes = shapes(&list);
    match &shapes[0] {
        DrawCommand::StrokeRect { rect, stroke } => {
            assert_eq!(*rect, Rect::new(100.0, 100.0, 300.0, 200.0));
            assert_eq!(stroke.dash, vec![2.0, 2.0]);
            assert_eq!(stroke.color, "#FBD38D");
        }
        other => panic!("expected a rectangle, got {other:?}"),
    }
    match &shapes[1] {
        DrawCommand::FillText { at, .. } => assert!(close(*at, Point::new(250.0, 95.0))),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_entry_arrow_points_up_below_marker() {
    let list = render(
        vec![RawAnnotation::new("entry", vec![50.0, 50.0]).with_label("Buy")],
        200,
        100,
    );
    let shapes = shapes(&list);
    assert_eq!(shapes.len(), 3);
    match &shapes[0] {
        DrawCommand::FillCircle { center, radius, color } => {
            assert!(close(*center, Point::new(100.0, 50.0)));
            assert_eq!(*radius, 6.0);
            assert_eq!(color, "#58d885");
        }
        other => panic!("expected a circle, got {other:?}"),
    }
    match &shapes[1] {
        DrawCommand::FillPolygon { points, .. } => {
            assert_eq!(points.len(), 3);
            assert!(close(points[0], Point::new(100.0, 55.0)));
            assert!(close(points[1], Point::new(92.0, 65.0)));
            assert!(close(points[2], Point::new(108.0, 65.0)));
        }
        other => panic!("expected a triangle, got {other:?}"),
    }
    match &shapes[2] {
        DrawCommand::FillText { at, .. } => assert!(close(*at, Point::new(100.0, 40.0))),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_exit_arrow_points_down_above_marker() {
    let list = render(
        vec![RawAnnotation::new("exit", vec![50.0, 50.0]).with_label("Sell")],
        200,
        100,
    );
    let shapes = shapes(&list);
    match &shapes[1] {
        DrawCommand::FillPolygon { points, .. } => {
            assert!(close(points[0], Point::new(100.0, 45.0)));
            assert!(close(points[1], Point::new(92.0, 35.0)));
            assert!(close(points[2], Point::new(108.0, 35.0)));
        }
        other => panic!("expected a triangle, got {other:?}"),
    }
    match &shapes[2] {
        DrawCommand::FillText { at, .. } => assert!(close(*at, Point::new(100.0, 30.0))),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_signal_label_gets_backing_box() {
    let list = render(
        vec![RawAnnotation::new("signal", vec![50.0, 50.0]).with_label("Buy")],
        200,
        100,
    );
    let shapes = shapes(&list);
    assert_eq!(shapes.len(), 3);
    match &shapes[0] {
        DrawCommand::FillText { text, at, style } => {
            assert_eq!(text, "\u{26A1}");
            assert!(close(*at, Point::new(100.0, 50.0)));
            assert_eq!(style.size, 20.0);
        }
        other => panic!("expected the glyph, got {other:?}"),
    }
    match &shapes[1] {
        DrawCommand::FillRect { rect, color } => {
            // "Buy" at 14px measures 3 * 14 * 0.6 = 25.2, plus 10 padding
            assert!((rect.width - 35.2).abs() < 1e-9);
            assert_eq!(rect.height, 20.0);
            assert!((rect.x + rect.width / 2.0 - 100.0).abs() < 1e-9);
            assert!((rect.y - 15.0).abs() < 1e-9);
            assert_eq!(color, "rgba(255, 255, 255, 0.7)");
        }
        other => panic!("expected the label box, got {other:?}"),
    }
    match &shapes[2] {
        DrawCommand::FillText { text, at, .. } => {
            assert_eq!(text, "Buy");
            assert!(close(*at, Point::new(100.0, 25.0)));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn test_unlabelled_signal_draws_only_glyph() {
    let list = render(vec![RawAnnotation::new("signal", vec![10.0, 10.0])], 100, 100);
    assert_eq!(shapes(&list).len(), 1);
}

#[test]
fn test_empty_labels_draw_no_text() {
    let list = render(
        vec![
            RawAnnotation::new("support", vec![0.0, 50.0, 100.0, 50.0]),
            RawAnnotation::new("pattern", vec![0.0, 0.0, 10.0, 10.0]).with_label(""),
        ],
        100,
        100,
    );
    assert!(shapes(&list)
        .iter()
        .all(|c| !matches!(c, DrawCommand::FillText { .. })));
}

#[test]
fn test_custom_color_overrides_default() {
    let list = render(
        vec![RawAnnotation::new("support", vec![0.0, 50.0, 100.0, 50.0]).with_color("#123456")],
        100,
        100,
    );
    match &shapes(&list)[0] {
        DrawCommand::StrokeLine { stroke, .. } => assert_eq!(stroke.color, "#123456"),
        other => panic!("expected a line, got {other:?}"),
    }
}

#[test]
fn test_type_matching_ignores_case() {
    let list = render(
        vec![RawAnnotation::new("SUPPORT", vec![0.0, 50.0, 100.0, 50.0])],
        100,
        100,
    );
    assert_eq!(shapes(&list).len(), 1);
}

// ═══════════════════════════════════════════════════════════════════
// Rejected annotations
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_unknown_type_is_never_drawn() {
    let annotations = set(vec![
        RawAnnotation::new("fibonacci", vec![10.0, 10.0, 20.0, 20.0]),
        RawAnnotation::new("entry", vec![50.0, 50.0]),
    ]);
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations.rejected().len(), 1);

    let mut list = DisplayList::new();
    let drawn = RenderService::new().render(
        &mut list,
        annotations.annotations(),
        &AnnotationVisibility::default(),
        size(100, 100),
    );
    assert_eq!(drawn, 1);
}

#[test]
fn test_short_coordinates_are_skipped() {
    let list = render(
        vec![
            RawAnnotation::new("support", vec![10.0, 50.0, 90.0]),
            RawAnnotation::new("entry", vec![50.0]),
        ],
        100,
        100,
    );
    assert!(shapes(&list).is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// Visibility & sessions
// ═══════════════════════════════════════════════════════════════════

fn mixed() -> AnnotationSet {
    set(vec![
        RawAnnotation::new("support", vec![10.0, 50.0, 90.0, 50.0]).with_label("S"),
        RawAnnotation::new("entry", vec![30.0, 60.0]).with_label("In"),
        RawAnnotation::new("signal", vec![70.0, 20.0]).with_label("!"),
    ])
}

#[test]
fn test_session_draws_on_creation() {
    let session = RenderSession::new(DisplayList::new(), size(1000, 500), mixed());
    // line + text, circle + triangle + text, glyph + box + text
    assert_eq!(session.surface().shapes().count(), 8);
}

#[test]
fn test_toggle_hides_one_kind() {
    let mut session = RenderSession::new(DisplayList::new(), size(1000, 500), mixed());
    assert!(!session.toggle(AnnotationKind::Support));
    assert!(!session.is_visible(AnnotationKind::Support));
    assert!(session
        .surface()
        .shapes()
        .all(|c| !matches!(c, DrawCommand::StrokeLine { .. })));
    assert_eq!(session.surface().shapes().count(), 6);
}

#[test]
fn test_toggle_off_and_on_restores_frame() {
    let mut session = RenderSession::new(DisplayList::new(), size(1000, 500), mixed());
    let original = session.surface().clone();

    session.toggle(AnnotationKind::Entry);
    assert_ne!(session.surface(), &original);
    assert!(session.toggle(AnnotationKind::Entry));
    assert_eq!(session.surface(), &original);
}

#[test]
fn test_set_visible_only_redraws_on_change() {
    let mut session = RenderSession::new(CountingSurface::default(), size(100, 100), mixed());
    assert_eq!(session.surface().clears, 1);

    session.set_visible(AnnotationKind::Support, true);
    assert_eq!(session.surface().clears, 1);

    session.set_visible(AnnotationKind::Support, false);
    assert_eq!(session.surface().clears, 2);
    assert_eq!(session.visibility().hidden(), vec![AnnotationKind::Support]);
}

#[test]
fn test_hidden_kind_without_annotations_still_redraws() {
    let mut session = RenderSession::new(CountingSurface::default(), size(100, 100), mixed());
    session.toggle(AnnotationKind::Pattern);
    let surface = session.into_surface();
    assert_eq!(surface.clears, 2);
    assert_eq!(surface.lines, 2);
}

#[test]
fn test_session_counts_by_kind() {
    let session = RenderSession::new(DisplayList::new(), size(100, 100), mixed());
    let counts = session.counts();
    assert_eq!(counts[&AnnotationKind::Support], 1);
    assert_eq!(counts[&AnnotationKind::Entry], 1);
    assert_eq!(counts[&AnnotationKind::Signal], 1);
    assert_eq!(counts[&AnnotationKind::Trendline], 0);
    assert_eq!(counts.len(), 7);
}

#[test]
fn test_open_reads_image_size() {
    let session = RenderSession::open(DisplayList::new(), &png_bytes(40, 20), mixed()).unwrap();
    assert_eq!(session.size(), size(40, 20));
    assert_eq!(
        session.surface().commands()[0],
        DrawCommand::Clear {
            width: 40.0,
            height: 20.0
        }
    );
}

#[test]
fn test_open_rejects_unreadable_image() {
    let result = RenderSession::open(DisplayList::new(), b"definitely not an image", mixed());
    assert!(matches!(result, Err(CoreError::ImageDecode(_))));

    let result = RenderSession::open(DisplayList::new(), &[], mixed());
    assert!(matches!(result, Err(CoreError::ImageDecode(_))));
}

#[test]
fn test_zero_sized_image_is_rejected() {
    assert!(matches!(ImageSize::new(0, 10), Err(CoreError::ImageDecode(_))));
    assert!(matches!(ImageSize::new(10, 0), Err(CoreError::ImageDecode(_))));
}

// ═══════════════════════════════════════════════════════════════════
// Display list output
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_display_list_serializes_with_op_tags() {
    let list = render(
        vec![RawAnnotation::new("support", vec![10.0, 50.0, 90.0, 50.0])],
        1000,
        500,
    );
    let json = list.to_json().unwrap();
    assert!(json.contains("\"op\":\"clear\""));
    assert!(json.contains("\"op\":\"stroke_line\""));

    let back: Vec<DrawCommand> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, list.into_commands());
}
