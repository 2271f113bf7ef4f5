use super::{Point, Rect, Stroke, TextStyle};

/// A drawing target for chart overlays.
///
/// The operations are a small subset of the HTML canvas 2D API, which is
/// what the web frontend ultimately draws with. Native frontends or tests
/// can record or rasterize them instead. Annotation drawing only ever
/// talks to this trait, so adding a frontend means adding one impl.
pub trait Surface {
    /// Erase everything inside `0, 0, width, height`.
    fn clear(&mut self, width: f64, height: f64);

    fn stroke_line(&mut self, from: Point, to: Point, stroke: &Stroke);

    fn stroke_rect(&mut self, rect: Rect, stroke: &Stroke);

    fn fill_rect(&mut self, rect: Rect, color: &str);

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);

    /// Fill the closed polygon through `points`.
    fn fill_polygon(&mut self, points: &[Point], color: &str);

    fn fill_text(&mut self, text: &str, at: Point, style: &TextStyle);

    /// Rendered width of `text` at `size` pixels.
    fn measure_text(&self, text: &str, size: f64) -> f64;
}
