// THEORY:
// The `shape` module is the geometry layer shared by both analysis branches. Its
// input is a binary mask, its output is a list of `Shape`s: the outer boundaries
// of the connected foreground regions that are not nested inside another region.
//
// Key architectural principles:
// 1.  **External boundaries only**: A region with a hole is still one shape; a region
//     inside that hole is ignored. Callers reason about "things in the scene", not
//     about the topology of the mask.
// 2.  **Stateless data containers**: Like a blob snapshot, a `Shape` exists for one
//     frame only and has no memory of previous frames.
// 3.  **Summaries on demand**: Area, bounding rectangle and minimal enclosing circle
//     are computed from the boundary points when asked for. Order of shapes follows
//     discovery order of the contour tracer and carries no spatial meaning.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

/// A pixel coordinate on a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned rectangle in pixel units. `width` and `height` count pixels, so a
/// single pixel has size 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Last column covered by the rectangle.
    pub fn right(&self) -> u32 {
        self.x + self.width.saturating_sub(1)
    }

    /// Last row covered by the rectangle.
    pub fn bottom(&self) -> u32 {
        self.y + self.height.saturating_sub(1)
    }
}

/// Smallest circle containing a shape, in sub-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: (f32, f32),
    pub radius: f32,
}

/// The outer boundary of one connected foreground region.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Boundary pixels in tracing order.
    pub points: Vec<Point>,
}

impl Shape {
    /// Area enclosed by the boundary polygon (shoelace formula over pixel centers).
    ///
    /// A region one pixel wide has zero area, a filled NxN square has (N-1)^2.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area = 0.0f64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        }
        (twice_area * 0.5).abs()
    }

    pub fn bounding_rect(&self) -> Rect {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        if self.points.is_empty() {
            return Rect { x: 0, y: 0, width: 0, height: 0 };
        }
        Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    pub fn min_enclosing_circle(&self) -> Circle {
        let points: Vec<(f64, f64)> = self
            .points
            .iter()
            .map(|p| (p.x as f64, p.y as f64))
            .collect();
        welzl::enclosing_circle(&points)
    }
}

/// Traces the mask and returns the external boundary of every foreground region.
///
/// Everything outside the mask counts as background, so regions touching the
/// frame edge are traced like any other.
pub fn find_external_shapes(mask: &GrayImage) -> Vec<Shape> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(&with_border(mask));
    (0..contours.len())
        .filter(|&i| is_external(&contours, i))
        .map(|i| Shape {
            points: contours[i]
                .points
                .iter()
                .map(|p| Point { x: p.x - 1, y: p.y - 1 })
                .collect(),
        })
        .collect()
}

/// Copy of `mask` inside a one pixel background frame. The tracer only opens an
/// outer border to the right of a background pixel, so column 0 needs one.
fn with_border(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// An outer border is external when no hole encloses it anywhere up its parent chain.
fn is_external(contours: &[Contour<u32>], index: usize) -> bool {
    if !matches!(contours[index].border_type, BorderType::Outer) {
        return false;
    }
    let mut parent = contours[index].parent;
    while let Some(i) = parent {
        if matches!(contours[i].border_type, BorderType::Hole) {
            return false;
        }
        parent = contours[i].parent;
    }
    true
}

mod welzl {
    use super::Circle;

    const EPSILON: f64 = 1e-7;

    /// Iterative Welzl: expected linear time once the input order is scrambled.
    pub fn enclosing_circle(points: &[(f64, f64)]) -> Circle {
        let n = points.len();
        if n == 0 {
            return Circle { center: (0.0, 0.0), radius: 0.0 };
        }

        // Contours arrive in boundary order, which is the worst case for the
        // incremental algorithm. Visit them with a stride coprime to `n`.
        let stride = coprime_stride(n);
        let ordered: Vec<(f64, f64)> = (0..n).map(|k| points[(k * stride) % n]).collect();

        let mut circle = (ordered[0], 0.0f64);
        for i in 1..n {
            if contains(circle, ordered[i]) {
                continue;
            }
            circle = (ordered[i], 0.0);
            for j in 0..i {
                if contains(circle, ordered[j]) {
                    continue;
                }
                circle = from_two(ordered[i], ordered[j]);
                for k in 0..j {
                    if !contains(circle, ordered[k]) {
                        circle = from_three(ordered[i], ordered[j], ordered[k]);
                    }
                }
            }
        }

        let ((cx, cy), radius) = circle;
        Circle {
            center: (cx as f32, cy as f32),
            radius: radius as f32,
        }
    }

    fn coprime_stride(n: usize) -> usize {
        let mut stride = ((n as f64) * 0.618).floor().max(1.0) as usize;
        while stride > 1 && gcd(stride, n) != 1 {
            stride -= 1;
        }
        stride
    }

    fn gcd(mut a: usize, mut b: usize) -> usize {
        while b != 0 {
            (a, b) = (b, a % b);
        }
        a
    }

    fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    fn contains(circle: ((f64, f64), f64), point: (f64, f64)) -> bool {
        distance(circle.0, point) <= circle.1 + EPSILON * (1.0 + circle.1)
    }

    fn from_two(a: (f64, f64), b: (f64, f64)) -> ((f64, f64), f64) {
        let center = ((a.0 + b.0) * 0.5, (a.1 + b.1) * 0.5);
        (center, distance(a, b) * 0.5)
    }

    fn from_three(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> ((f64, f64), f64) {
        let bx = b.0 - a.0;
        let by = b.1 - a.1;
        let cx = c.0 - a.0;
        let cy = c.1 - a.1;
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < EPSILON {
            // Collinear: the widest pair spans the circle.
            return [from_two(a, b), from_two(a, c), from_two(b, c)]
                .into_iter()
                .fold(((0.0, 0.0), -1.0), |best, candidate| {
                    if candidate.1 > best.1 { candidate } else { best }
                });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = (a.0 + ux, a.1 + uy);
        (center, (ux * ux + uy * uy).sqrt())
    }
}
