use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Coordinate helpers for a square matrix of `size * size` pixels.
///
/// Logical indices run row by row: `index = y * size + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    size: usize,
}

impl Geometry {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pixel_count(&self) -> usize {
        self.size * self.size
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.size
            && (point.y as usize) < self.size
    }

    /// Logical index of `point`, or `None` when it falls outside the matrix.
    pub fn index(&self, point: Point) -> Option<usize> {
        self.contains(point)
            .then(|| point.y as usize * self.size + point.x as usize)
    }

    pub fn coords(&self, index: usize) -> Option<Point> {
        (index < self.pixel_count()).then(|| {
            Point::new((index % self.size) as i32, (index / self.size) as i32)
        })
    }

    /// Points of the segment `from..=to`, clipped to the matrix.
    pub fn line(&self, from: Point, to: Point) -> Vec<Point> {
        let mut points = Vec::new();
        let dx = (to.x - from.x).abs();
        let dy = -(to.y - from.y).abs();
        let sx = if from.x < to.x { 1 } else { -1 };
        let sy = if from.y < to.y { 1 } else { -1 };
        let mut err = dx + dy;
        let mut cursor = from;

        loop {
            if self.contains(cursor) {
                points.push(cursor);
            }
            if cursor == to {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                cursor.x += sx;
            }
            if doubled <= dx {
                err += dx;
                cursor.y += sy;
            }
        }
        points
    }

    /// Outline of the rectangle spanned by two opposite corners.
    pub fn rect(&self, a: Point, b: Point) -> Vec<Point> {
        let (left, right) = (a.x.min(b.x), a.x.max(b.x));
        let (top, bottom) = (a.y.min(b.y), a.y.max(b.y));
        let mut points = Vec::new();
        for x in left..=right {
            points.push(Point::new(x, top));
            if bottom != top {
                points.push(Point::new(x, bottom));
            }
        }
        for y in top + 1..bottom {
            points.push(Point::new(left, y));
            if right != left {
                points.push(Point::new(right, y));
            }
        }
        points.retain(|point| self.contains(*point));
        points
    }
}

/// Maps a logical pixel index onto the physical position along a serpentine
/// LED strip.
pub fn serpentine(index: usize, size: usize) -> usize {
    let mut x = index / size;
    let y = index % size;
    if y % 2 == 0 {
        x = size - x - 1;
    }
    y * size + x
}
