use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn max(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x < self.max().x
            && point.y >= self.origin.y
            && point.y < self.max().y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.origin.x < other.max().x
            && other.origin.x < self.max().x
            && self.origin.y < other.max().y
            && other.origin.y < self.max().y
    }

    /// Shrinks the rect by `amount` on every side, clamping at zero size.
    pub fn inset(&self, amount: f64) -> Rect {
        let width = (self.size.width - 2.0 * amount).max(0.0);
        let height = (self.size.height - 2.0 * amount).max(0.0);
        Rect::new(self.origin.x + amount, self.origin.y + amount, width, height)
    }

    /// Grows the rect by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Rect {
        Rect::new(
            self.origin.x - amount,
            self.origin.y - amount,
            self.size.width + 2.0 * amount,
            self.size.height + 2.0 * amount,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.origin.x + dx,
            self.origin.y + dy,
            self.size.width,
            self.size.height,
        )
    }

    /// A rect the render sink cannot place.
    pub fn is_degenerate(&self) -> bool { self.size.width <= 0.0 || self.size.height <= 0.0 }

    pub fn round(&self) -> Rect {
        Rect::new(
            self.origin.x.round(),
            self.origin.y.round(),
            self.size.width.round(),
            self.size.height.round(),
        )
    }

    pub fn area(&self) -> f64 { self.size.width * self.size.height }
}
