//! Geometry primitives shared by the layout engine and the driver interface.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min(&self) -> Point {
        self.origin
    }

    pub fn max(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    pub fn area(&self) -> f64 {
        self.size.width * self.size.height
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.min().x..=self.max().x).contains(&point.x)
            && (self.min().y..=self.max().y).contains(&point.y)
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let min_x = f64::max(self.min().x, other.min().x);
        let max_x = f64::min(self.max().x, other.max().x);
        let min_y = f64::max(self.min().y, other.min().y);
        let max_y = f64::min(self.max().y, other.max().y);
        Rect {
            origin: Point::new(min_x, min_y),
            size: Size::new(f64::max(max_x - min_x, 0.), f64::max(max_y - min_y, 0.)),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).area() > 0.0
    }

    /// Shrinks the rect by the given amounts on each side. Degenerate insets
    /// collapse to a zero-size rect rather than going negative.
    pub fn inset(&self, top: f64, left: f64, bottom: f64, right: f64) -> Rect {
        let width = f64::max(self.size.width - left - right, 0.0);
        let height = f64::max(self.size.height - top - bottom, 0.0);
        Rect {
            origin: Point::new(self.origin.x + left, self.origin.y + top),
            size: Size::new(width, height),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: self.size,
        }
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Point {
    fn round(&self) -> Self {
        Point::new(self.x.round(), self.y.round())
    }
}

impl Round for Size {
    fn round(&self) -> Self {
        Size::new(self.width.round(), self.height.round())
    }
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min = self.min().round();
        let max = self.max().round();
        Rect {
            origin: min,
            size: Size::new(max.x - min.x, max.y - min.y),
        }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        (self - other).abs() < how_much
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Size {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.width.is_within(how_much, other.width) && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin.is_within(how_much, other.origin) && self.size.is_within(how_much, other.size)
    }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool {
        self.is_within(0.1, other)
    }
}

impl SameAs for Rect {}
impl SameAs for Point {}
impl SameAs for Size {}
