use std::ops::{Index, IndexMut};

use nalgebra::Vector2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn label(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }
}

/// One value per lane side. All per-side state and logic goes through this so
/// the left and right code paths can't drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sides<T> {
    pub left: T,
    pub right: T,
}

impl<T> Sides<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn from_fn(mut f: impl FnMut(Side) -> T) -> Self {
        Self {
            left: f(Side::Left),
            right: f(Side::Right),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Side, &T) -> U) -> Sides<U> {
        Sides {
            left: f(Side::Left, &self.left),
            right: f(Side::Right, &self.right),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [(Side::Left, &self.left), (Side::Right, &self.right)].into_iter()
    }
}

impl<T> Index<Side> for Sides<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl<T> IndexMut<Side> for Sides<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Line in Hough normal form: `x*cos(theta) + y*sin(theta) = rho`, origin at the
/// top-left corner of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarLine {
    pub rho: f64,
    pub theta: f64,
}

impl PolarLine {
    pub fn new(rho: f64, theta: f64) -> Self {
        Self { rho, theta }
    }

    pub fn is_close_to(&self, other: &PolarLine, rho_threshold: f64, theta_threshold: f64) -> bool {
        (self.rho - other.rho).abs() < rho_threshold && (self.theta - other.theta).abs() < theta_threshold
    }

    /// Arithmetic mean of rho and theta, `None` for an empty set.
    pub fn mean<'a>(lines: impl IntoIterator<Item = &'a PolarLine>) -> Option<PolarLine> {
        let (count, rho_sum, theta_sum) = lines
            .into_iter()
            .fold((0usize, 0.0, 0.0), |(n, r, t), l| (n + 1, r + l.rho, t + l.theta));

        if count == 0 {
            return None;
        }
        Some(PolarLine::new(rho_sum / count as f64, theta_sum / count as f64))
    }

    // Walks `extension` units both ways from the foot of the perpendicular
    pub fn to_segment(&self, extension: f64) -> Segment {
        let (a, b) = (self.theta.cos(), self.theta.sin());
        let foot = Vector2::new(a * self.rho, b * self.rho);
        let dir = Vector2::new(-b, a);

        let p1 = foot + dir * extension;
        let p2 = foot - dir * extension;

        Segment::from_points(
            Vector2::new(p1.x.round() as i32, p1.y.round() as i32),
            Vector2::new(p2.x.round() as i32, p2.y.round() as i32),
        )
    }
}

/// Cartesian segment, `top` always has the smaller (or equal) y.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub top: Vector2<i32>,
    pub bottom: Vector2<i32>,
}

impl Segment {
    pub fn from_points(a: Vector2<i32>, b: Vector2<i32>) -> Self {
        if a.y <= b.y {
            Self { top: a, bottom: b }
        } else {
            Self { top: b, bottom: a }
        }
    }

    /// x coordinate where the segment's supporting line crosses `y`. `None` for a
    /// horizontal segment.
    pub fn x_at(&self, y: i32) -> Option<i32> {
        let dy = (self.bottom.y - self.top.y) as f64;
        if dy == 0.0 {
            return None;
        }
        let dx = (self.bottom.x - self.top.x) as f64;
        Some((self.top.x as f64 + (y - self.top.y) as f64 * dx / dy).round() as i32)
    }

    /// Clamps the segment to the band `[horizon_y, bottom_y]`. Endpoints already
    /// inside the band are left untouched.
    pub fn cropped(&self, horizon_y: i32, bottom_y: i32) -> Segment {
        let mut res = *self;

        if self.top.y < horizon_y {
            if let Some(x) = self.x_at(horizon_y) {
                res.top = Vector2::new(x, horizon_y);
            }
        }
        if self.bottom.y > bottom_y {
            if let Some(x) = self.x_at(bottom_y) {
                res.bottom = Vector2::new(x, bottom_y);
            }
        }

        res
    }
}
