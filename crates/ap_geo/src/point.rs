// crates/ap_geo/src/point.rs

//! 二维点类型
//!
//! 项目统一的二维几何基础类型，用于单元质心、普查多边形顶点
//! 与排放源位置。坐标单位为网格投影坐标系下的米。

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// 2D 点
///
/// # 示例
///
/// ```
/// use ap_geo::Point2D;
///
/// let p1 = Point2D::new(1.0, 2.0);
/// let p2 = Point2D::new(4.0, 6.0);
/// assert_eq!((p2 - p1).norm(), 5.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X 坐标
    pub x: f64,
    /// Y 坐标
    pub y: f64,
}

impl Point2D {
    /// 零点常量
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// 创建新的 2D 点
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 点积
    #[inline]
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 二维叉积（z 分量）
    #[inline]
    #[must_use]
    pub fn cross(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// 模长
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// 到另一点的距离
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (*other - *self).norm()
    }

    /// 坐标均为有限值
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point2D {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point2D {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Point2D::new(1.0, 2.0);
        let b = Point2D::new(3.0, 5.0);
        assert_eq!(a + b, Point2D::new(4.0, 7.0));
        assert_eq!(b - a, Point2D::new(2.0, 3.0));
        assert_eq!(a * 2.0, Point2D::new(2.0, 4.0));
        assert_eq!(-a, Point2D::new(-1.0, -2.0));
    }

    #[test]
    fn test_dot_cross() {
        let a = Point2D::new(1.0, 0.0);
        let b = Point2D::new(0.0, 1.0);
        assert_eq!(a.dot(&b), 0.0);
        assert_eq!(a.cross(&b), 1.0);
    }

    #[test]
    fn test_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }
}
