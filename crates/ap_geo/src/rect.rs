// crates/ap_geo/src/rect.rs

//! 轴对齐矩形
//!
//! 网格单元的足迹始终为轴对齐矩形（嵌套细分不会产生其他形状），
//! 单元间的相邻判定与重叠量计算全部基于本类型的快速路径。

use crate::point::Point2D;
use serde::{Deserialize, Serialize};

/// 轴对齐矩形
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// 左下角
    pub min: Point2D,
    /// 右上角
    pub max: Point2D,
}

impl Rect {
    /// 由对角点创建
    ///
    /// 调用方保证 `min ≤ max` 逐分量成立。
    #[inline]
    #[must_use]
    pub const fn from_corners(min: Point2D, max: Point2D) -> Self {
        Self { min, max }
    }

    /// 由边界坐标创建
    #[inline]
    #[must_use]
    pub const fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point2D::new(min_x, min_y),
            max: Point2D::new(max_x, max_y),
        }
    }

    /// 宽度
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// 高度
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// 面积
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// 中心点
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Point2D {
        Point2D::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// 逐方向外扩 eps，返回新矩形
    #[inline]
    #[must_use]
    pub fn expanded(&self, eps: f64) -> Self {
        Self::from_bounds(
            self.min.x - eps,
            self.min.y - eps,
            self.max.x + eps,
            self.max.y + eps,
        )
    }

    /// 闭区间点包含判定
    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: &Point2D) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// 半开区间点包含判定（含下边界，不含上边界）
    ///
    /// 用于将点状排放源唯一地分配给一个单元，避免位于公共边上的
    /// 点被相邻两个单元同时计入。
    #[inline]
    #[must_use]
    pub fn contains_point_half_open(&self, p: &Point2D) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// X 方向重叠长度（无重叠时为负或零）
    #[inline]
    #[must_use]
    pub fn overlap_x(&self, other: &Rect) -> f64 {
        self.max.x.min(other.max.x) - self.min.x.max(other.min.x)
    }

    /// Y 方向重叠长度（无重叠时为负或零）
    #[inline]
    #[must_use]
    pub fn overlap_y(&self, other: &Rect) -> f64 {
        self.max.y.min(other.max.y) - self.min.y.max(other.min.y)
    }

    /// 重叠面积（无重叠时为 0）
    #[inline]
    #[must_use]
    pub fn overlap_area(&self, other: &Rect) -> f64 {
        let ox = self.overlap_x(other);
        let oy = self.overlap_y(other);
        if ox > 0.0 && oy > 0.0 {
            ox * oy
        } else {
            0.0
        }
    }

    /// 交集矩形（面积为正时）
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min_x = self.min.x.max(other.min.x);
        let min_y = self.min.y.max(other.min.y);
        let max_x = self.max.x.min(other.max.x);
        let max_y = self.max.y.min(other.max.y);
        if max_x > min_x && max_y > min_y {
            Some(Rect::from_bounds(min_x, min_y, max_x, max_y))
        } else {
            None
        }
    }

    /// 矩形四角（逆时针，起自左下）
    #[must_use]
    pub fn corners(&self) -> [Point2D; 4] {
        [
            self.min,
            Point2D::new(self.max.x, self.min.y),
            self.max,
            Point2D::new(self.min.x, self.max.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let r = Rect::from_bounds(0.0, 0.0, 2.0, 3.0);
        assert_eq!(r.width(), 2.0);
        assert_eq!(r.height(), 3.0);
        assert_eq!(r.area(), 6.0);
        assert_eq!(r.centroid(), Point2D::new(1.0, 1.5));
    }

    #[test]
    fn test_contains() {
        let r = Rect::from_bounds(0.0, 0.0, 1.0, 1.0);
        assert!(r.contains_point(&Point2D::new(1.0, 1.0)));
        assert!(!r.contains_point_half_open(&Point2D::new(1.0, 1.0)));
        assert!(r.contains_point_half_open(&Point2D::new(0.0, 0.0)));
    }

    #[test]
    fn test_overlap() {
        let a = Rect::from_bounds(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_bounds(1.0, 1.0, 3.0, 3.0);
        assert_eq!(a.overlap_x(&b), 1.0);
        assert_eq!(a.overlap_area(&b), 1.0);

        // 仅共享一条边，无面积重叠
        let c = Rect::from_bounds(2.0, 0.0, 4.0, 2.0);
        assert_eq!(a.overlap_x(&c), 0.0);
        assert_eq!(a.overlap_area(&c), 0.0);
        assert_eq!(a.overlap_y(&c), 2.0);
    }

    #[test]
    fn test_intersection() {
        let a = Rect::from_bounds(0.0, 0.0, 2.0, 2.0);
        let b = Rect::from_bounds(1.0, 1.0, 3.0, 3.0);
        let i = a.intersection(&b).unwrap();
        assert_eq!(i, Rect::from_bounds(1.0, 1.0, 2.0, 2.0));
        assert!(a.intersection(&Rect::from_bounds(5.0, 5.0, 6.0, 6.0)).is_none());
    }

    #[test]
    fn test_expanded() {
        let r = Rect::from_bounds(0.0, 0.0, 1.0, 1.0).expanded(0.5);
        assert_eq!(r, Rect::from_bounds(-0.5, -0.5, 1.5, 1.5));
    }
}
