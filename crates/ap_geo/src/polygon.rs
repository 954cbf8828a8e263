// crates/ap_geo/src/polygon.rs

//! 简单多边形
//!
//! 人口普查与排放源数据以任意简单多边形进入系统。本模块提供
//! 面积（鞋带公式）、包围盒、射线法点包含，以及针对轴对齐矩形的
//! Sutherland-Hodgman 裁剪。裁剪结果只用于求交面积，因而退化
//! 输出（空多边形、共线顶点）按零面积处理即可。

use crate::point::Point2D;
use crate::rect::Rect;
use serde::{Deserialize, Serialize};

/// 简单多边形
///
/// 顶点序列不要求闭合（首尾点不重复），方向任意。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point2D>,
}

impl Polygon {
    /// 由顶点序列创建
    #[must_use]
    pub fn new(vertices: Vec<Point2D>) -> Self {
        Self { vertices }
    }

    /// 顶点访问
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    /// 顶点数
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// 是否为空
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// 带符号面积（逆时针为正）
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % n];
            sum += a.cross(b);
        }
        sum * 0.5
    }

    /// 面积（绝对值）
    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// 包围盒
    ///
    /// 空多边形返回 None。
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.vertices.first()?;
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for v in &self.vertices[1..] {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
        }
        Some(Rect::from_bounds(min_x, min_y, max_x, max_y))
    }

    /// 射线法判断点是否在多边形内
    ///
    /// 从待测点向右发射水平射线，统计与多边形边的交点数：
    /// 奇数在内，偶数在外。
    #[must_use]
    pub fn contains_point(&self, p: &Point2D) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];
            if ((vi.y > p.y) != (vj.y > p.y))
                && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// 将多边形裁剪到轴对齐矩形内（Sutherland-Hodgman）
    ///
    /// 依次对矩形的四条半平面裁剪。凸裁剪窗口保证结果仍为
    /// 单个多边形。
    #[must_use]
    pub fn clip_to_rect(&self, rect: &Rect) -> Polygon {
        // 半平面: inside(p) 为 true 时保留
        fn clip_edge(
            input: &[Point2D],
            inside: impl Fn(&Point2D) -> bool,
            intersect: impl Fn(&Point2D, &Point2D) -> Point2D,
        ) -> Vec<Point2D> {
            let n = input.len();
            let mut output = Vec::with_capacity(n + 4);
            for i in 0..n {
                let cur = &input[i];
                let prev = &input[(i + n - 1) % n];
                let cur_in = inside(cur);
                let prev_in = inside(prev);
                if cur_in {
                    if !prev_in {
                        output.push(intersect(prev, cur));
                    }
                    output.push(*cur);
                } else if prev_in {
                    output.push(intersect(prev, cur));
                }
            }
            output
        }

        // 与竖直线 x = x0 求交
        fn cross_x(a: &Point2D, b: &Point2D, x0: f64) -> Point2D {
            let t = (x0 - a.x) / (b.x - a.x);
            Point2D::new(x0, a.y + t * (b.y - a.y))
        }
        // 与水平线 y = y0 求交
        fn cross_y(a: &Point2D, b: &Point2D, y0: f64) -> Point2D {
            let t = (y0 - a.y) / (b.y - a.y);
            Point2D::new(a.x + t * (b.x - a.x), y0)
        }

        let mut pts = self.vertices.clone();
        if pts.len() < 3 {
            return Polygon::new(Vec::new());
        }

        let (x0, x1) = (rect.min.x, rect.max.x);
        let (y0, y1) = (rect.min.y, rect.max.y);

        pts = clip_edge(&pts, |p| p.x >= x0, |a, b| cross_x(a, b, x0));
        if pts.len() < 3 {
            return Polygon::new(Vec::new());
        }
        pts = clip_edge(&pts, |p| p.x <= x1, |a, b| cross_x(a, b, x1));
        if pts.len() < 3 {
            return Polygon::new(Vec::new());
        }
        pts = clip_edge(&pts, |p| p.y >= y0, |a, b| cross_y(a, b, y0));
        if pts.len() < 3 {
            return Polygon::new(Vec::new());
        }
        pts = clip_edge(&pts, |p| p.y <= y1, |a, b| cross_y(a, b, y1));
        if pts.len() < 3 {
            return Polygon::new(Vec::new());
        }
        Polygon::new(pts)
    }

    /// 与轴对齐矩形的交集面积
    #[inline]
    #[must_use]
    pub fn intersection_area_with_rect(&self, rect: &Rect) -> f64 {
        self.clip_to_rect(rect).area()
    }
}

impl From<Rect> for Polygon {
    /// 矩形转多边形（逆时针）
    fn from(r: Rect) -> Self {
        Polygon::new(r.corners().to_vec())
    }
}
