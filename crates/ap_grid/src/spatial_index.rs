// crates/ap_grid/src/spatial_index.rs

//! 网格空间索引
//!
//! 基于 R 树的单元足迹索引，支撑邻居解析、CTM 叠加与
//! 排放分配中的矩形范围查询。索引只收录内部单元；边界哨兵
//! 不参与空间查询。
//!
//! 索引是二维的：所有垂直层共享同一棵树，包络上携带层索引，
//! 由调用方按需过滤。

use crate::store::CellId;
use ap_geo::Rect;
use rstar::{RTree, RTreeObject, AABB};

/// 单元包络
///
/// 存储单元足迹的轴对齐包围盒与层索引。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellEnvelope {
    /// 单元句柄
    pub id: CellId,
    /// 垂直层索引
    pub layer: usize,
    /// 最小 x
    pub min_x: f64,
    /// 最小 y
    pub min_y: f64,
    /// 最大 x
    pub max_x: f64,
    /// 最大 y
    pub max_y: f64,
}

impl CellEnvelope {
    /// 由足迹创建
    #[must_use]
    pub fn new(id: CellId, layer: usize, rect: &Rect) -> Self {
        Self {
            id,
            layer,
            min_x: rect.min.x,
            min_y: rect.min.y,
            max_x: rect.max.x,
            max_y: rect.max.y,
        }
    }

    /// 还原为矩形
    #[inline]
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_bounds(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

/// 网格空间索引
#[derive(Default)]
pub struct GridSpatialIndex {
    tree: RTree<CellEnvelope>,
}

impl GridSpatialIndex {
    /// 创建空索引
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 收录单元
    pub fn insert(&mut self, id: CellId, layer: usize, rect: &Rect) {
        self.tree.insert(CellEnvelope::new(id, layer, rect));
    }

    /// 移除单元
    ///
    /// 返回是否确实存在。
    pub fn remove(&mut self, id: CellId, layer: usize, rect: &Rect) -> bool {
        self.tree.remove(&CellEnvelope::new(id, layer, rect)).is_some()
    }

    /// 与矩形相交的全部包络（所有层）
    #[must_use]
    pub fn locate_in_rect(&self, rect: &Rect) -> Vec<CellEnvelope> {
        let envelope = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .copied()
            .collect()
    }

    /// 与矩形相交的指定层单元句柄
    #[must_use]
    pub fn locate_in_rect_layer(&self, rect: &Rect, layer: usize) -> Vec<CellId> {
        self.locate_in_rect(rect)
            .into_iter()
            .filter(|e| e.layer == layer)
            .map(|e| e.id)
            .collect()
    }

    /// 收录的包络数
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
