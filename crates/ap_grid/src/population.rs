// crates/ap_grid/src/population.rs

//! 人口普查与死亡率叠加层
//!
//! 多边形记录进入 R 树；单元创建时按面积分摊：
//! - 人口守恒总量: 分摊分数 = 交集面积 / 形状面积
//! - 死亡率守恒均值: 分摊分数 = 交集面积 / 单元面积
//!
//! NaN 人口与零面积形状在插入时即判为致命（输入损坏）。

use crate::error::GridError;
use ap_foundation::validation::ensure_all_finite;
use ap_geo::{Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

/// 普查形状
#[derive(Clone, Debug)]
pub struct CensusShape {
    /// 形状多边形
    pub polygon: Polygon,
    /// 各人口分组人数
    pub pops: Vec<f64>,
    /// 形状面积（缓存）
    pub area: f64,
    bounds: Rect,
}

impl RTreeObject for CensusShape {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// 人口普查数据
pub struct Census {
    tree: RTree<CensusShape>,
    /// 人口分组列名
    pub columns: Vec<String>,
}

impl Census {
    /// 创建空数据集
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            tree: RTree::new(),
            columns,
        }
    }

    /// 插入一条普查记录
    ///
    /// 人口数与分组列一一对应；NaN 或负值致命，零面积形状致命。
    pub fn insert(&mut self, polygon: Polygon, pops: Vec<f64>) -> Result<(), GridError> {
        if pops.len() != self.columns.len() {
            return Err(GridError::Foundation(
                ap_foundation::PlumeError::size_mismatch("census pops", self.columns.len(), pops.len()),
            ));
        }
        ensure_all_finite("census pops", &pops)?;
        if pops.iter().any(|&p| p < 0.0) {
            return Err(GridError::Foundation(ap_foundation::PlumeError::invalid_input(
                "普查人口不能为负",
            )));
        }
        let area = polygon.area();
        if area <= 0.0 {
            return Err(GridError::ZeroAreaShape {
                context: "普查形状".to_string(),
            });
        }
        let bounds = polygon
            .bounds()
            .expect("面积为正的多边形必有包围盒");
        self.tree.insert(CensusShape {
            polygon,
            pops,
            area,
            bounds,
        });
        Ok(())
    }

    /// 与矩形相交的普查形状
    pub fn search(&self, rect: &Rect) -> impl Iterator<Item = &CensusShape> {
        let envelope = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree.locate_in_envelope_intersecting(&envelope)
    }

    /// 记录数
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

/// 死亡率形状
#[derive(Clone, Debug)]
pub struct MortalityShape {
    /// 形状多边形
    pub polygon: Polygon,
    /// 全因死亡率 [死亡/10万人/年]
    pub all_cause: f64,
    bounds: Rect,
}

impl RTreeObject for MortalityShape {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// 死亡率数据
#[derive(Default)]
pub struct MortalityRates {
    tree: RTree<MortalityShape>,
}

impl MortalityRates {
    /// 创建空数据集
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一条死亡率记录
    pub fn insert(&mut self, polygon: Polygon, all_cause: f64) -> Result<(), GridError> {
        if !all_cause.is_finite() || all_cause < 0.0 {
            return Err(GridError::Foundation(ap_foundation::PlumeError::invalid_input(
                format!("死亡率必须为非负有限值, 实际 {}", all_cause),
            )));
        }
        if polygon.area() <= 0.0 {
            return Err(GridError::ZeroAreaShape {
                context: "死亡率形状".to_string(),
            });
        }
        let bounds = polygon
            .bounds()
            .expect("面积为正的多边形必有包围盒");
        self.tree.insert(MortalityShape {
            polygon,
            all_cause,
            bounds,
        });
        Ok(())
    }

    /// 与矩形相交的死亡率形状
    pub fn search(&self, rect: &Rect) -> impl Iterator<Item = &MortalityShape> {
        let envelope = AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y]);
        self.tree.locate_in_envelope_intersecting(&envelope)
    }

    /// 记录数
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
