// crates/ap_grid/src/emissions.rs

//! 排放源与通量分配
//!
//! 排放记录为点源或面源，源强按排放类别给出 [μg/s]。
//! 分配规则：
//! - 点源: 落入单元足迹（半开区间）即整源计入
//! - 面源: 按交集面积占源面积的比例分摊
//! - 无烟囱参数的记录视为地面源，只分配给层 0
//! - 带烟囱参数的记录分配给烟囱高度所在的层
//!   （烟羽抬升由外部预处理完成，这里只消费有效源高）
//!
//! 通量 = 源强 × 分摊比例 / 单元体积 [μg/m³/s]。
//! 网格每次变异后新单元必须重新分配。

use crate::cell::Cell;
use crate::species::EmissionRates;
use ap_geo::{Point2D, Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// 高架源烟囱参数
///
/// 由外部预处理解释；核心只用有效源高定位垂直层。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackParams {
    /// 有效源高 [m]
    pub height: f64,
    /// 烟囱直径 [m]
    pub diameter: f64,
    /// 烟气温度 [K]
    pub temperature: f64,
    /// 出口速度 [m/s]
    pub velocity: f64,
}

/// 排放源几何
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EmisGeometry {
    /// 点源
    Point(Point2D),
    /// 面源
    Area(Polygon),
}

/// 排放记录
#[derive(Clone, Debug)]
pub struct EmisRecord {
    /// 源几何
    pub geom: EmisGeometry,
    /// 各类别源强 [μg/s]
    pub rates: EmissionRates,
    /// 烟囱参数（None 为地面源）
    pub stack: Option<StackParams>,
    bounds: Rect,
}

impl EmisRecord {
    /// 创建记录
    #[must_use]
    pub fn new(geom: EmisGeometry, rates: EmissionRates, stack: Option<StackParams>) -> Self {
        let bounds = match &geom {
            EmisGeometry::Point(p) => Rect::from_corners(*p, *p),
            EmisGeometry::Area(poly) => poly
                .bounds()
                .unwrap_or_else(|| Rect::from_bounds(0.0, 0.0, 0.0, 0.0)),
        };
        Self {
            geom,
            rates,
            stack,
            bounds,
        }
    }

    /// 地面点源的便捷构造
    #[must_use]
    pub fn ground_point(location: Point2D, rates: EmissionRates) -> Self {
        Self::new(EmisGeometry::Point(location), rates, None)
    }
}

impl RTreeObject for EmisRecord {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

/// 排放源集合
#[derive(Default)]
pub struct Emissions {
    tree: RTree<EmisRecord>,
}

impl Emissions {
    /// 创建空集合
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入记录
    pub fn add(&mut self, record: EmisRecord) {
        self.tree.insert(record);
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

    /// 为单元分配排放通量
    ///
    /// 覆盖单元现有的 `emis_flux`。必须在邻居解析之后、物理
    /// 遍历之前调用；网格变异产生的新单元需要重新分配。
    pub fn assign_flux(&self, cell: &mut Cell) {
        cell.emis_flux = [0.0; crate::species::N_SPECIES];
        if cell.boundary || cell.volume <= 0.0 {
            return;
        }

        let query = AABB::from_corners(
            [cell.footprint.min.x, cell.footprint.min.y],
            [cell.footprint.max.x, cell.footprint.max.y],
        );
        for record in self.tree.locate_in_envelope_intersecting(&query) {
            // 垂直定位: 地面源进层 0，高架源进源高所在层
            let in_layer = match &record.stack {
                None => cell.layer == 0,
                Some(stack) => {
                    stack.height >= cell.layer_height
                        && stack.height < cell.layer_height + cell.dz
                }
            };
            if !in_layer {
                continue;
            }

            let frac = match &record.geom {
                EmisGeometry::Point(p) => {
                    if cell.footprint.contains_point_half_open(p) {
                        1.0
                    } else {
                        0.0
                    }
                }
                EmisGeometry::Area(poly) => {
                    let area = poly.area();
                    if area > 0.0 {
                        poly.intersection_area_with_rect(&cell.footprint) / area
                    } else {
                        0.0
                    }
                }
            };
            if frac <= 0.0 {
                continue;
            }

            for (species, rate) in record.rates.by_species() {
                cell.emis_flux[species.index()] += rate * frac / cell.volume;
            }
        }
    }
}
