// crates/ap_grid/src/grid.rs

//! 网格整体
//!
//! 持有单元仓库、五个边界单元集合（西/东/南/北/顶；底边界为
//! 隐式反射）、内部单元的空间索引与人口分组映射。插入与删除
//! 维护邻居拓扑闭合：新单元及其触及的既有单元全部重建邻居，
//! 删除则对引用方做 O(度) 擦除并把空面重绑到边界哨兵。

use crate::cell::{Cell, Face};
use crate::error::GridError;
use crate::spatial_index::GridSpatialIndex;
use crate::store::{CellId, CellStore};
use ap_config::GridConfig;
use ap_foundation::tolerance::{FRACTION_SUM_TOL, GEOM_EPS};
use ap_geo::Rect;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// 变分辨率网格
pub struct Grid {
    pub(crate) config: GridConfig,
    pub(crate) store: CellStore,
    /// 内部单元句柄，按 (层, 质心 x, 质心 y) 排序
    pub(crate) cells: Vec<CellId>,
    pub(crate) index: GridSpatialIndex,
    /// 西边界哨兵
    pub west_boundary: Vec<CellId>,
    /// 东边界哨兵
    pub east_boundary: Vec<CellId>,
    /// 南边界哨兵
    pub south_boundary: Vec<CellId>,
    /// 北边界哨兵
    pub north_boundary: Vec<CellId>,
    /// 顶边界哨兵
    pub top_boundary: Vec<CellId>,
    pub(crate) pop_indices: HashMap<String, usize>,
    pub(crate) nlayers: usize,
}

impl Grid {
    /// 创建空网格
    ///
    /// 人口分组映射由配置的普查列派生。
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let pop_indices = config
            .census_pop_columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            config,
            store: CellStore::new(),
            cells: Vec::new(),
            index: GridSpatialIndex::new(),
            west_boundary: Vec::new(),
            east_boundary: Vec::new(),
            south_boundary: Vec::new(),
            north_boundary: Vec::new(),
            top_boundary: Vec::new(),
            pop_indices: HashMap::new(),
            nlayers: 0,
        }
        .with_pop_indices(pop_indices)
    }

    fn with_pop_indices(mut self, pop_indices: HashMap<String, usize>) -> Self {
        self.pop_indices = pop_indices;
        self
    }

    /// 网格配置
    #[inline]
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// 内部单元句柄（有序）
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// 单元仓库
    #[inline]
    #[must_use]
    pub fn store(&self) -> &CellStore {
        &self.store
    }

    /// 只读访问单元
    #[inline]
    #[must_use]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.store[id]
    }

    /// 可变访问单元
    ///
    /// 仅用于步间状态设置（排放分配、边界条件），物理遍历期间
    /// 不得调用。
    #[inline]
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.store[id]
    }

    /// 垂直层数
    #[inline]
    #[must_use]
    pub fn nlayers(&self) -> usize {
        self.nlayers
    }

    /// 人口分组映射
    #[inline]
    #[must_use]
    pub fn pop_indices(&self) -> &HashMap<String, usize> {
        &self.pop_indices
    }

    /// 按列名取人口分组索引
    pub fn pop_index(&self, column: &str) -> Result<usize, GridError> {
        self.pop_indices
            .get(column)
            .copied()
            .ok_or_else(|| GridError::MissingPopColumn(column.to_string()))
    }

    /// 全部边界哨兵句柄
    #[must_use]
    pub fn boundary_ids(&self) -> Vec<CellId> {
        let mut ids = Vec::with_capacity(
            self.west_boundary.len()
                + self.east_boundary.len()
                + self.south_boundary.len()
                + self.north_boundary.len()
                + self.top_boundary.len(),
        );
        ids.extend_from_slice(&self.west_boundary);
        ids.extend_from_slice(&self.east_boundary);
        ids.extend_from_slice(&self.south_boundary);
        ids.extend_from_slice(&self.north_boundary);
        ids.extend_from_slice(&self.top_boundary);
        ids
    }

    /// 批量加入单元
    ///
    /// 先全部入库并建立空间索引，再对新单元与其触及的既有单元
    /// 统一重建邻居，最后恢复排序。调用方保证新单元彼此不重叠，
    /// 也不与既有单元重叠。
    pub fn add_cells(&mut self, new_cells: Vec<Cell>) -> Vec<CellId> {
        let mut new_ids = Vec::with_capacity(new_cells.len());
        for cell in new_cells {
            if cell.layer + 1 > self.nlayers {
                self.nlayers = cell.layer + 1;
            }
            let rect = cell.footprint;
            let layer = cell.layer;
            let id = self.store.insert(cell);
            self.index.insert(id, layer, &rect);
            self.cells.push(id);
            new_ids.push(id);
        }

        // 触及集合: 新单元 + 以扩张包围盒命中的既有单元
        let mut touched: BTreeSet<CellId> = new_ids.iter().copied().collect();
        for &id in &new_ids {
            let query = self.store[id].footprint.expanded(GEOM_EPS);
            for env in self.index.locate_in_rect(&query) {
                touched.insert(env.id);
            }
        }
        for id in touched {
            self.rebuild_neighbors(id);
        }
        self.sort_cells();
        debug!(added = new_ids.len(), total = self.cells.len(), "单元已加入网格");
        new_ids
    }

    /// 批量删除单元
    ///
    /// 对每个引用方擦除句柄、重归一化分数；列表被清空的面重绑
    /// 到新的边界哨兵。返回被删除单元的所有权。
    pub fn delete_cells(&mut self, ids: &[CellId]) -> Vec<Cell> {
        let deleted: BTreeSet<CellId> = ids.iter().copied().collect();

        // 先收集受影响的引用方（含所有层：地面层引用跨层存在）
        let mut touched: BTreeSet<CellId> = BTreeSet::new();
        for &id in ids {
            let query = self.store[id].footprint.expanded(GEOM_EPS);
            for env in self.index.locate_in_rect(&query) {
                if !deleted.contains(&env.id) {
                    touched.insert(env.id);
                }
            }
        }

        let mut removed = Vec::with_capacity(ids.len());
        for &id in ids {
            self.release_boundary_copies(id);
            let rect = self.store[id].footprint;
            let layer = self.store[id].layer;
            self.index.remove(id, layer, &rect);
            self.cells.retain(|&c| c != id);
            if let Some(cell) = self.store.remove(id) {
                removed.push(cell);
            }
        }

        for id in touched {
            self.scrub_references(id, &deleted);
        }
        debug!(removed = removed.len(), total = self.cells.len(), "单元已删除");
        removed
    }

    /// 与给定矩形相交的单元及覆盖分数
    ///
    /// 分数为交集面积占查询矩形面积之比（跨所有层）。
    #[must_use]
    pub fn cell_intersections(&self, rect: &Rect) -> Vec<(CellId, f64)> {
        let area = rect.area();
        if area <= 0.0 {
            return Vec::new();
        }
        self.index
            .locate_in_rect(&rect.expanded(GEOM_EPS))
            .into_iter()
            .filter_map(|env| {
                let frac = rect.overlap_area(&env.rect()) / area;
                (frac > 0.0).then_some((env.id, frac))
            })
            .collect()
    }

    /// 域内污染物总质量与地面层总人口
    ///
    /// 质量为各单元浓度和乘体积之和；人口只统计地面层，
    /// 避免同一人口被各层重复计数。
    #[must_use]
    pub fn total_mass_and_population(&self, pop_index: usize) -> (f64, f64) {
        let mut mass = 0.0;
        let mut population = 0.0;
        for &id in &self.cells {
            let cell = &self.store[id];
            let conc = cell.concentrations();
            mass += conc.cf.iter().sum::<f64>() * cell.volume;
            if cell.layer == 0 {
                population += cell.pop_data.get(pop_index).copied().unwrap_or(0.0);
            }
        }
        (mass, population)
    }

    /// 恢复 (层, 质心 x, 质心 y) 排序
    pub(crate) fn sort_cells(&mut self) {
        let store = &self.store;
        self.cells.sort_by(|&a, &b| {
            let ca = &store[a];
            let cb = &store[b];
            ca.layer
                .cmp(&cb.layer)
                .then_with(|| {
                    let pa = ca.centroid();
                    let pb = cb.centroid();
                    pa.x.partial_cmp(&pb.x)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(pa.y.partial_cmp(&pb.y).unwrap_or(std::cmp::Ordering::Equal))
                })
        });
    }

    /// 校验拓扑不变量
    ///
    /// 1. 每个非边界面的覆盖分数之和等于 1（容差 1e-10）
    /// 2. 地面层分数之和等于 1
    /// 3. 邻接对称: A 在 B 的西面列表中当且仅当 B 在 A 的东面
    ///    列表中，且共享段长一致
    pub fn validate_topology(&self) -> Result<(), GridError> {
        for &id in &self.cells {
            let cell = &self.store[id];
            for face in Face::ALL {
                let list = cell.neighbors(face);
                if list.is_empty() {
                    continue;
                }
                let sum: f64 = list.iter().map(|n| n.frac).sum();
                if (sum - 1.0).abs() > FRACTION_SUM_TOL {
                    return Err(GridError::FractionSum {
                        cell: id.0,
                        face: face.name(),
                        sum,
                    });
                }
            }
            if !cell.ground_level.is_empty() {
                let sum: f64 = cell.ground_level.iter().map(|n| n.frac).sum();
                if (sum - 1.0).abs() > FRACTION_SUM_TOL {
                    return Err(GridError::FractionSum {
                        cell: id.0,
                        face: "ground",
                        sum,
                    });
                }
            }

            // 对称性（只检查水平面；垂直方向由相同的几何推导保证）
            for (face, opposite) in [
                (Face::West, Face::East),
                (Face::East, Face::West),
                (Face::South, Face::North),
                (Face::North, Face::South),
            ] {
                for n in cell.neighbors(face) {
                    let other = &self.store[n.id];
                    if other.boundary {
                        continue;
                    }
                    let has_back = other.neighbors(opposite).iter().any(|m| m.id == id);
                    if !has_back {
                        return Err(GridError::AsymmetricNeighbors {
                            cell: id.0,
                            neighbor: n.id.0,
                            face: face.name(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
