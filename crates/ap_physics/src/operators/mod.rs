// crates/ap_physics/src/operators/mod.rs

//! 逐单元物理算子
//!
//! 每个算子实现 [`CellOperator`]：给定单元仓库、目标单元与
//! 时间步长，从冻结的 Ci 读取，向目标单元的 Cf 累积。
//! 算子按固定顺序组成一条链：
//!
//! 1. 排放注入（同时把 Ci 对齐到 Cf，开启新的时间步）
//! 2. 迎风平流
//! 3. 蛇行混合
//! 4. 扩散 + ACM2 对流
//! 5. 干沉降（仅层 0）
//! 6. 湿沉降
//! 7. 化学/气粒分配
//!
//! 链尾对瞬态负值做静默截断（见 [`clamp_negative`]）。

mod advection;
mod chemistry;
mod deposition;
mod emissions;
mod mixing;

pub use advection::UpwindAdvection;
pub use chemistry::Chemistry;
pub use deposition::{DryDeposition, WetDeposition};
pub use emissions::AddEmissionsFlux;
pub use mixing::{MeanderMixing, Mixing};

use ap_grid::{Cell, CellStore};

/// 逐单元算子
///
/// 实现约定：读取任意单元的 `ci`，只写 `cell` 自身的 `cf`；
/// 写入在单元写锁内完成。
pub trait CellOperator: Send + Sync {
    /// 算子名（日志与诊断用）
    fn name(&self) -> &'static str;

    /// 对单个单元施加算子
    fn apply(&self, store: &CellStore, cell: &Cell, dt: f64);
}

/// 截断算子链产生的瞬态负浓度
///
/// 算子顺序可能在个别组分上产生数值下溢出（负浓度），按约定
/// 静默截断为零。
pub fn clamp_negative(cell: &Cell) {
    cell.with_conc_mut(|conc| {
        for v in conc.cf.iter_mut() {
            if *v < 0.0 {
                *v = 0.0;
            }
        }
    });
}

#[cfg(test)]
pub(crate) mod testutil {
    //! 算子单元测试的微型网格构造

    use ap_geo::Rect;
    use ap_grid::{Cell, CellId, CellStore, Neighbor};

    /// 构造一个指定边长与层的裸单元
    pub fn bare_cell(size: f64, dz: f64, layer: usize) -> Cell {
        let mut c = Cell::new(
            Rect::from_bounds(0.0, 0.0, size, size),
            vec![[0, 0]],
            layer,
            1,
        );
        c.dz = dz;
        c.volume = size * size * dz;
        c
    }

    /// 单邻居条目（分数 1）
    pub fn whole_face(id: CellId, dist: f64, diff: f64) -> Neighbor {
        Neighbor {
            id,
            frac: 1.0,
            dist,
            diff,
        }
    }

    /// 把两个单元装入仓库
    pub fn store_of(cells: Vec<Cell>) -> (CellStore, Vec<CellId>) {
        let mut store = CellStore::new();
        let ids = cells.into_iter().map(|c| store.insert(c)).collect();
        (store, ids)
    }
}
