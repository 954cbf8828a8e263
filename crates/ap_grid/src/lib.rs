// crates/ap_grid/src/lib.rs

//! atmoPlume 网格层
//!
//! 变分辨率嵌套网格的全部状态与拓扑：
//! - [`species`]: 污染物组分注册表（九分量，四对气粒共轭）
//! - [`cell`]: 单元状态（几何、气象、化学系数、人口、浓度、拓扑）
//! - [`store`]: 稳定句柄的单元仓库（删除为 O(度) 擦除）
//! - [`spatial_index`]: 基于 R 树的单元足迹空间索引
//! - [`neighbors`]: 邻居解析（分数覆盖模型，规则网格为其退化情形）
//! - [`grid`]: 网格整体（插入/删除/重建、边界单元集合）
//! - [`build`]: 规则网格构造与 CTM 面积加权叠加
//! - [`population`]: 人口普查与死亡率叠加层
//! - [`emissions`]: 排放源与通量分配
//! - [`mutate`]: 细分/合并引擎与两种判据
//!
//! 单元间引用一律是仓库句柄，不存在所有权环；邻居分数模型
//! 对规则与变分辨率网格统一适用。

pub mod build;
pub mod cell;
pub mod emissions;
pub mod error;
pub mod grid;
pub mod mutate;
pub mod neighbors;
pub mod population;
pub mod spatial_index;
pub mod species;
pub mod store;

pub use cell::{Cell, Concentrations, Face, Neighbor};
pub use error::GridError;
pub use grid::Grid;
pub use species::{EmissionRates, Species, SpeciesArray, N_SPECIES};
pub use store::{CellId, CellStore};
