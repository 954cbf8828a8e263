// crates/ap_physics/src/lib.rs

//! atmoPlume 物理层
//!
//! 逐单元算子与时间控制：
//! - [`operators`]: 排放、迎风平流、蛇行混合、垂直/水平扩散与
//!   ACM2 对流、干/湿沉降、化学/气粒分配
//! - [`timestep`]: CFL 与 von Neumann 约束下的全域时间步长
//! - [`convergence`]: 人口加权 PM2.5 指标的稳态收敛判据
//!
//! 所有算子读取任意单元的步初浓度 Ci，只写本单元的步末浓度
//! Cf，因此在一次遍历内天然可交换、可并行。

pub mod convergence;
pub mod operators;
pub mod timestep;

pub use convergence::{ConvergenceChecker, ConvergenceStatus};
pub use operators::{
    AddEmissionsFlux, CellOperator, Chemistry, DryDeposition, MeanderMixing, Mixing,
    UpwindAdvection, WetDeposition,
};
pub use timestep::CflCalculator;
