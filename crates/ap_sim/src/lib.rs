// crates/ap_sim/src/lib.rs

//! atmoPlume 模拟层
//!
//! 把网格与物理算子组织成完整模拟：
//! - [`model`]: 模拟状态（网格、Δt、模拟时间、终止与警告标志）
//! - [`driver`]: 三段有序操纵器列表（init / run / cleanup）的驱动器
//! - [`manipulators`]: 域操纵器与组合子（`Calculations` 并行遍历、
//!   `RunPeriodically` 周期触发、时间步设置、网格变异、收敛检查）
//! - [`output`]: 显式字段注册表与逐层导出
//!
//! 驱动器单线程；物理遍历经 rayon 把单元散给工作线程，唯一的
//! 共享写是各工作线程持有单元的 Cf（单元写锁内）。

pub mod driver;
pub mod manipulators;
pub mod model;
pub mod output;

pub use driver::{DomainManipulator, SimError, SimResult, Simulation};
pub use manipulators::{
    Calculations, MutateGrid, RunPeriodically, SetTimestepCfl, SteadyStateConvergence,
};
pub use model::Model;
pub use output::FieldRegistry;
