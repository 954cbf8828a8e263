// crates/ap_config/src/lib.rs

//! atmoPlume 配置层
//!
//! 所有运行参数集中于此：变分辨率网格的嵌套结构与细分阈值、
//! 物理方案常量（含 VOC 氧化速率，早期实现中的进程级全局量
//! 已全部收敛到配置结构体）、稳态收敛判据。
//!
//! 每个配置结构体实现 serde 序列化、`Default` 与显式 `validate()`，
//! 非法配置在模拟开始前即被拒绝。

pub mod error;
pub mod grid;
pub mod simulation;

pub use error::ConfigError;
pub use grid::GridConfig;
pub use simulation::{ConvergenceConfig, PhysicsConfig, SimulationConfig};
