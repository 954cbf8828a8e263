// crates/ap_config/src/simulation.rs

//! 物理方案与模拟流程配置

use crate::error::ConfigError;
use crate::grid::GridConfig;
use serde::{Deserialize, Serialize};

/// 物理方案常量
///
/// 早期实现把 VOC 氧化速率等量放在进程级全局变量中，
/// 现统一收敛到此结构体，随模拟实例传递。
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Courant 数上限
    ///
    /// 同时用于 CFL 对流约束与 von Neumann 扩散约束。
    pub c_max: f64,
    /// VOC 氧化为二次有机气溶胶的一阶速率常数 [1/s]
    pub voc_oxidation_rate: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            c_max: 1.0,
            // 年均尺度下的典型值
            voc_oxidation_rate: 1.0e-5,
        }
    }
}

impl PhysicsConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.c_max.is_finite() || self.c_max <= 0.0 || self.c_max > 1.0 {
            return Err(ConfigError::invalid(
                "c_max",
                format!("必须位于 (0, 1], 实际 {}", self.c_max),
            ));
        }
        if !self.voc_oxidation_rate.is_finite() || self.voc_oxidation_rate < 0.0 {
            return Err(ConfigError::invalid(
                "voc_oxidation_rate",
                format!("必须非负, 实际 {}", self.voc_oxidation_rate),
            ));
        }
        Ok(())
    }
}

/// 稳态收敛判据配置
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    /// 检查间隔（物理步数）
    pub check_interval_steps: usize,
    /// 收敛相对容差
    pub tolerance: f64,
    /// 需要连续满足容差的检查次数
    pub required_passes: usize,
    /// 迭代步数上限（None 表示不设上限）
    ///
    /// 达到上限时终止并携带警告标志，结果仍然交付。
    pub max_iterations: Option<usize>,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            check_interval_steps: 10,
            tolerance: 1e-3,
            required_passes: 3,
            max_iterations: None,
        }
    }
}

impl ConvergenceConfig {
    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_steps == 0 {
            return Err(ConfigError::invalid("check_interval_steps", "不能为 0"));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::invalid(
                "tolerance",
                format!("必须为正, 实际 {}", self.tolerance),
            ));
        }
        if self.required_passes == 0 {
            return Err(ConfigError::invalid("required_passes", "不能为 0"));
        }
        Ok(())
    }
}

/// 模拟总配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 网格配置
    pub grid: GridConfig,
    /// 物理常量
    pub physics: PhysicsConfig,
    /// 收敛判据
    pub convergence: ConvergenceConfig,
    /// 网格变异间隔（模拟秒）
    pub mutation_interval_seconds: f64,
}

impl SimulationConfig {
    /// 校验全部子配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.physics.validate()?;
        self.convergence.validate()?;
        if !self.mutation_interval_seconds.is_finite() || self.mutation_interval_seconds < 0.0 {
            return Err(ConfigError::invalid(
                "mutation_interval_seconds",
                format!("必须非负, 实际 {}", self.mutation_interval_seconds),
            ));
        }
        Ok(())
    }
}
