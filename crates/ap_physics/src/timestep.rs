// crates/ap_physics/src/timestep.rs

//! 时间步长控制
//!
//! 全域单一 Δt，取所有单元四个稳定性约束的最小值：
//!
//! - dt₁ = C_max/√3 / max((|ū|+2u′)/Δx, (|v̄|+2v′)/Δy, |w̄|/Δz)
//!   （CFL 对流约束，偏差速度按两倍计入有效风速）
//! - dt₂ = C_max·Δz²/(2·Kzz)（垂直扩散 von Neumann 约束）
//! - dt₃ = C_max·Δx²/(2·Kxxyy)，dt₄ = C_max·Δy²/(2·Kxxyy)
//!
//! 并行归约使用位技巧原子最小值（正有限浮点数的位序与数值序
//! 一致）。网格变异后必须重算，平稳期间保持不变。

use ap_grid::Grid;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// CFL 时间步计算器
#[derive(Clone, Copy, Debug)]
pub struct CflCalculator {
    /// Courant 数上限
    c_max: f64,
}

impl CflCalculator {
    /// 创建计算器
    #[must_use]
    pub fn new(c_max: f64) -> Self {
        Self { c_max }
    }

    /// Courant 数上限
    #[must_use]
    pub fn c_max(&self) -> f64 {
        self.c_max
    }

    /// 计算全域时间步长 [s]
    ///
    /// 空网格返回正无穷，由调用方判错。
    #[must_use]
    pub fn compute_dt(&self, grid: &Grid) -> f64 {
        let sqrt3 = 3.0f64.sqrt();
        let min_bits = AtomicU64::new(f64::INFINITY.to_bits());

        grid.cells().par_iter().for_each(|&id| {
            let cell = grid.cell(id);
            let met = &cell.met;

            let advective = ((met.u_avg.abs() + 2.0 * met.u_deviation) / cell.dx)
                .max((met.v_avg.abs() + 2.0 * met.v_deviation) / cell.dy)
                .max(met.w_avg.abs() / cell.dz);
            let dt1 = if advective > 0.0 {
                self.c_max / sqrt3 / advective
            } else {
                f64::INFINITY
            };
            let dt2 = self.c_max * cell.dz * cell.dz / (2.0 * met.kzz);
            let dt3 = self.c_max * cell.dx * cell.dx / (2.0 * met.kxxyy);
            let dt4 = self.c_max * cell.dy * cell.dy / (2.0 * met.kxxyy);

            let local = dt1.min(dt2).min(dt3).min(dt4);
            min_bits.fetch_min(local.to_bits(), Ordering::Relaxed);
        });

        let dt = f64::from_bits(min_bits.load(Ordering::Relaxed));
        debug!(dt, "时间步长已更新");
        dt
    }
}

impl Default for CflCalculator {
    fn default() -> Self {
        Self::new(1.0)
    }
}
