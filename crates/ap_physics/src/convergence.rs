// crates/ap_physics/src/convergence.rs

//! 稳态收敛判据
//!
//! 每隔固定步数计算一次人口加权的总 PM2.5 指标
//!
//! ```text
//! M = Σ_cells Pop · (Cf[pS] + Cf[pNO] + Cf[pNH] + Cf[pOrg] + Cf[PM2.5])
//! ```
//!
//! 连续若干次检查的相对变化都小于容差即判定收敛；达到迭代
//! 上限时终止并报告警告（结果仍然交付）。

use ap_config::ConvergenceConfig;
use ap_grid::{Grid, Species};
use rayon::prelude::*;
use tracing::{debug, warn};

/// 一次检查的结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// 继续迭代
    Running,
    /// 已收敛
    Converged,
    /// 达到迭代上限（携带警告）
    IterationCapReached,
}

/// 稳态收敛检查器
pub struct ConvergenceChecker {
    config: ConvergenceConfig,
    pop_index: usize,
    steps: usize,
    previous: Option<f64>,
    consecutive: usize,
}

impl ConvergenceChecker {
    /// 创建检查器
    #[must_use]
    pub fn new(config: ConvergenceConfig, pop_index: usize) -> Self {
        Self {
            config,
            pop_index,
            steps: 0,
            previous: None,
            consecutive: 0,
        }
    }

    /// 已计数的物理步数
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// 人口加权总 PM2.5 指标
    #[must_use]
    pub fn metric(&self, grid: &Grid) -> f64 {
        let pop_index = self.pop_index;
        grid.cells()
            .par_iter()
            .map(|&id| {
                let cell = grid.cell(id);
                let pop = cell.pop_data.get(pop_index).copied().unwrap_or(0.0);
                if pop == 0.0 {
                    return 0.0;
                }
                let cf = cell.concentrations().cf;
                pop * (cf[Species::ParticleSulfate.index()]
                    + cf[Species::ParticleNitrate.index()]
                    + cf[Species::ParticleAmmonium.index()]
                    + cf[Species::ParticleOrganic.index()]
                    + cf[Species::Pm25.index()])
            })
            .sum()
    }

    /// 计一步并在检查点评估收敛
    pub fn step(&mut self, grid: &Grid) -> ConvergenceStatus {
        self.steps += 1;

        if let Some(cap) = self.config.max_iterations {
            if self.steps >= cap {
                warn!(steps = self.steps, "达到迭代上限, 收敛检查以警告终止");
                return ConvergenceStatus::IterationCapReached;
            }
        }
        if self.steps % self.config.check_interval_steps != 0 {
            return ConvergenceStatus::Running;
        }

        let metric = self.metric(grid);
        let status = match self.previous {
            None => ConvergenceStatus::Running,
            Some(prev) => {
                let change = (metric - prev).abs();
                let relative = if metric != 0.0 {
                    change / metric.abs()
                } else {
                    change
                };
                if relative < self.config.tolerance {
                    self.consecutive += 1;
                } else {
                    self.consecutive = 0;
                }
                debug!(
                    metric,
                    relative,
                    consecutive = self.consecutive,
                    "收敛检查"
                );
                if self.consecutive >= self.config.required_passes {
                    ConvergenceStatus::Converged
                } else {
                    ConvergenceStatus::Running
                }
            }
        };
        self.previous = Some(metric);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_config::GridConfig;
    use ap_grid::build::regular_grid;
    use ap_grid::population::{Census, MortalityRates};
    use ap_geo::{Point2D, Polygon};
    use ap_io::SyntheticCtmConfig;

    fn grid_with_population() -> Grid {
        let ctm = SyntheticCtmConfig {
            nz: 2,
            pbl_layers: 0,
            m2u: 0.0,
            ..SyntheticCtmConfig::default()
        }
        .build();
        let mut census = Census::new(vec!["TotalPop".to_string()]);
        census
            .insert(
                Polygon::new(vec![
                    Point2D::new(-8000.0, -8000.0),
                    Point2D::new(8000.0, -8000.0),
                    Point2D::new(8000.0, 8000.0),
                    Point2D::new(-8000.0, 8000.0),
                ]),
                vec![1600.0],
            )
            .unwrap();
        let mort = MortalityRates::new();
        regular_grid(&GridConfig::default(), &ctm, &census, &mort, None).unwrap()
    }

    fn checker(interval: usize, passes: usize, cap: Option<usize>) -> ConvergenceChecker {
        ConvergenceChecker::new(
            ConvergenceConfig {
                check_interval_steps: interval,
                tolerance: 1e-3,
                required_passes: passes,
                max_iterations: cap,
            },
            0,
        )
    }

    #[test]
    fn test_metric_weighted_by_population() {
        let grid = grid_with_population();
        let mut c = checker(1, 1, None);
        // 所有浓度为零: 指标为零
        assert_eq!(c.metric(&grid), 0.0);

        // 给每个层 0 单元设置 1 μg/m³ 的颗粒硫酸盐
        for &id in grid.cells() {
            if grid.cell(id).layer == 0 {
                let mut cf = [0.0; 9];
                cf[Species::ParticleSulfate.index()] = 1.0;
                grid.cell(id).set_concentrations(cf);
            }
        }
        // 总人口 1600, 每单元权重 × 1 μg/m³
        assert!((c.metric(&grid) - 1600.0).abs() < 1e-9);
        let _ = c.step(&grid);
    }

    #[test]
    fn test_stationary_field_converges() {
        let grid = grid_with_population();
        for &id in grid.cells() {
            grid.cell(id).set_concentrations([1.0; 9]);
        }
        let mut c = checker(1, 3, None);
        // 第一次检查建立基线, 随后三次相对变化为零
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::Converged);
    }

    #[test]
    fn test_zero_field_converges() {
        // 全零场: 指标恒为零, 绝对变化判据收敛
        let grid = grid_with_population();
        let mut c = checker(1, 2, None);
        let _ = c.step(&grid);
        let _ = c.step(&grid);
        assert_eq!(c.step(&grid), ConvergenceStatus::Converged);
    }

    #[test]
    fn test_interval_skips_checks() {
        let grid = grid_with_population();
        let mut c = checker(5, 1, None);
        for _ in 0..9 {
            assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        }
        // 第 10 步是第二个检查点, 变化为零即收敛
        assert_eq!(c.step(&grid), ConvergenceStatus::Converged);
    }

    #[test]
    fn test_iteration_cap() {
        let grid = grid_with_population();
        let mut c = checker(1000, 3, Some(4));
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        assert_eq!(c.step(&grid), ConvergenceStatus::IterationCapReached);
    }

    #[test]
    fn test_changing_field_resets_run() {
        let grid = grid_with_population();
        for &id in grid.cells() {
            grid.cell(id).set_concentrations([1.0; 9]);
        }
        let mut c = checker(1, 2, None);
        let _ = c.step(&grid); // 基线
        let _ = c.step(&grid); // 第一次通过
        // 大幅扰动
        for &id in grid.cells() {
            grid.cell(id).set_concentrations([2.0; 9]);
        }
        assert_eq!(c.step(&grid), ConvergenceStatus::Running);
        let _ = c.step(&grid);
        assert_eq!(c.step(&grid), ConvergenceStatus::Converged);
    }
}
