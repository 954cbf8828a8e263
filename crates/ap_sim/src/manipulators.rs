// crates/ap_sim/src/manipulators.rs

//! 域操纵器与组合子
//!
//! - [`Calculations`]: 把一串逐单元算子折叠进一次并行遍历，
//!   每个单元按序施加整条链，链尾截断瞬态负值
//! - [`RunPeriodically`]: 按模拟时间周期触发内部操纵器
//! - [`SetTimestepCfl`]: 由 CFL/von Neumann 约束设置全域 Δt
//! - [`MutateGrid`]: 网格变异事件（细分/合并 + 排放重分配）
//! - [`SteadyStateConvergence`]: 稳态收敛检查, 置位终止与警告标志

use crate::driver::{DomainManipulator, SimError, SimResult};
use crate::model::Model;
use ap_grid::emissions::Emissions;
use ap_grid::mutate::{mutate_grid, GridMutator};
use ap_grid::population::{Census, MortalityRates};
use ap_io::CtmData;
use ap_physics::operators::clamp_negative;
use ap_physics::{CellOperator, CflCalculator, ConvergenceChecker, ConvergenceStatus};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// 逐单元算子链的并行遍历
///
/// 工作线程仅写自己持有单元的 Cf（单元写锁内），Ci 在整个
/// 遍历期间冻结，遍历内的执行顺序因此不可观测。
pub struct Calculations {
    ops: Vec<Box<dyn CellOperator>>,
}

impl Calculations {
    /// 由算子链创建
    #[must_use]
    pub fn new(ops: Vec<Box<dyn CellOperator>>) -> Self {
        Self { ops }
    }
}

impl DomainManipulator for Calculations {
    fn name(&self) -> &'static str {
        "calculations"
    }

    fn apply(&mut self, model: &mut Model) -> SimResult<()> {
        let dt = model.dt;
        let grid = &model.grid;
        let ops = &self.ops;
        grid.cells().par_iter().for_each(|&id| {
            let cell = grid.cell(id);
            for op in ops {
                op.apply(grid.store(), cell, dt);
            }
            clamp_negative(cell);
        });
        Ok(())
    }
}

/// 周期触发组合子
///
/// 以模拟时间累计间隔，达到周期即触发内部操纵器并清零。
pub struct RunPeriodically {
    period: f64,
    elapsed: f64,
    inner: Box<dyn DomainManipulator>,
}

impl RunPeriodically {
    /// 包装内部操纵器
    #[must_use]
    pub fn new(period: f64, inner: impl DomainManipulator + 'static) -> Self {
        Self {
            period,
            elapsed: 0.0,
            inner: Box::new(inner),
        }
    }
}

impl DomainManipulator for RunPeriodically {
    fn name(&self) -> &'static str {
        "run_periodically"
    }

    fn apply(&mut self, model: &mut Model) -> SimResult<()> {
        self.elapsed += model.dt;
        if self.elapsed >= self.period {
            self.elapsed = 0.0;
            self.inner.apply(model)?;
        }
        Ok(())
    }
}

/// 时间步设置
pub struct SetTimestepCfl {
    calculator: CflCalculator,
}

impl SetTimestepCfl {
    /// 以 Courant 数上限创建
    #[must_use]
    pub fn new(c_max: f64) -> Self {
        Self {
            calculator: CflCalculator::new(c_max),
        }
    }
}

impl DomainManipulator for SetTimestepCfl {
    fn name(&self) -> &'static str {
        "set_timestep_cfl"
    }

    fn apply(&mut self, model: &mut Model) -> SimResult<()> {
        let dt = self.calculator.compute_dt(&model.grid);
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidState(format!(
                "时间步长非法: {}",
                dt
            )));
        }
        model.dt = dt;
        Ok(())
    }
}

/// 网格变异事件
///
/// 在物理步之间执行；外部数据以 `Arc` 共享。变异后排放已在
/// 网格层重分配，时间步长由运行列表中紧随的 [`SetTimestepCfl`]
/// 重算。
pub struct MutateGrid {
    mutator: GridMutator,
    ctm: Arc<CtmData>,
    census: Arc<Census>,
    mortality: Arc<MortalityRates>,
    emissions: Option<Arc<Emissions>>,
}

impl MutateGrid {
    /// 创建变异操纵器
    #[must_use]
    pub fn new(
        mutator: GridMutator,
        ctm: Arc<CtmData>,
        census: Arc<Census>,
        mortality: Arc<MortalityRates>,
        emissions: Option<Arc<Emissions>>,
    ) -> Self {
        Self {
            mutator,
            ctm,
            census,
            mortality,
            emissions,
        }
    }
}

impl DomainManipulator for MutateGrid {
    fn name(&self) -> &'static str {
        "mutate_grid"
    }

    fn apply(&mut self, model: &mut Model) -> SimResult<()> {
        let outcome = mutate_grid(
            &mut model.grid,
            &self.mutator,
            &self.ctm,
            &self.census,
            &self.mortality,
            self.emissions.as_deref(),
        )?;
        if outcome.changed() {
            info!(
                split = outcome.split_cells,
                merged = outcome.merged_cells,
                sim_time = model.time,
                "网格变异事件"
            );
        }
        Ok(())
    }
}

/// 稳态收敛检查
pub struct SteadyStateConvergence {
    checker: ConvergenceChecker,
}

impl SteadyStateConvergence {
    /// 包装收敛检查器
    #[must_use]
    pub fn new(checker: ConvergenceChecker) -> Self {
        Self { checker }
    }
}

impl DomainManipulator for SteadyStateConvergence {
    fn name(&self) -> &'static str {
        "steady_state_convergence"
    }

    fn apply(&mut self, model: &mut Model) -> SimResult<()> {
        match self.checker.step(&model.grid) {
            ConvergenceStatus::Running => {}
            ConvergenceStatus::Converged => {
                info!(steps = self.checker.steps(), "稳态收敛");
                model.done = true;
            }
            ConvergenceStatus::IterationCapReached => {
                model.done = true;
                model.convergence_warning = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_config::{ConvergenceConfig, GridConfig};
    use ap_grid::build::regular_grid;
    use ap_grid::Species;
    use ap_io::SyntheticCtmConfig;
    use ap_physics::AddEmissionsFlux;

    fn simple_model() -> Model {
        let ctm = SyntheticCtmConfig {
            nz: 2,
            pbl_layers: 0,
            m2u: 0.0,
            ..SyntheticCtmConfig::default()
        }
        .build();
        let census = Census::new(vec!["TotalPop".to_string()]);
        let mort = MortalityRates::new();
        let grid = regular_grid(&GridConfig::default(), &ctm, &census, &mort, None).unwrap();
        Model::new(grid)
    }

    #[test]
    fn test_calculations_applies_chain() {
        let mut model = simple_model();
        model.dt = 10.0;
        let id = model.grid.cells()[0];
        model.grid.cell_mut(id).emis_flux[Species::Pm25.index()] = 1.0;

        let mut calc = Calculations::new(vec![Box::new(AddEmissionsFlux)]);
        calc.apply(&mut model).unwrap();

        let cf = model.grid.cell(id).concentrations().cf;
        assert!((cf[Species::Pm25.index()] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_calculations_clamps_negative() {
        let mut model = simple_model();
        model.dt = 1.0;
        let id = model.grid.cells()[0];
        let mut c = [0.0; 9];
        c[0] = -0.5;
        model.grid.cell(id).with_conc_mut(|conc| conc.cf = c);

        let mut calc = Calculations::new(vec![]);
        calc.apply(&mut model).unwrap();
        assert_eq!(model.grid.cell(id).concentrations().cf[0], 0.0);
    }

    #[test]
    fn test_set_timestep() {
        let mut model = simple_model();
        let mut set = SetTimestepCfl::new(1.0);
        set.apply(&mut model).unwrap();
        assert!(model.dt > 0.0);
        assert!(model.dt.is_finite());
    }

    #[test]
    fn test_run_periodically_triggers_on_interval() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct Count(Arc<AtomicUsize>);
        impl DomainManipulator for Count {
            fn name(&self) -> &'static str {
                "count"
            }
            fn apply(&mut self, _m: &mut Model) -> SimResult<()> {
                self.0.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        }

        let fired = Arc::new(AtomicUsize::new(0));
        let mut model = simple_model();
        model.dt = 100.0;
        let mut periodic = RunPeriodically::new(250.0, Count(fired.clone()));
        // 累计 100, 200 不触发; 300 触发并清零; 再次 100, 200, 300 触发
        for _ in 0..6 {
            periodic.apply(&mut model).unwrap();
        }
        assert_eq!(fired.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_convergence_sets_flags() {
        let mut model = simple_model();
        let checker = ConvergenceChecker::new(
            ConvergenceConfig {
                check_interval_steps: 1000,
                tolerance: 1e-3,
                required_passes: 3,
                max_iterations: Some(2),
            },
            0,
        );
        let mut conv = SteadyStateConvergence::new(checker);
        conv.apply(&mut model).unwrap();
        assert!(!model.done);
        conv.apply(&mut model).unwrap();
        assert!(model.done);
        assert!(model.convergence_warning);
    }
}
