// crates/ap_sim/src/driver.rs

//! 模拟驱动器
//!
//! 三段有序的域操纵器列表：
//! - `init_funcs`: 模拟开始前按序执行一次
//! - `run_funcs`: 循环按序执行直到 `done` 置位
//! - `cleanup_funcs`: 模拟结束后按序执行一次
//!
//! 每轮运行循环结束时推进模拟时间（`time += dt`）。`done` 在
//! 列表项之间检查，外部取消因此最多延迟一个列表项。

use crate::model::Model;
use ap_grid::GridError;
use thiserror::Error;
use tracing::info;

/// 模拟层错误
#[derive(Debug, Error)]
pub enum SimError {
    /// 网格层错误
    #[error(transparent)]
    Grid(#[from] GridError),

    /// 模拟状态非法
    #[error("非法的模拟状态: {0}")]
    InvalidState(String),
}

/// 统一结果别名
pub type SimResult<T> = Result<T, SimError>;

/// 域操纵器
///
/// 作用于整个模拟状态的命名操作。物理遍历、时间步设置、网格
/// 变异与收敛检查都以此形态挂入驱动器。
pub trait DomainManipulator {
    /// 操纵器名（日志用）
    fn name(&self) -> &'static str;

    /// 对模拟状态施加操作
    fn apply(&mut self, model: &mut Model) -> SimResult<()>;
}

/// 模拟驱动器
pub struct Simulation {
    /// 初始化列表
    pub init_funcs: Vec<Box<dyn DomainManipulator>>,
    /// 运行列表
    pub run_funcs: Vec<Box<dyn DomainManipulator>>,
    /// 清理列表
    pub cleanup_funcs: Vec<Box<dyn DomainManipulator>>,
    model: Model,
}

impl Simulation {
    /// 以初始状态创建驱动器
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            init_funcs: Vec::new(),
            run_funcs: Vec::new(),
            cleanup_funcs: Vec::new(),
            model,
        }
    }

    /// 追加初始化操纵器
    #[must_use]
    pub fn with_init(mut self, m: impl DomainManipulator + 'static) -> Self {
        self.init_funcs.push(Box::new(m));
        self
    }

    /// 追加运行操纵器
    #[must_use]
    pub fn with_run(mut self, m: impl DomainManipulator + 'static) -> Self {
        self.run_funcs.push(Box::new(m));
        self
    }

    /// 追加清理操纵器
    #[must_use]
    pub fn with_cleanup(mut self, m: impl DomainManipulator + 'static) -> Self {
        self.cleanup_funcs.push(Box::new(m));
        self
    }

    /// 模拟状态
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// 模拟状态（可变）
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// 按序执行初始化列表
    pub fn init(&mut self) -> SimResult<()> {
        for f in &mut self.init_funcs {
            f.apply(&mut self.model)?;
        }
        info!(
            cells = self.model.grid.cells().len(),
            dt = self.model.dt,
            "初始化完成"
        );
        Ok(())
    }

    /// 循环执行运行列表直到终止
    pub fn run(&mut self) -> SimResult<()> {
        while !self.model.done {
            for f in &mut self.run_funcs {
                f.apply(&mut self.model)?;
                if self.model.done {
                    break;
                }
            }
            self.model.time += self.model.dt;
            self.model.steps += 1;
        }
        info!(
            steps = self.model.steps,
            sim_time = self.model.time,
            warning = self.model.convergence_warning,
            "运行结束"
        );
        Ok(())
    }

    /// 按序执行清理列表
    pub fn cleanup(&mut self) -> SimResult<()> {
        for f in &mut self.cleanup_funcs {
            f.apply(&mut self.model)?;
        }
        Ok(())
    }

    /// 交出模拟状态
    #[must_use]
    pub fn into_model(self) -> Model {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_config::GridConfig;
    use ap_grid::Grid;

    struct Counter {
        count: usize,
        stop_at: Option<usize>,
    }

    impl DomainManipulator for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn apply(&mut self, model: &mut Model) -> SimResult<()> {
            self.count += 1;
            if Some(self.count) == self.stop_at {
                model.done = true;
            }
            Ok(())
        }
    }

    fn empty_model() -> Model {
        Model::new(Grid::new(GridConfig::default()))
    }

    #[test]
    fn test_run_until_done() {
        let mut sim = Simulation::new(empty_model()).with_run(Counter {
            count: 0,
            stop_at: Some(5),
        });
        sim.run().unwrap();
        assert_eq!(sim.model().steps, 5);
        assert!(sim.model().done);
    }

    #[test]
    fn test_done_checked_between_entries() {
        // 第一个操纵器在第 3 轮置位 done, 第二个在该轮不再执行
        struct Recorder {
            runs: usize,
        }
        impl DomainManipulator for Recorder {
            fn name(&self) -> &'static str {
                "recorder"
            }
            fn apply(&mut self, _model: &mut Model) -> SimResult<()> {
                self.runs += 1;
                Ok(())
            }
        }

        let mut sim = Simulation::new(empty_model())
            .with_run(Counter {
                count: 0,
                stop_at: Some(3),
            })
            .with_run(Recorder { runs: 0 });
        sim.run().unwrap();
        assert_eq!(sim.model().steps, 3);
    }

    #[test]
    fn test_time_advances_by_dt() {
        let mut sim = Simulation::new(empty_model()).with_run(Counter {
            count: 0,
            stop_at: Some(4),
        });
        sim.model_mut().dt = 250.0;
        sim.run().unwrap();
        assert_eq!(sim.model().time, 1000.0);
    }

    #[test]
    fn test_init_and_cleanup_order() {
        let mut sim = Simulation::new(empty_model())
            .with_init(Counter {
                count: 0,
                stop_at: None,
            })
            .with_cleanup(Counter {
                count: 0,
                stop_at: None,
            });
        sim.init().unwrap();
        sim.model_mut().done = true;
        sim.run().unwrap();
        sim.cleanup().unwrap();
        assert_eq!(sim.model().steps, 0);
    }
}
