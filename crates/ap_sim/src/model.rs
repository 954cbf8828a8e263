// crates/ap_sim/src/model.rs

//! 模拟状态

use ap_grid::Grid;

/// 模拟状态
///
/// 网格加上驱动器维护的时间与标志。`done` 由收敛检查或外部
/// 取消置位，驱动器在下一个列表项边界退出运行循环。
pub struct Model {
    /// 网格
    pub grid: Grid,
    /// 当前时间步长 [s]
    pub dt: f64,
    /// 已推进的模拟时间 [s]
    pub time: f64,
    /// 已完成的运行循环轮数
    pub steps: usize,
    /// 终止标志
    pub done: bool,
    /// 收敛警告标志（达到迭代上限时置位, 结果仍然交付）
    pub convergence_warning: bool,
}

impl Model {
    /// 以网格创建初始状态
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            dt: 0.0,
            time: 0.0,
            steps: 0,
            done: false,
            convergence_warning: false,
        }
    }

    /// 外部取消
    ///
    /// 运行循环在下一个列表项边界退出；进行中的逐单元工作
    /// 允许完成。
    pub fn cancel(&mut self) {
        self.done = true;
    }
}
