// crates/ap_grid/src/error.rs

//! 网格层错误类型
//!
//! 几何不一致（零面积形状、覆盖分数无法归一、单元无 CTM 重叠）
//! 全部视为输入损坏并致命失败。

use ap_foundation::PlumeError;
use ap_io::CtmError;
use thiserror::Error;

/// 网格构建与拓扑错误
#[derive(Debug, Error)]
pub enum GridError {
    /// 单元与 CTM 网格无任何重叠
    #[error("单元 (质心 {x}, {y}, 层 {layer}) 与 CTM 网格无重叠")]
    NoCtmOverlap {
        /// 单元质心 x
        x: f64,
        /// 单元质心 y
        y: f64,
        /// 层索引
        layer: usize,
    },

    /// 外部数据中出现零面积形状
    #[error("零面积形状: {context}")]
    ZeroAreaShape {
        /// 出错的数据来源
        context: String,
    },

    /// 覆盖分数之和偏离 1
    #[error("单元 {cell} 面 {face} 覆盖分数之和 {sum} 偏离 1")]
    FractionSum {
        /// 单元句柄（调试表示）
        cell: usize,
        /// 面名称
        face: &'static str,
        /// 实际分数和
        sum: f64,
    },

    /// 邻居对称性破坏
    #[error("单元 {cell} 与 {neighbor} 在面 {face} 上的邻接不对称")]
    AsymmetricNeighbors {
        /// 单元句柄
        cell: usize,
        /// 邻居句柄
        neighbor: usize,
        /// 面名称
        face: &'static str,
    },

    /// 人口分组列未注册
    #[error("人口分组列 {0} 未注册")]
    MissingPopColumn(String),

    /// CTM 数据错误
    #[error(transparent)]
    Ctm(#[from] CtmError),

    /// 基础层错误
    #[error(transparent)]
    Foundation(#[from] PlumeError),
}
