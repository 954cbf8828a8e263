// crates/ap_io/src/error.rs

//! CTM 数据错误类型
//!
//! 加载期错误全部致命并指明出错的变量或属性名。

use thiserror::Error;

/// CTM 数据加载与校验错误
#[derive(Debug, Error)]
pub enum CtmError {
    /// 数据版本与当前软件要求不符
    #[error("数据版本 {found} 与要求的版本 {required} 不兼容")]
    VersionMismatch {
        /// 文件中的版本号
        found: String,
        /// 软件要求的版本号
        required: &'static str,
    },

    /// 缺少必需变量
    #[error("缺少必需变量 {0}")]
    MissingVariable(String),

    /// 缺少必需的文件属性
    #[error("缺少必需的文件属性 {0}")]
    MissingAttribute(String),

    /// 变量形状与声明的维度不符
    #[error("变量 {name} 形状不符: 期望 {expected:?}, 实际 {actual:?}")]
    ShapeMismatch {
        /// 变量名
        name: String,
        /// 期望形状
        expected: Vec<usize>,
        /// 实际形状
        actual: Vec<usize>,
    },

    /// 数据长度与形状乘积不符
    #[error("变量 {name} 数据长度不符: 形状乘积 {expected}, 实际 {actual}")]
    LengthMismatch {
        /// 变量名
        name: String,
        /// 形状乘积
        expected: usize,
        /// 实际数据长度
        actual: usize,
    },

    /// 变量中出现非有限值
    #[error("变量 {name}[{index}] 为非有限值 {value}")]
    NotFinite {
        /// 变量名
        name: String,
        /// 线性索引
        index: usize,
        /// 实际值
        value: f64,
    },

    /// 变量取值超出物理区间
    #[error("变量 {name}[{index}] 取值 {value} 超出区间 [{lo}, {hi}]")]
    OutOfRange {
        /// 变量名
        name: String,
        /// 线性索引
        index: usize,
        /// 实际值
        value: f64,
        /// 区间下界
        lo: f64,
        /// 区间上界
        hi: f64,
    },

    /// ACM2 对流平衡破坏
    ///
    /// 上行非局地项与逐层下行项的质量守恒恒等式相对误差超限，
    /// 指示预处理阶段的错误。
    #[error("ACM2 对流失衡: 单元 (k={k}, j={j}, i={i}) 相对误差 {error:.3e}")]
    Acm2Imbalance {
        /// 层索引
        k: usize,
        /// 行索引
        j: usize,
        /// 列索引
        i: usize,
        /// 相对误差
        error: f64,
    },

    /// 索引超出变量维度
    #[error("变量 {name} 索引 {indices:?} 超出形状 {shape:?}")]
    IndexOutOfBounds {
        /// 变量名
        name: String,
        /// 请求的索引
        indices: Vec<usize>,
        /// 变量形状
        shape: Vec<usize>,
    },

    /// 底层 IO 失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF 驱动错误
    #[cfg(feature = "netcdf")]
    #[error("NetCDF 错误: {0}")]
    NetCdf(#[from] netcdf::error::Error),
}
