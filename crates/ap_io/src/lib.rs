// crates/ap_io/src/lib.rs

//! atmoPlume IO 层
//!
//! 承载 CTM（综合化学输运模式）预处理输出的内存数据模型与加载校验：
//! - [`CtmData`] / [`CtmVariable`]: 自描述多维数组文件的内存表示
//! - [`validate`]: 加载期全量校验（版本、有限性、取值区间、ACM2 平衡）
//! - [`synthetic`]: 恒等式自洽的合成数据集构造（测试与示例）
//! - `netcdf` 特性: 磁盘文件驱动
//!
//! 所有校验在加载期完成并立即失败，计算核心由此假定输入合法。

pub mod ctmdata;
pub mod error;
pub mod synthetic;
pub mod validate;

#[cfg(feature = "netcdf")]
pub mod netcdf_driver;

pub use ctmdata::{CtmData, CtmVariable, Staggering, CTM_DATA_VERSION, REQUIRED_VARIABLES};
pub use error::CtmError;
pub use synthetic::SyntheticCtmConfig;
