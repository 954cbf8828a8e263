// crates/ap_foundation/src/tolerance.rs

//! 数值容差常量
//!
//! 集中管理项目中的数值比较容差，避免各模块散落魔法数字。
//! 所有容差均有明确的使用场景，不应随意放宽。

/// 几何运算容差（网格坐标单位，米）
///
/// 用于包围盒扩张、面相邻判定与重叠长度的正性判断。
/// 显著小于最小网格尺度，但大于坐标计算的浮点舍入误差。
pub const GEOM_EPS: f64 = 1e-10;

/// 邻居覆盖分数求和容差
///
/// 非边界面的覆盖分数之和必须等于 1，允许偏差不超过此值。
pub const FRACTION_SUM_TOL: f64 = 1e-10;

/// ACM2 对流平衡相对容差
///
/// 上行非局地项与逐层下行项必须满足质量守恒恒等式，
/// 相对误差超过此值视为输入数据损坏。
pub const ACM2_REL_TOL: f64 = 1e-8;

/// 网格分裂守恒相对容差
///
/// 分裂后子单元的体积和与人口和相对父单元的允许偏差。
pub const SPLIT_REL_TOL: f64 = 1e-6;

/// 浮点比较的通用紧容差
pub const TIGHT_TOL: f64 = 1e-12;

/// 判断两个浮点数在给定容差内近似相等
#[inline]
#[must_use]
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// 相对差值
///
/// 以两者中绝对值较大者为基准；两者皆为零时返回 0。
#[inline]
#[must_use]
pub fn relative_diff(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

/// 调和平均
///
/// 用于交错网格界面上扩散系数的插值。任一输入为零时返回 0。
#[inline]
#[must_use]
pub fn harmonic_mean(a: f64, b: f64) -> f64 {
    if a + b == 0.0 {
        0.0
    } else {
        2.0 * a * b / (a + b)
    }
}
