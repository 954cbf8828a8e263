// crates/ap_io/src/validate.rs

//! CTM 数据加载期校验
//!
//! 按顺序执行：
//! 1. 数据版本匹配
//! 2. 必需变量齐备且形状正确
//! 3. 全量有限性检查（NaN / 无穷致命）
//! 4. 物理区间检查（扩散系数为正、分配分数位于 [0,1]、速率非负）
//! 5. ACM2 对流平衡恒等式（相对误差 ≤ 1e-8）
//!
//! 任何一项失败即返回错误并指明出错的变量与位置。

use crate::ctmdata::{CtmData, Staggering, CTM_DATA_VERSION, REQUIRED_VARIABLES};
use crate::error::CtmError;
use ap_foundation::tolerance::ACM2_REL_TOL;
use tracing::debug;

/// 取值必须位于 [0, 1] 的变量（气粒分配分数）
const UNIT_RANGE_VARIABLES: &[&str] = &[
    "aOrgPartitioning",
    "bOrgPartitioning",
    "NOPartitioning",
    "SPartitioning",
    "NHPartitioning",
];

/// 取值必须严格为正的变量
const POSITIVE_VARIABLES: &[&str] = &["Kzz", "Kxxyy"];

/// 取值必须非负的变量（速率与沉降速度）
const NON_NEGATIVE_VARIABLES: &[&str] = &[
    "SO2oxidation",
    "ParticleDryDep",
    "SO2DryDep",
    "NOxDryDep",
    "NH3DryDep",
    "VOCDryDep",
    "ParticleWetDep",
    "SO2WetDep",
    "OtherGasWetDep",
    "M2u",
    "M2d",
    "Dz",
];

/// 对数据集执行全量校验
pub fn validate(data: &CtmData) -> Result<(), CtmError> {
    check_version(data)?;
    check_required_variables(data)?;
    check_finite(data)?;
    check_ranges(data)?;
    check_acm2_balance(data)?;
    debug!(
        nx = data.nx,
        ny = data.ny,
        nz = data.nz,
        "CTM 数据校验通过"
    );
    Ok(())
}

/// 版本匹配检查
fn check_version(data: &CtmData) -> Result<(), CtmError> {
    if data.data_version != CTM_DATA_VERSION {
        return Err(CtmError::VersionMismatch {
            found: data.data_version.clone(),
            required: CTM_DATA_VERSION,
        });
    }
    Ok(())
}

/// 必需变量齐备且形状与交错声明一致
fn check_required_variables(data: &CtmData) -> Result<(), CtmError> {
    for &(name, staggering) in REQUIRED_VARIABLES {
        let var = data.variable(name)?;
        let expected = staggering.expected_shape(data.nz, data.ny, data.nx);
        if var.shape != expected {
            return Err(CtmError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: var.shape.clone(),
            });
        }
    }
    Ok(())
}

/// 全量有限性检查
fn check_finite(data: &CtmData) -> Result<(), CtmError> {
    for (name, var) in data.variables() {
        for (index, &value) in var.data.iter().enumerate() {
            if !value.is_finite() {
                return Err(CtmError::NotFinite {
                    name: name.clone(),
                    index,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// 物理区间检查
fn check_ranges(data: &CtmData) -> Result<(), CtmError> {
    for &name in UNIT_RANGE_VARIABLES {
        check_interval(data, name, 0.0, 1.0)?;
    }
    for &name in NON_NEGATIVE_VARIABLES {
        check_interval(data, name, 0.0, f64::INFINITY)?;
    }
    for &name in POSITIVE_VARIABLES {
        let var = data.variable(name)?;
        for (index, &value) in var.data.iter().enumerate() {
            if value <= 0.0 {
                return Err(CtmError::OutOfRange {
                    name: name.to_string(),
                    index,
                    value,
                    lo: 0.0,
                    hi: f64::INFINITY,
                });
            }
        }
    }
    Ok(())
}

fn check_interval(data: &CtmData, name: &str, lo: f64, hi: f64) -> Result<(), CtmError> {
    let var = data.variable(name)?;
    for (index, &value) in var.data.iter().enumerate() {
        if value < lo || value > hi {
            return Err(CtmError::OutOfRange {
                name: name.to_string(),
                index,
                value,
                lo,
                hi,
            });
        }
    }
    Ok(())
}

/// ACM2 对流平衡恒等式检查
///
/// 对每个格点列内处于边界层中的层 k，必须有
///
/// ```text
/// M2u = M2d(k) − M2d(k+1) · (z(k+2) − z(k+1)) / (z(k+1) − z(k))
/// ```
///
/// 其中 z 为交错层高。该恒等式保证上行非局地输送与逐层下行
/// 输送对质量守恒闭合；违反它意味着预处理有 bug，会在模拟中
/// 悄悄破坏质量守恒，因此在加载期即判为致命。
pub fn check_acm2_balance(data: &CtmData) -> Result<(), CtmError> {
    let m2u = data.variable("M2u")?;
    let m2d = data.variable("M2d")?;
    let heights = data.variable("LayerHeights")?;

    for j in 0..data.ny {
        for i in 0..data.nx {
            for k in 0..data.nz {
                let up = m2u.get3(k, j, i).unwrap_or(0.0);
                if up <= 0.0 {
                    // 边界层以上无对流项
                    continue;
                }
                let z_lo = heights.get3(k, j, i).unwrap_or(0.0);
                let z_mid = heights.get3(k + 1, j, i).unwrap_or(0.0);
                let dz = z_mid - z_lo;
                if dz <= 0.0 {
                    return Err(CtmError::OutOfRange {
                        name: "LayerHeights".to_string(),
                        index: k,
                        value: dz,
                        lo: 0.0,
                        hi: f64::INFINITY,
                    });
                }
                let down = m2d.get3(k, j, i).unwrap_or(0.0);
                let (down_above, dz_above) = if k + 1 < data.nz {
                    let z_hi = heights.get3(k + 2, j, i).unwrap_or(z_mid);
                    (m2d.get3(k + 1, j, i).unwrap_or(0.0), z_hi - z_mid)
                } else {
                    (0.0, 0.0)
                };

                let balance = down - down_above * dz_above / dz;
                let error = (up - balance).abs() / up;
                if error > ACM2_REL_TOL {
                    return Err(CtmError::Acm2Imbalance { k, j, i, error });
                }
            }
        }
    }
    Ok(())
}
