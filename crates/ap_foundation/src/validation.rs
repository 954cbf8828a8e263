// crates/ap_foundation/src/validation.rs

//! 输入校验辅助
//!
//! 加载期的防御性检查。NaN、无穷与非法区间在进入计算核心之前
//! 即被拒绝，核心算子因此可以假定全部输入有限。

use crate::error::{PlumeError, PlumeResult};

/// 校验单个值有限（非 NaN、非无穷）
#[inline]
pub fn ensure_finite(name: &str, value: f64) -> PlumeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PlumeError::invalid_input(format!(
            "{} 必须为有限值，实际为 {}",
            name, value
        )))
    }
}

/// 校验切片内所有值有限，返回第一个违规位置
pub fn ensure_all_finite(name: &str, values: &[f64]) -> PlumeResult<()> {
    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(PlumeError::invalid_input(format!(
                "{}[{}] 必须为有限值，实际为 {}",
                name, i, v
            )));
        }
    }
    Ok(())
}

/// 校验值非负
#[inline]
pub fn ensure_non_negative(name: &str, value: f64) -> PlumeResult<()> {
    ensure_finite(name, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(PlumeError::invalid_input(format!(
            "{} 不能为负，实际为 {}",
            name, value
        )))
    }
}

/// 校验值严格为正
#[inline]
pub fn ensure_positive(name: &str, value: f64) -> PlumeResult<()> {
    ensure_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(PlumeError::invalid_input(format!(
            "{} 必须为正，实际为 {}",
            name, value
        )))
    }
}

/// 校验值位于闭区间 [0, 1]
///
/// 用于气粒分配分数等物理上以分数表达的量。
#[inline]
pub fn ensure_unit_range(name: &str, value: f64) -> PlumeResult<()> {
    ensure_finite(name, value)?;
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PlumeError::invalid_input(format!(
            "{} 必须位于 [0, 1]，实际为 {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("x", 1.0).is_ok());
        assert!(ensure_finite("x", f64::NAN).is_err());
        assert!(ensure_finite("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_all_finite() {
        assert!(ensure_all_finite("v", &[0.0, 1.0, -2.0]).is_ok());
        let err = ensure_all_finite("v", &[0.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("v[1]"));
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("pop", 0.0).is_ok());
        assert!(ensure_non_negative("pop", -1.0).is_err());
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("dx", 1.0).is_ok());
        assert!(ensure_positive("dx", 0.0).is_err());
    }

    #[test]
    fn test_ensure_unit_range() {
        assert!(ensure_unit_range("f", 0.0).is_ok());
        assert!(ensure_unit_range("f", 1.0).is_ok());
        assert!(ensure_unit_range("f", 1.5).is_err());
        assert!(ensure_unit_range("f", -0.1).is_err());
    }
}
