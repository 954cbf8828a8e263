// crates/ap_config/src/grid.rs

//! 变分辨率网格配置
//!
//! 描述外层规则网格的原点与间距、各嵌套层级的细分倍数，
//! 以及驱动网格细分的人口与人口-浓度阈值。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// 变分辨率网格配置
///
/// # 嵌套约定
///
/// `xnests[0]` / `ynests[0]` 为外层网格的单元数（nx / ny），
/// 其后每一项是该层级相对上一层级的整数细分倍数。
/// 单元的嵌套索引路径长度不超过 `xnests.len()`。
///
/// # 示例
///
/// ```
/// use ap_config::GridConfig;
///
/// let config = GridConfig {
///     xnests: vec![4, 2, 2],
///     ynests: vec![4, 2, 2],
///     ..GridConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_levels(), 3);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    /// 输出网格左下角 x 坐标 [m]
    pub x0: f64,
    /// 输出网格左下角 y 坐标 [m]
    pub y0: f64,
    /// 外层网格 x 向单元边长 [m]
    pub dx: f64,
    /// 外层网格 y 向单元边长 [m]
    pub dy: f64,
    /// X 方向嵌套倍数（首项为外层 nx）
    pub xnests: Vec<usize>,
    /// Y 方向嵌套倍数（首项为外层 ny）
    pub ynests: Vec<usize>,
    /// 高分辨率细分的最大层数（该层以上保持最低分辨率）
    pub hi_res_layers: usize,

    /// 人口密度阈值 [人/m²]
    ///
    /// 普查形状密度超过此值的单元被标记为高密度。
    pub pop_density_threshold: f64,
    /// 单元总人口阈值 [人]
    pub pop_threshold: f64,
    /// 人口-浓度联合细分阈值（无量纲）
    ///
    /// Σ|ΔC|·(V₁+V₂)·|ΔPop| / (Σ|质量|·总人口) 超过此值时细分。
    pub pop_conc_threshold: f64,

    /// 普查数据中各人口分组的列名
    pub census_pop_columns: Vec<String>,
    /// 用于网格细分判据的人口分组列名
    pub pop_grid_column: String,
    /// 死亡率数据列名
    pub mortality_rate_column: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x0: -8000.0,
            y0: -8000.0,
            dx: 4000.0,
            dy: 4000.0,
            xnests: vec![4, 2, 2],
            ynests: vec![4, 2, 2],
            hi_res_layers: 1,
            pop_density_threshold: 0.001,
            pop_threshold: 1000.0,
            pop_conc_threshold: 1e-6,
            census_pop_columns: vec!["TotalPop".to_string()],
            pop_grid_column: "TotalPop".to_string(),
            mortality_rate_column: "AllCause".to_string(),
        }
    }
}

impl GridConfig {
    /// 嵌套层级总数
    #[inline]
    #[must_use]
    pub fn max_levels(&self) -> usize {
        self.xnests.len()
    }

    /// 外层网格 x 向单元数
    #[inline]
    #[must_use]
    pub fn outer_nx(&self) -> usize {
        self.xnests.first().copied().unwrap_or(0)
    }

    /// 外层网格 y 向单元数
    #[inline]
    #[must_use]
    pub fn outer_ny(&self) -> usize {
        self.ynests.first().copied().unwrap_or(0)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dx.is_finite() || self.dx <= 0.0 {
            return Err(ConfigError::invalid("dx", format!("必须为正, 实际 {}", self.dx)));
        }
        if !self.dy.is_finite() || self.dy <= 0.0 {
            return Err(ConfigError::invalid("dy", format!("必须为正, 实际 {}", self.dy)));
        }
        if !self.x0.is_finite() || !self.y0.is_finite() {
            return Err(ConfigError::invalid("x0/y0", "原点坐标必须有限"));
        }
        if self.xnests.is_empty() {
            return Err(ConfigError::invalid("xnests", "至少需要外层网格一项"));
        }
        if self.xnests.len() != self.ynests.len() {
            return Err(ConfigError::invalid(
                "ynests",
                format!(
                    "长度必须与 xnests 一致: {} != {}",
                    self.ynests.len(),
                    self.xnests.len()
                ),
            ));
        }
        if self.xnests.iter().chain(self.ynests.iter()).any(|&n| n == 0) {
            return Err(ConfigError::invalid("xnests", "嵌套倍数不能为 0"));
        }
        for (field, v) in [
            ("pop_density_threshold", self.pop_density_threshold),
            ("pop_threshold", self.pop_threshold),
            ("pop_conc_threshold", self.pop_conc_threshold),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::invalid(field, format!("必须非负, 实际 {}", v)));
            }
        }
        if self.census_pop_columns.is_empty() {
            return Err(ConfigError::invalid("census_pop_columns", "至少需要一个人口分组"));
        }
        if !self.census_pop_columns.contains(&self.pop_grid_column) {
            return Err(ConfigError::invalid(
                "pop_grid_column",
                format!("{} 不在 census_pop_columns 中", self.pop_grid_column),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(GridConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_spacing() {
        let config = GridConfig {
            dx: 0.0,
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nest_length_mismatch() {
        let config = GridConfig {
            xnests: vec![4, 2],
            ynests: vec![4],
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_nest_factor() {
        let config = GridConfig {
            xnests: vec![4, 0],
            ynests: vec![4, 2],
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pop_column_membership() {
        let config = GridConfig {
            pop_grid_column: "Elderly".to_string(),
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = GridConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GridConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.xnests, config.xnests);
        assert_eq!(back.pop_grid_column, config.pop_grid_column);
    }
}
