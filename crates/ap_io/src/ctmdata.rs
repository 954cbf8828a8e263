// crates/ap_io/src/ctmdata.rs

//! CTM 气象与基线化学数据模型
//!
//! 预处理阶段把综合化学输运模式的年均输出写成一个自描述的
//! 多维数组文件；本模块是该文件的内存表示。所有变量为三维
//! `[z, y, x]` 行主序数组，交错量在相应维度上多一个元素
//! （Arakawa C 网格：U 位于西面、V 位于南面、W 位于底面）。
//!
//! 文件根属性携带 CTM 网格的原点、间距、尺寸与数据版本号；
//! 版本不匹配在加载期即失败。

use crate::error::CtmError;
use std::collections::HashMap;

/// 当前软件要求的数据版本
pub const CTM_DATA_VERSION: &str = "1.4.0";

/// 变量在哪个维度上交错
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staggering {
    /// 单元中心量 [z, y, x]
    None,
    /// 西面交错 [z, y, x+1]
    X,
    /// 南面交错 [z, y+1, x]
    Y,
    /// 底面交错 [z+1, y, x]
    Z,
}

impl Staggering {
    /// 给定中心网格尺寸，返回期望形状
    #[must_use]
    pub fn expected_shape(&self, nz: usize, ny: usize, nx: usize) -> [usize; 3] {
        match self {
            Self::None => [nz, ny, nx],
            Self::X => [nz, ny, nx + 1],
            Self::Y => [nz, ny + 1, nx],
            Self::Z => [nz + 1, ny, nx],
        }
    }
}

/// 必需变量表（变量名与交错方式）
pub const REQUIRED_VARIABLES: &[(&str, Staggering)] = &[
    ("UAvg", Staggering::X),
    ("VAvg", Staggering::Y),
    ("WAvg", Staggering::Z),
    ("UDeviation", Staggering::None),
    ("VDeviation", Staggering::None),
    ("aOrgPartitioning", Staggering::None),
    ("bOrgPartitioning", Staggering::None),
    ("NOPartitioning", Staggering::None),
    ("SPartitioning", Staggering::None),
    ("NHPartitioning", Staggering::None),
    ("SO2oxidation", Staggering::None),
    ("ParticleDryDep", Staggering::None),
    ("SO2DryDep", Staggering::None),
    ("NOxDryDep", Staggering::None),
    ("NH3DryDep", Staggering::None),
    ("VOCDryDep", Staggering::None),
    ("ParticleWetDep", Staggering::None),
    ("SO2WetDep", Staggering::None),
    ("OtherGasWetDep", Staggering::None),
    ("Kxxyy", Staggering::None),
    ("Kzz", Staggering::Z),
    ("M2u", Staggering::None),
    ("M2d", Staggering::None),
    ("LayerHeights", Staggering::Z),
    ("Dz", Staggering::None),
    ("WindSpeed", Staggering::None),
    ("WindSpeedInverse", Staggering::None),
    ("WindSpeedMinusThird", Staggering::None),
    ("WindSpeedMinusOnePointFour", Staggering::None),
    ("Temperature", Staggering::None),
    ("S1", Staggering::None),
    ("Sclass", Staggering::None),
    ("TotalPM25", Staggering::None),
    ("gNH", Staggering::None),
    ("pNH", Staggering::None),
    ("gNO", Staggering::None),
    ("pNO", Staggering::None),
    ("gS", Staggering::None),
    ("pS", Staggering::None),
    ("aVOC", Staggering::None),
    ("aSOA", Staggering::None),
];

/// 单个 CTM 变量
#[derive(Clone, Debug)]
pub struct CtmVariable {
    /// 形状 [z, y, x]（含交错）
    pub shape: Vec<usize>,
    /// 变量描述
    pub description: String,
    /// 单位
    pub units: String,
    /// 行主序数据
    pub data: Vec<f64>,
}

impl CtmVariable {
    /// 创建变量并校验数据长度与形状一致
    pub fn new(
        name: &str,
        shape: Vec<usize>,
        description: impl Into<String>,
        units: impl Into<String>,
        data: Vec<f64>,
    ) -> Result<Self, CtmError> {
        let n: usize = shape.iter().product();
        if data.len() != n {
            return Err(CtmError::LengthMismatch {
                name: name.to_string(),
                expected: n,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape,
            description: description.into(),
            units: units.into(),
            data,
        })
    }

    /// 行主序线性索引
    #[inline]
    fn linear_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut idx = 0;
        let mut stride = 1;
        for (i, &dim) in self.shape.iter().enumerate().rev() {
            if indices[i] >= dim {
                return None;
            }
            idx += indices[i] * stride;
            stride *= dim;
        }
        Some(idx)
    }

    /// 按 (k, j, i) 取值
    #[inline]
    #[must_use]
    pub fn get3(&self, k: usize, j: usize, i: usize) -> Option<f64> {
        let idx = self.linear_index(&[k, j, i])?;
        Some(self.data[idx])
    }

    /// 总元素数
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// CTM 数据集
///
/// 网格属性 + 变量表。变量访问带名字与越界检查，出错时报告
/// 出错的变量名。
#[derive(Clone, Debug)]
pub struct CtmData {
    /// CTM 网格左下角 x [m]
    pub x0: f64,
    /// CTM 网格左下角 y [m]
    pub y0: f64,
    /// CTM 网格 x 向间距 [m]
    pub dx: f64,
    /// CTM 网格 y 向间距 [m]
    pub dy: f64,
    /// x 向单元数
    pub nx: usize,
    /// y 向单元数
    pub ny: usize,
    /// 垂直层数
    pub nz: usize,
    /// 文件数据版本
    pub data_version: String,
    variables: HashMap<String, CtmVariable>,
}

impl CtmData {
    /// 创建空数据集
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        x0: f64,
        y0: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
        nz: usize,
        data_version: impl Into<String>,
    ) -> Self {
        Self {
            x0,
            y0,
            dx,
            dy,
            nx,
            ny,
            nz,
            data_version: data_version.into(),
            variables: HashMap::new(),
        }
    }

    /// 加入一个变量
    pub fn add_variable(&mut self, name: impl Into<String>, var: CtmVariable) {
        self.variables.insert(name.into(), var);
    }

    /// 按名取变量
    pub fn variable(&self, name: &str) -> Result<&CtmVariable, CtmError> {
        self.variables
            .get(name)
            .ok_or_else(|| CtmError::MissingVariable(name.to_string()))
    }

    /// 是否包含变量
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// 全部变量名（无序）
    #[must_use]
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// 变量迭代
    pub fn variables(&self) -> impl Iterator<Item = (&String, &CtmVariable)> {
        self.variables.iter()
    }

    /// 按 (k, j, i) 取变量值
    pub fn get(&self, name: &str, k: usize, j: usize, i: usize) -> Result<f64, CtmError> {
        let var = self.variable(name)?;
        var.get3(k, j, i).ok_or_else(|| CtmError::IndexOutOfBounds {
            name: name.to_string(),
            indices: vec![k, j, i],
            shape: var.shape.clone(),
        })
    }

    /// CTM 列 (ix, iy) 的水平包围范围
    ///
    /// 返回 (x_min, y_min, x_max, y_max)。
    #[must_use]
    pub fn column_bounds(&self, ix: usize, iy: usize) -> (f64, f64, f64, f64) {
        let x_min = self.x0 + self.dx * ix as f64;
        let y_min = self.y0 + self.dy * iy as f64;
        (x_min, y_min, x_min + self.dx, y_min + self.dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(shape: Vec<usize>, data: Vec<f64>) -> CtmVariable {
        CtmVariable::new("t", shape, "", "", data).unwrap()
    }

    #[test]
    fn test_variable_length_check() {
        let result = CtmVariable::new("x", vec![2, 2], "", "", vec![0.0; 3]);
        assert!(matches!(result, Err(CtmError::LengthMismatch { .. })));
    }

    #[test]
    fn test_linear_indexing() {
        // 形状 [2, 3, 4], 行主序
        let data: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let v = var(vec![2, 3, 4], data);
        assert_eq!(v.get3(0, 0, 0), Some(0.0));
        assert_eq!(v.get3(0, 0, 3), Some(3.0));
        assert_eq!(v.get3(0, 1, 0), Some(4.0));
        assert_eq!(v.get3(1, 0, 0), Some(12.0));
        assert_eq!(v.get3(1, 2, 3), Some(23.0));
        assert_eq!(v.get3(2, 0, 0), None);
    }

    #[test]
    fn test_missing_variable() {
        let data = CtmData::new(0.0, 0.0, 1.0, 1.0, 4, 4, 2, CTM_DATA_VERSION);
        assert!(matches!(
            data.variable("UAvg"),
            Err(CtmError::MissingVariable(_))
        ));
    }

    #[test]
    fn test_get_reports_name() {
        let mut data = CtmData::new(0.0, 0.0, 1.0, 1.0, 2, 2, 1, CTM_DATA_VERSION);
        data.add_variable("Kzz", var(vec![2, 2, 2], vec![1.0; 8]));
        let err = data.get("Kzz", 5, 0, 0).unwrap_err();
        assert!(err.to_string().contains("Kzz"));
    }

    #[test]
    fn test_column_bounds() {
        let data = CtmData::new(-100.0, -200.0, 10.0, 20.0, 4, 4, 1, CTM_DATA_VERSION);
        let (x0, y0, x1, y1) = data.column_bounds(1, 2);
        assert_eq!((x0, y0, x1, y1), (-90.0, -160.0, -80.0, -120.0));
    }

    #[test]
    fn test_staggering_shapes() {
        assert_eq!(Staggering::None.expected_shape(10, 4, 5), [10, 4, 5]);
        assert_eq!(Staggering::X.expected_shape(10, 4, 5), [10, 4, 6]);
        assert_eq!(Staggering::Y.expected_shape(10, 4, 5), [10, 5, 5]);
        assert_eq!(Staggering::Z.expected_shape(10, 4, 5), [11, 4, 5]);
    }

    #[test]
    fn test_required_variable_table() {
        assert_eq!(REQUIRED_VARIABLES.len(), 41);
        assert!(REQUIRED_VARIABLES
            .iter()
            .any(|(n, s)| *n == "Kzz" && *s == Staggering::Z));
    }
}
