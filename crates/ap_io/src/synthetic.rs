// crates/ap_io/src/synthetic.rs

//! 合成 CTM 数据集
//!
//! 按给定参数构造一份通过全部加载校验的数据集，主要用于
//! 测试与示例。风场、扩散系数与分配分数在空间上均匀；
//! ACM2 的 M2d 剖面由守恒恒等式反解，逐层精确闭合。
//!
//! 垂直层高为等厚剖面，层厚由 `layer_dz` 给出。

use crate::ctmdata::{CtmData, CtmVariable, Staggering, CTM_DATA_VERSION, REQUIRED_VARIABLES};

/// 合成数据集参数
#[derive(Clone, Debug)]
pub struct SyntheticCtmConfig {
    /// x 向单元数
    pub nx: usize,
    /// y 向单元数
    pub ny: usize,
    /// 垂直层数
    pub nz: usize,
    /// x 向间距 [m]
    pub dx: f64,
    /// y 向间距 [m]
    pub dy: f64,
    /// 左下角 x [m]
    pub x0: f64,
    /// 左下角 y [m]
    pub y0: f64,
    /// 层厚 [m]
    pub layer_dz: f64,
    /// 东西风速（西面） [m/s]
    pub u: f64,
    /// 南北风速（南面） [m/s]
    pub v: f64,
    /// 垂直风速（底面） [m/s]
    pub w: f64,
    /// 东西风速平均绝对偏差 [m/s]
    pub u_deviation: f64,
    /// 南北风速平均绝对偏差 [m/s]
    pub v_deviation: f64,
    /// 垂直扩散系数 [m²/s]
    pub kzz: f64,
    /// 水平扩散系数 [m²/s]
    pub kxxyy: f64,
    /// ACM2 上行对流速率 [1/s]
    pub m2u: f64,
    /// 边界层覆盖的层数（其上 M2u = M2d = 0）
    pub pbl_layers: usize,
    /// 气粒分配分数（五种分配共用）
    pub partitioning: f64,
    /// SO2 氧化速率 [1/s]
    pub so2_oxidation: f64,
    /// 干沉降速度（五类共用） [m/s]
    pub dry_dep: f64,
    /// 湿沉降速率（三类共用） [1/s]
    pub wet_dep: f64,
    /// 温度 [K]
    pub temperature: f64,
    /// 基线浓度（九个分量共用） [μg/m³]
    pub baseline: f64,
}

impl Default for SyntheticCtmConfig {
    fn default() -> Self {
        Self {
            nx: 4,
            ny: 4,
            nz: 10,
            dx: 4000.0,
            dy: 4000.0,
            x0: -8000.0,
            y0: -8000.0,
            layer_dz: 50.0,
            u: 2.0,
            v: 1.5,
            w: 0.0,
            u_deviation: 0.5,
            v_deviation: 0.5,
            kzz: 1.0,
            kxxyy: 50.0,
            m2u: 1e-4,
            pbl_layers: 7,
            partitioning: 0.5,
            so2_oxidation: 1e-6,
            dry_dep: 0.01,
            wet_dep: 1e-6,
            temperature: 288.0,
            baseline: 5.0,
        }
    }
}

impl SyntheticCtmConfig {
    /// 无风、无偏差、无沉降、无对流的静态配置
    ///
    /// 适合守恒性与良平衡测试的出发点。
    #[must_use]
    pub fn quiescent() -> Self {
        Self {
            u: 0.0,
            v: 0.0,
            w: 0.0,
            u_deviation: 0.0,
            v_deviation: 0.0,
            m2u: 0.0,
            pbl_layers: 0,
            so2_oxidation: 0.0,
            dry_dep: 0.0,
            wet_dep: 0.0,
            ..Self::default()
        }
    }

    /// 构造数据集
    ///
    /// M2d 剖面由恒等式 `M2u = M2d(k) − M2d(k+1)·Δz(k+1)/Δz(k)`
    /// 自顶向下反解（等厚层时 `M2d(k) = M2u·(K−k)`，K 为边界层
    /// 覆盖层数），因此 ACM2 校验精确通过。
    #[must_use]
    pub fn build(&self) -> CtmData {
        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        let mut data = CtmData::new(
            self.x0,
            self.y0,
            self.dx,
            self.dy,
            nx,
            ny,
            nz,
            CTM_DATA_VERSION,
        );

        let pbl = self.pbl_layers.min(nz);
        let value_of = |name: &str, k: usize| -> f64 {
            match name {
                "UAvg" => self.u,
                "VAvg" => self.v,
                "WAvg" => self.w,
                "UDeviation" => self.u_deviation,
                "VDeviation" => self.v_deviation,
                "aOrgPartitioning" | "bOrgPartitioning" | "NOPartitioning"
                | "SPartitioning" | "NHPartitioning" => self.partitioning,
                "SO2oxidation" => self.so2_oxidation,
                "ParticleDryDep" | "SO2DryDep" | "NOxDryDep" | "NH3DryDep" | "VOCDryDep" => {
                    self.dry_dep
                }
                "ParticleWetDep" | "SO2WetDep" | "OtherGasWetDep" => self.wet_dep,
                "Kxxyy" => self.kxxyy,
                "Kzz" => self.kzz,
                "M2u" => {
                    if k < pbl {
                        self.m2u
                    } else {
                        0.0
                    }
                }
                "M2d" => {
                    if k < pbl {
                        self.m2u * (pbl - k) as f64
                    } else {
                        0.0
                    }
                }
                "LayerHeights" => self.layer_dz * k as f64,
                "Dz" => self.layer_dz,
                "WindSpeed" => (self.u * self.u + self.v * self.v).sqrt().max(0.1),
                "WindSpeedInverse" => {
                    1.0 / (self.u * self.u + self.v * self.v).sqrt().max(0.1)
                }
                "WindSpeedMinusThird" => {
                    (self.u * self.u + self.v * self.v).sqrt().max(0.1).powf(-1.0 / 3.0)
                }
                "WindSpeedMinusOnePointFour" => {
                    (self.u * self.u + self.v * self.v).sqrt().max(0.1).powf(-1.4)
                }
                "Temperature" => self.temperature,
                "S1" => 0.0,
                "Sclass" => 0.0,
                "TotalPM25" | "gNH" | "pNH" | "gNO" | "pNO" | "gS" | "pS" | "aVOC"
                | "aSOA" => self.baseline,
                _ => 0.0,
            }
        };

        for &(name, staggering) in REQUIRED_VARIABLES {
            let shape = staggering.expected_shape(nz, ny, nx);
            let mut values = Vec::with_capacity(shape.iter().product());
            for k in 0..shape[0] {
                // 交错维度的最外层取中心层同值即可
                let kc = if matches!(staggering, Staggering::Z) && name != "LayerHeights" {
                    k.min(nz.saturating_sub(1))
                } else {
                    k
                };
                let v = value_of(name, kc);
                for _ in 0..shape[1] * shape[2] {
                    values.push(v);
                }
            }
            let var = CtmVariable::new(name, shape.to_vec(), format!("合成变量 {}", name), "", values)
                .expect("形状与数据长度由构造保证一致");
            data.add_variable(name, var);
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_shapes() {
        let data = SyntheticCtmConfig::default().build();
        assert_eq!(data.variable("UAvg").unwrap().shape, vec![10, 4, 5]);
        assert_eq!(data.variable("VAvg").unwrap().shape, vec![10, 5, 4]);
        assert_eq!(data.variable("WAvg").unwrap().shape, vec![11, 4, 4]);
        assert_eq!(data.variable("Kzz").unwrap().shape, vec![11, 4, 4]);
        assert_eq!(data.variable("Temperature").unwrap().shape, vec![10, 4, 4]);
    }

    #[test]
    fn test_layer_heights_monotone() {
        let data = SyntheticCtmConfig::default().build();
        let lh = data.variable("LayerHeights").unwrap();
        for k in 0..10 {
            let lo = lh.get3(k, 0, 0).unwrap();
            let hi = lh.get3(k + 1, 0, 0).unwrap();
            assert!(hi > lo);
        }
    }

    #[test]
    fn test_m2d_profile_balances() {
        let cfg = SyntheticCtmConfig::default();
        let data = cfg.build();
        let m2u = data.variable("M2u").unwrap();
        let m2d = data.variable("M2d").unwrap();
        // 等厚层: M2d(k) − M2d(k+1) = M2u
        for k in 0..cfg.pbl_layers {
            let up = m2u.get3(k, 1, 1).unwrap();
            let down = m2d.get3(k, 1, 1).unwrap();
            let down_above = if k + 1 < 10 {
                m2d.get3(k + 1, 1, 1).unwrap()
            } else {
                0.0
            };
            assert!((up - (down - down_above)).abs() < 1e-15);
        }
        // 边界层以上无对流
        assert_eq!(m2u.get3(9, 0, 0).unwrap(), 0.0);
        assert_eq!(m2d.get3(9, 0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_quiescent_has_no_motion() {
        let data = SyntheticCtmConfig::quiescent().build();
        assert_eq!(data.variable("UAvg").unwrap().get3(0, 0, 0).unwrap(), 0.0);
        assert_eq!(data.variable("M2u").unwrap().get3(0, 0, 0).unwrap(), 0.0);
        assert_eq!(
            data.variable("ParticleWetDep").unwrap().get3(0, 0, 0).unwrap(),
            0.0
        );
    }
}
