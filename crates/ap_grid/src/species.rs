// crates/ap_grid/src/species.rs

//! 污染物组分注册表
//!
//! 模型追踪九个组分：四对气粒共轭（有机物、铵、硫、硝酸盐）
//! 加上一次 PM2.5。浓度数组按固定顺序布局，索引即组分。

use serde::{Deserialize, Serialize};

/// 组分数
pub const N_SPECIES: usize = 9;

/// 浓度数组（按 [`Species`] 索引）
pub type SpeciesArray = [f64; N_SPECIES];

/// 污染物组分
///
/// 枚举判别值即浓度数组索引。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum Species {
    /// 气相有机物（VOC）
    GasOrganic = 0,
    /// 颗粒相二次有机气溶胶
    ParticleOrganic = 1,
    /// 一次 PM2.5
    Pm25 = 2,
    /// 气相氨
    GasAmmonia = 3,
    /// 颗粒相铵
    ParticleAmmonium = 4,
    /// 气相硫（SO2）
    GasSulfur = 5,
    /// 颗粒相硫酸盐
    ParticleSulfate = 6,
    /// 气相氮氧化物
    GasNitrogen = 7,
    /// 颗粒相硝酸盐
    ParticleNitrate = 8,
}

impl Species {
    /// 全部组分（数组索引顺序）
    pub const ALL: [Species; N_SPECIES] = [
        Species::GasOrganic,
        Species::ParticleOrganic,
        Species::Pm25,
        Species::GasAmmonia,
        Species::ParticleAmmonium,
        Species::GasSulfur,
        Species::ParticleSulfate,
        Species::GasNitrogen,
        Species::ParticleNitrate,
    ];

    /// 颗粒相组分（计入总 PM2.5）
    pub const PARTICLES: [Species; 5] = [
        Species::ParticleOrganic,
        Species::Pm25,
        Species::ParticleAmmonium,
        Species::ParticleSulfate,
        Species::ParticleNitrate,
    ];

    /// 气粒共轭对 (气相, 颗粒相)
    pub const CONJUGATE_PAIRS: [(Species, Species); 4] = [
        (Species::GasOrganic, Species::ParticleOrganic),
        (Species::GasAmmonia, Species::ParticleAmmonium),
        (Species::GasSulfur, Species::ParticleSulfate),
        (Species::GasNitrogen, Species::ParticleNitrate),
    ];

    /// 浓度数组索引
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 输出名
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Species::GasOrganic => "gOrg",
            Species::ParticleOrganic => "pOrg",
            Species::Pm25 => "PM2.5",
            Species::GasAmmonia => "gNH",
            Species::ParticleAmmonium => "pNH",
            Species::GasSulfur => "gS",
            Species::ParticleSulfate => "pS",
            Species::GasNitrogen => "gNO",
            Species::ParticleNitrate => "pNO",
        }
    }
}

/// 按排放类别给出的源强 [μg/s]
///
/// 排放类别到组分的映射: VOC→gOrg, NOx→gNO, NH3→gNH,
/// SOx→gS, PM2.5→PM2.5。
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionRates {
    /// 挥发性有机物 [μg/s]
    pub voc: f64,
    /// 氮氧化物 [μg/s]
    pub nox: f64,
    /// 氨 [μg/s]
    pub nh3: f64,
    /// 硫氧化物 [μg/s]
    pub sox: f64,
    /// 一次 PM2.5 [μg/s]
    pub pm25: f64,
}

impl EmissionRates {
    /// 五个类别同值的源强
    #[must_use]
    pub const fn uniform(rate: f64) -> Self {
        Self {
            voc: rate,
            nox: rate,
            nh3: rate,
            sox: rate,
            pm25: rate,
        }
    }

    /// 映射到组分的 (组分, 源强) 序列
    #[must_use]
    pub fn by_species(&self) -> [(Species, f64); 5] {
        [
            (Species::GasOrganic, self.voc),
            (Species::GasNitrogen, self.nox),
            (Species::GasAmmonia, self.nh3),
            (Species::GasSulfur, self.sox),
            (Species::Pm25, self.pm25),
        ]
    }

    /// 总源强
    #[must_use]
    pub fn total(&self) -> f64 {
        self.voc + self.nox + self.nh3 + self.sox + self.pm25
    }
}
