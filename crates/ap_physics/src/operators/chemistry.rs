// crates/ap_physics/src/operators/chemistry.rs

//! 化学与气粒分配算子
//!
//! 两步：
//! 1. 一阶转化: SO2 氧化为颗粒硫酸盐（速率取单元系数），VOC
//!    氧化为二次有机气溶胶（速率取配置常量）。
//! 2. 平衡分配: 四对气粒共轭按单元的颗粒相分数重新分配总量。
//!
//! 分配步对固定总量幂等: Δt = 0 时整个算子是恒等映射的不动点。

use super::CellOperator;
use ap_grid::{Cell, CellStore, Species};

/// 化学/气粒分配
#[derive(Clone, Copy, Debug)]
pub struct Chemistry {
    /// VOC 氧化速率 [1/s]
    voc_oxidation_rate: f64,
}

impl Chemistry {
    /// 以给定 VOC 氧化速率创建
    #[must_use]
    pub fn new(voc_oxidation_rate: f64) -> Self {
        Self { voc_oxidation_rate }
    }
}

impl CellOperator for Chemistry {
    fn name(&self) -> &'static str {
        "chemistry"
    }

    fn apply(&self, _store: &CellStore, cell: &Cell, dt: f64) {
        let chem = &cell.chem;
        let mut guard = cell.conc.write();
        let cf = &mut guard.cf;

        // SO2 → pS 一阶氧化
        let d_so2 = cf[Species::GasSulfur.index()] * (1.0 - (-chem.so2_oxidation * dt).exp());
        cf[Species::GasSulfur.index()] -= d_so2;
        cf[Species::ParticleSulfate.index()] += d_so2;

        // VOC → SOA 一阶氧化
        let d_voc =
            cf[Species::GasOrganic.index()] * (1.0 - (-self.voc_oxidation_rate * dt).exp());
        cf[Species::GasOrganic.index()] -= d_voc;
        cf[Species::ParticleOrganic.index()] += d_voc;

        // 平衡分配
        let pairs = [
            (
                Species::GasOrganic,
                Species::ParticleOrganic,
                chem.a_org_partitioning,
            ),
            (
                Species::GasAmmonia,
                Species::ParticleAmmonium,
                chem.nh_partitioning,
            ),
            (
                Species::GasSulfur,
                Species::ParticleSulfate,
                chem.s_partitioning,
            ),
            (
                Species::GasNitrogen,
                Species::ParticleNitrate,
                chem.no_partitioning,
            ),
        ];
        for (gas, particle, fraction) in pairs {
            let total = cf[gas.index()] + cf[particle.index()];
            cf[particle.index()] = total * fraction;
            cf[gas.index()] = total * (1.0 - fraction);
        }
    }
}
