// crates/ap_physics/src/operators/deposition.rs

//! 沉降算子
//!
//! 干沉降只作用于层 0，按组分的沉降速度乘以 Δt/Δz 衰减；
//! 湿沉降作用于所有层，按三类速率（颗粒物 / SO2 / 其他气体）
//! 乘以 Δt 衰减。两者都是对 Cf 的乘性衰减。

use super::CellOperator;
use ap_grid::{Cell, CellStore, Species};

/// 组分的干沉降速度 [m/s]
fn dry_velocity(cell: &Cell, species: Species) -> f64 {
    let chem = &cell.chem;
    match species {
        Species::GasOrganic => chem.voc_dry_dep,
        Species::GasAmmonia => chem.nh3_dry_dep,
        Species::GasSulfur => chem.so2_dry_dep,
        Species::GasNitrogen => chem.nox_dry_dep,
        Species::ParticleOrganic
        | Species::Pm25
        | Species::ParticleAmmonium
        | Species::ParticleSulfate
        | Species::ParticleNitrate => chem.particle_dry_dep,
    }
}

/// 组分的湿沉降速率 [1/s]
fn wet_rate(cell: &Cell, species: Species) -> f64 {
    let chem = &cell.chem;
    match species {
        Species::GasSulfur => chem.so2_wet_dep,
        Species::GasOrganic | Species::GasAmmonia | Species::GasNitrogen => {
            chem.other_gas_wet_dep
        }
        Species::ParticleOrganic
        | Species::Pm25
        | Species::ParticleAmmonium
        | Species::ParticleSulfate
        | Species::ParticleNitrate => chem.particle_wet_dep,
    }
}

/// 干沉降（仅层 0）
#[derive(Clone, Copy, Debug, Default)]
pub struct DryDeposition;

impl CellOperator for DryDeposition {
    fn name(&self) -> &'static str {
        "dry_deposition"
    }

    fn apply(&self, _store: &CellStore, cell: &Cell, dt: f64) {
        if cell.layer != 0 || cell.dz <= 0.0 {
            return;
        }
        let factor = dt / cell.dz;
        let mut guard = cell.conc.write();
        for species in Species::ALL {
            let s = species.index();
            guard.cf[s] *= 1.0 - dry_velocity(cell, species) * factor;
        }
    }
}

/// 湿沉降
#[derive(Clone, Copy, Debug, Default)]
pub struct WetDeposition;

impl CellOperator for WetDeposition {
    fn name(&self) -> &'static str {
        "wet_deposition"
    }

    fn apply(&self, _store: &CellStore, cell: &Cell, dt: f64) {
        let mut guard = cell.conc.write();
        for species in Species::ALL {
            let s = species.index();
            guard.cf[s] *= 1.0 - wet_rate(cell, species) * dt;
        }
    }
}
