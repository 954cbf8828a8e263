// crates/ap_physics/src/operators/emissions.rs

//! 排放注入算子
//!
//! 每个时间步的第一道算子：把排放通量累积进 Cf，随后把 Ci
//! 对齐到 Cf。后者即是时间步的翻页动作：上一步各算子累积的
//! Cf 成为本步所有算子读取的冻结 Ci。

use super::CellOperator;
use ap_grid::{Cell, CellStore, N_SPECIES};

/// 排放注入
#[derive(Clone, Copy, Debug, Default)]
pub struct AddEmissionsFlux;

impl CellOperator for AddEmissionsFlux {
    fn name(&self) -> &'static str {
        "add_emissions_flux"
    }

    fn apply(&self, _store: &CellStore, cell: &Cell, dt: f64) {
        let mut guard = cell.conc.write();
        for s in 0..N_SPECIES {
            guard.cf[s] += cell.emis_flux[s] * dt;
            guard.ci[s] = guard.cf[s];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use ap_grid::Species;

    #[test]
    fn test_flux_accumulates_and_flips() {
        let mut cell = bare_cell(100.0, 50.0, 0);
        cell.emis_flux[Species::GasSulfur.index()] = 2.0;
        let (store, ids) = store_of(vec![cell]);
        let cell = &store[ids[0]];

        AddEmissionsFlux.apply(&store, cell, 10.0);
        let conc = cell.concentrations();
        assert_eq!(conc.cf[Species::GasSulfur.index()], 20.0);
        assert_eq!(conc.ci[Species::GasSulfur.index()], 20.0);

        AddEmissionsFlux.apply(&store, cell, 10.0);
        let conc = cell.concentrations();
        assert_eq!(conc.cf[Species::GasSulfur.index()], 40.0);
    }

    #[test]
    fn test_flip_aligns_ci_to_cf() {
        let cell = bare_cell(100.0, 50.0, 0);
        cell.with_conc_mut(|c| c.cf[0] = 7.0);
        let (store, ids) = store_of(vec![cell]);
        let cell = &store[ids[0]];
        // 零排放时仅翻页
        AddEmissionsFlux.apply(&store, cell, 100.0);
        let conc = cell.concentrations();
        assert_eq!(conc.ci[0], 7.0);
        assert_eq!(conc.cf[0], 7.0);
    }
}
