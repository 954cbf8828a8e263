// crates/ap_physics/src/operators/advection.rs

//! 迎风平流算子
//!
//! Arakawa C 交错网格上的一阶迎风格式。面速度取面所属单元的
//! 交错量：西/南/底面用本单元的 ū/v̄/w̄，东/北/顶面用相应邻居的
//! 同名量（即共享面的另一侧记录）。流入通量取上风单元的 Ci，
//! 流出通量取本单元的 Ci；多邻居面按覆盖分数聚合。
//!
//! 通量密度除以本单元边长，质量交换因此在不等尺寸单元间精确
//! 反对称（共享段长 × 层厚的公共因子）。

use super::CellOperator;
use ap_grid::{Cell, CellStore, N_SPECIES};

/// 一阶迎风平流
#[derive(Clone, Copy, Debug, Default)]
pub struct UpwindAdvection;

impl CellOperator for UpwindAdvection {
    fn name(&self) -> &'static str {
        "upwind_advection"
    }

    fn apply(&self, store: &CellStore, cell: &Cell, dt: f64) {
        let own = cell.concentrations().ci;
        let mut delta = [0.0; N_SPECIES];

        // 西面: 正速度从邻居流入
        for n in &cell.west {
            let u = cell.met.u_avg;
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if u > 0.0 { nci[s] } else { own[s] };
                delta[s] += u * upwind / cell.dx * n.frac;
            }
        }
        // 东面: 正速度向邻居流出
        for n in &cell.east {
            let other = &store[n.id];
            let u = other.met.u_avg;
            let nci = other.concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if u > 0.0 { own[s] } else { nci[s] };
                delta[s] -= u * upwind / cell.dx * n.frac;
            }
        }
        // 南面
        for n in &cell.south {
            let v = cell.met.v_avg;
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if v > 0.0 { nci[s] } else { own[s] };
                delta[s] += v * upwind / cell.dy * n.frac;
            }
        }
        // 北面
        for n in &cell.north {
            let other = &store[n.id];
            let v = other.met.v_avg;
            let nci = other.concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if v > 0.0 { own[s] } else { nci[s] };
                delta[s] -= v * upwind / cell.dy * n.frac;
            }
        }
        // 底面（层 0 的底面邻居是其自身: 反射边界）
        for n in &cell.below {
            let w = cell.met.w_avg;
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if w > 0.0 { nci[s] } else { own[s] };
                delta[s] += w * upwind / cell.dz * n.frac;
            }
        }
        // 顶面
        for n in &cell.above {
            let other = &store[n.id];
            let w = other.met.w_avg;
            let nci = other.concentrations().ci;
            for s in 0..N_SPECIES {
                let upwind = if w > 0.0 { own[s] } else { nci[s] };
                delta[s] -= w * upwind / cell.dz * n.frac;
            }
        }

        let mut guard = cell.conc.write();
        for s in 0..N_SPECIES {
            guard.cf[s] += delta[s] * dt;
        }
    }
}
