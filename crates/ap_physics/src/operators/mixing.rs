// crates/ap_physics/src/operators/mixing.rs

//! 混合算子
//!
//! [`Mixing`]: 交错半层上的扩散 + ACM2 对流。
//! - 垂直扩散用界面 Kzz（单元中心值的调和平均），水平扩散用
//!   界面 Kxxyy，同一格式。
//! - ACM2 (Pleim 2007): 非局地上行项把地面层质量直接送入边界层
//!   内的每一层（M2u × 地面层 Ci），局地下行项逐层下传
//!   （上层的 M2d × Ci × Δz 比值流入，本层的 M2d × Ci 流出）。
//!   层厚比保证不等厚层间的质量闭合；M2u 与 M2d 的守恒恒等式
//!   已在数据加载期强制。
//!
//! [`MeanderMixing`]: 年均意义下蛇行风的对称交换项。平均风速
//! 接近零而绝对偏差大的面上，偏差速度以扩散形式交换两侧质量；
//! 面速度同平流取面所属单元的交错量。

use super::CellOperator;
use ap_grid::{Cell, CellStore, N_SPECIES};

/// 扩散 + ACM2 对流
#[derive(Clone, Copy, Debug, Default)]
pub struct Mixing;

impl CellOperator for Mixing {
    fn name(&self) -> &'static str {
        "mixing"
    }

    fn apply(&self, store: &CellStore, cell: &Cell, dt: f64) {
        let own = cell.concentrations().ci;
        let mut delta = [0.0; N_SPECIES];

        // ACM2 上行: 地面层质量直接注入（层 0 的地面层邻居是自身）
        for n in &cell.ground_level {
            let gci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                delta[s] += cell.met.m2u * gci[s] * n.frac;
            }
        }
        // 上面: ACM2 下行流入 + 界面扩散
        for n in &cell.above {
            let other = &store[n.id];
            let nci = other.concentrations().ci;
            let dz_ratio = other.dz / cell.dz;
            for s in 0..N_SPECIES {
                delta[s] += other.met.m2d * nci[s] * dz_ratio * n.frac;
                delta[s] += n.diff * (nci[s] - own[s]) / n.dist / cell.dz * n.frac;
            }
        }
        // 下面: 界面扩散（层 0 的反射自引用贡献为零）
        for n in &cell.below {
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                delta[s] += n.diff * (nci[s] - own[s]) / n.dist / cell.dz * n.frac;
            }
        }
        // 水平扩散
        for n in cell.west.iter().chain(cell.east.iter()) {
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                delta[s] += n.diff * (nci[s] - own[s]) / n.dist / cell.dx * n.frac;
            }
        }
        for n in cell.south.iter().chain(cell.north.iter()) {
            let nci = store[n.id].concentrations().ci;
            for s in 0..N_SPECIES {
                delta[s] += n.diff * (nci[s] - own[s]) / n.dist / cell.dy * n.frac;
            }
        }
        // ACM2 下行流出
        for s in 0..N_SPECIES {
            delta[s] -= cell.met.m2d * own[s];
        }

        let mut guard = cell.conc.write();
        for s in 0..N_SPECIES {
            guard.cf[s] += delta[s] * dt;
        }
    }
}

/// 蛇行混合
#[derive(Clone, Copy, Debug, Default)]
pub struct MeanderMixing;

impl CellOperator for MeanderMixing {
    fn name(&self) -> &'static str {
        "meander_mixing"
    }

    fn apply(&self, store: &CellStore, cell: &Cell, dt: f64) {
        let own = cell.concentrations().ci;
        let mut delta = [0.0; N_SPECIES];

        for n in &cell.west {
            let nci = store[n.id].concentrations().ci;
            let dev = cell.met.u_deviation;
            for s in 0..N_SPECIES {
                delta[s] += dev * (nci[s] - own[s]) / cell.dx * n.frac;
            }
        }
        for n in &cell.east {
            let other = &store[n.id];
            let nci = other.concentrations().ci;
            let dev = other.met.u_deviation;
            for s in 0..N_SPECIES {
                delta[s] += dev * (nci[s] - own[s]) / cell.dx * n.frac;
            }
        }
        for n in &cell.south {
            let nci = store[n.id].concentrations().ci;
            let dev = cell.met.v_deviation;
            for s in 0..N_SPECIES {
                delta[s] += dev * (nci[s] - own[s]) / cell.dy * n.frac;
            }
        }
        for n in &cell.north {
            let other = &store[n.id];
            let nci = other.concentrations().ci;
            let dev = other.met.v_deviation;
            for s in 0..N_SPECIES {
                delta[s] += dev * (nci[s] - own[s]) / cell.dy * n.frac;
            }
        }

        let mut guard = cell.conc.write();
        for s in 0..N_SPECIES {
            guard.cf[s] += delta[s] * dt;
        }
    }
}
