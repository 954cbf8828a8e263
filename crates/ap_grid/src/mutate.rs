// crates/ap_grid/src/mutate.rs

//! 网格细分与合并引擎
//!
//! 在物理步之间按判据变异网格：
//! - **细分**: 满足判据且未达最大嵌套深度的单元被其
//!   `xnests[l]·ynests[l]` 个子单元替换。子单元气象/人口从
//!   CTM 与普查数据重新推导，浓度均匀继承父单元的 Cf。
//! - **合并**: 同一父索引下的完整兄弟组全部不满足判据时坍缩回
//!   父单元，浓度取体积加权平均。本次变异新生的单元不参与
//!   合并，避免组内振荡。
//!
//! 两种判据：
//! - 人口密度判据: 低层 + (高密度标志 或 人口超阈值)
//! - 人口-浓度判据: 与任一水平邻居的
//!   `Σ|ΔC|·(V₁+V₂)·|ΔPop| / (Σ|质量|·总人口)` 超阈值
//!
//! 变异完成后必须重新计算时间步长。

use crate::build::create_cell;
use crate::cell::{Cell, Face};
use crate::emissions::Emissions;
use crate::error::GridError;
use crate::grid::Grid;
use crate::population::{Census, MortalityRates};
use crate::species::{SpeciesArray, N_SPECIES};
use crate::store::CellId;
use ap_config::GridConfig;
use ap_io::CtmData;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// 细分判据
#[derive(Clone, Copy, Debug)]
pub enum GridMutator {
    /// 人口密度判据
    Population {
        /// 参与高分辨率细分的最大层数
        hi_res_layers: usize,
        /// 单元人口阈值
        pop_threshold: f64,
        /// 判据人口分组索引
        pop_index: usize,
    },
    /// 人口-浓度联合判据
    PopConc {
        /// 无量纲阈值
        threshold: f64,
        /// 判据人口分组索引
        pop_index: usize,
    },
}

impl GridMutator {
    /// 由配置构造人口密度判据
    pub fn population(config: &GridConfig, grid: &Grid) -> Result<Self, GridError> {
        Ok(Self::Population {
            hi_res_layers: config.hi_res_layers,
            pop_threshold: config.pop_threshold,
            pop_index: grid.pop_index(&config.pop_grid_column)?,
        })
    }

    /// 由配置构造人口-浓度判据
    pub fn pop_conc(config: &GridConfig, grid: &Grid) -> Result<Self, GridError> {
        Ok(Self::PopConc {
            threshold: config.pop_conc_threshold,
            pop_index: grid.pop_index(&config.pop_grid_column)?,
        })
    }

    /// 判据使用的人口分组索引
    #[must_use]
    pub fn pop_index(&self) -> usize {
        match self {
            Self::Population { pop_index, .. } | Self::PopConc { pop_index, .. } => *pop_index,
        }
    }

    /// 该判据下是否允许合并
    ///
    /// 人口密度判据对完整兄弟组不稳定: 子单元各自低于阈值而
    /// 父单元超过阈值时, 合并后的父单元会在下一事件立即重新
    /// 细分。该判据因此只细分不合并。
    #[must_use]
    pub fn allows_merge(&self) -> bool {
        match self {
            Self::Population { .. } => false,
            Self::PopConc { .. } => true,
        }
    }

    /// 单元是否应当细分
    ///
    /// `total_mass` 与 `total_population` 为变异事件开始时的
    /// 域内总量快照。
    #[must_use]
    pub fn should_split(
        &self,
        grid: &Grid,
        cell: &Cell,
        total_mass: f64,
        total_population: f64,
    ) -> bool {
        match *self {
            Self::Population {
                hi_res_layers,
                pop_threshold,
                pop_index,
            } => {
                cell.layer < hi_res_layers
                    && (cell.above_density_threshold
                        || cell.pop_data.get(pop_index).copied().unwrap_or(0.0) > pop_threshold)
            }
            Self::PopConc {
                threshold,
                pop_index,
            } => {
                if total_mass == 0.0 || total_population == 0.0 {
                    return false;
                }
                let total_mass_pop = total_mass * total_population;
                let cf = cell.concentrations().cf;
                let pop = cell.pop_data.get(pop_index).copied().unwrap_or(0.0);
                for face in [Face::West, Face::East, Face::South, Face::North] {
                    for n in cell.neighbors(face) {
                        let other = &grid.store()[n.id];
                        if other.boundary {
                            continue;
                        }
                        let other_cf = other.concentrations().cf;
                        let sum_dc: f64 = (0..N_SPECIES)
                            .map(|s| (other_cf[s] - cf[s]).abs())
                            .sum();
                        let dpop = (pop
                            - other.pop_data.get(pop_index).copied().unwrap_or(0.0))
                        .abs();
                        if sum_dc * (cell.volume + other.volume) * dpop / total_mass_pop
                            > threshold
                        {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }
}

/// 一次变异事件的统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    /// 新生子单元数
    pub split_cells: usize,
    /// 合并产生的父单元数
    pub merged_cells: usize,
}

impl MutationOutcome {
    /// 网格是否发生了变化
    #[must_use]
    pub fn changed(&self) -> bool {
        self.split_cells > 0 || self.merged_cells > 0
    }
}

/// 细分单个单元
///
/// 删除该单元并创建下一层级的全部子单元；子单元浓度均匀继承
/// 父单元的 Cf，排放通量重新分配。返回子单元句柄。
pub fn split_cell(
    grid: &mut Grid,
    id: CellId,
    ctm: &CtmData,
    census: &Census,
    mortality: &MortalityRates,
    emissions: Option<&Emissions>,
) -> Result<Vec<CellId>, GridError> {
    let (index, layer, cf) = {
        let cell = grid.cell(id);
        (cell.index.clone(), cell.layer, cell.concentrations().cf)
    };
    let level = index.len();
    if level >= grid.config().max_levels() {
        return Err(GridError::Foundation(
            ap_foundation::PlumeError::invalid_input("单元已达最大嵌套深度"),
        ));
    }
    let xn = grid.config().xnests[level];
    let yn = grid.config().ynests[level];

    grid.delete_cells(&[id]);

    let mut children = Vec::with_capacity(xn * yn);
    for ii in 0..xn {
        for jj in 0..yn {
            let mut child_index = index.clone();
            child_index.push([ii as i32, jj as i32]);
            let child = create_cell(grid.config(), ctm, census, mortality, child_index, layer)?;
            child.set_concentrations(cf);
            children.push(child);
        }
    }
    let ids = grid.add_cells(children);
    if let Some(emis) = emissions {
        for &cid in &ids {
            emis.assign_flux(grid.cell_mut(cid));
        }
    }
    Ok(ids)
}

/// 合并一个完整兄弟组
///
/// 调用方给出父索引路径与层；兄弟组必须完整存在。父单元浓度为
/// 兄弟的体积加权平均，其余状态从外部数据重新推导。
pub fn merge_siblings(
    grid: &mut Grid,
    parent_index: &[[i32; 2]],
    layer: usize,
    ctm: &CtmData,
    census: &Census,
    mortality: &MortalityRates,
    emissions: Option<&Emissions>,
) -> Result<CellId, GridError> {
    let child_len = parent_index.len() + 1;
    let members: Vec<CellId> = grid
        .cells()
        .iter()
        .copied()
        .filter(|&id| {
            let c = grid.cell(id);
            c.layer == layer
                && c.index.len() == child_len
                && c.index[..parent_index.len()] == *parent_index
        })
        .collect();

    let expected = grid.config().xnests[parent_index.len()] * grid.config().ynests[parent_index.len()];
    if members.len() != expected {
        return Err(GridError::Foundation(
            ap_foundation::PlumeError::invalid_input(format!(
                "兄弟组不完整: 期望 {} 个, 找到 {} 个",
                expected,
                members.len()
            )),
        ));
    }

    let weighted = volume_weighted_cf(grid, &members);
    grid.delete_cells(&members);

    let parent = create_cell(
        grid.config(),
        ctm,
        census,
        mortality,
        parent_index.to_vec(),
        layer,
    )?;
    parent.set_concentrations(weighted);
    let ids = grid.add_cells(vec![parent]);
    let pid = ids[0];
    if let Some(emis) = emissions {
        emis.assign_flux(grid.cell_mut(pid));
    }
    Ok(pid)
}

/// 兄弟组的体积加权平均 Cf
fn volume_weighted_cf(grid: &Grid, members: &[CellId]) -> SpeciesArray {
    let mut vol_sum = 0.0;
    let mut weighted = [0.0; N_SPECIES];
    for &id in members {
        let c = grid.cell(id);
        let cf = c.concentrations().cf;
        vol_sum += c.volume;
        for s in 0..N_SPECIES {
            weighted[s] += cf[s] * c.volume;
        }
    }
    if vol_sum > 0.0 {
        for w in &mut weighted {
            *w /= vol_sum;
        }
    }
    weighted
}

/// 执行一次完整的变异事件
///
/// 细分循环运行到无单元满足判据为止，随后运行合并循环。
/// 整个事件在物理步之间进行，不与任何遍历交叠。
pub fn mutate_grid(
    grid: &mut Grid,
    mutator: &GridMutator,
    ctm: &CtmData,
    census: &Census,
    mortality: &MortalityRates,
    emissions: Option<&Emissions>,
) -> Result<MutationOutcome, GridError> {
    let pop_index = mutator.pop_index();
    let (total_mass, total_population) = grid.total_mass_and_population(pop_index);
    let max_levels = grid.config().max_levels();

    let mut outcome = MutationOutcome::default();
    let mut created: BTreeSet<CellId> = BTreeSet::new();

    // 细分循环
    loop {
        let mut to_split: Vec<CellId> = Vec::new();
        for &id in grid.cells() {
            let cell = grid.cell(id);
            if cell.index.len() >= max_levels {
                continue;
            }
            if mutator.should_split(grid, cell, total_mass, total_population) {
                to_split.push(id);
            }
        }
        if to_split.is_empty() {
            break;
        }
        for id in to_split {
            let ids = split_cell(grid, id, ctm, census, mortality, emissions)?;
            outcome.split_cells += ids.len();
            created.extend(ids);
        }
    }

    // 合并循环: 每轮基于当前状态决策, 直到没有可合并的组
    while mutator.allows_merge() {
        let mut groups: HashMap<(Vec<[i32; 2]>, usize), Vec<CellId>> = HashMap::new();
        for &id in grid.cells() {
            let cell = grid.cell(id);
            if cell.index.len() < 2 || created.contains(&id) {
                continue;
            }
            let parent = cell.index[..cell.index.len() - 1].to_vec();
            groups.entry((parent, cell.layer)).or_default().push(id);
        }

        let mut mergeable: Vec<(Vec<[i32; 2]>, usize)> = Vec::new();
        for ((parent_index, layer), members) in &groups {
            let level = parent_index.len();
            let expected = grid.config().xnests[level] * grid.config().ynests[level];
            if members.len() != expected {
                continue;
            }
            let any_splits = members.iter().any(|&id| {
                mutator.should_split(grid, grid.cell(id), total_mass, total_population)
            });
            if !any_splits {
                mergeable.push((parent_index.clone(), *layer));
            }
        }
        if mergeable.is_empty() {
            break;
        }
        for (parent_index, layer) in mergeable {
            merge_siblings(grid, &parent_index, layer, ctm, census, mortality, emissions)?;
            outcome.merged_cells += 1;
        }
    }

    if outcome.changed() {
        info!(
            split = outcome.split_cells,
            merged = outcome.merged_cells,
            cells = grid.cells().len(),
            "网格变异完成"
        );
    }
    Ok(outcome)
}
