// crates/ap_grid/src/build.rs

//! 网格构造
//!
//! 单元由嵌套索引路径确定性地得到足迹，再叠加三类外部数据：
//! - CTM 年均气象/化学系数: 面积加权平均（单元与 CTM 列重叠）
//! - 人口普查: 面积分摊，守恒总人口
//! - 死亡率: 面积分摊，守恒均值
//!
//! 规则网格构造器生成外层 nx × ny × nz 单元并完成邻居解析，
//! 是变分辨率模拟的初始状态。

use crate::cell::Cell;
use crate::emissions::Emissions;
use crate::error::GridError;
use crate::grid::Grid;
use crate::population::{Census, MortalityRates};
use crate::species::Species;
use ap_config::GridConfig;
use ap_geo::Rect;
use ap_io::CtmData;
use tracing::info;

/// 由嵌套索引路径计算单元足迹
///
/// `x_left = x0 + Σᵢ indexᵢ.x · dx / Πⱼ≤ᵢ xnests_j`（y 同理），
/// 第 0 级的除数为 1（外层网格本身）。
#[must_use]
pub fn cell_geometry(config: &GridConfig, index: &[[i32; 2]]) -> Rect {
    let mut x_res = 1.0;
    let mut y_res = 1.0;
    let mut left = config.x0;
    let mut bottom = config.y0;
    for (level, ij) in index.iter().enumerate() {
        if level > 0 {
            x_res *= config.xnests[level] as f64;
            y_res *= config.ynests[level] as f64;
        }
        left += ij[0] as f64 * config.dx / x_res;
        bottom += ij[1] as f64 * config.dy / y_res;
    }
    let right = left + config.dx / x_res;
    let top = bottom + config.dy / y_res;
    Rect::from_bounds(left, bottom, right, top)
}

/// 创建并装载一个单元
///
/// 几何由嵌套路径确定；气象/化学、人口与死亡率按面积权重叠加。
/// 单元与 CTM 网格无重叠视为输入损坏。
pub fn create_cell(
    config: &GridConfig,
    ctm: &CtmData,
    census: &Census,
    mortality: &MortalityRates,
    index: Vec<[i32; 2]>,
    layer: usize,
) -> Result<Cell, GridError> {
    let footprint = cell_geometry(config, &index);
    let mut cell = Cell::new(footprint, index, layer, config.census_pop_columns.len());

    overlay_census(&mut cell, config, census);
    overlay_mortality(&mut cell, mortality);
    overlay_ctm(&mut cell, ctm, layer)?;

    cell.volume = cell.dx * cell.dy * cell.dz;
    Ok(cell)
}

/// 人口普查叠加
///
/// 分摊分数为交集面积占形状面积之比，总人口因此守恒。
/// 任一相交形状的密度超过阈值时标记单元为高密度。
fn overlay_census(cell: &mut Cell, config: &GridConfig, census: &Census) {
    let pop_grid_idx = config
        .census_pop_columns
        .iter()
        .position(|c| *c == config.pop_grid_column)
        .unwrap_or(0);

    for shape in census.search(&cell.footprint) {
        let isect = shape.polygon.intersection_area_with_rect(&cell.footprint);
        if isect <= 0.0 {
            continue;
        }
        let frac = isect / shape.area;
        for (slot, &pop) in cell.pop_data.iter_mut().zip(shape.pops.iter()) {
            *slot += pop * frac;
        }
        let density = shape.pops.get(pop_grid_idx).copied().unwrap_or(0.0) / shape.area;
        if density > config.pop_density_threshold {
            cell.above_density_threshold = true;
        }
    }
}

/// 死亡率叠加
///
/// 分摊分数为交集面积占单元面积之比，单元均值因此守恒。
fn overlay_mortality(cell: &mut Cell, mortality: &MortalityRates) {
    let cell_area = cell.footprint.area();
    if cell_area <= 0.0 {
        return;
    }
    for shape in mortality.search(&cell.footprint) {
        let isect = shape.polygon.intersection_area_with_rect(&cell.footprint);
        if isect <= 0.0 {
            continue;
        }
        cell.mortality_rate += shape.all_cause * isect / cell_area;
    }
}

/// CTM 数据叠加
///
/// 单元可能跨多个 CTM 列，按重叠面积加权。交错量按所属面的
/// 约定读取（U 西面、V 南面、W/Kzz 底面）。
fn overlay_ctm(cell: &mut Cell, ctm: &CtmData, layer: usize) -> Result<(), GridError> {
    let rect = cell.footprint;
    let cell_area = rect.area();

    // 候选列的索引范围
    let ix_lo = ((rect.min.x - ctm.x0) / ctm.dx).floor().max(0.0) as usize;
    let iy_lo = ((rect.min.y - ctm.y0) / ctm.dy).floor().max(0.0) as usize;
    let ix_hi = (((rect.max.x - ctm.x0) / ctm.dx).ceil().max(0.0) as usize).min(ctm.nx);
    let iy_hi = (((rect.max.y - ctm.y0) / ctm.dy).ceil().max(0.0) as usize).min(ctm.ny);

    let mut columns: Vec<(usize, usize, f64)> = Vec::new();
    for iy in iy_lo..iy_hi {
        for ix in ix_lo..ix_hi {
            let (x0, y0, x1, y1) = ctm.column_bounds(ix, iy);
            let col = Rect::from_bounds(x0, y0, x1, y1);
            let frac = rect.overlap_area(&col) / cell_area;
            if frac > 0.0 {
                columns.push((ix, iy, frac));
            }
        }
    }
    if columns.is_empty() {
        let c = rect.centroid();
        return Err(GridError::NoCtmOverlap {
            x: c.x,
            y: c.y,
            layer,
        });
    }

    let k = layer;
    for &(ix, iy, frac) in &columns {
        let met = &mut cell.met;
        met.u_avg += ctm.get("UAvg", k, iy, ix)? * frac;
        met.v_avg += ctm.get("VAvg", k, iy, ix)? * frac;
        met.w_avg += ctm.get("WAvg", k, iy, ix)? * frac;
        met.u_deviation += ctm.get("UDeviation", k, iy, ix)? * frac;
        met.v_deviation += ctm.get("VDeviation", k, iy, ix)? * frac;
        met.kzz += ctm.get("Kzz", k, iy, ix)? * frac;
        met.kxxyy += ctm.get("Kxxyy", k, iy, ix)? * frac;
        met.m2u += ctm.get("M2u", k, iy, ix)? * frac;
        met.m2d += ctm.get("M2d", k, iy, ix)? * frac;
        met.temperature += ctm.get("Temperature", k, iy, ix)? * frac;
        met.s1 += ctm.get("S1", k, iy, ix)? * frac;
        met.s_class += ctm.get("Sclass", k, iy, ix)? * frac;
        met.wind_speed += ctm.get("WindSpeed", k, iy, ix)? * frac;
        met.wind_speed_inverse += ctm.get("WindSpeedInverse", k, iy, ix)? * frac;
        met.wind_speed_minus_third += ctm.get("WindSpeedMinusThird", k, iy, ix)? * frac;
        met.wind_speed_minus_one_point_four +=
            ctm.get("WindSpeedMinusOnePointFour", k, iy, ix)? * frac;

        let chem = &mut cell.chem;
        chem.a_org_partitioning += ctm.get("aOrgPartitioning", k, iy, ix)? * frac;
        chem.b_org_partitioning += ctm.get("bOrgPartitioning", k, iy, ix)? * frac;
        chem.s_partitioning += ctm.get("SPartitioning", k, iy, ix)? * frac;
        chem.no_partitioning += ctm.get("NOPartitioning", k, iy, ix)? * frac;
        chem.nh_partitioning += ctm.get("NHPartitioning", k, iy, ix)? * frac;
        chem.so2_oxidation += ctm.get("SO2oxidation", k, iy, ix)? * frac;
        chem.particle_wet_dep += ctm.get("ParticleWetDep", k, iy, ix)? * frac;
        chem.so2_wet_dep += ctm.get("SO2WetDep", k, iy, ix)? * frac;
        chem.other_gas_wet_dep += ctm.get("OtherGasWetDep", k, iy, ix)? * frac;
        chem.particle_dry_dep += ctm.get("ParticleDryDep", k, iy, ix)? * frac;
        chem.so2_dry_dep += ctm.get("SO2DryDep", k, iy, ix)? * frac;
        chem.nox_dry_dep += ctm.get("NOxDryDep", k, iy, ix)? * frac;
        chem.nh3_dry_dep += ctm.get("NH3DryDep", k, iy, ix)? * frac;
        chem.voc_dry_dep += ctm.get("VOCDryDep", k, iy, ix)? * frac;

        cell.layer_height += ctm.get("LayerHeights", k, iy, ix)? * frac;
        cell.dz += ctm.get("Dz", k, iy, ix)? * frac;

        cell.c_baseline[Species::Pm25.index()] += ctm.get("TotalPM25", k, iy, ix)? * frac;
        cell.c_baseline[Species::GasAmmonia.index()] += ctm.get("gNH", k, iy, ix)? * frac;
        cell.c_baseline[Species::ParticleAmmonium.index()] += ctm.get("pNH", k, iy, ix)? * frac;
        cell.c_baseline[Species::GasNitrogen.index()] += ctm.get("gNO", k, iy, ix)? * frac;
        cell.c_baseline[Species::ParticleNitrate.index()] += ctm.get("pNO", k, iy, ix)? * frac;
        cell.c_baseline[Species::GasSulfur.index()] += ctm.get("gS", k, iy, ix)? * frac;
        cell.c_baseline[Species::ParticleSulfate.index()] += ctm.get("pS", k, iy, ix)? * frac;
        cell.c_baseline[Species::GasOrganic.index()] += ctm.get("aVOC", k, iy, ix)? * frac;
        cell.c_baseline[Species::ParticleOrganic.index()] += ctm.get("aSOA", k, iy, ix)? * frac;
    }

    Ok(())
}

/// 构造外层规则网格
///
/// 生成 nx × ny × nz 个层 0 嵌套深度的单元，完成邻居解析与
/// 排放分配。变分辨率网格以此为初始状态，由变异引擎逐步细分。
pub fn regular_grid(
    config: &GridConfig,
    ctm: &CtmData,
    census: &Census,
    mortality: &MortalityRates,
    emissions: Option<&Emissions>,
) -> Result<Grid, GridError> {
    let mut grid = Grid::new(config.clone());
    let nz = ctm.nz;
    let nx = config.outer_nx();
    let ny = config.outer_ny();

    let mut cells = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                cells.push(create_cell(
                    config,
                    ctm,
                    census,
                    mortality,
                    vec![[i as i32, j as i32]],
                    k,
                )?);
            }
        }
    }
    let ids = grid.add_cells(cells);
    if let Some(emis) = emissions {
        for &id in &ids {
            let cell = grid.cell_mut(id);
            emis.assign_flux(cell);
        }
    }
    info!(
        cells = ids.len(),
        layers = nz,
        "规则网格构造完成"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_geo::{Point2D, Polygon};
    use ap_io::SyntheticCtmConfig;

    fn test_config() -> GridConfig {
        GridConfig::default()
    }

    fn empty_inputs() -> (Census, MortalityRates) {
        (
            Census::new(vec!["TotalPop".to_string()]),
            MortalityRates::new(),
        )
    }

    #[test]
    fn test_cell_geometry_outer() {
        let config = test_config();
        let rect = cell_geometry(&config, &[[0, 0]]);
        assert_eq!(rect, Rect::from_bounds(-8000.0, -8000.0, -4000.0, -4000.0));
        let rect = cell_geometry(&config, &[[3, 3]]);
        assert_eq!(rect, Rect::from_bounds(4000.0, 4000.0, 8000.0, 8000.0));
    }

    #[test]
    fn test_cell_geometry_nested() {
        let config = test_config();
        // [1,1] 的第二级 [0,1]: 左边界不变, 下边界 + dy/2
        let rect = cell_geometry(&config, &[[1, 1], [0, 1]]);
        assert_eq!(rect, Rect::from_bounds(-4000.0, -2000.0, -2000.0, 0.0));
    }

    #[test]
    fn test_children_partition_parent() {
        let config = test_config();
        let parent = cell_geometry(&config, &[[2, 1]]);
        let mut total = 0.0;
        for i in 0..2 {
            for j in 0..2 {
                let child = cell_geometry(&config, &[[2, 1], [i, j]]);
                total += child.area();
                assert!(parent.overlap_area(&child) > 0.99 * child.area());
            }
        }
        assert!((total - parent.area()).abs() < 1e-6 * parent.area());
    }

    #[test]
    fn test_regular_grid_shape() {
        let ctm = SyntheticCtmConfig::default().build();
        let (census, mort) = empty_inputs();
        let grid = regular_grid(&test_config(), &ctm, &census, &mort, None).unwrap();
        assert_eq!(grid.cells().len(), 4 * 4 * 10);
        assert_eq!(grid.nlayers(), 10);
        grid.validate_topology().unwrap();
    }

    #[test]
    fn test_regular_grid_met_loaded() {
        let cfg = SyntheticCtmConfig::default();
        let ctm = cfg.build();
        let (census, mort) = empty_inputs();
        let grid = regular_grid(&test_config(), &ctm, &census, &mort, None).unwrap();
        let id = grid.cells()[0];
        let cell = grid.cell(id);
        assert!((cell.met.u_avg - cfg.u).abs() < 1e-12);
        assert!((cell.dz - cfg.layer_dz).abs() < 1e-12);
        assert!((cell.volume - 4000.0 * 4000.0 * cfg.layer_dz).abs() < 1e-6);
        assert!((cell.c_baseline[Species::Pm25.index()] - cfg.baseline).abs() < 1e-12);
    }

    #[test]
    fn test_population_conserved() {
        let ctm = SyntheticCtmConfig::default().build();
        let mut census = Census::new(vec!["TotalPop".to_string()]);
        // 跨越四个单元的 4000x4000 方形, 总人口 1000
        census
            .insert(
                Polygon::new(vec![
                    Point2D::new(-2000.0, -2000.0),
                    Point2D::new(2000.0, -2000.0),
                    Point2D::new(2000.0, 2000.0),
                    Point2D::new(-2000.0, 2000.0),
                ]),
                vec![1000.0],
            )
            .unwrap();
        let mort = MortalityRates::new();
        let grid = regular_grid(&test_config(), &ctm, &census, &mort, None).unwrap();

        let total: f64 = grid
            .cells()
            .iter()
            .filter(|&&id| grid.cell(id).layer == 0)
            .map(|&id| grid.cell(id).pop_data[0])
            .sum();
        assert!((total - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_ctm_overlap_is_fatal() {
        let config = GridConfig {
            x0: 1.0e6,
            y0: 1.0e6,
            ..test_config()
        };
        let ctm = SyntheticCtmConfig::default().build();
        let (census, mort) = empty_inputs();
        let result = regular_grid(&config, &ctm, &census, &mort, None);
        assert!(matches!(result, Err(GridError::NoCtmOverlap { .. })));
    }

    #[test]
    fn test_boundary_cells_created() {
        let ctm = SyntheticCtmConfig::default().build();
        let (census, mort) = empty_inputs();
        let grid = regular_grid(&test_config(), &ctm, &census, &mort, None).unwrap();
        // 每层每侧 4 个边界哨兵, 顶面 16 个
        assert_eq!(grid.west_boundary.len(), 4 * 10);
        assert_eq!(grid.east_boundary.len(), 4 * 10);
        assert_eq!(grid.south_boundary.len(), 4 * 10);
        assert_eq!(grid.north_boundary.len(), 4 * 10);
        assert_eq!(grid.top_boundary.len(), 16);
        for id in grid.boundary_ids() {
            assert!(grid.store().get(id).unwrap().boundary);
        }
    }
}
