// crates/ap_sim/tests/dynamic_grid.rs

//! 动态网格模拟测试
//!
//! 人口-浓度判据 + 周期变异: 网格应在人口与浓度梯度共存处
//! 细化到最大嵌套深度, 远离源与人口的区域保持粗分辨率;
//! 变异后拓扑不变量与逐层覆盖面积保持。

use ap_config::{ConvergenceConfig, GridConfig};
use ap_geo::{Point2D, Polygon};
use ap_grid::build::regular_grid;
use ap_grid::emissions::{EmisRecord, Emissions};
use ap_grid::mutate::GridMutator;
use ap_grid::population::{Census, MortalityRates};
use ap_grid::EmissionRates;
use ap_io::{CtmData, SyntheticCtmConfig};
use ap_physics::{
    AddEmissionsFlux, Chemistry, ConvergenceChecker, DryDeposition, MeanderMixing, Mixing,
    UpwindAdvection, WetDeposition,
};
use ap_sim::{
    Calculations, Model, MutateGrid, RunPeriodically, SetTimestepCfl, Simulation,
    SteadyStateConvergence,
};
use std::sync::Arc;

const MUTATION_INTERVAL: f64 = 3600.0;

fn ctm() -> CtmData {
    SyntheticCtmConfig {
        nz: 3,
        pbl_layers: 2,
        ..SyntheticCtmConfig::default()
    }
    .build()
}

/// 人口集中在单元 [1,1] 内的方块
fn census() -> Census {
    let mut census = Census::new(vec!["TotalPop".to_string()]);
    census
        .insert(
            Polygon::new(vec![
                Point2D::new(-3800.0, -3800.0),
                Point2D::new(-200.0, -3800.0),
                Point2D::new(-200.0, -200.0),
                Point2D::new(-3800.0, -200.0),
            ]),
            vec![5000.0],
        )
        .unwrap();
    census
}

#[test]
fn test_pop_conc_mutator_refines_near_source() {
    let ctm = Arc::new(ctm());
    let census = Arc::new(census());
    let mort = Arc::new(MortalityRates::new());

    let mut emissions = Emissions::new();
    emissions.add(EmisRecord::ground_point(
        Point2D::new(-3999.0, -3999.0),
        EmissionRates::uniform(100.0),
    ));
    let emissions = Arc::new(emissions);

    let grid = regular_grid(
        &GridConfig::default(),
        &ctm,
        &census,
        &mort,
        Some(&emissions),
    )
    .unwrap();
    let initial_cells = grid.cells().len();
    let pop_index = grid.pop_index("TotalPop").unwrap();
    let mutator = GridMutator::pop_conc(grid.config(), &grid).unwrap();

    let checker = ConvergenceChecker::new(
        ConvergenceConfig {
            check_interval_steps: 10,
            tolerance: 1e-3,
            required_passes: 3,
            max_iterations: Some(60),
        },
        pop_index,
    );

    let mut sim = Simulation::new(Model::new(grid))
        .with_init(SetTimestepCfl::new(1.0))
        .with_run(Calculations::new(vec![Box::new(AddEmissionsFlux)]))
        .with_run(Calculations::new(vec![
            Box::new(UpwindAdvection),
            Box::new(MeanderMixing),
            Box::new(Mixing),
            Box::new(DryDeposition),
            Box::new(WetDeposition),
            Box::new(Chemistry::new(1e-5)),
        ]))
        .with_run(RunPeriodically::new(
            MUTATION_INTERVAL,
            MutateGrid::new(
                mutator,
                ctm.clone(),
                census.clone(),
                mort.clone(),
                Some(emissions.clone()),
            ),
        ))
        .with_run(RunPeriodically::new(
            MUTATION_INTERVAL,
            SetTimestepCfl::new(1.0),
        ))
        .with_run(SteadyStateConvergence::new(checker));

    sim.init().unwrap();
    sim.run().unwrap();

    let model = sim.model();
    let grid = &model.grid;

    // 网格确实细化了
    assert!(
        grid.cells().len() > initial_cells,
        "网格未细化: {} 个单元",
        grid.cells().len()
    );

    // 源所在的层 0 单元已达最大嵌套深度
    let max_levels = grid.config().max_levels();
    let source_depth = grid
        .cells()
        .iter()
        .map(|&id| grid.cell(id))
        .filter(|c| {
            c.layer == 0
                && c.footprint
                    .contains_point_half_open(&Point2D::new(-3999.0, -3999.0))
        })
        .map(|c| c.index.len())
        .max()
        .unwrap();
    assert_eq!(
        source_depth, max_levels,
        "源单元未细化到最大深度"
    );

    // 远离源与人口的角落保持粗分辨率
    let far_corner = grid
        .cells()
        .iter()
        .map(|&id| grid.cell(id))
        .find(|c| {
            c.layer == 0
                && c.footprint
                    .contains_point_half_open(&Point2D::new(7000.0, 7000.0))
        })
        .unwrap();
    assert_eq!(far_corner.index.len(), 1, "远端角落不应细化");

    // 拓扑不变量保持
    grid.validate_topology().unwrap();

    // 逐层覆盖面积保持
    let domain_area = 16000.0 * 16000.0;
    for layer in 0..grid.nlayers() {
        let area: f64 = grid
            .cells()
            .iter()
            .map(|&id| grid.cell(id))
            .filter(|c| c.layer == layer)
            .map(|c| c.footprint.area())
            .sum();
        assert!(
            ((area - domain_area) / domain_area).abs() < 1e-9,
            "层 {} 覆盖面积不守恒: {}",
            layer,
            area
        );
    }

    // 细化后排放通量仍然指向源单元: 域内总排放守恒
    let total_emis: f64 = grid
        .cells()
        .iter()
        .map(|&id| {
            let c = grid.cell(id);
            c.emis_flux.iter().sum::<f64>() * c.volume
        })
        .sum();
    // 五个类别各 100 μg/s
    assert!(
        (total_emis - 500.0).abs() < 1e-9,
        "排放总量不守恒: {}",
        total_emis
    );
}

#[test]
fn test_population_mutator_static_refinement() {
    // 人口密度判据不依赖浓度场, 构造后一次变异即静态细化
    let ctm = ctm();
    let census = census();
    let mort = MortalityRates::new();

    let config = GridConfig {
        hi_res_layers: 1,
        pop_threshold: 1000.0,
        ..GridConfig::default()
    };
    let mut grid = regular_grid(&config, &ctm, &census, &mort, None).unwrap();
    let mutator = GridMutator::population(&config, &grid).unwrap();

    let outcome = ap_grid::mutate::mutate_grid(&mut grid, &mutator, &ctm, &census, &mort, None)
        .unwrap();
    assert!(outcome.split_cells > 0);
    assert_eq!(outcome.merged_cells, 0);

    // 层 0 人口集中区域细化到最大深度, 层 1 及以上不细化
    for &id in grid.cells() {
        let cell = grid.cell(id);
        if cell.layer >= config.hi_res_layers {
            assert_eq!(cell.index.len(), 1, "高层单元不应细化");
        }
    }
    let deepest = grid
        .cells()
        .iter()
        .map(|&id| grid.cell(id).index.len())
        .max()
        .unwrap();
    assert_eq!(deepest, config.max_levels());

    grid.validate_topology().unwrap();
}
