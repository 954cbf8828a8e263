// crates/ap_sim/tests/simulation.rs

//! 端到端模拟测试
//!
//! 地面点源 + 人口域, 完整算子链跑到稳态收敛, 检验:
//! - 驱动器按列表顺序推进并在收敛时终止
//! - 收敛后场有限、非负
//! - 化学生成了二次颗粒物
//! - 羽流沿年均风向偏移
//! - 迭代上限路径携带警告标志

use ap_config::{ConvergenceConfig, GridConfig};
use ap_geo::{Point2D, Polygon};
use ap_grid::build::regular_grid;
use ap_grid::emissions::{EmisRecord, Emissions};
use ap_grid::population::{Census, MortalityRates};
use ap_grid::{EmissionRates, Species};
use ap_io::SyntheticCtmConfig;
use ap_physics::{
    AddEmissionsFlux, Chemistry, ConvergenceChecker, DryDeposition, MeanderMixing, Mixing,
    UpwindAdvection, WetDeposition,
};
use ap_sim::{
    Calculations, FieldRegistry, Model, SetTimestepCfl, Simulation, SteadyStateConvergence,
};

const VOC_RATE: f64 = 1e-5;

fn domain_census() -> Census {
    let mut census = Census::new(vec!["TotalPop".to_string()]);
    census
        .insert(
            Polygon::new(vec![
                Point2D::new(-8000.0, -8000.0),
                Point2D::new(8000.0, -8000.0),
                Point2D::new(8000.0, 8000.0),
                Point2D::new(-8000.0, 8000.0),
            ]),
            vec![10000.0],
        )
        .unwrap();
    census
}

fn physics_chain() -> Calculations {
    Calculations::new(vec![
        Box::new(UpwindAdvection),
        Box::new(MeanderMixing),
        Box::new(Mixing),
        Box::new(DryDeposition),
        Box::new(WetDeposition),
        Box::new(Chemistry::new(VOC_RATE)),
    ])
}

fn build_simulation(max_iterations: Option<usize>) -> Simulation {
    let ctm = SyntheticCtmConfig {
        u: 2.0,
        v: 1.5,
        u_deviation: 0.25,
        v_deviation: 0.25,
        kzz: 0.5,
        m2u: 5e-5,
        ..SyntheticCtmConfig::default()
    }
    .build();
    let census = domain_census();
    let mort = MortalityRates::new();

    let mut emissions = Emissions::new();
    emissions.add(EmisRecord::ground_point(
        Point2D::new(-3999.0, -3999.0),
        EmissionRates::uniform(100.0),
    ));

    let grid = regular_grid(
        &GridConfig::default(),
        &ctm,
        &census,
        &mort,
        Some(&emissions),
    )
    .unwrap();
    let pop_index = grid.pop_index("TotalPop").unwrap();

    let checker = ConvergenceChecker::new(
        ConvergenceConfig {
            check_interval_steps: 10,
            tolerance: 1e-3,
            required_passes: 3,
            max_iterations,
        },
        pop_index,
    );

    Simulation::new(Model::new(grid))
        .with_init(SetTimestepCfl::new(1.0))
        .with_run(Calculations::new(vec![Box::new(AddEmissionsFlux)]))
        .with_run(physics_chain())
        .with_run(SteadyStateConvergence::new(checker))
}

#[test]
fn test_point_source_runs_to_steady_state() {
    let mut sim = build_simulation(Some(5000));
    sim.init().unwrap();
    assert!(sim.model().dt > 0.0);

    sim.run().unwrap();
    let model = sim.model();
    assert!(model.done);
    assert!(
        !model.convergence_warning,
        "应在迭代上限前收敛 (steps = {})",
        model.steps
    );
    assert!(model.steps >= 30, "收敛不应快于三次检查");

    // 场有限、非负
    for &id in model.grid.cells() {
        for v in model.grid.cell(id).concentrations().cf {
            assert!(v.is_finite());
            assert!(v >= 0.0);
        }
    }

    // 源单元出现一次与二次颗粒物
    let source = model
        .grid
        .cells()
        .iter()
        .copied()
        .find(|&id| {
            let c = model.grid.cell(id);
            c.layer == 0 && c.index == vec![[1, 1]]
        })
        .unwrap();
    let cf = model.grid.cell(source).concentrations().cf;
    assert!(cf[Species::Pm25.index()] > 0.0, "一次 PM2.5 缺失");
    assert!(cf[Species::ParticleSulfate.index()] > 0.0, "二次硫酸盐缺失");

    // 羽流顺风偏移: 东侧单元浓度高于西侧对称单元
    let east = model
        .grid
        .cells()
        .iter()
        .copied()
        .find(|&id| {
            let c = model.grid.cell(id);
            c.layer == 0 && c.index == vec![[2, 1]]
        })
        .unwrap();
    let west = model
        .grid
        .cells()
        .iter()
        .copied()
        .find(|&id| {
            let c = model.grid.cell(id);
            c.layer == 0 && c.index == vec![[0, 1]]
        })
        .unwrap();
    let east_pm = model.grid.cell(east).concentrations().cf[Species::Pm25.index()];
    let west_pm = model.grid.cell(west).concentrations().cf[Species::Pm25.index()];
    assert!(
        east_pm > west_pm,
        "羽流应向东偏移: 东 {} <= 西 {}",
        east_pm,
        west_pm
    );

    // 输出注册表给出人口加权浓度场
    let registry = FieldRegistry::standard(&["TotalPop".to_string()]);
    let totals = registry.layer_array(&model.grid, "TotalPM25", 0).unwrap();
    assert_eq!(totals.len(), 16);
    assert!(totals.iter().any(|&v| v > 0.0));
    let doc = registry
        .layer_geojson(model, 0, &["TotalPM25", "TotalPop"])
        .unwrap();
    assert_eq!(doc["features"].as_array().unwrap().len(), 16);
}

#[test]
fn test_iteration_cap_sets_warning() {
    let mut sim = build_simulation(Some(7));
    sim.init().unwrap();
    sim.run().unwrap();
    let model = sim.model();
    assert!(model.done);
    assert!(model.convergence_warning);
    // 结果仍然交付: 场保持可读且有限
    for &id in model.grid.cells() {
        for v in model.grid.cell(id).concentrations().cf {
            assert!(v.is_finite());
        }
    }
}

#[test]
fn test_cancellation_stops_run() {
    struct CancelAt(usize, usize);
    impl ap_sim::DomainManipulator for CancelAt {
        fn name(&self) -> &'static str {
            "cancel_at"
        }
        fn apply(&mut self, model: &mut Model) -> ap_sim::SimResult<()> {
            self.1 += 1;
            if self.1 >= self.0 {
                model.cancel();
            }
            Ok(())
        }
    }

    let mut sim = build_simulation(None).with_run(CancelAt(3, 0));
    sim.init().unwrap();
    sim.run().unwrap();
    assert_eq!(sim.model().steps, 3);
}
