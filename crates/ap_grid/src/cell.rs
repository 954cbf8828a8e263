// crates/ap_grid/src/cell.rs

//! 网格单元状态
//!
//! 单元是网格投影坐标系下的有限体积棱柱。除浓度数组外的全部
//! 字段在构建后视为不可变，直到细分/合并事件整体重建单元；
//! 浓度数组由每单元读写锁保护，物理遍历期间恰有一条算子链
//! 写本单元的 Cf，任意多个邻居并发读冻结的 Ci。

use crate::species::SpeciesArray;
use crate::store::CellId;
use ap_geo::{Point2D, Rect};
use parking_lot::RwLock;

/// 单元的六个面
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
    /// 西
    West,
    /// 东
    East,
    /// 南
    South,
    /// 北
    North,
    /// 下
    Below,
    /// 上
    Above,
}

impl Face {
    /// 全部面
    pub const ALL: [Face; 6] = [
        Face::West,
        Face::East,
        Face::South,
        Face::North,
        Face::Below,
        Face::Above,
    ];

    /// 调试名
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Face::West => "west",
            Face::East => "east",
            Face::South => "south",
            Face::North => "north",
            Face::Below => "below",
            Face::Above => "above",
        }
    }
}

/// 邻居条目
///
/// 弱引用：只记录仓库句柄与关系量，不拥有对方。
#[derive(Clone, Copy, Debug)]
pub struct Neighbor {
    /// 邻居句柄
    pub id: CellId,
    /// 覆盖分数（本单元该面被邻居覆盖的比例）
    pub frac: f64,
    /// 单元中心距 [m]
    pub dist: f64,
    /// 界面扩散系数（两单元系数的调和平均） [m²/s]
    pub diff: f64,
}

/// 浓度状态
///
/// `ci` 为时间步开始时的冻结浓度，`cf` 为步内累积的结果。
#[derive(Clone, Copy, Debug, Default)]
pub struct Concentrations {
    /// 步初浓度 [μg/m³]
    pub ci: SpeciesArray,
    /// 步末浓度 [μg/m³]
    pub cf: SpeciesArray,
}

/// 年均气象量
#[derive(Clone, Copy, Debug, Default)]
pub struct Meteorology {
    /// 西面年均东西风速 [m/s]
    pub u_avg: f64,
    /// 南面年均南北风速 [m/s]
    pub v_avg: f64,
    /// 底面年均垂直风速 [m/s]
    pub w_avg: f64,
    /// 东西风速平均绝对偏差 [m/s]
    pub u_deviation: f64,
    /// 南北风速平均绝对偏差 [m/s]
    pub v_deviation: f64,
    /// 垂直扩散系数 [m²/s]
    pub kzz: f64,
    /// 水平扩散系数 [m²/s]
    pub kxxyy: f64,
    /// ACM2 上行对流速率 [1/s]
    pub m2u: f64,
    /// ACM2 下行对流速率 [1/s]
    pub m2d: f64,
    /// 年均温度 [K]
    pub temperature: f64,
    /// 稳定度参数
    pub s1: f64,
    /// 稳定度类别 (0=不稳定, 1=稳定)
    pub s_class: f64,
    /// 均方根风速 [m/s]
    pub wind_speed: f64,
    /// 风速倒数均值 [(m/s)⁻¹]
    pub wind_speed_inverse: f64,
    /// 风速 -1/3 次幂均值
    pub wind_speed_minus_third: f64,
    /// 风速 -1.4 次幂均值
    pub wind_speed_minus_one_point_four: f64,
}

/// 化学与沉降系数
#[derive(Clone, Copy, Debug, Default)]
pub struct ChemistryParams {
    /// 人为源有机物颗粒相分数
    pub a_org_partitioning: f64,
    /// 生物源有机物颗粒相分数
    pub b_org_partitioning: f64,
    /// 硫颗粒相分数
    pub s_partitioning: f64,
    /// 硝酸盐颗粒相分数
    pub no_partitioning: f64,
    /// 铵颗粒相分数
    pub nh_partitioning: f64,
    /// SO2 氧化速率 [1/s]
    pub so2_oxidation: f64,
    /// 颗粒物湿沉降速率 [1/s]
    pub particle_wet_dep: f64,
    /// SO2 湿沉降速率 [1/s]
    pub so2_wet_dep: f64,
    /// 其他气体湿沉降速率 [1/s]
    pub other_gas_wet_dep: f64,
    /// 颗粒物干沉降速度 [m/s]
    pub particle_dry_dep: f64,
    /// SO2 干沉降速度 [m/s]
    pub so2_dry_dep: f64,
    /// NOx 干沉降速度 [m/s]
    pub nox_dry_dep: f64,
    /// NH3 干沉降速度 [m/s]
    pub nh3_dry_dep: f64,
    /// VOC 干沉降速度 [m/s]
    pub voc_dry_dep: f64,
}

/// 网格单元
pub struct Cell {
    /// 足迹（轴对齐矩形）
    pub footprint: Rect,
    /// 嵌套索引路径
    pub index: Vec<[i32; 2]>,
    /// 垂直层索引
    pub layer: usize,
    /// x 向边长 [m]
    pub dx: f64,
    /// y 向边长 [m]
    pub dy: f64,
    /// 层厚 [m]
    pub dz: f64,
    /// 体积 [m³]
    pub volume: f64,
    /// 层底高度 [m]
    pub layer_height: f64,

    /// 年均气象量
    pub met: Meteorology,
    /// 化学与沉降系数
    pub chem: ChemistryParams,

    /// 各人口分组人数 [人/单元]
    pub pop_data: Vec<f64>,
    /// 基线全因死亡率 [死亡/10万人/年]
    pub mortality_rate: f64,
    /// 高人口密度标志
    pub above_density_threshold: bool,

    /// 浓度数组（读写锁保护）
    pub conc: RwLock<Concentrations>,
    /// 排放通量 [μg/m³/s]
    pub emis_flux: SpeciesArray,
    /// 基线浓度 [μg/m³]
    pub c_baseline: SpeciesArray,

    /// 西面邻居
    pub west: Vec<Neighbor>,
    /// 东面邻居
    pub east: Vec<Neighbor>,
    /// 南面邻居
    pub south: Vec<Neighbor>,
    /// 北面邻居
    pub north: Vec<Neighbor>,
    /// 下面邻居
    pub below: Vec<Neighbor>,
    /// 上面邻居
    pub above: Vec<Neighbor>,
    /// 地面层邻居
    pub ground_level: Vec<Neighbor>,

    /// 边界哨兵标志
    pub boundary: bool,
}

impl Cell {
    /// 创建空白单元
    ///
    /// 浓度、通量与拓扑全部为零/空，由构建流程逐步填充。
    #[must_use]
    pub fn new(footprint: Rect, index: Vec<[i32; 2]>, layer: usize, n_pop_groups: usize) -> Self {
        let dx = footprint.width();
        let dy = footprint.height();
        Self {
            footprint,
            index,
            layer,
            dx,
            dy,
            dz: 0.0,
            volume: 0.0,
            layer_height: 0.0,
            met: Meteorology::default(),
            chem: ChemistryParams::default(),
            pop_data: vec![0.0; n_pop_groups],
            mortality_rate: 0.0,
            above_density_threshold: false,
            conc: RwLock::new(Concentrations::default()),
            emis_flux: [0.0; crate::species::N_SPECIES],
            c_baseline: [0.0; crate::species::N_SPECIES],
            west: Vec::new(),
            east: Vec::new(),
            south: Vec::new(),
            north: Vec::new(),
            below: Vec::new(),
            above: Vec::new(),
            ground_level: Vec::new(),
            boundary: false,
        }
    }

    /// 质心
    #[inline]
    #[must_use]
    pub fn centroid(&self) -> Point2D {
        self.footprint.centroid()
    }

    /// 边界哨兵副本
    ///
    /// 复制几何与气象量，浓度保持为零（外部边界条件可另行设置），
    /// 不携带沉降与化学路径。
    #[must_use]
    pub fn boundary_copy(&self) -> Cell {
        let mut c = Cell::new(
            self.footprint,
            self.index.clone(),
            self.layer,
            self.pop_data.len(),
        );
        c.dz = self.dz;
        c.volume = self.volume;
        c.layer_height = self.layer_height;
        c.met = self.met;
        c.boundary = true;
        c
    }

    /// 指定面的邻居列表
    #[inline]
    #[must_use]
    pub fn neighbors(&self, face: Face) -> &[Neighbor] {
        match face {
            Face::West => &self.west,
            Face::East => &self.east,
            Face::South => &self.south,
            Face::North => &self.north,
            Face::Below => &self.below,
            Face::Above => &self.above,
        }
    }

    /// 指定面的邻居列表（可变）
    #[inline]
    pub fn neighbors_mut(&mut self, face: Face) -> &mut Vec<Neighbor> {
        match face {
            Face::West => &mut self.west,
            Face::East => &mut self.east,
            Face::South => &mut self.south,
            Face::North => &mut self.north,
            Face::Below => &mut self.below,
            Face::Above => &mut self.above,
        }
    }

    /// 读取浓度快照
    #[inline]
    #[must_use]
    pub fn concentrations(&self) -> Concentrations {
        *self.conc.read()
    }

    /// 在写锁内修改浓度
    pub fn with_conc_mut(&self, f: impl FnOnce(&mut Concentrations)) {
        let mut guard = self.conc.write();
        f(&mut guard);
    }

    /// 把 Ci 与 Cf 同时设为给定数组
    pub fn set_concentrations(&self, values: SpeciesArray) {
        let mut guard = self.conc.write();
        guard.ci = values;
        guard.cf = values;
    }
}
