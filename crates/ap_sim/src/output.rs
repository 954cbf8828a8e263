// crates/ap_sim/src/output.rs

//! 输出字段注册表
//!
//! 单元标量以显式注册表暴露给输出层：名字 → 带类型的取值闭包，
//! 不做任何运行期字段反射。内置注册覆盖几何、气象、化学系数、
//! 逐组分浓度（Cf / 基线 / 排放通量）与人口分组；用户可登记
//! 线性组合（如总 PM2.5）或任意派生闭包（健康影响等外部函数
//! 由调用方包成闭包挂入）。
//!
//! 逐层导出产出 GeoJSON 风格的要素集合，读取浓度时持单元读锁。

use crate::model::Model;
use ap_grid::{Cell, CellId, Grid, Species};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// 字段取值闭包
pub type FieldAccessor = Box<dyn Fn(&Cell, &Grid) -> f64 + Send + Sync>;

/// 注册表条目
struct FieldEntry {
    accessor: FieldAccessor,
    units: &'static str,
    description: String,
}

/// 输出字段注册表
pub struct FieldRegistry {
    fields: HashMap<String, FieldEntry>,
}

impl FieldRegistry {
    /// 空注册表
    #[must_use]
    pub fn empty() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// 内置标准字段
    ///
    /// 含 "TotalPM25" 线性组合（五个颗粒相组分之和）。
    #[must_use]
    pub fn standard(pop_columns: &[String]) -> Self {
        let mut reg = Self::empty();

        reg.register("Dx", "m", "单元 x 边长", |c, _| c.dx);
        reg.register("Dy", "m", "单元 y 边长", |c, _| c.dy);
        reg.register("Dz", "m", "单元层厚", |c, _| c.dz);
        reg.register("Volume", "m³", "单元体积", |c, _| c.volume);
        reg.register("LayerHeight", "m", "层底高度", |c, _| c.layer_height);
        reg.register("UAvg", "m/s", "年均东西风速", |c, _| c.met.u_avg);
        reg.register("VAvg", "m/s", "年均南北风速", |c, _| c.met.v_avg);
        reg.register("WAvg", "m/s", "年均垂直风速", |c, _| c.met.w_avg);
        reg.register("Kzz", "m²/s", "垂直扩散系数", |c, _| c.met.kzz);
        reg.register("Kxxyy", "m²/s", "水平扩散系数", |c, _| c.met.kxxyy);
        reg.register("M2u", "1/s", "ACM2 上行速率", |c, _| c.met.m2u);
        reg.register("M2d", "1/s", "ACM2 下行速率", |c, _| c.met.m2d);
        reg.register("Temperature", "K", "年均温度", |c, _| c.met.temperature);
        reg.register("WindSpeed", "m/s", "均方根风速", |c, _| c.met.wind_speed);
        reg.register("SO2oxidation", "1/s", "SO2 氧化速率", |c, _| {
            c.chem.so2_oxidation
        });
        reg.register("MortalityRate", "死亡/10万人/年", "基线死亡率", |c, _| {
            c.mortality_rate
        });

        // 逐组分: 浓度 / 基线 / 排放通量
        for species in Species::ALL {
            let s = species.index();
            reg.register_named(
                species.name().to_string(),
                "μg/m³",
                format!("{} 浓度", species.name()),
                move |c, _| c.concentrations().cf[s],
            );
            reg.register_named(
                format!("Baseline {}", species.name()),
                "μg/m³",
                format!("{} 基线浓度", species.name()),
                move |c, _| c.c_baseline[s],
            );
            reg.register_named(
                format!("Emis {}", species.name()),
                "μg/m³/s",
                format!("{} 排放通量", species.name()),
                move |c, _| c.emis_flux[s],
            );
        }

        // 人口分组
        for (i, column) in pop_columns.iter().enumerate() {
            reg.register_named(
                column.clone(),
                "人/单元",
                format!("人口分组 {}", column),
                move |c, _| c.pop_data.get(i).copied().unwrap_or(0.0),
            );
        }

        // 总 PM2.5 = 五个颗粒相组分之和
        reg.register_combination(
            "TotalPM25",
            "μg/m³",
            Species::PARTICLES.iter().map(|&s| (s, 1.0)).collect(),
        );

        reg
    }

    /// 登记静态名字段
    pub fn register(
        &mut self,
        name: &str,
        units: &'static str,
        description: impl Into<String>,
        accessor: impl Fn(&Cell, &Grid) -> f64 + Send + Sync + 'static,
    ) {
        self.register_named(name.to_string(), units, description, accessor);
    }

    /// 登记动态名字段
    pub fn register_named(
        &mut self,
        name: String,
        units: &'static str,
        description: impl Into<String>,
        accessor: impl Fn(&Cell, &Grid) -> f64 + Send + Sync + 'static,
    ) {
        self.fields.insert(
            name,
            FieldEntry {
                accessor: Box::new(accessor),
                units,
                description: description.into(),
            },
        );
    }

    /// 登记组分浓度的线性组合
    pub fn register_combination(
        &mut self,
        name: &str,
        units: &'static str,
        terms: Vec<(Species, f64)>,
    ) {
        let description = format!(
            "线性组合: {}",
            terms
                .iter()
                .map(|(s, w)| format!("{}×{}", w, s.name()))
                .collect::<Vec<_>>()
                .join(" + ")
        );
        self.register_named(name.to_string(), units, description, move |c, _| {
            let cf = c.concentrations().cf;
            terms.iter().map(|(s, w)| cf[s.index()] * w).sum()
        });
    }

    /// 已注册的字段名（无序）
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// 字段单位
    #[must_use]
    pub fn units(&self, name: &str) -> Option<&'static str> {
        self.fields.get(name).map(|e| e.units)
    }

    /// 字段描述
    #[must_use]
    pub fn description(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|e| e.description.as_str())
    }

    /// 单个单元的字段值
    #[must_use]
    pub fn value(&self, grid: &Grid, id: CellId, name: &str) -> Option<f64> {
        let entry = self.fields.get(name)?;
        Some((entry.accessor)(grid.cell(id), grid))
    }

    /// 指定层的字段数组（按单元排序）
    #[must_use]
    pub fn layer_array(&self, grid: &Grid, name: &str, layer: usize) -> Option<Vec<f64>> {
        let entry = self.fields.get(name)?;
        Some(
            grid.cells()
                .iter()
                .filter(|&&id| grid.cell(id).layer == layer)
                .map(|&id| (entry.accessor)(grid.cell(id), grid))
                .collect(),
        )
    }

    /// 指定层的 GeoJSON 风格要素集合
    ///
    /// 每个单元一个矩形要素，属性为请求的字段值。未注册的字段
    /// 名返回 None。
    #[must_use]
    pub fn layer_geojson(&self, model: &Model, layer: usize, names: &[&str]) -> Option<Value> {
        let grid = &model.grid;
        let entries: Vec<(&str, &FieldEntry)> = names
            .iter()
            .map(|&n| self.fields.get(n).map(|e| (n, e)))
            .collect::<Option<Vec<_>>>()?;

        let features: Vec<Value> = grid
            .cells()
            .iter()
            .filter(|&&id| grid.cell(id).layer == layer)
            .map(|&id| {
                let cell = grid.cell(id);
                let r = &cell.footprint;
                let ring = vec![
                    vec![r.min.x, r.min.y],
                    vec![r.max.x, r.min.y],
                    vec![r.max.x, r.max.y],
                    vec![r.min.x, r.max.y],
                    vec![r.min.x, r.min.y],
                ];
                let mut props = Map::new();
                for (name, entry) in &entries {
                    props.insert(name.to_string(), json!((entry.accessor)(cell, grid)));
                }
                json!({
                    "type": "Feature",
                    "geometry": { "type": "Polygon", "coordinates": [ring] },
                    "properties": Value::Object(props),
                })
            })
            .collect();

        Some(json!({
            "type": "FeatureCollection",
            "features": features,
            "layer": layer,
            "convergence_warning": model.convergence_warning,
        }))
    }
}
