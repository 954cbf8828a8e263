// crates/ap_io/src/netcdf_driver.rs

//! NetCDF 文件驱动
//!
//! 把磁盘上的自描述气象/基线化学文件读入 [`CtmData`]。
//! 仅在启用 `netcdf` 特性时编译；读入后立即执行全量校验，
//! 版本或格式问题在此处致命失败。

use crate::ctmdata::{CtmData, CtmVariable};
use crate::error::CtmError;
use crate::validate;
use netcdf::AttrValue;
use std::path::Path;
use tracing::info;

/// 读取根属性为浮点数
fn attr_f64(file: &netcdf::File, name: &'static str) -> Result<f64, CtmError> {
    let attr = file
        .attribute(name)
        .ok_or_else(|| CtmError::MissingAttribute(name.to_string()))?;
    match attr.value()? {
        AttrValue::Double(v) => Ok(v),
        AttrValue::Float(v) => Ok(v as f64),
        AttrValue::Doubles(v) if !v.is_empty() => Ok(v[0]),
        AttrValue::Floats(v) if !v.is_empty() => Ok(v[0] as f64),
        _ => Err(CtmError::MissingAttribute(name.to_string())),
    }
}

/// 读取根属性为整数
fn attr_usize(file: &netcdf::File, name: &'static str) -> Result<usize, CtmError> {
    let attr = file
        .attribute(name)
        .ok_or_else(|| CtmError::MissingAttribute(name.to_string()))?;
    match attr.value()? {
        AttrValue::Int(v) if v >= 0 => Ok(v as usize),
        AttrValue::Ints(v) if !v.is_empty() && v[0] >= 0 => Ok(v[0] as usize),
        AttrValue::Longlong(v) if v >= 0 => Ok(v as usize),
        _ => Err(CtmError::MissingAttribute(name.to_string())),
    }
}

/// 读取根属性为字符串
fn attr_string(file: &netcdf::File, name: &'static str) -> Result<String, CtmError> {
    let attr = file
        .attribute(name)
        .ok_or_else(|| CtmError::MissingAttribute(name.to_string()))?;
    match attr.value()? {
        AttrValue::Str(s) => Ok(s),
        _ => Err(CtmError::MissingAttribute(name.to_string())),
    }
}

/// 读取变量的字符串属性（缺省为空）
fn var_attr_string(var: &netcdf::Variable<'_>, name: &str) -> String {
    var.attribute(name)
        .and_then(|a| a.value().ok())
        .and_then(|v| match v {
            AttrValue::Str(s) => Some(s),
            _ => None,
        })
        .unwrap_or_default()
}

/// 从 NetCDF 文件加载 CTM 数据集
///
/// 读取全部变量与根属性，然后执行 [`validate::validate`]。
pub fn load_ctm_file(path: impl AsRef<Path>) -> Result<CtmData, CtmError> {
    let path = path.as_ref();
    let file = netcdf::open(path)?;

    let x0 = attr_f64(&file, "x0")?;
    let y0 = attr_f64(&file, "y0")?;
    let dx = attr_f64(&file, "dx")?;
    let dy = attr_f64(&file, "dy")?;
    let nx = attr_usize(&file, "nx")?;
    let ny = attr_usize(&file, "ny")?;
    let data_version = attr_string(&file, "data_version")?;

    // 垂直层数由中心量变量推断
    let nz = file
        .variable("Temperature")
        .ok_or_else(|| CtmError::MissingVariable("Temperature".to_string()))?
        .dimensions()
        .first()
        .map(|d| d.len())
        .unwrap_or(0);

    let mut data = CtmData::new(x0, y0, dx, dy, nx, ny, nz, data_version);

    for var in file.variables() {
        let name = var.name();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let len: usize = shape.iter().product();
        let mut values = vec![0.0f64; len];
        var.values_to(&mut values, None, None)?;

        let description = var_attr_string(&var, "description");
        let units = var_attr_string(&var, "units");
        let variable = CtmVariable::new(&name, shape, description, units, values)?;
        data.add_variable(name, variable);
    }

    validate::validate(&data)?;
    info!(
        path = %path.display(),
        nx = data.nx,
        ny = data.ny,
        nz = data.nz,
        "CTM 数据加载完成"
    );
    Ok(data)
}
