// crates/ap_foundation/src/lib.rs

//! atmoPlume 基础层
//!
//! 提供整个项目的基础设施：统一错误类型、数值容差常量与输入校验辅助。
//! 本层不依赖项目内任何其他 crate，也不引入网格、物理等领域概念。
//!
//! # 分层约定
//!
//! ```text
//! ap_sim (Layer 5)
//!   ↓
//! ap_physics (Layer 4)
//!   ↓
//! ap_grid (Layer 3)
//!   ↓
//! ap_config / ap_io (Layer 2)
//!   ↓
//! ap_foundation / ap_geo ← 你在这里 (Layer 1)
//! ```

pub mod error;
pub mod tolerance;
pub mod validation;

pub use error::{PlumeError, PlumeResult};
