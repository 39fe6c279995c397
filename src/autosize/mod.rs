//! # 图片自动尺寸模块（autosize）
//!
//! ## 设计思路
//!
//! 该模块将“触发判断 → 来源加载 → 尺寸解码 → 属性写回”按职责拆分为多个子模块，
//! 避免单文件膨胀与耦合。
//!
//! - `handler`：编排单个元素的处理流水线
//! - `policy`：宽高分类、触发条件与写回值计算（纯函数）
//! - `loader`：负责 URL / data URI / 本地文件加载
//! - `decoder`：按签名分派的尺寸解码策略
//! - `element`：`<img>` 属性模型
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 调用链
//!
//! ```text
//! document::autosize_html（逐个 <img> 并发）
//!    ↓
//! handler.rs（ImageAutosizer::process）
//!    ├─ policy.rs（是否处理 / 写回什么）
//!    ├─ source.rs（src → ImageSource）
//!    ├─ loader.rs（读取字节）
//!    └─ decoder.rs（字节 → 自然尺寸）
//!    ↓
//! 写回 ImageElement 或返回 AutosizeError
//! ```
//!
//! ## 分层职责建议
//!
//! - 触发/计算规则变更优先改 `policy.rs`
//! - 新增图片格式优先改 `decoder.rs`
//! - 新增来源类型优先改 `source.rs` 与 `loader.rs`

mod config;
mod decoder;
mod element;
mod error;
mod handler;
mod loader;
mod policy;
mod source;

pub use config::AutosizeConfig;
pub use decoder::{DimensionDecoder, RasterDecoder, SvgDecoder, decode_dimensions, select_decoder};
pub use element::{Attribute, ImageElement};
pub use error::AutosizeError;
pub use handler::ImageAutosizer;
pub use policy::{SizeAssignment, SizeHint, assign, is_eligible};
pub use source::{Dimensions, ImageSource};
