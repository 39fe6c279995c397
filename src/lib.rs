//! # img-autosize 库入口
//!
//! 为 HTML 中的 `<img>` 补全缺失的 `width`/`height`：读取图片真实像素尺寸，
//! 按触发规则写回属性；只给出一侧尺寸时按原图比例计算另一侧。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  document        定位 <img> 标签 · 并发处理 · 无损回写     │
//! │       ↓                                                  │
//! │  autosize                                                │
//! │   ├─ policy      SizeHint 分类 / 触发条件 / 等比计算       │
//! │   ├─ loader      本地文件 · HTTP(S) · data URI             │
//! │   ├─ decoder     JPEG/PNG/GIF/BMP/WebP/TIFF · SVG          │
//! │   └─ handler     ImageAutosizer 单元素编排                 │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`autosize`] | 单个 `<img>` 的尺寸解析与属性写回 |
//! | [`document`] | 在 HTML 文本中查找 `<img>` 并整体处理，失败即中止 |
//!
//! ## 示例
//!
//! ```rust,no_run
//! use img_autosize::{AutosizeConfig, ImageAutosizer};
//!
//! # async fn demo() -> Result<(), img_autosize::AutosizeError> {
//! let autosizer = ImageAutosizer::new(AutosizeConfig::with_root("./test/img"))?;
//! let html = autosizer
//!     .process_html(r#"<img src="100x201.jpg" width="auto" height="auto">"#)
//!     .await?;
//! assert_eq!(html, r#"<img src="100x201.jpg" width="100" height="201">"#);
//! # Ok(())
//! # }
//! ```

pub mod autosize;
pub mod document;

pub use autosize::{
    AutosizeConfig, AutosizeError, Dimensions, ImageAutosizer, ImageElement, ImageSource,
    SizeAssignment, SizeHint, assign, decode_dimensions, is_eligible,
};
