//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“`src` 属性语义”和“流水线中间结果”解耦：
//! - `ImageSource` 表示 `src` 指向的来源（远程 URL / data URI / 本地文件）
//! - `RawImageData` 表示已加载但未解码的字节
//! - `Dimensions` 表示解码得到的自然尺寸

use std::fmt;
use std::path::PathBuf;

use super::AutosizeConfig;

/// 图片输入来源，每次处理时由 `src` 重新推导。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// 网络地址来源（协议相对地址已补全为 `https:`）。
    Url(String),
    /// `data:` URI 内联图片。
    DataUri(String),
    /// 本地文件路径来源（已按 `root` 解析）。
    FilePath(PathBuf),
}

impl ImageSource {
    /// 根据 `src` 与配置推导来源。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::{AutosizeConfig, ImageSource};
    /// use std::path::PathBuf;
    ///
    /// let config = AutosizeConfig::with_root("public");
    /// assert_eq!(
    ///     ImageSource::resolve("//cdn.example.com/a.png", &config),
    ///     ImageSource::Url("https://cdn.example.com/a.png".into())
    /// );
    /// assert_eq!(
    ///     ImageSource::resolve("/img/a.png?v=2", &config),
    ///     ImageSource::FilePath(PathBuf::from("public/img/a.png"))
    /// );
    /// ```
    pub fn resolve(src: &str, config: &AutosizeConfig) -> Self {
        let src = src.trim();

        if has_prefix_ignore_case(src, "http://") || has_prefix_ignore_case(src, "https://") {
            return Self::Url(src.to_string());
        }

        if let Some(rest) = src.strip_prefix("//") {
            return Self::Url(format!("https://{}", rest));
        }

        if has_prefix_ignore_case(src, "data:") {
            return Self::DataUri(src.to_string());
        }

        let path = src
            .split(['?', '#'])
            .next()
            .unwrap_or(src)
            .trim_start_matches('/');
        Self::FilePath(config.root_dir().join(path))
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::DataUri(_) => f.write_str("data:..."),
            Self::FilePath(path) => write!(f, "{}", path.display()),
        }
    }
}

fn has_prefix_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// 图片自然尺寸（像素），宽高均为正整数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
