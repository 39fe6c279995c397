//! # 尺寸解码模块
//!
//! ## 设计思路
//!
//! 解码只关心“字节 → 自然尺寸”，不做完整像素解码。
//! 每类格式对应一个 [`DimensionDecoder`] 策略，由 [`select_decoder`] 按文件签名分派：
//! - 位图（JPEG/PNG/GIF/BMP/WebP/TIFF）：`infer` 识别签名，`image` 只读取头部尺寸
//! - SVG：文本格式无固定签名，按内容探测后读取 `width`/`height`/`viewBox`
//!
//! ## 实现思路
//!
//! 1. `infer` 命中图片签名 → 映射为 `image::ImageFormat`
//! 2. 未命中且内容像 XML/SVG → `SvgDecoder`
//! 3. 其余一律视为不支持的格式

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use super::policy::parse_leading_number;
use super::{AutosizeError, Dimensions};

/// 尺寸解码能力：给定字节，返回自然尺寸或失败。
pub trait DimensionDecoder: Send + Sync {
    /// 策略名称（用于日志）。
    fn name(&self) -> &'static str;

    fn decode(&self, bytes: &[u8]) -> Result<Dimensions, AutosizeError>;
}

/// 位图格式：只解析头部，不解码像素。
pub struct RasterDecoder {
    format: ImageFormat,
}

impl RasterDecoder {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }
}

impl DimensionDecoder for RasterDecoder {
    fn name(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("raster")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Dimensions, AutosizeError> {
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), self.format)
            .into_dimensions()
            .map_err(|e| AutosizeError::Decode(format!("无法读取图片尺寸：{}", e)))?;

        positive_dimensions(width, height)
    }
}

/// SVG：从根元素的 `width`/`height`/`viewBox` 推导尺寸。
pub struct SvgDecoder;

/// 长度单位换算（按 96 dpi）。
const SVG_UNITS: &[(&str, f64)] = &[
    ("", 1.0),
    ("px", 1.0),
    ("pt", 96.0 / 72.0),
    ("pc", 16.0),
    ("in", 96.0),
    ("cm", 96.0 / 2.54),
    ("mm", 96.0 / 25.4),
    ("em", 16.0),
    ("ex", 8.0),
];

impl SvgDecoder {
    fn parse_length(value: &str) -> Option<f64> {
        let (number, unit) = parse_leading_number(value.trim())?;
        let unit = unit.trim();
        SVG_UNITS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(unit))
            .map(|(_, factor)| number * factor)
            .filter(|len| *len > 0.0)
    }

    fn parse_view_box(value: &str) -> Option<(f64, f64)> {
        let parts: Vec<f64> = value
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<_, _>>()
            .ok()?;

        match parts.as_slice() {
            [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
            _ => None,
        }
    }
}

impl DimensionDecoder for SvgDecoder {
    fn name(&self) -> &'static str {
        "svg"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Dimensions, AutosizeError> {
        let text = std::str::from_utf8(strip_bom(bytes))
            .map_err(|e| AutosizeError::Decode(format!("SVG 不是有效的 UTF-8 文本：{}", e)))?;

        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = true;
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| AutosizeError::Decode(format!("SVG 解析失败：{}", e)))?;

        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(AutosizeError::Decode(format!(
                "根元素不是 <svg>：<{}>",
                root.tag_name().name()
            )));
        }

        let width = root.attribute("width").and_then(Self::parse_length);
        let height = root.attribute("height").and_then(Self::parse_length);
        let view_box = root.attribute("viewBox").and_then(Self::parse_view_box);

        let (w, h) = match (width, height, view_box) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, Some((vw, vh))) => (w, w * vh / vw),
            (None, Some(h), Some((vw, vh))) => (h * vw / vh, h),
            (None, None, Some((vw, vh))) => (vw, vh),
            _ => {
                return Err(AutosizeError::Decode(
                    "SVG 缺少可用的 width/height/viewBox".to_string(),
                ));
            }
        };

        positive_dimensions(round_length(w)?, round_length(h)?)
    }
}

fn round_length(value: f64) -> Result<u32, AutosizeError> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < 0.0 || rounded > f64::from(u32::MAX) {
        return Err(AutosizeError::Decode(format!("SVG 尺寸超出范围：{}", value)));
    }
    Ok(rounded as u32)
}

fn positive_dimensions(width: u32, height: u32) -> Result<Dimensions, AutosizeError> {
    if width == 0 || height == 0 {
        return Err(AutosizeError::Decode(format!(
            "图片尺寸无效：{}x{}",
            width, height
        )));
    }
    Ok(Dimensions::new(width, height))
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// 粗略判断内容是否为 SVG/XML 文本。
fn looks_like_svg(bytes: &[u8]) -> bool {
    let body = strip_bom(bytes);
    let head = String::from_utf8_lossy(&body[..body.len().min(4096)]);
    head.trim_start().starts_with('<') && head.contains("<svg")
}

/// 按文件签名选择解码策略。
pub fn select_decoder(bytes: &[u8]) -> Result<Box<dyn DimensionDecoder>, AutosizeError> {
    if bytes.is_empty() {
        return Err(AutosizeError::InvalidFormat("图片内容为空".to_string()));
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() == infer::MatcherType::Image && kind.mime_type() != "image/svg+xml" {
            return match ImageFormat::from_mime_type(kind.mime_type()) {
                Some(format) if format.reading_enabled() => Ok(Box::new(RasterDecoder::new(format))),
                _ => Err(AutosizeError::InvalidFormat(format!(
                    "不支持的图片格式：{}",
                    kind.mime_type()
                ))),
            };
        }
    }

    if looks_like_svg(bytes) {
        return Ok(Box::new(SvgDecoder));
    }

    let detected = infer::get(bytes).map(|kind| kind.mime_type()).unwrap_or("未知");
    Err(AutosizeError::InvalidFormat(format!(
        "无法识别图片类型：{}",
        detected
    )))
}

/// 识别格式并读取自然尺寸。
///
/// # 示例
/// ```rust
/// use img_autosize::{Dimensions, decode_dimensions};
///
/// let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 203 150"></svg>"#;
/// assert_eq!(decode_dimensions(svg)?, Dimensions::new(203, 150));
/// # Ok::<(), img_autosize::AutosizeError>(())
/// ```
pub fn decode_dimensions(bytes: &[u8]) -> Result<Dimensions, AutosizeError> {
    let decoder = select_decoder(bytes)?;
    let dimensions = decoder.decode(bytes)?;
    log::debug!("🔍 解码器 {} 读取尺寸：{}", decoder.name(), dimensions);
    Ok(dimensions)
}
