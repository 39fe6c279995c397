//! # 尺寸策略模块
//!
//! ## 设计思路
//!
//! 把“是否处理”和“写回什么值”做成纯函数，与 I/O 完全解耦，便于单独测试。
//!
//! 每个尺寸属性先被归类为 [`SizeHint`]：
//! - `Auto`：待计算（值恰为 `"auto"`；开启 `process_empty_size` 时还包括缺失/空值）
//! - `Fixed(n)`：已给定的正数，作为等比计算的固定边
//! - `Unspecified`：不参与计算也不被改写（默认模式下的缺失值、非数值内容、`0`）
//!
//! 写回的值至少为 1。
//!
//! ## 实现思路
//!
//! - [`is_eligible`] 决定元素是否需要加载图片。
//! - [`assign`] 根据自然尺寸与两侧提示计算需要写回的值，只返回 `Auto` 侧。

use super::Dimensions;

/// 单个尺寸属性的分类结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeHint {
    Auto,
    Fixed(f64),
    Unspecified,
}

impl SizeHint {
    /// 对属性原始值分类。
    ///
    /// # 示例
    /// ```rust
    /// use img_autosize::SizeHint;
    ///
    /// assert_eq!(SizeHint::classify(Some("auto"), false), SizeHint::Auto);
    /// assert_eq!(SizeHint::classify(None, false), SizeHint::Unspecified);
    /// assert_eq!(SizeHint::classify(Some(""), true), SizeHint::Auto);
    /// assert_eq!(SizeHint::classify(Some("104"), true), SizeHint::Fixed(104.0));
    /// ```
    pub fn classify(value: Option<&str>, process_empty_size: bool) -> Self {
        match value {
            Some("auto") => Self::Auto,
            None | Some("") if process_empty_size => Self::Auto,
            None | Some("") => Self::Unspecified,
            Some(v) => match parse_leading_number(v.trim_start()) {
                Some((n, _)) if n.is_finite() && n > 0.0 => Self::Fixed(n),
                _ => Self::Unspecified,
            },
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// 计算结果：仅包含需要写回的属性。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeAssignment {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// 判断元素是否需要处理：`src` 非空，且至少一侧为 `Auto`。
pub fn is_eligible(src: Option<&str>, width: SizeHint, height: SizeHint) -> bool {
    let has_src = src.is_some_and(|s| !s.trim().is_empty());
    has_src && (width.is_auto() || height.is_auto())
}

/// 根据自然尺寸计算写回值。
///
/// 一侧为 `Auto`、另一侧为 `Fixed` 时按比例缩放；否则 `Auto` 侧取自然尺寸。
///
/// # 示例
/// ```rust
/// use img_autosize::{Dimensions, SizeHint, assign};
///
/// let result = assign(Dimensions::new(111, 52), SizeHint::Auto, SizeHint::Fixed(104.0));
/// assert_eq!(result.width, Some(222));
/// assert_eq!(result.height, None);
/// ```
pub fn assign(natural: Dimensions, width: SizeHint, height: SizeHint) -> SizeAssignment {
    let w = f64::from(natural.width);
    let h = f64::from(natural.height);

    match (width, height) {
        (SizeHint::Auto, SizeHint::Auto) => SizeAssignment {
            width: Some(natural.width),
            height: Some(natural.height),
        },
        (SizeHint::Auto, SizeHint::Fixed(fixed_h)) => SizeAssignment {
            width: Some(round_to_u32(w * fixed_h / h)),
            height: None,
        },
        (SizeHint::Fixed(fixed_w), SizeHint::Auto) => SizeAssignment {
            width: None,
            height: Some(round_to_u32(h * fixed_w / w)),
        },
        (SizeHint::Auto, _) => SizeAssignment {
            width: Some(natural.width),
            height: None,
        },
        (_, SizeHint::Auto) => SizeAssignment {
            width: None,
            height: Some(natural.height),
        },
        _ => SizeAssignment::default(),
    }
}

fn round_to_u32(value: f64) -> u32 {
    value.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// 解析字符串开头的十进制数（可带符号与小数点），返回数值与剩余部分。
///
/// `"100px"` → `(100.0, "px")`，`"abc"` → `None`。
pub(crate) fn parse_leading_number(value: &str) -> Option<(f64, &str)> {
    let bytes = value.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let digits_start = end;
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    let number = &value[digits_start..end];
    if !number.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    value[..end].parse::<f64>().ok().map(|n| (n, &value[end..]))
}
