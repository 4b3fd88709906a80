use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("书名 slug 为空")]
    Empty,
    #[error("非法的书名 slug: {0}")]
    Invalid(String),
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // 只允许可以直接作为文件名的字符，排除 `..` 和路径分隔符
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("slug pattern is valid")
    })
}

/// 书籍 slug
///
/// 用于定位存储文档的键，大小写敏感，与展示标题不同
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookSlug(String);

impl BookSlug {
    /// 校验并创建 slug
    ///
    /// # 参数
    /// - `raw`: 调用方传入的原始标题键
    ///
    /// # 返回
    /// 合法时返回 BookSlug，否则返回 SlugError
    pub fn parse(raw: &str) -> Result<Self, SlugError> {
        if raw.is_empty() {
            return Err(SlugError::Empty);
        }
        if !slug_pattern().is_match(raw) {
            return Err(SlugError::Invalid(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 对应的存储文件名
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for BookSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BookSlug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BookSlug> for String {
    fn from(slug: BookSlug) -> Self {
        slug.0
    }
}
