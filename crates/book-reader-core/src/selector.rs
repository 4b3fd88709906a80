use crate::slug::{BookSlug, SlugError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("书目列表为空")]
    Empty,
    #[error("书目中的 slug 不合法: {0}")]
    InvalidSlug(#[from] SlugError),
    #[error("未知的书目: {0}")]
    UnknownTitle(String),
}

/// 书目选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleOption {
    pub slug: String,
    pub display_label: String,
}

impl TitleOption {
    pub fn new(slug: &str, display_label: &str) -> Self {
        Self {
            slug: slug.to_string(),
            display_label: display_label.to_string(),
        }
    }
}

/// 随应用打包的书目，不从服务端获取
pub fn bundled_titles() -> Vec<TitleOption> {
    vec![
        TitleOption::new("a_color_of_his_own", "A Color of His Own"),
        TitleOption::new("fishing_in_the_air", "Fishing in the Air"),
    ]
}

/// 书籍选择器
///
/// 只保存当前选中的 slug，初始为第一项
#[derive(Debug, Clone)]
pub struct BookSelector {
    options: Vec<TitleOption>,
    selected: usize,
}

impl BookSelector {
    pub fn new(options: Vec<TitleOption>) -> Result<Self, SelectorError> {
        if options.is_empty() {
            return Err(SelectorError::Empty);
        }
        for option in &options {
            BookSlug::parse(&option.slug)?;
        }
        Ok(Self {
            options,
            selected: 0,
        })
    }

    pub fn bundled() -> Result<Self, SelectorError> {
        Self::new(bundled_titles())
    }

    pub fn options(&self) -> &[TitleOption] {
        &self.options
    }

    pub fn selected(&self) -> &TitleOption {
        &self.options[self.selected]
    }

    /// 选择书目
    ///
    /// # 返回
    /// - Ok(true): 选中项发生变化
    /// - Ok(false): 与当前选中项相同
    /// - Err: slug 不在书目中
    pub fn choose(&mut self, slug: &str) -> Result<bool, SelectorError> {
        let index = self
            .options
            .iter()
            .position(|o| o.slug == slug)
            .ok_or_else(|| SelectorError::UnknownTitle(slug.to_string()))?;
        let changed = index != self.selected;
        self.selected = index;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_defaults_to_first() {
        let selector = BookSelector::bundled().unwrap();
        assert_eq!(selector.options().len(), 2);
        assert_eq!(selector.selected().slug, "a_color_of_his_own");
        assert_eq!(selector.selected().display_label, "A Color of His Own");
    }

    #[test]
    fn test_choose_known_title() {
        let mut selector = BookSelector::bundled().unwrap();
        assert_eq!(selector.choose("fishing_in_the_air"), Ok(true));
        assert_eq!(selector.selected().slug, "fishing_in_the_air");
        assert_eq!(selector.choose("fishing_in_the_air"), Ok(false));
    }

    #[test]
    fn test_choose_unknown_title_keeps_selection() {
        let mut selector = BookSelector::bundled().unwrap();
        assert_eq!(
            selector.choose("A Color of His Own"),
            Err(SelectorError::UnknownTitle("A Color of His Own".to_string()))
        );
        assert_eq!(selector.selected().slug, "a_color_of_his_own");
    }

    #[test]
    fn test_empty_options_rejected() {
        assert_eq!(BookSelector::new(vec![]).unwrap_err(), SelectorError::Empty);
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let err = BookSelector::new(vec![TitleOption::new("../x", "X")]).unwrap_err();
        assert!(matches!(err, SelectorError::InvalidSlug(_)));
    }

    #[test]
    fn test_option_json_contract() {
        let json = serde_json::to_value(TitleOption::new("a", "A")).unwrap();
        assert_eq!(json["displayLabel"], "A");
    }
}
