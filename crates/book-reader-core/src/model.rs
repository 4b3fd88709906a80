use serde::{Deserialize, Deserializer, Serialize};

/// 书籍文档
///
/// 存储格式与查询响应使用同一套 schema，字段名保持一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// 展示标题（不一定等于 slug）
    pub title: String,
    pub author: String,
    /// 按阅读顺序排列的页面，系统内不做任何重排
    pub pages: Vec<Page>,
}

/// 单页内容及其分词
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 期望等于页面在 pages 中的位置，但不强制校验
    pub page_index: i64,
    pub content: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tokens: Vec<Token>,
}

/// 可点击的词元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// 位置坐标，语义由作者定义，系统视为不透明数据
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position: Vec<i64>,
    pub value: String,
}

impl Book {
    /// 按下标取页，越界（包括负数）返回 None
    pub fn page(&self, index: i64) -> Option<&Page> {
        usize::try_from(index).ok().and_then(|i| self.pages.get(i))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

// 文档里 `"tokens": null` 与缺省等价
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_lookup_out_of_range() {
        let book = Book {
            title: "t".to_string(),
            author: "a".to_string(),
            pages: vec![Page {
                page_index: 0,
                content: "only".to_string(),
                tokens: vec![],
            }],
        };

        assert_eq!(book.page(0).map(|p| p.content.as_str()), Some("only"));
        assert!(book.page(1).is_none());
        assert!(book.page(-2).is_none());
    }

    #[test]
    fn test_wire_field_names() {
        let page = Page {
            page_index: 3,
            content: "Once".to_string(),
            tokens: vec![Token {
                position: vec![0, 4],
                value: "Once".to_string(),
            }],
        };

        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["pageIndex"], 3);
        assert_eq!(json["tokens"][0]["position"][1], 4);
        assert!(json.get("page_index").is_none());
    }

    #[test]
    fn test_missing_or_null_tokens_default_to_empty() {
        let page: Page = serde_json::from_str(r#"{"pageIndex":0,"content":"x"}"#).unwrap();
        assert!(page.tokens.is_empty());

        let page: Page =
            serde_json::from_str(r#"{"pageIndex":0,"content":"x","tokens":null}"#).unwrap();
        assert!(page.tokens.is_empty());

        let token: Token = serde_json::from_str(r#"{"value":"x","position":null}"#).unwrap();
        assert!(token.position.is_empty());
    }

    #[test]
    fn test_required_fields_rejected_when_missing() {
        // 缺少 author
        let result: Result<Book, _> = serde_json::from_str(r#"{"title":"t","pages":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_mismatched_page_index_accepted() {
        let book: Book = serde_json::from_str(
            r#"{"title":"t","author":"a","pages":[{"pageIndex":7,"content":"x","tokens":[]}]}"#,
        )
        .unwrap();
        assert_eq!(book.pages[0].page_index, 7);
        assert_eq!(book.page(0).map(|p| p.page_index), Some(7));
    }
}
