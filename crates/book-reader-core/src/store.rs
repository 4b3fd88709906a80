use crate::model::Book;
use crate::slug::BookSlug;
use encoding_rs::UTF_8;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 内容存储错误
///
/// 内部保留完整区分，查询服务对外统一为 "Book not found"
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("书籍不存在: {slug}")]
    NotFound { slug: String },
    #[error("书籍文档格式错误 ({slug}): {source}")]
    Malformed {
        slug: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("书籍文档编码错误: {slug}")]
    Encoding { slug: String },
    #[error("读取书籍文档失败 ({slug}): {source}")]
    Io {
        slug: String,
        #[source]
        source: std::io::Error,
    },
}

/// 书籍存储 trait
///
/// 只读，每次调用都重新读取，不做缓存
pub trait BookStore: Send + Sync {
    /// 按 slug 加载完整书籍文档
    fn load(&self, slug: &BookSlug) -> Result<Book, StoreError>;
}

/// 基于目录的存储
///
/// 每本书一个 `<slug>.json` 文件
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// slug 对应的文档路径
    pub fn document_path(&self, slug: &BookSlug) -> PathBuf {
        self.root.join(slug.file_name())
    }

    /// 列出目录中所有文档的 slug（按字典序）
    ///
    /// 文件名不是合法 slug 的文档会被跳过
    pub fn available_slugs(&self) -> Result<Vec<BookSlug>, std::io::Error> {
        let mut slugs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if let Ok(slug) = BookSlug::parse(stem) {
                slugs.push(slug);
            }
        }
        slugs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(slugs)
    }
}

impl BookStore for DirectoryStore {
    fn load(&self, slug: &BookSlug) -> Result<Book, StoreError> {
        let path = self.document_path(slug);

        // 1. 读取文件字节
        let bytes = fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                slug: slug.to_string(),
            },
            _ => StoreError::Io {
                slug: slug.to_string(),
                source,
            },
        })?;

        // 2. 解码（有 BOM 时按 BOM，否则按 UTF-8）
        let text = decode_document(&bytes).ok_or_else(|| StoreError::Encoding {
            slug: slug.to_string(),
        })?;

        // 3. 解析为 Book
        serde_json::from_str(&text).map_err(|source| StoreError::Malformed {
            slug: slug.to_string(),
            source,
        })
    }
}

/// 解码文档字节
///
/// 存在非法字节序列时返回 None，不做替换字符降级
fn decode_document(bytes: &[u8]) -> Option<String> {
    let (encoding, bom_len) = encoding_rs::Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(|text| text.into_owned())
}
