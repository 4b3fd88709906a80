use crate::model::Book;
use crate::slug::BookSlug;
use crate::store::{BookStore, StoreError};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 对外可见的查询错误
///
/// 不存在与文档损坏对客户端不做区分
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryError {
    #[error("Book not found")]
    BookNotFound,
}

/// 书籍数据源
///
/// 阅读视图通过此 trait 取书，测试时可替换为假数据源
pub trait BookSource: Send + Sync {
    fn get_book(&self, title: &str) -> Result<Book, QueryError>;
}

/// 查询服务
///
/// 内容检索的唯一入口，幂等且无副作用
pub struct QueryService<S: BookStore> {
    store: S,
}

impl<S: BookStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// getBook 查询
    ///
    /// # 参数
    /// - `title`: 书籍 slug（非空，大小写敏感）
    ///
    /// # 返回
    /// 完整的 Book，或统一的 BookNotFound 错误
    pub fn get_book(&self, title: &str) -> Result<Book, QueryError> {
        let slug = match BookSlug::parse(title) {
            Ok(slug) => slug,
            Err(e) => {
                warn!("getBook rejected title {:?}: {}", title, e);
                return Err(QueryError::BookNotFound);
            }
        };

        match self.store.load(&slug) {
            Ok(book) => {
                debug!("getBook loaded {} ({} pages)", slug, book.page_count());
                Ok(book)
            }
            Err(e) => {
                log_store_error(&e);
                Err(QueryError::BookNotFound)
            }
        }
    }
}

impl<S: BookStore> BookSource for QueryService<S> {
    fn get_book(&self, title: &str) -> Result<Book, QueryError> {
        QueryService::get_book(self, title)
    }
}

fn log_store_error(err: &StoreError) {
    match err {
        StoreError::NotFound { .. } => warn!("getBook: {}", err),
        StoreError::Malformed { .. } | StoreError::Encoding { .. } | StoreError::Io { .. } => {
            error!("getBook: {}", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Page, Token};
    use std::fs;
    use tempfile::TempDir;

    fn sample_book() -> Book {
        Book {
            title: "Fishing in the Air".to_string(),
            author: "Sharon Creech".to_string(),
            pages: vec![
                Page {
                    page_index: 0,
                    content: "One summer morning".to_string(),
                    tokens: vec![
                        Token { position: vec![0, 3], value: "One".to_string() },
                        Token { position: vec![4, 10], value: "summer".to_string() },
                    ],
                },
                Page {
                    page_index: 1,
                    content: "we went fishing".to_string(),
                    tokens: vec![],
                },
            ],
        }
    }

    fn service_with(files: &[(&str, String)]) -> (TempDir, QueryService<crate::store::DirectoryStore>) {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let service = QueryService::new(crate::store::DirectoryStore::new(dir.path()));
        (dir, service)
    }

    #[test]
    fn test_get_book_round_trip_identity() {
        let book = sample_book();
        let stored = serde_json::to_string(&book).unwrap();
        let (_dir, service) = service_with(&[("fishing_in_the_air.json", stored)]);

        let loaded = service.get_book("fishing_in_the_air").unwrap();
        assert_eq!(loaded, book);
    }

    #[test]
    fn test_get_book_missing_is_generic_error() {
        let (_dir, service) = service_with(&[]);
        let err = service.get_book("nope").unwrap_err();
        assert_eq!(err, QueryError::BookNotFound);
        assert_eq!(err.to_string(), "Book not found");
    }

    #[test]
    fn test_get_book_malformed_is_same_error() {
        let (_dir, service) = service_with(&[("broken.json", "not json".to_string())]);
        assert_eq!(service.get_book("broken"), Err(QueryError::BookNotFound));
    }

    #[test]
    fn test_get_book_rejects_bad_slug_without_touching_disk() {
        let (_dir, service) = service_with(&[]);
        assert_eq!(service.get_book(""), Err(QueryError::BookNotFound));
        assert_eq!(service.get_book("../etc/passwd"), Err(QueryError::BookNotFound));
    }

    #[test]
    fn test_get_book_rereads_every_call() {
        let (dir, service) = service_with(&[(
            "fishing_in_the_air.json",
            serde_json::to_string(&sample_book()).unwrap(),
        )]);
        assert!(service.get_book("fishing_in_the_air").is_ok());

        // 删除文件后再次查询应失败，说明没有缓存
        fs::remove_file(dir.path().join("fishing_in_the_air.json")).unwrap();
        assert_eq!(service.get_book("fishing_in_the_air"), Err(QueryError::BookNotFound));
    }

    #[test]
    fn test_get_book_is_idempotent() {
        let (_dir, service) = service_with(&[(
            "fishing_in_the_air.json",
            serde_json::to_string(&sample_book()).unwrap(),
        )]);
        let first = service.get_book("fishing_in_the_air").unwrap();
        let second = service.get_book("fishing_in_the_air").unwrap();
        assert_eq!(first, second);
    }
}
