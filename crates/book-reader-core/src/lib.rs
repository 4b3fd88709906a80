// 绘本阅读器核心
// 书籍数据模型、内容存储、查询服务，以及双页阅读视图状态机

pub mod config;
pub mod model;
pub mod query;
pub mod reader;
pub mod render;
pub mod selector;
pub mod slug;
pub mod store;

// 重新导出主要类型
pub use config::{ConfigError, ReaderConfig};
pub use model::{Book, Page, Token};
pub use query::{BookSource, QueryError, QueryService};
pub use reader::{
    fetch_book, FetchError, FetchTicket, LoadState, PaginationMode, ReaderSnapshot, ReaderStatus,
    ReaderView, Spread,
};
pub use selector::{bundled_titles, BookSelector, SelectorError, TitleOption};
pub use slug::{BookSlug, SlugError};
pub use store::{BookStore, DirectoryStore, StoreError};
