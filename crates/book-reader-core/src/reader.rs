//! 双页阅读视图
//!
//! 维护左右页下标、选中词元和取书状态。状态只在离散事件中变化：
//! 取书完成、翻页、点击词元以及切换书籍。

use crate::model::{Book, Page, Token};
use crate::query::{BookSource, QueryError};
use crate::render;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 翻页策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    /// 下标限制在 [0, pages.len()) 内，边界处翻页无效
    #[default]
    Clamped,
    /// 不做边界检查，下标可以越过末页或变为负数，对应面板渲染为空
    Unbounded,
}

impl FromStr for PaginationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamped" => Ok(Self::Clamped),
            "unbounded" => Ok(Self::Unbounded),
            other => Err(format!("未知的翻页策略: {}", other)),
        }
    }
}

impl fmt::Display for PaginationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clamped => f.write_str("clamped"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// 取书失败
///
/// 阅读视图对所有变体一视同仁，只展示错误文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    Service(#[from] QueryError),
    #[error("Request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },
    #[error("Request failed: {0}")]
    Transport(String),
}

/// 书籍加载状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Ready(Book),
    Failed(String),
}

/// 当前可见的左右页下标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spread {
    pub left: i64,
    pub right: i64,
}

impl Spread {
    pub const INITIAL: Spread = Spread { left: 0, right: 1 };

    fn shifted(self, delta: i64) -> Self {
        Self {
            left: self.left + delta,
            right: self.right + delta,
        }
    }
}

/// 取书请求凭证
///
/// 记录发起请求时的书名与代数，完成时用来识别过期响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    title: String,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// 快照状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderStatus {
    Loading,
    Ready,
    Error,
}

/// 前端使用的阅读视图快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReaderSnapshot {
    /// 当前书籍 slug
    pub title: String,
    /// 取书代数，每次切换书籍加一
    pub generation: u64,
    /// 视图修订号，任何状态变化都会单调递增，前端据此丢弃乱序到达的旧快照
    pub revision: u64,
    /// 加载状态
    pub status: ReaderStatus,
    /// 书籍加载完成后的展示标题，用于窗口标题
    pub document_title: Option<String>,
    /// 左页下标
    pub left_page_index: i64,
    /// 右页下标
    pub right_page_index: i64,
    /// 左页文字，页不存在时为 None
    pub left_content: Option<String>,
    /// 右页文字，页不存在时为 None
    pub right_content: Option<String>,
    /// 左页词元在前，右页词元在后
    pub tokens: Vec<Token>,
    /// 当前选中的词元
    pub selected_token: Option<Token>,
    /// 上一页按钮是否可用
    pub can_go_previous: bool,
    /// 下一页按钮是否可用
    pub can_go_next: bool,
    /// 加载失败时的错误文本
    pub error: Option<String>,
    /// 渲染好的 HTML 片段
    pub html: String,
}

/// 阅读视图状态机
#[derive(Debug, Clone)]
pub struct ReaderView {
    title: String,
    generation: u64,
    revision: u64,
    spread: Spread,
    selected: Option<Token>,
    book: LoadState,
    mode: PaginationMode,
}

impl ReaderView {
    /// 以初始状态创建视图，并立即进入待加载状态
    ///
    /// # 参数
    /// - `title`: 要加载的书籍 slug
    /// - `mode`: 翻页策略
    pub fn new(title: impl Into<String>, mode: PaginationMode) -> Self {
        Self {
            title: title.into(),
            generation: 1,
            revision: 1,
            spread: Spread::INITIAL,
            selected: None,
            book: LoadState::Pending,
            mode,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn spread(&self) -> Spread {
        self.spread
    }

    pub fn selected_token(&self) -> Option<&Token> {
        self.selected.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.book
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn book(&self) -> Option<&Book> {
        match &self.book {
            LoadState::Ready(book) => Some(book),
            _ => None,
        }
    }

    /// 当前请求的凭证
    pub fn ticket(&self) -> FetchTicket {
        FetchTicket {
            generation: self.generation,
            title: self.title.clone(),
        }
    }

    /// 切换书籍
    ///
    /// 丢弃全部状态并回到初始状态，返回新请求的凭证。
    /// 重复选择同一本书同样会重新加载，可用于失败后重试。
    pub fn select_title(&mut self, title: impl Into<String>) -> FetchTicket {
        self.title = title.into();
        self.generation = self.generation.wrapping_add(1).max(1);
        self.spread = Spread::INITIAL;
        self.selected = None;
        self.book = LoadState::Pending;
        self.touch();
        info!("reader: loading {} (generation {})", self.title, self.generation);
        self.ticket()
    }

    /// 提交取书结果
    ///
    /// # 返回
    /// 结果被采纳返回 true；凭证已过期（期间切换过书籍）返回 false
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, result: Result<Book, FetchError>) -> bool {
        if ticket.generation != self.generation || ticket.title != self.title {
            debug!(
                "reader: dropping stale response for {} (generation {}, current {})",
                ticket.title, ticket.generation, self.generation
            );
            return false;
        }

        self.book = match result {
            Ok(book) => LoadState::Ready(book),
            Err(e) => {
                warn!("reader: failed to load {}: {}", self.title, e);
                LoadState::Failed(e.to_string())
            }
        };
        self.touch();
        true
    }

    pub fn can_go_next(&self) -> bool {
        match (&self.book, self.mode) {
            (LoadState::Ready(_), PaginationMode::Unbounded) => true,
            (LoadState::Ready(book), PaginationMode::Clamped) => {
                self.spread.left.saturating_add(2) < book.page_count() as i64
            }
            _ => false,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        match (&self.book, self.mode) {
            (LoadState::Ready(_), PaginationMode::Unbounded) => true,
            (LoadState::Ready(_), PaginationMode::Clamped) => self.spread.left >= 2,
            _ => false,
        }
    }

    /// 向后翻两页，并清除选中词元
    ///
    /// 边界处翻页无效，但选中词元同样会被清除
    ///
    /// # 返回
    /// 是否实际翻页
    pub fn next_page(&mut self) -> bool {
        let moved = self.can_go_next();
        self.turn(if moved { 2 } else { 0 });
        moved
    }

    /// 向前翻两页，并清除选中词元
    pub fn previous_page(&mut self) -> bool {
        let moved = self.can_go_previous();
        self.turn(if moved { -2 } else { 0 });
        moved
    }

    fn turn(&mut self, delta: i64) {
        if delta == 0 && self.selected.is_none() {
            return;
        }
        self.spread = self.spread.shifted(delta);
        self.selected = None;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// 点击词元
    ///
    /// # 参数
    /// - `index`: 在当前可见词元列表（左页在前）中的下标
    ///
    /// # 返回
    /// 下标有效时选中该词元并返回 true
    pub fn click_token(&mut self, index: usize) -> bool {
        let token = self.visible_tokens().get(index).map(|t| (*t).clone());
        match token {
            Some(token) => {
                self.selected = Some(token);
                self.touch();
                true
            }
            None => false,
        }
    }

    /// 点击某一对页上的词元
    ///
    /// 下标只在发出点击时的那对页上有意义，书籍或页已经变化时忽略点击
    ///
    /// # 参数
    /// - `generation`: 发出点击时页面所属的取书代数
    /// - `left_page_index`: 发出点击时的左页下标
    /// - `index`: 在该对页可见词元列表中的下标
    pub fn click_token_on(&mut self, generation: u64, left_page_index: i64, index: usize) -> bool {
        if generation != self.generation || left_page_index != self.spread.left {
            debug!(
                "reader: ignoring click on spread {} (generation {}), current {} (generation {})",
                left_page_index, generation, self.spread.left, self.generation
            );
            return false;
        }
        self.click_token(index)
    }

    pub fn left_page(&self) -> Option<&Page> {
        self.book().and_then(|b| b.page(self.spread.left))
    }

    pub fn right_page(&self) -> Option<&Page> {
        self.book().and_then(|b| b.page(self.spread.right))
    }

    /// 当前两页的词元，左页在前
    pub fn visible_tokens(&self) -> Vec<&Token> {
        self.left_page()
            .into_iter()
            .chain(self.right_page())
            .flat_map(|page| page.tokens.iter())
            .collect()
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let (status, error) = match &self.book {
            LoadState::Pending => (ReaderStatus::Loading, None),
            LoadState::Ready(_) => (ReaderStatus::Ready, None),
            LoadState::Failed(message) => (ReaderStatus::Error, Some(message.clone())),
        };

        ReaderSnapshot {
            title: self.title.clone(),
            generation: self.generation,
            revision: self.revision,
            status,
            document_title: self.book().map(|b| b.title.clone()),
            left_page_index: self.spread.left,
            right_page_index: self.spread.right,
            left_content: self.left_page().map(|p| p.content.clone()),
            right_content: self.right_page().map(|p| p.content.clone()),
            tokens: self.visible_tokens().into_iter().cloned().collect(),
            selected_token: self.selected.clone(),
            can_go_previous: self.can_go_previous(),
            can_go_next: self.can_go_next(),
            error,
            html: render::render_reader(self),
        }
    }
}

/// 在阻塞线程上执行取书，并施加超时
///
/// 取书本身不可取消，超时后仍会在后台跑完，结果被丢弃
pub async fn fetch_book(
    source: Arc<dyn BookSource>,
    ticket: &FetchTicket,
    timeout: Duration,
) -> Result<Book, FetchError> {
    let title = ticket.title().to_string();
    let task = tokio::task::spawn_blocking(move || source.get_book(&title));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result.map_err(FetchError::from),
        Ok(Err(join_err)) => Err(FetchError::Transport(join_err.to_string())),
        Err(_) => Err(FetchError::Timeout { after: timeout }),
    }
}
