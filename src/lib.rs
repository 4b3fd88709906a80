use book_reader_core::config::DEFAULT_CONFIG_PATH;
use book_reader_core::{
    fetch_book, Book, BookSelector, BookSource, DirectoryStore, PaginationMode, QueryService,
    ReaderConfig, ReaderSnapshot, ReaderView, TitleOption,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_log::{log::LevelFilter, Target, TargetKind};

/// 跨 IPC 边界返回给前端的错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct BridgeError {
    code: String,
    message: String,
}

/// 书目选择器状态
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogState {
    options: Vec<TitleOption>,
    selected: String,
}

/// 阅读状态变化事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReaderStateEvent {
    request_id: u64,
    action: String,
    reader: ReaderSnapshot,
}

/// 后端可变状态，所有阅读事件在同一把锁下原子地应用
struct BackendState {
    selector: BookSelector,
    reader: ReaderView,
    next_request_id: u64,
}

impl BackendState {
    fn new(selector: BookSelector, pagination: PaginationMode) -> Self {
        let reader = ReaderView::new(selector.selected().slug.clone(), pagination);
        Self {
            selector,
            reader,
            next_request_id: 1,
        }
    }
}

/// 只读依赖：数据源与超时，启动时创建一次
struct ReaderContext {
    source: Arc<dyn BookSource>,
    fetch_timeout: Duration,
}

fn bridge_error(code: &str, message: impl Into<String>) -> BridgeError {
    BridgeError {
        code: code.to_string(),
        message: message.into(),
    }
}

fn lock_poisoned() -> BridgeError {
    bridge_error("lock_poisoned", "Backend state lock poisoned")
}

fn allocate_request_id(state: &mut BackendState) -> u64 {
    let request_id = state.next_request_id;
    state.next_request_id = state.next_request_id.wrapping_add(1).max(1);
    request_id
}

/// 选择书籍目录
///
/// 相对路径优先解析到应用资源目录（打包后的 resources），不存在时回退到当前目录
fn pick_books_dir(config: &ReaderConfig, resource_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(resource_dir) = resource_dir {
        let candidate = config.resolve_books_dir(resource_dir);
        if candidate.is_dir() {
            return candidate;
        }
    }
    config.resolve_books_dir(cwd)
}

fn log_catalog_coverage(store: &DirectoryStore, selector: &BookSelector) {
    match store.available_slugs() {
        Ok(slugs) => {
            info!(
                "Book store at {} holds {} document(s)",
                store.root().display(),
                slugs.len()
            );
            for option in selector.options() {
                if !slugs.iter().any(|s| s.as_str() == option.slug) {
                    warn!("Bundled title {} has no document in the store", option.slug);
                }
            }
        }
        Err(e) => warn!("Cannot list book store {}: {}", store.root().display(), e),
    }
}

fn with_reader<F>(
    state: &Mutex<BackendState>,
    update: F,
) -> Result<(u64, ReaderSnapshot), BridgeError>
where
    F: FnOnce(&mut ReaderView),
{
    let mut guard = state.lock().map_err(|_| lock_poisoned())?;
    let request_id = allocate_request_id(&mut guard);
    update(&mut guard.reader);
    Ok((request_id, guard.reader.snapshot()))
}

fn emit_reader_state(app: &AppHandle, request_id: u64, action: &str, reader: &ReaderSnapshot) {
    let _ = app.emit(
        "reader-state",
        ReaderStateEvent {
            request_id,
            action: action.to_string(),
            reader: reader.clone(),
        },
    );
}

fn apply_reader_update<F>(
    app: &AppHandle,
    state: &State<'_, Mutex<BackendState>>,
    action: &str,
    update: F,
) -> Result<ReaderSnapshot, BridgeError>
where
    F: FnOnce(&mut ReaderView),
{
    let (request_id, snapshot) = with_reader(state.inner(), update)?;
    emit_reader_state(app, request_id, action, &snapshot);
    Ok(snapshot)
}

// getBook 查询：要么返回整本书，要么返回统一的 "Book not found"
#[tauri::command]
async fn get_book(context: State<'_, ReaderContext>, title: String) -> Result<Book, BridgeError> {
    let source = context.source.clone();
    tauri::async_runtime::spawn_blocking(move || source.get_book(&title))
        .await
        .map_err(|err| bridge_error("task_join_error", format!("Failed to join query task: {err}")))?
        .map_err(|err| bridge_error("book_not_found", err.to_string()))
}

#[tauri::command]
fn catalog_list_titles(state: State<'_, Mutex<BackendState>>) -> Result<CatalogState, BridgeError> {
    let guard = state.lock().map_err(|_| lock_poisoned())?;
    Ok(CatalogState {
        options: guard.selector.options().to_vec(),
        selected: guard.selector.selected().slug.clone(),
    })
}

#[tauri::command]
fn reader_get_snapshot(
    app: AppHandle,
    state: State<'_, Mutex<BackendState>>,
) -> Result<ReaderSnapshot, BridgeError> {
    apply_reader_update(&app, &state, "reader_get_snapshot", |_| {})
}

/// 切换书籍并加载
///
/// 取书期间不持有锁；若期间又切换了书籍，本次结果会被丢弃，
/// 返回的始终是提交后的最新快照
#[tauri::command]
async fn reader_select_title(
    app: AppHandle,
    state: State<'_, Mutex<BackendState>>,
    context: State<'_, ReaderContext>,
    title: String,
) -> Result<ReaderSnapshot, BridgeError> {
    let (ticket, request_id, loading) = {
        let mut guard = state.lock().map_err(|_| lock_poisoned())?;
        guard
            .selector
            .choose(&title)
            .map_err(|err| bridge_error("invalid_input", err.to_string()))?;
        let request_id = allocate_request_id(&mut guard);
        let ticket = guard.reader.select_title(title);
        (ticket, request_id, guard.reader.snapshot())
    };
    emit_reader_state(&app, request_id, "reader_select_title", &loading);

    let result = fetch_book(context.source.clone(), &ticket, context.fetch_timeout).await;

    let (accepted, snapshot) = {
        let mut guard = state.lock().map_err(|_| lock_poisoned())?;
        let accepted = guard.reader.complete_fetch(&ticket, result);
        (accepted, guard.reader.snapshot())
    };
    if accepted {
        emit_reader_state(&app, request_id, "reader_fetch_complete", &snapshot);
    }
    Ok(snapshot)
}

#[tauri::command]
fn reader_next_page(
    app: AppHandle,
    state: State<'_, Mutex<BackendState>>,
) -> Result<ReaderSnapshot, BridgeError> {
    apply_reader_update(&app, &state, "reader_next_page", |reader| {
        reader.next_page();
    })
}

#[tauri::command]
fn reader_prev_page(
    app: AppHandle,
    state: State<'_, Mutex<BackendState>>,
) -> Result<ReaderSnapshot, BridgeError> {
    apply_reader_update(&app, &state, "reader_prev_page", |reader| {
        reader.previous_page();
    })
}

// 点击携带发出时页面的代数与左页下标，页面已过期时忽略
#[tauri::command]
fn reader_click_token(
    app: AppHandle,
    state: State<'_, Mutex<BackendState>>,
    generation: u64,
    left_page_index: i64,
    index: usize,
) -> Result<ReaderSnapshot, BridgeError> {
    apply_reader_update(&app, &state, "reader_click_token", |reader| {
        reader.click_token_on(generation, left_page_index, index);
    })
}

// 核心入口配置
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let log_plugin = tauri_plugin_log::Builder::new()
        .level(LevelFilter::Info)
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::Webview),
        ])
        .build();

    let builder = tauri::Builder::default()
        .plugin(log_plugin)
        .setup(|app| {
            // 日志插件在 setup 之前已初始化，配置加载的警告可以正常输出
            let config = ReaderConfig::load_or_default(Path::new(DEFAULT_CONFIG_PATH));
            let cwd = std::env::current_dir()?;
            let resource_dir = app.path().resource_dir().ok();
            let books_dir = pick_books_dir(&config, resource_dir.as_deref(), &cwd);

            let selector = BookSelector::bundled()?;
            let store = DirectoryStore::new(books_dir);
            log_catalog_coverage(&store, &selector);
            info!(
                "Starting book reader (pagination: {}, fetch timeout: {}ms)",
                config.pagination, config.fetch_timeout_ms
            );

            app.manage(Mutex::new(BackendState::new(selector, config.pagination)));
            app.manage(ReaderContext {
                source: Arc::new(QueryService::new(store)),
                fetch_timeout: config.fetch_timeout(),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_book,
            catalog_list_titles,
            reader_get_snapshot,
            reader_select_title,
            reader_next_page,
            reader_prev_page,
            reader_click_token
        ]);

    if let Err(err) = builder.run(tauri::generate_context!()) {
        error!("tauri runtime failed: {err}");
        panic!("tauri runtime failed: {err}");
    }
}
