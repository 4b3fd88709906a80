use crate::model::Page;
use crate::reader::{LoadState, ReaderView};
use html_escape::{encode_double_quoted_attribute, encode_text};

pub const LOADING_HTML: &str = "<p>Loading...</p>";

/// 渲染阅读视图为 HTML 片段
///
/// 加载中和出错时只渲染占位文本，不渲染任何页面内容
pub fn render_reader(view: &ReaderView) -> String {
    match view.load_state() {
        LoadState::Pending => LOADING_HTML.to_string(),
        LoadState::Failed(message) => format!("<p>Error: {}</p>", encode_text(message)),
        LoadState::Ready(book) => {
            let mut html = String::new();
            html.push_str("<div class=\"App\">");
            html.push_str(&format!("<h1>{}</h1>", encode_text(&book.title)));

            html.push_str("<div class=\"pages\">");
            render_page_panel(&mut html, "page left-page", view.left_page());
            render_page_panel(&mut html, "page right-page", view.right_page());
            html.push_str("</div>");

            html.push_str("<div class=\"navigation\">");
            render_nav_button(&mut html, "previous", "Previous Page", view.can_go_previous());
            render_nav_button(&mut html, "next", "Next Page", view.can_go_next());
            html.push_str("</div>");

            if let Some(token) = view.selected_token() {
                html.push_str(&format!(
                    "<div class=\"token-view\"><p>{}</p></div>",
                    encode_text(&token.value)
                ));
            }

            html.push_str("<div class=\"token-list\">");
            for (index, token) in view.visible_tokens().iter().enumerate() {
                // 每个词元后跟一个空格
                html.push_str(&format!(
                    "<span data-token-index=\"{}\" title=\"{}\">{} </span>",
                    index,
                    encode_double_quoted_attribute(&position_label(&token.position)),
                    encode_text(&token.value)
                ));
            }
            html.push_str("</div>");

            html.push_str("</div>");
            html
        }
    }
}

fn render_page_panel(html: &mut String, class: &str, page: Option<&Page>) {
    html.push_str(&format!("<div class=\"{}\">", class));
    if let Some(page) = page {
        html.push_str(&format!("<p>{}</p>", encode_text(&page.content)));
    }
    html.push_str("</div>");
}

fn render_nav_button(html: &mut String, action: &str, label: &str, enabled: bool) {
    let disabled = if enabled { "" } else { " disabled" };
    html.push_str(&format!(
        "<button type=\"button\" data-action=\"{}\"{}>{}</button>",
        action, disabled, label
    ));
}

fn position_label(position: &[i64]) -> String {
    position
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
