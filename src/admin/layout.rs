use crate::admin::auth::{cookie_from_headers, AuthUser};
use crate::menu::SidebarState;
use crate::state::AppState;
use anyhow::Result;
use axum::extract::{Form, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

pub const SIDEBAR_COOKIE: &str = "sidebar_collapsed";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// 侧边栏是否处于收起状态（保存在 cookie 中）
pub fn sidebar_collapsed(headers: &HeaderMap) -> bool {
    cookie_from_headers(headers, SIDEBAR_COOKIE).as_deref() == Some("1")
}

/// 渲染带头部和侧边栏的完整后台页面
///
/// 侧边栏每次按当前用户权限和请求路径重新计算。
pub fn admin_page(
    state: &AppState,
    user: &AuthUser,
    current_path: &str,
    collapsed: bool,
    title: &str,
    body: &str,
) -> Result<String> {
    let sidebar = SidebarState::compute(&state.menu, user, current_path);
    let ctx = minijinja::context! {
        site_title => &state.config.site.title,
        title => title,
        user => user,
        role_label => user.role.label(),
        current_path => current_path,
        collapsed => collapsed,
        entries => sidebar.entries(),
        body => minijinja::Value::from_safe_string(body.to_owned()),
    };
    crate::admin::template::render_admin(&state.admin_env, "layout.html", ctx)
}

#[derive(Deserialize)]
pub struct SidebarToggleForm {
    #[serde(default)]
    pub back: String,
}

/// 切换侧边栏收起状态并返回原页面
pub async fn toggle_sidebar(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SidebarToggleForm>,
) -> Response {
    let next = if sidebar_collapsed(&headers) { "0" } else { "1" };
    let secure_flag = if state.is_https { "; Secure" } else { "" };
    let cookie = format!("{SIDEBAR_COOKIE}={next}; SameSite=Strict; Path=/; Max-Age=31536000{secure_flag}");

    let mut resp = Redirect::to(safe_back_path(&form.back)).into_response();
    if let Ok(val) = HeaderValue::from_str(&cookie) {
        resp.headers_mut().insert(SET_COOKIE, val);
    }
    resp
}

/// 只允许跳回站内路径
fn safe_back_path(back: &str) -> &str {
    if back.starts_with('/') && !back.starts_with("//") {
        back
    } else {
        "/dashboard"
    }
}
