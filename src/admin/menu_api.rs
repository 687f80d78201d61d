use crate::admin::auth::AuthUser;
use crate::menu::{MenuEntry, OpenKeys, SidebarState};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Deserialize)]
pub struct MenuQuery {
    pub path: Option<String>,
}

#[derive(Serialize)]
pub struct MenuResponse {
    pub path: String,
    pub entries: Vec<MenuEntry>,
    pub open_keys: OpenKeys,
    pub highlighted: BTreeSet<String>,
}

/// 当前用户在指定路径下看到的菜单
pub async fn menu(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<MenuQuery>,
) -> Json<MenuResponse> {
    let path = query.path.unwrap_or_else(|| "/".to_owned());
    let sidebar = SidebarState::compute(&state.menu, &user, &path);
    Json(MenuResponse {
        entries: sidebar.entries(),
        highlighted: sidebar.highlighted(),
        open_keys: sidebar.open_keys().clone(),
        path: sidebar.current_path().to_owned(),
    })
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    /// 调用方当前所在路由，缺省为 /
    pub path: Option<String>,
    /// 调用方持有的展开集合，缺省时取路由推导出的集合
    pub open_keys: Option<OpenKeys>,
    pub key: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub open_keys: OpenKeys,
    pub entries: Vec<MenuEntry>,
}

/// 手动展开/收起分组，状态由调用方持有
pub async fn toggle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ToggleRequest>,
) -> Json<ToggleResponse> {
    let path = req.path.as_deref().unwrap_or("/");
    let mut sidebar = SidebarState::compute(&state.menu, &user, path);
    if let Some(open_keys) = req.open_keys {
        sidebar.restore_open_keys(open_keys);
    }
    sidebar.toggle(&req.key);
    Json(ToggleResponse {
        open_keys: sidebar.open_keys().clone(),
        entries: sidebar.entries(),
    })
}
