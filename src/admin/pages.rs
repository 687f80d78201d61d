use crate::admin::auth::AuthUser;
use crate::admin::layout::{admin_page, html_escape, sidebar_collapsed};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Extension, Router};

pub const DASHBOARD_PATH: &str = "/dashboard";

/// 后台页面路由表
pub struct PageSpec {
    pub path: &'static str,
    pub title: &'static str,
    /// 访问所需权限，None 表示登录即可
    pub permission: Option<&'static str>,
    pub summary: &'static str,
}

pub const PAGES: &[PageSpec] = &[
    PageSpec {
        path: DASHBOARD_PATH,
        title: "仪表盘",
        permission: Some("dashboard:view"),
        summary: "",
    },
    PageSpec {
        path: "/users",
        title: "系统管理",
        permission: Some("user:list"),
        summary: "用户、菜单与角色的统一入口。",
    },
    PageSpec {
        path: "/users/list",
        title: "用户管理",
        permission: Some("user:list"),
        summary: "维护后台账号及其角色。",
    },
    PageSpec {
        path: "/users/menu",
        title: "菜单管理",
        permission: Some("user:list"),
        summary: "维护侧边栏菜单及访问权限。",
    },
    PageSpec {
        path: "/users/role",
        title: "角色管理",
        permission: Some("user:list"),
        summary: "维护角色与权限的对应关系。",
    },
    PageSpec {
        path: "/module/cut",
        title: "剪切板",
        permission: None,
        summary: "复制与粘贴示例。",
    },
    PageSpec {
        path: "/module/watermark",
        title: "水印",
        permission: None,
        summary: "页面水印示例。",
    },
    PageSpec {
        path: "/module/scroll",
        title: "虚拟滚动",
        permission: None,
        summary: "长列表虚拟滚动示例。",
    },
    PageSpec {
        path: "/module/richtext",
        title: "富文本",
        permission: None,
        summary: "富文本编辑器示例。",
    },
    PageSpec {
        path: "/settings/article",
        title: "文章管理",
        permission: None,
        summary: "文章的创建、编辑与发布。",
    },
];

/// 注册全部页面路由，由外层统一挂载认证中间件
pub fn routes() -> Router<AppState> {
    PAGES.iter().fold(Router::new(), |router, page| {
        router.route(
            page.path,
            get(
                move |State(state): State<AppState>,
                      Extension(user): Extension<AuthUser>,
                      headers: HeaderMap| async move {
                    render_page(&state, &user, page, &headers)
                },
            ),
        )
    })
}

fn render_page(state: &AppState, user: &AuthUser, page: &PageSpec, headers: &HeaderMap) -> Response {
    if let Some(permission) = page.permission
        && !user.has_permission(permission)
    {
        tracing::info!("用户 {} 缺少权限 {permission}，拒绝访问 {}", user.username, page.path);
        // 仪表盘本身无权限时不能再跳回仪表盘
        if page.path == DASHBOARD_PATH {
            return (StatusCode::FORBIDDEN, "无权访问仪表盘").into_response();
        }
        return Redirect::to(DASHBOARD_PATH).into_response();
    }

    let body = if page.path == DASHBOARD_PATH {
        dashboard_body(state, user)
    } else {
        placeholder_body(page)
    };

    match admin_page(state, user, page.path, sidebar_collapsed(headers), page.title, &body) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("渲染页面 {} 失败：{e:#}", page.path);
            (StatusCode::INTERNAL_SERVER_ERROR, "页面渲染失败").into_response()
        }
    }
}

fn dashboard_body(state: &AppState, user: &AuthUser) -> String {
    let chips: String = user
        .permissions
        .iter()
        .map(|p| format!(r#"<span class="chip">{}</span>"#, html_escape(p)))
        .collect();
    let reachable = PAGES
        .iter()
        .filter(|p| p.permission.is_none_or(|perm| user.has_permission(perm)))
        .count();

    format!(
        r#"<div class="card">
            <h2>欢迎回来，{username}</h2>
            <p style="margin-top:8px;">角色：{role}　邮箱：{email}</p>
        </div>
        <div class="card">
            <h3>当前权限</h3>
            <p style="margin-top:8px;">{chips}</p>
            <p style="margin-top:8px;color:#666;">可访问页面 {reachable} / {total}，菜单节点 {nodes} 个</p>
        </div>"#,
        username = html_escape(&user.username),
        role = user.role.label(),
        email = html_escape(&user.email),
        chips = chips,
        reachable = reachable,
        total = PAGES.len(),
        nodes = state.menu.node_count(),
    )
}

fn placeholder_body(page: &PageSpec) -> String {
    format!(
        r#"<div class="card"><h2>{title}</h2><p style="margin-top:8px;color:#666;">{summary}</p></div>"#,
        title = html_escape(page.title),
        summary = html_escape(page.summary),
    )
}
