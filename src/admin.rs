use axum::middleware;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cleanup;
pub mod forgot;
pub mod health;
pub mod layout;
pub mod menu_api;
pub mod pages;
pub mod template;

pub fn router(state: AppState) -> Router {
    // 无需认证的路由
    let public_routes = Router::new()
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route(
            "/forgot-password",
            get(forgot::forgot_page).post(forgot::forgot_submit),
        )
        .route("/health", get(health::health_check));

    // 需要认证的路由
    let protected_routes = pages::routes()
        .route("/", get(|| async { Redirect::to(pages::DASHBOARD_PATH) }))
        // 登出
        .route("/logout", post(auth::logout))
        // 侧边栏收起/展开
        .route("/layout/sidebar", post(layout::toggle_sidebar))
        // 菜单接口
        .route("/api/menu", get(menu_api::menu))
        .route("/api/menu/toggle", post(menu_api::toggle))
        // 应用认证中间件
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    // 静态资源
    let assets_service = tower_http::services::ServeDir::new(
        state.project_root.join(&state.config.site.assets_dir),
    );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/assets", assets_service)
        // 未知路径统一回到仪表盘
        .fallback(|| async { Redirect::to(pages::DASHBOARD_PATH) })
        .with_state(state)
}
