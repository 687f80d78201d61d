use crate::config::AuthConfig;
use crate::menu::{PermissionCheck, PermissionError};
use crate::state::AppState;
use anyhow::{Context, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{ConnectInfo, Form, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Redirect, Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// 登录限流窗口
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);
/// 窗口内单个来源允许的登录次数
const LOGIN_MAX_ATTEMPTS: usize = 5;

/// 演示账号 admin 的权限
const ADMIN_PERMISSIONS: &[&str] = &[
    "user:list",
    "user:create",
    "user:edit",
    "user:delete",
    "dashboard:view",
];

/// 演示账号中非 admin 用户的权限
const EDITOR_PERMISSIONS: &[&str] = &["user:list", "user:edit", "dashboard:view"];

// ── 数据结构 ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "管理员",
            Self::Editor => "编辑",
            Self::Viewer => "访客",
        }
    }
}

/// 已登录用户，由 require_auth 注入请求扩展
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub permissions: Vec<String>,
}

impl AuthUser {
    /// 管理员拥有全部权限，其余角色按权限列表判断
    pub fn has_permission(&self, permission: &str) -> bool {
        self.role == Role::Admin || self.permissions.iter().any(|p| p == permission)
    }
}

impl PermissionCheck for AuthUser {
    fn check(&self, permission: &str) -> Result<bool, PermissionError> {
        Ok(self.has_permission(permission))
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    email: String,
    role: Role,
    permissions: Vec<String>,
    exp: usize,
    jti: String,
}

impl Claims {
    fn user(&self) -> AuthUser {
        AuthUser {
            id: self.sub.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
        }
    }
}

// ── 密码工具 ──

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("密码哈希失败: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("解析密码哈希失败: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ── 账号解析 ──

/// 演示模式下的账号：admin 为管理员，其他用户名为编辑
pub fn mock_user(username: &str) -> AuthUser {
    let (role, permissions) = if username == "admin" {
        (Role::Admin, ADMIN_PERMISSIONS)
    } else {
        (Role::Editor, EDITOR_PERMISSIONS)
    };
    AuthUser {
        id: ulid::Ulid::new().to_string(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        role,
        permissions: permissions.iter().map(|p| (*p).to_owned()).collect(),
    }
}

/// 校验登录表单，返回登录后的用户
pub fn authenticate(config: &AuthConfig, form: &LoginForm) -> Result<AuthUser> {
    let username = form.username.trim();
    if username.is_empty() {
        anyhow::bail!("用户名不能为空");
    }

    if config.mock_login {
        return Ok(mock_user(username));
    }

    let entry = config
        .users
        .iter()
        .find(|u| u.username == username)
        .context("用户不存在")?;

    if !verify_password(&form.password, &entry.password_hash)? {
        anyhow::bail!("密码错误");
    }

    let role = Role::parse(&entry.role)
        .with_context(|| format!("用户 {username} 的角色无效：{}", entry.role))?;

    Ok(AuthUser {
        id: entry.username.clone(),
        username: entry.username.clone(),
        email: entry.email.clone(),
        role,
        permissions: entry.permissions.clone(),
    })
}

// ── JWT 工具 ──

pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("时间长度不能为空");
    }
    let split = s.char_indices().last().map_or(0, |(i, _)| i);
    let (num_str, unit) = s.split_at(split);
    let num: u64 = num_str.parse().context("无效的时间数值")?;
    let unit_secs: u64 = match unit {
        "d" => 86400,
        "h" => 3600,
        "m" => 60,
        "s" => 1,
        _ => anyhow::bail!("不支持的时间单位: {unit}"),
    };
    // exp 以 usize 时间戳保存，需要留出加上当前时间的余量
    let secs = num
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= i64::MAX as u64 / 2)
        .context("时间长度过大")?;
    Ok(Duration::from_secs(secs))
}

/// 返回 (token, jti)
fn create_jwt(user: &AuthUser, jwt_secret: &str, expires_in: &str) -> Result<(String, String)> {
    let duration = parse_duration(expires_in)?;
    let exp = chrono::Utc::now().timestamp() as usize + duration.as_secs() as usize;
    let jti = ulid::Ulid::new().to_string();

    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
        permissions: user.permissions.clone(),
        exp,
        jti: jti.clone(),
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .context("JWT 编码失败")?;

    Ok((token, jti))
}

fn decode_jwt(token: &str, jwt_secret: &str) -> Result<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .context("JWT 解码失败")?;
    Ok(data.claims)
}

fn build_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{name}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}{secure_flag}")
}

/// 为指定用户签发会话 cookie
pub fn session_cookie(state: &AppState, user: &AuthUser) -> Result<String> {
    let auth = &state.config.auth;
    let duration = parse_duration(&auth.jwt_expires_in)?;
    let (token, _jti) = create_jwt(user, &state.jwt_secret, &auth.jwt_expires_in)?;
    Ok(build_cookie(
        &auth.session_name,
        &token,
        duration.as_secs() as i64,
        state.is_https,
    ))
}

// ── 路由处理 ──

pub async fn login_page(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Html<String> {
    let ctx = minijinja::context! {
        site_title => &state.config.site.title,
        show_error => params.contains_key("error"),
        mock_login => state.config.auth.mock_login,
    };
    let html = crate::admin::template::render_admin(&state.admin_env, "login.html", ctx)
        .unwrap_or_else(|e| format!("模板渲染失败: {e}"));
    Html(html)
}

pub async fn login_submit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let client_ip = client_ip(&headers, peer, state.config.server.trust_proxy_headers);

    {
        let mut limiter = state.login_limiter.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let attempts = limiter.entry(client_ip.clone()).or_default();
        attempts.retain(|t| now.duration_since(*t) < LOGIN_WINDOW);

        if attempts.len() >= LOGIN_MAX_ATTEMPTS {
            tracing::warn!("登录过于频繁：{client_ip}");
            return (StatusCode::TOO_MANY_REQUESTS, "登录请求过于频繁，请稍后再试").into_response();
        }

        attempts.push(now);
    }

    let cookie = authenticate(&state.config.auth, &form).and_then(|user| {
        tracing::info!("用户 {} 登录成功（{}）", user.username, user.role.label());
        session_cookie(&state, &user)
    });

    match cookie {
        Ok(cookie) => with_cookie(Redirect::to("/dashboard").into_response(), &cookie),
        Err(e) => {
            tracing::info!("登录失败：{e:#}");
            Redirect::to("/login?error=1").into_response()
        }
    }
}

pub async fn logout(State(state): State<AppState>, req: Request<axum::body::Body>) -> Response {
    let cookie_name = &state.config.auth.session_name;

    if let Some(token) = extract_token_from_request(&req, cookie_name)
        && let Ok(claims) = decode_jwt(&token, &state.jwt_secret)
    {
        state
            .revoked_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(claims.jti, claims.exp);
        tracing::info!("用户 {} 已登出", claims.username);
    }

    let clear_cookie = build_cookie(cookie_name, "", 0, state.is_https);
    with_cookie(Redirect::to("/login").into_response(), &clear_cookie)
}

// ── 认证中间件 ──

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let config = &state.config.auth;

    let Some(token) = extract_token_from_request(&req, &config.session_name) else {
        return redirect_to_login();
    };

    let Ok(claims) = decode_jwt(&token, &state.jwt_secret) else {
        return redirect_to_login();
    };

    let revoked = state
        .revoked_tokens
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .contains_key(&claims.jti);
    if revoked {
        return redirect_to_login();
    }

    let user = claims.user();
    req.extensions_mut().insert(user.clone());

    let mut resp = next.run(req).await;

    // 剩余时间不足总有效期的 1/3 时签发新 token
    if let Ok(total_duration) = parse_duration(&config.jwt_expires_in) {
        let now = chrono::Utc::now().timestamp() as usize;
        let remaining = claims.exp.saturating_sub(now);
        let threshold = total_duration.as_secs() as usize / 3;

        if remaining < threshold
            && let Ok(cookie) = session_cookie(&state, &user)
            && let Ok(val) = HeaderValue::from_str(&cookie)
        {
            resp.headers_mut().insert(SET_COOKIE, val);
        }
    }

    resp
}

// ── 辅助函数 ──

/// 限流使用的来源地址
///
/// 默认取连接对端地址。只有配置了 `trust_proxy_headers` 时才读取
/// x-forwarded-for / x-real-ip，这两个头可以被客户端任意伪造。
fn client_ip(headers: &HeaderMap, peer: SocketAddr, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers && let Some(ip) = forwarded_ip(headers) {
        return ip;
    }
    peer.ip().to_string()
}

/// 优先 x-forwarded-for，回退到 x-real-ip
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

pub fn cookie_value<B>(req: &Request<B>, name: &str) -> Option<String> {
    cookie_from_headers(req.headers(), name)
}

pub fn cookie_from_headers(headers: &HeaderMap, name: &str) -> Option<String> {
    let header_str = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    header_str.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_owned())
    })
}

fn extract_token_from_request<B>(req: &Request<B>, cookie_name: &str) -> Option<String> {
    cookie_value(req, cookie_name)
}

fn with_cookie(mut resp: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(val) => {
            resp.headers_mut().append(SET_COOKIE, val);
        }
        Err(e) => tracing::error!("cookie 无法写入响应头：{e}"),
    }
    resp
}

fn redirect_to_login() -> Response {
    Redirect::to("/login").into_response()
}
