use crate::config::{default_jwt_secret, ConsoleConfig};
use crate::menu::MenuDefinition;
use anyhow::Result;
use minijinja::Environment;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConsoleConfig>,
    pub project_root: PathBuf,
    /// 启动时加载并校验，之后只读
    pub menu: Arc<MenuDefinition>,
    /// 登录速率限制：IP -> 登录尝试时间戳列表
    pub login_limiter: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    /// 已登出的 token：jti -> 过期时间戳
    pub revoked_tokens: Arc<Mutex<HashMap<String, usize>>>,
    /// 后台模板渲染环境
    pub admin_env: Arc<Environment<'static>>,
    /// 实际使用的 JWT 密钥（优先配置文件，否则本次进程随机生成）
    pub jwt_secret: Arc<String>,
    /// 站点是否通过 HTTPS 提供服务（根据 site.url 判断）
    pub is_https: bool,
}

impl AppState {
    pub fn new(project_root: PathBuf, config: ConsoleConfig) -> Result<Self> {
        let menu = load_menu(&project_root, &config)?;
        tracing::info!("菜单定义已加载：{} 个节点", menu.node_count());
        Self::from_parts(project_root, config, menu)
    }

    pub fn from_parts(
        project_root: PathBuf,
        config: ConsoleConfig,
        menu: MenuDefinition,
    ) -> Result<Self> {
        let admin_env = crate::admin::template::build_admin_env()?;
        let jwt_secret = resolve_jwt_secret(&config.auth.jwt_secret);
        let is_https = config.site.url.starts_with("https://");

        Ok(Self {
            config: Arc::new(config),
            project_root,
            menu: Arc::new(menu),
            login_limiter: Arc::new(Mutex::new(HashMap::new())),
            revoked_tokens: Arc::new(Mutex::new(HashMap::new())),
            admin_env: Arc::new(admin_env),
            jwt_secret: Arc::new(jwt_secret),
            is_https,
        })
    }
}

/// [menu] file 指定的文件优先，未配置时使用内置菜单
pub fn load_menu(project_root: &std::path::Path, config: &ConsoleConfig) -> Result<MenuDefinition> {
    match config.menu_path(project_root) {
        Some(path) => MenuDefinition::load(&path),
        None => MenuDefinition::builtin(),
    }
}

fn resolve_jwt_secret(config_secret: &str) -> String {
    if config_secret != default_jwt_secret() && !config_secret.is_empty() {
        return config_secret.to_owned();
    }

    tracing::warn!("JWT secret 未配置或为默认值，使用随机密钥，重启后需重新登录");
    generate_random_secret()
}

fn generate_random_secret() -> String {
    use argon2::password_hash::rand_core::{OsRng, RngCore};

    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
