use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "console.toml";

#[derive(Debug, Default, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub site: SiteInfo,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub menu: MenuConfig,
}

#[derive(Debug, Deserialize)]
pub struct SiteInfo {
    #[serde(default = "default_title")]
    pub title: String,
    /// 对外访问地址，以 https:// 开头时会话 cookie 带 Secure
    #[serde(default)]
    pub url: String,
    /// 静态资源目录（相对项目根目录），挂载到 /assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// text 或 json
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// 位于反向代理之后时开启，登录限流改用 x-forwarded-for / x-real-ip
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expires_in")]
    pub jwt_expires_in: String,
    #[serde(default = "default_session_name")]
    pub session_name: String,
    /// 演示模式：任意用户名可登录，admin 为管理员，其余为编辑
    #[serde(default = "default_true")]
    pub mock_login: bool,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

/// [[auth.users]] 非演示模式下允许登录的账号
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password_hash: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuConfig {
    /// 菜单定义文件（相对项目根目录），未设置时使用内置菜单
    pub file: Option<String>,
}

impl ConsoleConfig {
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("读取 {CONFIG_FILE} 失败：{}", e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ConsoleConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("解析 {CONFIG_FILE} 失败：{}", e))?;
        Ok(config)
    }

    pub fn menu_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.menu.file.as_ref().map(|f| project_root.join(f))
    }
}

// 默认值函数
fn default_title() -> String { "管理系统".into() }
fn default_assets_dir() -> String { "assets".into() }
fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 3000 }
fn default_log_level() -> String { "info".into() }
fn default_log_format() -> String { "text".into() }
fn default_true() -> bool { true }
pub fn default_jwt_secret() -> String { "CHANGE_ME_IN_PRODUCTION".into() }
fn default_jwt_expires_in() -> String { "7d".into() }
fn default_session_name() -> String { "console_session".into() }
fn default_role() -> String { "viewer".into() }

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: default_title(),
            url: String::new(),
            assets_dir: default_assets_dir(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            trust_proxy_headers: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_expires_in: default_jwt_expires_in(),
            session_name: default_session_name(),
            mock_login: true,
            users: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConsoleConfig::parse("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.session_name, "console_session");
        assert!(config.auth.mock_login);
        assert!(!config.server.trust_proxy_headers);
        assert!(config.menu.file.is_none());
    }

    #[test]
    fn reads_users_and_menu_file() {
        let config = ConsoleConfig::parse(
            r#"
            [server]
            port = 8080

            [auth]
            mock_login = false

            [[auth.users]]
            username = "alice"
            password_hash = "$argon2id$stub"
            role = "editor"
            permissions = ["user:list"]

            [menu]
            file = "menu.toml"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(!config.auth.mock_login);
        assert_eq!(config.auth.users[0].username, "alice");
        assert_eq!(config.auth.users[0].permissions, vec!["user:list".to_string()]);
        assert_eq!(
            config.menu_path(Path::new("/srv/console")),
            Some(PathBuf::from("/srv/console/menu.toml"))
        );
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ConsoleConfig::parse("[server\nport = 1").unwrap_err();
        assert!(err.to_string().contains("解析 console.toml 失败"));
    }
}
