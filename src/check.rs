use crate::admin::auth::Role;
use crate::config::{default_jwt_secret, ConsoleConfig, CONFIG_FILE};
use crate::menu::node::{validate, MenuFile};
use anyhow::Result;
use std::path::Path;

pub struct CheckResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// 执行项目完整性检查，依次验证配置、菜单定义和账号
pub fn run(project_root: &Path) -> Result<CheckResult> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let config_path = project_root.join(CONFIG_FILE);
    if !config_path.exists() {
        errors.push(format!("缺少 {CONFIG_FILE} 配置文件"));
        return Ok(CheckResult { errors, warnings });
    }
    let config = match ConsoleConfig::load(project_root) {
        Ok(cfg) => cfg,
        Err(e) => {
            errors.push(format!("{e}"));
            return Ok(CheckResult { errors, warnings });
        }
    };

    check_menu(project_root, &config, &mut errors, &mut warnings);
    check_auth(&config, &mut errors, &mut warnings);
    check_assets(project_root, &config, &mut warnings);

    Ok(CheckResult { errors, warnings })
}

fn check_menu(root: &Path, config: &ConsoleConfig, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let Some(path) = config.menu_path(root) else {
        warnings.push("未配置 [menu] file，使用内置菜单".to_string());
        return;
    };
    let display = path.strip_prefix(root).unwrap_or(&path).display().to_string();

    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            errors.push(format!("读取菜单文件 {display} 失败: {e}"));
            return;
        }
    };
    let file: MenuFile = match toml::from_str(&content) {
        Ok(f) => f,
        Err(e) => {
            errors.push(format!("菜单文件 {display} 解析失败: {e}"));
            return;
        }
    };

    if file.menu.is_empty() {
        warnings.push(format!("菜单文件 {display} 没有任何菜单项"));
    }
    // 一次列出全部问题，而不是遇到第一个就停
    for issue in validate(&file.menu) {
        errors.push(format!("{display}: {issue}"));
    }
}

fn check_auth(config: &ConsoleConfig, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
    let auth = &config.auth;
    if auth.jwt_secret.is_empty() || auth.jwt_secret == default_jwt_secret() {
        warnings.push("auth.jwt_secret 未配置，每次重启都会使所有会话失效".to_string());
    }
    if let Err(e) = crate::admin::auth::parse_duration(&auth.jwt_expires_in) {
        errors.push(format!("auth.jwt_expires_in 无效: {e}"));
    }

    if auth.mock_login {
        warnings.push("auth.mock_login 已开启，任意用户名均可登录".to_string());
    } else if auth.users.is_empty() {
        errors.push("auth.mock_login 已关闭但没有配置 [[auth.users]]，无人可以登录".to_string());
    }

    for user in &auth.users {
        if Role::parse(&user.role).is_none() {
            errors.push(format!("用户 {} 的角色无效: {}", user.username, user.role));
        }
        if !user.password_hash.starts_with("$argon2") {
            errors.push(format!(
                "用户 {} 的 password_hash 不是 argon2 哈希，可用 hash-password 命令生成",
                user.username
            ));
        }
    }
}

fn check_assets(root: &Path, config: &ConsoleConfig, warnings: &mut Vec<String>) {
    let assets = &config.site.assets_dir;
    if !root.join(assets).exists() {
        warnings.push(format!("静态资源目录 {assets}/ 不存在"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn project(config: &str, menu: Option<&str>) -> PathBuf {
        let root = std::env::temp_dir().join(format!("admin-shell-check-{}", ulid::Ulid::new()));
        fs::create_dir_all(root.join("assets")).unwrap();
        fs::write(root.join(CONFIG_FILE), config).unwrap();
        if let Some(menu) = menu {
            fs::write(root.join("menu.toml"), menu).unwrap();
        }
        root
    }

    #[test]
    fn missing_config_is_an_error() {
        let root = std::env::temp_dir().join(format!("admin-shell-check-{}", ulid::Ulid::new()));
        fs::create_dir_all(&root).unwrap();
        let result = run(&root).unwrap();
        assert_eq!(result.errors, ["缺少 console.toml 配置文件"]);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn default_project_passes_with_warnings() {
        let root = project(
            "[menu]\nfile = \"menu.toml\"\n",
            Some(crate::menu::node::DEFAULT_MENU),
        );
        let result = run(&root).unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(result.warnings.iter().any(|w| w.contains("jwt_secret")));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn lists_every_menu_issue() {
        let root = project(
            "[menu]\nfile = \"menu.toml\"\n",
            Some(
                r#"
                [[menu]]
                key = "a"
                label = "A"
                path = "relative"

                [[menu]]
                key = "a"
                label = "B"
                url = "https://example.com"
                path = "/b"
                "#,
            ),
        );
        let result = run(&root).unwrap();
        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
        assert!(result.errors.iter().all(|e| e.starts_with("menu.toml: ")));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn rejects_bad_accounts() {
        let root = project(
            r#"
            [auth]
            jwt_secret = "s3cret"
            mock_login = false

            [[auth.users]]
            username = "alice"
            password_hash = "plain"
            role = "root"
            "#,
            None,
        );
        let result = run(&root).unwrap();
        assert_eq!(result.errors.len(), 2, "{:?}", result.errors);
        assert!(result.errors[0].contains("角色无效"));
        assert!(result.errors[1].contains("password_hash"));
        fs::remove_dir_all(&root).unwrap();
    }
}
