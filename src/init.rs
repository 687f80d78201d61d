use crate::config::CONFIG_FILE;
use crate::menu::node::DEFAULT_MENU;
use anyhow::Result;
use std::fs;
use std::path::Path;

// 嵌入默认 console.toml
const DEFAULT_CONFIG: &str = r#"[site]
title = "管理系统"
url = "http://127.0.0.1:3000"
assets_dir = "assets"

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"
log_format = "text"

[auth]
# 留空时每次启动随机生成
jwt_secret = ""
jwt_expires_in = "7d"
session_name = "console_session"
# 演示模式：任意用户名可登录；关闭后使用 [[auth.users]]
mock_login = true

# [[auth.users]]
# username = "alice"
# password_hash = "用 admin-shell hash-password 生成"
# role = "editor"
# permissions = ["user:list"]

[menu]
file = "menu.toml"
"#;

const DEFAULT_CUSTOM_CSS: &str = "/* 在此覆盖后台样式 */\n";

/// 检测项目是否已初始化，未初始化则写入默认配置与菜单。
/// 返回 `true` 表示执行了初始化，`false` 表示已存在。
pub fn ensure_initialized(root: &Path) -> Result<bool> {
    if root.join(CONFIG_FILE).exists() {
        return Ok(false);
    }

    fs::create_dir_all(root.join("assets"))?;

    let files: &[(&str, &str)] = &[
        (CONFIG_FILE, DEFAULT_CONFIG),
        ("menu.toml", DEFAULT_MENU),
        ("assets/custom.css", DEFAULT_CUSTOM_CSS),
    ];
    for (path, content) in files {
        // 已有的菜单或样式不覆盖
        let target = root.join(path);
        if !target.exists() {
            fs::write(target, content)?;
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;

    #[test]
    fn initializes_once_and_produces_a_clean_project() {
        let root = std::env::temp_dir().join(format!("admin-shell-init-{}", ulid::Ulid::new()));
        fs::create_dir_all(&root).unwrap();

        assert!(ensure_initialized(&root).unwrap());
        assert!(!ensure_initialized(&root).unwrap());

        let config = ConsoleConfig::load(&root).unwrap();
        assert_eq!(config.menu_path(&root), Some(root.join("menu.toml")));
        let menu = crate::state::load_menu(&root, &config).unwrap();
        assert_eq!(menu.node_count(), 13);

        let result = crate::check::run(&root).unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn keeps_existing_menu_file() {
        let root = std::env::temp_dir().join(format!("admin-shell-init-{}", ulid::Ulid::new()));
        fs::create_dir_all(&root).unwrap();
        let custom = "[[menu]]\nkey = \"home\"\nlabel = \"首页\"\npath = \"/dashboard\"\n";
        fs::write(root.join("menu.toml"), custom).unwrap();

        ensure_initialized(&root).unwrap();
        assert_eq!(fs::read_to_string(root.join("menu.toml")).unwrap(), custom);

        fs::remove_dir_all(&root).unwrap();
    }
}
