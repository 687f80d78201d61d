use anyhow::{Context, Result};
use minijinja::{Environment, Value};

/// 后台模板，编译进二进制
const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("templates/layout.html")),
    ("sidebar.html", include_str!("templates/sidebar.html")),
    ("login.html", include_str!("templates/login.html")),
    ("forgot_password.html", include_str!("templates/forgot_password.html")),
];

/// 构建后台专用 MiniJinja 渲染环境
pub fn build_admin_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    for (name, source) in TEMPLATES {
        env.add_template(*name, *source)
            .with_context(|| format!("注册后台模板 {} 失败", name))?;
    }

    Ok(env)
}

/// 渲染后台模板
pub fn render_admin(env: &Environment, name: &str, ctx: Value) -> Result<String> {
    let tmpl = env
        .get_template(name)
        .with_context(|| format!("后台模板 {} 不存在", name))?;
    let html = tmpl
        .render(ctx)
        .with_context(|| format!("渲染后台模板 {} 失败", name))?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::MenuEntry;

    #[test]
    fn all_templates_compile() {
        let env = build_admin_env().unwrap();
        for (name, _) in TEMPLATES {
            assert!(env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn sidebar_renders_nested_groups_and_external_links() {
        let env = build_admin_env().unwrap();
        let entries = vec![
            MenuEntry::Group {
                key: "users".into(),
                label: "系统管理".into(),
                icon: Some("👥".into()),
                open: true,
                children: vec![MenuEntry::Link {
                    key: "user-list".into(),
                    label: "用户管理".into(),
                    icon: None,
                    path: "/users/list".into(),
                    active: true,
                }],
            },
            MenuEntry::External {
                key: "docs".into(),
                label: "<文档>".into(),
                icon: None,
                url: "https://example.com".into(),
            },
        ];
        let html = render_admin(
            &env,
            "sidebar.html",
            minijinja::context! { entries => entries, collapsed => false },
        )
        .unwrap();

        assert!(html.contains(r#"<details class="submenu" data-key="users" open>"#));
        assert!(html.contains(r#"class="active-link" data-key="user-list""#));
        assert!(html.contains(r#"aria-current="page""#));
        assert!(html.contains(r#"target="_blank" rel="noopener noreferrer""#));
        assert!(html.contains("&lt;文档&gt;"));
    }

    #[test]
    fn collapsed_sidebar_hides_labels() {
        let env = build_admin_env().unwrap();
        let entries = vec![MenuEntry::Link {
            key: "dashboard".into(),
            label: "仪表盘".into(),
            icon: Some("📊".into()),
            path: "/dashboard".into(),
            active: false,
        }];
        let html = render_admin(
            &env,
            "sidebar.html",
            minijinja::context! { entries => entries, collapsed => true },
        )
        .unwrap();
        assert!(html.contains("📊"));
        assert!(!html.contains("menu-label"));
    }
}
