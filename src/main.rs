use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

mod admin;
mod check;
mod config;
mod init;
mod menu;
mod state;

#[derive(Parser)]
#[command(name = "admin-shell", about = "管理后台外壳：权限菜单与登录会话", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动后台管理服务
    Serve {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 监听地址
        #[arg(long)]
        host: Option<String>,

        /// 监听端口
        #[arg(long)]
        port: Option<u16>,
    },

    /// 检查配置与菜单定义
    Check {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// 以给定权限渲染菜单并输出 JSON
    Menu {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 持有的权限，可重复
        #[arg(short, long = "permission")]
        permissions: Vec<String>,

        /// 以管理员身份渲染（持有全部权限）
        #[arg(long)]
        admin: bool,

        /// 当前路由
        #[arg(long, default_value = "/")]
        path: String,
    },

    /// 生成 argon2 密码哈希，用于 [[auth.users]]
    HashPassword {
        password: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // None 等同于 Serve { root: ".", host: None, port: None }
    let command = cli.command.unwrap_or(Commands::Serve {
        root: PathBuf::from("."),
        host: None,
        port: None,
    });

    // 对于需要加载配置的命令，使用配置中的日志设置作为默认值
    let server = match &command {
        Commands::Serve { root, .. } | Commands::Check { root } | Commands::Menu { root, .. } => {
            config::ConsoleConfig::load(&root.canonicalize().unwrap_or_else(|_| root.clone()))
                .ok()
                .map(|c| c.server)
        }
        Commands::HashPassword { .. } => None,
    };
    let server = server.unwrap_or_default();
    init_tracing(&server.log_level, &server.log_format);

    match command {
        Commands::Serve { root, host, port } => {
            let root = root.canonicalize()?;
            if init::ensure_initialized(&root)? {
                tracing::info!("已自动初始化项目");
            }
            let console_config = config::ConsoleConfig::load(&root)?;

            let host = host.unwrap_or_else(|| console_config.server.host.clone());
            let port = port.unwrap_or(console_config.server.port);

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(async move { run_server(root, console_config, &host, port).await })?;
        }
        Commands::Check { root } => {
            let root = root.canonicalize()?;
            let result = check::run(&root)?;

            for w in &result.warnings {
                tracing::warn!("{w}");
            }
            for e in &result.errors {
                tracing::error!("{e}");
            }

            if result.errors.is_empty() {
                tracing::info!("检查通过（{} 个警告）", result.warnings.len());
            } else {
                anyhow::bail!(
                    "检查未通过：{} 个错误，{} 个警告",
                    result.errors.len(),
                    result.warnings.len()
                );
            }
        }
        Commands::Menu {
            root,
            permissions,
            admin,
            path,
        } => {
            let root = root.canonicalize()?;
            println!("{}", render_menu_json(&root, &permissions, admin, &path)?);
        }
        Commands::HashPassword { password } => {
            println!("{}", admin::auth::hash_password(&password)?);
        }
    }

    Ok(())
}

fn init_tracing(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// 与 /api/menu 相同的输出结构
fn render_menu_json(
    root: &Path,
    permissions: &[String],
    as_admin: bool,
    path: &str,
) -> anyhow::Result<String> {
    // 未初始化的目录按默认配置处理
    let console_config = if root.join(config::CONFIG_FILE).exists() {
        config::ConsoleConfig::load(root)?
    } else {
        config::ConsoleConfig::default()
    };
    let definition = state::load_menu(root, &console_config)?;

    let sidebar = if as_admin {
        menu::SidebarState::compute(&definition, &admin::auth::mock_user("admin"), path)
    } else {
        let held = |p: &str| permissions.iter().any(|h| h == p);
        menu::SidebarState::compute(&definition, &held, path)
    };

    let response = admin::menu_api::MenuResponse {
        entries: sidebar.entries(),
        highlighted: sidebar.highlighted(),
        open_keys: sidebar.open_keys().clone(),
        path: sidebar.current_path().to_owned(),
    };
    Ok(serde_json::to_string_pretty(&response)?)
}

async fn run_server(
    root: PathBuf,
    console_config: config::ConsoleConfig,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let app_state = state::AppState::new(root, console_config)?;

    // 启动后台定时清理过期 token 与限流记录
    admin::cleanup::spawn_cleanup(app_state.clone());

    let app = admin::router(app_state);

    let addr = format!("{host}:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::error!("端口 {port} 已被占用");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("后台管理服务启动：http://{}", addr);

    // 登录限流按连接对端地址计数
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
