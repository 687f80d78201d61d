//! 权限菜单：静态定义 -> 按权限过滤 -> 按路由展开 -> 渲染结构

pub mod filter;
pub mod node;
pub mod open;
pub mod render;
pub mod sidebar;

pub use filter::{PermissionCheck, PermissionError};
pub use node::MenuDefinition;
pub use open::OpenKeys;
pub use render::MenuEntry;
pub use sidebar::SidebarState;
