use crate::admin::auth::LOGIN_WINDOW;
use crate::state::AppState;
use std::collections::HashMap;
use std::time::Instant;

/// 启动后台定时任务：每小时清理已过期的登出记录和登录限流记录
pub fn spawn_cleanup(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp() as usize;
            let removed = {
                let mut revoked = state.revoked_tokens.lock().unwrap_or_else(|e| e.into_inner());
                prune_expired(&mut revoked, now)
            };
            if removed > 0 {
                tracing::info!("已清理 {} 条过期 token 记录", removed);
            }

            let removed = {
                let mut limiter = state.login_limiter.lock().unwrap_or_else(|e| e.into_inner());
                prune_login_attempts(&mut limiter, Instant::now())
            };
            if removed > 0 {
                tracing::debug!("已清理 {} 个登录限流来源", removed);
            }
        }
    });
}

/// 删除过期时间早于 now 的记录，返回删除条数
fn prune_expired(revoked: &mut HashMap<String, usize>, now: usize) -> usize {
    let before = revoked.len();
    revoked.retain(|_, exp| *exp >= now);
    before - revoked.len()
}

/// 丢弃窗口外的尝试记录，没有剩余记录的来源整条删除，返回删除的来源数
fn prune_login_attempts(limiter: &mut HashMap<String, Vec<Instant>>, now: Instant) -> usize {
    let before = limiter.len();
    limiter.retain(|_, attempts| {
        attempts.retain(|t| now.duration_since(*t) < LOGIN_WINDOW);
        !attempts.is_empty()
    });
    before - limiter.len()
}
