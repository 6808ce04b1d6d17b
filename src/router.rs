//! Orchestrates parsing → selection (forced / prefixed / scored) → policy →
//! forward, and serves the small set of built-in commands (§4.4).
#![allow(dead_code)]

use std::sync::Arc;

use rand::Rng;
use serde_json::Value;

use crate::catalog::{Catalog, CatalogHandle};
use crate::config::ConfigManager;
use crate::model::{Category, CommandSet, FinalAction};
use crate::onebot::{patch_forward_envelope, synthesize_forward_envelope};
use crate::outbound::OutboundPool;
use crate::parser::Parser;
use crate::policy::PermissionChecker;
use crate::store::{User, UserStore};
use crate::utils::prelude::*;

const SYSTEM_COMMANDS: &[&str] = &["/help", "/status", "/list", "/style", "/admin"];

/// The outcome of routing one inbound message. Never an error type: every
/// path through `route` produces one of these (§7).
#[derive(Debug, Clone, Default)]
pub struct RouteResult {
    pub success: bool,
    pub target_ws: Option<String>,
    pub command_set: Option<String>,
    pub command: Option<String>,
    pub response: Option<String>,
    pub error_message: Option<String>,
    /// Failure detail for the audit log only — never surfaced to the chat
    /// user (§7's "logged, not surfaced" rule for `target_unreachable`).
    pub audit_detail: Option<String>,
    pub is_system_command: bool,
}

impl RouteResult {
    fn silent_ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    fn system(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            is_system_command: true,
            ..Default::default()
        }
    }

    fn system_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            is_system_command: true,
            ..Default::default()
        }
    }
}

pub struct Router {
    catalog: Arc<CatalogHandle>,
    outbound: Arc<OutboundPool>,
    users: Arc<dyn UserStore>,
    config: Arc<ConfigManager>,
}

impl Router {
    pub fn new(
        catalog: Arc<CatalogHandle>,
        outbound: Arc<OutboundPool>,
        users: Arc<dyn UserStore>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self { catalog, outbound, users, config }
    }

    /// Route one inbound message. `raw_event` is the fully decoded inbound
    /// JSON event, used verbatim as the forwarding envelope template when
    /// forwarding occurs; `None` triggers envelope synthesis.
    pub async fn route(
        &self,
        raw: &str,
        user_id: i64,
        group_id: Option<i64>,
        nickname: &str,
        raw_event: Option<&Value>,
    ) -> RouteResult {
        let catalog = self.catalog.load();

        let user = match self.users.get_or_create(user_id, nickname).await {
            Ok(user) => user,
            Err(e) => {
                error!("user upsert failed: {e}");
                return RouteResult::failure("内部错误");
            }
        };

        if let Some(result) = self.try_forced_route(raw, &user, group_id, raw_event).await {
            return result;
        }

        let prefixes = catalog.known_prefixes();
        let parsed = Parser::parse(raw, &prefixes);

        if !parsed.is_command {
            return self.apply_final_rule(raw, &user, group_id, raw_event).await;
        }

        if SYSTEM_COMMANDS.contains(&parsed.command.to_lowercase().as_str()) {
            return self
                .dispatch_system_command(&parsed.command, &parsed.args, &user, &catalog)
                .await;
        }

        let selected = self.select_set(&parsed.prefix, &parsed.command, &user, &catalog);
        let Some(set) = selected else {
            return self.apply_final_rule(raw, &user, group_id, raw_event).await;
        };

        let Some(cmd) = set.find_command(&parsed.command) else {
            return self.apply_final_rule(raw, &user, group_id, raw_event).await;
        };

        let decision = PermissionChecker::check_command(&user, &catalog.admins, cmd, group_id);
        if !decision.is_allowed() {
            return RouteResult::failure(decision.message().unwrap_or_default());
        }

        let outbound_text = Self::transform(raw, set.strip_prefix);
        self.forward(set, &outbound_text, user_id, group_id, raw_event).await
    }

    /// `"<set-name> /cmd args"` bypasses scoring and pins the command to the
    /// named set. On a miss within that set, this is a final answer.
    async fn try_forced_route(
        &self,
        raw: &str,
        user: &User,
        group_id: Option<i64>,
        raw_event: Option<&Value>,
    ) -> Option<RouteResult> {
        let (first, rest) = raw.trim().split_once(char::is_whitespace)?;
        let rest = rest.trim_start();
        if !rest.starts_with('/') {
            return None;
        }

        let catalog = self.catalog.load();
        let set = catalog.set_by_name_lower(&first.to_lowercase())?.clone();

        let (command, args) = match rest.split_once(char::is_whitespace) {
            Some((c, a)) => (c.to_string(), a.trim().to_string()),
            None => (rest.to_string(), String::new()),
        };
        let _ = args;

        let Some(cmd) = set.find_command(&command) else {
            return Some(RouteResult::system_failure(format!(
                "指令集 {} 中没有指令 {command}",
                set.name
            )));
        };

        let decision = PermissionChecker::check_command(user, &catalog.admins, cmd, group_id);
        if !decision.is_allowed() {
            return Some(RouteResult::failure(decision.message().unwrap_or_default()));
        }

        let outbound_text = Self::transform(rest, set.strip_prefix);
        Some(self.forward(&set, &outbound_text, user.qq_id, group_id, raw_event).await)
    }

    fn select_set(
        &self,
        prefix: &Option<String>,
        command: &str,
        user: &User,
        catalog: &crate::catalog::Catalog,
    ) -> Option<CommandSet> {
        if let Some(prefix) = prefix {
            if let Some(set) = catalog.set_by_prefix(prefix) {
                if set.find_command(command).is_some() {
                    return Some(set.clone());
                }
            }
        }

        let mut best: Option<(i64, CommandSet)> = None;
        for set in catalog.enabled_sets() {
            if set.find_command(command).is_none() {
                continue;
            }

            let mut score = set.priority * 10;
            if let Some(category_id) = &set.category {
                if user.selected_styles.get(category_id) == Some(&set.id) {
                    score += 1000;
                }
                if let Some(category) = catalog.category(category_id) {
                    if category.default_command_set.as_deref() == Some(set.id.as_str()) {
                        score += 100;
                    }
                }
            }
            if set.is_public {
                score += 50;
            }

            match &best {
                Some((best_score, best_set))
                    if *best_score > score
                        || (*best_score == score
                            && (best_set.priority > set.priority
                                || (best_set.priority == set.priority && best_set.id < set.id))) =>
                {
                    // existing candidate still wins.
                }
                _ => best = Some((score, set.clone())),
            }
        }

        best.map(|(_, set)| set)
    }

    fn transform(raw: &str, strip_prefix: bool) -> String {
        if !strip_prefix {
            return raw.to_string();
        }
        // ASCII-only word-char test: a non-ASCII prefix (e.g. "萌") must still
        // count as strippable punctuation, not as a "letter" that stops the trim.
        let trimmed = raw.trim_start_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '/');
        trimmed.to_string()
    }

    async fn forward(
        &self,
        set: &CommandSet,
        outbound_text: &str,
        user_id: i64,
        group_id: Option<i64>,
        raw_event: Option<&Value>,
    ) -> RouteResult {
        let catalog = self.catalog.load();
        let frame = self.build_envelope(catalog.self_id, outbound_text, user_id, group_id, raw_event);

        if let Err(e) = self.outbound.send(&set.target_ws, &frame).await {
            warn!("forward to {} failed: {e}", set.target_ws);
            return RouteResult {
                success: false,
                target_ws: Some(set.target_ws.clone()),
                command_set: Some(set.id.clone()),
                error_message: None,
                audit_detail: Some(format!("target_unreachable: forward to {} failed: {e}", set.target_ws)),
                ..Default::default()
            };
        }

        RouteResult {
            success: true,
            target_ws: Some(set.target_ws.clone()),
            command_set: Some(set.id.clone()),
            ..Default::default()
        }
    }

    fn build_envelope(
        &self,
        self_id: i64,
        outbound_text: &str,
        user_id: i64,
        group_id: Option<i64>,
        raw_event: Option<&Value>,
    ) -> Value {
        match raw_event {
            Some(event) => patch_forward_envelope(event, self_id, outbound_text),
            None => {
                let message_id = rand::thread_rng().gen_range(1..=i64::MAX);
                synthesize_forward_envelope(self_id, user_id, group_id, outbound_text, message_id, unix_now())
            }
        }
    }

    /// The config-driven catch-all for unmatched text (§4.4.1).
    async fn apply_final_rule(
        &self,
        raw: &str,
        user: &User,
        group_id: Option<i64>,
        raw_event: Option<&Value>,
    ) -> RouteResult {
        let catalog = self.catalog.load();
        match catalog.final_rule.action {
            FinalAction::Allow => RouteResult::silent_ok(),
            FinalAction::Reject => {
                if catalog.final_rule.send_message {
                    RouteResult::failure(catalog.final_rule.message.clone().unwrap_or_default())
                } else {
                    RouteResult {
                        success: false,
                        ..Default::default()
                    }
                }
            }
            FinalAction::Forward => {
                let Some(target) = &catalog.final_rule.target_ws else {
                    return RouteResult {
                        success: false,
                        ..Default::default()
                    };
                };
                let frame = self.build_envelope(catalog.self_id, raw, user.qq_id, group_id, raw_event);
                match self.outbound.send(target, &frame).await {
                    Ok(()) => RouteResult {
                        success: true,
                        target_ws: Some(target.clone()),
                        ..Default::default()
                    },
                    Err(e) => {
                        warn!("final-rule forward to {target} failed: {e}");
                        RouteResult {
                            success: false,
                            target_ws: Some(target.clone()),
                            audit_detail: Some(format!("target_unreachable: final-rule forward to {target} failed: {e}")),
                            ..Default::default()
                        }
                    }
                }
            }
        }
    }

    async fn dispatch_system_command(
        &self,
        command: &str,
        args: &str,
        user: &User,
        catalog: &crate::catalog::Catalog,
    ) -> RouteResult {
        match command.to_lowercase().as_str() {
            "/help" => RouteResult::system(Self::render_help()),
            "/status" => RouteResult::system(self.render_status(catalog).await),
            "/list" => RouteResult::system(Self::render_list(catalog, args)),
            "/style" => self.handle_style(catalog, user, args).await,
            "/admin" => self.handle_admin(catalog, user, args).await,
            _ => RouteResult::system_failure("未知系统指令"),
        }
    }

    fn render_help() -> String {
        "可用指令：/help /status /list [分类] /style [list|current|select <分类> <风格>] /admin [allow|deny|set|privilege|reload]".to_string()
    }

    async fn render_status(&self, catalog: &crate::catalog::Catalog) -> String {
        let statuses = self.outbound.status().await;
        let mut lines = vec![format!(
            "指令集: {} 分类: {}",
            catalog.set_count(),
            catalog.category_count()
        )];
        for status in statuses {
            lines.push(format!("{} ({}): {:?}", status.name, status.id, status.state));
        }
        lines.join("\n")
    }

    fn render_list(catalog: &crate::catalog::Catalog, args: &str) -> String {
        let arg = args.trim();
        if arg.is_empty() {
            let mut lines = vec!["分类列表：".to_string()];
            for category in catalog.categories_sorted() {
                lines.push(format!("- {} ({})", category.display_name, category.id));
            }
            return lines.join("\n");
        }

        let Some(category) = catalog.resolve_category(arg) else {
            return format!("未找到分类: {arg}");
        };

        let mut lines = vec![format!("{} 下的指令集：", category.display_name)];
        for set in catalog.sets_in_category(&category.id) {
            let marker = if category.default_command_set.as_deref() == Some(set.id.as_str()) {
                " (默认)"
            } else {
                ""
            };
            lines.push(format!("- {}{}", set.name, marker));
        }
        lines.join("\n")
    }

    async fn handle_style(&self, catalog: &crate::catalog::Catalog, user: &User, args: &str) -> RouteResult {
        let mut parts = args.split_whitespace();
        match parts.next().unwrap_or("").to_lowercase().as_str() {
            "" | "list" => RouteResult::system(Self::render_style_list(catalog)),
            "current" => RouteResult::system(Self::render_style_current(catalog, user)),
            "select" => {
                let (Some(cat_token), Some(style_token)) = (parts.next(), parts.next()) else {
                    return RouteResult::system_failure("用法: /style select <分类> <风格>");
                };
                self.handle_style_select(catalog, user, cat_token, style_token).await
            }
            other => RouteResult::system_failure(format!("未知 /style 子命令: {other}")),
        }
    }

    fn render_style_list(catalog: &crate::catalog::Catalog) -> String {
        let mut lines = Vec::new();
        for category in catalog.categories_sorted() {
            let lock = if category.allow_user_switch { "" } else { " 🔒" };
            lines.push(format!("{}{}:", category.display_name, lock));
            for set in catalog.sets_in_category(&category.id) {
                lines.push(format!("  - {}", set.name));
            }
        }
        lines.join("\n")
    }

    fn render_style_current(catalog: &crate::catalog::Catalog, user: &User) -> String {
        if user.selected_styles.is_empty() {
            return "你还没有选择任何风格".to_string();
        }
        let mut lines = Vec::new();
        for (category_id, set_id) in &user.selected_styles {
            let category_name = catalog
                .category(category_id)
                .map(|c| c.display_name.clone())
                .unwrap_or_else(|| category_id.clone());
            let set_name = catalog
                .set_by_id(set_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| set_id.clone());
            lines.push(format!("{category_name}: {set_name}"));
        }
        lines.join("\n")
    }

    async fn handle_style_select(
        &self,
        catalog: &crate::catalog::Catalog,
        user: &User,
        cat_token: &str,
        style_token: &str,
    ) -> RouteResult {
        let Some(category) = catalog.resolve_category(cat_token).cloned() else {
            return RouteResult::system_failure(format!("未找到分类: {cat_token}"));
        };

        let decision = PermissionChecker::check_style_switch(user, &catalog.admins, category.allow_user_switch);
        if !decision.is_allowed() {
            return RouteResult::system_failure(decision.message().unwrap_or_default());
        }

        let Some(set) = catalog.resolve_set(style_token).filter(|s| s.category.as_deref() == Some(category.id.as_str())) else {
            return RouteResult::system_failure(format!("分类 {} 下未找到风格: {style_token}", category.display_name));
        };
        let set_id = set.id.clone();
        let category_id = category.id.clone();

        let result = self
            .users
            .update(
                user.qq_id,
                Box::new(move |u| {
                    u.selected_styles.insert(category_id.clone(), set_id.clone());
                }),
            )
            .await;

        match result {
            Ok(_) => RouteResult::system(format!("已切换 {} 为 {}", category.display_name, style_token)),
            Err(e) => RouteResult::system_failure(format!("切换失败: {e}")),
        }
    }

    async fn handle_admin(&self, catalog: &crate::catalog::Catalog, user: &User, args: &str) -> RouteResult {
        if !catalog.admins.contains(&user.qq_id) {
            return RouteResult::system_failure("此指令需要管理员权限");
        }

        let mut parts = args.split_whitespace();
        match parts.next().unwrap_or("").to_lowercase().as_str() {
            "allow" | "deny" => self.handle_admin_allow_deny(args).await,
            "set" => self.handle_admin_set(args).await,
            "privilege" => self.handle_admin_privilege(args).await,
            "reload" => self.handle_admin_reload().await,
            other => RouteResult::system_failure(format!("未知 /admin 子命令: {other}")),
        }
    }

    /// `/admin reload`: re-read the config document and publish a freshly
    /// rebuilt catalog snapshot (§4.1, §9 "Catalog swap").
    async fn handle_admin_reload(&self) -> RouteResult {
        let config = match self.config.load() {
            Ok(config) => config,
            Err(e) => return RouteResult::system_failure(format!("重新加载配置失败: {e}")),
        };

        let catalog = match Catalog::rebuild(&config) {
            Ok(catalog) => catalog,
            Err(e) => return RouteResult::system_failure(format!("重建指令目录失败: {e}")),
        };

        let (sets, categories) = (catalog.set_count(), catalog.category_count());
        self.catalog.swap(catalog);
        info!("catalog reloaded via /admin reload: {sets} sets, {categories} categories");
        RouteResult::system(format!("已重新加载配置：{sets} 个指令集，{categories} 个分类"))
    }

    /// `/admin allow|deny <qq_id> <category>`: grants or revokes a user's
    /// permission to switch styles within `category` (`User.allowed_switch_groups`).
    async fn handle_admin_allow_deny(&self, args: &str) -> RouteResult {
        let mut parts = args.split_whitespace();
        let verb = parts.next().unwrap_or("");
        let (Some(target_user), Some(category)) = (parts.next(), parts.next()) else {
            return RouteResult::system_failure("用法: /admin allow|deny <qq_id> <分类>");
        };
        let Ok(target_user) = target_user.parse::<i64>() else {
            return RouteResult::system_failure("qq_id 必须为数字");
        };
        let category = category.to_string();
        let allow = verb.eq_ignore_ascii_case("allow");

        let result = self
            .users
            .update(
                target_user,
                Box::new(move |u| {
                    if allow {
                        if !u.allowed_switch_groups.contains(&category) {
                            u.allowed_switch_groups.push(category);
                        }
                    } else {
                        u.allowed_switch_groups.retain(|g| g != &category);
                    }
                }),
            )
            .await;

        match result {
            Ok(_) => RouteResult::system("已更新"),
            Err(e) => RouteResult::system_failure(format!("更新失败: {e}")),
        }
    }

    async fn handle_admin_set(&self, args: &str) -> RouteResult {
        let mut parts = args.split_whitespace();
        let (Some(target_user), Some(category), Some(set_id)) = (parts.next(), parts.next(), parts.next()) else {
            return RouteResult::system_failure("用法: /admin set <qq_id> <分类> <指令集>");
        };
        let Ok(target_user) = target_user.parse::<i64>() else {
            return RouteResult::system_failure("qq_id 必须为数字");
        };
        let category = category.to_string();
        let set_id = set_id.to_string();

        let result = self
            .users
            .update(
                target_user,
                Box::new(move |u| {
                    u.selected_styles.insert(category.clone(), set_id.clone());
                }),
            )
            .await;

        match result {
            Ok(_) => RouteResult::system("已更新"),
            Err(e) => RouteResult::system_failure(format!("更新失败: {e}")),
        }
    }

    async fn handle_admin_privilege(&self, args: &str) -> RouteResult {
        let mut parts = args.split_whitespace();
        let (Some(target_user), Some(flag)) = (parts.next(), parts.next()) else {
            return RouteResult::system_failure("用法: /admin privilege <qq_id> <on|off>");
        };
        let Ok(target_user) = target_user.parse::<i64>() else {
            return RouteResult::system_failure("qq_id 必须为数字");
        };
        let on = flag.eq_ignore_ascii_case("on");

        let result = self
            .users
            .update(target_user, Box::new(move |u| u.is_privileged = on))
            .await;

        match result {
            Ok(_) => RouteResult::system("已更新"),
            Err(e) => RouteResult::system_failure(format!("更新失败: {e}")),
        }
    }
}

fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogHandle};
    use crate::model::{AppConfig, Category, Command, CommandSet, FinalAction, FinalRuleConfig};
    use crate::store::{InMemoryUserStore};

    fn command(name: &str) -> Command {
        Command {
            name: name.to_string(),
            aliases: vec![],
            description: String::new(),
            is_privileged: false,
            time_restriction: None,
            group_restriction: vec![],
            user_whitelist: vec![],
            user_blacklist: vec![],
        }
    }

    fn set(id: &str, priority: i64, category: Option<&str>, is_public: bool) -> CommandSet {
        CommandSet {
            id: id.to_string(),
            name: id.to_string(),
            prefix: None,
            category: category.map(ToString::to_string),
            description: String::new(),
            is_public,
            target_ws: "botA".to_string(),
            priority,
            strip_prefix: false,
            enabled: true,
            user_access_list: None,
            group_access_list: None,
            is_default: false,
            commands: vec![command("/chat")],
        }
    }

    fn router_with(config: AppConfig) -> Router {
        let catalog = Catalog::rebuild(&config).unwrap();
        let handle = Arc::new(CatalogHandle::new(catalog));
        let outbound = Arc::new(OutboundPool::new());
        let users = Arc::new(InMemoryUserStore::new());
        let config_manager = Arc::new(ConfigManager::new(std::env::temp_dir().join("dispatch-gateway-router-test-unused.yaml")));
        Router::new(handle, outbound, users, config_manager)
    }

    #[tokio::test]
    async fn scored_selection_prefers_user_selected_style() {
        let config = AppConfig {
            categories: vec![Category {
                id: "tone".to_string(),
                name: "tone".to_string(),
                display_name: "语气".to_string(),
                description: String::new(),
                icon: String::new(),
                order: 0,
                enabled: true,
                allow_user_switch: true,
                default_command_set: Some("serious".to_string()),
                is_mutex: true,
            }],
            command_sets: vec![set("serious", 5, Some("tone"), false), set("cute", 10, Some("tone"), false)],
            final_rule: FinalRuleConfig {
                action: FinalAction::Reject,
                send_message: false,
                message: None,
                target_ws: None,
            },
            ..AppConfig::default()
        };

        let router = router_with(config);
        router
            .users
            .update(100, Box::new(|u| {
                u.selected_styles.insert("tone".to_string(), "cute".to_string());
            }))
            .await
            .unwrap();

        let catalog = router.catalog.load();
        let user = router.users.get_or_create(100, "u").await.unwrap();
        let selected = router.select_set(&None, "/chat", &user, &catalog).unwrap();
        assert_eq!(selected.id, "cute");
    }

    #[tokio::test]
    async fn final_rule_allow_is_silent() {
        let config = AppConfig {
            final_rule: FinalRuleConfig {
                action: FinalAction::Allow,
                send_message: false,
                message: None,
                target_ws: None,
            },
            ..AppConfig::default()
        };
        let router = router_with(config);
        let result = router.route("random chatter", 100, Some(200), "u", None).await;
        assert!(result.success);
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn final_rule_reject_silent_when_no_message() {
        let config = AppConfig {
            final_rule: FinalRuleConfig {
                action: FinalAction::Reject,
                send_message: false,
                message: None,
                target_ws: None,
            },
            ..AppConfig::default()
        };
        let router = router_with(config);
        let result = router.route("random chatter", 100, Some(200), "u", None).await;
        assert!(!result.success);
        assert!(result.error_message.is_none());
    }

    #[tokio::test]
    async fn unknown_system_command_variant_is_rejected_gracefully() {
        let router = router_with(AppConfig::default());
        let result = router.route("/bogus", 100, None, "u", None).await;
        // "/bogus" is not a known system command and matches no set, so it
        // falls through to the Final rule (default reject, with the default
        // "未知指令" message).
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("未知指令"));
    }

    #[tokio::test]
    async fn admin_reload_swaps_the_catalog_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "dispatch-gateway-router-reload-test-{}.yaml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
admins:
  - 7
command_sets:
  - id: cute
    name: cute
    target_ws: botA
    commands:
      - name: /chat
"#,
        )
        .unwrap();

        let initial_config = AppConfig {
            admins: vec![7],
            ..AppConfig::default()
        };
        let catalog = Catalog::rebuild(&initial_config).unwrap();
        let handle = Arc::new(CatalogHandle::new(catalog));
        let outbound = Arc::new(OutboundPool::new());
        let users = Arc::new(InMemoryUserStore::new());
        let config_manager = Arc::new(ConfigManager::new(path.clone()));
        let router = Router::new(handle, outbound, users, config_manager);

        assert_eq!(router.catalog.load().set_count(), 0);

        let admin = User {
            qq_id: 7,
            nickname: "admin".to_string(),
            is_admin: false,
            is_privileged: false,
            selected_styles: Default::default(),
            allowed_switch_groups: Vec::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let result = router.handle_admin(&router.catalog.load(), &admin, "reload").await;

        assert!(result.success);
        assert_eq!(router.catalog.load().set_count(), 1);
        assert!(router.catalog.load().set_by_id("cute").is_some());

        std::fs::remove_file(&path).ok();
    }
}
