//! Per-command and style-switch gating (§4.3).
#![allow(dead_code)]

use crate::model::Command;
use crate::store::User;
use crate::utils::local_hm_now;

/// The reason a command was refused, carrying its user-facing Chinese
/// message. Ordering of variants mirrors the fixed evaluation order in
/// `check_command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    Blacklisted,
    NotWhitelisted,
    GroupRestricted,
    TimeRestricted { window: String },
    PrivilegeRequired,
    NotAllowedToSwitch,
}

impl PolicyDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// User-facing Chinese message for a refusal; `None` for `Allowed`.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Allowed => None,
            Self::Blacklisted => Some("你已被该指令拉黑，无法使用".to_string()),
            Self::NotWhitelisted => Some("该指令仅限白名单用户使用".to_string()),
            Self::GroupRestricted => Some("该指令在本群不可用".to_string()),
            Self::TimeRestricted { window } => Some(format!("该指令仅在 {window} 期间可用")),
            Self::PrivilegeRequired => Some("此指令需要特权才能使用".to_string()),
            Self::NotAllowedToSwitch => Some("你没有权限切换风格".to_string()),
        }
    }
}

pub struct PermissionChecker;

impl PermissionChecker {
    /// Evaluate `cmd` for `user` in `group_id`, in the fixed order from §4.3:
    /// admin short-circuit, blacklist, whitelist, group restriction, time
    /// restriction, privilege.
    pub fn check_command(
        user: &User,
        admins: &[i64],
        cmd: &Command,
        group_id: Option<i64>,
    ) -> PolicyDecision {
        if admins.contains(&user.qq_id) {
            return PolicyDecision::Allowed;
        }

        if cmd.user_blacklist.contains(&user.qq_id) {
            return PolicyDecision::Blacklisted;
        }

        if !cmd.user_whitelist.is_empty() && !cmd.user_whitelist.contains(&user.qq_id) {
            return PolicyDecision::NotWhitelisted;
        }

        if let Some(group_id) = group_id {
            if !cmd.group_restriction.is_empty() && !cmd.group_restriction.contains(&group_id) {
                return PolicyDecision::GroupRestricted;
            }
        }

        if let Some(window) = &cmd.time_restriction {
            if !window.contains(local_hm_now()) {
                return PolicyDecision::TimeRestricted {
                    window: window.display(),
                };
            }
        }

        if cmd.is_privileged && !user.is_privileged {
            return PolicyDecision::PrivilegeRequired;
        }

        PolicyDecision::Allowed
    }

    /// Admin always allowed; otherwise the category must permit user switching.
    pub fn check_style_switch(user: &User, admins: &[i64], allow_user_switch: bool) -> PolicyDecision {
        if admins.contains(&user.qq_id) || allow_user_switch {
            PolicyDecision::Allowed
        } else {
            PolicyDecision::NotAllowedToSwitch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeRange;
    use chrono::Utc;

    fn user(qq_id: i64) -> User {
        User::new(qq_id, "u".to_string(), Utc::now())
    }

    fn command() -> Command {
        Command {
            name: "/trade".to_string(),
            aliases: vec![],
            description: String::new(),
            is_privileged: false,
            time_restriction: None,
            group_restriction: vec![],
            user_whitelist: vec![],
            user_blacklist: vec![],
        }
    }

    #[test]
    fn admin_short_circuits_everything() {
        let mut cmd = command();
        cmd.user_blacklist = vec![1];
        cmd.is_privileged = true;
        let u = user(1);
        assert_eq!(
            PermissionChecker::check_command(&u, &[1], &cmd, None),
            PolicyDecision::Allowed
        );
    }

    #[test]
    fn blacklist_wins_before_whitelist_check() {
        let mut cmd = command();
        cmd.user_blacklist = vec![1];
        cmd.user_whitelist = vec![1];
        let u = user(1);
        assert_eq!(
            PermissionChecker::check_command(&u, &[], &cmd, None),
            PolicyDecision::Blacklisted
        );
    }

    #[test]
    fn whitelist_rejects_outsiders() {
        let mut cmd = command();
        cmd.user_whitelist = vec![5];
        let u = user(1);
        assert_eq!(
            PermissionChecker::check_command(&u, &[], &cmd, None),
            PolicyDecision::NotWhitelisted
        );
    }

    #[test]
    fn group_restriction_only_checked_when_group_present() {
        let mut cmd = command();
        cmd.group_restriction = vec![200];
        let u = user(1);
        assert_eq!(
            PermissionChecker::check_command(&u, &[], &cmd, None),
            PolicyDecision::Allowed
        );
        assert_eq!(
            PermissionChecker::check_command(&u, &[], &cmd, Some(999)),
            PolicyDecision::GroupRestricted
        );
    }

    #[test]
    fn privilege_required_surfaces_message() {
        let mut cmd = command();
        cmd.is_privileged = true;
        let u = user(1);
        let decision = PermissionChecker::check_command(&u, &[], &cmd, None);
        assert_eq!(decision, PolicyDecision::PrivilegeRequired);
        assert_eq!(decision.message().unwrap(), "此指令需要特权才能使用");
    }

    #[test]
    fn time_restriction_message_contains_window() {
        let mut cmd = command();
        cmd.time_restriction = Some(TimeRange {
            start: (22, 0),
            end: (6, 0),
        });
        let decision = PolicyDecision::TimeRestricted {
            window: cmd.time_restriction.unwrap().display(),
        };
        assert!(decision.message().unwrap().contains("22:00 - 06:00"));
    }

    #[test]
    fn style_switch_requires_flag_unless_admin() {
        let u = user(1);
        assert_eq!(
            PermissionChecker::check_style_switch(&u, &[], false),
            PolicyDecision::NotAllowedToSwitch
        );
        assert_eq!(
            PermissionChecker::check_style_switch(&u, &[1], false),
            PolicyDecision::Allowed
        );
        assert_eq!(
            PermissionChecker::check_style_switch(&u, &[], true),
            PolicyDecision::Allowed
        );
    }
}
