use log::{error, warn};
use teloxide::{
    prelude::Requester as _,
    types::{Chat, ChatId, LinkPreviewOptions, User, UserId},
};

use super::{BotType, TELEGRAM_ESCAPE_RE, arg::NecessaryArg};

pub fn replace_all(s: &str) -> std::borrow::Cow<'_, str> {
    TELEGRAM_ESCAPE_RE.replace_all(s, "\\$1")
}

pub(super) fn link_preview_options(enable: bool) -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: !enable,
        prefer_large_media: false,
        prefer_small_media: false,
        url: None,
        show_above_text: false,
    }
}

pub(super) fn admin_menu_link(back_username: &str, group_id: i64) -> String {
    format!("https://t.me/{back_username}?start={group_id}")
}

pub(super) fn add_to_group_link(username: &str) -> String {
    format!("https://t.me/{username}?startgroup=true")
}

/// Supergroup ids carry a `-100` prefix that `t.me/c/` links omit.
pub(super) fn group_link(group_id: i64) -> String {
    let id = group_id.to_string();
    format!(
        "https://t.me/c/{}",
        id.strip_prefix("-100")
            .or_else(|| id.strip_prefix('-'))
            .unwrap_or(&id)
    )
}

pub(super) fn display_name(user: &User) -> String {
    match &user.username {
        Some(username) if user.first_name.is_empty() => format!("@{username}"),
        _ => user.full_name(),
    }
}

pub(super) fn is_group(chat: &Chat) -> bool {
    chat.is_group() || chat.is_supergroup()
}

pub(super) async fn is_privileged(bot: &BotType, group_id: i64, user: UserId) -> bool {
    match bot.get_chat_member(ChatId(group_id), user).await {
        Ok(member) => member.is_privileged(),
        Err(e) => {
            warn!("Query member {} of {group_id} error: {e:?}", user.0);
            false
        }
    }
}

/// Global admins pass, everyone else must administer the group.
pub(super) async fn check_group_admin(arg: &NecessaryArg, group_id: i64, user: UserId) -> bool {
    arg.check_admin(ChatId(user.0 as i64)) || is_privileged(arg.front(), group_id, user).await
}

/// Log a failed handler, in private chats also tell the user.
pub(super) async fn report_error(
    bot: &BotType,
    chat: &Chat,
    ret: anyhow::Result<()>,
) -> anyhow::Result<()> {
    let Err(e) = ret else {
        return Ok(());
    };
    error!("Handle update from {} error: {e:?}", chat.id);
    if chat.is_private() {
        bot.send_message(chat.id, "Sorry, something went wrong, please try again later\\.")
            .await
            .inspect_err(|e| error!("Send apology error: {e:?}"))
            .ok();
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn escape_markdown() {
        assert_eq!(replace_all("a_b*c"), "a\\_b\\*c");
        assert_eq!(replace_all("1.5 (x)!"), "1\\.5 \\(x\\)\\!");
        assert_eq!(replace_all("plain 中文"), "plain 中文");
    }

    #[test]
    fn links() {
        assert_eq!(group_link(-1001234567), "https://t.me/c/1234567");
        assert_eq!(group_link(-42), "https://t.me/c/42");
        assert_eq!(
            admin_menu_link("admin_bot", -100),
            "https://t.me/admin_bot?start=-100"
        );
        assert_eq!(
            add_to_group_link("front_bot"),
            "https://t.me/front_bot?startgroup=true"
        );
    }
}
