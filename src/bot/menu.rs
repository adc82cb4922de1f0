use chrono_tz::Tz;
use itertools::Itertools as _;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::{
    callback::{Action, BackCallback, FrontCallback},
    replace_all,
};
use crate::i18n::Text;
use crate::lottery::mention;
use crate::types::*;

const WORDS_PER_PAGE: usize = 30;

fn button(text: impl Into<String>, action: Action, group_id: i64) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, BackCallback::data(action, group_id))
}

fn back_row(group_id: i64, to: Action) -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Back", to, group_id)]
}

pub(super) type Menu = (String, InlineKeyboardMarkup);

pub(super) fn main_menu(group_id: i64, group_name: &str) -> Menu {
    let g = group_id;
    (
        format!(
            "Settings of *{}*, choose the item to change",
            replace_all(group_name)
        ),
        InlineKeyboardMarkup::new([
            vec![
                button("🎲 Lottery", Action::Lottery, g),
                button("💰 Points", Action::Points, g),
            ],
            vec![
                button("👋 Welcome", Action::Welcome, g),
                button("🗑️ Anti-spam", Action::AntiSpam, g),
            ],
            vec![
                button("🚫 Banned words", Action::Banned, g),
                button("🧹 Auto delete", Action::AutoDelete, g),
            ],
            vec![
                button("📊 Statistics", Action::Stats, g),
                button("🌐 Language", Action::Language, g),
            ],
        ]),
    )
}

pub(super) fn lottery_menu(group_id: i64) -> Menu {
    (
        "Lottery settings".into(),
        InlineKeyboardMarkup::new([
            vec![
                button("Create lottery", Action::CreateLottery, group_id),
                button("End lottery", Action::EndLottery, group_id),
            ],
            back_row(group_id, Action::Back),
        ]),
    )
}

pub(super) fn open_lotteries_menu(group_id: i64, lotteries: &[Lottery], tz: Tz) -> Menu {
    let text = if lotteries.is_empty() {
        "No open lottery in this group\\.".to_string()
    } else {
        format!(
            "Open lotteries:\n{}",
            lotteries
                .iter()
                .map(|lottery| format!(
                    "\\#{} *{}* ends at {} by {}",
                    lottery.id(),
                    replace_all(lottery.title()),
                    replace_all(&timestamp_to_string(lottery.end_time(), tz)),
                    mention(lottery.created_by(), &lottery.created_by().to_string())
                ))
                .join("\n")
        )
    };
    let mut rows = lotteries
        .iter()
        .map(|lottery| {
            vec![
                button(
                    format!("🎲 Draw #{}", lottery.id()),
                    Action::DrawLottery(lottery.id()),
                    group_id,
                ),
                button(
                    format!("🗑 Cancel #{}", lottery.id()),
                    Action::CancelLottery(lottery.id()),
                    group_id,
                ),
            ]
        })
        .collect_vec();
    rows.push(back_row(group_id, Action::Lottery));
    (text, InlineKeyboardMarkup::new(rows))
}

pub(super) fn join_keyboard(lottery_id: i64, language: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        Text::LotteryJoinButton.get(language),
        FrontCallback::JoinLottery(lottery_id).to_string(),
    )]])
}

pub(super) fn points_menu(group_id: i64, config: &PointsConfig) -> Menu {
    let g = group_id;
    let text = format!(
        "Points settings\n\nStatus: {}\n{}",
        return_tf_emoji(config.enabled()),
        PointsField::ALL
            .iter()
            .map(|field| format!(
                "{}: `{}`",
                replace_all(field.label()),
                replace_all(&config.field(*field))
            ))
            .join("\n")
    );
    let mut rows = vec![vec![button(
        if config.enabled() {
            "Disable points"
        } else {
            "Enable points"
        },
        Action::TogglePoints,
        g,
    )]];
    rows.extend(
        PointsField::ALL
            .chunks(2)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|field| button(field.label(), Action::SetPoints(*field), g))
                    .collect_vec()
            }),
    );
    rows.push(vec![
        button("➕ Add points", Action::AddPoints, g),
        button("➖ Deduct points", Action::DeductPoints, g),
    ]);
    rows.push(vec![
        button("🏆 Ranking", Action::Ranking, g),
        button("📜 History", Action::History, g),
    ]);
    rows.push(vec![button("🧨 Clear points", Action::ClearPoints, g)]);
    rows.push(back_row(g, Action::Back));
    (text, InlineKeyboardMarkup::new(rows))
}

pub(super) fn ranking_text(alias: &str, ranking: &[UserPoints]) -> String {
    if ranking.is_empty() {
        return format!("*{}*\n\nNo data yet\\.", replace_all(alias));
    }
    format!(
        "*{}*\n\n{}",
        replace_all(alias),
        ranking
            .iter()
            .enumerate()
            .map(|(index, user)| format!(
                "{}\\. {} \\- {}",
                index + 1,
                mention(user.user_id(), &user.user_id().to_string()),
                user.points()
            ))
            .join("\n")
    )
}

pub(super) fn history_text(history: &[PointsHistory], tz: Tz) -> String {
    if history.is_empty() {
        return "No points history yet\\.".into();
    }
    format!(
        "Recent points history:\n\n{}",
        history
            .iter()
            .map(|record| {
                let mut line = format!(
                    "{} user {} {:+}",
                    timestamp_to_string(record.created_at(), tz),
                    record.user_id(),
                    record.delta(),
                );
                if let Some(reason) = record.reason() {
                    line.push_str(&format!(" {reason}"));
                }
                if let Some(admin) = record.admin_id() {
                    line.push_str(&format!(" by admin {admin}"));
                }
                replace_all(&line).into_owned()
            })
            .join("\n")
    )
}

pub(super) fn clear_points_menu(group_id: i64) -> Menu {
    (
        "⚠️ Clear all points of this group? This can not be undone\\.".into(),
        InlineKeyboardMarkup::new([
            vec![button(
                "Yes, clear all",
                Action::ClearPointsConfirm,
                group_id,
            )],
            back_row(group_id, Action::Points),
        ]),
    )
}

pub(super) fn welcome_menu(group_id: i64, config: &GroupConfig) -> Menu {
    let g = group_id;
    (
        format!(
            "Welcome message settings\n\nStatus: {}\nCurrent welcome message:\n{}",
            return_tf_emoji(config.welcome_enabled()),
            replace_all(config.welcome_msg())
        ),
        InlineKeyboardMarkup::new([
            vec![
                button("Enable welcome", Action::EnableWelcome, g),
                button("Disable welcome", Action::DisableWelcome, g),
            ],
            vec![button("Set welcome message", Action::SetWelcome, g)],
            back_row(g, Action::Back),
        ]),
    )
}

/// Single switch page shared by anti-spam and auto delete.
pub(super) fn toggle_menu(group_id: i64, flag: ConfigFlag, enabled: bool) -> Menu {
    let (description, toggle) = match flag {
        ConfigFlag::AntiSpam => (
            "Delete messages containing banned words from non-administrators.",
            Action::ToggleAntiSpam,
        ),
        _ => (
            "Delete join and leave service messages.",
            Action::ToggleAutoDelete,
        ),
    };
    (
        format!(
            "{}\n\n{}\nStatus: {}",
            replace_all(flag.name()),
            replace_all(description),
            return_tf_emoji(enabled)
        ),
        InlineKeyboardMarkup::new([
            vec![button(
                if enabled { "Disable" } else { "Enable" },
                toggle,
                group_id,
            )],
            back_row(group_id, Action::Back),
        ]),
    )
}

pub(super) fn banned_menu(group_id: i64, words: &[BannedWord]) -> Menu {
    let text = if words.is_empty() {
        "Banned words\n\nNo banned word yet\\.".to_string()
    } else {
        format!(
            "Banned words \\({}\\), press a word to remove it:",
            words.len()
        )
    };
    let mut rows = words
        .iter()
        .take(WORDS_PER_PAGE)
        .chunks(3)
        .into_iter()
        .map(|chunk| {
            chunk
                .map(|word| button(format!("❌ {}", word.word()), Action::DelBanned(word.id()), group_id))
                .collect_vec()
        })
        .collect_vec();
    rows.push(vec![
        button("➕ Add word", Action::AddBanned, group_id),
        button("🧹 Clear all", Action::ClearBanned, group_id),
    ]);
    rows.push(back_row(group_id, Action::Back));
    (text, InlineKeyboardMarkup::new(rows))
}

pub(super) fn language_menu(group_id: i64, current: Language) -> Menu {
    let mut rows = Language::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|language| button(language.display(), Action::SetLanguage(*language), group_id))
                .collect_vec()
        })
        .collect_vec();
    rows.push(back_row(group_id, Action::Back));
    (
        format!(
            "Please select language\nCurrent: {}",
            replace_all(current.display())
        ),
        InlineKeyboardMarkup::new(rows),
    )
}

pub(super) fn front_language_keyboard() -> InlineKeyboardMarkup {
    let mut rows = Language::ALL
        .chunks(2)
        .map(|chunk| {
            chunk
                .iter()
                .map(|language| {
                    InlineKeyboardButton::callback(
                        language.display(),
                        FrontCallback::SetLanguage(*language).to_string(),
                    )
                })
                .collect_vec()
        })
        .collect_vec();
    rows.push(vec![InlineKeyboardButton::callback(
        "⬅️ Back",
        FrontCallback::BackToMain.to_string(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

pub(super) fn stats_text(
    group_name: &str,
    joined: Option<i64>,
    stats: &GroupStats,
    tz: Tz,
) -> String {
    format!(
        "📊 Statistics of *{}*\n\nBot joined: {}\nMembers with points: {}\nTotal points: {}\nOpen lotteries: {}\nTotal lotteries: {}\nBanned words: {}",
        replace_all(group_name),
        joined.map_or_else(
            || "unknown".into(),
            |time| replace_all(&timestamp_to_string(time, tz)).into_owned()
        ),
        stats.members_with_points,
        replace_all(&stats.total_points.to_string()),
        stats.open_lotteries,
        stats.total_lotteries,
        stats.banned_words
    )
}

pub(super) fn confirm_keyboard(action: Action, group_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        button("✅ Confirm", action, group_id),
        button("❌ Cancel", Action::Cancel, group_id),
    ]])
}

pub(super) fn cancel_keyboard(group_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button("❌ Cancel", Action::Cancel, group_id)]])
}

pub(super) fn back_keyboard(group_id: i64, to: Action) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([back_row(group_id, to)])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn menus_escape_user_text() {
        let (text, _) = main_menu(-1, "a.b_c");
        assert!(text.contains("a\\.b\\_c"));
        let stats = stats_text("x", None, &GroupStats::default(), chrono_tz::UTC);
        assert!(stats.contains("Total points: 0") && stats.contains("Bot joined: unknown"));
        assert!(
            stats_text("x", Some(1_735_689_600), &GroupStats::default(), chrono_tz::UTC)
                .contains("Bot joined: 2025\\-01\\-01 00:00")
        );
        assert_eq!(
            ranking_text("Top!", &[]),
            "*Top\\!*\n\nNo data yet\\."
        );
    }

    #[test]
    fn banned_menu_rows() {
        let (text, keyboard) = banned_menu(-1, &[]);
        assert!(text.contains("No banned word"));
        assert_eq!(keyboard.inline_keyboard.len(), 2);
    }
}
