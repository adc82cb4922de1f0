use std::sync::Arc;

use anyhow::anyhow;
use itertools::Itertools as _;
use log::{debug, info, warn};
use teloxide::{
    dispatching::{HandlerExt as _, UpdateFilterExt as _},
    dptree,
    payloads::{AnswerCallbackQuerySetters as _, SendMessageSetters as _},
    prelude::{Dispatcher, Requester as _},
    types::{
        CallbackQuery, Chat, ChatId, ChatMemberUpdated, InlineKeyboardButton,
        InlineKeyboardMarkup, Message, ReplyParameters, Update, User,
    },
    utils::command::BotCommands,
};

use super::{
    BotType,
    arg::NecessaryArg,
    callback::FrontCallback,
    functions::{
        add_to_group_link, admin_menu_link, check_group_admin, display_name, group_link,
        is_group, is_privileged, link_preview_options, report_error,
    },
    menu::{front_language_keyboard, ranking_text},
    replace_all,
};
use crate::{
    i18n::Text,
    lottery::mention,
    types::{GroupRecord, JoinResult, Language, current_second, date_of, find_banned_word},
};

const RANKING_LIMIT: i64 = 10;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Get started")]
    Start { args: String },
    #[command(description = "Show help")]
    Help,
    #[command(description = "About this bot")]
    About,
    #[command(description = "Daily check-in")]
    Checkin,
    #[command(description = "Show your points")]
    Points,
    #[command(description = "Points ranking")]
    Ranking,
}

pub async fn front_run(bot: BotType, arg: Arc<NecessaryArg>) -> anyhow::Result<()> {
    bot.set_my_commands(Command::bot_commands())
        .await
        .inspect_err(|e| warn!("Set front bot commands error: {e:?}"))
        .ok();

    let handle_command = Update::filter_message().filter_command::<Command>().endpoint(
        |msg: Message, bot: BotType, arg: Arc<NecessaryArg>, cmd: Command| async move {
            let ret = handle_command(&bot, &arg, &msg, cmd).await;
            report_error(&bot, &msg.chat, ret).await
        },
    );

    let handle_membership = Update::filter_message()
        .filter(|msg: Message| {
            is_group(&msg.chat)
                && (msg.new_chat_members().is_some() || msg.left_chat_member().is_some())
        })
        .endpoint(
            |msg: Message, bot: BotType, arg: Arc<NecessaryArg>| async move {
                let ret = handle_membership(&bot, &arg, &msg).await;
                report_error(&bot, &msg.chat, ret).await
            },
        );

    let handle_message = Update::filter_message().endpoint(
        |msg: Message, bot: BotType, arg: Arc<NecessaryArg>| async move {
            let ret = handle_message(&bot, &arg, &msg).await;
            report_error(&bot, &msg.chat, ret).await
        },
    );

    let handle_my_chat_member = Update::filter_my_chat_member().endpoint(
        |update: ChatMemberUpdated, arg: Arc<NecessaryArg>| async move {
            handle_my_chat_member(&arg, &update).await
        },
    );

    let handle_callback_query = Update::filter_callback_query()
        .filter(|q: CallbackQuery| q.data.is_some())
        .endpoint(
            |q: CallbackQuery, bot: BotType, arg: Arc<NecessaryArg>| async move {
                handle_callback_query(&bot, &arg, q).await
            },
        );

    let dispatcher = Dispatcher::builder(
        bot,
        dptree::entry()
            .branch(handle_command)
            .branch(handle_membership)
            .branch(handle_message)
            .branch(handle_my_chat_member)
            .branch(handle_callback_query),
    )
    .dependencies(dptree::deps![arg])
    .default_handler(|_| async {});

    #[cfg(not(debug_assertions))]
    dispatcher.enable_ctrlc_handler().build().dispatch().await;

    #[cfg(debug_assertions)]
    tokio::select! {
        _ = async move {
            dispatcher.build().dispatch().await
        } => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}

async fn group_language(arg: &NecessaryArg, chat: &Chat) -> Language {
    if !is_group(chat) {
        return Language::default();
    }
    arg.database()
        .config_query(chat.id.0)
        .await
        .map(|config| config.language())
        .unwrap_or_default()
}

async fn handle_command(
    bot: &BotType,
    arg: &NecessaryArg,
    msg: &Message,
    cmd: Command,
) -> anyhow::Result<()> {
    let language = group_language(arg, &msg.chat).await;
    match cmd {
        Command::Start { args } => {
            if !args.is_empty() {
                debug!("Ignore start payload {args:?} in {}", msg.chat.id.0);
            }
            if is_group(&msg.chat) {
                handle_group_start(bot, arg, msg).await
            } else {
                send_private_menu(bot, arg, msg.chat.id).await
            }
        }
        Command::Help => {
            bot.send_message(msg.chat.id, replace_all(Text::Help.get(language)))
                .await?;
            Ok(())
        }
        Command::About => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "{}\nVersion: `{}`",
                    replace_all(Text::About.get(language)),
                    replace_all(env!("CARGO_PKG_VERSION"))
                ),
            )
            .await?;
            Ok(())
        }
        Command::Checkin | Command::Points | Command::Ranking => {
            if !is_group(&msg.chat) {
                return Ok(());
            }
            let Some(user) = msg.from.as_ref() else {
                return Ok(());
            };
            handle_points_command(bot, arg, msg, user, cmd, language).await
        }
    }
}

async fn handle_points_command(
    bot: &BotType,
    arg: &NecessaryArg,
    msg: &Message,
    user: &User,
    cmd: Command,
    language: Language,
) -> anyhow::Result<()> {
    let group_id = msg.chat.id.0;
    let user_id = user.id.0 as i64;
    let config = arg
        .database()
        .config_query_points(group_id)
        .await
        .ok_or_else(|| anyhow!("Query points config error"))?;

    let text = if !config.enabled() {
        replace_all(Text::PointsDisabled.get(language)).into_owned()
    } else {
        match cmd {
            Command::Checkin => {
                let date = date_of(current_second(), arg.timezone());
                match arg
                    .database()
                    .points_checkin(group_id, user_id, date)
                    .await
                    .ok_or_else(|| anyhow!("Check-in error"))?
                {
                    Some(points) => replace_all(&format!(
                        "{} {points} {}",
                        Text::CheckinDone.get(language),
                        config.points_alias()
                    ))
                    .into_owned(),
                    None => replace_all(Text::CheckinAlready.get(language)).into_owned(),
                }
            }
            Command::Points => {
                let points = arg
                    .database()
                    .points_query(group_id, user_id)
                    .await
                    .ok_or_else(|| anyhow!("Query points error"))?;
                replace_all(&format!(
                    "{} {}: {points}",
                    Text::MyPoints.get(language),
                    config.points_alias()
                ))
                .into_owned()
            }
            _ => {
                let ranking = arg
                    .database()
                    .points_ranking(group_id, RANKING_LIMIT)
                    .await
                    .ok_or_else(|| anyhow!("Query ranking error"))?;
                if ranking.is_empty() {
                    replace_all(Text::RankingEmpty.get(language)).into_owned()
                } else {
                    ranking_text(config.ranking_alias(), &ranking)
                }
            }
        }
    };

    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

type Notice = (String, Option<InlineKeyboardMarkup>);

fn start_notice(
    arg: &NecessaryArg,
    group_id: i64,
    language: Language,
    bot_admin: bool,
    user_admin: bool,
) -> anyhow::Result<Notice> {
    if !bot_admin {
        return Ok((
            replace_all(Text::NeedBotAdmin.get(language)).into_owned(),
            Some(need_admin_keyboard(language)),
        ));
    }
    if !user_admin {
        return Ok((
            replace_all(Text::NotUserAdmin.get(language)).into_owned(),
            None,
        ));
    }
    Ok((
        replace_all(Text::Intro.get(language)).into_owned(),
        Some(admin_keyboard(arg, group_id, language)?),
    ))
}

fn need_admin_keyboard(language: Language) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        Text::NeedAdminButton.get(language),
        FrontCallback::NeedAdmin.to_string(),
    )]])
}

fn admin_keyboard(
    arg: &NecessaryArg,
    group_id: i64,
    language: Language,
) -> anyhow::Result<InlineKeyboardMarkup> {
    Ok(InlineKeyboardMarkup::new([
        [InlineKeyboardButton::url(
            Text::OpenAdminMenu.get(language),
            admin_menu_link(arg.back_username(), group_id).parse()?,
        )],
        [InlineKeyboardButton::callback(
            Text::LanguageButton.get(language),
            FrontCallback::Language.to_string(),
        )],
    ]))
}

async fn send_notice(
    bot: &BotType,
    chat_id: ChatId,
    (text, keyboard): Notice,
) -> anyhow::Result<()> {
    let request = bot.send_message(chat_id, text);
    match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(())
}

/// Save the group and tell the caller what to do next.
async fn handle_group_start(
    bot: &BotType,
    arg: &NecessaryArg,
    msg: &Message,
) -> anyhow::Result<()> {
    let group_id = msg.chat.id.0;
    let title = msg.chat.title().unwrap_or_default().to_string();
    arg.database().group_save(group_id, title.clone()).await;
    if !title.is_empty() {
        arg.database().config_group_name(group_id, title).await;
    }
    let language = group_language(arg, &msg.chat).await;

    let bot_admin = is_privileged(bot, group_id, arg.front_id()).await;
    let user_admin = match msg.from.as_ref() {
        Some(user) => check_group_admin(arg, group_id, user.id).await,
        None => false,
    };
    info!("Start in {group_id}, bot admin: {bot_admin}, user admin: {user_admin}");

    send_notice(
        bot,
        msg.chat.id,
        start_notice(arg, group_id, language, bot_admin, user_admin)?,
    )
    .await
}

fn private_menu(
    arg: &NecessaryArg,
    groups: &[GroupRecord],
) -> anyhow::Result<InlineKeyboardMarkup> {
    let mut rows = vec![vec![InlineKeyboardButton::url(
        "➕ Add to group",
        add_to_group_link(arg.front_username()).parse()?,
    )]];
    if !groups.is_empty() {
        rows.push(vec![InlineKeyboardButton::callback(
            "🔽 Joined groups 🔽",
            FrontCallback::GroupTitle.to_string(),
        )]);
        for group in groups {
            rows.push(vec![InlineKeyboardButton::url(
                format!("👥 {} (send /start there)", group.group_name()),
                group_link(group.group_id()).parse()?,
            )]);
        }
    }
    rows.push(vec![
        InlineKeyboardButton::callback("📢 Add channel", FrontCallback::AddChannel.to_string()),
        InlineKeyboardButton::callback("👥 Add group", FrontCallback::AddGroup.to_string()),
    ]);
    Ok(InlineKeyboardMarkup::new(rows))
}

async fn send_private_menu(
    bot: &BotType,
    arg: &NecessaryArg,
    chat_id: ChatId,
) -> anyhow::Result<()> {
    let groups = arg
        .database()
        .group_query_active()
        .await
        .ok_or_else(|| anyhow!("Query groups error"))?;
    bot.send_message(
        chat_id,
        "👋 Welcome\\!\n\nAdd me to your group and promote me to administrator, then send /start in the group\\.",
    )
    .reply_markup(private_menu(arg, &groups)?)
    .link_preview_options(link_preview_options(false))
    .await?;
    Ok(())
}

async fn handle_membership(
    bot: &BotType,
    arg: &NecessaryArg,
    msg: &Message,
) -> anyhow::Result<()> {
    let group_id = msg.chat.id.0;

    if let Some(left) = msg.left_chat_member() {
        if left.id == arg.front_id() {
            info!("Removed from group {group_id}");
            arg.database().group_inactive(group_id).await;
            return Ok(());
        }
    }

    let config = arg
        .database()
        .config_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query group config error"))?;

    for member in msg.new_chat_members().unwrap_or_default() {
        if member.id == arg.front_id() {
            info!("Added to group {group_id}");
            handle_group_start(bot, arg, msg).await?;
            continue;
        }
        if member.is_bot {
            continue;
        }

        if config.welcome_enabled() {
            bot.send_message(
                msg.chat.id,
                format!(
                    "{} {}",
                    mention(member.id.0 as i64, &display_name(member)),
                    replace_all(config.welcome_msg())
                ),
            )
            .await?;
        }

        if let Some(inviter) = msg.from.as_ref().filter(|u| u.id != member.id && !u.is_bot) {
            let points = arg
                .database()
                .config_query_points(group_id)
                .await
                .ok_or_else(|| anyhow!("Query points config error"))?;
            if points.enabled() {
                let rewarded = arg
                    .database()
                    .points_invite(
                        group_id,
                        inviter.id.0 as i64,
                        member.id.0 as i64,
                        date_of(current_second(), arg.timezone()),
                    )
                    .await
                    .unwrap_or_default();
                debug!(
                    "Invite {} -> {} in {group_id}, rewarded: {rewarded}",
                    inviter.id.0, member.id.0
                );
            }
        }
    }

    if config.auto_delete() {
        bot.delete_message(msg.chat.id, msg.id)
            .await
            .inspect_err(|e| warn!("Delete service message in {group_id} error: {e:?}"))
            .ok();
    }
    Ok(())
}

async fn handle_message(bot: &BotType, arg: &NecessaryArg, msg: &Message) -> anyhow::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if !is_group(&msg.chat) {
        if msg.chat.is_private() {
            bot.send_message(msg.chat.id, "Please use /start to get started\\.")
                .await?;
        }
        return Ok(());
    }

    if text.trim().eq_ignore_ascii_case("start") {
        return handle_group_start(bot, arg, msg).await;
    }
    if text.starts_with('/') {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref().filter(|u| !u.is_bot) else {
        return Ok(());
    };

    let group_id = msg.chat.id.0;
    let config = arg
        .database()
        .config_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query group config error"))?;

    if config.anti_spam() {
        let words = arg
            .database()
            .banned_word_query(group_id)
            .await
            .unwrap_or_default();
        if let Some(word) = find_banned_word(text, &words) {
            if !check_group_admin(arg, group_id, user.id).await {
                info!(
                    "Delete message {} of {} in {group_id}, banned word: {word:?}",
                    msg.id.0, user.id.0
                );
                bot.delete_message(msg.chat.id, msg.id)
                    .await
                    .inspect_err(|e| warn!("Delete message in {group_id} error: {e:?}"))
                    .ok();
                return Ok(());
            }
        }
    }

    let points = arg
        .database()
        .config_query_points(group_id)
        .await
        .ok_or_else(|| anyhow!("Query points config error"))?;
    if points.enabled() && text.chars().count() as i64 >= points.min_message_length() {
        arg.database()
            .points_message(
                group_id,
                user.id.0 as i64,
                date_of(current_second(), arg.timezone()),
            )
            .await;
    }

    if arg
        .first_message(group_id, user.id, date_of(current_second(), arg.timezone()))
        .await
    {
        let language = config.language();
        let bot_admin = is_privileged(bot, group_id, arg.front_id()).await;
        let notice = if !bot_admin {
            start_notice(arg, group_id, language, false, false)?
        } else if check_group_admin(arg, group_id, user.id).await {
            (
                replace_all(Text::FirstMessageAdmin.get(language)).into_owned(),
                Some(admin_keyboard(arg, group_id, language)?),
            )
        } else {
            (
                replace_all(Text::FirstMessageMember.get(language)).into_owned(),
                None,
            )
        };
        send_notice(bot, msg.chat.id, notice).await?;
    }
    Ok(())
}

async fn handle_my_chat_member(
    arg: &NecessaryArg,
    update: &ChatMemberUpdated,
) -> anyhow::Result<()> {
    if !is_group(&update.chat) {
        return Ok(());
    }
    let group_id = update.chat.id.0;
    let before = update.old_chat_member.is_present();
    let after = update.new_chat_member.is_present();
    info!("Membership changed in {group_id}: present {before} -> {after}");
    if !before && after {
        arg.database()
            .group_save(
                group_id,
                update.chat.title().unwrap_or_default().to_string(),
            )
            .await;
    } else if before && !after {
        arg.database().group_inactive(group_id).await;
    }
    Ok(())
}

async fn handle_callback_query(
    bot: &BotType,
    arg: &NecessaryArg,
    q: CallbackQuery,
) -> anyhow::Result<()> {
    let Some(callback) = q
        .data
        .as_deref()
        .and_then(|data| FrontCallback::try_from(data).ok())
    else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some(chat) = q.message.as_ref().map(|m| m.chat().clone()) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let ret = route_callback(bot, arg, &q, &chat, callback).await;
    let answer = match ret {
        Ok(answer) => answer,
        Err(e) => {
            report_error(bot, &chat, Err(e)).await?;
            None
        }
    };
    match answer {
        Some((text, alert)) => {
            bot.answer_callback_query(q.id)
                .text(text)
                .show_alert(alert)
                .await?
        }
        None => bot.answer_callback_query(q.id).await?,
    };
    Ok(())
}

/// Returns the text of the callback answer, if any.
async fn route_callback(
    bot: &BotType,
    arg: &NecessaryArg,
    q: &CallbackQuery,
    chat: &Chat,
    callback: FrontCallback,
) -> anyhow::Result<Option<(String, bool)>> {
    let group_id = chat.id.0;
    let language = group_language(arg, chat).await;

    match callback {
        FrontCallback::Language | FrontCallback::SetLanguage(_) => {
            if !is_group(chat) {
                return Ok(None);
            }
            if !is_privileged(bot, group_id, arg.front_id()).await {
                send_notice(
                    bot,
                    chat.id,
                    start_notice(arg, group_id, language, false, false)?,
                )
                .await?;
                return Ok(None);
            }
            if !check_group_admin(arg, group_id, q.from.id).await {
                return Ok(Some((Text::OnlyAdmin.get(language).to_string(), true)));
            }
            if let FrontCallback::SetLanguage(selected) = callback {
                arg.database()
                    .config_language(group_id, selected)
                    .await
                    .ok_or_else(|| anyhow!("Update group language error"))?;
                info!("Group {group_id} language set to {}", selected.code());
                bot.send_message(
                    chat.id,
                    replace_all(&format!(
                        "{}: {}",
                        Text::LanguageUpdated.get(selected),
                        selected.display()
                    )),
                )
                .await?;
            } else {
                bot.send_message(chat.id, replace_all(Text::SelectLanguage.get(language)))
                    .reply_markup(front_language_keyboard())
                    .await?;
            }
        }
        FrontCallback::NeedAdmin => {
            bot.send_message(chat.id, replace_all(Text::NeedBotAdmin.get(language)))
                .await?;
        }
        FrontCallback::AddChannel => {
            bot.send_message(
                chat.id,
                "Add me to your channel as an administrator, then forward a channel message to me\\.",
            )
            .await?;
        }
        FrontCallback::AddGroup => {
            let groups = arg
                .database()
                .group_query_active()
                .await
                .ok_or_else(|| anyhow!("Query groups error"))?;
            let keyboard = InlineKeyboardMarkup::new([[InlineKeyboardButton::url(
                "➕ Add to a new group",
                add_to_group_link(arg.front_username()).parse()?,
            )]]);
            let text = if groups.is_empty() {
                "Add me to your group and promote me to administrator\\.".to_string()
            } else {
                format!(
                    "I have joined these groups:\n\n{}\n\nPress the button below to add me to a new group\\.",
                    groups
                        .iter()
                        .enumerate()
                        .map(|(index, group)| format!(
                            "{}\\. {}",
                            index + 1,
                            replace_all(group.group_name())
                        ))
                        .join("\n")
                )
            };
            bot.send_message(chat.id, text).reply_markup(keyboard).await?;
        }
        FrontCallback::GroupTitle => {}
        FrontCallback::BackToMain => {
            if is_group(chat) {
                let bot_admin = is_privileged(bot, group_id, arg.front_id()).await;
                let user_admin = check_group_admin(arg, group_id, q.from.id).await;
                send_notice(
                    bot,
                    chat.id,
                    start_notice(arg, group_id, language, bot_admin, user_admin)?,
                )
                .await?;
            } else {
                send_private_menu(bot, arg, chat.id).await?;
            }
        }
        FrontCallback::JoinLottery(id) => {
            let result = arg
                .database()
                .lottery_join(id, q.from.id.0 as i64, display_name(&q.from))
                .await
                .ok_or_else(|| anyhow!("Join lottery error"))?;
            debug!("User {} join lottery {id}: {result:?}", q.from.id.0);
            let text = match result {
                JoinResult::Joined => Text::JoinedLottery,
                JoinResult::AlreadyJoined => Text::AlreadyJoinedLottery,
                JoinResult::Closed | JoinResult::NotFound => Text::LotteryClosed,
            };
            return Ok(Some((text.get(language).to_string(), false)));
        }
    }
    Ok(None)
}
