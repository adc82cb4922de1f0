use std::sync::Arc;

use anyhow::anyhow;
use log::{info, warn};
use teloxide::{
    ApiError, RequestError,
    dispatching::{HandlerExt as _, UpdateFilterExt as _},
    dptree,
    payloads::{
        AnswerCallbackQuerySetters as _, EditMessageTextSetters as _, SendMessageSetters as _,
    },
    prelude::{Dispatcher, Requester as _},
    types::{
        CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, MessageId,
        Update, UserId,
    },
    utils::command::BotCommands,
};

use super::{
    BotType,
    arg::NecessaryArg,
    callback::{Action, BackCallback},
    functions::{add_to_group_link, check_group_admin, report_error},
    menu::{self, Menu},
    replace_all,
};
use crate::{
    database::DatabaseHelper,
    lottery::{announce_text, lottery_text},
    types::{ConfigFlag, FieldValue, Language, Lottery, LotteryDraft, current_second},
    wizard::{
        InputKind, InputValue, LotteryWizard, Outcome, PointsAction, PointsOperation,
        PointsWizard, Session, Step, WizardKind,
    },
};

const LIST_LIMIT: i64 = 10;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Open the admin menu")]
    Start { args: String },
    #[command(description = "Show help")]
    Help,
    #[command(description = "Cancel the current input")]
    Cancel,
}

pub async fn back_run(bot: BotType, arg: Arc<NecessaryArg>) -> anyhow::Result<()> {
    bot.set_my_commands(Command::bot_commands())
        .await
        .inspect_err(|e| warn!("Set back bot commands error: {e:?}"))
        .ok();

    let handle_command = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_command::<Command>()
        .endpoint(
            |msg: Message, bot: BotType, arg: Arc<NecessaryArg>, cmd: Command| async move {
                let ret = handle_command(&bot, &arg, &msg, cmd).await;
                report_error(&bot, &msg.chat, ret).await
            },
        );

    let handle_message = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.text().is_some())
        .endpoint(
            |msg: Message, bot: BotType, arg: Arc<NecessaryArg>| async move {
                let ret = handle_message(&bot, &arg, &msg).await;
                report_error(&bot, &msg.chat, ret).await
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
            .branch(handle_message)
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

async fn handle_command(
    bot: &BotType,
    arg: &NecessaryArg,
    msg: &Message,
    cmd: Command,
) -> anyhow::Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    match cmd {
        Command::Start { args } => {
            let Ok(group_id) = args.trim().parse::<i64>() else {
                bot.send_message(
                    msg.chat.id,
                    "👋 Welcome to the admin bot\\!\n\nAdd the main bot to your group first, then open the admin menu from there\\.",
                )
                .reply_markup(InlineKeyboardMarkup::new([[InlineKeyboardButton::url(
                    "➕ Add main bot to group",
                    add_to_group_link(arg.front_username()).parse()?,
                )]]))
                .await?;
                return Ok(());
            };
            let joined = arg
                .database()
                .group_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query group error"))?
                .is_some_and(|group| group.active());
            if !joined {
                bot.send_message(
                    msg.chat.id,
                    "⚠️ The main bot is not in this group\\. Add it and send /start in the group first\\.",
                )
                .await?;
                return Ok(());
            }
            if !check_group_admin(arg, group_id, user.id).await {
                info!("User {} is not admin of {group_id}", user.id.0);
                bot.send_message(
                    msg.chat.id,
                    "⚠️ You are not an administrator of this group\\.",
                )
                .await?;
                return Ok(());
            }
            let config = arg
                .database()
                .config_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query group config error"))?;
            let (text, keyboard) = menu::main_menu(group_id, config.group_name());
            bot.send_message(msg.chat.id, text)
                .reply_markup(keyboard)
                .await?;
        }
        Command::Help => {
            bot.send_message(
                msg.chat.id,
                "Admin bot help:\n\
                /start \\- Get started\n\
                /help \\- Show this help\n\
                /cancel \\- Cancel the current input\n\n\
                How to use:\n\
                1\\. Add the main bot to your group\n\
                2\\. Send /start in the group\n\
                3\\. Press the \"Open admin menu\" button\n\
                4\\. Configure your group here",
            )
            .await?;
        }
        Command::Cancel => {
            let text = if arg.sessions().cancel(user.id.0 as i64).await {
                "Cancelled\\."
            } else {
                "Nothing to cancel\\."
            };
            bot.send_message(msg.chat.id, text).await?;
        }
    }
    Ok(())
}

async fn handle_message(bot: &BotType, arg: &NecessaryArg, msg: &Message) -> anyhow::Result<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    if text.starts_with('/') {
        bot.send_message(msg.chat.id, "Unknown command, see /help\\.")
            .await?;
        return Ok(());
    }
    let user_id = user.id.0 as i64;

    let Some(outcome) = arg
        .sessions()
        .feed(user_id, text, current_second(), arg.timezone())
        .await
    else {
        bot.send_message(
            msg.chat.id,
            "Please open the admin menu from your group first\\.",
        )
        .await?;
        return Ok(());
    };

    match outcome {
        Outcome::Reprompt(reason) => {
            bot.send_message(msg.chat.id, replace_all(&reason)).await?;
        }
        Outcome::Step {
            group_id,
            kind,
            step,
        } => {
            let request = match step {
                Step::Next(prompt) | Step::Reprompt(prompt) => bot
                    .send_message(msg.chat.id, replace_all(&prompt))
                    .reply_markup(menu::cancel_keyboard(group_id)),
                Step::Ready(summary) => {
                    let confirm = match kind {
                        WizardKind::Lottery => Action::ConfirmLottery,
                        WizardKind::Points => Action::ConfirmPoints,
                    };
                    bot.send_message(
                        msg.chat.id,
                        format!("Please confirm:\n\n{}", replace_all(&summary)),
                    )
                    .reply_markup(menu::confirm_keyboard(confirm, group_id))
                }
            };
            request.await?;
        }
        Outcome::Input { group_id, value } => {
            if !check_group_admin(arg, group_id, user.id).await {
                bot.send_message(
                    msg.chat.id,
                    "⚠️ You are not an administrator of this group\\.",
                )
                .await?;
                return Ok(());
            }
            let (text, back) = apply_input(arg.database(), group_id, value).await?;
            bot.send_message(msg.chat.id, text)
                .reply_markup(menu::back_keyboard(group_id, back))
                .await?;
        }
    }
    Ok(())
}

async fn apply_input(
    database: &DatabaseHelper,
    group_id: i64,
    value: InputValue,
) -> anyhow::Result<(String, Action)> {
    Ok(match value {
        InputValue::Welcome(message) => {
            database
                .config_welcome(group_id, message)
                .await
                .ok_or_else(|| anyhow!("Update welcome message error"))?;
            ("Welcome message updated\\.".into(), Action::Welcome)
        }
        InputValue::BannedWord(word) => {
            let added = database
                .banned_word_add(group_id, word.clone())
                .await
                .ok_or_else(|| anyhow!("Insert banned word error"))?;
            (
                if added {
                    format!("Banned word `{}` added\\.", replace_all(&word))
                } else {
                    format!("Banned word `{}` already exists\\.", replace_all(&word))
                },
                Action::Banned,
            )
        }
        InputValue::Field(field, value) => {
            let display = match &value {
                FieldValue::Number(n) => n.to_string(),
                FieldValue::Text(s) => s.clone(),
            };
            database
                .config_points_field(group_id, field, value)
                .await
                .ok_or_else(|| anyhow!("Update points config error"))?;
            (
                format!(
                    "{} set to `{}`\\.",
                    replace_all(field.label()),
                    replace_all(&display)
                ),
                Action::Points,
            )
        }
    })
}

async fn edit_menu(
    bot: &BotType,
    chat_id: ChatId,
    message_id: MessageId,
    (text, keyboard): Menu,
) -> anyhow::Result<()> {
    match bot
        .edit_message_text(chat_id, message_id, text)
        .reply_markup(keyboard)
        .await
    {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn handle_callback_query(
    bot: &BotType,
    arg: &NecessaryArg,
    q: CallbackQuery,
) -> anyhow::Result<()> {
    let Some(callback) = q
        .data
        .as_deref()
        .and_then(|data| BackCallback::try_from(data).ok())
    else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };
    let Some((chat, message_id)) = q.message.as_ref().map(|m| (m.chat().clone(), m.id())) else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let answer = if check_group_admin(arg, callback.group_id, q.from.id).await {
        match route_callback(bot, arg, q.from.id, chat.id, message_id, callback).await {
            Ok(answer) => answer,
            Err(e) => {
                report_error(bot, &chat, Err(e)).await?;
                None
            }
        }
    } else {
        info!(
            "Reject callback {:?} from {} in {}",
            callback.action, q.from.id.0, callback.group_id
        );
        Some(("⚠️ You are not an administrator of this group".to_string(), true))
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

async fn route_callback(
    bot: &BotType,
    arg: &NecessaryArg,
    user: UserId,
    chat_id: ChatId,
    message_id: MessageId,
    callback: BackCallback,
) -> anyhow::Result<Option<(String, bool)>> {
    let BackCallback { action, group_id } = callback;
    let user_id = user.0 as i64;
    let database = arg.database();
    let tz = arg.timezone();

    let menu = match action {
        Action::Back => {
            let config = database
                .config_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query group config error"))?;
            menu::main_menu(group_id, config.group_name())
        }
        Action::Lottery => menu::lottery_menu(group_id),
        Action::CreateLottery => {
            arg.sessions()
                .start(
                    user_id,
                    Session::Lottery(LotteryWizard::new(group_id, user_id)),
                    current_second(),
                )
                .await;
            return prompt(bot, chat_id, group_id, LotteryWizard::FIRST_PROMPT).await;
        }
        Action::EndLottery => {
            arg.monitor().check().await;
            let lotteries = database
                .lottery_query_open(group_id)
                .await
                .ok_or_else(|| anyhow!("Query open lottery error"))?;
            menu::open_lotteries_menu(group_id, &lotteries, tz)
        }
        Action::DrawLottery(id) | Action::CancelLottery(id) => {
            let Some(lottery) = database
                .lottery_query(id)
                .await
                .ok_or_else(|| anyhow!("Query lottery error"))?
                .filter(|lottery| lottery.group_id() == group_id)
            else {
                return Ok(Some(("Lottery not found".into(), true)));
            };
            let answer = if !lottery.open() {
                closed_answer(&lottery)
            } else if let Action::DrawLottery(_) = action {
                draw_lottery(arg, id).await?
            } else if database
                .lottery_cancel(id)
                .await
                .ok_or_else(|| anyhow!("Cancel lottery error"))?
            {
                info!("Lottery {id} in {group_id} cancelled by {user_id}");
                "Lottery cancelled"
            } else {
                "Lottery already closed"
            };
            let lotteries = database
                .lottery_query_open(group_id)
                .await
                .ok_or_else(|| anyhow!("Query open lottery error"))?;
            edit_menu(
                bot,
                chat_id,
                message_id,
                menu::open_lotteries_menu(group_id, &lotteries, tz),
            )
            .await?;
            return Ok(Some((answer.into(), false)));
        }
        Action::ConfirmLottery => {
            let now = current_second();
            let Some(draft) = arg.sessions().take_lottery(user_id, group_id, now).await else {
                return Ok(Some(("Nothing to confirm".into(), true)));
            };
            let Some(lottery) = commit_lottery(database, draft, now).await? else {
                return Ok(Some((
                    "End time already passed, please create the lottery again".into(),
                    true,
                )));
            };
            let id = lottery.id();
            info!("Lottery {id} created in {group_id} by {user_id}");
            let language = group_language(database, group_id).await?;
            arg.front()
                .send_message(ChatId(group_id), lottery_text(&lottery, tz, language))
                .reply_markup(menu::join_keyboard(id, language))
                .await?;
            (
                format!("Lottery \\#{id} created and announced in the group\\."),
                menu::back_keyboard(group_id, Action::Lottery),
            )
        }
        Action::Points => points_menu(arg, group_id).await?,
        Action::TogglePoints => {
            let config = database
                .config_query_points(group_id)
                .await
                .ok_or_else(|| anyhow!("Query points config error"))?;
            database
                .config_flag_set(group_id, ConfigFlag::Points, !config.enabled())
                .await
                .ok_or_else(|| anyhow!("Update points flag error"))?;
            points_menu(arg, group_id).await?
        }
        Action::SetPoints(field) => {
            let config = database
                .config_query_points(group_id)
                .await
                .ok_or_else(|| anyhow!("Query points config error"))?;
            let kind = InputKind::Field(field);
            arg.sessions()
                .start(user_id, Session::Input { group_id, kind }, current_second())
                .await;
            return prompt(
                bot,
                chat_id,
                group_id,
                &format!("Current value: {}\n{}", config.field(field), kind.prompt()),
            )
            .await;
        }
        Action::AddPoints | Action::DeductPoints => {
            let points_action = if action == Action::AddPoints {
                PointsAction::Add
            } else {
                PointsAction::Deduct
            };
            arg.sessions()
                .start(
                    user_id,
                    Session::Points(PointsWizard::new(group_id, points_action)),
                    current_second(),
                )
                .await;
            return prompt(bot, chat_id, group_id, PointsWizard::FIRST_PROMPT).await;
        }
        Action::ConfirmPoints => {
            let Some(operation) = arg
                .sessions()
                .take_points(user_id, group_id, current_second())
                .await
            else {
                return Ok(Some(("Nothing to confirm".into(), true)));
            };
            (
                commit_points(database, &operation, user_id).await?,
                menu::back_keyboard(group_id, Action::Points),
            )
        }
        Action::Ranking => {
            let config = database
                .config_query_points(group_id)
                .await
                .ok_or_else(|| anyhow!("Query points config error"))?;
            let ranking = database
                .points_ranking(group_id, LIST_LIMIT)
                .await
                .ok_or_else(|| anyhow!("Query ranking error"))?;
            (
                menu::ranking_text(config.ranking_alias(), &ranking),
                menu::back_keyboard(group_id, Action::Points),
            )
        }
        Action::History => {
            let history = database
                .points_history_query(group_id, LIST_LIMIT)
                .await
                .ok_or_else(|| anyhow!("Query points history error"))?;
            (
                menu::history_text(&history, tz),
                menu::back_keyboard(group_id, Action::Points),
            )
        }
        Action::ClearPoints => menu::clear_points_menu(group_id),
        Action::ClearPointsConfirm => {
            database
                .points_clear(group_id)
                .await
                .ok_or_else(|| anyhow!("Clear points error"))?;
            info!("Points of {group_id} cleared by {user_id}");
            edit_menu(bot, chat_id, message_id, points_menu(arg, group_id).await?).await?;
            return Ok(Some(("All points cleared".into(), false)));
        }
        Action::Welcome => welcome_menu(arg, group_id).await?,
        Action::EnableWelcome | Action::DisableWelcome => {
            let changed = database
                .config_flag_set(
                    group_id,
                    ConfigFlag::Welcome,
                    action == Action::EnableWelcome,
                )
                .await
                .ok_or_else(|| anyhow!("Update welcome flag error"))?;
            if !changed {
                return Ok(Some(("Nothing changed".into(), false)));
            }
            welcome_menu(arg, group_id).await?
        }
        Action::SetWelcome => {
            arg.sessions()
                .start(
                    user_id,
                    Session::Input {
                        group_id,
                        kind: InputKind::Welcome,
                    },
                    current_second(),
                )
                .await;
            return prompt(bot, chat_id, group_id, &InputKind::Welcome.prompt()).await;
        }
        Action::AntiSpam | Action::ToggleAntiSpam => {
            toggle_menu(arg, group_id, ConfigFlag::AntiSpam, action == Action::ToggleAntiSpam)
                .await?
        }
        Action::AutoDelete | Action::ToggleAutoDelete => {
            toggle_menu(
                arg,
                group_id,
                ConfigFlag::AutoDelete,
                action == Action::ToggleAutoDelete,
            )
            .await?
        }
        Action::Banned => banned_menu(arg, group_id).await?,
        Action::AddBanned => {
            arg.sessions()
                .start(
                    user_id,
                    Session::Input {
                        group_id,
                        kind: InputKind::BannedWord,
                    },
                    current_second(),
                )
                .await;
            return prompt(bot, chat_id, group_id, &InputKind::BannedWord.prompt()).await;
        }
        Action::DelBanned(id) => {
            let deleted = database
                .banned_word_delete(group_id, id)
                .await
                .ok_or_else(|| anyhow!("Delete banned word error"))?;
            if !deleted {
                return Ok(Some(("Banned word not found".into(), true)));
            }
            banned_menu(arg, group_id).await?
        }
        Action::ClearBanned => {
            database
                .banned_word_clear(group_id)
                .await
                .ok_or_else(|| anyhow!("Clear banned words error"))?;
            banned_menu(arg, group_id).await?
        }
        Action::Language | Action::SetLanguage(_) => {
            let language = if let Action::SetLanguage(language) = action {
                database
                    .config_language(group_id, language)
                    .await
                    .ok_or_else(|| anyhow!("Update group language error"))?;
                language
            } else {
                group_language(database, group_id).await?
            };
            menu::language_menu(group_id, language)
        }
        Action::Stats => {
            let config = database
                .config_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query group config error"))?;
            let stats = database
                .stats_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query statistics error"))?;
            let joined = database
                .group_query(group_id)
                .await
                .ok_or_else(|| anyhow!("Query group error"))?
                .map(|group| group.join_date());
            (
                menu::stats_text(config.group_name(), joined, &stats, tz),
                menu::back_keyboard(group_id, Action::Back),
            )
        }
        Action::Cancel => {
            arg.sessions().cancel(user_id).await;
            (
                "Cancelled\\.".into(),
                menu::back_keyboard(group_id, Action::Back),
            )
        }
    };

    edit_menu(bot, chat_id, message_id, menu).await?;
    Ok(None)
}

async fn prompt(
    bot: &BotType,
    chat_id: ChatId,
    group_id: i64,
    text: &str,
) -> anyhow::Result<Option<(String, bool)>> {
    bot.send_message(chat_id, replace_all(text))
        .reply_markup(menu::cancel_keyboard(group_id))
        .await?;
    Ok(None)
}

fn closed_answer(lottery: &Lottery) -> &'static str {
    if lottery.cancelled() {
        "Lottery already cancelled"
    } else {
        "Lottery already drawn"
    }
}

async fn draw_lottery(arg: &NecessaryArg, id: i64) -> anyhow::Result<&'static str> {
    let Some(result) = arg
        .database()
        .lottery_draw(id)
        .await
        .ok_or_else(|| anyhow!("Draw lottery error"))?
    else {
        return Ok("Lottery already closed");
    };
    info!(
        "Lottery {id} drawn manually, {} winner(s)",
        result.winners.len()
    );
    let group_id = result.lottery.group_id();
    let language = group_language(arg.database(), group_id).await?;
    arg.front()
        .send_message(ChatId(group_id), announce_text(&result, language))
        .await?;
    Ok("Lottery drawn")
}

async fn group_language(database: &DatabaseHelper, group_id: i64) -> anyhow::Result<Language> {
    Ok(database
        .config_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query group config error"))?
        .language())
}

/// Insert a confirmed draft, `None` when its end time has passed meanwhile.
async fn commit_lottery(
    database: &DatabaseHelper,
    draft: LotteryDraft,
    now: i64,
) -> anyhow::Result<Option<Lottery>> {
    if draft.end_time <= now {
        return Ok(None);
    }
    let id = database
        .lottery_insert(draft)
        .await
        .ok_or_else(|| anyhow!("Insert lottery error"))?;
    database
        .lottery_query(id)
        .await
        .flatten()
        .ok_or_else(|| anyhow!("Lottery {id} missing after insert"))
        .map(Some)
}

async fn commit_points(
    database: &DatabaseHelper,
    operation: &PointsOperation,
    admin_id: i64,
) -> anyhow::Result<String> {
    let group_id = operation.group_id;
    let succeed = match operation.action {
        PointsAction::Add => {
            database
                .points_add(
                    group_id,
                    operation.user_id,
                    operation.amount,
                    operation.reason.clone(),
                    Some(admin_id),
                )
                .await
        }
        PointsAction::Deduct => {
            database
                .points_deduct(
                    group_id,
                    operation.user_id,
                    operation.amount,
                    operation.reason.clone(),
                    Some(admin_id),
                )
                .await
        }
    }
    .ok_or_else(|| anyhow!("{} points error", operation.action.name()))?;
    info!(
        "{} {} points of {} in {group_id} by {admin_id}: {succeed}",
        operation.action.name(),
        operation.amount,
        operation.user_id
    );
    if !succeed {
        return Ok("Insufficient balance, nothing changed\\.".to_string());
    }
    let balance = database
        .points_query(group_id, operation.user_id)
        .await
        .ok_or_else(|| anyhow!("Query points error"))?;
    Ok(format!(
        "Done, user {} now has {} points\\.",
        operation.user_id,
        replace_all(&balance.to_string())
    ))
}

async fn points_menu(arg: &NecessaryArg, group_id: i64) -> anyhow::Result<Menu> {
    let config = arg
        .database()
        .config_query_points(group_id)
        .await
        .ok_or_else(|| anyhow!("Query points config error"))?;
    Ok(menu::points_menu(group_id, &config))
}

async fn welcome_menu(arg: &NecessaryArg, group_id: i64) -> anyhow::Result<Menu> {
    let config = arg
        .database()
        .config_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query group config error"))?;
    Ok(menu::welcome_menu(group_id, &config))
}

async fn toggle_menu(
    arg: &NecessaryArg,
    group_id: i64,
    flag: ConfigFlag,
    toggle: bool,
) -> anyhow::Result<Menu> {
    let config = arg
        .database()
        .config_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query group config error"))?;
    let mut enabled = config.flag(flag).unwrap_or_default();
    if toggle {
        enabled = !enabled;
        arg.database()
            .config_flag_set(group_id, flag, enabled)
            .await
            .ok_or_else(|| anyhow!("Update {} error", flag.name()))?;
        info!("{} of {group_id} set to {enabled}", flag.name());
    }
    Ok(menu::toggle_menu(group_id, flag, enabled))
}

async fn banned_menu(arg: &NecessaryArg, group_id: i64) -> anyhow::Result<Menu> {
    let words = arg
        .database()
        .banned_word_query(group_id)
        .await
        .ok_or_else(|| anyhow!("Query banned words error"))?;
    Ok(menu::banned_menu(group_id, &words))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{database::DatabaseHandle, types::PointsField};

    const GROUP: i64 = -1001234567890;

    fn draft(end_time: i64) -> LotteryDraft {
        LotteryDraft {
            group_id: GROUP,
            title: "Prize".into(),
            description: None,
            prize_count: 1,
            end_time,
            created_by: 7,
        }
    }

    fn operation(action: PointsAction, amount: i64) -> PointsOperation {
        PointsOperation {
            group_id: GROUP,
            action,
            user_id: 42,
            amount,
            reason: None,
        }
    }

    #[tokio::test]
    async fn apply_input_writes_through() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();

        let (text, back) = apply_input(&helper, GROUP, InputValue::Welcome("Hi all".into()))
            .await
            .unwrap();
        assert_eq!(text, "Welcome message updated\\.");
        assert_eq!(back, Action::Welcome);
        assert_eq!(
            helper.config_query(GROUP).await.unwrap().welcome_msg(),
            "Hi all"
        );

        let value = InputValue::Field(PointsField::Checkin, FieldValue::Number(15));
        apply_input(&helper, GROUP, value).await.unwrap();
        assert_eq!(
            helper
                .config_query_points(GROUP)
                .await
                .unwrap()
                .field(PointsField::Checkin),
            "15"
        );

        let word = || InputValue::BannedWord("spam".into());
        let (text, _) = apply_input(&helper, GROUP, word()).await.unwrap();
        assert!(text.contains("added"));
        let (text, _) = apply_input(&helper, GROUP, word()).await.unwrap();
        assert!(text.contains("already exists"));

        helper.terminate().await;
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn commit_points_tells_balance_apart_from_failure() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();

        let text = commit_points(&helper, &operation(PointsAction::Deduct, 5), 7)
            .await
            .unwrap();
        assert_eq!(text, "Insufficient balance, nothing changed\\.");

        let text = commit_points(&helper, &operation(PointsAction::Add, 20), 7)
            .await
            .unwrap();
        assert_eq!(text, "Done, user 42 now has 20 points\\.");

        let history = helper.points_history_query(GROUP, LIST_LIMIT).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(menu::history_text(&history, chrono_tz::UTC).contains("by admin 7"));

        helper.terminate().await;
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn commit_lottery_rejects_passed_end_time() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        let now = current_second();

        assert!(commit_lottery(&helper, draft(now), now).await.unwrap().is_none());
        assert!(commit_lottery(&helper, draft(now - 60), now).await.unwrap().is_none());
        assert!(helper.lottery_query_open(GROUP).await.unwrap().is_empty());

        let lottery = commit_lottery(&helper, draft(now + 60), now)
            .await
            .unwrap()
            .unwrap();
        assert!(lottery.open() && !lottery.cancelled());
        assert_eq!(lottery.created_by(), 7);
        assert_eq!(helper.lottery_query_open(GROUP).await.unwrap().len(), 1);

        helper.terminate().await;
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn stopped_database_is_an_error() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        helper.terminate().await;
        handle.wait().await.unwrap();

        assert!(
            apply_input(&helper, GROUP, InputValue::Welcome("Hi".into()))
                .await
                .is_err()
        );
        let value = InputValue::Field(PointsField::Invite, FieldValue::Number(5));
        assert!(apply_input(&helper, GROUP, value).await.is_err());
        assert!(
            commit_points(&helper, &operation(PointsAction::Add, 1), 7)
                .await
                .is_err()
        );
        assert!(
            commit_points(&helper, &operation(PointsAction::Deduct, 1), 7)
                .await
                .is_err()
        );
        let now = current_second();
        assert!(commit_lottery(&helper, draft(now + 60), now).await.is_err());
        assert!(group_language(&helper, GROUP).await.is_err());
    }

    #[tokio::test]
    async fn closed_lottery_answer() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        let now = current_second();
        let cancelled = helper.lottery_insert(draft(now + 60)).await.unwrap();
        let drawn = helper.lottery_insert(draft(now + 60)).await.unwrap();
        assert_eq!(helper.lottery_cancel(cancelled).await, Some(true));
        assert!(helper.lottery_draw(drawn).await.unwrap().is_some());

        let lottery = helper.lottery_query(cancelled).await.flatten().unwrap();
        assert_eq!(closed_answer(&lottery), "Lottery already cancelled");
        let lottery = helper.lottery_query(drawn).await.flatten().unwrap();
        assert_eq!(closed_answer(&lottery), "Lottery already drawn");

        helper.terminate().await;
        handle.wait().await.unwrap();
    }
}
