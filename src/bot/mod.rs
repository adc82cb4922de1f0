mod arg;
mod back;
mod callback;
mod front;
mod functions;
mod menu;

use std::sync::LazyLock;

use teloxide::{
    Bot,
    adaptors::DefaultParseMode,
    prelude::RequesterExt as _,
    types::ParseMode,
};

use crate::config::Telegram;

pub type BotType = DefaultParseMode<Bot>;

static TELEGRAM_ESCAPE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"([_*\[\]\(\)~>#\+\-=|\{}\.!\\`])").unwrap());

pub use arg::NecessaryArg;
pub use back::back_run;
pub use front::front_run;
pub use functions::replace_all;

pub fn bot(config: &Telegram) -> anyhow::Result<BotType> {
    let bot = Bot::new(config.api_key());
    Ok(match config.api_server() {
        Some(url) => bot.set_api_url(url.parse()?),
        None => bot,
    }
    .parse_mode(ParseMode::MarkdownV2))
}
