use std::time::Duration;

use anyhow::anyhow;
use kstool_helper_generator::Helper;
use log::{error, info, warn};
use tap::TapOptional as _;
use teloxide::{prelude::Requester as _, types::ChatId};
use tokio::{task::JoinHandle, time::interval};

use super::announce_text;
use crate::{CHECK_PERIOD, bot::BotType, database::DatabaseHelper};

#[derive(Clone, Debug, Helper)]
pub enum MonitorEvent {
    Check,
    Exit,
}

pub struct Monitor {
    handle: JoinHandle<anyhow::Result<()>>,
}

impl Monitor {
    pub fn create(database: DatabaseHelper, bot: BotType) -> (Self, MonitorHelper) {
        let (s, r) = MonitorHelper::new(4);
        (
            Self {
                handle: tokio::spawn(Self::run(database, r, bot)),
            },
            s,
        )
    }

    async fn run(
        database: DatabaseHelper,
        mut helper: MonitorEventReceiver,
        bot: BotType,
    ) -> anyhow::Result<()> {
        let period = CHECK_PERIOD.get().copied().unwrap_or(30);
        let mut check_timer = interval(Duration::from_secs(period));

        loop {
            tokio::select! {
                Some(event) = helper.recv() => {
                    match event {
                        MonitorEvent::Check => {
                            check_timer.reset_immediately();
                            continue;
                        }
                        MonitorEvent::Exit => break,
                    }
                }

                _ = check_timer.tick() => {
                    Self::draw_expired(&database, &bot).await
                        .inspect_err(|e| error!("Draw lottery error: {e:?}"))
                        .ok();
                }
            }
        }
        Ok(())
    }

    async fn draw_expired(database: &DatabaseHelper, bot: &BotType) -> anyhow::Result<()> {
        let lotteries = database
            .lottery_query_expired()
            .await
            .ok_or_else(|| anyhow!("Query expired lottery error"))?;

        for lottery in lotteries {
            let Some(result) = database
                .lottery_draw(lottery.id())
                .await
                .flatten()
                .tap_none(|| warn!("Lottery {} already drawn, skip", lottery.id()))
            else {
                continue;
            };
            info!(
                "Lottery {} in {} drawn, {} winner(s) of {} participant(s)",
                lottery.id(),
                lottery.group_id(),
                result.winners.len(),
                result.participants
            );
            let language = database
                .config_query(lottery.group_id())
                .await
                .map(|config| config.language())
                .unwrap_or_default();
            bot.send_message(
                ChatId(lottery.group_id()),
                announce_text(&result, language),
            )
            .await
            .inspect_err(|e| {
                error!(
                    "Announce lottery {} to {} error: {e:?}",
                    lottery.id(),
                    lottery.group_id()
                )
            })
            .ok();
        }
        Ok(())
    }

    pub async fn join(self) -> anyhow::Result<()> {
        self.handle.await?
    }
}
