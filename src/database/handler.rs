use log::error;

use super::{
    DBResult,
    context::Database,
    event::{DatabaseEvent, DatabaseEventReceiver, DatabaseHelper},
};
use crate::types::current_second;

pub struct DatabaseHandle {
    handle: tokio::task::JoinHandle<DBResult<()>>,
}

impl DatabaseHandle {
    pub async fn connect(file: &str) -> anyhow::Result<(Self, DatabaseHelper)> {
        let mut database = Database::connect(file).await?;
        database.init().await?;
        Ok(Self::spawn(database))
    }

    fn spawn(database: Database) -> (Self, DatabaseHelper) {
        let (sender, receiver) = DatabaseHelper::new(16);
        (
            Self {
                handle: tokio::spawn(Self::run(database, receiver)),
            },
            sender,
        )
    }

    #[cfg(test)]
    pub async fn connect_memory() -> anyhow::Result<(Self, DatabaseHelper)> {
        let mut database = Database::connect_memory().await?;
        database.init().await?;
        Ok(Self::spawn(database))
    }

    async fn handle_event(database: &mut Database, event: DatabaseEvent) -> DBResult<()> {
        let now = current_second();
        match event {
            DatabaseEvent::GroupSave { group_id, name } => {
                database.save_group(group_id, &name, now).await?;
                database.ensure_group_config(group_id, now).await?;
            }
            DatabaseEvent::GroupInactive { group_id } => {
                database.mark_group_inactive(group_id).await?;
            }
            DatabaseEvent::GroupQueryActive(sender) => {
                sender.send(database.query_active_groups().await?).ok();
            }
            DatabaseEvent::GroupQuery {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_group(group_id).await?)
                    .ok();
            }
            DatabaseEvent::ConfigQuery {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.ensure_group_config(group_id, now).await?)
                    .ok();
            }
            DatabaseEvent::ConfigQueryPoints {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.ensure_points_config(group_id, now).await?)
                    .ok();
            }
            DatabaseEvent::ConfigGroupName { group_id, name } => {
                database.set_group_name(group_id, &name, now).await?;
            }
            DatabaseEvent::ConfigWelcome {
                group_id,
                message,
                __private_sender,
            } => {
                database.set_welcome_message(group_id, &message, now).await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::ConfigLanguage {
                group_id,
                language,
                __private_sender,
            } => {
                database.set_language(group_id, language, now).await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::ConfigFlagSet {
                group_id,
                flag,
                value,
                __private_sender,
            } => {
                __private_sender
                    .send(database.set_flag(group_id, flag, value, now).await?)
                    .ok();
            }
            DatabaseEvent::ConfigPointsField {
                group_id,
                field,
                value,
                __private_sender,
            } => {
                database
                    .set_points_field(group_id, field, &value, now)
                    .await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::ConfigImport(group_id, legacy, sender) => {
                database.import_group_config(group_id, &legacy, now).await?;
                sender.send(true).ok();
            }
            DatabaseEvent::PointsQuery {
                group_id,
                user_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_points(group_id, user_id).await?)
                    .ok();
            }
            DatabaseEvent::PointsAdd {
                group_id,
                user_id,
                delta,
                reason,
                admin_id,
                __private_sender,
            } => {
                database
                    .add_points(group_id, user_id, delta, reason.as_deref(), admin_id, now)
                    .await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::PointsDeduct {
                group_id,
                user_id,
                amount,
                reason,
                admin_id,
                __private_sender,
            } => {
                __private_sender
                    .send(
                        database
                            .deduct_points(
                                group_id,
                                user_id,
                                amount,
                                reason.as_deref(),
                                admin_id,
                                now,
                            )
                            .await?,
                    )
                    .ok();
            }
            DatabaseEvent::PointsRanking {
                group_id,
                limit,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_ranking(group_id, limit).await?)
                    .ok();
            }
            DatabaseEvent::PointsHistoryQuery {
                group_id,
                limit,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_history(group_id, limit).await?)
                    .ok();
            }
            DatabaseEvent::PointsClear {
                group_id,
                __private_sender,
            } => {
                database.clear_points(group_id, now).await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::PointsCheckin {
                group_id,
                user_id,
                date,
                __private_sender,
            } => {
                __private_sender
                    .send(database.checkin(group_id, user_id, &date, now).await?)
                    .ok();
            }
            DatabaseEvent::PointsMessage {
                group_id,
                user_id,
                date,
                __private_sender,
            } => {
                __private_sender
                    .send(
                        database
                            .message_points(group_id, user_id, &date, now)
                            .await?,
                    )
                    .ok();
            }
            DatabaseEvent::PointsInvite {
                group_id,
                inviter,
                invitee,
                date,
                __private_sender,
            } => {
                __private_sender
                    .send(
                        database
                            .invite_points(group_id, inviter, invitee, &date, now)
                            .await?,
                    )
                    .ok();
            }
            DatabaseEvent::LotteryInsert(draft, sender) => {
                sender.send(database.insert_lottery(&draft, now).await?).ok();
            }
            DatabaseEvent::LotteryQuery {
                id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_lottery(id).await?)
                    .ok();
            }
            DatabaseEvent::LotteryQueryOpen {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_open_lotteries(group_id).await?)
                    .ok();
            }
            DatabaseEvent::LotteryQueryExpired(sender) => {
                sender
                    .send(database.query_expired_lotteries(now).await?)
                    .ok();
            }
            DatabaseEvent::LotteryJoin {
                id,
                user_id,
                name,
                __private_sender,
            } => {
                __private_sender
                    .send(database.join_lottery(id, user_id, &name, now).await?)
                    .ok();
            }
            DatabaseEvent::LotteryCancel {
                id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.cancel_lottery(id).await?)
                    .ok();
            }
            DatabaseEvent::LotteryDraw {
                id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.draw_lottery(id).await?)
                    .ok();
            }
            DatabaseEvent::BannedWordAdd {
                group_id,
                word,
                __private_sender,
            } => {
                __private_sender
                    .send(database.insert_banned_word(group_id, &word).await?)
                    .ok();
            }
            DatabaseEvent::BannedWordDelete {
                group_id,
                id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.delete_banned_word(group_id, id).await?)
                    .ok();
            }
            DatabaseEvent::BannedWordClear {
                group_id,
                __private_sender,
            } => {
                database.clear_banned_words(group_id).await?;
                __private_sender.send(true).ok();
            }
            DatabaseEvent::BannedWordQuery {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_banned_words(group_id).await?)
                    .ok();
            }
            DatabaseEvent::StatsQuery {
                group_id,
                __private_sender,
            } => {
                __private_sender
                    .send(database.query_group_stats(group_id).await?)
                    .ok();
            }
            DatabaseEvent::Terminate => {
                unreachable!()
            }
        }
        Ok(())
    }

    async fn run(mut database: Database, mut receiver: DatabaseEventReceiver) -> DBResult<()> {
        while let Some(event) = receiver.recv().await {
            if let DatabaseEvent::Terminate = event {
                break;
            }
            Self::handle_event(&mut database, event)
                .await
                .inspect_err(|e| error!("Sqlite error: {e:?}"))
                .ok();
        }
        database.close().await?;
        Ok(())
    }

    pub async fn wait(self) -> anyhow::Result<()> {
        Ok(self.handle.await??)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{FieldValue, JoinResult, Language, LotteryDraft, PointsField};

    #[tokio::test]
    async fn concurrent_deductions_never_overdraw() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        assert_eq!(
            helper.points_add(-1, 10, 5, None, None).await,
            Some(true)
        );

        let mut works = Vec::new();
        for _ in 0..4 {
            let helper = helper.clone();
            works.push(tokio::spawn(async move {
                helper
                    .points_deduct(-1, 10, 2, Some("race".into()), Some(1))
                    .await
            }));
        }
        let mut succeed = 0;
        for work in works {
            if work.await.unwrap() == Some(true) {
                succeed += 1;
            }
        }
        assert_eq!(succeed, 2);
        assert_eq!(helper.points_query(-1, 10).await, Some(1));

        helper.terminate().await;
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn writes_are_acknowledged() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        assert_eq!(helper.config_welcome(-1, "Hi".into()).await, Some(true));
        assert_eq!(helper.config_language(-1, Language::Zh).await, Some(true));
        assert_eq!(
            helper
                .config_points_field(-1, PointsField::Alias, FieldValue::Text("coins".into()))
                .await,
            Some(true)
        );
        assert_eq!(helper.points_clear(-1).await, Some(true));
        assert_eq!(helper.banned_word_clear(-1).await, Some(true));
        let config = helper.config_query(-1).await.unwrap();
        assert_eq!(config.language(), Language::Zh);

        helper.terminate().await;
        handle.wait().await.unwrap();
        assert_eq!(helper.config_welcome(-1, "Bye".into()).await, None);
    }

    #[tokio::test]
    async fn lottery_through_helper() {
        let (handle, helper) = DatabaseHandle::connect_memory().await.unwrap();
        let draft = LotteryDraft {
            group_id: -1,
            title: "Prize".into(),
            description: Some("desc".into()),
            prize_count: 1,
            end_time: current_second() + 3600,
            created_by: 1,
        };
        let id = helper.lottery_insert(draft).await.unwrap();
        assert_eq!(
            helper.lottery_join(id, 2, "Alice".into()).await,
            Some(JoinResult::Joined)
        );
        assert_eq!(helper.lottery_query_open(-1).await.map(|v| v.len()), Some(1));
        assert!(helper.lottery_query_expired().await.unwrap().is_empty());
        let result = helper.lottery_draw(id).await.unwrap().unwrap();
        assert_eq!(result.winners[0].name(), "Alice");

        helper.terminate().await;
        handle.wait().await.unwrap();
    }
}
