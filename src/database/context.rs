use super::{DBResult, versions::prelude::*};
use crate::lottery::choose_winners;
use crate::types::*;
use futures_util::StreamExt as _;
use sqlx::{Connection, SqliteConnection, sqlite::SqliteConnectOptions};

#[derive(Debug)]
pub struct Database {
    conn: sqlx::SqliteConnection,
    init: bool,
}

#[async_trait::async_trait]
pub trait DatabaseCheckExt {
    fn conn_(&mut self) -> &mut sqlx::SqliteConnection;

    async fn check_database_table(&mut self) -> sqlx::Result<bool> {
        Ok(
            sqlx::query(r#"SELECT 1 FROM sqlite_master WHERE type='table' AND "name" = 'meta'"#)
                .fetch_optional(self.conn_())
                .await?
                .is_some(),
        )
    }

    async fn check_database_version(&mut self) -> sqlx::Result<Option<String>> {
        Ok(
            sqlx::query_as::<_, (String,)>(r#"SELECT "value" FROM "meta" WHERE "key" = 'version'"#)
                .fetch_optional(self.conn_())
                .await?
                .map(|(x,)| x),
        )
    }

    async fn insert_database_version(&mut self) -> sqlx::Result<()> {
        sqlx::query(r#"INSERT INTO "meta" VALUES ('version', ?)"#)
            .bind(current::VERSION)
            .execute(self.conn_())
            .await?;
        Ok(())
    }

    async fn create_db(&mut self) -> sqlx::Result<()> {
        let mut executer = sqlx::raw_sql(current::CREATE_STATEMENT).execute_many(self.conn_());
        while let Some(ret) = executer.next().await {
            ret?;
        }
        Ok(())
    }
}

impl Database {
    pub async fn connect(database: &str) -> DBResult<Self> {
        let conn = SqliteConnection::connect_with(
            &SqliteConnectOptions::new()
                .create_if_missing(true)
                .filename(database),
        )
        .await?;
        Ok(Self { conn, init: false })
    }

    #[cfg(test)]
    pub async fn connect_memory() -> DBResult<Self> {
        let conn =
            SqliteConnection::connect_with(&"sqlite::memory:".parse::<SqliteConnectOptions>()?)
                .await?;
        Ok(Self { conn, init: false })
    }

    pub async fn init(&mut self) -> sqlx::Result<bool> {
        self.init = true;
        if !self.check_database_table().await? {
            self.create_db().await?;
            self.insert_database_version().await?;
        }
        loop {
            let Some(version) = self.check_database_version().await? else {
                return Err(sqlx::Error::Protocol("Database version is missing".into()));
            };
            match version.as_str() {
                v1::VERSION => {
                    v2::merge_v1(&mut self.conn).await?;
                }
                current::VERSION => break,
                _ => {
                    return Err(sqlx::Error::Protocol(format!(
                        "Unknown database version: {version}"
                    )));
                }
            }
        }
        Ok(true)
    }

    pub async fn save_group(&mut self, group_id: i64, name: &str, now: i64) -> DBResult<()> {
        sqlx::query(
            r#"INSERT INTO "bot_groups" VALUES (?, ?, ?, 1)
            ON CONFLICT("group_id") DO UPDATE SET "group_name" = excluded."group_name", "active" = 1"#,
        )
        .bind(group_id)
        .bind(name)
        .bind(now)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn mark_group_inactive(&mut self, group_id: i64) -> DBResult<()> {
        sqlx::query(r#"UPDATE "bot_groups" SET "active" = 0 WHERE "group_id" = ?"#)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn query_group(&mut self, group_id: i64) -> DBResult<Option<GroupRecord>> {
        sqlx::query_as(r#"SELECT * FROM "bot_groups" WHERE "group_id" = ?"#)
            .bind(group_id)
            .fetch_optional(&mut self.conn)
            .await
    }

    pub async fn query_active_groups(&mut self) -> DBResult<Vec<GroupRecord>> {
        sqlx::query_as(
            r#"SELECT * FROM "bot_groups" WHERE "active" = 1 ORDER BY "join_date" DESC"#,
        )
        .fetch_all(&mut self.conn)
        .await
    }

    /// Return the group configuration, inserting default rows on first access.
    pub async fn ensure_group_config(&mut self, group_id: i64, now: i64) -> DBResult<GroupConfig> {
        sqlx::query(
            r#"INSERT OR IGNORE INTO "group_config"
            ("group_id", "group_name", "welcome_msg", "language", "updated_at")
            VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(group_id)
        .bind(GroupConfig::default_name(group_id))
        .bind(DEFAULT_WELCOME)
        .bind(Language::default().code())
        .bind(now)
        .execute(&mut self.conn)
        .await?;
        sqlx::query(r#"INSERT OR IGNORE INTO "points_config" ("group_id") VALUES (?)"#)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;

        sqlx::query_as(r#"SELECT * FROM "group_config" WHERE "group_id" = ?"#)
            .bind(group_id)
            .fetch_one(&mut self.conn)
            .await
    }

    pub async fn ensure_points_config(&mut self, group_id: i64, now: i64) -> DBResult<PointsConfig> {
        self.ensure_group_config(group_id, now).await?;
        sqlx::query_as(r#"SELECT * FROM "points_config" WHERE "group_id" = ?"#)
            .bind(group_id)
            .fetch_one(&mut self.conn)
            .await
    }

    async fn query_flag(&mut self, group_id: i64, flag: ConfigFlag) -> DBResult<bool> {
        let (value,) = sqlx::query_as::<_, (bool,)>(&format!(
            r#"SELECT "{}" FROM "{}" WHERE "group_id" = ?"#,
            flag.column(),
            flag.table()
        ))
        .bind(group_id)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(value)
    }

    /// Returns whether the stored value changed.
    pub async fn set_flag(
        &mut self,
        group_id: i64,
        flag: ConfigFlag,
        value: bool,
        now: i64,
    ) -> DBResult<bool> {
        self.ensure_group_config(group_id, now).await?;
        if self.query_flag(group_id, flag).await? == value {
            return Ok(false);
        }
        sqlx::query(&format!(
            r#"UPDATE "{}" SET "{}" = ? WHERE "group_id" = ?"#,
            flag.table(),
            flag.column()
        ))
        .bind(value)
        .bind(group_id)
        .execute(&mut self.conn)
        .await?;
        self.touch_group_config(group_id, now).await?;
        Ok(true)
    }

    async fn touch_group_config(&mut self, group_id: i64, now: i64) -> DBResult<()> {
        sqlx::query(r#"UPDATE "group_config" SET "updated_at" = ? WHERE "group_id" = ?"#)
            .bind(now)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn set_group_name(&mut self, group_id: i64, name: &str, now: i64) -> DBResult<()> {
        self.ensure_group_config(group_id, now).await?;
        sqlx::query(
            r#"UPDATE "group_config" SET "group_name" = ?, "updated_at" = ? WHERE "group_id" = ?"#,
        )
        .bind(name)
        .bind(now)
        .bind(group_id)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn set_welcome_message(
        &mut self,
        group_id: i64,
        message: &str,
        now: i64,
    ) -> DBResult<()> {
        self.ensure_group_config(group_id, now).await?;
        sqlx::query(
            r#"UPDATE "group_config" SET "welcome_msg" = ?, "updated_at" = ? WHERE "group_id" = ?"#,
        )
        .bind(message)
        .bind(now)
        .bind(group_id)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn set_language(&mut self, group_id: i64, language: Language, now: i64) -> DBResult<()> {
        self.ensure_group_config(group_id, now).await?;
        sqlx::query(
            r#"UPDATE "group_config" SET "language" = ?, "updated_at" = ? WHERE "group_id" = ?"#,
        )
        .bind(language.code())
        .bind(now)
        .bind(group_id)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn set_points_field(
        &mut self,
        group_id: i64,
        field: PointsField,
        value: &FieldValue,
        now: i64,
    ) -> DBResult<()> {
        self.ensure_group_config(group_id, now).await?;
        let statement = format!(
            r#"UPDATE "points_config" SET "{}" = ? WHERE "group_id" = ?"#,
            field.column()
        );
        let query = sqlx::query(&statement);
        match value {
            FieldValue::Number(n) => query.bind(*n),
            FieldValue::Text(s) => query.bind(s.as_str()),
        }
        .bind(group_id)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn import_group_config(
        &mut self,
        group_id: i64,
        legacy: &crate::import::LegacyGroupConfig,
        now: i64,
    ) -> DBResult<()> {
        self.ensure_group_config(group_id, now).await?;
        if let Some(name) = legacy.group_name.as_deref() {
            self.set_group_name(group_id, name, now).await?;
        }
        if let Some(welcome) = legacy.welcome_msg.as_deref() {
            self.set_welcome_message(group_id, welcome, now).await?;
        }
        if let Some(language) = legacy.language() {
            self.set_language(group_id, language, now).await?;
        }
        self.set_flag(group_id, ConfigFlag::AntiSpam, legacy.anti_spam, now)
            .await?;
        self.set_flag(group_id, ConfigFlag::AutoDelete, legacy.auto_delete, now)
            .await?;
        Ok(())
    }

    pub async fn query_points(&mut self, group_id: i64, user_id: i64) -> DBResult<i64> {
        Ok(sqlx::query_as::<_, (i64,)>(
            r#"SELECT "points" FROM "user_points" WHERE "group_id" = ? AND "user_id" = ?"#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut self.conn)
        .await?
        .map(|(x,)| x)
        .unwrap_or(0))
    }

    async fn insert_history(
        &mut self,
        group_id: i64,
        user_id: i64,
        delta: i64,
        reason: Option<&str>,
        admin_id: Option<i64>,
        now: i64,
    ) -> DBResult<()> {
        sqlx::query(
            r#"INSERT INTO "points_history"
            ("group_id", "user_id", "delta", "reason", "admin_id", "created_at")
            VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(delta)
        .bind(reason)
        .bind(admin_id)
        .bind(now)
        .execute(&mut self.conn)
        .await?;
        Ok(())
    }

    pub async fn add_points(
        &mut self,
        group_id: i64,
        user_id: i64,
        delta: i64,
        reason: Option<&str>,
        admin_id: Option<i64>,
        now: i64,
    ) -> DBResult<()> {
        sqlx::query(
            r#"INSERT INTO "user_points" VALUES (?, ?, ?)
            ON CONFLICT("group_id", "user_id") DO UPDATE SET "points" = "points" + excluded."points""#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(delta)
        .execute(&mut self.conn)
        .await?;
        self.insert_history(group_id, user_id, delta, reason, admin_id, now)
            .await
    }

    /// Rejects the deduction when the balance is missing or too small.
    pub async fn deduct_points(
        &mut self,
        group_id: i64,
        user_id: i64,
        amount: i64,
        reason: Option<&str>,
        admin_id: Option<i64>,
        now: i64,
    ) -> DBResult<bool> {
        if amount <= 0 {
            return Ok(false);
        }
        let balance = sqlx::query_as::<_, (i64,)>(
            r#"SELECT "points" FROM "user_points" WHERE "group_id" = ? AND "user_id" = ?"#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&mut self.conn)
        .await?;
        if !balance.is_some_and(|(points,)| points >= amount) {
            return Ok(false);
        }
        sqlx::query(
            r#"UPDATE "user_points" SET "points" = "points" - ? WHERE "group_id" = ? AND "user_id" = ?"#,
        )
        .bind(amount)
        .bind(group_id)
        .bind(user_id)
        .execute(&mut self.conn)
        .await?;
        self.insert_history(group_id, user_id, -amount, reason, admin_id, now)
            .await?;
        Ok(true)
    }

    pub async fn query_ranking(&mut self, group_id: i64, limit: i64) -> DBResult<Vec<UserPoints>> {
        sqlx::query_as(
            r#"SELECT "user_id", "points" FROM "user_points"
            WHERE "group_id" = ? ORDER BY "points" DESC, "user_id" LIMIT ?"#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&mut self.conn)
        .await
    }

    pub async fn query_history(
        &mut self,
        group_id: i64,
        limit: i64,
    ) -> DBResult<Vec<PointsHistory>> {
        sqlx::query_as(
            r#"SELECT * FROM "points_history" WHERE "group_id" = ? ORDER BY "id" DESC LIMIT ?"#,
        )
        .bind(group_id)
        .bind(limit)
        .fetch_all(&mut self.conn)
        .await
    }

    pub async fn clear_points(&mut self, group_id: i64, now: i64) -> DBResult<()> {
        sqlx::query(r#"DELETE FROM "user_points" WHERE "group_id" = ?"#)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;
        self.insert_history(group_id, 0, 0, Some("Clear group points"), None, now)
            .await
    }

    /// Returns the points earned, or `None` when the user already checked in on `date`.
    pub async fn checkin(
        &mut self,
        group_id: i64,
        user_id: i64,
        date: &str,
        now: i64,
    ) -> DBResult<Option<i64>> {
        let config = self.ensure_points_config(group_id, now).await?;
        let exists = sqlx::query(
            r#"SELECT 1 FROM "checkin_record" WHERE "group_id" = ? AND "user_id" = ? AND "date" = ?"#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut self.conn)
        .await?
        .is_some();
        if exists {
            return Ok(None);
        }
        let points = config.checkin_points();
        sqlx::query(r#"INSERT INTO "checkin_record" VALUES (?, ?, ?, ?)"#)
            .bind(group_id)
            .bind(user_id)
            .bind(date)
            .bind(points)
            .execute(&mut self.conn)
            .await?;
        self.add_points(group_id, user_id, points, Some("Daily check-in"), None, now)
            .await?;
        Ok(Some(points))
    }

    pub async fn message_points(
        &mut self,
        group_id: i64,
        user_id: i64,
        date: &str,
        now: i64,
    ) -> DBResult<bool> {
        let config = self.ensure_points_config(group_id, now).await?;
        let points = config.message_points();
        let earned = sqlx::query_as::<_, (i64,)>(
            r#"SELECT "points" FROM "message_record" WHERE "group_id" = ? AND "user_id" = ? AND "date" = ?"#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(date)
        .fetch_optional(&mut self.conn)
        .await?;

        match earned {
            Some((earned,)) => {
                if config.daily_message_limit() > 0 && earned >= config.daily_message_limit() {
                    return Ok(false);
                }
                sqlx::query(
                    r#"UPDATE "message_record" SET "points" = "points" + ?, "count" = "count" + 1
                    WHERE "group_id" = ? AND "user_id" = ? AND "date" = ?"#,
                )
                .bind(points)
                .bind(group_id)
                .bind(user_id)
                .bind(date)
                .execute(&mut self.conn)
                .await?;
            }
            None => {
                sqlx::query(r#"INSERT INTO "message_record" VALUES (?, ?, ?, ?, 1)"#)
                    .bind(group_id)
                    .bind(user_id)
                    .bind(date)
                    .bind(points)
                    .execute(&mut self.conn)
                    .await?;
            }
        }
        self.add_points(group_id, user_id, points, Some("Message reward"), None, now)
            .await?;
        Ok(true)
    }

    pub async fn invite_points(
        &mut self,
        group_id: i64,
        inviter: i64,
        invitee: i64,
        date: &str,
        now: i64,
    ) -> DBResult<bool> {
        let config = self.ensure_points_config(group_id, now).await?;
        let recorded = sqlx::query(
            r#"SELECT 1 FROM "invite_record" WHERE "group_id" = ? AND "inviter" = ? AND "invitee" = ?"#,
        )
        .bind(group_id)
        .bind(inviter)
        .bind(invitee)
        .fetch_optional(&mut self.conn)
        .await?
        .is_some();
        if recorded {
            return Ok(false);
        }

        if config.daily_invite_limit() > 0 {
            let (count,) = sqlx::query_as::<_, (i64,)>(
                r#"SELECT COUNT(*) FROM "invite_record" WHERE "group_id" = ? AND "inviter" = ? AND "date" = ?"#,
            )
            .bind(group_id)
            .bind(inviter)
            .bind(date)
            .fetch_one(&mut self.conn)
            .await?;
            if count >= config.daily_invite_limit() {
                return Ok(false);
            }
        }

        let points = config.invite_points();
        sqlx::query(r#"INSERT INTO "invite_record" VALUES (?, ?, ?, ?, ?)"#)
            .bind(group_id)
            .bind(inviter)
            .bind(invitee)
            .bind(date)
            .bind(points)
            .execute(&mut self.conn)
            .await?;
        self.add_points(group_id, inviter, points, Some("Invite reward"), None, now)
            .await?;
        Ok(true)
    }

    pub async fn insert_lottery(&mut self, draft: &LotteryDraft, now: i64) -> DBResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO "lottery"
            ("group_id", "title", "description", "prize_count", "end_time", "created_by", "created_at")
            VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(draft.group_id)
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(draft.prize_count)
        .bind(draft.end_time)
        .bind(draft.created_by)
        .bind(now)
        .execute(&mut self.conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn query_lottery(&mut self, id: i64) -> DBResult<Option<Lottery>> {
        sqlx::query_as(r#"SELECT * FROM "lottery" WHERE "id" = ?"#)
            .bind(id)
            .fetch_optional(&mut self.conn)
            .await
    }

    pub async fn query_open_lotteries(&mut self, group_id: i64) -> DBResult<Vec<Lottery>> {
        sqlx::query_as(
            r#"SELECT * FROM "lottery" WHERE "group_id" = ? AND "open" = 1 ORDER BY "end_time""#,
        )
        .bind(group_id)
        .fetch_all(&mut self.conn)
        .await
    }

    pub async fn query_expired_lotteries(&mut self, now: i64) -> DBResult<Vec<Lottery>> {
        sqlx::query_as(
            r#"SELECT * FROM "lottery" WHERE "open" = 1 AND "end_time" <= ? ORDER BY "end_time""#,
        )
        .bind(now)
        .fetch_all(&mut self.conn)
        .await
    }

    pub async fn query_participants(&mut self, lottery_id: i64) -> DBResult<Vec<Participant>> {
        sqlx::query_as(
            r#"SELECT * FROM "lottery_participant" WHERE "lottery_id" = ? ORDER BY "rowid""#,
        )
        .bind(lottery_id)
        .fetch_all(&mut self.conn)
        .await
    }

    pub async fn join_lottery(
        &mut self,
        lottery_id: i64,
        user_id: i64,
        name: &str,
        now: i64,
    ) -> DBResult<JoinResult> {
        let Some(lottery) = self.query_lottery(lottery_id).await? else {
            return Ok(JoinResult::NotFound);
        };
        if !lottery.open() || lottery.end_time() <= now {
            return Ok(JoinResult::Closed);
        }
        let result = sqlx::query(r#"INSERT OR IGNORE INTO "lottery_participant" VALUES (?, ?, ?, 0)"#)
            .bind(lottery_id)
            .bind(user_id)
            .bind(name)
            .execute(&mut self.conn)
            .await?;
        Ok(if result.rows_affected() == 0 {
            JoinResult::AlreadyJoined
        } else {
            JoinResult::Joined
        })
    }

    pub async fn cancel_lottery(&mut self, lottery_id: i64) -> DBResult<bool> {
        let result = sqlx::query(
            r#"UPDATE "lottery" SET "open" = 0, "cancelled" = 1 WHERE "id" = ? AND "open" = 1"#,
        )
        .bind(lottery_id)
        .execute(&mut self.conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Picks winners and closes the lottery. Closed lotteries are never drawn twice.
    pub async fn draw_lottery(&mut self, lottery_id: i64) -> DBResult<Option<DrawResult>> {
        let Some(lottery) = self.query_lottery(lottery_id).await? else {
            return Ok(None);
        };
        if !lottery.open() {
            return Ok(None);
        }
        let participants = self.query_participants(lottery_id).await?;
        let chosen = choose_winners(
            &participants,
            lottery.prize_count() as usize,
            &mut rand::rng(),
        );

        for user_id in chosen {
            sqlx::query(
                r#"UPDATE "lottery_participant" SET "winner" = 1 WHERE "lottery_id" = ? AND "user_id" = ?"#,
            )
            .bind(lottery_id)
            .bind(user_id)
            .execute(&mut self.conn)
            .await?;
        }
        sqlx::query(r#"UPDATE "lottery" SET "open" = 0 WHERE "id" = ?"#)
            .bind(lottery_id)
            .execute(&mut self.conn)
            .await?;

        let Some(lottery) = self.query_lottery(lottery_id).await? else {
            return Ok(None);
        };
        let winners = sqlx::query_as(
            r#"SELECT * FROM "lottery_participant" WHERE "lottery_id" = ? AND "winner" = 1 ORDER BY "rowid""#,
        )
        .bind(lottery_id)
        .fetch_all(&mut self.conn)
        .await?;
        Ok(Some(DrawResult {
            lottery,
            winners,
            participants: participants.len(),
        }))
    }

    /// Returns `false` when the word already exists for the group.
    pub async fn insert_banned_word(&mut self, group_id: i64, word: &str) -> DBResult<bool> {
        let result =
            sqlx::query(r#"INSERT OR IGNORE INTO "banned_word" ("group_id", "word") VALUES (?, ?)"#)
                .bind(group_id)
                .bind(word)
                .execute(&mut self.conn)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_banned_word(&mut self, group_id: i64, id: i64) -> DBResult<bool> {
        let result = sqlx::query(r#"DELETE FROM "banned_word" WHERE "id" = ? AND "group_id" = ?"#)
            .bind(id)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_banned_words(&mut self, group_id: i64) -> DBResult<()> {
        sqlx::query(r#"DELETE FROM "banned_word" WHERE "group_id" = ?"#)
            .bind(group_id)
            .execute(&mut self.conn)
            .await?;
        Ok(())
    }

    pub async fn query_banned_words(&mut self, group_id: i64) -> DBResult<Vec<BannedWord>> {
        sqlx::query_as(r#"SELECT * FROM "banned_word" WHERE "group_id" = ? ORDER BY "id""#)
            .bind(group_id)
            .fetch_all(&mut self.conn)
            .await
    }

    pub async fn query_group_stats(&mut self, group_id: i64) -> DBResult<GroupStats> {
        let (members_with_points, total_points) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*), COALESCE(SUM("points"), 0) FROM "user_points" WHERE "group_id" = ?"#,
        )
        .bind(group_id)
        .fetch_one(&mut self.conn)
        .await?;
        let (total_lotteries, open_lotteries) = sqlx::query_as::<_, (i64, i64)>(
            r#"SELECT COUNT(*), COALESCE(SUM("open"), 0) FROM "lottery" WHERE "group_id" = ? AND "cancelled" = 0"#,
        )
        .bind(group_id)
        .fetch_one(&mut self.conn)
        .await?;
        let (banned_words,) = sqlx::query_as::<_, (i64,)>(
            r#"SELECT COUNT(*) FROM "banned_word" WHERE "group_id" = ?"#,
        )
        .bind(group_id)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(GroupStats {
            members_with_points,
            total_points,
            open_lotteries,
            total_lotteries,
            banned_words,
        })
    }

    pub async fn close(self) -> DBResult<()> {
        self.conn.close().await
    }
}

impl DatabaseCheckExt for Database {
    fn conn_(&mut self) -> &mut sqlx::SqliteConnection {
        &mut self.conn
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GROUP: i64 = -1001234567890;
    const NOW: i64 = 1_735_689_600;
    const TODAY: &str = "2025-01-01";

    async fn database() -> Database {
        let mut database = Database::connect_memory().await.unwrap();
        database.init().await.unwrap();
        database
    }

    fn draft(prize_count: i64) -> LotteryDraft {
        LotteryDraft {
            group_id: GROUP,
            title: "Weekly".into(),
            description: None,
            prize_count,
            end_time: NOW + 3600,
            created_by: 1,
        }
    }

    #[tokio::test]
    async fn group_config_defaults_are_idempotent() {
        let mut database = database().await;
        let first = database.ensure_group_config(GROUP, NOW).await.unwrap();
        let second = database.ensure_group_config(GROUP, NOW + 10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.welcome_msg(), DEFAULT_WELCOME);
        assert_eq!(first.language(), Language::Zh);
        assert!(!first.anti_spam());
        assert!(!first.auto_delete());
        assert!(first.welcome_enabled());

        let points = database.ensure_points_config(GROUP, NOW).await.unwrap();
        assert_eq!(points, database.ensure_points_config(GROUP, NOW).await.unwrap());
        assert!(!points.enabled());
        assert_eq!(points.checkin_points(), 1);
        assert_eq!(points.points_alias(), "积分");
    }

    #[tokio::test]
    async fn toggle_is_idempotent() {
        let mut database = database().await;
        assert!(
            database
                .set_flag(GROUP, ConfigFlag::AntiSpam, true, NOW)
                .await
                .unwrap()
        );
        let before = database.ensure_group_config(GROUP, NOW).await.unwrap();
        assert!(
            !database
                .set_flag(GROUP, ConfigFlag::AntiSpam, true, NOW + 5)
                .await
                .unwrap()
        );
        let after = database.ensure_group_config(GROUP, NOW).await.unwrap();
        assert_eq!(before, after);
        assert!(after.anti_spam());

        assert!(
            !database
                .set_flag(GROUP, ConfigFlag::Points, false, NOW)
                .await
                .unwrap()
        );
        assert!(
            database
                .set_flag(GROUP, ConfigFlag::Points, true, NOW)
                .await
                .unwrap()
        );
        assert!(database.ensure_points_config(GROUP, NOW).await.unwrap().enabled());
    }

    #[tokio::test]
    async fn config_fields_update() {
        let mut database = database().await;
        database.set_welcome_message(GROUP, "hi", NOW).await.unwrap();
        database.set_language(GROUP, Language::En, NOW).await.unwrap();
        database
            .set_points_field(GROUP, PointsField::Checkin, &FieldValue::Number(7), NOW)
            .await
            .unwrap();
        database
            .set_points_field(GROUP, PointsField::Alias, &FieldValue::Text("coins".into()), NOW)
            .await
            .unwrap();
        let config = database.ensure_group_config(GROUP, NOW).await.unwrap();
        assert_eq!(config.welcome_msg(), "hi");
        assert_eq!(config.language(), Language::En);
        let points = database.ensure_points_config(GROUP, NOW).await.unwrap();
        assert_eq!(points.checkin_points(), 7);
        assert_eq!(points.points_alias(), "coins");
    }

    #[tokio::test]
    async fn deduct_never_goes_negative() {
        let mut database = database().await;
        assert!(
            !database
                .deduct_points(GROUP, 42, 1, None, Some(1), NOW)
                .await
                .unwrap()
        );
        database
            .add_points(GROUP, 42, 10, Some("gift"), Some(1), NOW)
            .await
            .unwrap();
        assert!(
            !database
                .deduct_points(GROUP, 42, 11, None, Some(1), NOW)
                .await
                .unwrap()
        );
        assert_eq!(database.query_points(GROUP, 42).await.unwrap(), 10);
        assert!(
            database
                .deduct_points(GROUP, 42, 10, Some("shop"), Some(1), NOW)
                .await
                .unwrap()
        );
        assert_eq!(database.query_points(GROUP, 42).await.unwrap(), 0);

        let history = database.query_history(GROUP, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].delta(), -10);
        assert_eq!(history[0].reason().map(String::as_str), Some("shop"));
        assert_eq!(history[1].delta(), 10);
    }

    #[tokio::test]
    async fn ranking_and_clear() {
        let mut database = database().await;
        database.add_points(GROUP, 1, 5, None, None, NOW).await.unwrap();
        database.add_points(GROUP, 2, 9, None, None, NOW).await.unwrap();
        database.add_points(GROUP, 1, 1, None, None, NOW).await.unwrap();
        database.add_points(-1, 3, 100, None, None, NOW).await.unwrap();
        let ranking = database.query_ranking(GROUP, 10).await.unwrap();
        assert_eq!(
            ranking.iter().map(|x| (x.user_id(), x.points())).collect::<Vec<_>>(),
            vec![(2, 9), (1, 6)]
        );
        database.clear_points(GROUP, NOW).await.unwrap();
        assert!(database.query_ranking(GROUP, 10).await.unwrap().is_empty());
        assert_eq!(database.query_points(-1, 3).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn checkin_once_per_day() {
        let mut database = database().await;
        assert_eq!(database.checkin(GROUP, 7, TODAY, NOW).await.unwrap(), Some(1));
        assert_eq!(database.checkin(GROUP, 7, TODAY, NOW).await.unwrap(), None);
        assert_eq!(
            database.checkin(GROUP, 7, "2025-01-02", NOW).await.unwrap(),
            Some(1)
        );
        assert_eq!(database.query_points(GROUP, 7).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn message_points_daily_cap() {
        let mut database = database().await;
        database
            .set_points_field(GROUP, PointsField::DailyMessageLimit, &FieldValue::Number(2), NOW)
            .await
            .unwrap();
        assert!(database.message_points(GROUP, 7, TODAY, NOW).await.unwrap());
        assert!(database.message_points(GROUP, 7, TODAY, NOW).await.unwrap());
        assert!(!database.message_points(GROUP, 7, TODAY, NOW).await.unwrap());
        assert!(database.message_points(GROUP, 7, "2025-01-02", NOW).await.unwrap());
        assert_eq!(database.query_points(GROUP, 7).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn invite_points_unique_and_capped() {
        let mut database = database().await;
        database
            .set_points_field(GROUP, PointsField::DailyInviteLimit, &FieldValue::Number(1), NOW)
            .await
            .unwrap();
        assert!(database.invite_points(GROUP, 1, 2, TODAY, NOW).await.unwrap());
        assert!(!database.invite_points(GROUP, 1, 2, "2025-01-02", NOW).await.unwrap());
        assert!(!database.invite_points(GROUP, 1, 3, TODAY, NOW).await.unwrap());
        assert!(database.invite_points(GROUP, 1, 3, "2025-01-02", NOW).await.unwrap());
        assert_eq!(database.query_points(GROUP, 1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lottery_lifecycle() {
        let mut database = database().await;
        let id = database.insert_lottery(&draft(2), NOW).await.unwrap();
        for user in 1..=5 {
            assert_eq!(
                database
                    .join_lottery(id, user, &format!("user{user}"), NOW)
                    .await
                    .unwrap(),
                JoinResult::Joined
            );
        }
        assert_eq!(
            database.join_lottery(id, 1, "user1", NOW).await.unwrap(),
            JoinResult::AlreadyJoined
        );
        assert_eq!(
            database.join_lottery(id + 1, 1, "user1", NOW).await.unwrap(),
            JoinResult::NotFound
        );
        assert_eq!(database.query_open_lotteries(GROUP).await.unwrap().len(), 1);
        assert!(database.query_expired_lotteries(NOW).await.unwrap().is_empty());
        assert_eq!(
            database.query_expired_lotteries(NOW + 3600).await.unwrap().len(),
            1
        );
        assert_eq!(
            database.join_lottery(id, 9, "late", NOW + 3600).await.unwrap(),
            JoinResult::Closed
        );
        assert_eq!(
            database.join_lottery(id, 9, "early", NOW + 3599).await.unwrap(),
            JoinResult::Joined
        );

        let result = database.draw_lottery(id).await.unwrap().unwrap();
        assert_eq!(result.winners.len(), 2);
        assert_eq!(result.participants, 6);
        assert!(!result.lottery.open());
        assert!(database.draw_lottery(id).await.unwrap().is_none());
        assert_eq!(
            database.join_lottery(id, 9, "late", NOW).await.unwrap(),
            JoinResult::Closed
        );
        assert!(!database.cancel_lottery(id).await.unwrap());
    }

    #[tokio::test]
    async fn lottery_cancel_and_small_pool() {
        let mut database = database().await;
        let id = database.insert_lottery(&draft(3), NOW).await.unwrap();
        database.join_lottery(id, 1, "solo", NOW).await.unwrap();
        let other = database.insert_lottery(&draft(3), NOW).await.unwrap();
        assert!(database.cancel_lottery(other).await.unwrap());
        let lottery = database.query_lottery(other).await.unwrap().unwrap();
        assert!(lottery.cancelled() && !lottery.open());

        let result = database.draw_lottery(id).await.unwrap().unwrap();
        assert_eq!(result.winners.len(), 1);
        assert_eq!(result.winners[0].user_id(), 1);

        let stats = database.query_group_stats(GROUP).await.unwrap();
        assert_eq!(stats.total_lotteries, 1);
        assert_eq!(stats.open_lotteries, 0);
    }

    #[tokio::test]
    async fn banned_words() {
        let mut database = database().await;
        assert!(database.insert_banned_word(GROUP, "spam").await.unwrap());
        assert!(!database.insert_banned_word(GROUP, "spam").await.unwrap());
        assert!(database.insert_banned_word(GROUP, "ads").await.unwrap());
        let words = database.query_banned_words(GROUP).await.unwrap();
        assert_eq!(words.len(), 2);
        assert!(!database.delete_banned_word(-1, words[0].id()).await.unwrap());
        assert!(database.delete_banned_word(GROUP, words[0].id()).await.unwrap());
        assert_eq!(database.query_banned_words(GROUP).await.unwrap().len(), 1);
        database.clear_banned_words(GROUP).await.unwrap();
        assert!(database.query_banned_words(GROUP).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn groups_activate_and_deactivate() {
        let mut database = database().await;
        database.save_group(GROUP, "First", NOW).await.unwrap();
        database.save_group(-2, "Second", NOW + 1).await.unwrap();
        database.mark_group_inactive(GROUP).await.unwrap();
        let active = database.query_active_groups().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].group_id(), -2);

        database.save_group(GROUP, "Renamed", NOW + 2).await.unwrap();
        let group = database.query_group(GROUP).await.unwrap().unwrap();
        assert!(group.active());
        assert_eq!(group.group_name(), "Renamed");
        assert_eq!(group.join_date(), NOW);
    }

    #[tokio::test]
    async fn upgrade_from_v1() {
        let mut database = Database::connect_memory().await.unwrap();
        sqlx::raw_sql(v1::CREATE_STATEMENT)
            .execute(&mut database.conn)
            .await
            .unwrap();
        sqlx::raw_sql(
            r#"INSERT INTO "meta" VALUES ('version', '1');
            INSERT INTO "group_config" VALUES (-5, 'Old', 'hello', 'en', 1, 0, 0);"#,
        )
        .execute(&mut database.conn)
        .await
        .unwrap();

        database.init().await.unwrap();
        assert_eq!(
            database.check_database_version().await.unwrap().as_deref(),
            Some(current::VERSION)
        );
        let config = database.ensure_group_config(-5, NOW).await.unwrap();
        assert_eq!(config.welcome_msg(), "hello");
        assert!(config.anti_spam());
        assert!(config.welcome_enabled());
        assert!(!database.ensure_points_config(-5, NOW).await.unwrap().enabled());
    }
}
