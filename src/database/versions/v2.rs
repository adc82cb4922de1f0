use log::info;
use sqlx::SqliteConnection;

pub const VERSION: &str = "2";

pub const CREATE_STATEMENT: &str = r#"
        CREATE TABLE "meta" (
            "key"   TEXT NOT NULL,
            "value" TEXT NOT NULL,
            PRIMARY KEY("key")
        );

        CREATE TABLE "bot_groups" (
            "group_id"   INTEGER NOT NULL,
            "group_name" TEXT NOT NULL,
            "join_date"  INTEGER NOT NULL,
            "active"     INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY("group_id")
        );

        CREATE TABLE "group_config" (
            "group_id"        INTEGER NOT NULL,
            "group_name"      TEXT NOT NULL,
            "welcome_msg"     TEXT NOT NULL,
            "language"        TEXT NOT NULL DEFAULT 'zh',
            "anti_spam"       INTEGER NOT NULL DEFAULT 0,
            "auto_delete"     INTEGER NOT NULL DEFAULT 0,
            "updated_at"      INTEGER NOT NULL DEFAULT 0,
            "welcome_enabled" INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY("group_id")
        );

        CREATE TABLE "points_config" (
            "group_id"            INTEGER NOT NULL,
            "points_enabled"      INTEGER NOT NULL DEFAULT 0,
            "checkin_points"      INTEGER NOT NULL DEFAULT 1,
            "message_points"      INTEGER NOT NULL DEFAULT 1,
            "daily_message_limit" INTEGER NOT NULL DEFAULT 0,
            "min_message_length"  INTEGER NOT NULL DEFAULT 0,
            "invite_points"       INTEGER NOT NULL DEFAULT 1,
            "daily_invite_limit"  INTEGER NOT NULL DEFAULT 0,
            "points_alias"        TEXT NOT NULL DEFAULT '积分',
            "ranking_alias"       TEXT NOT NULL DEFAULT '积分排行',
            PRIMARY KEY("group_id")
        );

        CREATE TABLE "user_points" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id")
        );

        CREATE TABLE "points_history" (
            "id"         INTEGER NOT NULL,
            "group_id"   INTEGER NOT NULL,
            "user_id"    INTEGER NOT NULL,
            "delta"      INTEGER NOT NULL,
            "reason"     TEXT,
            "admin_id"   INTEGER,
            "created_at" INTEGER NOT NULL,
            PRIMARY KEY("id" AUTOINCREMENT)
        );

        CREATE TABLE "checkin_record" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id", "date")
        );

        CREATE TABLE "message_record" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            "count"    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id", "date")
        );

        CREATE TABLE "invite_record" (
            "group_id" INTEGER NOT NULL,
            "inviter"  INTEGER NOT NULL,
            "invitee"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "inviter", "invitee")
        );

        CREATE TABLE "lottery" (
            "id"          INTEGER NOT NULL,
            "group_id"    INTEGER NOT NULL,
            "title"       TEXT NOT NULL,
            "description" TEXT,
            "prize_count" INTEGER NOT NULL,
            "end_time"    INTEGER NOT NULL,
            "created_by"  INTEGER NOT NULL,
            "created_at"  INTEGER NOT NULL,
            "open"        INTEGER NOT NULL DEFAULT 1,
            "cancelled"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("id" AUTOINCREMENT)
        );

        CREATE TABLE "lottery_participant" (
            "lottery_id" INTEGER NOT NULL,
            "user_id"    INTEGER NOT NULL,
            "name"       TEXT NOT NULL,
            "winner"     INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("lottery_id", "user_id")
        );

        CREATE TABLE "banned_word" (
            "id"       INTEGER NOT NULL,
            "group_id" INTEGER NOT NULL,
            "word"     TEXT NOT NULL,
            PRIMARY KEY("id" AUTOINCREMENT),
            UNIQUE("group_id", "word")
        );
    "#;

const MERGE_STATEMENT_STAGE: &str = r#"
        ALTER TABLE "group_config" ADD COLUMN "welcome_enabled" INTEGER NOT NULL DEFAULT 1;

        CREATE TABLE "points_config" (
            "group_id"            INTEGER NOT NULL,
            "points_enabled"      INTEGER NOT NULL DEFAULT 0,
            "checkin_points"      INTEGER NOT NULL DEFAULT 1,
            "message_points"      INTEGER NOT NULL DEFAULT 1,
            "daily_message_limit" INTEGER NOT NULL DEFAULT 0,
            "min_message_length"  INTEGER NOT NULL DEFAULT 0,
            "invite_points"       INTEGER NOT NULL DEFAULT 1,
            "daily_invite_limit"  INTEGER NOT NULL DEFAULT 0,
            "points_alias"        TEXT NOT NULL DEFAULT '积分',
            "ranking_alias"       TEXT NOT NULL DEFAULT '积分排行',
            PRIMARY KEY("group_id")
        );

        CREATE TABLE "user_points" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id")
        );

        CREATE TABLE "points_history" (
            "id"         INTEGER NOT NULL,
            "group_id"   INTEGER NOT NULL,
            "user_id"    INTEGER NOT NULL,
            "delta"      INTEGER NOT NULL,
            "reason"     TEXT,
            "admin_id"   INTEGER,
            "created_at" INTEGER NOT NULL,
            PRIMARY KEY("id" AUTOINCREMENT)
        );

        CREATE TABLE "checkin_record" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id", "date")
        );

        CREATE TABLE "message_record" (
            "group_id" INTEGER NOT NULL,
            "user_id"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            "count"    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "user_id", "date")
        );

        CREATE TABLE "invite_record" (
            "group_id" INTEGER NOT NULL,
            "inviter"  INTEGER NOT NULL,
            "invitee"  INTEGER NOT NULL,
            "date"     TEXT NOT NULL,
            "points"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id", "inviter", "invitee")
        );

        CREATE TABLE "lottery" (
            "id"          INTEGER NOT NULL,
            "group_id"    INTEGER NOT NULL,
            "title"       TEXT NOT NULL,
            "description" TEXT,
            "prize_count" INTEGER NOT NULL,
            "end_time"    INTEGER NOT NULL,
            "created_by"  INTEGER NOT NULL,
            "created_at"  INTEGER NOT NULL,
            "open"        INTEGER NOT NULL DEFAULT 1,
            "cancelled"   INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("id" AUTOINCREMENT)
        );

        CREATE TABLE "lottery_participant" (
            "lottery_id" INTEGER NOT NULL,
            "user_id"    INTEGER NOT NULL,
            "name"       TEXT NOT NULL,
            "winner"     INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("lottery_id", "user_id")
        );

        CREATE TABLE "banned_word" (
            "id"       INTEGER NOT NULL,
            "group_id" INTEGER NOT NULL,
            "word"     TEXT NOT NULL,
            PRIMARY KEY("id" AUTOINCREMENT),
            UNIQUE("group_id", "word")
        );
    "#;

pub async fn merge_v1(conn: &mut SqliteConnection) -> sqlx::Result<()> {
    info!("Performing database prepare stage (v2)");
    sqlx::raw_sql(MERGE_STATEMENT_STAGE)
        .execute(&mut *conn)
        .await?;

    let groups = sqlx::query_as::<_, (i64,)>(r#"SELECT "group_id" FROM "group_config""#)
        .fetch_all(&mut *conn)
        .await?;

    info!("Create points config, total {} groups", groups.len());
    for (group_id,) in groups {
        sqlx::query(r#"INSERT INTO "points_config" ("group_id") VALUES (?)"#)
            .bind(group_id)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::raw_sql(r#"UPDATE "meta" SET "value" = '2' WHERE "key" = 'version';"#)
        .execute(&mut *conn)
        .await?;
    info!("Merge completed");
    Ok(())
}
