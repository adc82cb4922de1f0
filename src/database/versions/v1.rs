pub const VERSION: &str = "1";

/// Layout used before points, lottery and banned words were stored.
#[allow(unused)]
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
            "group_id"    INTEGER NOT NULL,
            "group_name"  TEXT NOT NULL,
            "welcome_msg" TEXT NOT NULL,
            "language"    TEXT NOT NULL DEFAULT 'zh',
            "anti_spam"   INTEGER NOT NULL DEFAULT 0,
            "auto_delete" INTEGER NOT NULL DEFAULT 0,
            "updated_at"  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY("group_id")
        );
    "#;
