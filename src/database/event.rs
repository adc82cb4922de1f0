use crate::import::LegacyGroupConfig;
use crate::types::*;

kstool_helper_generator::oneshot_helper! {
#[derive(Debug)]
pub enum DatabaseEvent {

    GroupSave {
        group_id: i64,
        name: String,
    },
    GroupInactive {
        group_id: i64,
    },
    #[ret(Vec<GroupRecord>)]
    GroupQueryActive,
    #[ret(Option<GroupRecord>)]
    GroupQuery {
        group_id: i64,
    },

    #[ret(GroupConfig)]
    ConfigQuery {
        group_id: i64,
    },
    #[ret(PointsConfig)]
    ConfigQueryPoints {
        group_id: i64,
    },
    ConfigGroupName {
        group_id: i64,
        name: String,
    },
    #[ret(bool)]
    ConfigWelcome {
        group_id: i64,
        message: String,
    },
    #[ret(bool)]
    ConfigLanguage {
        group_id: i64,
        language: Language,
    },
    #[ret(bool)]
    ConfigFlagSet {
        group_id: i64,
        flag: ConfigFlag,
        value: bool,
    },
    #[ret(bool)]
    ConfigPointsField {
        group_id: i64,
        field: PointsField,
        value: FieldValue,
    },
    #[ret(bool)]
    ConfigImport(i64, LegacyGroupConfig),

    #[ret(i64)]
    PointsQuery {
        group_id: i64,
        user_id: i64,
    },
    #[ret(bool)]
    PointsAdd {
        group_id: i64,
        user_id: i64,
        delta: i64,
        reason: Option<String>,
        admin_id: Option<i64>,
    },
    #[ret(bool)]
    PointsDeduct {
        group_id: i64,
        user_id: i64,
        amount: i64,
        reason: Option<String>,
        admin_id: Option<i64>,
    },
    #[ret(Vec<UserPoints>)]
    PointsRanking {
        group_id: i64,
        limit: i64,
    },
    #[ret(Vec<PointsHistory>)]
    PointsHistoryQuery {
        group_id: i64,
        limit: i64,
    },
    #[ret(bool)]
    PointsClear {
        group_id: i64,
    },
    #[ret(Option<i64>)]
    PointsCheckin {
        group_id: i64,
        user_id: i64,
        date: String,
    },
    #[ret(bool)]
    PointsMessage {
        group_id: i64,
        user_id: i64,
        date: String,
    },
    #[ret(bool)]
    PointsInvite {
        group_id: i64,
        inviter: i64,
        invitee: i64,
        date: String,
    },

    #[ret(i64)]
    LotteryInsert(LotteryDraft),
    #[ret(Option<Lottery>)]
    LotteryQuery {
        id: i64,
    },
    #[ret(Vec<Lottery>)]
    LotteryQueryOpen {
        group_id: i64,
    },
    #[ret(Vec<Lottery>)]
    LotteryQueryExpired,
    #[ret(JoinResult)]
    LotteryJoin {
        id: i64,
        user_id: i64,
        name: String,
    },
    #[ret(bool)]
    LotteryCancel {
        id: i64,
    },
    #[ret(Option<DrawResult>)]
    LotteryDraw {
        id: i64,
    },

    #[ret(bool)]
    BannedWordAdd {
        group_id: i64,
        word: String,
    },
    #[ret(bool)]
    BannedWordDelete {
        group_id: i64,
        id: i64,
    },
    #[ret(bool)]
    BannedWordClear {
        group_id: i64,
    },
    #[ret(Vec<BannedWord>)]
    BannedWordQuery {
        group_id: i64,
    },

    #[ret(GroupStats)]
    StatsQuery {
        group_id: i64,
    },

    Terminate,
}
}
