use std::fmt::{Display, Formatter};

use crate::types::{Language, PointsField};

/// Menu actions of the back bot, the payload is always suffixed by `_<group_id>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Back,
    Lottery,
    CreateLottery,
    EndLottery,
    DrawLottery(i64),
    CancelLottery(i64),
    ConfirmLottery,
    Points,
    TogglePoints,
    SetPoints(PointsField),
    AddPoints,
    DeductPoints,
    ConfirmPoints,
    Ranking,
    History,
    ClearPoints,
    ClearPointsConfirm,
    Welcome,
    EnableWelcome,
    DisableWelcome,
    SetWelcome,
    AntiSpam,
    ToggleAntiSpam,
    AutoDelete,
    ToggleAutoDelete,
    Banned,
    AddBanned,
    DelBanned(i64),
    ClearBanned,
    Language,
    SetLanguage(Language),
    Stats,
    Cancel,
}

impl Action {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "back" => Self::Back,
            "lottery" => Self::Lottery,
            "create_lottery" => Self::CreateLottery,
            "end_lottery" => Self::EndLottery,
            "confirm_lottery" => Self::ConfirmLottery,
            "points" => Self::Points,
            "toggle_points" => Self::TogglePoints,
            "add_points" => Self::AddPoints,
            "deduct_points" => Self::DeductPoints,
            "confirm_points" => Self::ConfirmPoints,
            "ranking" => Self::Ranking,
            "history" => Self::History,
            "clear_points" => Self::ClearPoints,
            "clear_points_confirm" => Self::ClearPointsConfirm,
            "welcome" => Self::Welcome,
            "enable_welcome" => Self::EnableWelcome,
            "disable_welcome" => Self::DisableWelcome,
            "set_welcome" => Self::SetWelcome,
            "antispam" => Self::AntiSpam,
            "toggle_antispam" => Self::ToggleAntiSpam,
            "autodelete" => Self::AutoDelete,
            "toggle_autodelete" => Self::ToggleAutoDelete,
            "banned" => Self::Banned,
            "add_banned" => Self::AddBanned,
            "clear_banned" => Self::ClearBanned,
            "language" => Self::Language,
            "stats" => Self::Stats,
            "cancel" => Self::Cancel,
            _ => {
                if let Some(id) = s.strip_prefix("draw_lottery_") {
                    Self::DrawLottery(id.parse().ok()?)
                } else if let Some(id) = s.strip_prefix("cancel_lottery_") {
                    Self::CancelLottery(id.parse().ok()?)
                } else if let Some(id) = s.strip_prefix("del_banned_") {
                    Self::DelBanned(id.parse().ok()?)
                } else if let Some(token) = s.strip_prefix("set_points_") {
                    Self::SetPoints(PointsField::from_token(token)?)
                } else if let Some(code) = s.strip_prefix("set_lang_") {
                    Self::SetLanguage(code.parse().ok()?)
                } else {
                    return None;
                }
            }
        })
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Back => write!(f, "back"),
            Self::Lottery => write!(f, "lottery"),
            Self::CreateLottery => write!(f, "create_lottery"),
            Self::EndLottery => write!(f, "end_lottery"),
            Self::DrawLottery(id) => write!(f, "draw_lottery_{id}"),
            Self::CancelLottery(id) => write!(f, "cancel_lottery_{id}"),
            Self::ConfirmLottery => write!(f, "confirm_lottery"),
            Self::Points => write!(f, "points"),
            Self::TogglePoints => write!(f, "toggle_points"),
            Self::SetPoints(field) => write!(f, "set_points_{}", field.token()),
            Self::AddPoints => write!(f, "add_points"),
            Self::DeductPoints => write!(f, "deduct_points"),
            Self::ConfirmPoints => write!(f, "confirm_points"),
            Self::Ranking => write!(f, "ranking"),
            Self::History => write!(f, "history"),
            Self::ClearPoints => write!(f, "clear_points"),
            Self::ClearPointsConfirm => write!(f, "clear_points_confirm"),
            Self::Welcome => write!(f, "welcome"),
            Self::EnableWelcome => write!(f, "enable_welcome"),
            Self::DisableWelcome => write!(f, "disable_welcome"),
            Self::SetWelcome => write!(f, "set_welcome"),
            Self::AntiSpam => write!(f, "antispam"),
            Self::ToggleAntiSpam => write!(f, "toggle_antispam"),
            Self::AutoDelete => write!(f, "autodelete"),
            Self::ToggleAutoDelete => write!(f, "toggle_autodelete"),
            Self::Banned => write!(f, "banned"),
            Self::AddBanned => write!(f, "add_banned"),
            Self::DelBanned(id) => write!(f, "del_banned_{id}"),
            Self::ClearBanned => write!(f, "clear_banned"),
            Self::Language => write!(f, "language"),
            Self::SetLanguage(language) => write!(f, "set_lang_{}", language.code()),
            Self::Stats => write!(f, "stats"),
            Self::Cancel => write!(f, "cancel"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackCallback {
    pub action: Action,
    pub group_id: i64,
}

impl BackCallback {
    pub fn data(action: Action, group_id: i64) -> String {
        format!("{action}_{group_id}")
    }
}

impl TryFrom<&str> for BackCallback {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (action, group_id) = value.rsplit_once('_').ok_or(())?;
        Ok(Self {
            action: Action::parse(action).ok_or(())?,
            group_id: group_id.parse().map_err(|_| ())?,
        })
    }
}

/// Buttons the front bot attaches to its group and private messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrontCallback {
    Language,
    SetLanguage(Language),
    NeedAdmin,
    AddChannel,
    AddGroup,
    GroupTitle,
    BackToMain,
    JoinLottery(i64),
}

impl TryFrom<&str> for FrontCallback {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(match value {
            "language" => Self::Language,
            "need_admin" => Self::NeedAdmin,
            "add_channel" => Self::AddChannel,
            "add_group" => Self::AddGroup,
            "group_title" => Self::GroupTitle,
            "back_to_main" => Self::BackToMain,
            _ => {
                if let Some(code) = value.strip_prefix("set_lang_") {
                    Self::SetLanguage(code.parse().map_err(|_| ())?)
                } else if let Some(id) = value.strip_prefix("join_lottery_") {
                    Self::JoinLottery(id.parse().map_err(|_| ())?)
                } else {
                    return Err(());
                }
            }
        })
    }
}

impl Display for FrontCallback {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Language => write!(f, "language"),
            Self::SetLanguage(language) => write!(f, "set_lang_{}", language.code()),
            Self::NeedAdmin => write!(f, "need_admin"),
            Self::AddChannel => write!(f, "add_channel"),
            Self::AddGroup => write!(f, "add_group"),
            Self::GroupTitle => write!(f, "group_title"),
            Self::BackToMain => write!(f, "back_to_main"),
            Self::JoinLottery(id) => write!(f, "join_lottery_{id}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GROUP: i64 = -1001234567890;

    fn parse(s: &str) -> Option<BackCallback> {
        BackCallback::try_from(s).ok()
    }

    #[test]
    fn parse_back_callback() {
        assert_eq!(
            parse("points_-1001234567890"),
            Some(BackCallback {
                action: Action::Points,
                group_id: GROUP
            })
        );
        assert_eq!(
            parse("set_lang_en_-1001234567890").map(|x| x.action),
            Some(Action::SetLanguage(Language::En))
        );
        assert_eq!(
            parse("clear_points_confirm_-1001234567890").map(|x| x.action),
            Some(Action::ClearPointsConfirm)
        );
        assert_eq!(
            parse("draw_lottery_12_-1001234567890").map(|x| x.action),
            Some(Action::DrawLottery(12))
        );
        assert_eq!(
            parse("set_points_msglimit_-1").map(|x| x.action),
            Some(Action::SetPoints(PointsField::DailyMessageLimit))
        );
    }

    #[test]
    fn reject_malformed_callback() {
        for data in [
            "",
            "points",
            "points_abc",
            "unknown_-100",
            "draw_lottery_x_-100",
            "set_lang_fr_-100",
            "set_points_nothing_-100",
            "_-100",
        ] {
            assert_eq!(parse(data), None, "{data}");
        }
    }

    #[test]
    fn back_callback_data_parses_back() {
        let actions = [
            Action::Back,
            Action::DrawLottery(3),
            Action::CancelLottery(4),
            Action::ClearPointsConfirm,
            Action::DelBanned(9),
            Action::ToggleAutoDelete,
            Action::Cancel,
        ];
        for action in actions
            .into_iter()
            .chain(PointsField::ALL.map(Action::SetPoints))
            .chain(Language::ALL.map(Action::SetLanguage))
        {
            let data = BackCallback::data(action, GROUP);
            assert!(data.len() <= 64, "{data}");
            assert_eq!(parse(&data), Some(BackCallback { action, group_id: GROUP }));
        }
    }

    #[test]
    fn parse_front_callback() {
        assert_eq!(
            FrontCallback::try_from("set_lang_kr"),
            Ok(FrontCallback::SetLanguage(Language::Kr))
        );
        assert_eq!(
            FrontCallback::try_from("join_lottery_5"),
            Ok(FrontCallback::JoinLottery(5))
        );
        assert_eq!(
            FrontCallback::try_from(FrontCallback::BackToMain.to_string().as_str()),
            Ok(FrontCallback::BackToMain)
        );
        assert!(FrontCallback::try_from("join_lottery_").is_err());
        assert!(FrontCallback::try_from("points").is_err());
    }
}
