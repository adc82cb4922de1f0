use crate::types::Language;

/// Messages the front bot posts in groups, rendered in the group language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text {
    Intro,
    NeedBotAdmin,
    NotUserAdmin,
    OpenAdminMenu,
    FirstMessageAdmin,
    FirstMessageMember,
    Help,
    About,
    CheckinDone,
    CheckinAlready,
    PointsDisabled,
    MyPoints,
    RankingEmpty,
    SelectLanguage,
    LanguageUpdated,
    OnlyAdmin,
    JoinedLottery,
    AlreadyJoinedLottery,
    LotteryClosed,
    LotteryPrizes,
    LotteryEndsAt,
    LotteryJoinButton,
    LotteryDrawn,
    LotteryNobody,
    LotteryParticipants,
    LotteryWinners,
    NeedAdminButton,
    LanguageButton,
}

impl Text {
    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::Zh => self.zh(),
            _ => self.en(),
        }
    }

    fn zh(&self) -> &'static str {
        match self {
            Self::Intro => {
                "欢迎使用机器人:\n1)请将我设置为管理员，至少赋予以下权限：\n- 删除消息\n- 封禁成员\n2)点击下方按钮打开管理菜单。"
            }
            Self::NeedBotAdmin => {
                "⚠️ 请先将我设置为管理员，否则无法使用管理功能。\n\n需要以下权限：\n- 删除消息\n- 封禁成员\n\n设置完成后，请在群组中发送 /start 命令重新开始。"
            }
            Self::NotUserAdmin => "⚠️ 您不是群组管理员，无法使用管理功能。\n请联系群组管理员进行操作。",
            Self::OpenAdminMenu => "👨‍💻 进入管理菜单 👨‍💻",
            Self::FirstMessageAdmin => "请发送 /start 命令开始使用机器人，或点击下方按钮进入管理菜单。",
            Self::FirstMessageMember => "欢迎使用机器人！请发送 /start 命令开始使用。\n注意：管理功能仅限群组管理员使用。",
            Self::Help => {
                "这是帮助信息：\n/start - 开始使用\n/help - 显示帮助\n/about - 关于我们\n/checkin - 每日签到\n/points - 查询积分\n/ranking - 积分排行"
            }
            Self::About => "这是一个群组管理机器人",
            Self::CheckinDone => "签到成功，获得",
            Self::CheckinAlready => "今天已经签到过了",
            Self::PointsDisabled => "本群未开启积分功能",
            Self::MyPoints => "您当前的",
            Self::RankingEmpty => "暂无排行数据",
            Self::SelectLanguage => "请选择语言 / Please select language / 言語を選択してください",
            Self::LanguageUpdated => "语言已设置为",
            Self::OnlyAdmin => "⚠️ 只有管理员才可以使用此功能！",
            Self::JoinedLottery => "参与成功，祝您好运！",
            Self::AlreadyJoinedLottery => "您已经参与过这个抽奖了",
            Self::LotteryClosed => "该抽奖已结束",
            Self::LotteryPrizes => "奖品数量",
            Self::LotteryEndsAt => "结束时间",
            Self::LotteryJoinButton => "🎉 参与抽奖",
            Self::LotteryDrawn => "抽奖已开奖！",
            Self::LotteryNobody => "抽奖已结束，无人参与。",
            Self::LotteryParticipants => "参与人数",
            Self::LotteryWinners => "中奖名单",
            Self::NeedAdminButton => "⚠️ 请先将我设为管理员 ⚠️",
            Self::LanguageButton => "🌐 语言 / Language 🌐",
        }
    }

    fn en(&self) -> &'static str {
        match self {
            Self::Intro => {
                "Welcome:\n1) Promote me to administrator with at least these permissions:\n- Delete messages\n- Ban users\n2) Press the button below to open the admin menu."
            }
            Self::NeedBotAdmin => {
                "⚠️ Please promote me to administrator first.\n\nRequired permissions:\n- Delete messages\n- Ban users\n\nSend /start in this group again once done."
            }
            Self::NotUserAdmin => "⚠️ You are not an administrator of this group.\nPlease contact a group administrator.",
            Self::OpenAdminMenu => "👨‍💻 Open admin menu 👨‍💻",
            Self::FirstMessageAdmin => "Send /start to use the bot, or press the button below to open the admin menu.",
            Self::FirstMessageMember => "Welcome! Send /start to use the bot.\nAdmin features are limited to group administrators.",
            Self::Help => {
                "Help:\n/start - Get started\n/help - Show this help\n/about - About\n/checkin - Daily check-in\n/points - Show your points\n/ranking - Points ranking"
            }
            Self::About => "A group management bot",
            Self::CheckinDone => "Checked in, earned",
            Self::CheckinAlready => "You have already checked in today",
            Self::PointsDisabled => "Points are not enabled in this group",
            Self::MyPoints => "Your current",
            Self::RankingEmpty => "No ranking data yet",
            Self::SelectLanguage => "Please select language / 请选择语言 / 言語を選択してください",
            Self::LanguageUpdated => "Language set to",
            Self::OnlyAdmin => "⚠️ Only administrators can use this feature!",
            Self::JoinedLottery => "You have joined, good luck!",
            Self::AlreadyJoinedLottery => "You have already joined this lottery",
            Self::LotteryClosed => "This lottery has ended",
            Self::LotteryPrizes => "Prizes",
            Self::LotteryEndsAt => "Ends at",
            Self::LotteryJoinButton => "🎉 Join",
            Self::LotteryDrawn => "The lottery has been drawn!",
            Self::LotteryNobody => "The lottery has ended, nobody joined.",
            Self::LotteryParticipants => "Participants",
            Self::LotteryWinners => "Winners",
            Self::NeedAdminButton => "⚠️ Promote me to administrator first ⚠️",
            Self::LanguageButton => "🌐 Language 🌐",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fallback_to_english() {
        assert_eq!(Text::About.get(Language::Jp), Text::About.get(Language::En));
        assert_eq!(Text::About.get(Language::Kr), Text::About.get(Language::En));
        assert_ne!(Text::About.get(Language::Zh), Text::About.get(Language::En));
    }
}
