use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggeringEvent {
    #[serde(rename = "Hold expiration")]
    HoldExpiration,
    #[serde(rename = "Request expiration")]
    RequestExpiration,
    #[serde(rename = "Title level request expiration")]
    TitleLevelRequestExpiration,
    #[serde(rename = "Due date")]
    DueDate,
    #[serde(rename = "Due date with reminder fee")]
    DueDateWithReminderFee,
    #[serde(rename = "Aged to lost")]
    AgedToLost,
    #[serde(rename = "Aged to lost - fine charged")]
    AgedToLostFineCharged,
    #[serde(rename = "Aged to lost & item returned - fine adjusted")]
    AgedToLostReturned,
    #[serde(rename = "Overdue fine returned")]
    OverdueFineReturned,
    #[serde(rename = "Overdue fine renewed")]
    OverdueFineRenewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeFormat {
    Email,
    Print,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeTiming {
    Before,
    #[serde(rename = "Upon At")]
    UponAt,
    After,
}

/// 送信予定の通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotice {
    pub id: Uuid,
    pub recipient_user_id: UserId,
    pub template_id: Uuid,
    pub triggering_event: TriggeringEvent,
    pub format: NoticeFormat,
    pub timing: NoticeTiming,
    #[serde(default)]
    pub session_id: Option<String>,
    pub next_run_time: DateTime<Utc>,
}

/// グループ化の方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupingMode {
    #[default]
    Default,
    /// 返却時の延滞料通知（発生時）だけは貸出セッション単位で分ける
    SessionAware,
}

/// 通知をまとめて送るためのキー
///
/// 同じキーの通知は1通にまとめて送信される。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScheduledNoticeGroupDefinition {
    pub recipient_user_id: UserId,
    pub template_id: Uuid,
    pub triggering_event: TriggeringEvent,
    pub notice_format: NoticeFormat,
    pub notice_timing: NoticeTiming,
    pub session_id: Option<String>,
}

impl ScheduledNoticeGroupDefinition {
    pub fn new(notice: &ScheduledNotice, mode: GroupingMode) -> Self {
        let per_session = mode == GroupingMode::SessionAware
            && notice.triggering_event == TriggeringEvent::OverdueFineReturned
            && notice.timing == NoticeTiming::UponAt;

        Self {
            recipient_user_id: notice.recipient_user_id,
            template_id: notice.template_id,
            triggering_event: notice.triggering_event,
            notice_format: notice.format,
            notice_timing: notice.timing,
            session_id: notice.session_id.clone().filter(|_| per_session),
        }
    }
}

/// 通知をキーごとにまとめる（最初に現れた順）
///
/// `total_records`は条件に一致した通知の総数。取得した件数がそれより少ない場合、
/// 最後のグループは欠けている可能性があるため除外する（グループが1つだけなら残す）。
pub fn group_notices(
    notices: Vec<ScheduledNotice>,
    total_records: usize,
    mode: GroupingMode,
) -> Vec<Vec<ScheduledNotice>> {
    let fetched_all = total_records == notices.len();

    let mut index_of: HashMap<ScheduledNoticeGroupDefinition, usize> = HashMap::new();
    let mut groups: Vec<Vec<ScheduledNotice>> = Vec::new();

    for notice in notices {
        let key = ScheduledNoticeGroupDefinition::new(&notice, mode);
        match index_of.get(&key) {
            Some(&index) => groups[index].push(notice),
            None => {
                index_of.insert(key, groups.len());
                groups.push(vec![notice]);
            }
        }
    }

    if !fetched_all && groups.len() > 1 {
        groups.pop();
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice(
        recipient: UserId,
        template_id: Uuid,
        event: TriggeringEvent,
        timing: NoticeTiming,
        session_id: Option<&str>,
    ) -> ScheduledNotice {
        ScheduledNotice {
            id: Uuid::new_v4(),
            recipient_user_id: recipient,
            template_id,
            triggering_event: event,
            format: NoticeFormat::Email,
            timing,
            session_id: session_id.map(str::to_string),
            next_run_time: Utc.with_ymd_and_hms(2018, 3, 14, 9, 0, 0).unwrap(),
        }
    }

    fn ids(groups: &[Vec<ScheduledNotice>]) -> Vec<Vec<Uuid>> {
        groups
            .iter()
            .map(|group| group.iter().map(|n| n.id).collect())
            .collect()
    }

    #[test]
    fn test_groups_by_key_in_first_seen_order() {
        let (steve, jessica) = (UserId::new(), UserId::new());
        let template = Uuid::new_v4();

        let a = notice(steve, template, TriggeringEvent::DueDate, NoticeTiming::Before, None);
        let b = notice(jessica, template, TriggeringEvent::DueDate, NoticeTiming::Before, None);
        let c = notice(steve, template, TriggeringEvent::DueDate, NoticeTiming::Before, None);
        let expected = vec![vec![a.id, c.id], vec![b.id]];

        let groups = group_notices(vec![a, b, c], 3, GroupingMode::Default);
        assert_eq!(ids(&groups), expected);
    }

    #[test]
    fn test_drops_last_group_when_not_all_fetched() {
        let (steve, jessica) = (UserId::new(), UserId::new());
        let template = Uuid::new_v4();

        let a = notice(steve, template, TriggeringEvent::DueDate, NoticeTiming::After, None);
        let b = notice(jessica, template, TriggeringEvent::DueDate, NoticeTiming::After, None);
        let expected = vec![vec![a.id]];

        let groups = group_notices(vec![a, b], 10, GroupingMode::Default);
        assert_eq!(ids(&groups), expected);
    }

    #[test]
    fn test_keeps_only_group_when_not_all_fetched() {
        let steve = UserId::new();
        let template = Uuid::new_v4();
        let a = notice(steve, template, TriggeringEvent::AgedToLost, NoticeTiming::UponAt, None);
        let b = notice(steve, template, TriggeringEvent::AgedToLost, NoticeTiming::UponAt, None);

        let groups = group_notices(vec![a, b], 50, GroupingMode::Default);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_session_id_only_splits_overdue_fine_returned_upon_at() {
        let steve = UserId::new();
        let template = Uuid::new_v4();

        let returned_one = notice(
            steve,
            template,
            TriggeringEvent::OverdueFineReturned,
            NoticeTiming::UponAt,
            Some("session-1"),
        );
        let returned_two = notice(
            steve,
            template,
            TriggeringEvent::OverdueFineReturned,
            NoticeTiming::UponAt,
            Some("session-2"),
        );
        let renewed_one = notice(
            steve,
            template,
            TriggeringEvent::OverdueFineRenewed,
            NoticeTiming::UponAt,
            Some("session-1"),
        );
        let renewed_two = notice(
            steve,
            template,
            TriggeringEvent::OverdueFineRenewed,
            NoticeTiming::UponAt,
            Some("session-2"),
        );
        let notices = vec![returned_one, returned_two, renewed_one, renewed_two];

        let session_aware = group_notices(notices.clone(), 4, GroupingMode::SessionAware);
        assert_eq!(session_aware.len(), 3);

        let default = group_notices(notices, 4, GroupingMode::Default);
        assert_eq!(default.len(), 2);
    }

    #[test]
    fn test_group_definition_equality() {
        let steve = UserId::new();
        let template = Uuid::new_v4();
        let first = notice(steve, template, TriggeringEvent::DueDate, NoticeTiming::Before, Some("x"));
        let second = notice(steve, template, TriggeringEvent::DueDate, NoticeTiming::Before, Some("y"));

        assert_eq!(
            ScheduledNoticeGroupDefinition::new(&first, GroupingMode::SessionAware),
            ScheduledNoticeGroupDefinition::new(&second, GroupingMode::SessionAware)
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(group_notices(Vec::new(), 0, GroupingMode::Default).is_empty());
    }
}
