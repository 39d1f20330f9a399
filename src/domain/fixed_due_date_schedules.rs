use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ScheduleId;

/// スケジュールの不正
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// 開始日時が終了日時より後
    #[error("schedule starting {from} ends before it starts ({to})")]
    EndsBeforeStart {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// 固定返却期限の1区間
///
/// 不変条件：from ≤ to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct FixedDueDateSchedule {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    due: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawSchedule {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    due: DateTime<Utc>,
}

impl TryFrom<RawSchedule> for FixedDueDateSchedule {
    type Error = ScheduleError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        FixedDueDateSchedule::new(raw.from, raw.to, raw.due)
    }
}

impl FixedDueDateSchedule {
    pub fn new(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        due: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        if from > to {
            return Err(ScheduleError::EndsBeforeStart { from, to });
        }
        Ok(Self { from, to, due })
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn due(&self) -> DateTime<Utc> {
        self.due
    }

    /// 区間に含まれるか（両端を含む）
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }
}

/// 固定返却期限スケジュールの集合
///
/// `from`の昇順に保持する。区間は網羅的である必要はなく（隙間は「該当なし」）、
/// 互いに重ならないことを前提とする（再検証はしない）。
///
/// 「未設定」（`none()`）と「設定済みで区間が0件」（`new(vec![])`）は別の状態。
/// どちらも日時を含む区間は無いが、期限の上限として使うかどうかの判断が異なる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSchedules")]
pub struct FixedDueDateSchedules {
    id: Option<ScheduleId>,
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedules: Option<Vec<FixedDueDateSchedule>>,
}

#[derive(Deserialize)]
struct RawSchedules {
    #[serde(default)]
    id: Option<ScheduleId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    schedules: Vec<FixedDueDateSchedule>,
}

impl From<RawSchedules> for FixedDueDateSchedules {
    fn from(raw: RawSchedules) -> Self {
        let mut schedules = FixedDueDateSchedules::new(raw.schedules);
        schedules.id = raw.id;
        schedules.name = raw.name;
        schedules
    }
}

impl FixedDueDateSchedules {
    /// スケジュール未設定
    pub fn none() -> Self {
        Self::default()
    }

    /// 設定済みのスケジュール（区間が0件でもよい）
    pub fn new(mut schedules: Vec<FixedDueDateSchedule>) -> Self {
        schedules.sort_by_key(|schedule| schedule.from);
        Self {
            id: None,
            name: None,
            schedules: Some(schedules),
        }
    }

    pub fn with_id(mut self, id: ScheduleId) -> Self {
        self.id = Some(id);
        self.schedules.get_or_insert_with(Vec::new);
        self
    }

    pub fn id(&self) -> Option<ScheduleId> {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn ranges(&self) -> &[FixedDueDateSchedule] {
        self.schedules.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges().is_empty()
    }

    /// `none()`（未設定）か
    ///
    /// 区間が0件でも、`new`で作ったものや取得したものは「設定済み」。
    pub fn is_none(&self) -> bool {
        self.schedules.is_none()
    }

    pub fn len(&self) -> usize {
        self.ranges().len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FixedDueDateSchedule> {
        self.ranges().iter()
    }

    /// 指定日時を含む区間の返却期限を返す
    ///
    /// `from`の昇順に並んでいるため二分探索で候補を1つに絞る。
    pub fn find_due_date_for(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ranges = self.ranges();
        let starts_after = ranges.partition_point(|schedule| schedule.from <= instant);

        starts_after
            .checked_sub(1)
            .map(|index| &ranges[index])
            .filter(|schedule| schedule.contains(instant))
            .map(FixedDueDateSchedule::due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn whole_month(year: i32, month: u32) -> FixedDueDateSchedule {
        let from = at(year, month, 1, 0, 0, 0);
        let next = if month == 12 {
            at(year + 1, 1, 1, 0, 0, 0)
        } else {
            at(year, month + 1, 1, 0, 0, 0)
        };
        let to = next - Duration::seconds(1);
        FixedDueDateSchedule::new(from, to, to).unwrap()
    }

    fn first_quarter_2018() -> FixedDueDateSchedules {
        // 意図的に順不同で渡す
        FixedDueDateSchedules::new(vec![
            whole_month(2018, 3),
            whole_month(2018, 1),
            whole_month(2018, 2),
        ])
    }

    #[test]
    fn test_new_rejects_range_ending_before_start() {
        let result = FixedDueDateSchedule::new(
            at(2018, 2, 1, 0, 0, 0),
            at(2018, 1, 1, 0, 0, 0),
            at(2018, 2, 1, 0, 0, 0),
        );
        assert!(matches!(result, Err(ScheduleError::EndsBeforeStart { .. })));
    }

    #[test]
    fn test_find_due_date_in_each_range() {
        let schedules = first_quarter_2018();
        assert_eq!(
            schedules.find_due_date_for(at(2018, 1, 10, 11, 14, 54)),
            Some(at(2018, 1, 31, 23, 59, 59))
        );
        assert_eq!(
            schedules.find_due_date_for(at(2018, 2, 18, 6, 34, 21)),
            Some(at(2018, 2, 28, 23, 59, 59))
        );
        assert_eq!(
            schedules.find_due_date_for(at(2018, 3, 12, 7, 15, 23)),
            Some(at(2018, 3, 31, 23, 59, 59))
        );
    }

    #[test]
    fn test_find_due_date_on_range_boundaries() {
        let schedules = first_quarter_2018();
        assert_eq!(
            schedules.find_due_date_for(at(2018, 2, 1, 0, 0, 0)),
            Some(at(2018, 2, 28, 23, 59, 59))
        );
        assert_eq!(
            schedules.find_due_date_for(at(2018, 1, 31, 23, 59, 59)),
            Some(at(2018, 1, 31, 23, 59, 59))
        );
    }

    #[test]
    fn test_find_due_date_outside_all_ranges() {
        let schedules = first_quarter_2018();
        assert_eq!(schedules.find_due_date_for(at(2017, 12, 30, 14, 32, 21)), None);
        assert_eq!(schedules.find_due_date_for(at(2018, 4, 1, 6, 34, 21)), None);
    }

    #[test]
    fn test_find_due_date_in_gap_between_ranges() {
        let schedules = FixedDueDateSchedules::new(vec![whole_month(2018, 1), whole_month(2018, 3)]);
        assert_eq!(schedules.find_due_date_for(at(2018, 2, 14, 11, 0, 0)), None);
    }

    #[test]
    fn test_none_is_empty() {
        let schedules = FixedDueDateSchedules::none();
        assert!(schedules.is_empty());
        assert!(schedules.is_none());
        assert_eq!(schedules.find_due_date_for(at(2018, 1, 10, 0, 0, 0)), None);
    }

    #[test]
    fn test_deserialize_representation() {
        let id = ScheduleId::new();
        let schedules: FixedDueDateSchedules = serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Semester",
            "schedules": [
                {
                    "from": "2018-02-01T00:00:00Z",
                    "to": "2018-02-28T23:59:59Z",
                    "due": "2018-03-05T23:59:59Z"
                },
                {
                    "from": "2018-01-01T00:00:00Z",
                    "to": "2018-01-31T23:59:59Z",
                    "due": "2018-02-05T23:59:59Z"
                }
            ]
        }))
        .unwrap();

        assert_eq!(schedules.id(), Some(id));
        assert_eq!(schedules.name(), Some("Semester"));
        assert_eq!(schedules.len(), 2);
        assert_eq!(
            schedules.find_due_date_for(at(2018, 1, 15, 0, 0, 0)),
            Some(at(2018, 2, 5, 23, 59, 59))
        );
    }

    #[test]
    fn test_fetched_schedule_without_ranges_is_not_none() {
        let schedules = FixedDueDateSchedules::none().with_id(ScheduleId::new());
        assert!(schedules.is_empty());
        assert!(!schedules.is_none());
    }

    #[test]
    fn test_configured_schedule_without_ranges_is_not_none() {
        let schedules = FixedDueDateSchedules::new(vec![]);
        assert!(schedules.is_empty());
        assert!(!schedules.is_none());
        assert_ne!(schedules, FixedDueDateSchedules::none());
        assert_eq!(schedules.find_due_date_for(at(2018, 4, 3, 9, 25, 43)), None);
    }

    #[test]
    fn test_deserialized_schedule_without_ranges_is_not_none() {
        let schedules: FixedDueDateSchedules =
            serde_json::from_value(serde_json::json!({ "name": "Empty" })).unwrap();
        assert!(schedules.is_empty());
        assert!(!schedules.is_none());
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let result: Result<FixedDueDateSchedules, _> = serde_json::from_value(serde_json::json!({
            "schedules": [
                {
                    "from": "2018-02-01T00:00:00Z",
                    "to": "2018-01-01T00:00:00Z",
                    "due": "2018-03-05T23:59:59Z"
                }
            ]
        }));
        assert!(result.is_err());
    }
}
