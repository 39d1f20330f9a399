#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use circulation_engine::domain::{
    FixedDueDateSchedule, FixedDueDateSchedules, ItemId, Loan, LoanPolicy, LoanPolicyId,
    ScheduleId, UserId,
};
use serde_json::{Value, json};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// 1か月全体を範囲とし、月末を返却期限とするスケジュール区間
pub fn whole_month(year: i32, month: u32) -> FixedDueDateSchedule {
    let from = at(year, month, 1, 0, 0, 0);
    let next = if month == 12 {
        at(year + 1, 1, 1, 0, 0, 0)
    } else {
        at(year, month + 1, 1, 0, 0, 0)
    };
    let to = next - Duration::seconds(1);
    FixedDueDateSchedule::new(from, to, to).unwrap()
}

/// 1か月全体を範囲とし、指定日時を返却期限とするスケジュール区間
pub fn month_due_on(year: i32, month: u32, due: DateTime<Utc>) -> FixedDueDateSchedule {
    let month = whole_month(year, month);
    FixedDueDateSchedule::new(month.from(), month.to(), due).unwrap()
}

pub fn schedules(ranges: Vec<FixedDueDateSchedule>) -> FixedDueDateSchedules {
    FixedDueDateSchedules::new(ranges).with_id(ScheduleId::new())
}

/// 期間型ポリシーの表現
pub fn rolling_policy_json(duration: i64, interval: &str) -> Value {
    json!({
        "id": LoanPolicyId::new(),
        "name": "Example Rolling Loan Policy",
        "loanable": true,
        "renewable": true,
        "loansPolicy": {
            "profileId": "Rolling",
            "period": { "duration": duration, "intervalId": interval }
        },
        "renewalsPolicy": {
            "unlimited": false,
            "numberAllowed": 3,
            "renewFromId": "CURRENT_DUE_DATE"
        }
    })
}

/// 固定型ポリシーの表現
pub fn fixed_policy_json(schedule_id: ScheduleId) -> Value {
    json!({
        "id": LoanPolicyId::new(),
        "name": "Example Fixed Loan Policy",
        "loanable": true,
        "renewable": true,
        "loansPolicy": {
            "profileId": "Fixed",
            "fixedDueDateScheduleId": schedule_id
        },
        "renewalsPolicy": {
            "unlimited": false,
            "numberAllowed": 3,
            "renewFromId": "SYSTEM_DATE"
        }
    })
}

pub fn policy(representation: &Value) -> LoanPolicy {
    LoanPolicy::from_representation(representation).unwrap()
}

pub fn loan_at(loan_date: DateTime<Utc>) -> Loan {
    Loan::new(ItemId::new(), UserId::new(), loan_date)
}

pub fn policy_id_of(representation: &Value) -> LoanPolicyId {
    serde_json::from_value(representation["id"].clone()).unwrap()
}
