use std::fmt;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MINUTES_PER_HOUR: i64 = 60;
pub const MINUTES_PER_DAY: i64 = MINUTES_PER_HOUR * 24;
pub const MINUTES_PER_WEEK: i64 = MINUTES_PER_DAY * 7;
/// 1か月の概算（31日）。`to_minutes()`のみで使い、日付の加算には使わない
pub const MINUTES_PER_MONTH: i64 = MINUTES_PER_DAY * 31;

/// 期間の単位
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Interval {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    /// 認識できない単位。使用時にエラーとなる
    Unknown(String),
}

impl Interval {
    pub fn parse(value: &str) -> Self {
        match value {
            "Minutes" => Interval::Minutes,
            "Hours" => Interval::Hours,
            "Days" => Interval::Days,
            "Weeks" => Interval::Weeks,
            "Months" => Interval::Months,
            other => Interval::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Interval::Minutes => "Minutes",
            Interval::Hours => "Hours",
            Interval::Days => "Days",
            Interval::Weeks => "Weeks",
            Interval::Months => "Months",
            Interval::Unknown(other) => other,
        }
    }

    fn minutes_per_unit(&self) -> Option<i64> {
        match self {
            Interval::Minutes => Some(1),
            Interval::Hours => Some(MINUTES_PER_HOUR),
            Interval::Days => Some(MINUTES_PER_DAY),
            Interval::Weeks => Some(MINUTES_PER_WEEK),
            Interval::Months => Some(MINUTES_PER_MONTH),
            Interval::Unknown(_) => None,
        }
    }
}

impl From<String> for Interval {
    fn from(value: String) -> Self {
        Interval::parse(&value)
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 期間を日時に加算できない理由
///
/// 呼び出し側（返却期限の計算）がポリシー名を付けた検証エラーに変換する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// 量または単位が無い
    #[error("period is not recognised")]
    Missing,
    /// 単位が認識できない
    #[error("interval \"{0}\" is not recognised")]
    UnrecognisedInterval(String),
    /// 量が0以下
    #[error("duration \"{0}\" is invalid")]
    InvalidDuration(i64),
    /// 加算結果が表現できる日時の範囲を超える
    #[error("adding {amount} {interval} to {start} leaves the supported date range")]
    OutOfRange {
        amount: i64,
        interval: String,
        start: DateTime<Utc>,
    },
}

/// 期間（量＋単位）
///
/// 不正な期間も生成でき、エラーは使用時にのみ発生する。不変の値型。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
    #[serde(rename = "intervalId", default, skip_serializing_if = "Option::is_none")]
    interval: Option<Interval>,
}

impl Period {
    pub fn new(amount: i64, interval: Interval) -> Self {
        Self {
            amount: Some(amount),
            interval: Some(interval),
        }
    }

    /// 生の表現（量・単位とも省略可）から生成する
    pub fn from_parts(amount: Option<i64>, interval: Option<&str>) -> Self {
        Self {
            amount,
            interval: interval.map(Interval::parse),
        }
    }

    pub fn minutes(amount: i64) -> Self {
        Self::new(amount, Interval::Minutes)
    }

    pub fn hours(amount: i64) -> Self {
        Self::new(amount, Interval::Hours)
    }

    pub fn days(amount: i64) -> Self {
        Self::new(amount, Interval::Days)
    }

    pub fn weeks(amount: i64) -> Self {
        Self::new(amount, Interval::Weeks)
    }

    pub fn months(amount: i64) -> Self {
        Self::new(amount, Interval::Months)
    }

    pub fn amount(&self) -> Option<i64> {
        self.amount
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }

    /// 分に換算する
    ///
    /// 月は31日として換算する。単位不明・量なし・量が0以下は0を返す。
    pub fn to_minutes(&self) -> i64 {
        match (self.amount, self.interval.as_ref()) {
            (Some(amount), Some(interval)) if amount > 0 => interval
                .minutes_per_unit()
                .map(|per_unit| amount.saturating_mul(per_unit))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// 比較用の時間幅（`to_minutes()`に基づく）。表現できない場合は`None`
    pub fn time_period(&self) -> Option<Duration> {
        Duration::try_minutes(self.to_minutes())
    }

    fn end_of_period(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.time_period()
            .and_then(|period| start.checked_add_signed(period))
    }

    /// 開始日時から期間が経過したか（ちょうど経過した瞬間を含む）
    pub fn has_passed_since_date_till_now(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.end_of_period(start).is_some_and(|end| end <= now)
    }

    /// 開始日時から期間がまだ経過していないか
    pub fn has_not_passed_since_date_till_now(
        &self,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        !self.has_passed_since_date_till_now(start, now)
    }

    /// ちょうど今、期間が経過する瞬間か
    pub fn is_passing_now(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.end_of_period(start) == Some(now)
    }

    /// 日時に期間を加算する
    ///
    /// 月は暦の月として加算する（31日換算は使わない）。
    pub fn plus(&self, instant: DateTime<Utc>) -> Result<DateTime<Utc>, PeriodError> {
        let (amount, interval) = match (self.amount, self.interval.as_ref()) {
            (Some(amount), Some(interval)) => (amount, interval),
            _ => return Err(PeriodError::Missing),
        };

        if let Interval::Unknown(name) = interval {
            return Err(PeriodError::UnrecognisedInterval(name.clone()));
        }

        if amount <= 0 {
            return Err(PeriodError::InvalidDuration(amount));
        }

        let result = match interval {
            Interval::Months => u32::try_from(amount)
                .ok()
                .and_then(|months| instant.checked_add_months(Months::new(months))),
            Interval::Minutes => Duration::try_minutes(amount).and_then(|d| instant.checked_add_signed(d)),
            Interval::Hours => Duration::try_hours(amount).and_then(|d| instant.checked_add_signed(d)),
            Interval::Days => Duration::try_days(amount).and_then(|d| instant.checked_add_signed(d)),
            Interval::Weeks => Duration::try_weeks(amount).and_then(|d| instant.checked_add_signed(d)),
            Interval::Unknown(_) => None,
        };

        result.ok_or_else(|| PeriodError::OutOfRange {
            amount,
            interval: interval.as_str().to_string(),
            start: instant,
        })
    }
}
