use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

const DEFAULT_INPUT: &str = "circulation-snapshot.json";

/// 実行する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckOut,
    Renew,
    OverrideRenew,
    Recall,
}

impl FromStr for Operation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-out" => Ok(Operation::CheckOut),
            "renew" => Ok(Operation::Renew),
            "override-renew" => Ok(Operation::OverrideRenew),
            "recall" => Ok(Operation::Recall),
            other => Err(ConfigError::UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown operation \"{0}\" (expected check-out, renew, override-renew or recall)")]
    UnknownOperation(String),

    #[error("CIRCULATION_SYSTEM_DATE is not an RFC 3339 date-time")]
    InvalidSystemDate(#[source] chrono::ParseError),
}

/// 実行時設定
///
/// 環境変数から読み込む。未設定の項目は既定値を使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// スナップショット文書のパス（`CIRCULATION_INPUT`）
    pub input_path: PathBuf,
    /// 「現在日時」の上書き（`CIRCULATION_SYSTEM_DATE`）
    pub system_date: Option<DateTime<Utc>>,
    /// 実行する操作（`CIRCULATION_OPERATION`）
    pub operation: Operation,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の取得関数から読み込む（テスト用に環境変数を差し替えられる）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let input_path = lookup("CIRCULATION_INPUT")
            .unwrap_or_else(|| DEFAULT_INPUT.into())
            .into();

        let system_date = lookup("CIRCULATION_SYSTEM_DATE")
            .map(|value| DateTime::parse_from_rfc3339(&value).map(|date| date.with_timezone(&Utc)))
            .transpose()
            .map_err(ConfigError::InvalidSystemDate)?;

        let operation = lookup("CIRCULATION_OPERATION")
            .unwrap_or_else(|| "check-out".into())
            .parse()?;

        Ok(Self {
            input_path,
            system_date,
            operation,
        })
    }

    /// 設定された「現在日時」、無ければ実際の現在日時
    pub fn system_date_or_now(&self) -> DateTime<Utc> {
        self.system_date.unwrap_or_else(Utc::now)
    }
}
