use crate::domain::value_objects::LoanPolicyId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出ポリシーの取得ポート
///
/// ポリシーは元の表現（JSON）のまま返す。解釈はドメイン層の
/// `LoanPolicy::from_representation`で行う。
#[async_trait]
pub trait LoanPolicyRepository: Send + Sync {
    /// IDで貸出ポリシーの表現を取得する
    ///
    /// 存在しない場合は`None`。
    async fn get_by_id(&self, policy_id: LoanPolicyId) -> Result<Option<serde_json::Value>>;
}
