use crate::domain::value_objects::LoanPolicyId;
use crate::ports::loan_policy_repository::{LoanPolicyRepository as LoanPolicyRepositoryTrait, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// LoanPolicyRepositoryのモック実装
///
/// ポリシーの表現（JSON）をポリシーIDごとに保持する。
pub struct LoanPolicyRepository {
    policies: Mutex<HashMap<LoanPolicyId, serde_json::Value>>,
}

impl LoanPolicyRepository {
    pub fn new() -> Self {
        Self {
            policies: Mutex::new(HashMap::new()),
        }
    }

    /// ポリシーの表現を登録する
    pub fn add_policy(&self, policy_id: LoanPolicyId, representation: serde_json::Value) {
        self.policies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(policy_id, representation);
    }
}

impl Default for LoanPolicyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanPolicyRepositoryTrait for LoanPolicyRepository {
    async fn get_by_id(&self, policy_id: LoanPolicyId) -> Result<Option<serde_json::Value>> {
        let policies = self.policies.lock().map_err(|e| e.to_string())?;
        Ok(policies.get(&policy_id).cloned())
    }
}
