//! UseCase: 接続状況の取得（HTTP API 向け）

use std::sync::Arc;

use crate::domain::{SessionRegistry, Username};

/// 接続状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionsStatus {
    /// 登録中のセッション数（username 未確定を含む）
    pub registered: usize,
    /// 同時接続数の上限
    pub capacity: usize,
    /// アクティブなセッションの username（昇順）
    pub usernames: Vec<Username>,
}

/// 接続状況取得のユースケース
pub struct GetSessionsUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl GetSessionsUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(&self) -> SessionsStatus {
        let records = self.registry.enumerate();
        let mut usernames: Vec<Username> = records
            .iter()
            .filter_map(|record| record.username.clone())
            .collect();
        usernames.sort();

        SessionsStatus {
            registered: records.len(),
            capacity: self.registry.capacity(),
            usernames,
        }
    }
}
