//! UseCase: セッション接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - Registry への登録と Session（AwaitingUsername）の生成
//!
//! ### なぜこのテストが必要か
//! - 同時接続数の上限を超えた接続が拒否されることを保証
//! - ガードの drop で登録が解除されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：上限以内の接続
//! - 異常系：上限超過
//! - エッジケース：切断後の枠の再利用

use std::{net::SocketAddr, sync::Arc};

use irori_shared::time::Clock;

use crate::domain::{
    PusherChannel, RegistrationGuard, RegistryError, Session, SessionRegistry, Timestamp,
};

use super::error::ConnectError;

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    /// Session Registry（接続中セッションの管理）
    registry: Arc<dyn SessionRegistry>,
    /// 時刻の取得
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    /// 新しい ConnectSessionUseCase を作成
    pub fn new(registry: Arc<dyn SessionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// セッション接続を実行
    ///
    /// # Arguments
    ///
    /// * `peer_addr` - 接続元アドレス
    /// * `outbound` - このセッションの送信キュー
    ///
    /// # Returns
    ///
    /// * `Ok((Session, RegistrationGuard))` - AwaitingUsername 状態のセッションと登録ガード
    /// * `Err(ConnectError)` - 接続数の上限に達している
    pub fn execute(
        &self,
        peer_addr: SocketAddr,
        outbound: PusherChannel,
    ) -> Result<(Session, RegistrationGuard), ConnectError> {
        let session_id = self
            .registry
            .register(peer_addr, outbound)
            .map_err(|e| match e {
                RegistryError::CapacityExceeded { max } => ConnectError::CapacityExceeded { max },
                other => {
                    // register が返すのは CapacityExceeded のみ
                    tracing::error!("Unexpected registry error on register: {}", other);
                    ConnectError::CapacityExceeded {
                        max: self.registry.capacity(),
                    }
                }
            })?;

        let guard = RegistrationGuard::new(self.registry.clone(), session_id);
        let session = Session::new(
            session_id,
            peer_addr,
            Timestamp::new(self.clock.now_jst_millis()),
        );
        tracing::info!(
            "Session '{}' connected from {} ({}/{})",
            session_id,
            peer_addr,
            self.registry.count(),
            self.registry.capacity()
        );

        Ok((session, guard))
    }
}
