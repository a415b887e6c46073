//! 支付门模块
//!
//! 访问判定与支付结算的入口。额度按（用户，资源）独立记账。
//!
//! # 访问判定顺序
//!
//! 1. 资源定价为零：直接放行，不触碰任何计数器
//! 2. 当日免费额度未耗尽：消耗一次，放行（额度按 UTC 日重置）
//! 3. 该资源的预付额度有余：扣减一个，放行
//! 4. 否则签发（或复用）支付请求，返回 402 挑战
//!
//! # 结算
//!
//! 证明验证通过后，在存储临界区内一次性完成
//! 请求落账、哈希消费与额度入账。

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{ChainConfig, GateConfig};
use crate::error::{CoreError, CoreResult};
use crate::replay::ReplayGuard;
use crate::storage::GateStorage;
use crate::types::{
    normalize_address, AccessDecision, Address, PaymentProof, PaymentRequest, RequestStatus,
    Timestamp, UserAccount, UserId,
};
use crate::verify::{ExpectedPayment, PaymentVerifier};

/// 支付门
pub struct PaymentGate {
    storage: Arc<dyn GateStorage>,
    verifier: Arc<dyn PaymentVerifier>,
    replay: ReplayGuard,
    config: GateConfig,
    pay_to: Address,
    asset: Option<Address>,
    chain_id: u64,
}

impl PaymentGate {
    /// 创建支付门
    pub fn new(
        storage: Arc<dyn GateStorage>,
        verifier: Arc<dyn PaymentVerifier>,
        config: GateConfig,
        chain: &ChainConfig,
    ) -> CoreResult<Self> {
        let pay_to = normalize_address(&chain.pay_to)?;
        let asset = chain.asset.as_deref().map(normalize_address).transpose()?;
        Ok(Self {
            replay: ReplayGuard::new(storage.clone()),
            storage,
            verifier,
            config,
            pay_to,
            asset,
            chain_id: chain.chain_id,
        })
    }

    /// 判定并消耗一次访问
    pub async fn request_access(
        &self,
        resource: &str,
        user_id: &UserId,
    ) -> CoreResult<AccessDecision> {
        if user_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("empty user id".to_string()));
        }
        if resource.trim().is_empty() {
            return Err(CoreError::InvalidInput("empty resource".to_string()));
        }
        let now = Timestamp::now();

        // 定价为零的资源视作常年免费，不占用当日额度
        let price = self.config.price_for(resource);
        if price == 0 {
            debug!("free resource {} for {}", resource, user_id);
            return Ok(AccessDecision::Free {
                remaining: self.config.free_daily_uses,
            });
        }

        if let Some(remaining) = self
            .storage
            .take_free_use(user_id, resource, self.config.free_daily_uses, now)
            .await?
        {
            debug!(
                "free access to {} for {}, {} remaining today",
                resource, user_id, remaining
            );
            return Ok(AccessDecision::Free { remaining });
        }

        if let Some(credits_remaining) = self.storage.take_credit(user_id, resource, now).await? {
            debug!(
                "credit access to {} for {}, {} credits remaining",
                resource, user_id, credits_remaining
            );
            return Ok(AccessDecision::Covered { credits_remaining });
        }

        // 未过期的挑战直接复用，避免同一账户积累多个待支付请求
        if let Some(request) = self.storage.get_open_request(user_id, resource, now).await? {
            return Ok(AccessDecision::PaymentRequired { request });
        }

        let request = PaymentRequest::new(
            resource.to_string(),
            user_id.clone(),
            price,
            self.asset.clone(),
            self.pay_to.clone(),
            self.chain_id,
            self.config.credits_per_payment,
            now,
            self.config.challenge_ttl_secs,
        );
        self.storage.save_request(&request).await?;
        info!(
            "issued payment challenge {} for {} on {}, expires {}",
            hex::encode(request.request_id),
            user_id,
            resource,
            request.expires_at.to_rfc3339()
        );
        Ok(AccessDecision::PaymentRequired { request })
    }

    /// 查看账户状态（不消耗额度）
    ///
    /// 返回前套用当日额度重置，跨日后的读取不会带出前一日的用量。
    pub async fn account(&self, user_id: &UserId, resource: &str) -> CoreResult<UserAccount> {
        let now = Timestamp::now();
        let mut account = self
            .storage
            .get_account(user_id, resource)
            .await?
            .unwrap_or_else(|| UserAccount::new(user_id.clone(), resource.to_string(), now));
        account.roll_free_day(now);
        Ok(account)
    }

    /// 当日免费额度上限
    pub fn free_daily_uses(&self) -> u32 {
        self.config.free_daily_uses
    }

    /// 结算支付证明
    ///
    /// 同一请求携带同一交易哈希的重复提交幂等返回当前账户。
    pub async fn settle(&self, proof: &PaymentProof) -> CoreResult<UserAccount> {
        let now = Timestamp::now();

        // 证明时间戳须落在验证时刻的容忍窗口内，早到晚到都拒绝
        let tolerance_millis = self.config.proof_tolerance_secs * 1000;
        if now.0.abs_diff(proof.signed_at.0) > tolerance_millis {
            return Err(CoreError::ProofOutOfWindow {
                signed_at: proof.signed_at.0,
                verified_at: now.0,
            });
        }

        let request = self
            .storage
            .get_request(&proof.request_id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(hex::encode(proof.request_id)))?;

        if proof.chain_id != request.chain_id {
            return Err(CoreError::WrongChain {
                expected: request.chain_id,
                got: proof.chain_id,
            });
        }

        let tx_hash = match request.status {
            RequestStatus::Settled => {
                let tx_hash = crate::types::normalize_tx_hash(&proof.tx_hash)?;
                if request.settled_tx.as_deref() == Some(tx_hash.as_str()) {
                    return self.account(&request.user_id, &request.resource).await;
                }
                return Err(CoreError::RequestAlreadySettled(hex::encode(
                    proof.request_id,
                )));
            }
            RequestStatus::Expired => {
                return Err(CoreError::RequestExpired(hex::encode(proof.request_id)))
            }
            RequestStatus::Pending => self.replay.ensure_fresh(&proof.tx_hash).await?,
        };
        if request.is_expired(now) {
            return Err(CoreError::RequestExpired(hex::encode(proof.request_id)));
        }

        let expected = ExpectedPayment {
            pay_to: self.pay_to.clone(),
            min_amount: request.amount,
            asset: self.asset.clone(),
        };
        let transfer = self.verifier.verify(&tx_hash, &expected).await?;

        // 早于请求签发（超出容忍窗口）的转账不接受
        if transfer.block_timestamp.0.saturating_add(tolerance_millis) < request.created_at.0 {
            return Err(CoreError::StaleProof {
                mined_at: transfer.block_timestamp.0,
                requested_at: request.created_at.0,
            });
        }

        let account = self
            .storage
            .settle_payment(&proof.request_id, &tx_hash, now)
            .await?;
        info!(
            "settled request {} with tx {} for {}",
            hex::encode(proof.request_id),
            tx_hash,
            request.user_id
        );
        Ok(account)
    }

    /// 将超时的待支付请求标记为过期，返回处理数量
    pub async fn expire_stale(&self) -> CoreResult<u64> {
        self.storage.expire_requests(Timestamp::now()).await
    }
}
