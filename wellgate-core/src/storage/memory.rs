//! 内存存储实现
//!
//! 提供基于内存的存储实现，用于开发和测试。
//! 全部状态置于单个读写锁之下，复合操作天然原子。

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{GateStorage, StorageStats};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    PaymentRequest, PoolClaim, PoolPayout, Redemption, RequestId, RequestStatus, Timestamp,
    TxHash, UserAccount, UserId, WeeklyPool, PoolStatus, XpAward, XpSummary, MILLIS_PER_DAY,
};

type AccountKey = (UserId, String);

#[derive(Default)]
struct MemoryInner {
    accounts: HashMap<AccountKey, UserAccount>,
    requests: HashMap<RequestId, PaymentRequest>,
    open_by_user: HashMap<AccountKey, RequestId>,
    consumed: HashSet<TxHash>,
    awards: Vec<XpAward>,
    summaries: HashMap<UserId, XpSummary>,
    redemptions: Vec<Redemption>,
    pools: HashMap<u64, WeeklyPool>,
    payouts: BTreeMap<(u64, UserId), PoolPayout>,
}

/// 内存存储
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStorage {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GateStorage for MemoryStorage {
    async fn get_account(
        &self,
        user_id: &UserId,
        resource: &str,
    ) -> CoreResult<Option<UserAccount>> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .get(&(user_id.clone(), resource.to_string()))
            .cloned())
    }

    async fn take_free_use(
        &self,
        user_id: &UserId,
        resource: &str,
        limit: u32,
        now: Timestamp,
    ) -> CoreResult<Option<u32>> {
        let mut inner = self.inner.write().await;
        let account = inner
            .accounts
            .entry((user_id.clone(), resource.to_string()))
            .or_insert_with(|| UserAccount::new(user_id.clone(), resource.to_string(), now));
        account.roll_free_day(now);
        if account.free_uses_used >= limit {
            return Ok(None);
        }
        account.free_uses_used += 1;
        account.updated_at = now;
        Ok(Some(limit - account.free_uses_used))
    }

    async fn take_credit(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<u32>> {
        let mut inner = self.inner.write().await;
        match inner
            .accounts
            .get_mut(&(user_id.clone(), resource.to_string()))
        {
            Some(account) if account.prepaid_credits > 0 => {
                account.prepaid_credits -= 1;
                account.updated_at = now;
                Ok(Some(account.prepaid_credits))
            }
            _ => Ok(None),
        }
    }

    async fn save_request(&self, request: &PaymentRequest) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if request.status == RequestStatus::Pending {
            inner.open_by_user.insert(
                (request.user_id.clone(), request.resource.clone()),
                request.request_id,
            );
        }
        inner.requests.insert(request.request_id, request.clone());
        Ok(())
    }

    async fn get_request(&self, request_id: &RequestId) -> CoreResult<Option<PaymentRequest>> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(request_id).cloned())
    }

    async fn get_open_request(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<PaymentRequest>> {
        let inner = self.inner.read().await;
        let key = (user_id.clone(), resource.to_string());
        let Some(request_id) = inner.open_by_user.get(&key) else {
            return Ok(None);
        };
        match inner.requests.get(request_id) {
            Some(req) if req.status == RequestStatus::Pending && !req.is_expired(now) => {
                Ok(Some(req.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn expire_requests(&self, now: Timestamp) -> CoreResult<u64> {
        let mut inner = self.inner.write().await;
        let mut expired = 0u64;
        let mut expired_keys = Vec::new();
        for req in inner.requests.values_mut() {
            if req.status == RequestStatus::Pending && req.is_expired(now) {
                req.status = RequestStatus::Expired;
                expired_keys.push(((req.user_id.clone(), req.resource.clone()), req.request_id));
                expired += 1;
            }
        }
        for (key, request_id) in expired_keys {
            if inner.open_by_user.get(&key) == Some(&request_id) {
                inner.open_by_user.remove(&key);
            }
        }
        Ok(expired)
    }

    async fn is_tx_consumed(&self, tx_hash: &TxHash) -> CoreResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.consumed.contains(tx_hash))
    }

    async fn settle_payment(
        &self,
        request_id: &RequestId,
        tx_hash: &TxHash,
        now: Timestamp,
    ) -> CoreResult<UserAccount> {
        let mut inner = self.inner.write().await;

        let request = inner
            .requests
            .get(request_id)
            .cloned()
            .ok_or_else(|| CoreError::RequestNotFound(hex::encode(request_id)))?;

        match request.status {
            RequestStatus::Settled => {
                return Err(CoreError::RequestAlreadySettled(hex::encode(request_id)))
            }
            RequestStatus::Expired => {
                return Err(CoreError::RequestExpired(hex::encode(request_id)))
            }
            RequestStatus::Pending => {}
        }
        if request.is_expired(now) {
            return Err(CoreError::RequestExpired(hex::encode(request_id)));
        }
        if inner.consumed.contains(tx_hash) {
            return Err(CoreError::AlreadyConsumed(tx_hash.clone()));
        }

        // 全部检查通过，以下写入一并生效
        if let Some(req) = inner.requests.get_mut(request_id) {
            req.status = RequestStatus::Settled;
            req.settled_tx = Some(tx_hash.clone());
        }
        let key = (request.user_id.clone(), request.resource.clone());
        if inner.open_by_user.get(&key) == Some(request_id) {
            inner.open_by_user.remove(&key);
        }
        inner.consumed.insert(tx_hash.clone());

        let account = inner.accounts.entry(key).or_insert_with(|| {
            UserAccount::new(request.user_id.clone(), request.resource.clone(), now)
        });
        account.prepaid_credits += request.credits_granted;
        account.updated_at = now;
        Ok(account.clone())
    }

    async fn record_award(&self, award: &XpAward) -> CoreResult<XpSummary> {
        let mut inner = self.inner.write().await;
        let summary = inner
            .summaries
            .entry(award.user_id.clone())
            .or_insert_with(|| XpSummary::new(award.user_id.clone(), award.awarded_at));
        summary.apply_award(award);
        let summary = summary.clone();
        inner.awards.push(award.clone());
        Ok(summary)
    }

    async fn get_xp_summary(&self, user_id: &UserId) -> CoreResult<Option<XpSummary>> {
        let inner = self.inner.read().await;
        Ok(inner.summaries.get(user_id).cloned())
    }

    async fn list_awards(&self, user_id: &UserId) -> CoreResult<Vec<XpAward>> {
        let inner = self.inner.read().await;
        let mut awards: Vec<XpAward> = inner
            .awards
            .iter()
            .filter(|a| &a.user_id == user_id)
            .cloned()
            .collect();
        awards.sort_by_key(|a| a.awarded_at);
        Ok(awards)
    }

    async fn xp_by_user_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> CoreResult<Vec<(UserId, u64)>> {
        let inner = self.inner.read().await;
        let mut totals: BTreeMap<UserId, u64> = BTreeMap::new();
        for award in &inner.awards {
            if award.awarded_at >= start && award.awarded_at < end {
                *totals.entry(award.user_id.clone()).or_insert(0) += award.xp;
            }
        }
        Ok(totals.into_iter().collect())
    }

    async fn record_redemption(&self, redemption: &Redemption, cap: u64) -> CoreResult<XpSummary> {
        let mut inner = self.inner.write().await;

        let window_start = redemption.redeemed_at.0.saturating_sub(MILLIS_PER_DAY);
        let used: u64 = inner
            .redemptions
            .iter()
            .filter(|r| r.user_id == redemption.user_id && r.redeemed_at.0 > window_start)
            .map(|r| r.tokens)
            .sum();
        if used + redemption.tokens > cap {
            return Err(CoreError::DailyCapExceeded {
                requested: redemption.tokens,
                available: cap.saturating_sub(used),
            });
        }

        let summary = inner
            .summaries
            .get_mut(&redemption.user_id)
            .ok_or_else(|| CoreError::InsufficientXp {
                required: redemption.xp_spent,
                available: 0,
            })?;
        if summary.spendable_xp < redemption.xp_spent {
            return Err(CoreError::InsufficientXp {
                required: redemption.xp_spent,
                available: summary.spendable_xp,
            });
        }

        summary.spendable_xp -= redemption.xp_spent;
        summary.updated_at = redemption.redeemed_at;
        let summary = summary.clone();
        inner.redemptions.push(redemption.clone());
        Ok(summary)
    }

    async fn list_redemptions(&self, user_id: &UserId) -> CoreResult<Vec<Redemption>> {
        let inner = self.inner.read().await;
        let mut redemptions: Vec<Redemption> = inner
            .redemptions
            .iter()
            .filter(|r| &r.user_id == user_id)
            .cloned()
            .collect();
        redemptions.sort_by_key(|r| r.redeemed_at);
        Ok(redemptions)
    }

    async fn get_pool(&self, week_index: u64) -> CoreResult<Option<WeeklyPool>> {
        let inner = self.inner.read().await;
        Ok(inner.pools.get(&week_index).cloned())
    }

    async fn claim_pool(
        &self,
        week_index: u64,
        pool_amount: u64,
        owner: &str,
        lease_secs: u64,
        now: Timestamp,
    ) -> CoreResult<PoolClaim> {
        let mut inner = self.inner.write().await;
        let pool = inner
            .pools
            .entry(week_index)
            .or_insert_with(|| WeeklyPool::new(week_index, pool_amount));

        match pool.status {
            PoolStatus::Distributed => Ok(PoolClaim::AlreadyDistributed),
            PoolStatus::Distributing => {
                let holder = pool.claim_owner.clone().unwrap_or_default();
                let until = pool.claim_expires_at.unwrap_or_default();
                if holder != owner && now < until {
                    return Ok(PoolClaim::Busy { owner: holder, until });
                }
                // 自己续租或接管过期租约
                pool.claim_owner = Some(owner.to_string());
                pool.claim_expires_at = Some(now.plus_secs(lease_secs));
                Ok(PoolClaim::Claimed(pool.clone()))
            }
            PoolStatus::Open => {
                pool.status = PoolStatus::Distributing;
                pool.claim_owner = Some(owner.to_string());
                pool.claim_expires_at = Some(now.plus_secs(lease_secs));
                Ok(PoolClaim::Claimed(pool.clone()))
            }
        }
    }

    async fn finish_pool(
        &self,
        week_index: u64,
        owner: &str,
        payouts: &[PoolPayout],
        now: Timestamp,
    ) -> CoreResult<WeeklyPool> {
        let mut inner = self.inner.write().await;

        {
            let pool = inner
                .pools
                .get(&week_index)
                .ok_or_else(|| CoreError::Storage(format!("pool {} not found", week_index)))?;
            match pool.status {
                PoolStatus::Distributed => {
                    return Err(CoreError::AlreadyDistributed(week_index))
                }
                PoolStatus::Distributing
                    if pool.claim_owner.as_deref() == Some(owner) => {}
                _ => {
                    return Err(CoreError::Storage(format!(
                        "pool {} lease not held by {}",
                        week_index, owner
                    )))
                }
            }
        }

        for payout in payouts {
            inner
                .payouts
                .entry((week_index, payout.user_id.clone()))
                .or_insert_with(|| payout.clone());
        }
        let total: u64 = inner
            .payouts
            .range((week_index, String::new())..(week_index + 1, String::new()))
            .map(|(_, p)| p.amount)
            .sum();

        let pool = inner
            .pools
            .get_mut(&week_index)
            .ok_or_else(|| CoreError::Storage(format!("pool {} not found", week_index)))?;
        pool.status = PoolStatus::Distributed;
        pool.claim_owner = None;
        pool.claim_expires_at = None;
        pool.distributed_at = Some(now);
        pool.distributed_total = total;
        Ok(pool.clone())
    }

    async fn release_pool(&self, week_index: u64, owner: &str) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(pool) = inner.pools.get_mut(&week_index) {
            if pool.status == PoolStatus::Distributing
                && pool.claim_owner.as_deref() == Some(owner)
            {
                pool.status = PoolStatus::Open;
                pool.claim_owner = None;
                pool.claim_expires_at = None;
            }
        }
        Ok(())
    }

    async fn list_payouts(&self, week_index: u64) -> CoreResult<Vec<PoolPayout>> {
        let inner = self.inner.read().await;
        Ok(inner
            .payouts
            .range((week_index, String::new())..(week_index + 1, String::new()))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn get_stats(&self) -> CoreResult<StorageStats> {
        let inner = self.inner.read().await;
        Ok(StorageStats {
            total_accounts: inner.accounts.len() as u64,
            pending_requests: inner
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Pending)
                .count() as u64,
            settled_requests: inner
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Settled)
                .count() as u64,
            consumed_txs: inner.consumed.len() as u64,
            total_awards: inner.awards.len() as u64,
            total_redemptions: inner.redemptions.len() as u64,
            distributed_pools: inner
                .pools
                .values()
                .filter(|p| p.status == PoolStatus::Distributed)
                .count() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::XpActivity;

    const RES: &str = "agent_message";

    fn request(user: &str, now: Timestamp) -> PaymentRequest {
        PaymentRequest::new(
            RES.to_string(),
            user.to_string(),
            1000,
            None,
            format!("0x{}", "aa".repeat(20)),
            31337,
            10,
            now,
            1800,
        )
    }

    #[tokio::test]
    async fn test_free_use_exhaustion_and_daily_reset() {
        let storage = MemoryStorage::new();
        let now = Timestamp::from_millis(1000);
        let user = "user-1".to_string();

        for expected in [Some(2), Some(1), Some(0), None] {
            assert_eq!(
                storage.take_free_use(&user, RES, 3, now).await.unwrap(),
                expected
            );
        }

        // 免费额度按（用户，资源）隔离
        assert_eq!(
            storage.take_free_use(&user, "listing", 3, now).await.unwrap(),
            Some(2)
        );

        // 跨 UTC 日后额度重置
        let tomorrow = Timestamp::from_millis(now.0 + MILLIS_PER_DAY);
        assert_eq!(
            storage.take_free_use(&user, RES, 3, tomorrow).await.unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_settle_payment_exactly_once() {
        let storage = MemoryStorage::new();
        let now = Timestamp::from_millis(1000);
        let req = request("user-1", now);
        storage.save_request(&req).await.unwrap();

        let tx = format!("0x{}", "ab".repeat(32));
        let account = storage
            .settle_payment(&req.request_id, &tx, now)
            .await
            .unwrap();
        assert_eq!(account.prepaid_credits, 10);

        // 再次结算同一请求
        let err = storage
            .settle_payment(&req.request_id, &tx, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RequestAlreadySettled(_)));

        // 同一哈希结算另一请求
        let req2 = request("user-1", now);
        storage.save_request(&req2).await.unwrap();
        let err = storage
            .settle_payment(&req2.request_id, &tx, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyConsumed(_)));
        assert!(storage.is_tx_consumed(&tx).await.unwrap());
    }

    #[tokio::test]
    async fn test_settle_expired_request() {
        let storage = MemoryStorage::new();
        let now = Timestamp::from_millis(1000);
        let req = request("user-1", now);
        storage.save_request(&req).await.unwrap();

        let late = Timestamp::from_millis(now.0 + 1801 * 1000);
        let tx = format!("0x{}", "cd".repeat(32));
        let err = storage
            .settle_payment(&req.request_id, &tx, late)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RequestExpired(_)));
        // 失败的结算不得消费哈希
        assert!(!storage.is_tx_consumed(&tx).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_requests_clears_open_index() {
        let storage = MemoryStorage::new();
        let now = Timestamp::from_millis(1000);
        let user = "user-1".to_string();
        let req = request(&user, now);
        storage.save_request(&req).await.unwrap();
        assert!(storage
            .get_open_request(&user, RES, now)
            .await
            .unwrap()
            .is_some());

        let late = Timestamp::from_millis(now.0 + 1801 * 1000);
        assert_eq!(storage.expire_requests(late).await.unwrap(), 1);
        assert!(storage
            .get_open_request(&user, RES, late)
            .await
            .unwrap()
            .is_none());
        let stored = storage.get_request(&req.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Expired);
    }

    #[tokio::test]
    async fn test_award_and_window_aggregation() {
        let storage = MemoryStorage::new();
        let user = "user-1".to_string();
        let inside = Timestamp::from_millis(10_000);
        let outside = Timestamp::from_millis(100_000);

        storage
            .record_award(&XpAward::new(user.clone(), XpActivity::CheckIn, inside))
            .await
            .unwrap();
        storage
            .record_award(&XpAward::new(user.clone(), XpActivity::MoodLog, inside))
            .await
            .unwrap();
        storage
            .record_award(&XpAward::new(user.clone(), XpActivity::CheckIn, outside))
            .await
            .unwrap();

        let summary = storage.get_xp_summary(&user).await.unwrap().unwrap();
        assert_eq!(summary.total_xp, 25);

        let window = storage
            .xp_by_user_in_window(Timestamp::from_millis(0), Timestamp::from_millis(50_000))
            .await
            .unwrap();
        assert_eq!(window, vec![(user, 15)]);
    }

    #[tokio::test]
    async fn test_redemption_cap_rejected_in_full() {
        let storage = MemoryStorage::new();
        let user = "user-1".to_string();
        let now = Timestamp::from_millis(1_000_000);

        // 积累足够的 XP
        for _ in 0..30 {
            storage
                .record_award(&XpAward::new(user.clone(), XpActivity::StreakThirty, now))
                .await
                .unwrap();
        }

        let first = Redemption::new(user.clone(), 2000, 200, 0, 0, 7, 0, now);
        storage.record_redemption(&first, 250).await.unwrap();

        // 上限剩 50，申请 100 必须整笔拒绝
        let second = Redemption::new(user.clone(), 1000, 100, 0, 0, 7, 0, now);
        let err = storage.record_redemption(&second, 250).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::DailyCapExceeded { requested: 100, available: 50 }
        ));

        // 余额未被部分扣减
        let summary = storage.get_xp_summary(&user).await.unwrap().unwrap();
        assert_eq!(summary.spendable_xp, 30 * 200 - 2000);

        // 窗口滚动之后可以继续兑换
        let next_day = Timestamp::from_millis(now.0 + MILLIS_PER_DAY + 1);
        let third = Redemption::new(user.clone(), 1000, 100, 0, 0, 7, 0, next_day);
        storage.record_redemption(&third, 250).await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_claim_and_finish() {
        let storage = MemoryStorage::new();
        let now = Timestamp::from_millis(1_000_000);

        let claim = storage
            .claim_pool(100, 50_000, "worker-a", 300, now)
            .await
            .unwrap();
        assert!(matches!(claim, PoolClaim::Claimed(_)));

        // 他人租约未到期
        let busy = storage
            .claim_pool(100, 50_000, "worker-b", 300, now)
            .await
            .unwrap();
        assert!(matches!(busy, PoolClaim::Busy { .. }));

        // 租约过期后可接管
        let later = Timestamp::from_millis(now.0 + 301 * 1000);
        let takeover = storage
            .claim_pool(100, 50_000, "worker-b", 300, later)
            .await
            .unwrap();
        assert!(matches!(takeover, PoolClaim::Claimed(_)));

        let payouts = vec![PoolPayout {
            week_index: 100,
            user_id: "user-1".to_string(),
            xp_in_week: 500,
            amount: 50_000,
            paid_at: later,
        }];
        let pool = storage
            .finish_pool(100, "worker-b", &payouts, later)
            .await
            .unwrap();
        assert_eq!(pool.status, PoolStatus::Distributed);
        assert_eq!(pool.distributed_total, 50_000);

        let claim = storage
            .claim_pool(100, 50_000, "worker-a", 300, later)
            .await
            .unwrap();
        assert!(matches!(claim, PoolClaim::AlreadyDistributed));
    }
}
