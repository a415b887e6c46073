//! Sled 持久化存储实现
//!
//! 提供基于 Sled 嵌入式数据库的持久化存储实现。
//! 复合操作持有进程内互斥锁做并发序列化，跨树写入
//! 通过 sled 事务落盘，崩溃不会留下部分状态。

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{GateStorage, StorageConfig, StorageStats};
use crate::error::{CoreError, CoreResult};
use crate::types::{
    PaymentRequest, PoolClaim, PoolPayout, PoolStatus, Redemption, RequestId, RequestStatus,
    Timestamp, TxHash, UserAccount, UserId, WeeklyPool, XpAward, XpSummary, MILLIS_PER_DAY,
};

/// Tree 名称常量
const ACCOUNTS_TREE: &str = "accounts";
const REQUESTS_TREE: &str = "requests";
const OPEN_INDEX_TREE: &str = "open_requests";
const CONSUMED_TREE: &str = "consumed_txs";
const AWARDS_TREE: &str = "awards";
const SUMMARIES_TREE: &str = "summaries";
const REDEMPTIONS_TREE: &str = "redemptions";
const POOLS_TREE: &str = "pools";
const PAYOUTS_TREE: &str = "payouts";

/// Sled 持久化存储
#[derive(Debug, Clone)]
pub struct SledStorage {
    #[allow(dead_code)]
    db: sled::Db,
    accounts: sled::Tree,
    requests: sled::Tree,
    open_index: sled::Tree,
    consumed: sled::Tree,
    awards: sled::Tree,
    summaries: sled::Tree,
    redemptions: sled::Tree,
    pools: sled::Tree,
    payouts: sled::Tree,
    write_guard: Arc<Mutex<()>>,
}

fn ser<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

fn de<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
}

fn sled_err(e: sled::Error) -> CoreError {
    CoreError::Storage(e.to_string())
}

fn abort(e: CoreError) -> ConflictableTransactionError<CoreError> {
    ConflictableTransactionError::Abort(e)
}

fn tx_err(e: TransactionError<CoreError>) -> CoreError {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => sled_err(e),
    }
}

fn payout_key(week_index: u64, user_id: &str) -> Vec<u8> {
    let mut key = week_index.to_be_bytes().to_vec();
    key.extend_from_slice(user_id.as_bytes());
    key
}

/// （用户，资源）复合键，0x1f 不会出现在标识符中
fn account_key(user_id: &str, resource: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + resource.len() + 1);
    key.extend_from_slice(user_id.as_bytes());
    key.push(0x1f);
    key.extend_from_slice(resource.as_bytes());
    key
}

impl SledStorage {
    /// 使用配置创建新的 Sled 存储
    pub fn new(config: &StorageConfig) -> CoreResult<Self> {
        Self::open(&config.data_dir)
    }

    /// 打开指定路径的数据库
    pub fn open<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let db = sled::open(path).map_err(sled_err)?;
        let open_tree = |name: &str| db.open_tree(name).map_err(sled_err);
        Ok(Self {
            accounts: open_tree(ACCOUNTS_TREE)?,
            requests: open_tree(REQUESTS_TREE)?,
            open_index: open_tree(OPEN_INDEX_TREE)?,
            consumed: open_tree(CONSUMED_TREE)?,
            awards: open_tree(AWARDS_TREE)?,
            summaries: open_tree(SUMMARIES_TREE)?,
            redemptions: open_tree(REDEMPTIONS_TREE)?,
            pools: open_tree(POOLS_TREE)?,
            payouts: open_tree(PAYOUTS_TREE)?,
            db,
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_guard
            .lock()
            .map_err(|_| CoreError::Storage("storage lock poisoned".to_string()))
    }

    fn get_tree<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> CoreResult<Option<T>> {
        match tree.get(key).map_err(sled_err)? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_tree<T: Serialize>(tree: &sled::Tree, key: &[u8], value: &T) -> CoreResult<()> {
        tree.insert(key, ser(value)?).map_err(sled_err)?;
        Ok(())
    }

    fn load_pool(&self, week_index: u64) -> CoreResult<Option<WeeklyPool>> {
        Self::get_tree(&self.pools, &week_index.to_be_bytes())
    }

    fn store_pool(&self, pool: &WeeklyPool) -> CoreResult<()> {
        Self::put_tree(&self.pools, &pool.week_index.to_be_bytes(), pool)
    }

    fn all_redemptions_for(&self, user_id: &UserId) -> CoreResult<Vec<Redemption>> {
        let mut out = Vec::new();
        for item in self.redemptions.iter() {
            let (_, bytes) = item.map_err(sled_err)?;
            let redemption: Redemption = de(&bytes)?;
            if &redemption.user_id == user_id {
                out.push(redemption);
            }
        }
        out.sort_by_key(|r| r.redeemed_at);
        Ok(out)
    }
}

#[async_trait]
impl GateStorage for SledStorage {
    async fn get_account(
        &self,
        user_id: &UserId,
        resource: &str,
    ) -> CoreResult<Option<UserAccount>> {
        Self::get_tree(&self.accounts, &account_key(user_id, resource))
    }

    async fn take_free_use(
        &self,
        user_id: &UserId,
        resource: &str,
        limit: u32,
        now: Timestamp,
    ) -> CoreResult<Option<u32>> {
        let _guard = self.lock()?;
        let key = account_key(user_id, resource);
        let mut account: UserAccount = Self::get_tree(&self.accounts, &key)?
            .unwrap_or_else(|| UserAccount::new(user_id.clone(), resource.to_string(), now));
        account.roll_free_day(now);
        if account.free_uses_used >= limit {
            // 初次见到该账户也要落库，保持账户存在性一致
            Self::put_tree(&self.accounts, &key, &account)?;
            return Ok(None);
        }
        account.free_uses_used += 1;
        account.updated_at = now;
        Self::put_tree(&self.accounts, &key, &account)?;
        Ok(Some(limit - account.free_uses_used))
    }

    async fn take_credit(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<u32>> {
        let _guard = self.lock()?;
        let key = account_key(user_id, resource);
        let Some(mut account) = Self::get_tree::<UserAccount>(&self.accounts, &key)? else {
            return Ok(None);
        };
        if account.prepaid_credits == 0 {
            return Ok(None);
        }
        account.prepaid_credits -= 1;
        account.updated_at = now;
        Self::put_tree(&self.accounts, &key, &account)?;
        Ok(Some(account.prepaid_credits))
    }

    async fn save_request(&self, request: &PaymentRequest) -> CoreResult<()> {
        let _guard = self.lock()?;
        let bytes = ser(request)?;
        (&self.requests, &self.open_index)
            .transaction(|(requests, open_index)| {
                requests.insert(request.request_id.as_slice(), bytes.clone())?;
                if request.status == RequestStatus::Pending {
                    open_index.insert(
                        account_key(&request.user_id, &request.resource),
                        request.request_id.to_vec(),
                    )?;
                }
                Ok(())
            })
            .map_err(tx_err)
    }

    async fn get_request(&self, request_id: &RequestId) -> CoreResult<Option<PaymentRequest>> {
        Self::get_tree(&self.requests, request_id)
    }

    async fn get_open_request(
        &self,
        user_id: &UserId,
        resource: &str,
        now: Timestamp,
    ) -> CoreResult<Option<PaymentRequest>> {
        let Some(request_id) = self
            .open_index
            .get(account_key(user_id, resource))
            .map_err(sled_err)?
        else {
            return Ok(None);
        };
        let request: Option<PaymentRequest> = Self::get_tree(&self.requests, &request_id)?;
        match request {
            Some(req) if req.status == RequestStatus::Pending && !req.is_expired(now) => {
                Ok(Some(req))
            }
            _ => Ok(None),
        }
    }

    async fn expire_requests(&self, now: Timestamp) -> CoreResult<u64> {
        let _guard = self.lock()?;
        let mut expired = 0u64;
        for item in self.requests.iter() {
            let (key, bytes) = item.map_err(sled_err)?;
            let mut request: PaymentRequest = de(&bytes)?;
            if request.status == RequestStatus::Pending && request.is_expired(now) {
                request.status = RequestStatus::Expired;
                self.requests.insert(&key, ser(&request)?).map_err(sled_err)?;
                let open_key = account_key(&request.user_id, &request.resource);
                if let Some(open) = self.open_index.get(&open_key).map_err(sled_err)? {
                    if open.as_ref() == request.request_id.as_slice() {
                        self.open_index.remove(&open_key).map_err(sled_err)?;
                    }
                }
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn is_tx_consumed(&self, tx_hash: &TxHash) -> CoreResult<bool> {
        Ok(self
            .consumed
            .contains_key(tx_hash.as_bytes())
            .map_err(sled_err)?)
    }

    async fn settle_payment(
        &self,
        request_id: &RequestId,
        tx_hash: &TxHash,
        now: Timestamp,
    ) -> CoreResult<UserAccount> {
        let _guard = self.lock()?;

        // 请求翻转、索引清理、哈希消费与入账要么全部落盘要么全不落盘
        (
            &self.requests,
            &self.open_index,
            &self.consumed,
            &self.accounts,
        )
            .transaction(|(requests, open_index, consumed, accounts)| {
                let mut request: PaymentRequest = match requests.get(request_id.as_slice())? {
                    Some(bytes) => de(&bytes).map_err(abort)?,
                    None => {
                        return Err(abort(CoreError::RequestNotFound(hex::encode(request_id))))
                    }
                };

                match request.status {
                    RequestStatus::Settled => {
                        return Err(abort(CoreError::RequestAlreadySettled(hex::encode(
                            request_id,
                        ))))
                    }
                    RequestStatus::Expired => {
                        return Err(abort(CoreError::RequestExpired(hex::encode(request_id))))
                    }
                    RequestStatus::Pending => {}
                }
                if request.is_expired(now) {
                    return Err(abort(CoreError::RequestExpired(hex::encode(request_id))));
                }
                if consumed.get(tx_hash.as_bytes())?.is_some() {
                    return Err(abort(CoreError::AlreadyConsumed(tx_hash.clone())));
                }

                request.status = RequestStatus::Settled;
                request.settled_tx = Some(tx_hash.clone());
                requests.insert(request_id.as_slice(), ser(&request).map_err(abort)?)?;
                let open_key = account_key(&request.user_id, &request.resource);
                if let Some(open) = open_index.get(&open_key)? {
                    if open.as_ref() == request_id.as_slice() {
                        open_index.remove(open_key.as_slice())?;
                    }
                }
                let marker: &[u8] = &[];
                consumed.insert(tx_hash.as_bytes(), marker)?;

                let mut account: UserAccount = match accounts.get(&open_key)? {
                    Some(bytes) => de(&bytes).map_err(abort)?,
                    None => {
                        UserAccount::new(request.user_id.clone(), request.resource.clone(), now)
                    }
                };
                account.prepaid_credits += request.credits_granted;
                account.updated_at = now;
                accounts.insert(open_key.as_slice(), ser(&account).map_err(abort)?)?;
                Ok(account)
            })
            .map_err(tx_err)
    }

    async fn record_award(&self, award: &XpAward) -> CoreResult<XpSummary> {
        let _guard = self.lock()?;
        // 流水与汇总同事务写入，崩溃时不留下缺汇总的流水
        (&self.awards, &self.summaries)
            .transaction(|(awards, summaries)| {
                let mut summary: XpSummary = match summaries.get(award.user_id.as_bytes())? {
                    Some(bytes) => de(&bytes).map_err(abort)?,
                    None => XpSummary::new(award.user_id.clone(), award.awarded_at),
                };
                summary.apply_award(award);
                awards.insert(award.award_id.as_slice(), ser(award).map_err(abort)?)?;
                summaries.insert(award.user_id.as_bytes(), ser(&summary).map_err(abort)?)?;
                Ok(summary)
            })
            .map_err(tx_err)
    }

    async fn get_xp_summary(&self, user_id: &UserId) -> CoreResult<Option<XpSummary>> {
        Self::get_tree(&self.summaries, user_id.as_bytes())
    }

    async fn list_awards(&self, user_id: &UserId) -> CoreResult<Vec<XpAward>> {
        let mut out = Vec::new();
        for item in self.awards.iter() {
            let (_, bytes) = item.map_err(sled_err)?;
            let award: XpAward = de(&bytes)?;
            if &award.user_id == user_id {
                out.push(award);
            }
        }
        out.sort_by_key(|a| a.awarded_at);
        Ok(out)
    }

    async fn xp_by_user_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> CoreResult<Vec<(UserId, u64)>> {
        let mut totals: std::collections::BTreeMap<UserId, u64> = Default::default();
        for item in self.awards.iter() {
            let (_, bytes) = item.map_err(sled_err)?;
            let award: XpAward = de(&bytes)?;
            if award.awarded_at >= start && award.awarded_at < end {
                *totals.entry(award.user_id).or_insert(0) += award.xp;
            }
        }
        Ok(totals.into_iter().collect())
    }

    async fn record_redemption(&self, redemption: &Redemption, cap: u64) -> CoreResult<XpSummary> {
        let _guard = self.lock()?;

        let window_start = redemption.redeemed_at.0.saturating_sub(MILLIS_PER_DAY);
        let used: u64 = self
            .all_redemptions_for(&redemption.user_id)?
            .iter()
            .filter(|r| r.redeemed_at.0 > window_start)
            .map(|r| r.tokens)
            .sum();
        if used + redemption.tokens > cap {
            return Err(CoreError::DailyCapExceeded {
                requested: redemption.tokens,
                available: cap.saturating_sub(used),
            });
        }

        let mut summary: XpSummary =
            Self::get_tree(&self.summaries, redemption.user_id.as_bytes())?.ok_or_else(|| {
                CoreError::InsufficientXp {
                    required: redemption.xp_spent,
                    available: 0,
                }
            })?;
        if summary.spendable_xp < redemption.xp_spent {
            return Err(CoreError::InsufficientXp {
                required: redemption.xp_spent,
                available: summary.spendable_xp,
            });
        }

        summary.spendable_xp -= redemption.xp_spent;
        summary.updated_at = redemption.redeemed_at;
        // 扣减与兑换记录同事务写入，不留下只扣不记的中间态
        let redemption_bytes = ser(redemption)?;
        let summary_bytes = ser(&summary)?;
        (&self.redemptions, &self.summaries)
            .transaction(|(redemptions, summaries)| {
                redemptions.insert(
                    redemption.redemption_id.as_slice(),
                    redemption_bytes.clone(),
                )?;
                summaries.insert(redemption.user_id.as_bytes(), summary_bytes.clone())?;
                Ok(())
            })
            .map_err(tx_err)?;
        Ok(summary)
    }

    async fn list_redemptions(&self, user_id: &UserId) -> CoreResult<Vec<Redemption>> {
        self.all_redemptions_for(user_id)
    }

    async fn get_pool(&self, week_index: u64) -> CoreResult<Option<WeeklyPool>> {
        self.load_pool(week_index)
    }

    async fn claim_pool(
        &self,
        week_index: u64,
        pool_amount: u64,
        owner: &str,
        lease_secs: u64,
        now: Timestamp,
    ) -> CoreResult<PoolClaim> {
        let _guard = self.lock()?;
        let mut pool = self
            .load_pool(week_index)?
            .unwrap_or_else(|| WeeklyPool::new(week_index, pool_amount));

        match pool.status {
            PoolStatus::Distributed => Ok(PoolClaim::AlreadyDistributed),
            PoolStatus::Distributing => {
                let holder = pool.claim_owner.clone().unwrap_or_default();
                let until = pool.claim_expires_at.unwrap_or_default();
                if holder != owner && now < until {
                    return Ok(PoolClaim::Busy { owner: holder, until });
                }
                pool.claim_owner = Some(owner.to_string());
                pool.claim_expires_at = Some(now.plus_secs(lease_secs));
                self.store_pool(&pool)?;
                Ok(PoolClaim::Claimed(pool))
            }
            PoolStatus::Open => {
                pool.status = PoolStatus::Distributing;
                pool.claim_owner = Some(owner.to_string());
                pool.claim_expires_at = Some(now.plus_secs(lease_secs));
                self.store_pool(&pool)?;
                Ok(PoolClaim::Claimed(pool))
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
        let _guard = self.lock()?;
        let mut pool = self
            .load_pool(week_index)?
            .ok_or_else(|| CoreError::Storage(format!("pool {} not found", week_index)))?;

        match pool.status {
            PoolStatus::Distributed => return Err(CoreError::AlreadyDistributed(week_index)),
            PoolStatus::Distributing if pool.claim_owner.as_deref() == Some(owner) => {}
            _ => {
                return Err(CoreError::Storage(format!(
                    "pool {} lease not held by {}",
                    week_index, owner
                )))
            }
        }

        for payout in payouts {
            let key = payout_key(week_index, &payout.user_id);
            if !self.payouts.contains_key(&key).map_err(sled_err)? {
                Self::put_tree(&self.payouts, &key, payout)?;
            }
        }
        let mut total = 0u64;
        for item in self.payouts.scan_prefix(week_index.to_be_bytes()) {
            let (_, bytes) = item.map_err(sled_err)?;
            let payout: PoolPayout = de(&bytes)?;
            total += payout.amount;
        }

        pool.status = PoolStatus::Distributed;
        pool.claim_owner = None;
        pool.claim_expires_at = None;
        pool.distributed_at = Some(now);
        pool.distributed_total = total;
        self.store_pool(&pool)?;
        Ok(pool)
    }

    async fn release_pool(&self, week_index: u64, owner: &str) -> CoreResult<()> {
        let _guard = self.lock()?;
        if let Some(mut pool) = self.load_pool(week_index)? {
            if pool.status == PoolStatus::Distributing
                && pool.claim_owner.as_deref() == Some(owner)
            {
                pool.status = PoolStatus::Open;
                pool.claim_owner = None;
                pool.claim_expires_at = None;
                self.store_pool(&pool)?;
            }
        }
        Ok(())
    }

    async fn list_payouts(&self, week_index: u64) -> CoreResult<Vec<PoolPayout>> {
        let mut out = Vec::new();
        for item in self.payouts.scan_prefix(week_index.to_be_bytes()) {
            let (_, bytes) = item.map_err(sled_err)?;
            out.push(de(&bytes)?);
        }
        Ok(out)
    }

    async fn get_stats(&self) -> CoreResult<StorageStats> {
        let mut pending_requests = 0u64;
        let mut settled_requests = 0u64;
        for item in self.requests.iter() {
            let (_, bytes) = item.map_err(sled_err)?;
            let request: PaymentRequest = de(&bytes)?;
            match request.status {
                RequestStatus::Pending => pending_requests += 1,
                RequestStatus::Settled => settled_requests += 1,
                RequestStatus::Expired => {}
            }
        }
        let mut distributed_pools = 0u64;
        for item in self.pools.iter() {
            let (_, bytes) = item.map_err(sled_err)?;
            let pool: WeeklyPool = de(&bytes)?;
            if pool.status == PoolStatus::Distributed {
                distributed_pools += 1;
            }
        }
        Ok(StorageStats {
            total_accounts: self.accounts.len() as u64,
            pending_requests,
            settled_requests,
            consumed_txs: self.consumed.len() as u64,
            total_awards: self.awards.len() as u64,
            total_redemptions: self.redemptions.len() as u64,
            distributed_pools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (SledStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        (storage, dir)
    }

    #[tokio::test]
    async fn test_settle_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let now = Timestamp::from_millis(1000);
        let tx = format!("0x{}", "ab".repeat(32));
        let request_id;

        {
            let storage = SledStorage::open(dir.path()).unwrap();
            let req = PaymentRequest::new(
                "agent_message".to_string(),
                "user-1".to_string(),
                1000,
                None,
                format!("0x{}", "aa".repeat(20)),
                31337,
                10,
                now,
                1800,
            );
            request_id = req.request_id;
            storage.save_request(&req).await.unwrap();
            let account = storage.settle_payment(&request_id, &tx, now).await.unwrap();
            assert_eq!(account.prepaid_credits, 10);
        }

        // 重新打开后重放防护仍然生效
        let storage = SledStorage::open(dir.path()).unwrap();
        assert!(storage.is_tx_consumed(&tx).await.unwrap());
        let stored = storage.get_request(&request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Settled);
    }

    #[tokio::test]
    async fn test_rejected_settle_leaves_no_partial_state() {
        let (storage, _dir) = open_temp();
        let now = Timestamp::from_millis(1000);
        let tx = format!("0x{}", "ab".repeat(32));
        let request = |user: &str| {
            PaymentRequest::new(
                "agent_message".to_string(),
                user.to_string(),
                1000,
                None,
                format!("0x{}", "aa".repeat(20)),
                31337,
                10,
                now,
                1800,
            )
        };

        let first = request("user-1");
        let second = request("user-2");
        storage.save_request(&first).await.unwrap();
        storage.save_request(&second).await.unwrap();
        storage.settle_payment(&first.request_id, &tx, now).await.unwrap();

        let err = storage
            .settle_payment(&second.request_id, &tx, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyConsumed(_)));

        // 事务回滚：第二个请求仍然待支付，账户没有入账
        let stored = storage.get_request(&second.request_id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert!(storage
            .get_account(&"user-2".to_string(), "agent_message")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_free_use_and_credit_flow() {
        let (storage, _dir) = open_temp();
        let now = Timestamp::from_millis(1000);
        let user = "user-1".to_string();
        let res = "agent_message";

        assert_eq!(
            storage.take_free_use(&user, res, 2, now).await.unwrap(),
            Some(1)
        );
        assert_eq!(
            storage.take_free_use(&user, res, 2, now).await.unwrap(),
            Some(0)
        );
        assert_eq!(storage.take_free_use(&user, res, 2, now).await.unwrap(), None);
        // 其他资源的免费额度互不影响
        assert_eq!(
            storage.take_free_use(&user, "listing", 2, now).await.unwrap(),
            Some(1)
        );
        // 次日额度重置
        let tomorrow = Timestamp::from_millis(now.0 + MILLIS_PER_DAY);
        assert_eq!(
            storage
                .take_free_use(&user, res, 2, tomorrow)
                .await
                .unwrap(),
            Some(1)
        );
        assert_eq!(storage.take_credit(&user, res, now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_payout_prefix_scan() {
        let (storage, _dir) = open_temp();
        let now = Timestamp::from_millis(1000);

        let claim = storage
            .claim_pool(7, 50_000, "worker", 300, now)
            .await
            .unwrap();
        assert!(matches!(claim, PoolClaim::Claimed(_)));

        let payouts: Vec<PoolPayout> = ["alice", "bob"]
            .iter()
            .map(|u| PoolPayout {
                week_index: 7,
                user_id: u.to_string(),
                xp_in_week: 100,
                amount: 25_000,
                paid_at: now,
            })
            .collect();
        storage.finish_pool(7, "worker", &payouts, now).await.unwrap();

        assert_eq!(storage.list_payouts(7).await.unwrap().len(), 2);
        assert!(storage.list_payouts(8).await.unwrap().is_empty());
    }
}
