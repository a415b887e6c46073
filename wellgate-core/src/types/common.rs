//! 通用类型定义
//!
//! 包含各模块共享的基础类型。

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 32字节摘要类型
pub type Digest32 = [u8; 32];

/// 支付请求ID类型
pub type RequestId = Digest32;

/// XP 记账ID类型
pub type AwardId = Digest32;

/// 兑换记录ID类型
pub type RedemptionId = Digest32;

/// 用户ID类型
pub type UserId = String;

/// 链上交易哈希（规范化为小写 0x 前缀十六进制）
pub type TxHash = String;

/// 链上地址（规范化为小写 0x 前缀十六进制）
pub type Address = String;

/// 一天的毫秒数
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// 一周的毫秒数
pub const MILLIS_PER_WEEK: u64 = 7 * MILLIS_PER_DAY;

/// Unix 纪元（1970-01-01 为周四）到第一个周一的天数偏移
const EPOCH_MONDAY_OFFSET_DAYS: u64 = 4;

/// 时间戳类型（Unix毫秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// 获取当前时间戳
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis().max(0) as u64)
    }

    /// 从毫秒创建
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// 转换为毫秒
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// 从秒创建，秒数来自外部输入时溢出饱和处理
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    /// 是否为零
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 加上若干秒
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs.saturating_mul(1000)))
    }

    /// 格式化为 RFC 3339（日志与审计输出）
    pub fn to_rfc3339(&self) -> String {
        match Utc.timestamp_millis_opt(self.0 as i64) {
            chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
            _ => self.0.to_string(),
        }
    }

    /// 所属 UTC 日索引
    pub fn day_index(&self) -> u64 {
        self.0 / MILLIS_PER_DAY
    }

    /// 所属周索引（周一 00:00 UTC 为一周起点）
    pub fn week_index(&self) -> u64 {
        let days = self.0 / MILLIS_PER_DAY;
        (days + 7 - EPOCH_MONDAY_OFFSET_DAYS) / 7
    }
}

/// 周窗口的起始时间戳（周一 00:00 UTC）
pub fn week_start(week_index: u64) -> Timestamp {
    let days = (week_index * 7 + EPOCH_MONDAY_OFFSET_DAYS).saturating_sub(7);
    Timestamp(days * MILLIS_PER_DAY)
}

/// 周窗口的结束时间戳（下周一 00:00 UTC，不含）
pub fn week_end(week_index: u64) -> Timestamp {
    Timestamp(week_start(week_index).0 + MILLIS_PER_WEEK)
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 生成随机 ID
pub fn generate_random_id() -> Digest32 {
    let mut hasher = Sha256::new();

    // 使用时间戳和随机数
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    hasher.update(timestamp.to_le_bytes());

    let nonce: u64 = rand::random();
    hasher.update(nonce.to_le_bytes());

    // 添加进程 ID
    hasher.update(std::process::id().to_le_bytes());

    // 添加线程 ID 的哈希
    let thread_id = format!("{:?}", std::thread::current().id());
    hasher.update(thread_id.as_bytes());

    let result = hasher.finalize();
    let mut id = [0u8; 32];
    id.copy_from_slice(&result);
    id
}

/// 计算摘要
pub fn compute_digest(data: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// 将摘要转换为十六进制字符串
pub fn digest_to_hex(digest: &Digest32) -> String {
    hex::encode(digest)
}

/// 从十六进制字符串解析摘要
pub fn digest_from_hex(hex_str: &str) -> Result<Digest32, hex::FromHexError> {
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&bytes);
    Ok(digest)
}

/// 规范化交易哈希
///
/// 要求 0x 前缀、64 位十六进制，返回小写形式。
pub fn normalize_tx_hash(raw: &str) -> CoreResult<TxHash> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CoreError::MalformedTxHash(raw.to_string()))?;
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::MalformedTxHash(raw.to_string()));
    }
    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

/// 规范化链上地址
///
/// 要求 0x 前缀、40 位十六进制，返回小写形式。
pub fn normalize_address(raw: &str) -> CoreResult<Address> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| CoreError::InvalidAddress(raw.to_string()))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::InvalidAddress(raw.to_string()));
    }
    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

/// 解析十六进制数量（0x 前缀）为 u128
pub fn parse_hex_u128(raw: &str) -> CoreResult<u128> {
    let hex_part = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| CoreError::InvalidInput(format!("expected 0x-prefixed hex: {}", raw)))?;
    u128::from_str_radix(hex_part, 16)
        .map_err(|e| CoreError::InvalidInput(format!("invalid hex quantity {}: {}", raw, e)))
}

/// 解析十六进制数量（0x 前缀）为 u64
pub fn parse_hex_u64(raw: &str) -> CoreResult<u64> {
    let hex_part = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| CoreError::InvalidInput(format!("expected 0x-prefixed hex: {}", raw)))?;
    u64::from_str_radix(hex_part, 16)
        .map_err(|e| CoreError::InvalidInput(format!("invalid hex quantity {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_id_unique() {
        let a = generate_random_id();
        let b = generate_random_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_secs_saturates_on_huge_input() {
        // 区块时间戳来自节点响应，不可信也不得让进程崩溃
        assert_eq!(Timestamp::from_secs(u64::MAX).0, u64::MAX);
        assert_eq!(Timestamp::from_secs(2).0, 2000);
        assert_eq!(Timestamp::from_millis(u64::MAX).plus_secs(60).0, u64::MAX);
    }

    #[test]
    fn test_normalize_tx_hash() {
        let raw = format!("0x{}", "AB".repeat(32));
        let normalized = normalize_tx_hash(&raw).unwrap();
        assert_eq!(normalized, format!("0x{}", "ab".repeat(32)));

        assert!(normalize_tx_hash("0x1234").is_err());
        assert!(normalize_tx_hash(&"ab".repeat(32)).is_err());
        assert!(normalize_tx_hash(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn test_normalize_address() {
        let raw = format!("0X{}", "Cd".repeat(20));
        let normalized = normalize_address(&raw).unwrap();
        assert_eq!(normalized, format!("0x{}", "cd".repeat(20)));
        assert!(normalize_address("0xabc").is_err());
    }

    #[test]
    fn test_parse_hex_quantities() {
        assert_eq!(parse_hex_u128("0xde0b6b3a7640000").unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert!(parse_hex_u128("1234").is_err());
    }

    #[test]
    fn test_week_index_monday_boundary() {
        // 1970-01-05（周一）是第一个完整周的起点
        let monday = Timestamp(EPOCH_MONDAY_OFFSET_DAYS * MILLIS_PER_DAY);
        let sunday_before = Timestamp(monday.0 - 1);
        assert_eq!(monday.week_index(), sunday_before.week_index() + 1);

        // 2024-01-01 是周一
        let jan_1_2024 = Timestamp(1_704_067_200_000);
        let just_before = Timestamp(jan_1_2024.0 - 1);
        assert_eq!(jan_1_2024.week_index(), just_before.week_index() + 1);
    }

    #[test]
    fn test_week_start_end_roundtrip() {
        let now = Timestamp(1_704_067_200_000 + 3 * MILLIS_PER_DAY);
        let idx = now.week_index();
        let start = week_start(idx);
        let end = week_end(idx);
        assert!(start <= now && now < end);
        assert_eq!(end.0 - start.0, MILLIS_PER_WEEK);
        assert_eq!(start.week_index(), idx);
        assert_eq!(Timestamp(end.0 - 1).week_index(), idx);
        assert_eq!(end.week_index(), idx + 1);
    }
}
