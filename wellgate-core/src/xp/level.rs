//! 等级计算
//!
//! 等级完全由终身累计 XP 决定：level = floor(sqrt(total_xp / 100))。
//! 升到 n 级所需 XP 为 n^2 * 100。

/// 整数平方根（向下取整）
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// 终身累计 XP 对应的等级
pub fn level_for_xp(total_xp: u64) -> u32 {
    isqrt(total_xp / 100) as u32
}

/// 升到指定等级所需的终身累计 XP
pub fn xp_for_level(level: u32) -> u64 {
    (level as u64) * (level as u64) * 100
}

/// 距离下一等级还差多少 XP
pub fn xp_to_next_level(total_xp: u64) -> u64 {
    let next = level_for_xp(total_xp) + 1;
    xp_for_level(next).saturating_sub(total_xp)
}
