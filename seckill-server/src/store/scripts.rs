//! Server-side Lua scripts

/// Stock gate
///
/// KEYS[1] stock counter, KEYS[2] admission set, KEYS[3] order stream
/// ARGV[1] voucher id, ARGV[2] user id, ARGV[3] order id
///
/// The admission check runs before the stock check so a repeat buyer always
/// sees "already admitted", even once stock has run out.
pub const SECKILL: &str = r#"
local stock = redis.call('get', KEYS[1])
if not stock then
    return 3
end
if redis.call('sismember', KEYS[2], ARGV[2]) == 1 then
    return 2
end
if tonumber(stock) <= 0 then
    return 1
end
redis.call('incrby', KEYS[1], -1)
redis.call('sadd', KEYS[2], ARGV[2])
redis.call('xadd', KEYS[3], '*', 'userId', ARGV[2], 'voucherId', ARGV[1], 'id', ARGV[3])
return 0
"#;

/// Compare-and-delete
///
/// KEYS[1] lock key, ARGV[1] expected holder id
pub const UNLOCK: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
end
return 0
"#;
