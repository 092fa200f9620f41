//! Catalog of call signatures the scanner recognizes.
//!
//! Each entry maps a qualified callee suffix to a [`CallCategory`]. Callee
//! names are resolved through the submission's import aliases before
//! matching, so `from time import sleep; sleep(1)` and `time.sleep(1)` hit
//! the same entry.

use super::facts::CallCategory;
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Resolved callee equals the pattern or ends with `.pattern`
    Qualified,
    /// Method name on any receiver, e.g. `.execute`
    Method,
    /// Method called with an empty argument list, e.g. `thread.join()`
    MethodNoArgs,
    /// Bare builtin name; `form.input()` is a different function
    Builtin,
}

#[derive(Debug, Clone, Copy)]
pub struct CallSignature {
    pub category: CallCategory,
    pub pattern: &'static str,
    pub kind: MatchKind,
}

const fn qualified(category: CallCategory, pattern: &'static str) -> CallSignature {
    CallSignature {
        category,
        pattern,
        kind: MatchKind::Qualified,
    }
}

const fn builtin(category: CallCategory, pattern: &'static str) -> CallSignature {
    CallSignature {
        category,
        pattern,
        kind: MatchKind::Builtin,
    }
}

const fn method(category: CallCategory, pattern: &'static str) -> CallSignature {
    CallSignature {
        category,
        pattern,
        kind: MatchKind::Method,
    }
}

const fn method_no_args(category: CallCategory, pattern: &'static str) -> CallSignature {
    CallSignature {
        category,
        pattern,
        kind: MatchKind::MethodNoArgs,
    }
}

use CallCategory::*;

pub static CALL_SIGNATURES: &[CallSignature] = &[
    qualified(WallClockNow, "datetime.now"),
    qualified(WallClockNow, "datetime.utcnow"),
    qualified(WallClockNow, "datetime.today"),
    qualified(WallClockNow, "time.time"),
    qualified(WallClockNow, "time.time_ns"),
    qualified(BlockingWait, "time.sleep"),
    qualified(BlockingWait, "requests.get"),
    qualified(BlockingWait, "requests.post"),
    qualified(BlockingWait, "requests.put"),
    qualified(BlockingWait, "requests.delete"),
    qualified(BlockingWait, "requests.patch"),
    qualified(BlockingWait, "requests.request"),
    qualified(BlockingWait, "urllib.request.urlopen"),
    qualified(BlockingWait, "subprocess.run"),
    qualified(BlockingWait, "subprocess.call"),
    qualified(BlockingWait, "subprocess.check_call"),
    qualified(BlockingWait, "subprocess.check_output"),
    qualified(BlockingWait, "os.system"),
    builtin(BlockingWait, "input"),
    method_no_args(BlockingWait, "join"),
    method_no_args(BlockingWait, "wait"),
    qualified(DbConnect, "sqlite3.connect"),
    qualified(DbConnect, "psycopg2.connect"),
    qualified(DbConnect, "pymysql.connect"),
    qualified(DbConnect, "mysql.connector.connect"),
    qualified(DbConnect, "MySQLdb.connect"),
    qualified(DbConnect, "sqlalchemy.create_engine"),
    qualified(DbConnect, "pymongo.MongoClient"),
    qualified(CacheClientInit, "redis.Redis"),
    qualified(CacheClientInit, "redis.StrictRedis"),
    qualified(CacheClientInit, "redis.from_url"),
    qualified(CacheClientInit, "memcache.Client"),
    qualified(CacheClientInit, "pymemcache.Client"),
    qualified(CacheClientInit, "pymemcache.client.base.Client"),
    qualified(CacheClientInit, "cachetools.TTLCache"),
    qualified(CacheClientInit, "cachetools.LRUCache"),
    method(DbCursor, "cursor"),
    method(DbCursor, "execute"),
    method(DbCursor, "executemany"),
    method(DbCursor, "executescript"),
    method(DbCursor, "commit"),
    method(DbCursor, "rollback"),
    method(DbCursor, "fetchone"),
    method(DbCursor, "fetchall"),
    method(DbCursor, "fetchmany"),
];

/// Methods of a cache client that read entries
pub const CACHE_READ_METHODS: &[&str] = &[
    "get", "mget", "hget", "hgetall", "exists", "ttl", "lrange", "smembers", "keys",
];

/// Methods of a cache client that write entries
pub const CACHE_WRITE_METHODS: &[&str] = &[
    "set", "setex", "psetex", "setnx", "mset", "hset", "hmset", "incr", "decr", "lpush",
    "rpush", "sadd", "zadd", "add", "replace", "expire", "delete",
];

/// Writes that always carry an expiry
pub const TTL_METHODS: &[&str] = &["setex", "psetex", "expire"];

/// Keyword arguments that attach an expiry to a plain write
pub static TTL_KWARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:ex|px|exat|pxat|ttl|timeout|expire|time)\s*=").unwrap());

/// Import roots that indicate a database driver or ORM
pub const DATABASE_MODULES: &[&str] = &[
    "sqlite3",
    "psycopg2",
    "psycopg",
    "pymysql",
    "mysql",
    "MySQLdb",
    "sqlalchemy",
    "pymongo",
    "peewee",
    "asyncpg",
    "aiosqlite",
    "django.db",
];

/// Import roots that indicate an external or library cache
pub const CACHE_MODULES: &[&str] = &[
    "redis",
    "memcache",
    "pymemcache",
    "cachetools",
    "aiocache",
    "diskcache",
];

/// Python keywords that can precede `(` without being a call
pub const NON_CALL_KEYWORDS: &[&str] = &[
    "if", "elif", "while", "for", "return", "and", "or", "not", "in", "is", "yield", "assert",
    "del", "with", "as", "lambda", "await", "except", "raise", "from", "import",
    "else", "case", "match",
];

pub static CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z_]\w*(?:\s*\.\s*[A-Za-z_]\w*)*)\s*\(").unwrap());

pub static IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+(.+)$").unwrap());

pub static FROM_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^from\s+(\.*[\w.]*)\s+import\s+(.+)$").unwrap());

pub static DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\((.*)\)\s*(?:->[^:]*)?:").unwrap()
});

pub static CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").unwrap());

pub static LOOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?(?:for|while)\b").unwrap());

pub static GLOBAL_DECL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^global\s+(.+)$").unwrap());

/// `name = rhs` or `name: T = rhs`, not `==`
pub static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][\w.]*)\s*(?::[^=]+)?=\s*([^=].*)$").unwrap()
});

pub static AUGMENTED_CONCAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*\+=\s*(.+)$").unwrap());

pub static SELF_CONCAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][\w.]*)\s*=\s*([A-Za-z_][\w.]*)\s*\+\s*(.+)$").unwrap()
});

pub static INDEXED_WRITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])([A-Za-z_]\w*)\s*\[[^\]]*\]\s*(?:[-+*/|&]?=)(?:[^=]|$)").unwrap()
});

pub static MUTATING_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^\w.])([A-Za-z_]\w*)\s*\.\s*(?:append|appendleft|add|update|setdefault|extend|insert)\s*\(",
    )
    .unwrap()
});

pub static EVICTING_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^\w.])([A-Za-z_]\w*)\s*\.\s*(?:pop|popitem|popleft|clear|remove|discard)\s*\(",
    )
    .unwrap()
});

pub static DEL_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdel\s+([A-Za-z_]\w*)\s*\[").unwrap());

pub static SIZE_CHECK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\blen\s*\(\s*([A-Za-z_]\w*)\s*\)\s*(?:>=|<=|==|>|<)").unwrap()
});

pub static GET_READ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\w.])([A-Za-z_]\w*)\s*\.\s*get\s*\(").unwrap()
});

pub static PERCENT_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:""|'')\s*%\s*[\w(\[{]"#).unwrap());

pub static SQL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(select\s.+\sfrom\b|insert\s+(?:or\s+\w+\s+)?into\b|update\s+\w+\s+set\b|delete\s+from\b|create\s+(?:table|index|unique\s+index)\b|drop\s+table\b|alter\s+table\b|replace\s+into\b)",
    )
    .unwrap()
});

/// Match a resolved callee against one catalog entry.
pub fn matches(signature: &CallSignature, resolved: &str, method_name: &str, args: &str) -> bool {
    match signature.kind {
        MatchKind::Qualified => {
            resolved == signature.pattern
                || resolved
                    .strip_suffix(signature.pattern)
                    .is_some_and(|head| head.ends_with('.'))
        }
        MatchKind::Method => resolved.contains('.') && method_name == signature.pattern,
        MatchKind::MethodNoArgs => {
            resolved.contains('.') && method_name == signature.pattern && args.trim().is_empty()
        }
        MatchKind::Builtin => {
            resolved == signature.pattern
                || resolved.strip_prefix("builtins.") == Some(signature.pattern)
        }
    }
}
