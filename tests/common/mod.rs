// Shared fixtures for perflab integration tests
#![allow(dead_code)]

use indoc::indoc;
use perflab::config::PerflabConfig;
use perflab::AnalysisEngine;

pub const IN_MEMORY_STORE: &str = indoc! {r#"
    store = {}
    def put(k, v): store[k] = v
    def get(k): return store.get(k, "missing")
"#};

pub const DATABASE_STORE: &str = indoc! {r#"
    import sqlite3

    def init():
        conn = sqlite3.connect(":memory:")
        cur = conn.cursor()
        cur.execute("CREATE TABLE IF NOT EXISTS items (k TEXT PRIMARY KEY, v TEXT)")
        conn.commit()

    def put(k, v):
        conn = sqlite3.connect(":memory:")
        conn.execute("INSERT INTO items VALUES (?, ?)", (k, v))
        conn.commit()
"#};

pub const CACHING_STORE: &str = indoc! {r#"
    import redis

    cache = redis.Redis(host="localhost", port=6379)

    def put(k, v):
        cache.setex(k, 60, v)

    def get(k):
        return cache.get(k)
"#};

pub const HYBRID_STORE: &str = indoc! {r#"
    import sqlite3
    import redis

    cache = redis.Redis()
    db = sqlite3.connect("items.db")

    def get(k):
        hit = cache.get(k)
        if hit is not None:
            return hit
        row = db.execute("SELECT v FROM items WHERE k = ?", (k,)).fetchone()
        return row

    def put(k, v):
        db.execute("INSERT INTO items (k, v) VALUES (?, ?)", (k, v))
        db.commit()
        cache.setex(k, 300, v)
"#};

/// One snippet per anti-pattern rule that fires without a diagram.
pub const PERFORMANCE_ISSUES: &str = indoc! {r#"
    import time
    import sqlite3
    from datetime import datetime

    sessions = {}

    def record(user, payload):
        started = datetime.now()
        sessions[user] = payload
        time.sleep(0.5)
        finished = datetime.now()
        return finished - started

    def lookup(name):
        conn = sqlite3.connect("users.db")
        return conn.execute(f"SELECT * FROM users WHERE name = '{name}'").fetchall()

    def report(rows):
        text = ""
        for row in rows:
            text += str(row)
        return text
"#};

/// Runs cleanly in the sandbox: pure functions, no I/O.
pub const FAST_FUNCTIONS: &str = indoc! {r#"
    def add(a, b):
        return a + b

    def greet(name):
        return "hello " + str(name)
"#};

pub const RAISING_FUNCTION: &str = indoc! {r#"
    def explode(key):
        raise ValueError("boom")
"#};

pub const HANGING_FUNCTION: &str = indoc! {r#"
    import time

    def wait_forever():
        time.sleep(60)
"#};

/// Fails when module state or sandbox files survive from an earlier run.
pub const STATEFUL_FUNCTION: &str = indoc! {r#"
    import os

    seen = {}

    def visit():
        if seen or os.path.exists("visited.marker"):
            raise RuntimeError("state leaked from an earlier run")
        seen["visited"] = True
        with open("visited.marker", "w") as handle:
            handle.write("1")
"#};

pub fn engine() -> AnalysisEngine {
    AnalysisEngine::new(&PerflabConfig::default())
}

/// Engine with short fan-out durations so executor tests stay quick.
pub fn fast_engine() -> AnalysisEngine {
    let mut config = PerflabConfig::default();
    config.recommender.concurrency_users = 2;
    config.recommender.concurrency_duration_secs = 0.5;
    config.recommender.load_users = 3;
    config.recommender.load_duration_secs = 0.5;
    config.recommender.memory_data_size = 50;
    config.executor.timeout_secs = 20.0;
    config.executor.max_calls = 200;
    AnalysisEngine::new(&config)
}

/// True when a Python interpreter is installed; executor tests skip otherwise.
pub fn python_available() -> bool {
    let python = std::env::var(perflab::config::PYTHON_ENV_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| "python3".to_string());
    which::which(python).is_ok()
}
