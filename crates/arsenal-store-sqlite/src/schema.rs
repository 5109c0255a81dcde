//! SQL schema for the Arsenal SQLite store.
//!
//! Column layout and `datetime('now')` timestamps stay compatible with
//! existing catalogue files. Older files declared `user_interests` and
//! `weapon_similarities` without cascading foreign keys;
//! [`crate::integrity::upgrade_dependents`] rebuilds those two tables on open.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// `PRAGMA foreign_keys` is not set here; it is set per connection by
/// `SqliteStore::open_with` according to `StoreOptions`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS weapons (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL,            -- not unique
    type             TEXT NOT NULL,            -- matches categories.name
    country          TEXT NOT NULL,            -- matches countries.name
    year             INTEGER,
    description      TEXT,
    specifications   TEXT DEFAULT '{}',        -- JSON object
    images           TEXT DEFAULT '[]',        -- JSON array
    performance_data TEXT DEFAULT '{}',        -- JSON object
    created_at       DATETIME DEFAULT (datetime('now')),
    updated_at       DATETIME DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS manufacturers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    country     TEXT,
    founded     INTEGER,
    description TEXT,
    created_at  DATETIME DEFAULT (datetime('now')),
    updated_at  DATETIME DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS weapon_manufacturers (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    weapon_id       INTEGER NOT NULL,
    manufacturer_id INTEGER NOT NULL,
    created_at      DATETIME DEFAULT (datetime('now')),
    FOREIGN KEY (weapon_id)       REFERENCES weapons(id)       ON DELETE CASCADE,
    FOREIGN KEY (manufacturer_id) REFERENCES manufacturers(id) ON DELETE CASCADE,
    UNIQUE (weapon_id, manufacturer_id)
);

CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS countries (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    code TEXT
);

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,               -- argon2 PHC string
    name          TEXT,
    phone         TEXT,
    bio           TEXT,
    avatar        TEXT,
    role          TEXT NOT NULL DEFAULT 'user',     -- 'user' | 'admin'
    status        TEXT NOT NULL DEFAULT 'active',   -- 'active' | 'disabled'
    preferences   TEXT DEFAULT '{\"theme\":\"light\",\"language\":\"zh-cn\"}',
    created_at    DATETIME DEFAULT (datetime('now')),
    updated_at    DATETIME DEFAULT (datetime('now')),
    last_login    DATETIME
);

-- Bearer sessions. Only the SHA-256 digest of a token is ever stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,                  -- RFC 3339 UTC
    expires_at TEXT NOT NULL                   -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS user_interests (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL REFERENCES users(id)   ON DELETE CASCADE,
    weapon_id        INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    interaction_type TEXT NOT NULL DEFAULT 'view',          -- 'view' | 'favorite'
    count            INTEGER NOT NULL DEFAULT 1,
    created_at       DATETIME DEFAULT (datetime('now')),
    updated_at       DATETIME DEFAULT (datetime('now')),
    UNIQUE (user_id, weapon_id)
);

-- Recommendation side tables; populated ad hoc, never written by the API.
CREATE TABLE IF NOT EXISTS weapon_similarities (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    weapon_id         INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    similar_weapon_id INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    similarity_score  REAL,
    reason            TEXT,
    created_at        DATETIME DEFAULT (datetime('now')),
    UNIQUE (weapon_id, similar_weapon_id)
);

CREATE TABLE IF NOT EXISTS qa_records (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER REFERENCES users(id) ON DELETE SET NULL,
    question   TEXT NOT NULL,
    answer     TEXT,
    created_at DATETIME DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS weapons_type_idx    ON weapons(type);
CREATE INDEX IF NOT EXISTS weapons_country_idx ON weapons(country);
CREATE INDEX IF NOT EXISTS weapons_name_idx    ON weapons(name);
CREATE INDEX IF NOT EXISTS wm_weapon_idx       ON weapon_manufacturers(weapon_id);
CREATE INDEX IF NOT EXISTS wm_manufacturer_idx ON weapon_manufacturers(manufacturer_id);
CREATE INDEX IF NOT EXISTS sessions_user_idx   ON sessions(user_id);

PRAGMA user_version = 2;
";

/// DDL for the join table alone, used when [`crate::integrity`] rebuilds it.
pub const WEAPON_MANUFACTURERS: &str = "
CREATE TABLE weapon_manufacturers (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    weapon_id       INTEGER NOT NULL,
    manufacturer_id INTEGER NOT NULL,
    created_at      DATETIME DEFAULT (datetime('now')),
    FOREIGN KEY (weapon_id)       REFERENCES weapons(id)       ON DELETE CASCADE,
    FOREIGN KEY (manufacturer_id) REFERENCES manufacturers(id) ON DELETE CASCADE,
    UNIQUE (weapon_id, manufacturer_id)
);
CREATE INDEX IF NOT EXISTS wm_weapon_idx       ON weapon_manufacturers(weapon_id);
CREATE INDEX IF NOT EXISTS wm_manufacturer_idx ON weapon_manufacturers(manufacturer_id);
";

/// `user_interests` alone, for [`crate::integrity::upgrade_dependents`].
pub const USER_INTERESTS: &str = "
CREATE TABLE user_interests (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id          INTEGER NOT NULL REFERENCES users(id)   ON DELETE CASCADE,
    weapon_id        INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    interaction_type TEXT NOT NULL DEFAULT 'view',
    count            INTEGER NOT NULL DEFAULT 1,
    created_at       DATETIME DEFAULT (datetime('now')),
    updated_at       DATETIME DEFAULT (datetime('now')),
    UNIQUE (user_id, weapon_id)
);
";

/// `weapon_similarities` alone, for [`crate::integrity::upgrade_dependents`].
pub const WEAPON_SIMILARITIES: &str = "
CREATE TABLE weapon_similarities (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    weapon_id         INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    similar_weapon_id INTEGER NOT NULL REFERENCES weapons(id) ON DELETE CASCADE,
    similarity_score  REAL,
    reason            TEXT,
    created_at        DATETIME DEFAULT (datetime('now')),
    UNIQUE (weapon_id, similar_weapon_id)
);
";
