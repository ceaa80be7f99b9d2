pub const USERS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Users (
        username             TEXT        PRIMARY KEY,

        total_score          INTEGER     NOT NULL    DEFAULT 0,
        total_sessions       INTEGER     NOT NULL    DEFAULT 0,

        current_streak       INTEGER     NOT NULL    DEFAULT 0,
        max_streak           INTEGER     NOT NULL    DEFAULT 0,
        last_qualifying_date TEXT,

        league               TEXT        NOT NULL,
        version              INTEGER     NOT NULL    DEFAULT 0
    )";

pub const SESSIONS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Sessions (
        id             INTEGER     PRIMARY KEY,
        username       TEXT        NOT NULL    REFERENCES Users(username),

        problem_rating REAL        NOT NULL,
        total_time     REAL        NOT NULL,
        comments       TEXT,

        score          INTEGER     NOT NULL,
        streak_bonus   INTEGER     NOT NULL,

        created_at     INTEGER     NOT NULL
    )";

pub const SESSIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS SessionsByUser ON Sessions (username, created_at)";

pub const LAPS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS Laps (
        session_id       INTEGER     NOT NULL    REFERENCES Sessions(id),
        position         INTEGER     NOT NULL,

        name             TEXT        NOT NULL,
        duration_seconds REAL        NOT NULL,
        comment          TEXT,

        UNIQUE (session_id, position)
    )";
