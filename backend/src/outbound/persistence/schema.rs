//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes a table, update the matching block here (or regenerate
//! with `diesel print-schema`).

diesel::table! {
    /// Durable per-account progression state.
    accounts (id) {
        id -> Uuid,
        display_name -> Varchar,
        /// Monotonic experience total.
        xp -> Int8,
        /// Always written in the same statement as `xp`.
        rank_level -> Int2,
        currency -> Int8,
        energy -> Int4,
        /// Recovery anchor; null until energy is first spent.
        energy_updated_at -> Nullable<Timestamptz>,
        unlimited_energy_until -> Nullable<Timestamptz>,
        checkin_streak -> Int4,
        last_checkin_on -> Nullable<Date>,
        owned_items -> Array<Text>,
        inventory -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Loosely typed unlock documents, one per played mode.
    unlock_states (account_id, mode) {
        account_id -> Uuid,
        mode -> Text,
        state -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only session log.
    game_sessions (id) {
        id -> Uuid,
        account_id -> Uuid,
        mode -> Text,
        depth -> Int4,
        rounds -> Int4,
        score -> Int8,
        accuracy -> Float8,
        /// Client-reported score, kept for audit only.
        reported_score -> Nullable<Float8>,
        config -> Jsonb,
        avg_reaction_time_ms -> Nullable<Float8>,
        correct_count -> Int4,
        incorrect_count -> Int4,
        missed_count -> Int4,
        duration_ms -> Int8,
        mode_specific_details -> Nullable<Jsonb>,
        xp_earned -> Int8,
        currency_earned -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-account, per-UTC-day rollup feeding the weekly board.
    daily_activity (account_id, activity_date) {
        account_id -> Uuid,
        activity_date -> Date,
        xp_earned -> Int8,
        session_count -> Int4,
    }
}

diesel::table! {
    /// Stored settlement responses keyed by idempotency key.
    settlement_receipts (account_id, idempotency_key) {
        idempotency_key -> Uuid,
        account_id -> Uuid,
        payload_hash -> Bytea,
        response_snapshot -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Cached board payloads; always reconstructible.
    leaderboard_snapshots (kind, scope) {
        kind -> Text,
        scope -> Text,
        computed_at -> Timestamptz,
        payload -> Jsonb,
    }
}

diesel::table! {
    /// Externally owned key/value configuration.
    feature_config (key) {
        key -> Text,
        value -> Jsonb,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(unlock_states -> accounts (account_id));
diesel::joinable!(game_sessions -> accounts (account_id));
diesel::joinable!(daily_activity -> accounts (account_id));
diesel::joinable!(settlement_receipts -> accounts (account_id));

diesel::allow_tables_to_appear_in_same_query!(
    accounts,
    unlock_states,
    game_sessions,
    daily_activity,
    settlement_receipts,
    leaderboard_snapshots,
    feature_config,
);
