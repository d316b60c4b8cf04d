//! Diesel schema (hand-written; replaceable with `diesel print-schema`).
//!
//! Tables:
//! - `action_log`: append-only invocation/completion records, one row per
//!   `ActionRecord`, ordered by `(ts, id)`.
//! - `action_edges`: explicit causal edges (`parent -> child`) alongside
//!   `action_log.parent`, so the trace tools never have to re-derive them.
//! - `relations`: the durable backing for `Storage` — one row per
//!   `(relation, key)`.

diesel::table! {
    action_log (id) {
        id -> Uuid,
        kind -> Text,
        concept -> Text,
        action -> Text,
        input -> Jsonb,
        variant -> Nullable<Text>,
        output -> Nullable<Jsonb>,
        flow -> Uuid,
        sync -> Nullable<Text>,
        ts -> Timestamptz,
        parent -> Nullable<Uuid>,
    }
}

diesel::table! {
    action_edges (parent, child) {
        parent -> Uuid,
        child -> Uuid,
    }
}

diesel::table! {
    relations (relation, key) {
        relation -> Text,
        key -> Text,
        value -> Jsonb,
        updated_at -> Timestamptz,
        written_by -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(action_log, action_edges, relations,);
