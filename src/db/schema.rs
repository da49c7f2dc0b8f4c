//! Database schema

/// SQL schema for initialization. Both tables are append-only: nothing in
/// the crate issues an UPDATE or DELETE against them.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS neural_states (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    state_count     INTEGER NOT NULL,
    updated_at      TEXT    NOT NULL,
    motor_neurons   TEXT    NOT NULL,
    sensory_neurons TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_neural_states_updated_at ON neural_states(updated_at);

CREATE TABLE IF NOT EXISTS prompts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    neural_state_id INTEGER NOT NULL,
    question        TEXT    NOT NULL,
    response        TEXT    NOT NULL,
    completed_at    TEXT    NOT NULL,

    FOREIGN KEY (neural_state_id) REFERENCES neural_states(id)
);

CREATE INDEX IF NOT EXISTS idx_prompts_neural_state_id ON prompts(neural_state_id);
"#;
