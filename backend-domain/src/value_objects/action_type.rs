// Action type tags
// Action types travel as strings on the wire; the named constants cover the
// structurally significant ones

pub mod action {
    pub const SESSION_START: &str = "SESSION_START";
    pub const SESSION_END: &str = "SESSION_END";
    pub const PLAYER_KILLED: &str = "PLAYER_KILLED";
    pub const PLAYER_REPORTED: &str = "PLAYER_REPORTED";
    pub const PLAYER_VIOLATION: &str = "PLAYER_VIOLATION";
    pub const WEAPON_FIRED: &str = "WEAPON_FIRED";
    pub const PLAYER_ATTACK: &str = "PLAYER_ATTACK";
    pub const PLAYER_TICK: &str = "PLAYER_TICK";
}

/// The fixed set of action types whose occurrence is inherently significant.
pub fn default_always_store_actions() -> Vec<String> {
    vec![
        action::SESSION_START.to_string(),
        action::SESSION_END.to_string(),
        action::PLAYER_KILLED.to_string(),
        action::PLAYER_REPORTED.to_string(),
        action::PLAYER_VIOLATION.to_string(),
    ]
}

pub fn default_tracked_metrics() -> Vec<String> {
    vec![
        "shots".to_string(),
        "hits".to_string(),
        "headshots".to_string(),
        "damage".to_string(),
    ]
}
