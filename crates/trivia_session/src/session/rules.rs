//! Tunable constants of the game rules.

use chrono::Duration;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// Fixed numbers the scoring engine and turn scheduler play by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SessionRules {
    /// Seconds a team holds the turn in a STANDARD round once reading ends.
    #[serde(default = "default_turn_window_secs")]
    turn_window_secs: u32,

    /// Points deducted for every wrong buzzer answer.
    #[serde(default = "default_buzzer_penalty")]
    buzzer_penalty: i64,

    /// Points awarded when a team stumps the AI.
    #[serde(default = "default_ask_ai_bonus")]
    ask_ai_bonus: i64,
}

fn default_turn_window_secs() -> u32 {
    30
}

fn default_buzzer_penalty() -> i64 {
    50
}

fn default_ask_ai_bonus() -> i64 {
    200
}

impl SessionRules {
    /// Turn window as a duration.
    pub fn turn_window(&self) -> Duration {
        Duration::seconds(i64::from(self.turn_window_secs))
    }
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            turn_window_secs: default_turn_window_secs(),
            buzzer_penalty: default_buzzer_penalty(),
            ask_ai_bonus: default_ask_ai_bonus(),
        }
    }
}
