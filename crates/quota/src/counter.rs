//! Pure counter state machine.

/// One counter's persisted state. `window_start` is the unix timestamp of
/// the start of the window the count belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub count: i64,
    pub window_start: i64,
}

impl CounterState {
    pub fn fresh(window_start: i64) -> Self {
        Self {
            count: 0,
            window_start,
        }
    }
}

/// Roll the counter into the current window if a boundary has been crossed,
/// otherwise return it unchanged. Runs before every check-and-increment and
/// before every read; idempotent within a window.
pub fn check_and_reset(state: CounterState, current_window_start: i64) -> CounterState {
    if current_window_start > state.window_start {
        CounterState::fresh(current_window_start)
    } else {
        state
    }
}
