//! Selection button polling
//!
//! This module scans the four channel-selection buttons with debouncing
//! and raises one selection flag per press. It never touches the
//! coordinator's state directly.

use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;

use crate::config::*;
use crate::flags::EventFlags;

// ===================================================================
// Button Debouncing State
// ===================================================================

struct ButtonDebouncer {
    buttons: [ButtonDebounceState; SELECTION_INPUTS],
    debounce: Duration,
}

#[derive(Clone, Copy)]
struct ButtonDebounceState {
    current: bool,
    raw: bool,
    last_change: Instant,
}

impl ButtonDebouncer {
    fn new(now: Instant, debounce: Duration) -> Self {
        Self {
            buttons: [ButtonDebounceState {
                current: false,
                raw: false,
                last_change: now,
            }; SELECTION_INPUTS],
            debounce,
        }
    }

    fn update(&mut self, key: usize, raw_state: bool, now: Instant) -> bool {
        let state = &mut self.buttons[key];

        if raw_state != state.raw {
            state.raw = raw_state;
            state.last_change = now;
        }

        if now.duration_since(state.last_change) >= self.debounce {
            let changed = state.current != state.raw;
            state.current = state.raw;
            changed
        } else {
            false
        }
    }

    fn get_state(&self, key: usize) -> bool {
        self.buttons[key].current
    }
}

// ===================================================================
// Edge Detection
// ===================================================================

/// Turns raw button scans into selection flag bits, one bit per debounced press
pub struct SelectionPoller {
    debouncer: ButtonDebouncer,
}

impl SelectionPoller {
    pub fn new(now: Instant) -> Self {
        Self::with_debounce(now, Duration::from_millis(BUTTON_DEBOUNCE_MS))
    }

    pub fn with_debounce(now: Instant, debounce: Duration) -> Self {
        Self {
            debouncer: ButtonDebouncer::new(now, debounce),
        }
    }

    /// Feed one scan (`true` = pressed) and return the mask of buttons whose
    /// debounced state went from released to pressed
    pub fn scan(&mut self, raw_states: [bool; SELECTION_INPUTS], now: Instant) -> u8 {
        let mut pressed = 0;

        for (i, &raw) in raw_states.iter().enumerate() {
            if self.debouncer.update(i, raw, now) {
                let down = self.debouncer.get_state(i);
                debug!("Button {} {}", i + 1, if down { "pressed" } else { "released" });
                if down {
                    pressed |= 1 << i;
                }
            }
        }

        pressed
    }
}

// ===================================================================
// Poller Loop
// ===================================================================

/// Scan active-low inputs forever, raising `selection` bits on presses
pub async fn run_selection_poller<P: InputPin>(mut inputs: [P; SELECTION_INPUTS], selection: &EventFlags) {
    info!("Selection poller started");

    let mut poller = SelectionPoller::new(Instant::now());
    let scan_interval = Duration::from_millis(1000 / BUTTON_SCAN_RATE_HZ);

    loop {
        // Read all inputs directly (active-low with pull-ups); a failed read counts as released
        let mut raw_states = [false; SELECTION_INPUTS];
        for (state, pin) in raw_states.iter_mut().zip(inputs.iter_mut()) {
            *state = pin.is_low().unwrap_or(false);
        }

        let pressed = poller.scan(raw_states, Instant::now());
        if pressed != 0 {
            selection.set(pressed);
        }

        Timer::after(scan_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embassy_time::with_timeout;
    use embedded_hal::digital::ErrorType;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn press_is_reported_once_after_debounce() {
        let mut poller = SelectionPoller::new(at(0));
        let held = [false, false, true, false];

        assert_eq!(poller.scan(held, at(10)), 0);
        assert_eq!(poller.scan(held, at(20)), 0);
        assert_eq!(poller.scan(held, at(30)), 0b0100);
        assert_eq!(poller.scan(held, at(40)), 0);
        assert_eq!(poller.scan(held, at(500)), 0);
    }

    #[test]
    fn bounce_shorter_than_debounce_is_ignored() {
        let mut poller = SelectionPoller::new(at(0));

        assert_eq!(poller.scan([true, false, false, false], at(10)), 0);
        assert_eq!(poller.scan([false, false, false, false], at(15)), 0);
        assert_eq!(poller.scan([false, false, false, false], at(60)), 0);
    }

    #[test]
    fn release_is_not_a_selection() {
        let mut poller = SelectionPoller::new(at(0));
        let pressed = [true, false, false, false];
        let released = [false; SELECTION_INPUTS];

        poller.scan(pressed, at(0));
        assert_eq!(poller.scan(pressed, at(25)), 0b0001);
        poller.scan(released, at(30));
        assert_eq!(poller.scan(released, at(60)), 0);

        // a second press is a second selection
        poller.scan(pressed, at(70));
        assert_eq!(poller.scan(pressed, at(100)), 0b0001);
    }

    #[test]
    fn simultaneous_presses_report_every_button() {
        let mut poller = SelectionPoller::new(at(0));
        let both = [false, true, false, true];

        poller.scan(both, at(0));
        assert_eq!(poller.scan(both, at(20)), 0b1010);
    }

    struct FixedPin {
        low: bool,
    }

    impl ErrorType for FixedPin {
        type Error = Infallible;
    }

    impl InputPin for FixedPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.low)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.low)
        }
    }

    #[test]
    fn held_button_raises_its_selection_flag() {
        let selection = EventFlags::new();
        let pins = [
            FixedPin { low: false },
            FixedPin { low: true },
            FixedPin { low: false },
            FixedPin { low: false },
        ];

        let _ = block_on(with_timeout(
            Duration::from_millis(100),
            run_selection_poller(pins, &selection),
        ));

        assert_eq!(selection.get(), 0b0010);
    }
}
