/// Trailing-edge debouncer driven by an external clock.
///
/// Time is passed in rather than read so the host (a browser timer, a test)
/// controls it. Each `push` restarts the quiet window; `poll` yields the
/// latest value once the window has elapsed without further pushes.
#[derive(Debug, Clone, PartialEq)]
pub struct Debouncer<T> {
    window_s: f64,
    pending: Option<(T, f64)>,
}

pub const DEFAULT_RESIZE_DEBOUNCE_S: f64 = 0.150;

impl<T> Debouncer<T> {
    pub fn new(window_s: f64) -> Self {
        Self {
            window_s: window_s.max(0.0),
            pending: None,
        }
    }

    pub fn window_s(&self) -> f64 {
        self.window_s
    }

    /// Replaces any pending value and restarts the window at `now_s`.
    pub fn push(&mut self, value: T, now_s: f64) {
        self.pending = Some((value, now_s));
    }

    /// Time at which the pending value becomes due.
    pub fn next_deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|(_, at)| at + self.window_s)
    }

    /// Takes the pending value if its window has elapsed.
    pub fn poll(&mut self, now_s: f64) -> Option<T> {
        match self.next_deadline() {
            Some(deadline) if now_s >= deadline => self.pending.take().map(|(v, _)| v),
            _ => None,
        }
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RESIZE_DEBOUNCE_S)
    }
}
