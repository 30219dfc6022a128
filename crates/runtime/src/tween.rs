/// A fixed-duration transition sampled against an external clock.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tween {
    pub start_s: f64,
    pub duration_s: f64,
}

impl Tween {
    pub fn new(start_s: f64, duration_s: f64) -> Self {
        Self {
            start_s,
            duration_s: duration_s.max(0.0),
        }
    }

    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now_s: f64) -> f64 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        ((now_s - self.start_s) / self.duration_s).clamp(0.0, 1.0)
    }

    /// Eased progress in `[0, 1]`.
    pub fn eased(&self, now_s: f64) -> f64 {
        ease_cubic_in_out(self.progress(now_s))
    }

    pub fn finished(&self, now_s: f64) -> bool {
        self.progress(now_s) >= 1.0
    }
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
