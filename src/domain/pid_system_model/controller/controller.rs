use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains of a [`Controller`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        PidGains { kp, ki, kd }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        PidGains { kp: 1.0, ki: 1.0, kd: 1.0 }
    }
}

/// Default dead-band, as a fraction of the setpoint.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// A discrete PID controller.
///
/// The controller turns a measured value into a correction signal relative to its
/// setpoint. A positive signal means there is headroom left below the setpoint, a
/// negative signal means the measured value overshoots it.
///
/// The integral and derivative terms use the history *before* the current sample is
/// added, so every correction lags one step behind the error it reacts to.
#[derive(Debug, Clone)]
pub struct Controller {
    setpoint: f64,
    gains: PidGains,

    /// Fraction of the setpoint inside which no correction is issued.
    tolerance: f64,

    cumulative_error: f64,
    previous_error: f64,
}

impl Controller {
    pub fn new(setpoint: f64, gains: PidGains, tolerance: f64) -> Self {
        Controller { setpoint, gains, tolerance, cumulative_error: 0.0, previous_error: 0.0 }
    }

    /// Feeds one measurement into the controller and returns the correction signal.
    pub fn process(&mut self, measured_value: f64) -> f64 {
        let error = self.setpoint - measured_value;

        // Dead-band: close enough to the setpoint, forget the accumulated history.
        if error.abs() < self.setpoint * self.tolerance {
            self.previous_error = error;
            self.cumulative_error = 0.0;
            return 0.0;
        }

        let signal = self.gains.kp * error + self.gains.ki * self.cumulative_error + self.gains.kd * self.previous_error;

        self.cumulative_error += error;
        self.previous_error = error;

        signal
    }

    pub fn get_setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn get_cumulative_error(&self) -> f64 {
        self.cumulative_error
    }

    pub fn get_previous_error(&self) -> f64 {
        self.previous_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_band_returns_zero_and_resets_history() {
        let mut controller = Controller::new(100.0, PidGains::default(), 0.05);

        // Build up some history outside the dead-band first.
        assert!(controller.process(50.0) > 0.0);
        assert_eq!(controller.get_cumulative_error(), 50.0);

        let signal = controller.process(98.0);

        assert_eq!(signal, 0.0);
        assert_eq!(controller.get_cumulative_error(), 0.0);
        assert_eq!(controller.get_previous_error(), 2.0);
    }

    #[test]
    fn test_integral_term_grows_on_repeated_error() {
        let mut controller = Controller::new(100.0, PidGains::new(1.0, 1.0, 1.0), 0.0);

        let first = controller.process(90.0);
        let second = controller.process(90.0);

        assert_eq!(first, 10.0);
        // kp * 10 + ki * 10 + kd * 10
        assert_eq!(second, 30.0);
        assert!(second > first);
    }

    #[test]
    fn test_overshoot_yields_negative_signal() {
        let mut controller = Controller::new(100.0, PidGains::new(1.0, 0.0, 0.0), 0.05);

        assert_eq!(controller.process(150.0), -50.0);
    }

    #[test]
    fn test_history_lags_one_step() {
        let mut controller = Controller::new(10.0, PidGains::new(0.0, 0.0, 1.0), 0.0);

        // Derivative term only sees the previous error.
        assert_eq!(controller.process(0.0), 0.0);
        assert_eq!(controller.process(5.0), 10.0);
        assert_eq!(controller.process(5.0), 5.0);
    }
}
