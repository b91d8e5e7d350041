// src/hal/traits.rs
//! Core HAL traits for electrode abstraction

/// One analog EMG input as seen through the front-end's ADC
pub trait AnalogChannel: Send {
    /// Sample the channel, in volts within `[0, reference_voltage]`
    fn read_voltage(&mut self) -> f32;

    /// Full-scale voltage of the ADC
    fn reference_voltage(&self) -> f32;

    /// Whether the channel reads above `threshold` on this sample
    fn is_active(&mut self, threshold: f32) -> bool {
        self.read_voltage() > threshold
    }
}
