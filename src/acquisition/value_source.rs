// src/acquisition/value_source.rs
//! Next-value computation for the steady-state loop

use crate::acquisition::ManualOverride;
use crate::config::SensorSettings;
use crate::hal::{AnalogChannel, SimulatedFrontEnd};
use crate::protocol::Configuration;

/// Pack per-channel activity into an integer, channel 0 as the most significant bit
pub fn encode_active_channels<I>(active: I) -> u32
where
    I: IntoIterator<Item = bool>,
{
    active
        .into_iter()
        .fold(0u32, |acc, bit| (acc << 1) | u32::from(bit))
}

/// Thresholded electrode bank, optionally pre-empted by a manual override
pub struct ValueSource {
    channels: Vec<Box<dyn AnalogChannel>>,
    threshold_volts: f32,
    simulate: bool,
    manual_override: Option<ManualOverride>,
}

impl ValueSource {
    /// Simulated electrodes sized for the negotiated configuration
    pub fn for_configuration(configuration: &Configuration, settings: &SensorSettings) -> Self {
        let channels = SimulatedFrontEnd::new(settings.clone()).channels(configuration.channel_count());
        Self::from_channels(channels, settings.threshold_volts).with_simulation(settings.simulate)
    }

    pub fn from_channels(channels: Vec<Box<dyn AnalogChannel>>, threshold_volts: f32) -> Self {
        Self {
            channels,
            threshold_volts,
            simulate: true,
            manual_override: None,
        }
    }

    /// Let injected values take priority over the simulated reading
    pub fn with_override(mut self, manual_override: ManualOverride) -> Self {
        self.manual_override = Some(manual_override);
        self
    }

    /// `false` leaves the override as the only source of values
    pub fn with_simulation(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sample every channel once and encode the result
    pub fn read_simulated(&mut self) -> u32 {
        let threshold = self.threshold_volts;
        encode_active_channels(self.channels.iter_mut().map(|c| c.is_active(threshold)))
    }

    /// Next value regardless of what was sent last
    ///
    /// A present override wins; the electrodes are not sampled for this call.
    pub fn next_value(&mut self) -> Option<u32> {
        if let Some(value) = self.override_value() {
            return Some(value);
        }
        if self.simulate {
            Some(self.read_simulated())
        } else {
            None
        }
    }

    /// Value to transmit this tick, if any
    ///
    /// The override is used when it differs from `last_sent`; otherwise the
    /// simulated reading is used when it differs from `last_sent`.
    pub fn candidate(&mut self, last_sent: Option<u32>) -> Option<u32> {
        if let Some(value) = self.override_value().filter(|v| Some(*v) != last_sent) {
            return Some(value);
        }
        if !self.simulate {
            return None;
        }
        Some(self.read_simulated()).filter(|v| Some(*v) != last_sent)
    }

    fn override_value(&self) -> Option<u32> {
        self.manual_override.as_ref().and_then(ManualOverride::get)
    }
}
