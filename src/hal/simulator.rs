// src/hal/simulator.rs
//! Simulated electrodes
//!
//! Each channel draws a raw ADC code uniformly from `[0, adc_resolution]` and
//! scales it to `raw * reference_voltage / adc_resolution`, which is how the
//! firmware converts `analogRead` results.

use crate::config::SensorSettings;
use crate::hal::AnalogChannel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform-noise electrode behind a simulated ADC
#[derive(Debug)]
pub struct SimulatedChannel {
    rng: StdRng,
    reference_voltage: f32,
    adc_resolution: u16,
}

impl SimulatedChannel {
    pub fn new(rng: StdRng, reference_voltage: f32, adc_resolution: u16) -> Self {
        Self {
            rng,
            reference_voltage,
            adc_resolution: adc_resolution.max(1),
        }
    }

    /// Next raw ADC code
    pub fn read_raw(&mut self) -> u16 {
        self.rng.gen_range(0..=self.adc_resolution)
    }
}

impl AnalogChannel for SimulatedChannel {
    fn read_voltage(&mut self) -> f32 {
        let raw = self.read_raw();
        f32::from(raw) * self.reference_voltage / f32::from(self.adc_resolution)
    }

    fn reference_voltage(&self) -> f32 {
        self.reference_voltage
    }
}

/// Channel pinned to one voltage, for demos and deterministic tests
#[derive(Debug, Clone)]
pub struct ConstantChannel {
    voltage: f32,
    reference_voltage: f32,
}

impl ConstantChannel {
    pub fn new(voltage: f32, reference_voltage: f32) -> Self {
        Self { voltage, reference_voltage }
    }
}

impl AnalogChannel for ConstantChannel {
    fn read_voltage(&mut self) -> f32 {
        self.voltage
    }

    fn reference_voltage(&self) -> f32 {
        self.reference_voltage
    }
}

/// Builds the channel set for a session
pub struct SimulatedFrontEnd {
    settings: SensorSettings,
    seeder: StdRng,
}

impl SimulatedFrontEnd {
    pub fn new(settings: SensorSettings) -> Self {
        let seeder = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { settings, seeder }
    }

    /// `count` independent channels; with a fixed seed the sequence is reproducible
    pub fn channels(&mut self, count: u8) -> Vec<Box<dyn AnalogChannel>> {
        (0..count)
            .map(|_| {
                let rng = StdRng::seed_from_u64(self.seeder.gen());
                Box::new(SimulatedChannel::new(
                    rng,
                    self.settings.reference_voltage,
                    self.settings.adc_resolution,
                )) as Box<dyn AnalogChannel>
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> SimulatedChannel {
        SimulatedChannel::new(StdRng::seed_from_u64(seed), 5.0, 1023)
    }

    #[test]
    fn test_voltage_within_reference() {
        let mut channel = seeded(1);
        for _ in 0..10_000 {
            let v = channel.read_voltage();
            assert!((0.0..=5.0).contains(&v), "voltage {} out of range", v);
        }
    }

    #[test]
    fn test_voltage_is_quantized() {
        let mut channel = SimulatedChannel::new(StdRng::seed_from_u64(2), 5.0, 4);
        for _ in 0..1_000 {
            let v = channel.read_voltage();
            let steps = v / 1.25;
            assert!((steps - steps.round()).abs() < 1e-4, "{} is not a multiple of 1.25", v);
        }
    }

    #[test]
    fn test_threshold_split_is_roughly_uniform() {
        // P(v > 1.6) on [0, 5] is 0.68
        let mut channel = seeded(3);
        let active = (0..10_000).filter(|_| channel.is_active(1.6)).count();
        assert!((6_400..7_200).contains(&active), "active count {}", active);
    }

    #[test]
    fn test_constant_channel() {
        let mut channel = ConstantChannel::new(2.0, 5.0);
        assert!(channel.is_active(1.6));
        assert!(!channel.is_active(2.0));
        assert_eq!(channel.reference_voltage(), 5.0);
    }

    #[test]
    fn test_seeded_front_end_is_reproducible() {
        let settings = SensorSettings { seed: Some(99), ..Default::default() };

        let read_all = |front_end: &mut SimulatedFrontEnd| -> Vec<f32> {
            front_end
                .channels(4)
                .iter_mut()
                .flat_map(|c| (0..5).map(|_| c.read_voltage()).collect::<Vec<_>>())
                .collect()
        };

        let a = read_all(&mut SimulatedFrontEnd::new(settings.clone()));
        let b = read_all(&mut SimulatedFrontEnd::new(settings));
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_resolution_is_clamped() {
        let mut channel = SimulatedChannel::new(StdRng::seed_from_u64(4), 5.0, 0);
        let v = channel.read_voltage();
        assert!(v == 0.0 || v == 5.0);
    }
}
