//! Gecko stepper drive interface
//!
//! The Gecko motor controller takes three logic-level inputs: an
//! edge-triggered step pulse, a direction line (STEP_NEAR = 1) and an
//! active-high DISABLE line. The limit switches are plain digital inputs
//! wired normally-open to ground with pull-ups, so an engaged switch reads
//! low.

use embedded_hal::digital::{InputPin, OutputPin};

use sphygmo_core::motion::LimitSwitchState;
use sphygmo_core::traits::{LimitSwitches, StepDirection, StepPort};

/// Step/direction/disable lines to the Gecko drive
pub struct GeckoInterface<STEP, DIR, DIS> {
    step: STEP,
    dir: DIR,
    disable: DIS,
}

impl<STEP, DIR, DIS> GeckoInterface<STEP, DIR, DIS>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DIS: OutputPin,
{
    /// Wrap the three output pins; the drive starts disabled
    pub fn new(step: STEP, dir: DIR, mut disable: DIS) -> Self {
        let _ = disable.set_high();
        Self { step, dir, disable }
    }
}

impl<STEP, DIR, DIS> StepPort for GeckoInterface<STEP, DIR, DIS>
where
    STEP: OutputPin,
    DIR: OutputPin,
    DIS: OutputPin,
{
    fn set_direction(&mut self, dir: StepDirection) {
        if dir.wire_level() {
            let _ = self.dir.set_high();
        } else {
            let _ = self.dir.set_low();
        }
    }

    fn step_pulse(&mut self) {
        // Rising edge steps; the GPIO round trip satisfies the drive's
        // minimum pulse width
        let _ = self.step.set_high();
        let _ = self.step.set_low();
    }

    fn set_enabled(&mut self, enabled: bool) {
        // The Gecko exposes DISABLE, not ENABLE
        if enabled {
            let _ = self.disable.set_low();
        } else {
            let _ = self.disable.set_high();
        }
    }
}

/// Near/far end-of-travel switch pair
pub struct SwitchPair<NEAR, FAR> {
    near: NEAR,
    far: FAR,
    /// Level a pin reads when its switch is engaged
    engaged_level_high: bool,
}

impl<NEAR, FAR> SwitchPair<NEAR, FAR>
where
    NEAR: InputPin,
    FAR: InputPin,
{
    /// Normally-open switches to ground with pull-ups: engaged reads low
    pub fn new(near: NEAR, far: FAR) -> Self {
        Self {
            near,
            far,
            engaged_level_high: false,
        }
    }

    /// Switches wired the other way around
    pub fn active_high(near: NEAR, far: FAR) -> Self {
        Self {
            near,
            far,
            engaged_level_high: true,
        }
    }

    fn engaged<P: InputPin>(pin: &mut P, engaged_level_high: bool) -> bool {
        match pin.is_high() {
            Ok(level) => level == engaged_level_high,
            // A pin we cannot read is treated as engaged so the actuator
            // faults instead of driving into an unknown end stop
            Err(_) => true,
        }
    }
}

impl<NEAR, FAR> LimitSwitches for SwitchPair<NEAR, FAR>
where
    NEAR: InputPin,
    FAR: InputPin,
{
    fn read(&mut self) -> LimitSwitchState {
        LimitSwitchState {
            near_engaged: Self::engaged(&mut self.near, self.engaged_level_high),
            far_engaged: Self::engaged(&mut self.far, self.engaged_level_high),
        }
    }
}
