//! Alert LEDs.
//!
//! Two active-HIGH LEDs driven through `embedded-hal` output pins.  An alert
//! lights both; clearing turns both off.  LED0 is also the provisioning
//! blink, toggled from the blink timer.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct AlertLeds<L0, L1> {
    led0: L0,
    led1: L1,
    led0_on: bool,
    led1_on: bool,
}

impl<L0: OutputPin, L1: OutputPin> AlertLeds<L0, L1> {
    pub fn new(led0: L0, led1: L1) -> Self {
        Self {
            led0,
            led1,
            led0_on: false,
            led1_on: false,
        }
    }

    pub fn raise(&mut self) {
        self.set_led0(true);
        self.set_led1(true);
    }

    pub fn clear(&mut self) {
        self.set_led0(false);
        self.set_led1(false);
    }

    /// Flip LED0 only.
    pub fn toggle(&mut self) {
        self.set_led0(!self.led0_on);
    }

    pub fn state(&self) -> (bool, bool) {
        (self.led0_on, self.led1_on)
    }

    fn set_led0(&mut self, on: bool) {
        let res = if on { self.led0.set_high() } else { self.led0.set_low() };
        match res {
            Ok(()) => self.led0_on = on,
            Err(e) => warn!("indicators: LED0 write failed: {e:?}"),
        }
    }

    fn set_led1(&mut self, on: bool) {
        let res = if on { self.led1.set_high() } else { self.led1.set_low() };
        match res {
            Ok(()) => self.led1_on = on,
            Err(e) => warn!("indicators: LED1 write failed: {e:?}"),
        }
    }
}
