// The host pin capability. On a microcontroller this would talk to the
// digital and analog pins, the hosted build carries a stub that reads
// zeros and only really sleeps for DELAY.

use crate::num::{to_i, Num, ZERO};
use std::thread;
use std::time::Duration;

pub trait Pins {
    fn pinm(&mut self, pin: Num, mode: Num);
    fn dwrite(&mut self, pin: Num, high: bool);
    fn awrite(&mut self, pin: Num, value: u8);
    fn dread(&mut self, pin: Num) -> Num;
    fn aread(&mut self, pin: Num) -> Num;
    fn pulsein(&mut self, pin: Num, value: Num, timeout_us: i64) -> Num;
    fn delay(&mut self, ms: Num);
    fn azero(&self) -> Num {
        ZERO
    }
}

pub struct NullPins;

impl Pins for NullPins {
    fn pinm(&mut self, _pin: Num, _mode: Num) {}
    fn dwrite(&mut self, _pin: Num, _high: bool) {}
    fn awrite(&mut self, _pin: Num, _value: u8) {}
    fn dread(&mut self, _pin: Num) -> Num {
        ZERO
    }
    fn aread(&mut self, _pin: Num) -> Num {
        ZERO
    }
    fn pulsein(&mut self, _pin: Num, _value: Num, _timeout_us: i64) -> Num {
        ZERO
    }
    fn delay(&mut self, ms: Num) {
        let ms = to_i(ms).max(0) as u64;
        thread::sleep(Duration::from_millis(ms));
    }
}
