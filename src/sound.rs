// Tone output for ATONE. A sine source on the default audio device, either
// for a given number of milliseconds or until the next tone replaces it.

use crate::num::{to_i, Num};
use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::time::Duration;

pub struct Speaker {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    current: Option<Sink>,
}

impl Speaker {
    pub fn new() -> Option<Speaker> {
        match OutputStream::try_default() {
            Ok((stream, handle)) => {
                Some(Speaker { _stream: stream, handle, current: None })
            }
            Err(_) => None,
        }
    }

    pub fn tone(&mut self, freq: Num, duration_ms: Option<Num>) {
        if let Some(sink) = self.current.take() {
            sink.stop();
        }
        let freq = to_i(freq).max(0) as f32;
        if freq == 0.0 {
            return;
        }
        if let Ok(sink) = Sink::try_new(&self.handle) {
            let source = SineWave::new(freq).amplify(0.20);
            match duration_ms {
                Some(ms) => {
                    let ms = to_i(ms).max(0) as u64;
                    sink.append(source.take_duration(Duration::from_millis(ms)));
                }
                None => sink.append(source),
            }
            self.current = Some(sink);
        }
    }
}
