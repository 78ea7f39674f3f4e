// Byte serial devices behind the interpreter. The console is the narrow
// capability the core talks to, one byte out, one byte in, a peek for the
// break character and a line read with editing. The hosted implementation
// runs the terminal in raw mode through termion so the break character can
// be polled while a program runs; the buffered implementation feeds tests
// from a script.

use std::collections::VecDeque;
use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use termion::raw::{IntoRawMode, RawTerminal};
use termion::AsyncReader;

// output device codes
pub const OSERIAL: u8 = 1;
pub const ODSP: u8 = 2;
pub const OPRT: u8 = 4;
pub const OFILE: u8 = 16;

// input device codes
pub const ISERIAL: u8 = 1;
pub const IKEYBOARD: u8 = 2;
pub const IFILE: u8 = 16;

// the sentinel byte stopping a running program
pub const BREAKCHAR: u8 = b'#';

pub trait Console {
    fn write(&mut self, c: u8);
    // blocking single byte read
    fn read(&mut self) -> u8;
    // non destructive check for a pending byte
    fn poll(&mut self) -> Option<u8>;
    // read one edited line into a counted buffer, byte 0 holds the length
    fn read_line(&mut self, buf: &mut [u8]);
    fn eof(&self) -> bool {
        false
    }
}

pub struct Term {
    out: RawTerminal<io::Stdout>,
    input: AsyncReader,
    pending: Option<u8>,
}

impl Term {
    pub fn new() -> io::Result<Term> {
        let out = io::stdout().into_raw_mode()?;
        Ok(Term { out, input: termion::async_stdin(), pending: None })
    }

    fn fetch(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.input.read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

impl Console for Term {
    fn write(&mut self, c: u8) {
        // raw mode needs the carriage return put back
        if c == b'\n' {
            let _ = self.out.write_all(b"\r\n");
            let _ = self.out.flush();
        } else {
            let _ = self.out.write_all(&[c]);
        }
    }

    fn read(&mut self) -> u8 {
        let _ = self.out.flush();
        if let Some(c) = self.pending.take() {
            return c;
        }
        loop {
            if let Some(c) = self.fetch() {
                return c;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn poll(&mut self) -> Option<u8> {
        let _ = self.out.flush();
        if self.pending.is_none() {
            self.pending = self.fetch();
        }
        self.pending
    }

    fn read_line(&mut self, buf: &mut [u8]) {
        let nb = buf.len();
        let mut i = 1;
        loop {
            let c = self.read();
            if c == b'\n' || c == b'\r' {
                self.write(b'\n');
                break;
            } else if (c == 127 || c == 8) && i > 1 {
                i -= 1;
                let _ = self.out.write_all(b"\x08 \x08");
            } else if c >= 32 && i < nb - 1 {
                self.write(c);
                buf[i] = c;
                i += 1;
            } else if c == 3 {
                // control c cancels the line
                i = 1;
                self.write(b'\n');
                break;
            }
        }
        buf[i] = 0;
        buf[0] = (i - 1) as u8;
    }
}

// a plain blocking console over stdio, used when the terminal cannot be
// put into raw mode, for example with piped input
pub struct StdioConsole {
    closed: bool,
}

impl StdioConsole {
    pub fn new() -> StdioConsole {
        StdioConsole { closed: false }
    }
}

impl Console for StdioConsole {
    fn write(&mut self, c: u8) {
        let mut out = io::stdout();
        let _ = out.write_all(&[c]);
        if c == b'\n' {
            let _ = out.flush();
        }
    }

    fn read(&mut self) -> u8 {
        let _ = io::stdout().flush();
        let mut byte = [0u8; 1];
        match io::stdin().read(&mut byte) {
            Ok(1) => byte[0],
            _ => {
                self.closed = true;
                0
            }
        }
    }

    fn poll(&mut self) -> Option<u8> {
        None
    }

    fn read_line(&mut self, buf: &mut [u8]) {
        let nb = buf.len();
        let mut i = 1;
        loop {
            let c = self.read();
            if c == b'\n' || c == b'\r' || c == 0 {
                break;
            }
            if i < nb - 1 {
                buf[i] = c;
                i += 1;
            }
        }
        buf[i] = 0;
        buf[0] = (i - 1) as u8;
    }

    fn eof(&self) -> bool {
        self.closed
    }
}

// a console fed from a canned script, output captured for inspection
pub struct BufConsole {
    input: VecDeque<u8>,
    output: Rc<RefCell<Vec<u8>>>,
}

impl BufConsole {
    pub fn new(script: &str) -> (BufConsole, Rc<RefCell<Vec<u8>>>) {
        let output = Rc::new(RefCell::new(Vec::new()));
        let console =
            BufConsole { input: script.bytes().collect(), output: Rc::clone(&output) };
        (console, output)
    }
}

impl Console for BufConsole {
    fn write(&mut self, c: u8) {
        self.output.borrow_mut().push(c);
    }

    fn read(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }

    fn poll(&mut self) -> Option<u8> {
        self.input.front().copied()
    }

    fn read_line(&mut self, buf: &mut [u8]) {
        let nb = buf.len();
        let mut i = 1;
        while let Some(c) = self.input.pop_front() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            if i < nb - 1 {
                buf[i] = c;
                i += 1;
            }
        }
        buf[i] = 0;
        buf[0] = (i - 1) as u8;
    }

    fn eof(&self) -> bool {
        self.input.is_empty()
    }
}

// the printer is a plain byte sink when one is attached
pub struct Printer {
    sink: Option<Box<dyn Write>>,
}

impl Printer {
    pub fn none() -> Printer {
        Printer { sink: None }
    }

    pub fn to(sink: Box<dyn Write>) -> Printer {
        Printer { sink: Some(sink) }
    }

    pub fn write(&mut self, c: u8) {
        if let Some(sink) = &mut self.sink {
            let _ = sink.write_all(&[c]);
            if c == b'\n' {
                let _ = sink.flush();
            }
        }
    }
}
