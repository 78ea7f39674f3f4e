// Generic character IO of the interpreter. Everything funnels through
// outch and inch, routed by the current output and input device selectors.
// Number output honors the Palo Alto style minimum field width.

use crate::devices::{BREAKCHAR, IFILE, OFILE, ODSP, OPRT, OSERIAL};
use crate::interp::{Interpreter, SBUFSIZE};
use crate::num::{from_i, nmul, parse_number, to_i, write_number, Num, ONE};

pub enum InNum {
    Value(Num),
    Break,
    Empty,
}

impl Interpreter {
    pub fn outch(&mut self, c: u8) {
        match self.od {
            OSERIAL => self.console.write(c),
            ODSP => self.display.write(c),
            OPRT => self.printer.write(c),
            OFILE => {
                if !self.files.write_byte(c) {
                    self.ert = ONE;
                }
            }
            _ => {}
        }
    }

    pub fn outcr(&mut self) {
        self.outch(b'\n');
    }

    pub fn outspc(&mut self) {
        self.outch(b' ');
    }

    pub fn out_bytes(&mut self, b: &[u8]) {
        for &c in b {
            self.outch(c);
        }
    }

    pub fn outsc(&mut self, s: &str) {
        self.out_bytes(s.as_bytes());
    }

    pub fn outnumber(&mut self, n: Num) {
        let s = write_number(n);
        let width = to_i(self.form).max(0) as usize;
        for _ in s.len()..width {
            self.outspc();
        }
        self.outsc(&s);
    }

    pub fn inch(&mut self) -> u8 {
        if self.id == IFILE {
            match self.files.read_byte() {
                Some(c) => c,
                None => {
                    self.ert = from_i(-1);
                    0
                }
            }
        } else {
            self.console.read()
        }
    }

    pub fn checkch(&mut self) -> Option<u8> {
        if self.id == IFILE {
            None
        } else {
            self.console.poll()
        }
    }

    // read one line into a counted buffer from the current input device
    pub fn read_line_buf(&mut self, buf: &mut [u8]) {
        if self.id == IFILE {
            let nb = buf.len();
            let mut i = 1;
            loop {
                match self.files.read_byte() {
                    Some(b'\n') | Some(b'\r') => break,
                    Some(c) => {
                        if i < nb - 1 {
                            buf[i] = c;
                            i += 1;
                        }
                    }
                    None => {
                        if i == 1 {
                            self.ert = from_i(-1);
                        }
                        break;
                    }
                }
            }
            buf[i] = 0;
            buf[0] = (i - 1) as u8;
        } else {
            self.console.read_line(buf);
        }
    }

    // read the input line buffer itself
    pub fn ins(&mut self) {
        let mut buf = [0u8; crate::interp::BUFSIZE];
        self.read_line_buf(&mut buf);
        self.ibuffer = buf;
    }

    // a number typed on the input device, reprompting until one parses
    pub fn innumber(&mut self) -> InNum {
        loop {
            let mut buf = [0u8; SBUFSIZE];
            self.read_line_buf(&mut buf);
            let mut i = 1;
            let mut sign = ONE;
            while i < SBUFSIZE - 1 && (buf[i] == b' ' || buf[i] == b'\t') {
                i += 1;
            }
            if buf[i] == BREAKCHAR {
                return InNum::Break;
            }
            if buf[i] == 0 {
                return InNum::Empty;
            }
            if buf[i] == b'-' {
                sign = from_i(-1);
                i += 1;
            }
            if i < SBUFSIZE && buf[i].is_ascii_digit() {
                let (r, _) = parse_number(&buf[i..]);
                return InNum::Value(nmul(r, sign));
            }
            self.outsc("Number");
            self.outspc();
            self.outsc("Error");
            self.outcr();
        }
    }
}
