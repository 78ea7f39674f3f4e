// The interpreter aggregate. Everything that was runtime state in the
// machine, the arena, the static variables, the three stacks, the token
// stream cursor and the device selectors, lives on this one struct; the
// tokenizer, editor, evaluator and statement modules all extend it with
// their own impl blocks.

use crate::devices::{Console, Printer, BREAKCHAR, IKEYBOARD, ISERIAL};
use crate::display::Display;
use crate::eeprom::Eeprom;
use crate::error::{Error, Result};
use crate::files::FileSys;
use crate::num::{from_i, to_i, Num, MAXNUM, ZERO};
use crate::pins::Pins;
use crate::sound::Speaker;
use crate::memory::Arena;
use crate::tokens::{Name, Token};
use crate::Configuration;
use chrono::{DateTime, Utc};

pub const BUFSIZE: usize = 92;
pub const SBUFSIZE: usize = 32;
pub const VARSIZE: usize = 26;
pub const STACKSIZE: usize = 15;
pub const GOSUBDEPTH: usize = 4;
pub const FORDEPTH: usize = 4;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Interactive,
    Run,
    // running straight out of the EEPROM after autorun
    EepromRun,
}

#[derive(Clone, Copy, Default)]
pub struct ForFrame {
    pub var: Name,
    pub here: usize,
    pub to: Num,
    pub step: Num,
}

// a rewind point in whichever token stream is active
#[derive(Clone, Copy)]
pub struct Cursor {
    pub bi: usize,
    pub here: usize,
    pub token: Token,
}

pub struct Interpreter {
    pub arena: Arena,
    pub vars: [Num; VARSIZE],
    stack: [Num; STACKSIZE],
    pub sp: usize,
    forstack: [ForFrame; FORDEPTH],
    pub forsp: usize,
    pub fnc: i32,
    gosubstack: [usize; GOSUBDEPTH],
    pub gosubsp: usize,
    pub ibuffer: [u8; BUFSIZE],
    pub bi: usize,
    pub token: Token,
    pub st: State,
    pub here: usize,
    // the trappable error code, @S in BASIC
    pub ert: Num,
    // random generator state
    pub rd: u16,
    // Palo Alto style minimum field width for numbers
    pub form: Num,
    pub id: u8,
    pub od: u8,
    pub idd: u8,
    pub odd: u8,
    pub console: Box<dyn Console>,
    pub display: Display,
    pub printer: Printer,
    pub eeprom: Box<dyn Eeprom>,
    pub pins: Box<dyn Pins>,
    pub speaker: Option<Speaker>,
    pub files: FileSys,
    start: DateTime<Utc>,
}

impl Interpreter {
    pub fn new(config: Configuration) -> Interpreter {
        let display =
            Display::new(config.display_rows, config.display_cols, config.display_screen);
        let speaker = if config.sound { Speaker::new() } else { None };
        Interpreter {
            arena: Arena::new(config.memsize),
            vars: [ZERO; VARSIZE],
            stack: [ZERO; STACKSIZE],
            sp: 0,
            forstack: [ForFrame::default(); FORDEPTH],
            forsp: 0,
            fnc: 0,
            gosubstack: [0; GOSUBDEPTH],
            gosubsp: 0,
            ibuffer: [0; BUFSIZE],
            bi: 0,
            token: Token::Eol,
            st: State::Interactive,
            here: 0,
            ert: ZERO,
            rd: 0,
            form: ZERO,
            id: config.default_input,
            od: config.default_output,
            idd: config.default_input,
            odd: config.default_output,
            console: config.console,
            display,
            printer: config.printer,
            eeprom: config.eeprom,
            pins: config.pins,
            speaker,
            files: FileSys::new(),
            start: Utc::now(),
        }
    }

    // the arithmetic stack

    pub fn push(&mut self, n: Num) -> Result<()> {
        if self.sp == STACKSIZE {
            return Err(Error::Stack);
        }
        self.stack[self.sp] = n;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Num> {
        if self.sp == 0 {
            return Err(Error::Stack);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    pub fn clear_stack(&mut self) {
        self.sp = 0;
    }

    // FOR and GOSUB stacks

    pub fn push_for(&mut self, frame: ForFrame) -> Result<()> {
        if self.forsp == FORDEPTH {
            return Err(Error::For);
        }
        self.forstack[self.forsp] = frame;
        self.forsp += 1;
        Ok(())
    }

    pub fn pop_for(&mut self) -> Result<ForFrame> {
        if self.forsp == 0 {
            return Err(Error::For);
        }
        self.forsp -= 1;
        Ok(self.forstack[self.forsp])
    }

    pub fn drop_for(&mut self) -> Result<()> {
        if self.forsp == 0 {
            return Err(Error::For);
        }
        self.forsp -= 1;
        Ok(())
    }

    pub fn clear_for(&mut self) {
        self.forsp = 0;
        self.fnc = 0;
    }

    pub fn push_gosub(&mut self) -> Result<()> {
        if self.gosubsp == GOSUBDEPTH {
            return Err(Error::Gosub);
        }
        self.gosubstack[self.gosubsp] = self.here;
        self.gosubsp += 1;
        Ok(())
    }

    pub fn pop_gosub(&mut self) -> Result<()> {
        if self.gosubsp == 0 {
            return Err(Error::Return);
        }
        self.gosubsp -= 1;
        self.here = self.gosubstack[self.gosubsp];
        Ok(())
    }

    pub fn clear_gosub(&mut self) {
        self.gosubsp = 0;
    }

    // variables and devices

    pub fn clear_vars(&mut self) {
        for v in self.vars.iter_mut() {
            *v = ZERO;
        }
        self.arena.clear_heap();
    }

    pub fn iodefaults(&mut self) {
        self.od = self.odd;
        self.id = self.idd;
    }

    pub fn millis(&self, divisor: Num) -> Num {
        let dt = Utc::now().signed_duration_since(self.start).num_milliseconds();
        let d = to_i(divisor);
        if d == 0 {
            return ZERO;
        }
        from_i((dt / d) % to_i(MAXNUM))
    }

    // rewind support for the tokenizer

    pub fn cursor(&self) -> Cursor {
        Cursor { bi: self.bi, here: self.here, token: self.token }
    }

    pub fn rewind(&mut self, c: Cursor) {
        self.bi = c.bi;
        self.here = c.here;
        self.token = c.token;
    }

    // true once the break character arrives on the current input device,
    // the byte is consumed
    pub fn break_pending(&mut self) -> bool {
        if self.id == ISERIAL || self.id == IKEYBOARD {
            if let Some(c) = self.console.poll() {
                if c == BREAKCHAR {
                    self.console.read();
                    return true;
                }
            }
        }
        false
    }

    // the single catch site, report and clean up at the statement boundary
    pub fn report_error(&mut self, e: Error) {
        self.od = self.odd;
        self.id = self.idd;
        if self.st != State::Interactive {
            let line = self.line_of(self.here);
            self.outnumber(from_i(line as i64));
            self.outch(b':');
            self.outspc();
        }
        self.outsc(e.as_str());
        self.outspc();
        self.outsc("Error");
        self.outcr();
        self.clear_stack();
        self.clear_for();
        self.clear_gosub();
        self.iodefaults();
    }

    pub fn reset_after_error(&mut self) {
        self.here = 0;
        self.st = State::Interactive;
        self.iodefaults();
    }
}
