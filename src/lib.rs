// A tiny BASIC interpreter in the Palo Alto tradition with the Apple 1
// string and array extensions. A Configuration describes the machine, the
// devices behind it and the memory size; Basic assembles it and runs the
// line oriented read, store or execute loop on top of the interpreter core.

use std::path::PathBuf;

pub mod devices;
pub mod display;
pub mod eeprom;
pub mod error;
pub mod files;
pub mod hosted;
pub mod memory;
pub mod num;
pub mod pins;
pub mod sound;
pub mod tokens;
mod eval;
mod interp;
mod io;
mod lexer;
mod program;
mod statements;
mod vars;

pub use interp::{Interpreter, State, BUFSIZE, FORDEPTH, GOSUBDEPTH, STACKSIZE};

use devices::{Console, Printer};
use eeprom::Eeprom;
use num::{from_i, to_i, Addr};
use pins::Pins;
use tokens::Token;

pub struct Configuration {
    pub memsize: usize,
    pub console: Box<dyn Console>,
    pub eeprom: Box<dyn Eeprom>,
    pub printer: Printer,
    pub pins: Box<dyn Pins>,
    pub display_rows: usize,
    pub display_cols: usize,
    pub display_screen: bool,
    pub sound: bool,
    pub default_input: u8,
    pub default_output: u8,
}

pub struct Basic {
    interp: Interpreter,
}

impl Basic {
    pub fn new(config: Configuration) -> Basic {
        Basic { interp: Interpreter::new(config) }
    }

    // run one line as if it had been typed at the prompt
    pub fn execute(&mut self, line: &str) {
        self.interp.set_input_line(line);
        self.interp.bi = 0;
        let result = self.interp.nexttoken().and_then(|_| {
            if let Token::Number(n) = self.interp.token {
                self.interp.store_line(to_i(n) as Addr)
            } else {
                self.interp.st = State::Interactive;
                self.interp.statement()
            }
        });
        if let Err(e) = result {
            self.interp.report_error(e);
            self.interp.reset_after_error();
        }
    }

    // the interactive loop: greeting, then read a line and either store
    // it or run it, until the console goes away
    pub fn run(&mut self) {
        self.greet();
        self.autorun();

        loop {
            self.interp.iodefaults();
            self.interp.eeprom.flush();
            if self.interp.console.eof() {
                break;
            }
            self.interp.outsc("> ");
            self.interp.ins();
            self.interp.bi = 0;

            let result = self.interp.nexttoken().and_then(|_| {
                if let Token::Number(n) = self.interp.token {
                    self.interp.store_line(to_i(n) as Addr)
                } else {
                    self.interp.st = State::Interactive;
                    self.interp.statement()
                }
            });
            if let Err(e) = result {
                self.interp.report_error(e);
                self.interp.reset_after_error();
            }
        }
    }

    fn greet(&mut self) {
        self.interp.outsc("Tinybas 0.1");
        self.interp.outspc();
        self.interp.outnumber(from_i(self.interp.arena.memsize as i64 + 1));
        self.interp.outspc();
        self.interp.outnumber(from_i(self.interp.eeprom.len() as i64));
        self.interp.outcr();
    }

    // a status byte of one in the EEPROM starts the stored program right
    // away, tokens are read through the block device
    fn autorun(&mut self) {
        if self.interp.eeprom.len() == 0 || self.interp.eeprom.read(0) != 1 {
            return;
        }
        let len = Addr::from_le_bytes([self.interp.eeprom.read(1), self.interp.eeprom.read(2)])
            as usize;
        if len == 0 {
            return;
        }
        self.interp.arena.top = len;
        self.interp.here = 0;
        self.interp.st = State::EepromRun;
        self.interp.token = Token::Eol;
        if let Err(e) = self.interp.xrun(false) {
            self.interp.report_error(e);
            self.interp.reset_after_error();
        }
        // program memory belongs to the editor again
        self.interp.arena.top = 0;
    }
}

// a ready to use hosted machine
pub fn hosted_configuration(
    with_screen: bool,
    eeprom_path: Option<PathBuf>,
) -> Configuration {
    hosted::configuration(with_screen, eeprom_path)
}
