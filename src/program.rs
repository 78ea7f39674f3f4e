// The program editor. A stored line is a LINENUMBER record followed by the
// tokenized body; lines are kept sorted by strictly increasing number.
// store_line appends the incoming line at the top of memory first and then
// splices it to its place with block moves, which keeps the whole edit in
// the arena without any scratch allocation.

use crate::error::{Error, Result};
use crate::interp::Interpreter;
use crate::num::{Addr, ADDRSIZE};
use crate::tokens::Token;

const LNLENGTH: usize = ADDRSIZE + 1;

impl Interpreter {
    pub fn first_line(&mut self) -> Result<Option<Addr>> {
        if self.arena.top == 0 {
            return Ok(None);
        }
        self.here = 0;
        self.gettoken()?;
        match self.token {
            Token::LineNumber(l) => Ok(Some(l)),
            _ => Ok(None),
        }
    }

    // advance to the next line, returning its number, None at the end
    pub fn next_line(&mut self) -> Result<Option<Addr>> {
        while self.here < self.arena.top {
            self.gettoken()?;
            if let Token::LineNumber(l) = self.token {
                return Ok(Some(l));
            }
            if self.here >= self.arena.top {
                self.here = self.arena.top;
                return Ok(None);
            }
        }
        Ok(None)
    }

    // position the cursor right after the line number record of line l
    pub fn find_line(&mut self, l: Addr) -> Result<()> {
        self.here = 0;
        while self.here < self.arena.top {
            self.gettoken()?;
            if self.token == Token::LineNumber(l) {
                return Ok(());
            }
        }
        Err(Error::Line)
    }

    // the BASIC line number containing an arena offset, for error reports
    pub fn line_of(&mut self, h: usize) -> Addr {
        let saved_here = self.here;
        let saved_token = self.token;
        let mut l: Addr = 0;
        let mut l1: Addr = 0;

        self.here = 0;
        if self.gettoken().is_err() {
            self.here = saved_here;
            self.token = saved_token;
            return 0;
        }
        while self.here < self.arena.top {
            if let Token::LineNumber(x) = self.token {
                l1 = l;
                l = x;
            }
            if self.here >= h {
                break;
            }
            if self.gettoken().is_err() {
                break;
            }
        }
        let result = match self.token {
            Token::LineNumber(_) => l1,
            _ => l,
        };
        self.here = saved_here;
        self.token = saved_token;
        result
    }

    // store, replace or delete one numbered line
    pub fn store_line(&mut self, line: Addr) -> Result<()> {
        // zero is an illegal line number
        if line == 0 {
            return Err(Error::Line);
        }

        // stage 1: append the line at the end of the memory
        let newline = self.arena.top;
        self.token = Token::LineNumber(line);
        loop {
            if let Err(e) = self.store_token() {
                self.arena.top = newline;
                self.here = 0;
                return Err(e);
            }
            if let Err(e) = self.nexttoken() {
                self.arena.top = newline;
                self.here = 0;
                return Err(e);
            }
            if self.token == Token::Eol {
                break;
            }
        }

        let linelength = self.arena.top - newline;

        // stage 2: just a line number deletes the stored line
        if linelength == LNLENGTH {
            self.arena.top -= LNLENGTH;
            self.find_line(line)?;
            let start = self.here - LNLENGTH;
            let next = self.next_line()?;
            self.here -= LNLENGTH;
            if next.is_some() {
                let from = self.here;
                let len = self.arena.top - from;
                self.arena.move_block(from, len, start)?;
                self.arena.top -= from - start;
            } else {
                self.arena.top = start;
            }
            return Ok(());
        }

        // the splice below moves at most one line length upward, make sure
        // that fits before touching anything
        if self.arena.no_memory(linelength) {
            self.arena.top = newline;
            self.here = 0;
            return Err(Error::OutOfMemory);
        }

        // stage 3: find the insertion place by walking the line numbers
        self.here = LNLENGTH;
        if self.next_line()?.is_none() {
            // the appended line is the only one, nothing to do
            return Ok(());
        }

        self.here = 0;
        let mut prev = 0usize;
        let mut prev2 = 0usize;
        let mut greater: Option<Addr> = None;
        while self.here < self.arena.top {
            prev2 = prev;
            prev = self.here;
            match self.next_line()? {
                Some(n) if n > line => {
                    greater = Some(n);
                    break;
                }
                Some(_) => {}
                None => break,
            }
        }

        match greater {
            None => {
                // scanned to the end; the line before the appended one may
                // carry the same number and then gets replaced in place
                let appended = prev - LNLENGTH;
                self.here = prev2 - LNLENGTH;
                self.gettoken()?;
                if self.token == Token::LineNumber(line) {
                    let dest = self.here - LNLENGTH;
                    self.arena.move_block(appended, linelength, dest)?;
                    self.arena.top = dest + linelength;
                }
                Ok(())
            }
            Some(_) => {
                // start of the first line with a higher number
                let follow = self.here - LNLENGTH;
                if prev > 0 {
                    let existing = prev - LNLENGTH;
                    self.here = existing;
                    self.gettoken()?;
                    if self.token == Token::LineNumber(line) {
                        return self.replace_line(existing, follow, linelength);
                    }
                }
                // insert before the following line
                let top = self.arena.top;
                self.arena.move_block(follow, top - follow, follow + linelength)?;
                self.arena.move_block(top, linelength, follow)?;
                Ok(())
            }
        }
    }

    // replace the line spanning existing..follow with the appended line
    fn replace_line(&mut self, existing: usize, follow: usize, linelength: usize) -> Result<()> {
        let oldlength = follow - existing;
        let top = self.arena.top;
        if linelength == oldlength {
            self.arena.move_block(top - linelength, linelength, existing)?;
            self.arena.top = top - linelength;
        } else if linelength > oldlength {
            let delta = linelength - oldlength;
            self.arena.move_block(follow, top - follow, follow + delta)?;
            self.arena.top = top + delta;
            let top = self.arena.top;
            self.arena.move_block(top - linelength, linelength, existing)?;
            self.arena.top = top - linelength;
        } else {
            self.arena.move_block(top - linelength, linelength, existing)?;
            self.arena.top = top - linelength;
            let top = self.arena.top;
            self.arena.move_block(follow, top - follow, existing + linelength)?;
            self.arena.top = top - oldlength + linelength;
        }
        Ok(())
    }
}
