// The lexical analyser. In interactive mode it walks the counted input
// line buffer, uppercasing words in place and matching them greedily
// against the keyword table. In run mode it decodes the already tokenized
// program, either from the arena or straight from the EEPROM after an
// autorun boot. store_token appends the current token at the top of the
// program memory.

use crate::error::{Error, Result};
use crate::interp::{Interpreter, State, BUFSIZE};
use crate::num::{from_le, parse_number, Addr, ADDRSIZE, EHEADERSIZE, NUMSIZE};
use crate::tokens::{
    Name, StrLoc, StrVal, Token, ARRAYVAR, KEYWORDS, LINENUMBER, NUMBER, STRING,
    STRINGVAR, VARIABLE,
};

impl Interpreter {
    // a byte of the input line buffer, zero beyond the end
    fn ib(&self, i: usize) -> u8 {
        if i < BUFSIZE {
            self.ibuffer[i]
        } else {
            0
        }
    }

    fn whitespaces(&mut self) {
        while self.ib(self.bi) == b' ' || self.ib(self.bi) == b'\t' {
            self.bi += 1;
        }
    }

    // program memory, redirected to the EEPROM when running from it
    pub fn memread(&self, i: usize) -> u8 {
        if self.st == State::EepromRun {
            self.eeprom.read(i + EHEADERSIZE)
        } else {
            self.arena.read(i)
        }
    }

    pub fn nexttoken(&mut self) -> Result<()> {
        if self.st == State::Run || self.st == State::EepromRun {
            return self.gettoken();
        }

        // the first byte of the buffer holds the line length
        if self.bi == 0 {
            self.bi = 1;
        }

        self.whitespaces();

        let c = self.ib(self.bi);
        if c == 0 {
            self.token = Token::Eol;
            return Ok(());
        }

        // unsigned numbers
        if c.is_ascii_digit() {
            let end = self.ibuffer.len().min(BUFSIZE);
            let (x, nd) = parse_number(&self.ibuffer[self.bi..end]);
            self.bi += nd;
            self.token = Token::Number(x);
            return Ok(());
        }

        // strings between quotes, a missing closing quote ends at the line
        if c == b'"' {
            self.bi += 1;
            let start = self.bi;
            let mut len = 0;
            while self.ib(self.bi) != b'"' && self.ib(self.bi) != 0 {
                len += 1;
                self.bi += 1;
            }
            self.bi += 1;
            self.token = Token::Str(StrVal { loc: StrLoc::Input(start), len });
            return Ok(());
        }

        // single character operators are their own tokens
        if b"+-*/%\\:,()".contains(&c) {
            self.token = Token::Chr(c);
            self.bi += 1;
            return Ok(());
        }

        // relations, the two character ones collapse into digraph tokens
        if c == b'=' {
            self.bi += 1;
            self.whitespaces();
            if self.ib(self.bi) == b'>' {
                self.token = Token::Ge;
                self.bi += 1;
            } else if self.ib(self.bi) == b'<' {
                self.token = Token::Le;
                self.bi += 1;
            } else {
                self.token = Token::Chr(b'=');
            }
            return Ok(());
        }
        if c == b'>' {
            self.bi += 1;
            self.whitespaces();
            if self.ib(self.bi) == b'=' {
                self.token = Token::Ge;
                self.bi += 1;
            } else {
                self.token = Token::Chr(b'>');
            }
            return Ok(());
        }
        if c == b'<' {
            self.bi += 1;
            self.whitespaces();
            if self.ib(self.bi) == b'=' {
                self.token = Token::Le;
                self.bi += 1;
            } else if self.ib(self.bi) == b'>' {
                self.token = Token::Ne;
                self.bi += 1;
            } else {
                self.token = Token::Chr(b'<');
            }
            return Ok(());
        }

        // isolate a word, uppercasing on the fly, @ counts as a letter so
        // the special arrays tokenize
        let mut x = 0;
        while self.bi + x < BUFSIZE {
            let w = self.ibuffer[self.bi + x];
            if w.is_ascii_lowercase() {
                self.ibuffer[self.bi + x] = w - 32;
                x += 1;
            } else if (b'@'..=b'Z').contains(&w) {
                x += 1;
            } else {
                break;
            }
        }

        // greedy keyword match in table order, a trailing letter after a
        // full match is a syntax error
        for (text, tok) in KEYWORDS.iter() {
            let kw = text.as_bytes();
            if kw.len() <= x && self.ibuffer[self.bi..self.bi + kw.len()] == *kw {
                self.bi += kw.len();
                let next = self.ib(self.bi);
                if next.is_ascii_uppercase() {
                    return Err(Error::Unknown);
                }
                self.token = *tok;
                return Ok(());
            }
        }

        // a variable, one letter with an optional digit, or @ with any
        // second character; $ marks a string, a following ( an array
        if x == 1 || (x == 2 && c == b'@') {
            let mut name = Name::new(self.ib(self.bi), 0);
            self.bi += 1;
            let mut is_string = false;
            if self.ib(self.bi).is_ascii_digit() {
                name.d = self.ib(self.bi);
                self.bi += 1;
            }
            if name.c == b'@' && x == 2 {
                name.d = self.ib(self.bi);
                self.bi += 1;
            }
            if self.ib(self.bi) == b'$' {
                is_string = true;
                self.bi += 1;
            }
            self.whitespaces();
            if is_string {
                self.token = Token::StringVar(name);
            } else if self.ib(self.bi) == b'(' {
                self.token = Token::ArrayVar(name);
            } else {
                self.token = Token::Var(name);
            }
            return Ok(());
        }

        // stray characters become their own tokens and get skipped later
        self.token = Token::Chr(c);
        self.bi += 1;
        Ok(())
    }

    // decode the next pre tokenized record at here
    pub fn gettoken(&mut self) -> Result<()> {
        if self.here >= self.arena.top {
            self.token = Token::Eol;
            return Ok(());
        }

        let tag = self.memread(self.here) as i8;
        self.here += 1;
        match tag {
            LINENUMBER => {
                let l = Addr::from_le_bytes([
                    self.memread(self.here),
                    self.memread(self.here + 1),
                ]);
                self.here += ADDRSIZE;
                self.token = Token::LineNumber(l);
            }
            NUMBER => {
                let mut raw = [0u8; NUMSIZE];
                for (i, b) in raw.iter_mut().enumerate() {
                    *b = self.memread(self.here + i);
                }
                self.here += NUMSIZE;
                self.token = Token::Number(from_le(&raw));
            }
            VARIABLE | ARRAYVAR | STRINGVAR => {
                let name = Name::new(self.memread(self.here), self.memread(self.here + 1));
                self.here += 2;
                self.token = match tag {
                    VARIABLE => Token::Var(name),
                    STRINGVAR => Token::StringVar(name),
                    _ => Token::ArrayVar(name),
                };
            }
            STRING => {
                let len = self.memread(self.here) as usize;
                self.here += 1;
                let mut tlen = len;
                let loc = if self.st == State::EepromRun {
                    // we cannot point into the EEPROM, borrow the input
                    // buffer which is idle while running from it
                    tlen = len.min(BUFSIZE);
                    for i in 0..tlen {
                        self.ibuffer[i] = self.memread(self.here + i);
                    }
                    StrLoc::Input(0)
                } else {
                    StrLoc::Prog(self.here)
                };
                self.here += len;
                self.token = Token::Str(StrVal { loc, len: tlen });
            }
            code => {
                self.token = Token::from_code(code).ok_or(Error::Unknown)?;
            }
        }
        Ok(())
    }

    // the bytes of a string value, wherever they live
    pub fn str_bytes(&self, sv: StrVal) -> &[u8] {
        match sv.loc {
            StrLoc::Input(o) => &self.ibuffer[o..o + sv.len],
            StrLoc::Prog(a) => self.arena.bytes(a, sv.len),
        }
    }

    // append the current token at the top of program memory
    pub fn store_token(&mut self) -> Result<()> {
        match self.token {
            Token::LineNumber(l) => {
                if self.arena.no_memory(ADDRSIZE + 1) {
                    return Err(Error::OutOfMemory);
                }
                let top = self.arena.top;
                self.arena.write(top, LINENUMBER as u8);
                self.arena.write_addr(top + 1, l as usize);
                self.arena.top = top + 1 + ADDRSIZE;
            }
            Token::Number(x) => {
                if self.arena.no_memory(NUMSIZE + 1) {
                    return Err(Error::OutOfMemory);
                }
                let top = self.arena.top;
                self.arena.write(top, NUMBER as u8);
                self.arena.write_num(top + 1, x);
                self.arena.top = top + 1 + NUMSIZE;
            }
            Token::Var(n) | Token::ArrayVar(n) | Token::StringVar(n) => {
                if self.arena.no_memory(3) {
                    return Err(Error::OutOfMemory);
                }
                let top = self.arena.top;
                self.arena.write(top, self.token.code() as u8);
                self.arena.write(top + 1, n.c);
                self.arena.write(top + 2, n.d);
                self.arena.top = top + 3;
            }
            Token::Str(sv) => {
                let n = sv.len.min(BUFSIZE);
                if self.arena.no_memory(n + 2) {
                    return Err(Error::OutOfMemory);
                }
                let mut tmp = [0u8; BUFSIZE];
                tmp[..n].copy_from_slice(&self.str_bytes(sv)[..n]);
                let top = self.arena.top;
                self.arena.write(top, STRING as u8);
                self.arena.write(top + 1, n as u8);
                for (i, &b) in tmp[..n].iter().enumerate() {
                    self.arena.write(top + 2 + i, b);
                }
                self.arena.top = top + 2 + n;
            }
            t => {
                if self.arena.no_memory(1) {
                    return Err(Error::OutOfMemory);
                }
                let top = self.arena.top;
                self.arena.write(top, t.code() as u8);
                self.arena.top = top + 1;
            }
        }
        Ok(())
    }
}
