// The recursive descent expression evaluator. Results travel over the
// bounded operand stack like in any small stack machine; every level leaves
// the token cursor on its own last token, the caller advances. String
// values are resolved here too, including the byte wise comparison and the
// substring window arithmetic.

use crate::error::{Error, Result};
use crate::interp::{
    Interpreter, State, BUFSIZE, FORDEPTH, GOSUBDEPTH, SBUFSIZE, STACKSIZE,
};
use crate::num::{
    from_i, nadd, ndiv, nmul, nrem, nsub, parse_number, sqr, to_i, truthy, write_number,
    Num, ADDRSIZE, MAXADDR, MAXNUM, NUMSIZE, ONE, STRINDEXSIZE, ZERO,
};
use crate::tokens::{Name, StrLoc, Token};
use crate::vars::Bytes;

#[derive(Clone, Copy)]
pub struct StrSlice {
    pub src: Bytes,
    pub len: usize,
}

impl Interpreter {
    pub fn termsymbol(&self) -> bool {
        matches!(self.token, Token::LineNumber(_) | Token::Eol | Token::Chr(b':'))
    }

    // a comma separated list of expressions, all left on the stack
    pub fn parsearguments(&mut self) -> Result<u8> {
        let mut args = 0;
        if self.termsymbol() {
            return Ok(args);
        }
        loop {
            self.expression()?;
            args += 1;
            if self.token == Token::Chr(b',') {
                self.nexttoken()?;
            } else {
                return Ok(args);
            }
        }
    }

    pub fn parse_n_arguments(&mut self, n: u8) -> Result<()> {
        if self.parsearguments()? == n {
            Ok(())
        } else {
            Err(Error::Args)
        }
    }

    // arguments in brackets, nothing consumed when there is no bracket
    pub fn parsesubscripts(&mut self) -> Result<u8> {
        if self.token != Token::Chr(b'(') {
            return Ok(0);
        }
        self.nexttoken()?;
        let args = self.parsearguments()?;
        if self.token != Token::Chr(b')') {
            return Err(Error::Args);
        }
        Ok(args)
    }

    // consume a bracketed argument list of exactly n expressions
    fn parsefunction(&mut self, n: u8) -> Result<()> {
        self.nexttoken()?;
        if self.parsesubscripts()? != n {
            return Err(Error::Args);
        }
        Ok(())
    }

    // substring window of a string variable, start and end end up on the
    // stack. With no subscript at all the token is rewound so the caller
    // sees the plain variable.
    fn parsesubstring(&mut self, n: Name) -> Result<()> {
        let save = self.cursor();
        self.nexttoken()?;
        let args = self.parsesubscripts()?;
        match args {
            2 => {}
            1 => {
                let l = self.len_string(n)?;
                self.push(from_i(l as i64))?;
            }
            0 => {
                self.rewind(save);
                self.push(ONE)?;
                let l = self.len_string(n)?;
                self.push(from_i(l as i64))?;
            }
            _ => return Err(Error::Args),
        }
        Ok(())
    }

    // resolve a string value if the current token is one
    pub fn stringvalue(&mut self) -> Result<Option<StrSlice>> {
        match self.token {
            Token::Str(sv) => {
                let src = match sv.loc {
                    StrLoc::Input(o) => Bytes::Ibuf(o),
                    StrLoc::Prog(a) => Bytes::Mem(a),
                };
                Ok(Some(StrSlice { src, len: sv.len }))
            }
            Token::StringVar(n) => {
                self.parsesubstring(n)?;
                let end = to_i(self.pop()?);
                let start = to_i(self.pop()?);
                if start < 1 {
                    return Err(Error::Range);
                }
                let src = self.string_ptr(n, start as usize)?;
                let len = if end >= start { (end - start + 1) as usize } else { 0 };
                Ok(Some(StrSlice { src, len }))
            }
            _ => Ok(None),
        }
    }

    // a string in numeric context: either one side of a string comparison
    // or the first byte of the string
    fn streval(&mut self) -> Result<()> {
        let s1 = self.stringvalue()?.ok_or(Error::Unknown)?;
        let save = self.cursor();
        self.nexttoken()?;
        if self.token != Token::Chr(b'=') && self.token != Token::Ne {
            self.rewind(save);
            let v = if s1.len == 0 {
                ZERO
            } else {
                from_i(self.read_byte_at(s1.src, 0) as i64)
            };
            return self.push(v);
        }
        let op = self.token;
        self.nexttoken()?;
        let s2 = self.stringvalue()?.ok_or(Error::Unknown)?;
        let mut equal = s1.len == s2.len;
        if equal {
            for j in 0..s1.len {
                if self.read_byte_at(s1.src, j) != self.read_byte_at(s2.src, j) {
                    equal = false;
                    break;
                }
            }
        }
        let wanted_equal = op == Token::Chr(b'=');
        self.push(if equal == wanted_equal { ONE } else { ZERO })
    }

    // nothing in factor ends on a fresh token, the callers advance
    fn factor(&mut self) -> Result<()> {
        match self.token {
            Token::Number(x) => self.push(x)?,
            Token::Var(n) => {
                let v = self.getvar(n)?;
                self.push(v)?;
            }
            Token::ArrayVar(n) => {
                self.nexttoken()?;
                if self.parsesubscripts()? != 1 {
                    return Err(Error::Args);
                }
                let i = self.pop()?;
                let v = self.array_get(n, i)?;
                self.push(v)?;
            }
            Token::Chr(b'(') => {
                self.nexttoken()?;
                self.expression()?;
                if self.token != Token::Chr(b')') {
                    return Err(Error::Args);
                }
            }
            // Palo Alto BASIC functions
            Token::Abs => {
                self.parsefunction(1)?;
                let x = self.pop()?;
                self.push(if x < ZERO { nsub(ZERO, x) } else { x })?;
            }
            Token::Rnd => {
                self.parsefunction(1)?;
                let r = self.pop()?;
                self.rd = self.rd.wrapping_mul(31421).wrapping_add(6927);
                self.push(rnd_mix(self.rd, r))?;
            }
            Token::Size => {
                self.push(from_i(self.arena.free() as i64))?;
            }
            // Apple 1 BASIC functions
            Token::Sgn => {
                self.parsefunction(1)?;
                let x = self.pop()?;
                let s = if x > ZERO {
                    ONE
                } else if x < ZERO {
                    from_i(-1)
                } else {
                    ZERO
                };
                self.push(s)?;
            }
            Token::Peek => {
                self.parsefunction(1)?;
                let a = self.pop()?;
                let v = self.peek(a)?;
                self.push(v)?;
            }
            Token::Len => {
                self.nexttoken()?;
                if self.token != Token::Chr(b'(') {
                    return Err(Error::Args);
                }
                self.nexttoken()?;
                let s = self.stringvalue()?.ok_or(Error::Unknown)?;
                self.nexttoken()?;
                if self.token != Token::Chr(b')') {
                    return Err(Error::Args);
                }
                self.push(from_i(s.len as i64))?;
            }
            Token::Lomem => self.push(ZERO)?,
            Token::Himem => self.push(from_i(self.arena.himem as i64))?,
            // string compare and string as number
            Token::Str(_) | Token::StringVar(_) => self.streval()?,
            // interpreter extensions
            Token::Sqr => {
                self.parsefunction(1)?;
                let x = self.pop()?;
                self.push(sqr(x))?;
            }
            Token::Fre => {
                self.parsefunction(1)?;
                let x = self.pop()?;
                let v = if x >= ZERO {
                    from_i(self.arena.free() as i64)
                } else {
                    from_i(self.eeprom.len() as i64)
                };
                self.push(v)?;
            }
            Token::Usr => {
                self.parsefunction(2)?;
                self.usr()?;
            }
            // host IO
            Token::Aread => {
                self.parsefunction(1)?;
                let p = self.pop()?;
                let v = self.pins.aread(p);
                self.push(v)?;
            }
            Token::Dread => {
                self.parsefunction(1)?;
                let p = self.pop()?;
                let v = self.pins.dread(p);
                self.push(v)?;
            }
            Token::Millis => {
                self.parsefunction(1)?;
                let d = self.pop()?;
                let v = self.millis(d);
                self.push(v)?;
            }
            Token::Pulsein => {
                self.parsefunction(3)?;
                let t = to_i(self.pop()?) * 1000;
                let y = self.pop()?;
                let x = self.pop()?;
                let v = self.pins.pulsein(x, y, t);
                self.push(v)?;
            }
            Token::Azero => {
                let v = self.pins.azero();
                self.push(v)?;
            }
            _ => return Err(Error::Unknown),
        }
        Ok(())
    }

    // shared shape of the binary levels: advance, evaluate the right hand
    // side, hand both operands back
    fn binary_rhs(
        &mut self,
        f: fn(&mut Interpreter) -> Result<()>,
    ) -> Result<(Num, Num)> {
        self.nexttoken()?;
        f(self)?;
        let y = self.pop()?;
        let x = self.pop()?;
        Ok((x, y))
    }

    fn term(&mut self) -> Result<()> {
        self.factor()?;
        loop {
            self.nexttoken()?;
            match self.token {
                Token::Chr(b'*') => {
                    let (x, y) = self.binary_rhs(Self::factor)?;
                    self.push(nmul(x, y))?;
                }
                Token::Chr(b'/') => {
                    let (x, y) = self.binary_rhs(Self::factor)?;
                    if !truthy(y) {
                        return Err(Error::Divide);
                    }
                    self.push(ndiv(x, y))?;
                }
                Token::Chr(b'%') => {
                    let (x, y) = self.binary_rhs(Self::factor)?;
                    if !truthy(y) {
                        return Err(Error::Divide);
                    }
                    self.push(nrem(x, y))?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn addexpression(&mut self) -> Result<()> {
        if self.token != Token::Chr(b'+') && self.token != Token::Chr(b'-') {
            self.term()?;
        } else {
            // unary sign acts on an implicit zero
            self.push(ZERO)?;
        }
        loop {
            match self.token {
                Token::Chr(b'+') => {
                    let (x, y) = self.binary_rhs(Self::term)?;
                    self.push(nadd(x, y))?;
                }
                Token::Chr(b'-') => {
                    let (x, y) = self.binary_rhs(Self::term)?;
                    self.push(nsub(x, y))?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn compexpression(&mut self) -> Result<()> {
        self.addexpression()?;
        let op = self.token;
        let result = match op {
            Token::Chr(b'=') => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x == y
            }
            Token::Ne => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x != y
            }
            Token::Chr(b'>') => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x > y
            }
            Token::Chr(b'<') => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x < y
            }
            Token::Le => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x <= y
            }
            Token::Ge => {
                let (x, y) = self.binary_rhs(Self::compexpression)?;
                x >= y
            }
            _ => return Ok(()),
        };
        self.push(if result { ONE } else { ZERO })
    }

    fn notexpression(&mut self) -> Result<()> {
        if self.token == Token::Not {
            self.nexttoken()?;
            self.compexpression()?;
            let x = self.pop()?;
            self.push(if truthy(x) { ZERO } else { ONE })
        } else {
            self.compexpression()
        }
    }

    fn andexpression(&mut self) -> Result<()> {
        self.notexpression()?;
        if self.token == Token::And {
            let (x, y) = self.binary_rhs(Self::expression)?;
            self.push(if truthy(x) && truthy(y) { ONE } else { ZERO })?;
        }
        Ok(())
    }

    pub fn expression(&mut self) -> Result<()> {
        self.andexpression()?;
        if self.token == Token::Or {
            let (x, y) = self.binary_rhs(Self::expression)?;
            self.push(if truthy(x) || truthy(y) { ONE } else { ZERO })?;
        }
        Ok(())
    }

    // low level access to interpreter internals, USR(group, selector)
    fn usr(&mut self) -> Result<()> {
        let arg = self.pop()?;
        let group = to_i(self.pop()?);
        let sel = to_i(arg);
        let v: Num = match group {
            0 => match sel {
                0 => from_i(NUMSIZE as i64),
                1 => MAXNUM,
                2 => from_i(ADDRSIZE as i64),
                3 => from_i(MAXADDR as i64),
                4 => from_i(STRINDEXSIZE as i64),
                5 => from_i(self.arena.memsize as i64 + 1),
                6 => from_i(self.eeprom.len() as i64),
                7 => from_i(GOSUBDEPTH as i64),
                8 => from_i(FORDEPTH as i64),
                9 => from_i(STACKSIZE as i64),
                10 => from_i(BUFSIZE as i64),
                11 => from_i(SBUFSIZE as i64),
                12 => ZERO, // serial baudrate of the host console
                13 => ZERO, // printer baudrate
                14 => from_i(self.display.rows as i64),
                15 => from_i(self.display.cols as i64),
                _ => ZERO,
            },
            1 => match sel {
                0 => from_i(self.arena.top as i64),
                1 => from_i(self.here as i64),
                2 => from_i(self.arena.himem as i64),
                3 => from_i(self.arena.nvars as i64),
                7 => from_i(self.gosubsp as i64),
                8 => from_i(self.fnc as i64),
                9 => from_i(self.sp as i64),
                _ => ZERO,
            },
            2 => match sel {
                0 => from_i(self.id as i64),
                1 => from_i(self.idd as i64),
                2 => from_i(self.od as i64),
                3 => from_i(self.odd as i64),
                _ => ZERO,
            },
            // heap access with the name taken from the input buffer
            3 => {
                let (t, n) = self.usr_name();
                match self.arena.find(t, n) {
                    Some(obj) => from_i(obj.addr as i64),
                    None => ZERO,
                }
            }
            4 => {
                let (t, n) = self.usr_name();
                let a = self.arena.alloc(t, n, to_i(arg).max(0) as usize)?;
                from_i(a as i64)
            }
            5 => {
                let (t, n) = self.usr_name();
                from_i(self.arena.length(t, n) as i64)
            }
            6 => {
                let end = self.ibuffer.len();
                let (x, _) = parse_number(&self.ibuffer[1..end]);
                x
            }
            7 => {
                let s = write_number(arg);
                let n = s.len().min(BUFSIZE - 2);
                self.ibuffer[1..1 + n].copy_from_slice(&s.as_bytes()[..n]);
                self.ibuffer[0] = n as u8;
                from_i(n as i64)
            }
            8 => {
                // store the input buffer as a program line
                let saved_st = self.st;
                let saved_here = self.here;
                self.st = State::Interactive;
                self.bi = 1;
                let end = (self.ibuffer[0] as usize + 1).min(BUFSIZE - 1);
                self.ibuffer[end] = 0;
                self.store_line(to_i(arg) as u16)?;
                self.here = saved_here;
                self.st = saved_st;
                ZERO
            }
            _ => ZERO,
        };
        self.push(v)
    }

    fn usr_name(&self) -> (i8, Name) {
        (self.ibuffer[1] as i8, Name::new(self.ibuffer[2], self.ibuffer[3]))
    }
}

#[cfg(not(feature = "float"))]
fn rnd_mix(rd: u16, r: Num) -> Num {
    let v = (rd as i64) * (r as i64) / 0x10000;
    if r >= 0 {
        v as Num
    } else {
        (v + 1) as Num
    }
}

#[cfg(feature = "float")]
fn rnd_mix(rd: u16, r: Num) -> Num {
    let v = rd as Num * r / 65536.0;
    if r >= 0.0 {
        v
    } else {
        v + 1.0
    }
}
