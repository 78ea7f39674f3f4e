// The configurable numeric type of the interpreter. The default build works
// on 32 bit integers, the "float" feature switches to f32 with exact
// integers up to 2^24. Addresses into the arena are 16 bit on the wire and
// usize in the engine.

#[cfg(not(feature = "float"))]
pub type Num = i32;
#[cfg(feature = "float")]
pub type Num = f32;

pub type Addr = u16;

pub const NUMSIZE: usize = std::mem::size_of::<Num>();
pub const ADDRSIZE: usize = std::mem::size_of::<Addr>();
// the index size of strings, either 1 byte or 2 bytes
pub const STRINDEXSIZE: usize = 2;
pub const EHEADERSIZE: usize = ADDRSIZE + 1;

#[cfg(not(feature = "float"))]
pub const MAXNUM: Num = i32::MAX;
// the maximum accurate integer of a 32 bit float
#[cfg(feature = "float")]
pub const MAXNUM: Num = 16777216.0;

pub const MAXADDR: Addr = Addr::MAX;

pub const ZERO: Num = 0 as Num;
pub const ONE: Num = 1 as Num;

pub fn to_i(n: Num) -> i64 {
    n as i64
}

pub fn from_i(i: i64) -> Num {
    i as Num
}

pub fn truthy(n: Num) -> bool {
    n != ZERO
}

// arithmetic that silently wraps like the original's machine integers

#[cfg(not(feature = "float"))]
pub fn nadd(a: Num, b: Num) -> Num {
    a.wrapping_add(b)
}
#[cfg(not(feature = "float"))]
pub fn nsub(a: Num, b: Num) -> Num {
    a.wrapping_sub(b)
}
#[cfg(not(feature = "float"))]
pub fn nmul(a: Num, b: Num) -> Num {
    a.wrapping_mul(b)
}
#[cfg(not(feature = "float"))]
pub fn ndiv(a: Num, b: Num) -> Num {
    a.wrapping_div(b)
}
#[cfg(not(feature = "float"))]
pub fn nrem(a: Num, b: Num) -> Num {
    a.wrapping_rem(b)
}

#[cfg(feature = "float")]
pub fn nadd(a: Num, b: Num) -> Num {
    a + b
}
#[cfg(feature = "float")]
pub fn nsub(a: Num, b: Num) -> Num {
    a - b
}
#[cfg(feature = "float")]
pub fn nmul(a: Num, b: Num) -> Num {
    a * b
}
#[cfg(feature = "float")]
pub fn ndiv(a: Num, b: Num) -> Num {
    a / b
}
// the remainder works on truncated operands like the original
#[cfg(feature = "float")]
pub fn nrem(a: Num, b: Num) -> Num {
    ((a as i64) % (b as i64)) as Num
}

pub fn to_le(n: Num) -> [u8; NUMSIZE] {
    n.to_le_bytes()
}

pub fn from_le(b: &[u8]) -> Num {
    let mut raw = [0u8; NUMSIZE];
    raw.copy_from_slice(&b[..NUMSIZE]);
    Num::from_le_bytes(raw)
}

// reading an unsigned decimal literal from a byte buffer, returning the
// value and the number of bytes consumed

#[cfg(not(feature = "float"))]
pub fn parse_number(b: &[u8]) -> (Num, usize) {
    digits(b)
}

#[cfg(feature = "float")]
pub fn parse_number(b: &[u8]) -> (Num, usize) {
    let (mut r, mut nd) = digits(b);
    if nd < b.len() && b[nd] == b'.' {
        nd += 1;
        let (mut fraction, fd) = digits(&b[nd..]);
        nd += fd;
        if fd > 0 {
            for _ in 0..fd {
                fraction /= 10.0;
            }
            r += fraction;
        }
    }
    if nd < b.len() && (b[nd] == b'E' || b[nd] == b'e') {
        nd += 1;
        let mut negative = false;
        if nd < b.len() && b[nd] == b'-' {
            negative = true;
            nd += 1;
        }
        let (exponent, ed) = digits(&b[nd..]);
        nd += ed;
        for _ in 0..exponent as i64 {
            if negative {
                r /= 10.0;
            } else {
                r *= 10.0;
            }
        }
    }
    (r, nd)
}

fn digits(b: &[u8]) -> (Num, usize) {
    let mut r = ZERO;
    let mut nd = 0;
    while nd < b.len() && b[nd].is_ascii_digit() {
        r = nadd(nmul(r, 10 as Num), (b[nd] - b'0') as Num);
        nd += 1;
    }
    (r, nd)
}

fn write_int(v: i64) -> String {
    format!("{}", v)
}

#[cfg(not(feature = "float"))]
pub fn write_number(n: Num) -> String {
    write_int(n as i64)
}

// integer valued floats are displayed as integers, small magnitudes in
// fixed notation, the rest in exponent form
#[cfg(feature = "float")]
pub fn write_number(n: Num) -> String {
    if n.floor() == n && n.abs() < MAXNUM {
        return write_int(n as i64);
    }
    let a = n.abs();
    if a >= 1e-4 && a < 1e7 {
        format!("{}", n)
    } else {
        format!("{:E}", n)
    }
}

// an approximate integer square root, bit scan for the seed then a couple
// of Newton steps
#[cfg(not(feature = "float"))]
pub fn sqr(r: Num) -> Num {
    let mut t = r;
    let mut l = 0;
    while t > 0 {
        t >>= 1;
        l += 1;
    }
    l /= 2;
    t = 1 << l;
    for _ in 0..32 {
        let last = t;
        t = (t + r.wrapping_div(t.max(1))) / 2;
        if (t - last).abs() <= 1 {
            break;
        }
    }
    t
}

#[cfg(feature = "float")]
pub fn sqr(r: Num) -> Num {
    r.sqrt()
}
