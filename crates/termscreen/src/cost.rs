#![forbid(unsafe_code)]

//! Padding-aware output cost and the padded output primitive.
//!
//! Terminfo strings may carry delay directives of the form
//! `$<ms[.tenth][*][/]>`. At a known output speed, a delay is realized by
//! transmitting pad characters, so a sequence that looks short can be the
//! more expensive one to send. [`estimate_cost`] counts exactly the bytes
//! [`write_padded`] would emit, and [`select_cheaper`] uses that count to
//! choose between two equivalent sequences.
//!
//! # Delay directives
//!
//! | Form | Meaning |
//! |------|---------|
//! | `$<5>` | 5 ms |
//! | `$<2.5>` | 2.5 ms |
//! | `$<3*>` | 3 ms per affected line |
//! | `$<5/>` | 5 ms, even below the padding baud threshold |
//!
//! A `$<` that does not form a valid directive is literal text.
//!
//! # Invariants
//!
//! 1. `estimate_cost(s, ..)` equals the number of bytes `write_padded(s, ..)`
//!    writes for the same [`Padding`].
//! 2. With an unknown output speed (`baud == 0`) no pad characters are
//!    generated, so cost is the byte length with directives removed.
//! 3. One directive never delays longer than [`MAX_DELAY_MS`], per-line
//!    scaling included.

use std::io::{self, Write};

/// Longest delay a single directive can request.
pub const MAX_DELAY_MS: u32 = 10_000;

/// Pad characters are written from a buffer of this size.
const PAD_CHUNK: usize = 256;

/// Output speed and pad-character parameters for one terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    /// Output speed in bits per second; 0 when unknown.
    pub baud: u32,
    /// Speeds below this need no padding (terminfo `pb`).
    pub threshold: u32,
    /// Byte transmitted as padding (terminfo `pc`, NUL by default).
    pub pad_char: u8,
    /// The terminal cannot take pad characters (terminfo `NP`).
    pub no_pad_char: bool,
}

impl Default for Padding {
    fn default() -> Self {
        Self::NONE
    }
}

impl Padding {
    /// No output speed known; delays cost nothing.
    pub const NONE: Self = Self {
        baud: 0,
        threshold: 0,
        pad_char: 0,
        no_pad_char: false,
    };

    /// Padding at a given speed with default pad parameters.
    #[must_use]
    pub const fn at_baud(baud: u32) -> Self {
        Self {
            baud,
            ..Self::NONE
        }
    }

    /// Pad characters needed to realize a delay.
    fn pad_count(&self, delay: Delay, affected: u16) -> usize {
        if self.baud == 0 || self.no_pad_char {
            return 0;
        }
        if !delay.mandatory && self.baud < self.threshold {
            return 0;
        }
        let mut tenths = u64::from(delay.tenths_ms);
        if delay.per_line {
            tenths *= u64::from(affected.max(1));
        }
        tenths = tenths.min(u64::from(MAX_DELAY_MS) * 10);
        // chars/sec = baud / 10; tenths of ms -> divide by 10_000.
        let chars = tenths * u64::from(self.baud / 10) / 10_000;
        usize::try_from(chars).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delay {
    tenths_ms: u32,
    per_line: bool,
    mandatory: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a [u8]),
    Delay(Delay),
}

/// Splits a sequence into literal runs and delay directives.
struct Segments<'a> {
    rest: &'a [u8],
}

impl<'a> Segments<'a> {
    fn new(seq: &'a [u8]) -> Self {
        Self { rest: seq }
    }
}

/// Parse a directive body starting right after `$<`. Returns the delay and
/// the number of bytes consumed including the closing `>`.
fn parse_delay(body: &[u8]) -> Option<(Delay, usize)> {
    let mut idx = 0;
    let mut tenths: u32 = 0;
    let mut digits = 0;
    while let Some(&b) = body.get(idx) {
        if !b.is_ascii_digit() {
            break;
        }
        tenths = tenths.saturating_mul(10).saturating_add(u32::from(b - b'0'));
        digits += 1;
        idx += 1;
    }
    tenths = tenths.saturating_mul(10);
    if body.get(idx) == Some(&b'.') {
        idx += 1;
        if let Some(&b) = body.get(idx).filter(|b| b.is_ascii_digit()) {
            tenths = tenths.saturating_add(u32::from(b - b'0'));
            digits += 1;
            idx += 1;
            // Precision beyond tenths is ignored.
            while body.get(idx).is_some_and(u8::is_ascii_digit) {
                idx += 1;
            }
        }
    }
    if digits == 0 {
        return None;
    }
    let mut delay = Delay {
        tenths_ms: tenths,
        per_line: false,
        mandatory: false,
    };
    loop {
        match body.get(idx)? {
            b'*' => delay.per_line = true,
            b'/' => delay.mandatory = true,
            b'>' => return Some((delay, idx + 1)),
            _ => return None,
        }
        idx += 1;
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(body) = self.rest.strip_prefix(b"$<")
            && let Some((delay, used)) = parse_delay(body)
        {
            self.rest = &body[used..];
            return Some(Segment::Delay(delay));
        }
        // Literal run up to the next `$` that could open a directive.
        let end = self.rest[1..]
            .iter()
            .position(|&b| b == b'$')
            .map_or(self.rest.len(), |p| p + 1);
        let (lit, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Segment::Literal(lit))
    }
}

/// Bytes it takes to transmit `seq`, pad characters included.
///
/// `affected` is the number of lines the operation touches, used by
/// per-line (`*`) delays.
#[must_use]
pub fn estimate_cost(seq: &[u8], affected: u16, padding: &Padding) -> usize {
    Segments::new(seq)
        .map(|segment| match segment {
            Segment::Literal(lit) => lit.len(),
            Segment::Delay(delay) => padding.pad_count(delay, affected),
        })
        .sum()
}

/// Write `seq` with delay directives replaced by pad characters.
pub fn write_padded<W: Write + ?Sized>(
    out: &mut W,
    seq: &[u8],
    affected: u16,
    padding: &Padding,
) -> io::Result<()> {
    for segment in Segments::new(seq) {
        match segment {
            Segment::Literal(lit) => out.write_all(lit)?,
            Segment::Delay(delay) => {
                let chunk = [padding.pad_char; PAD_CHUNK];
                let mut remaining = padding.pad_count(delay, affected);
                while remaining > 0 {
                    let n = remaining.min(PAD_CHUNK);
                    out.write_all(&chunk[..n])?;
                    remaining -= n;
                }
            }
        }
    }
    Ok(())
}

/// Outcome of [`select_cheaper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    First(&'a [u8]),
    Second(&'a [u8]),
    /// Neither candidate was defined.
    Default(&'a [u8]),
}

impl<'a> Selection<'a> {
    /// The chosen sequence.
    #[must_use]
    pub const fn bytes(self) -> &'a [u8] {
        match self {
            Self::First(s) | Self::Second(s) | Self::Default(s) => s,
        }
    }

    /// Whether the fallback was used, meaning the capability is missing.
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default(_))
    }
}

/// Pick the cheaper of two equivalent sequences.
///
/// Empty candidates are undefined. Both undefined yields `default`; one
/// undefined yields the other; otherwise the strictly cheaper one wins and
/// ties go to `first`.
#[must_use]
pub fn select_cheaper<'a>(
    first: &'a [u8],
    second: &'a [u8],
    default: &'a [u8],
    affected: u16,
    padding: &Padding,
) -> Selection<'a> {
    match (first.is_empty(), second.is_empty()) {
        (true, true) => Selection::Default(default),
        (false, true) => Selection::First(first),
        (true, false) => Selection::Second(second),
        (false, false) => {
            let a = estimate_cost(first, affected, padding);
            let b = estimate_cost(second, affected, padding);
            tracing::trace!(cost_first = a, cost_second = b, "comparing sequences");
            if b < a {
                Selection::Second(second)
            } else {
                Selection::First(first)
            }
        }
    }
}
