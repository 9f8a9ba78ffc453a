//! Exact rational arithmetic and a small arithmetic expression parser

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reduced fraction with a positive denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// `None` for a zero denominator or on overflow
    pub fn new(num: i64, den: i64) -> Option<Self> {
        Self::reduce(i128::from(num), i128::from(den))
    }

    pub fn integer(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    fn reduce(num: i128, den: i128) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num.abs(), den.abs()).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        Some(Self {
            num: i64::try_from(sign * num / g).ok()?,
            den: i64::try_from(sign * den / g).ok()?,
        })
    }

    pub fn numer(self) -> i64 {
        self.num
    }

    pub fn denom(self) -> i64 {
        self.den
    }

    pub fn is_integer(self) -> bool {
        self.den == 1
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        let (a, b, c, d) = self.widen(other);
        Self::reduce(a * d + c * b, b * d)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let (a, b, c, d) = self.widen(other);
        Self::reduce(a * c, b * d)
    }

    pub fn checked_div(self, other: Self) -> Option<Self> {
        let (a, b, c, d) = self.widen(other);
        Self::reduce(a * d, b * c)
    }

    /// Exact equality by cross-multiplication
    pub fn same_value(self, other: Self) -> bool {
        let (a, b, c, d) = self.widen(other);
        a * d == c * b
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn widen(self, other: Self) -> (i128, i128, i128, i128) {
        (
            i128::from(self.num),
            i128::from(self.den),
            i128::from(other.num),
            i128::from(other.den),
        )
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// A number read from an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub exact: Rational,
    /// A decimal literal took part, so comparisons use a tolerance
    pub decimal: bool,
    /// Numerator and denominator as written, when the input is a plain
    /// integer or a single fraction
    pub written: Option<(i64, i64)>,
}

impl Value {
    pub fn integer(n: i64) -> Self {
        Self {
            exact: Rational::integer(n),
            decimal: false,
            written: Some((n, 1)),
        }
    }

    pub fn fraction(num: i64, den: i64) -> Option<Self> {
        Some(Self {
            exact: Rational::new(num, den)?,
            decimal: false,
            written: Some((num, den)),
        })
    }

    #[cfg(test)]
    pub fn from_ratio(num: i64, den: i64) -> Self {
        Self::fraction(num, den).expect("non-zero denominator")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.written {
            Some((n, 1)) if !self.decimal => write!(f, "{n}"),
            Some((n, d)) if !self.decimal => write!(f, "{n}/{d}"),
            _ if self.decimal => write!(f, "{}", round3(self.exact.to_f64())),
            _ => write!(f, "{}", self.exact),
        }
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Int(i64),
    Decimal(Rational),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(number_token(&literal)?);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' | '−' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' | '×' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' | '÷' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            _ => return None,
        }
    }
    Some(tokens)
}

fn number_token(literal: &str) -> Option<Token> {
    match literal.split_once('.') {
        None => literal.parse().ok().map(Token::Int),
        Some((whole, frac)) => {
            if frac.contains('.') || (whole.is_empty() && frac.is_empty()) {
                return None;
            }
            let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
            if frac.is_empty() {
                return Some(Token::Int(whole));
            }
            let scale = 10i64.checked_pow(u32::try_from(frac.len()).ok()?)?;
            let frac: i64 = frac.parse().ok()?;
            let exact = Rational::integer(whole).checked_add(Rational::new(frac, scale)?)?;
            Some(Token::Decimal(exact))
        }
    }
}

/// Parse an arithmetic expression over integers, decimals and fractions.
///
/// Returns `None` for anything that is not a complete expression, including
/// division by zero and overflow.
pub fn parse_expression(input: &str) -> Option<Value> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        decimal: false,
    };
    let exact = parser.expr()?;
    if parser.pos != tokens.len() {
        return None;
    }
    Some(Value {
        exact,
        decimal: parser.decimal,
        written: written_form(&tokens),
    })
}

fn written_form(tokens: &[Token]) -> Option<(i64, i64)> {
    let (sign, rest) = match tokens {
        [Token::Minus, rest @ ..] => (-1, rest),
        rest => (1, rest),
    };
    match rest {
        [Token::Int(n)] => Some((sign * n, 1)),
        [Token::Int(n), Token::Slash, Token::Int(d)] if *d != 0 => Some((sign * n, *d)),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    decimal: bool,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn expr(&mut self) -> Option<Rational> {
        let mut acc = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            acc = if op == Token::Plus {
                acc.checked_add(rhs)?
            } else {
                acc.checked_sub(rhs)?
            };
        }
        Some(acc)
    }

    fn term(&mut self) -> Option<Rational> {
        let mut acc = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            acc = if op == Token::Star {
                acc.checked_mul(rhs)?
            } else {
                acc.checked_div(rhs)?
            };
        }
        Some(acc)
    }

    fn unary(&mut self) -> Option<Rational> {
        match self.peek()? {
            Token::Minus => {
                self.pos += 1;
                self.unary()?.checked_neg()
            }
            Token::Plus => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<Rational> {
        let token = self.peek()?;
        self.pos += 1;
        match token {
            Token::Int(n) => Some(Rational::integer(n)),
            Token::Decimal(r) => {
                self.decimal = true;
                Some(r)
            }
            Token::Open => {
                let inner = self.expr()?;
                (self.peek()? == Token::Close).then(|| {
                    self.pos += 1;
                    inner
                })
            }
            _ => None,
        }
    }
}
