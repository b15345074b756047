//! Locale-aware numeric literal parsing.
//!
//! Tokens are first checked for a numeric shape (sign, digit groups, decimal
//! separator, exponent) using the separators of the active locale. Only
//! tokens with that shape are parsed, so values such as `1.2.3` or `v1` fall
//! through to the store lookup instead of producing an error.
//!
//! Integral values are decided textually, which keeps exact results for
//! inputs such as `2.0` or `15e-1` without floating-point arithmetic.

use std::{num::ParseIntError, str::FromStr};

use thiserror::Error;

/// The largest decimal point shift treated as a potential integer.
const MAX_INTEGRAL_DIGITS: i64 = 400;

/// Decimal and grouping separators used when reading numeric tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    decimal: char,
    grouping: Option<char>,
}

/// `.` decimals and no grouping, so `100,200` is not a number.
impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal: '.',
            grouping: None,
        }
    }
}

impl NumberFormat {
    /// Create a format from explicit separators.
    #[must_use]
    pub const fn new(decimal: char, grouping: Option<char>) -> Self {
        Self { decimal, grouping }
    }

    /// Derive separators from a BCP 47 or POSIX locale tag such as `de-DE`
    /// or `fr_FR.UTF-8`. Unknown languages use the default format, which
    /// accepts no grouping separator.
    #[must_use]
    pub fn from_locale(tag: &str) -> Self {
        let language = tag
            .split(['-', '_', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "de" | "es" | "it" | "pt" | "nl" | "tr" | "da" | "id" | "el" | "ro" | "hr"
            | "sl" | "sr" => Self::new(',', Some('.')),
            "fr" | "ru" | "pl" | "sv" | "fi" | "cs" | "sk" | "nb" | "nn" | "no" | "uk"
            | "hu" | "bg" | "lt" | "lv" | "et" => Self::new(',', Some(' ')),
            "en" | "ja" | "zh" | "ko" | "hi" | "he" | "th" => Self::new('.', Some(',')),
            _ => Self::default(),
        }
    }

    /// Separators for the operating system's current locale.
    #[must_use]
    pub fn system() -> Self {
        sys_locale::get_locale().map_or_else(Self::default, |tag| Self::from_locale(&tag))
    }

    /// The decimal separator.
    #[must_use]
    pub const fn decimal(self) -> char {
        self.decimal
    }

    /// The grouping separator, if the format accepts one.
    #[must_use]
    pub const fn grouping(self) -> Option<char> {
        self.grouping
    }

    /// Parse `token` as a numeric literal.
    ///
    /// Returns `None` when the token does not have a numeric shape and
    /// `Some(Err(_))` when it does but cannot be represented.
    #[must_use]
    pub fn parse(self, token: &str) -> Option<Result<NumericLiteral, NumberParseError>> {
        let shape = self.scan(token)?;
        Some(shape.into_literal(token))
    }

    fn is_grouping(self, ch: char) -> bool {
        match self.grouping {
            Some(' ') => matches!(ch, ' ' | '\u{a0}' | '\u{202f}'),
            Some(sep) => ch == sep,
            None => false,
        }
    }

    fn scan(self, token: &str) -> Option<NumberShape> {
        let mut chars = token.chars().peekable();
        let negative = match chars.peek() {
            Some('-') => {
                chars.next();
                true
            }
            Some('+') => {
                chars.next();
                false
            }
            _ => false,
        };

        let mut groups: Vec<String> = vec![String::new()];
        while let Some(&ch) = chars.peek() {
            if ch.is_ascii_digit() {
                groups.last_mut()?.push(ch);
            } else if self.is_grouping(ch) && ch != self.decimal {
                groups.push(String::new());
            } else {
                break;
            }
            chars.next();
        }
        let integer = join_groups(&groups)?;

        let mut fraction = String::new();
        if chars.peek() == Some(&self.decimal) {
            chars.next();
            while let Some(&ch) = chars.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                fraction.push(ch);
                chars.next();
            }
        }
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }

        let mut exponent = None;
        if matches!(chars.peek(), Some('e' | 'E')) {
            chars.next();
            let mut text = String::new();
            if let Some(&sign @ ('-' | '+')) = chars.peek() {
                text.push(sign);
                chars.next();
            }
            while let Some(&ch) = chars.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                text.push(ch);
                chars.next();
            }
            if !text.chars().any(|ch| ch.is_ascii_digit()) {
                return None;
            }
            exponent = Some(text);
        }

        if chars.next().is_some() {
            return None;
        }

        Some(NumberShape {
            negative,
            integer,
            fraction,
            exponent,
        })
    }
}

/// Validate digit groups split on the grouping separator and join them.
///
/// The first group holds one to three digits and every later group exactly
/// three, so `1,000` is accepted while `1,0` is not a number.
fn join_groups(groups: &[String]) -> Option<String> {
    match groups {
        [single] => Some(single.clone()),
        [first, rest @ ..] => {
            let first_ok = (1..=3).contains(&first.len());
            let rest_ok = rest.iter().all(|group| group.len() == 3);
            (first_ok && rest_ok).then(|| groups.concat())
        }
        [] => None,
    }
}

/// A parsed numeric literal, narrowed to the most specific type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericLiteral {
    /// Integral value within the 32-bit signed range.
    Integer(i32),
    /// Integral value outside the 32-bit range but within 64 bits.
    Long(i64),
    /// Non-integral value, or an integral one beyond 64 bits.
    Double(f64),
}

impl NumericLiteral {
    /// Narrow a 64-bit integer to `Integer` when it fits.
    #[must_use]
    pub fn from_integral(value: i64) -> Self {
        i32::try_from(value).map_or(Self::Long(value), Self::Integer)
    }
}

/// Failure to represent a token that has a numeric shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberParseError {
    /// The exponent does not fit in 64 bits.
    #[error("exponent of '{token}' is out of range")]
    Exponent {
        /// Token being parsed.
        token: String,
    },
    /// The value overflows a 64-bit float.
    #[error("'{token}' is outside the representable numeric range")]
    Overflow {
        /// Token being parsed.
        token: String,
    },
}

struct NumberShape {
    negative: bool,
    integer: String,
    fraction: String,
    exponent: Option<String>,
}

impl NumberShape {
    fn into_literal(self, token: &str) -> Result<NumericLiteral, NumberParseError> {
        let exponent = match &self.exponent {
            Some(text) => i64::from_str(text).map_err(|_: ParseIntError| {
                NumberParseError::Exponent {
                    token: token.to_owned(),
                }
            })?,
            None => 0,
        };

        if let Some(digits) = self.integral_digits(exponent)
            && let Ok(value) = i64::from_str(&self.signed(&digits))
        {
            return Ok(NumericLiteral::from_integral(value));
        }

        let canonical = self.canonical(exponent);
        match f64::from_str(&canonical) {
            Ok(value) if value.is_finite() => Ok(NumericLiteral::Double(value)),
            _ => Err(NumberParseError::Overflow {
                token: token.to_owned(),
            }),
        }
    }

    /// Digits of the integer value when the literal is integral.
    fn integral_digits(&self, exponent: i64) -> Option<String> {
        let digits: String = format!("{}{}", self.integer, self.fraction);
        let integer_len = i64::try_from(self.integer.len()).ok()?;
        let point = integer_len.checked_add(exponent)?;
        if point > MAX_INTEGRAL_DIGITS {
            return None;
        }
        let split = usize::try_from(point.max(0)).ok()?;
        if digits.chars().skip(split).any(|ch| ch != '0') {
            return None;
        }
        let mut whole: String = digits.chars().take(split).collect();
        while whole.len() < split {
            whole.push('0');
        }
        if whole.is_empty() {
            whole.push('0');
        }
        Some(whole)
    }

    fn signed(&self, digits: &str) -> String {
        if self.negative {
            format!("-{digits}")
        } else {
            digits.to_owned()
        }
    }

    fn canonical(&self, exponent: i64) -> String {
        let integer = if self.integer.is_empty() {
            "0"
        } else {
            self.integer.as_str()
        };
        let fraction = if self.fraction.is_empty() {
            "0"
        } else {
            self.fraction.as_str()
        };
        self.signed(&format!("{integer}.{fraction}e{exponent}"))
    }
}
