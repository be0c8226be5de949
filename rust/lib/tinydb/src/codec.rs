//! Value encoding for the flat-file format.
//!
//! A stored value is plain text with the reserved characters `=`, `\r` and
//! `\n` replaced by tokens. Arrays additionally replace `,` so elements can be
//! joined with a bare comma:
//!
//! ```text
//! greeting=a<eq>b<lf>c           "a=b\nc"
//! tags=x<cm>y,<<eq>>,            ["x,y", "<eq>", ""]
//! ```
//!
//! Rules are applied strictly in table order. Each table first protects
//! literal occurrences of its token (`<eq>` -> `<<eq>>`) and only then
//! replaces the reserved character with the token. The decode tables run the
//! encode tables backwards: the token becomes the character, which turns a
//! protected `<<eq>>` into `<=>`, and `<=>` is then put back to `<eq>`.
//!
//! The scheme is not injective: a value that literally contains `<=>`,
//! `<\r>` or `<\n>` (or `<,>` inside an array element) encodes exactly like
//! the corresponding token and reads back as the token.

use crate::error::{Result, TinyDbError};

type Rule = (&'static str, &'static str);

pub(crate) const SCALAR_ESCAPE: [Rule; 6] = [
    ("<eq>", "<<eq>>"),
    ("=", "<eq>"),
    ("<cr>", "<<cr>>"),
    ("\r", "<cr>"),
    ("<lf>", "<<lf>>"),
    ("\n", "<lf>"),
];

pub(crate) const SCALAR_UNESCAPE: [Rule; 6] = [
    ("<lf>", "\n"),
    ("<\n>", "<lf>"),
    ("<cr>", "\r"),
    ("<\r>", "<cr>"),
    ("<eq>", "="),
    ("<=>", "<eq>"),
];

pub(crate) const COMMA_ESCAPE: [Rule; 2] = [("<cm>", "<<cm>>"), (",", "<cm>")];

pub(crate) const COMMA_UNESCAPE: [Rule; 2] = [("<cm>", ","), ("<,>", "<cm>")];

/// Separator between array elements in an encoded value.
pub const ARRAY_SEPARATOR: char = ',';

fn apply(rules: &[Rule], text: &str) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Escape `=`, `\r` and `\n` in a scalar value.
pub fn escape(text: &str) -> String {
    apply(&SCALAR_ESCAPE, text)
}

/// Reverse of [`escape`].
pub fn unescape(text: &str) -> String {
    apply(&SCALAR_UNESCAPE, text)
}

/// Encode a sequence of plain strings as one array value.
pub fn encode_array<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push(ARRAY_SEPARATOR);
        }
        out.push_str(&apply(&COMMA_ESCAPE, &escape(item.as_ref())));
    }
    out
}

/// Decode an array value into plain strings.
///
/// The empty string is the empty array, so a one-element array holding an
/// empty string reads back as `[]`.
pub fn decode_array(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(ARRAY_SEPARATOR)
        .map(|element| unescape(&apply(&COMMA_UNESCAPE, element)))
        .collect()
}

/// Text form of a value, before escaping.
pub trait Encode {
    fn to_text(&self) -> String;
}

/// A value kind that can be read back from its text form.
pub trait Scalar: Encode + Sized {
    /// Name used in format errors.
    const KIND: &'static str;

    fn from_text(text: &str) -> Option<Self>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn to_text(&self) -> String {
        (**self).to_text()
    }
}

impl Encode for str {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Encode for String {
    fn to_text(&self) -> String {
        self.clone()
    }
}

impl Scalar for String {
    const KIND: &'static str = "string";

    fn from_text(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

impl Encode for bool {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl Scalar for bool {
    const KIND: &'static str = "bool";

    fn from_text(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("true") {
            Some(true)
        } else if text.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! numeric_scalar {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn to_text(&self) -> String {
                    self.to_string()
                }
            }

            impl Scalar for $ty {
                const KIND: &'static str = $kind;

                fn from_text(text: &str) -> Option<Self> {
                    text.parse().ok()
                }
            }
        )*
    };
}

// Float `Display` is the shortest text that parses back to the same value and
// never depends on locale. `FromStr` also takes `1.0E10`, `NaN`, `Infinity`.
numeric_scalar!(
    i8 => "byte",
    i16 => "short",
    i32 => "int",
    i64 => "long",
    f32 => "float",
    f64 => "double",
);

/// Encode one scalar value for storage.
pub fn encode<V: Encode + ?Sized>(value: &V) -> String {
    escape(&value.to_text())
}

/// Encode a slice of values as one array value.
pub fn encode_slice<V: Encode>(values: &[V]) -> String {
    encode_array(values.iter().map(Encode::to_text))
}

/// Decode a stored scalar. `key` only feeds the error message.
pub fn decode<T: Scalar>(key: &str, raw: &str) -> Result<T> {
    T::from_text(&unescape(raw)).ok_or_else(|| format_error::<T>(key, raw))
}

/// Decode a stored array, failing on the first malformed element.
pub fn decode_vec<T: Scalar>(key: &str, raw: &str) -> Result<Vec<T>> {
    decode_array(raw)
        .iter()
        .map(|element| T::from_text(element).ok_or_else(|| format_error::<T>(key, raw)))
        .collect()
}

fn format_error<T: Scalar>(key: &str, raw: &str) -> TinyDbError {
    TinyDbError::Format {
        key: key.to_string(),
        raw: raw.to_string(),
        kind: T::KIND,
    }
}
