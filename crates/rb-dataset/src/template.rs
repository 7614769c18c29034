//! Dataset template rendering.
//!
//! Templates are ordinary dataset files containing `{name}` or `{name:spec}`
//! placeholders. The format spec follows the usual format mini-language
//! (`[[fill]align][sign][0][width][.precision][type]`) with two differences
//! that keep fixed-width engine files intact:
//! - numbers that do not fit `width` lose fractional digits one at a time
//!   before [`TemplateError::FieldOverflow`] is raised
//! - text longer than `width` is cut to `width`
//!
//! Everything outside placeholders is copied byte for byte.

use std::collections::HashMap;

use rb_model::{ParameterSet, ParameterValue};

use crate::format::plain_number;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("Placeholder '{name}' at byte {offset} has no value")]
    UnresolvedPlaceholder { name: String, offset: usize },

    #[error("Value {value} of '{name}' does not fit in {width} characters")]
    FieldOverflow {
        name: String,
        value: String,
        width: usize,
    },

    #[error("Invalid format spec '{spec}' for '{name}': {reason}")]
    InvalidFormatSpec {
        name: String,
        spec: String,
        reason: String,
    },
}

pub type TemplateResult<T> = Result<T, TemplateError>;

/// A value that can be substituted into a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&ParameterValue> for TemplateValue {
    fn from(value: &ParameterValue) -> Self {
        match value {
            ParameterValue::Bool(b) => TemplateValue::Bool(*b),
            ParameterValue::Int(i) => TemplateValue::Int(*i),
            ParameterValue::Float(f) => TemplateValue::Float(*f),
            ParameterValue::Text(s) => TemplateValue::Text(s.clone()),
        }
    }
}

/// Named values available to placeholders.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    values: HashMap<String, TemplateValue>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values keyed by `parameterId_parameterName`.
    pub fn from_parameters(parameters: &ParameterSet) -> Self {
        let mut values = Self::new();
        for p in parameters.iter() {
            values.insert(p.identifier(), TemplateValue::from(&p.value));
        }
        values
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TemplateValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Padding between sign and digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    /// Only negative numbers carry a sign.
    #[default]
    Negative,
    Always,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub fill: char,
    pub align: Option<Align>,
    pub sign: Sign,
    pub width: Option<usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: Sign::Negative,
            width: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericStyle {
    /// `f` / `F`
    Fixed,
    /// `d`
    Integer,
}

/// A parsed placeholder format spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSpec {
    Numeric {
        layout: Layout,
        precision: Option<usize>,
        style: NumericStyle,
    },
    /// `s`
    Text {
        layout: Layout,
        precision: Option<usize>,
    },
    /// No type character; resolved against the value at render time.
    Untyped {
        layout: Layout,
        precision: Option<usize>,
    },
}

fn parse_align(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FormatSpec {
    /// Parse the text after the `:` of a placeholder.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;
        let mut layout = Layout::default();

        if chars.len() >= 2
            && let Some(align) = parse_align(chars[1])
        {
            layout.fill = chars[0];
            layout.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(parse_align) {
            layout.align = Some(align);
            i = 1;
        }

        match chars.get(i) {
            Some('+') => {
                layout.sign = Sign::Always;
                i += 1;
            }
            Some('-') => i += 1,
            Some(' ') => {
                layout.sign = Sign::Space;
                i += 1;
            }
            _ => {}
        }

        if chars.get(i) == Some(&'0') {
            if layout.align.is_none() {
                layout.fill = '0';
                layout.align = Some(Align::AfterSign);
            }
            i += 1;
        }

        let digits = |i: &mut usize| -> Option<usize> {
            let start = *i;
            while *i < chars.len() && chars[*i].is_ascii_digit() {
                *i += 1;
            }
            if *i == start {
                None
            } else {
                chars[start..*i].iter().collect::<String>().parse().ok()
            }
        };

        layout.width = digits(&mut i);

        let mut precision = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            precision = Some(digits(&mut i).ok_or("precision expected after '.'")?);
        }

        let kind = chars.get(i).copied();
        if kind.is_some() {
            i += 1;
        }
        if i != chars.len() {
            return Err(format!("unexpected '{}'", chars[i..].iter().collect::<String>()));
        }

        match kind {
            None => Ok(FormatSpec::Untyped { layout, precision }),
            Some('f') | Some('F') => Ok(FormatSpec::Numeric {
                layout,
                precision,
                style: NumericStyle::Fixed,
            }),
            Some('d') => {
                if precision.is_some() {
                    return Err("precision not allowed for integer format".to_string());
                }
                Ok(FormatSpec::Numeric {
                    layout,
                    precision,
                    style: NumericStyle::Integer,
                })
            }
            Some('s') => {
                if layout.sign != Sign::Negative || layout.align == Some(Align::AfterSign) {
                    return Err("sign options not allowed for text format".to_string());
                }
                Ok(FormatSpec::Text { layout, precision })
            }
            Some(other) => Err(format!("unsupported format type '{other}'")),
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            FormatSpec::Numeric { layout, .. }
            | FormatSpec::Text { layout, .. }
            | FormatSpec::Untyped { layout, .. } => *layout,
        }
    }
}

fn pad(sign: &str, body: &str, layout: &Layout, default_align: Align) -> String {
    let len = sign.chars().count() + body.chars().count();
    let width = layout.width.unwrap_or(0);
    if len >= width {
        return format!("{sign}{body}");
    }
    let n = width - len;
    let fill = |k: usize| std::iter::repeat_n(layout.fill, k).collect::<String>();
    match layout.align.unwrap_or(default_align) {
        Align::Left => format!("{sign}{body}{}", fill(n)),
        Align::Right => format!("{}{sign}{body}", fill(n)),
        Align::Center => format!("{}{sign}{body}{}", fill(n / 2), fill(n - n / 2)),
        Align::AfterSign => format!("{sign}{}{body}", fill(n)),
    }
}

fn sign_text(negative: bool, sign: Sign) -> &'static str {
    match (negative, sign) {
        (true, _) => "-",
        (false, Sign::Always) => "+",
        (false, Sign::Space) => " ",
        (false, Sign::Negative) => "",
    }
}

fn fixed_digits(value: f64, precision: usize) -> (bool, String) {
    let text = format!("{:.*}", precision, value.abs());
    let negative = value.is_sign_negative() && text.chars().any(|c| c.is_ascii_digit() && c != '0');
    (negative, text)
}

fn natural_precision(value: f64) -> usize {
    let text = plain_number(value);
    text.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0)
}

fn render_number(name: &str, value: f64, layout: &Layout, precision: usize) -> TemplateResult<String> {
    if !value.is_finite() {
        let body = plain_number(value.abs());
        let sign = sign_text(value.is_sign_negative() && !value.is_nan(), layout.sign);
        if let Some(width) = layout.width
            && sign.len() + body.len() > width
        {
            return Err(TemplateError::FieldOverflow {
                name: name.to_string(),
                value: plain_number(value),
                width,
            });
        }
        return Ok(pad(sign, &body, layout, Align::Right));
    }

    let Some(width) = layout.width else {
        let (negative, digits) = fixed_digits(value, precision);
        return Ok(pad(sign_text(negative, layout.sign), &digits, layout, Align::Right));
    };

    let mut p = precision;
    loop {
        let (negative, digits) = fixed_digits(value, p);
        let sign = sign_text(negative, layout.sign);
        if sign.len() + digits.len() <= width {
            if p < precision {
                tracing::debug!(name, precision, reduced = p, "reduced precision to fit field");
            }
            return Ok(pad(sign, &digits, layout, Align::Right));
        }
        if p == 0 {
            return Err(TemplateError::FieldOverflow {
                name: name.to_string(),
                value: plain_number(value),
                width,
            });
        }
        p -= 1;
    }
}

fn render_integer(name: &str, value: i64, layout: &Layout) -> TemplateResult<String> {
    let digits = value.unsigned_abs().to_string();
    let sign = sign_text(value < 0, layout.sign);
    if let Some(width) = layout.width
        && sign.len() + digits.len() > width
    {
        return Err(TemplateError::FieldOverflow {
            name: name.to_string(),
            value: value.to_string(),
            width,
        });
    }
    Ok(pad(sign, &digits, layout, Align::Right))
}

fn render_text(text: &str, layout: &Layout, precision: Option<usize>) -> String {
    let mut limit = usize::MAX;
    if let Some(p) = precision {
        limit = limit.min(p);
    }
    if let Some(w) = layout.width {
        limit = limit.min(w);
    }
    let cut: String = text.chars().take(limit).collect();
    pad("", &cut, layout, Align::Left)
}

fn invalid(name: &str, spec: &str, reason: impl Into<String>) -> TemplateError {
    TemplateError::InvalidFormatSpec {
        name: name.to_string(),
        spec: spec.to_string(),
        reason: reason.into(),
    }
}

/// Format one value according to an optional spec.
pub fn format_value(name: &str, value: &TemplateValue, spec: Option<&str>) -> TemplateResult<String> {
    let Some(spec_text) = spec else {
        return Ok(match value {
            TemplateValue::Bool(b) => u8::from(*b).to_string(),
            TemplateValue::Int(i) => i.to_string(),
            TemplateValue::Float(f) => plain_number(*f),
            TemplateValue::Text(s) => s.clone(),
        });
    };

    let parsed = FormatSpec::parse(spec_text).map_err(|reason| invalid(name, spec_text, reason))?;

    match (parsed, value) {
        (FormatSpec::Text { layout, precision }, TemplateValue::Text(s))
        | (FormatSpec::Untyped { layout, precision }, TemplateValue::Text(s)) => {
            if layout.sign != Sign::Negative || layout.align == Some(Align::AfterSign) {
                return Err(invalid(name, spec_text, "sign options not allowed for text"));
            }
            Ok(render_text(s, &layout, precision))
        }
        (FormatSpec::Text { .. }, _) => Err(invalid(name, spec_text, "text format for a non-text value")),
        (FormatSpec::Numeric { .. }, TemplateValue::Text(_)) => {
            Err(invalid(name, spec_text, "numeric format for a text value"))
        }

        (FormatSpec::Numeric { layout, style: NumericStyle::Integer, .. }, TemplateValue::Bool(b)) => {
            render_integer(name, i64::from(*b), &layout)
        }
        (FormatSpec::Numeric { layout, style: NumericStyle::Integer, .. }, TemplateValue::Int(i)) => {
            render_integer(name, *i, &layout)
        }
        (FormatSpec::Numeric { style: NumericStyle::Integer, .. }, TemplateValue::Float(_)) => {
            Err(invalid(name, spec_text, "integer format for a float value"))
        }

        (FormatSpec::Numeric { layout, precision, style: NumericStyle::Fixed }, v) => {
            let x = match v {
                TemplateValue::Bool(b) => f64::from(u8::from(*b)),
                TemplateValue::Int(i) => *i as f64,
                TemplateValue::Float(f) => *f,
                TemplateValue::Text(_) => {
                    return Err(invalid(name, spec_text, "numeric format for a text value"));
                }
            };
            render_number(name, x, &layout, precision.unwrap_or(6))
        }

        (FormatSpec::Untyped { layout, .. }, TemplateValue::Bool(b)) => {
            render_integer(name, i64::from(*b), &layout)
        }
        (FormatSpec::Untyped { layout, precision }, TemplateValue::Int(i)) => match precision {
            Some(p) => render_number(name, *i as f64, &layout, p),
            None => render_integer(name, *i, &layout),
        },
        (FormatSpec::Untyped { layout, precision }, TemplateValue::Float(f)) => {
            let p = precision.unwrap_or_else(|| natural_precision(*f));
            render_number(name, *f, &layout, p)
        }
    }
}

/// Scanner state.
enum State {
    Literal,
    /// Inside `{`; holds the byte offset of the brace.
    Brace(usize),
}

/// Render `template`, substituting every placeholder from `values`.
///
/// `{}`, braces spanning a line break and an unterminated `{` are copied
/// literally. A `{` inside an open brace restarts the placeholder there.
pub fn render_template(template: &[u8], values: &TemplateValues) -> TemplateResult<Vec<u8>> {
    let mut out = Vec::with_capacity(template.len());
    let mut state = State::Literal;

    for (i, &byte) in template.iter().enumerate() {
        state = match state {
            State::Literal => {
                if byte == b'{' {
                    State::Brace(i)
                } else {
                    out.push(byte);
                    State::Literal
                }
            }
            State::Brace(start) => match byte {
                b'}' if i == start + 1 => {
                    out.extend_from_slice(b"{}");
                    State::Literal
                }
                b'}' => {
                    let rendered = substitute(&template[start + 1..i], start, values)?;
                    out.extend_from_slice(rendered.as_bytes());
                    State::Literal
                }
                b'{' => {
                    out.extend_from_slice(&template[start..i]);
                    State::Brace(i)
                }
                b'\n' => {
                    out.extend_from_slice(&template[start..=i]);
                    State::Literal
                }
                _ => State::Brace(start),
            },
        };
    }

    if let State::Brace(start) = state {
        out.extend_from_slice(&template[start..]);
    }
    Ok(out)
}

fn substitute(inner: &[u8], offset: usize, values: &TemplateValues) -> TemplateResult<String> {
    let inner = String::from_utf8_lossy(inner);
    let (name, spec) = match inner.split_once(':') {
        Some((name, spec)) if !spec.is_empty() => (name, Some(spec)),
        Some((name, _)) => (name, None),
        None => (inner.as_ref(), None),
    };

    let value = values
        .get(name)
        .ok_or_else(|| TemplateError::UnresolvedPlaceholder {
            name: name.to_string(),
            offset,
        })?;
    format_value(name, value, spec)
}
