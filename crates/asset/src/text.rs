//! Line splitting and numeric field parsing shared by the OBJ and MTL parsers.

use corelib::ErrorKind;

/// How malformed numeric fields are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NumberMode {
    /// Reject the file with [`ErrorKind::MalformedNumericField`].
    #[default]
    Strict,
    /// Store `NaN` (floats) or leave the property unset (integers) and keep going.
    Lenient,
}

/// Parser configuration shared by mesh and material parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub numbers: NumberMode,
}

impl ParseOptions {
    pub fn lenient() -> Self {
        Self {
            numbers: NumberMode::Lenient,
        }
    }
}

/// Non-fatal findings collected while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownKeyword { line: usize, keyword: String },
}

/// One meaningful line: keyword, whitespace-split arguments and the raw
/// argument text after the keyword.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub keyword: &'a str,
    pub args: Vec<&'a str>,
    pub rest: &'a str,
}

impl<'a> Line<'a> {
    /// Arguments up to the first token opening a trailing `#` comment.
    /// Name-valued keywords keep `rest` verbatim and must not use this.
    pub fn data_args(&self) -> &[&'a str] {
        let end = self
            .args
            .iter()
            .position(|arg| arg.starts_with('#'))
            .unwrap_or(self.args.len());
        &self.args[..end]
    }
}

/// Iterate over non-blank lines, skipping lines that start with `#`.
/// Line numbers are 1-based.
pub fn lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let content = raw.trim();
        if content.starts_with('#') {
            return None;
        }
        let mut parts = content.split_whitespace();
        let keyword = parts.next()?;
        let rest = content[keyword.len()..].trim();
        Some(Line {
            number: idx + 1,
            keyword,
            args: parts.collect(),
            rest,
        })
    })
}

pub fn parse_float(
    token: &str,
    field: &'static str,
    line: usize,
    mode: NumberMode,
) -> Result<f32, ErrorKind> {
    match token.parse::<f32>() {
        Ok(value) => Ok(value),
        Err(_) if mode == NumberMode::Lenient => {
            log::warn!("line {}: '{}' is not a number ({}), using NaN", line, token, field);
            Ok(f32::NAN)
        }
        Err(_) => Err(ErrorKind::MalformedNumericField {
            field,
            token: token.to_string(),
        }),
    }
}

/// Parse the first `N` arguments as floats.
pub fn parse_floats<const N: usize>(
    args: &[&str],
    field: &'static str,
    line: usize,
    mode: NumberMode,
) -> Result<[f32; N], ErrorKind> {
    if args.len() < N {
        return Err(ErrorKind::MissingField(field));
    }
    let mut out = [0.0; N];
    for (slot, token) in out.iter_mut().zip(args) {
        *slot = parse_float(token, field, line, mode)?;
    }
    Ok(out)
}

pub fn parse_int(
    token: &str,
    field: &'static str,
    line: usize,
    mode: NumberMode,
) -> Result<Option<i32>, ErrorKind> {
    match token.parse::<i32>() {
        Ok(value) => Ok(Some(value)),
        Err(_) if mode == NumberMode::Lenient => {
            log::warn!("line {}: '{}' is not an integer ({}), ignoring", line, token, field);
            Ok(None)
        }
        Err(_) => Err(ErrorKind::MalformedNumericField {
            field,
            token: token.to_string(),
        }),
    }
}
