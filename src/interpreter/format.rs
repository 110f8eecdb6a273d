//! printf-style format engine shared by `printf`/`format`/`sprintf`, Print's
//! printf mode, Input's specifier detection and `__format__` (spec §4.3.1).

use crate::value::{format_number, Value};

/// True if `s` contains a `%` conversion that is not part of a literal `%%`.
pub fn has_format_spec(s: &str) -> bool {
    let bytes: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == '%' {
            if bytes.get(i + 1) == Some(&'%') {
                i += 2;
                continue;
            }
            return true;
        }
        i += 1;
    }
    false
}

struct Spec {
    left_align: bool,
    sign: bool,
    space: bool,
    zero_pad: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conv: char,
}

/// Parses the first `%...conv` spec in `fmt` starting at byte `start`.
/// Returns the spec plus the index immediately following the conversion char.
fn parse_spec(chars: &[char], start: usize) -> Option<(Spec, usize)> {
    let mut i = start;
    if chars.get(i) != Some(&'%') {
        return None;
    }
    i += 1;

    let mut left_align = false;
    let mut sign = false;
    let mut space = false;
    let mut zero_pad = false;
    let mut alt = false;
    loop {
        match chars.get(i) {
            Some('-') => {
                left_align = true;
                i += 1;
            }
            Some('+') => {
                sign = true;
                i += 1;
            }
            Some(' ') => {
                space = true;
                i += 1;
            }
            Some('0') => {
                zero_pad = true;
                i += 1;
            }
            Some('#') => {
                alt = true;
                i += 1;
            }
            _ => break,
        }
    }

    let mut width = None;
    let mut width_digits = String::new();
    while let Some(c) = chars.get(i) {
        if c.is_ascii_digit() {
            width_digits.push(*c);
            i += 1;
        } else {
            break;
        }
    }
    if !width_digits.is_empty() {
        width = width_digits.parse().ok();
    }

    let mut precision = None;
    if chars.get(i) == Some(&'.') {
        i += 1;
        let mut digits = String::new();
        while let Some(c) = chars.get(i) {
            if c.is_ascii_digit() {
                digits.push(*c);
                i += 1;
            } else {
                break;
            }
        }
        precision = Some(digits.parse().unwrap_or(0));
    }

    let conv = *chars.get(i)?;
    i += 1;

    Some((
        Spec {
            left_align,
            sign,
            space,
            zero_pad,
            alt,
            width,
            precision,
            conv,
        },
        i,
    ))
}

fn pad_field(body: String, spec: &Spec, numeric: bool) -> String {
    let Some(width) = spec.width else { return body };
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if spec.left_align {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero_pad && numeric {
        if let Some(stripped) = body.strip_prefix('-') {
            format!("-{}{stripped}", "0".repeat(fill))
        } else if let Some(stripped) = body.strip_prefix('+') {
            format!("+{}{stripped}", "0".repeat(fill))
        } else {
            format!("{}{body}", "0".repeat(fill))
        }
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

fn sign_prefix(spec: &Spec, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if spec.sign {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn render(spec: &Spec, value: Option<&Value>) -> String {
    match spec.conv {
        '%' => "%".to_owned(),
        'd' | 'i' | 'u' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0).trunc();
            let digits = n.abs().to_string();
            let digits = match spec.precision {
                Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
                _ => digits,
            };
            let body = format!("{}{digits}", sign_prefix(spec, n < 0.0));
            pad_field(body, spec, true)
        }
        'f' | 'F' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0);
            let prec = spec.precision.unwrap_or(6);
            let digits = format!("{:.*}", prec, n.abs());
            let body = format!("{}{digits}", sign_prefix(spec, n.is_sign_negative() && n != 0.0));
            pad_field(body, spec, true)
        }
        'e' | 'E' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0);
            let prec = spec.precision.unwrap_or(6);
            let mut text = format!("{:.*e}", prec, n.abs());
            if let Some(pos) = text.find('e') {
                let (mantissa, exp) = text.split_at(pos);
                let exp_num: i32 = exp[1..].parse().unwrap_or(0);
                text = format!("{mantissa}e{}{:02}", if exp_num < 0 { "-" } else { "+" }, exp_num.abs());
            }
            if spec.conv == 'E' {
                text = text.to_uppercase();
            }
            let body = format!("{}{text}", sign_prefix(spec, n < 0.0));
            pad_field(body, spec, true)
        }
        'g' | 'G' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0);
            let body = format_number(n);
            let body = if spec.conv == 'G' { body.to_uppercase() } else { body };
            pad_field(body, spec, true)
        }
        's' => {
            let s = value.map(display_plain).unwrap_or_default();
            let s = match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            };
            pad_field(s, spec, false)
        }
        'c' => {
            let s = match value {
                Some(Value::Number(n)) => char::from_u32(*n as u32).map(|c| c.to_string()).unwrap_or_default(),
                Some(Value::String(s)) => s.chars().next().map(|c| c.to_string()).unwrap_or_default(),
                _ => String::new(),
            };
            pad_field(s, spec, false)
        }
        'x' | 'X' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0) as i64;
            let mut digits = format!("{:x}", n.unsigned_abs());
            if spec.conv == 'X' {
                digits = digits.to_uppercase();
            }
            let prefix = if spec.alt {
                if spec.conv == 'X' {
                    "0X"
                } else {
                    "0x"
                }
            } else {
                ""
            };
            let body = format!("{}{prefix}{digits}", if n < 0 { "-" } else { "" });
            pad_field(body, spec, true)
        }
        'o' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0) as i64;
            let digits = format!("{:o}", n.unsigned_abs());
            let prefix = if spec.alt { "0" } else { "" };
            let body = format!("{}{prefix}{digits}", if n < 0 { "-" } else { "" });
            pad_field(body, spec, true)
        }
        'b' => {
            let n = value.and_then(Value::as_number).unwrap_or(0.0) as i64;
            let digits = format!("{:b}", n.unsigned_abs());
            let prefix = if spec.alt { "0b" } else { "" };
            let body = format!("{}{prefix}{digits}", if n < 0 { "-" } else { "" });
            pad_field(body, spec, true)
        }
        'B' => {
            let truthy = value.map(Value::is_truthy).unwrap_or(false);
            pad_field(if truthy { "true".to_owned() } else { "false".to_owned() }, spec, false)
        }
        't' => pad_field(value.map(|v| v.type_name().to_owned()).unwrap_or_default(), spec, false),
        other => format!("%{other}"),
    }
}

fn display_plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => b.to_string(),
        Value::Nil => "nil".to_owned(),
        other => other.type_name().to_owned(),
    }
}

/// Applies `fmt`'s `%...` specs against `args` in order, per spec §4.3.1.
pub fn printf(fmt: &str, args: &[Value]) -> String {
    let chars: Vec<char> = fmt.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    let mut arg_idx = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            if chars.get(i + 1) == Some(&'%') {
                out.push('%');
                i += 2;
                continue;
            }
            if let Some((spec, next)) = parse_spec(&chars, i) {
                let value = args.get(arg_idx);
                if spec.conv != '%' {
                    arg_idx += 1;
                }
                out.push_str(&render(&spec, value));
                i = next;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Strips every `%...conv` run from `s`, used to render an `input()` prompt
/// without its specifiers. Returns the stripped text and the first
/// conversion char encountered, if any.
pub fn strip_specs(s: &str) -> (String, Option<char>) {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::new();
    let mut first_conv = None;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '%' {
            if chars.get(i + 1) == Some(&'%') {
                out.push('%');
                i += 2;
                continue;
            }
            if let Some((spec, next)) = parse_spec(&chars, i) {
                if first_conv.is_none() {
                    first_conv = Some(spec.conv);
                }
                i = next;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    (out, first_conv)
}

/// Input's type auto-detection when no format specifier drives it: integer
/// or float parse first, falling back to a plain string.
pub fn auto_numeric(line: &str) -> Value {
    let trimmed = line.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        Value::Number(n)
    } else {
        Value::String(line.to_owned())
    }
}
