use std::cmp::Ordering;
use std::iter::Peekable;

/// Minimum number of characters of each half of an identity code.
pub const IDENTITY_WIDTH: usize = 2;

/// Builds the identity code `{group}-{index}` of a candidate.
///
/// Both parts are left-padded with zeros to two characters. Missing values
/// become `00`, so records without any position all end up in `00-00`.
///
/// ```
/// use score_aggregation::identity_code;
/// assert_eq!(identity_code("3", "5"), "03-05");
/// assert_eq!(identity_code("", ""), "00-00");
/// assert_eq!(identity_code("12", "104"), "12-104");
/// ```
pub fn identity_code(group_number: &str, group_index: &str) -> String {
    format!("{}-{}", pad_zeros(group_number), pad_zeros(group_index))
}

fn pad_zeros(s: &str) -> String {
    let len = s.chars().count();
    if len >= IDENTITY_WIDTH {
        s.to_string()
    } else {
        format!("{}{}", "0".repeat(IDENTITY_WIDTH - len), s)
    }
}

/// Compares two strings, treating runs of digits as numbers.
///
/// Letters are compared without regard to case. Leading zeros are not
/// significant: `02` and `2` compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut xs = a.chars().peekable();
    let mut ys = b.chars().peekable();
    loop {
        match (xs.peek().copied(), ys.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let dx = take_digits(&mut xs);
                let dy = take_digits(&mut ys);
                let ord = cmp_digit_runs(&dx, &dy);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                xs.next();
                ys.next();
            }
        }
    }
}

fn take_digits<I: Iterator<Item = char>>(it: &mut Peekable<I>) -> String {
    let mut digits = String::new();
    while let Some(c) = it.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

// Compares without parsing, so that arbitrarily long runs do not overflow.
fn cmp_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
