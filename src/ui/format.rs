//! Number formatting for the KPI row and tooltips.

/// `$12.3M`
pub fn millions(amount: f64) -> String {
    format!("${:.1}M", amount / 1e6)
}

/// `12.3%` from a fraction in [0, 1].
pub fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Integer with thousands separators: `1,234,567`.
pub fn count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$1,234.56`
pub fn dollars(amount: f64) -> String {
    let cents = (amount * 100.0).round() as u64;
    format!("${}.{:02}", count((cents / 100) as usize), cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kpi_formats() {
        assert_eq!(millions(12_345_678.0), "$12.3M");
        assert_eq!(millions(0.0), "$0.0M");
        assert_eq!(percent(0.1234), "12.3%");
        assert_eq!(count(0), "0");
        assert_eq!(count(999), "999");
        assert_eq!(count(1_234_567), "1,234,567");
        assert_eq!(dollars(1234.5), "$1,234.50");
    }
}
