fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    let rounded = (value * scale).round() / scale;
    // Avoid printing "-0.0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Formats a ratio as a percentage with at most two decimals, eg. `93.47 percent`.
pub fn percent(ratio: f64) -> String {
    format!("{:?} percent", round_to(ratio * 100.0, 2))
}

/// Label for the relative difference of a ratio against 1.0, eg. `+10.00 %` or `-3.25 %`.
/// Differences that round to zero carry no sign.
pub fn percent_difference(ratio: f64) -> String {
    let difference = (ratio - 1.0) * 100.0;
    let magnitude = format!("{:.2}", difference.abs());
    let sign = if magnitude.bytes().all(|b| b == b'0' || b == b'.') {
        ""
    } else if difference > 0.0 {
        "+"
    } else {
        "-"
    };
    format!("{}{} %", sign, magnitude)
}

/// Numeric axis label, rounded to three decimals.
pub fn tick_label(value: f64) -> String {
    format!("{:?}", round_to(value, 3))
}

fn short(n: f64) -> String {
    if n < 10.0 {
        format!("{:.4}", n)
    } else if n < 100.0 {
        format!("{:.3}", n)
    } else if n < 1000.0 {
        format!("{:.2}", n)
    } else if n < 10000.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

pub fn time(ns: f64) -> String {
    if ns < 1.0 {
        format!("{:>6} ps", short(ns * 1e3))
    } else if ns < 10f64.powi(3) {
        format!("{:>6} ns", short(ns))
    } else if ns < 10f64.powi(6) {
        format!("{:>6} us", short(ns / 1e3))
    } else if ns < 10f64.powi(9) {
        format!("{:>6} ms", short(ns / 1e6))
    } else {
        format!("{:>6} s", short(ns / 1e9))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.934_712), "93.47 percent");
        assert_eq!(percent(1.0), "100.0 percent");
        assert_eq!(percent(0.5), "50.0 percent");
    }

    #[test]
    fn test_percent_difference() {
        assert_eq!(percent_difference(0.9), "-10.00 %");
        assert_eq!(percent_difference(1.1), "+10.00 %");
        assert_eq!(percent_difference(1.0), "0.00 %");
        assert_eq!(percent_difference(0.999_99), "0.00 %");
        assert_eq!(percent_difference(1.5), "+50.00 %");
    }

    #[test]
    fn test_tick_label() {
        assert_eq!(tick_label(0.0), "0.0");
        assert_eq!(tick_label(0.30000000000000004), "0.3");
        assert_eq!(tick_label(1.0), "1.0");
        assert_eq!(tick_label(0.1234), "0.123");
        assert_eq!(tick_label(-0.0001), "0.0");
    }

    #[test]
    fn test_time() {
        assert_eq!(time(1.5e6), "1.5000 ms");
        assert_eq!(time(250.0), "250.00 ns");
    }
}
