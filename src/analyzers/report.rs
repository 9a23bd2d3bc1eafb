//! Plain-text summaries of the punctuality and speed passes.

use crate::analyzers::speed::PlaceCount;
use crate::model::PunctualityByLine;

/// `part` as a percentage of `total`; 0.0 when `total` is zero.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Rounds to two decimal places.
///
/// Works on the exact binary value, so `2.675` (stored just below) gives
/// `2.67`, and exact halves such as `0.125` go to the even neighbour.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let bits = value.to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    let (mantissa, exponent) = if biased_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased_exponent - 1075)
    };
    if exponent >= 0 {
        return value;
    }

    let shift = exponent.unsigned_abs();
    if shift > 120 {
        return 0.0_f64.copysign(value);
    }

    // value * 100 == scaled / 2^shift exactly
    let scaled = u128::from(mantissa) * 100;
    let whole = scaled >> shift;
    let rest = scaled - (whole << shift);
    let half = 1u128 << (shift - 1);
    let hundredths = if rest > half || (rest == half && whole % 2 == 1) {
        whole + 1
    } else {
        whole
    };

    (hundredths as f64 / 100.0).copysign(value)
}

/// Renders a float the way reports print it: whole numbers keep one decimal
/// (`100.0`), everything else uses the shortest exact form (`33.33`).
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Lines ranked by their share of punctuality incidents, highest first.
pub fn punctuality_summary(by_line: &PunctualityByLine) -> String {
    let mut ranked: Vec<(&str, f64)> = by_line
        .lines
        .iter()
        .map(|l| (l.line.as_str(), round2(pct(l.incidents(), l.records.len()))))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut summary = String::from("Percentage of punctuality incidents:\n");
    for (line, share) in ranked {
        summary.push_str(&format!("- {line} line: {}% incidents.\n", format_decimal(share)));
    }
    summary
}

pub fn short_speed_summary(
    speed_limit: u32,
    incidents: usize,
    lines_with_incidents: usize,
    total_lines: usize,
) -> String {
    let ratio = round2(pct(lines_with_incidents, total_lines));
    format!(
        "Speed limit: {speed_limit} km/h.\n\
         Total number of incidents: {incidents}.\n\
         {lines_with_incidents}/{total_lines} buses had incidents ({}%).\n",
        format_decimal(ratio)
    )
}

/// Lines with their incident counts, one aligned row per line.
pub fn top_lines_summary(top: &[(&str, usize)]) -> String {
    let mut summary = String::from("Top 3 buses with highest number of incidents were:\n");

    let values: Vec<String> = top.iter().map(|(_, n)| format!("{n} incidents")).collect();
    let line_width = top.iter().map(|(line, _)| line.len()).max().unwrap_or(0);
    let value_width = values.iter().map(String::len).max().unwrap_or(0);

    for ((line, _), value) in top.iter().zip(&values) {
        summary.push_str(&format!("{line:<line_width$}    {value:>value_width$}\n"));
    }
    summary
}

pub fn top_places_summary(places: &[PlaceCount]) -> String {
    let mut summary = String::from("Top 3 places with highest number of incidents were:\n");
    for place in places {
        summary.push_str(&format!(
            "({}, {}) - {} incidents.\n",
            format_decimal(round2(place.lat)),
            format_decimal(round2(place.lon)),
            place.count
        ));
    }
    summary
}
