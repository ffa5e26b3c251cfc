pub mod json;
pub mod table;

use thiserror::Error;

/// Decimal places kept in every reported number.
pub const REPORT_DECIMALS: u32 = 3;
pub const UNDEFINED: &str = "undefined";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("JSON error writing {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Rounds half away from zero on the shortest decimal form of `v`, so
/// 0.8005 becomes 0.801 although its binary value sits below the midpoint.
pub fn round_decimal(v: f64, places: u32) -> f64 {
    if !v.is_finite() || v.abs() >= 1e15 {
        return v;
    }
    let text = format!("{}", v.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => return v,
    };
    let places = places as usize;
    if frac_part.len() <= places {
        return v;
    }

    let mut scaled: i128 = int_part.parse().unwrap_or(0);
    for d in frac_part[..places].bytes() {
        scaled = scaled * 10 + i128::from(d - b'0');
    }
    if frac_part.as_bytes()[places] >= b'5' {
        scaled += 1;
    }

    let out = scaled as f64 / 10f64.powi(places as i32);
    if v.is_sign_negative() { -out } else { out }
}

pub fn round3(v: f64) -> f64 {
    round_decimal(v, REPORT_DECIMALS)
}

/// Cell text for a reported number; absent values become an empty cell.
pub fn format_score(v: Option<f64>) -> String {
    match v {
        Some(v) => format_number(round3(v)),
        None => String::new(),
    }
}

/// Cell text for a correlation statistic; undefined is spelled out.
pub fn format_statistic(v: Option<f64>) -> String {
    match v {
        Some(v) => format_number(v),
        None => UNDEFINED.to_string(),
    }
}

fn format_number(v: f64) -> String {
    // -0.0 would print as "-0"
    if v == 0.0 {
        "0.0".to_string()
    } else if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
