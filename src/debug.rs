use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|f| dtoa(*f, FLOAT_CONFIG)).collect();
    format!("[{}]", a.join(", "))
}

/// Formats complex powers as `(P, Q)` pairs.
pub fn format_pq_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v
        .iter()
        .map(|s| {
            format!(
                "({}, {})",
                dtoa(s.re, FLOAT_CONFIG),
                dtoa(s.im, FLOAT_CONFIG)
            )
        })
        .collect();
    format!("[{}]", a.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_vectors() {
        assert_eq!(format_f64_vec(&[1.02, -3.5, 2.0]), "[1.02, -3.5, 2]");
        assert_eq!(format_f64_vec(&[]), "[]");
        assert_eq!(
            format_pq_vec(&[Complex64::new(40.0, 10.0), Complex64::new(4.0, -10.5)]),
            "[(40, 10), (4, -10.5)]"
        );
    }
}
