//! Reading balls from whitespace-separated `x y z r` text.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::types::Ball;

/// Ball from the last four numeric columns of a line; leading columns are labels.
fn parse_line(line: &str) -> Option<Ball> {
    let mut parts = line.split_whitespace().rev();
    let r: f64 = parts.next()?.parse().ok()?;
    let z: f64 = parts.next()?.parse().ok()?;
    let y: f64 = parts.next()?.parse().ok()?;
    let x: f64 = parts.next()?.parse().ok()?;
    Some(Ball::new(x, y, z, r))
}

/// Parse balls, one per line.
///
/// Blank lines and lines starting with `#` are ignored; other lines without four
/// trailing numbers are skipped with a warning.
///
/// # Errors
/// Returns an error if reading fails.
pub fn parse_xyzr<R: BufRead>(reader: R) -> io::Result<Vec<Ball>> {
    let mut balls = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_line(trimmed) {
            Some(ball) => balls.push(ball),
            None => warn!("Line {}: expected `x y z r`, skipping: {trimmed}", number + 1),
        }
    }
    debug!("Parsed {} balls", balls.len());
    Ok(balls)
}

/// Read balls from `path`, or from stdin when `path` is `None`.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn read_balls(path: Option<&Path>) -> io::Result<Vec<Ball>> {
    match path {
        Some(path) => parse_xyzr(BufReader::new(File::open(path)?)),
        None => parse_xyzr(io::stdin().lock()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_columns() {
        let data = "1.0 2.0 3.0 4.0\n5.0 6.0 7.0 8.0\n";
        let balls = parse_xyzr(data.as_bytes()).unwrap();
        assert_eq!(balls.len(), 2);
        assert_eq!(balls[0], Ball::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(balls[1], Ball::new(5.0, 6.0, 7.0, 8.0));
    }

    #[test]
    fn parse_uses_trailing_columns_and_skips_noise() {
        let data = "# x y z r\n\nA 12 CA 0 0 0 1.5\nnot a ball\n  3 0 0 1.5  \n";
        let balls = parse_xyzr(data.as_bytes()).unwrap();
        assert_eq!(
            balls,
            vec![Ball::new(0.0, 0.0, 0.0, 1.5), Ball::new(3.0, 0.0, 0.0, 1.5)]
        );
    }

    #[test]
    fn parse_keeps_non_finite_values_for_validation() {
        let balls = parse_xyzr("0 0 nan 1\n".as_bytes()).unwrap();
        assert_eq!(balls.len(), 1);
        assert!(balls[0].z.is_nan());
    }
}
