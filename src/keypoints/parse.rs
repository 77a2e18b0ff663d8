//! Parsing keypoint coordinates from free-form text.

use once_cell::sync::Lazy;
use regex::Regex;

use super::KeypointError;
use crate::geometry::PixelPoint;

const NUMBER: &str = r"(-?\d+(?:\.\d+)?)";

static BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\[\s*{NUMBER}\s*,\s*{NUMBER}\s*\]")).expect("valid regex"));
static PARENTHESIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\(\s*{NUMBER}\s*,\s*{NUMBER}\s*\)")).expect("valid regex"));
static NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"x\s*[=:]\s*{NUMBER}.*?y\s*[=:]\s*{NUMBER}")).expect("valid regex")
});
static BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^\s*{NUMBER}\s*,\s*{NUMBER}\s*$")).expect("valid regex"));

/// Parse a point written as `[x, y]`, `(x, y)`, `x=.., y=..` or `x,y`.
pub fn parse_point(text: &str) -> Result<PixelPoint, KeypointError> {
    let lowered = text.to_lowercase();
    for re in [&*BRACKET, &*PARENTHESIS, &*NAMED, &*BARE] {
        if let Some(captures) = re.captures(&lowered) {
            let x = parse_number(captures.get(1).map(|m| m.as_str()), "X")?;
            let y = parse_number(captures.get(2).map(|m| m.as_str()), "Y")?;
            return Ok(PixelPoint::new(x, y));
        }
    }

    Err(KeypointError::Parse(format!(
        "Could not parse coordinates from: {}",
        text
    )))
}

fn parse_number(value: Option<&str>, axis: &str) -> Result<f64, KeypointError> {
    value
        .ok_or_else(|| KeypointError::Parse(format!("Missing {}", axis)))?
        .parse()
        .map_err(|_| KeypointError::Parse(format!("Invalid {}", axis)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bracket() {
        let p = parse_point("[1806, 1318]").unwrap();
        assert_eq!(p, PixelPoint::new(1806.0, 1318.0));
    }

    #[test]
    fn test_parse_parenthesis_decimal() {
        let p = parse_point("marker at (62.62, 56.26)").unwrap();
        assert_eq!(p, PixelPoint::new(62.62, 56.26));
    }

    #[test]
    fn test_parse_named() {
        let p = parse_point("X: 229 Y: 1917").unwrap();
        assert_eq!(p, PixelPoint::new(229.0, 1917.0));
    }

    #[test]
    fn test_parse_bare() {
        let p = parse_point("0,50").unwrap();
        assert_eq!(p, PixelPoint::new(0.0, 50.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_point("nowhere"), Err(KeypointError::Parse(_))));
        assert!(parse_point("1,2,3").is_err());
    }
}
