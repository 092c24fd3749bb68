// SVG transform lists and number formatting for baked snapshots

use kurbo::{Affine, Point};

/// Parses an SVG `transform` attribute into a single matrix.
pub fn parse_transform(text: &str) -> Result<Affine, String> {
    let mut result = Affine::IDENTITY;
    let mut rest = text.trim();

    while !rest.is_empty() {
        let open = rest
            .find('(')
            .ok_or_else(|| format!("expected `(` in transform `{}`", text))?;
        let close = rest
            .find(')')
            .ok_or_else(|| format!("unclosed `(` in transform `{}`", text))?;
        if close < open {
            return Err(format!("unbalanced parentheses in transform `{}`", text));
        }

        let name = rest[..open].trim();
        let args = parse_numbers(&rest[open + 1..close])?;
        result = result * transform_function(name, &args)?;

        rest = rest[close + 1..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }

    Ok(result)
}

fn transform_function(name: &str, args: &[f64]) -> Result<Affine, String> {
    let affine = match (name, args.len()) {
        ("matrix", 6) => Affine::new([args[0], args[1], args[2], args[3], args[4], args[5]]),
        ("translate", 1) => Affine::translate((args[0], 0.0)),
        ("translate", 2) => Affine::translate((args[0], args[1])),
        ("scale", 1) => Affine::scale(args[0]),
        ("scale", 2) => Affine::scale_non_uniform(args[0], args[1]),
        ("rotate", 1) => Affine::rotate(args[0].to_radians()),
        ("rotate", 3) => about(Point::new(args[1], args[2]), Affine::rotate(args[0].to_radians())),
        ("skewX", 1) => Affine::new([1.0, 0.0, args[0].to_radians().tan(), 1.0, 0.0, 0.0]),
        ("skewY", 1) => Affine::new([1.0, args[0].to_radians().tan(), 0.0, 1.0, 0.0, 0.0]),
        _ => {
            return Err(format!(
                "unsupported transform function `{}` with {} arguments",
                name,
                args.len()
            ));
        }
    };
    Ok(affine)
}

/// Applies `affine` around `origin` instead of the coordinate origin.
pub fn about(origin: Point, affine: Affine) -> Affine {
    let offset = origin.to_vec2();
    Affine::translate(offset) * affine * Affine::translate(-offset)
}

/// Parses a whitespace/comma separated list of numbers, as used by
/// `transform`, `viewBox` and `points`.
pub fn parse_numbers(text: &str) -> Result<Vec<f64>, String> {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| format!("invalid number `{}`", s))
        })
        .collect()
}

/// Parses a length attribute, ignoring a trailing `px`.
pub fn parse_length(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_suffix("px").unwrap_or(text);
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a number for serialized snapshots: six decimals at most, no
/// trailing zeros, no negative zero.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

pub fn format_matrix(affine: Affine) -> String {
    let c = affine.as_coeffs();
    format!(
        "matrix({} {} {} {} {} {})",
        format_number(c[0]),
        format_number(c[1]),
        format_number(c[2]),
        format_number(c[3]),
        format_number(c[4]),
        format_number(c[5])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn parses_transform_lists_left_to_right() {
        let t = parse_transform("translate(10, 0) scale(2)").unwrap();
        assert!(approx(t * Point::new(1.0, 1.0), Point::new(12.0, 2.0)));

        let t = parse_transform("rotate(90 5 5)").unwrap();
        assert!(approx(t * Point::new(10.0, 5.0), Point::new(5.0, 10.0)));

        let t = parse_transform("matrix(1,0,0,1,3,4)").unwrap();
        assert!(approx(t * Point::ZERO, Point::new(3.0, 4.0)));
    }

    #[test]
    fn rejects_unknown_functions() {
        assert!(parse_transform("perspective(3)").is_err());
        assert!(parse_transform("translate(1, 2").is_err());
    }

    #[test]
    fn formats_without_noise() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1e-12), "0");
        assert_eq!(format_matrix(Affine::IDENTITY), "matrix(1 0 0 1 0 0)");
    }

    #[test]
    fn parses_lengths() {
        assert_eq!(parse_length("24"), Some(24.0));
        assert_eq!(parse_length("24px"), Some(24.0));
        assert_eq!(parse_length("100%"), None);
    }
}
