use crate::error::{AppError, AppResult};

/// Parse a path id; anything that is not an integer is a bad request.
pub fn parse_id(raw: &str, what: &str) -> AppResult<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::bad_request(format!("{what} id {raw} is not a number")))
}

/// Parse an optional numeric query value. Unparsable input counts as not
/// supplied rather than zero.
pub fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_integers() {
        assert_eq!(parse_id("17", "petition").unwrap(), 17);
        assert_eq!(parse_id(" 3 ", "petition").unwrap(), 3);
    }

    #[test]
    fn parse_id_rejects_non_numeric() {
        let err = parse_id("abc", "petition").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(m) if m.contains("abc")));
    }

    #[test]
    fn lenient_int_treats_garbage_as_absent() {
        assert_eq!(lenient_int(Some("12")), Some(12));
        assert_eq!(lenient_int(Some("-4")), Some(-4));
        assert_eq!(lenient_int(Some("twelve")), None);
        assert_eq!(lenient_int(Some("")), None);
        assert_eq!(lenient_int(None), None);
    }
}
