//! Typed parsing of keyfile scalar values.

/// Failure to interpret a scalar value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("'{value}' is not a valid {expected}")]
pub struct ValueError {
    pub value: String,
    pub expected: &'static str,
}

impl ValueError {
    fn new(value: &str, expected: &'static str) -> Self {
        Self {
            value: value.to_string(),
            expected,
        }
    }
}

/// Conversion from a keyfile scalar to a typed value.
pub trait ParseValue: Sized {
    fn parse_value(value: &str) -> Result<Self, ValueError>;
}

impl ParseValue for bool {
    fn parse_value(value: &str) -> Result<Self, ValueError> {
        match value {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(ValueError::new(value, "boolean")),
        }
    }
}

impl ParseValue for String {
    fn parse_value(value: &str) -> Result<Self, ValueError> {
        Ok(value.to_string())
    }
}

macro_rules! parse_integer {
    ($ty:ty, $signed:expr) => {
        impl ParseValue for $ty {
            fn parse_value(value: &str) -> Result<Self, ValueError> {
                let digits = if $signed {
                    value.strip_prefix('-').unwrap_or(value)
                } else {
                    value
                };
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ValueError::new(value, "integer"));
                }
                value
                    .parse::<$ty>()
                    .map_err(|_| ValueError::new(value, "integer"))
            }
        }
    };
}

parse_integer!(i32, true);
parse_integer!(i64, true);
parse_integer!(u32, false);
parse_integer!(u64, false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_the_three_spellings() {
        for t in ["true", "yes", "1"] {
            assert_eq!(bool::parse_value(t), Ok(true));
        }
        for f in ["false", "no", "0"] {
            assert_eq!(bool::parse_value(f), Ok(false));
        }
    }

    #[test]
    fn bool_rejects_other_input() {
        assert!(bool::parse_value("invalid").is_err());
        assert!(bool::parse_value("TRUE").is_err());
        assert!(bool::parse_value("").is_err());
    }

    #[test]
    fn integers_use_a_digit_grammar() {
        assert_eq!(i32::parse_value("23"), Ok(23));
        assert_eq!(i32::parse_value("-17"), Ok(-17));
        assert_eq!(u64::parse_value("0"), Ok(0));
        assert!(i32::parse_value("invalid").is_err());
        assert!(i32::parse_value("0x10").is_err());
        assert!(u32::parse_value("-1").is_err());
        assert!(i32::parse_value("1 2").is_err());
    }

    #[test]
    fn strings_are_copied_verbatim() {
        assert_eq!(
            String::parse_value("test string"),
            Ok("test string".to_string())
        );
    }
}
