//! Macro for string-keyed domain enums
//!
//! Resource kinds, labor groups and write-off categories all travel as short
//! lowercase keys on the wire and in query keys. This macro derives
//! `as_str`, `Display` and a case-insensitive `FromStr` from one mapping
//! table.
//!
//! # Example
//!
//! ```rust
//! use kpfdash_domain::impl_key_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Shift {
//!     Morning,
//!     Evening,
//! }
//!
//! impl_key_conversions!(Shift {
//!     Morning => "morning",
//!     Evening => "evening",
//! });
//!
//! assert_eq!(Shift::Evening.as_str(), "evening");
//! assert_eq!("MORNING".parse::<Shift>().unwrap(), Shift::Morning);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a key enum.
///
/// Parsing trims surrounding whitespace and ignores case; unknown keys are
/// reported with the enum name.
#[macro_export]
macro_rules! impl_key_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Wire key for this variant.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Station {
        Grill,
        Bar,
        Pastry,
    }

    impl_key_conversions!(Station {
        Grill => "grill",
        Bar => "bar",
        Pastry => "pastry",
    });

    #[test]
    fn test_as_str_and_display_agree() {
        for station in [Station::Grill, Station::Bar, Station::Pastry] {
            assert_eq!(station.to_string(), station.as_str());
        }
    }

    #[test]
    fn test_fromstr_ignores_case_and_whitespace() {
        assert_eq!(Station::from_str("GRILL").unwrap(), Station::Grill);
        assert_eq!(Station::from_str("  bar ").unwrap(), Station::Bar);
        assert_eq!(Station::from_str("PaStRy").unwrap(), Station::Pastry);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = Station::from_str("dish");
        assert!(result.unwrap_err().contains("Invalid Station: dish"));
        assert!(Station::from_str("").is_err());
    }
}
