//! Newtype IDs for backend records.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers so a category id
//! can never be passed where an article id is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `Display`, `FromStr` and `From<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use bon_manual_core::define_id;
/// define_id!(TopicId);
/// define_id!(PageId);
///
/// let topic = TopicId::new(1);
/// let page: PageId = "7".parse().unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: TopicId = page;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(CategoryId);
define_id!(ArticleId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_is_transparent() {
        let id: ArticleId = serde_json::from_str("42").unwrap();
        assert_eq!(id, ArticleId::new(42));
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }

    #[test]
    fn test_from_str_trims() {
        assert_eq!(" 3 ".parse::<CategoryId>().unwrap(), CategoryId::new(3));
        assert!("abc".parse::<CategoryId>().is_err());
    }
}
