//! Field naming conventions used to match subtree keys to struct fields.

use std::borrow::Cow;
use std::str::FromStr;

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase,
};
use thiserror::Error;

/// How a struct field's serde name is spelled in the subtree.
///
/// Whatever the convention, a key that matches the rendered name only
/// case-insensitively is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldTag {
    /// Use the serde name as declared (including `#[serde(rename)]`).
    #[default]
    Exact,
    /// `logLevel`
    CamelCase,
    /// `log_level`
    SnakeCase,
    /// `log-level`
    KebabCase,
    /// `LogLevel`
    PascalCase,
    /// `LOG_LEVEL`
    ScreamingSnakeCase,
}

impl FieldTag {
    /// Render a declared field name in this convention.
    #[must_use]
    pub fn render(self, field: &str) -> Cow<'_, str> {
        match self {
            Self::Exact => Cow::Borrowed(field),
            Self::CamelCase => Cow::Owned(field.to_lower_camel_case()),
            Self::SnakeCase => Cow::Owned(field.to_snake_case()),
            Self::KebabCase => Cow::Owned(field.to_kebab_case()),
            Self::PascalCase => Cow::Owned(field.to_upper_camel_case()),
            Self::ScreamingSnakeCase => Cow::Owned(field.to_shouty_snake_case()),
        }
    }

    /// Pick the declared field a subtree key refers to, if any.
    ///
    /// Exact matches on the rendered name win over case-insensitive ones.
    #[must_use]
    pub fn resolve(self, key: &str, fields: &'static [&'static str]) -> Option<&'static str> {
        let rendered: Vec<(&'static str, Cow<'static, str>)> = fields
            .iter()
            .map(|&field| (field, self.render(field)))
            .collect();
        rendered
            .iter()
            .find(|(_, name)| name == key)
            .or_else(|| {
                rendered
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(key))
            })
            .map(|(field, _)| *field)
    }
}

/// A tag name that does not name a known [`FieldTag`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field tag '{0}'")]
pub struct UnknownFieldTag(pub String);

impl FromStr for FieldTag {
    type Err = UnknownFieldTag;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "exact" | "serde" | "json" | "yaml" => Ok(Self::Exact),
            "camel" | "camelcase" => Ok(Self::CamelCase),
            "snake" | "snake_case" => Ok(Self::SnakeCase),
            "kebab" | "kebab-case" => Ok(Self::KebabCase),
            "pascal" | "pascalcase" => Ok(Self::PascalCase),
            "screaming_snake" | "screaming_snake_case" => Ok(Self::ScreamingSnakeCase),
            _ => Err(UnknownFieldTag(raw.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FieldTag;
    use rstest::rstest;

    const FIELDS: &[&str] = &["log_level", "also_to_stderr"];

    #[rstest]
    #[case(FieldTag::Exact, "log_level")]
    #[case(FieldTag::CamelCase, "logLevel")]
    #[case(FieldTag::KebabCase, "log-level")]
    #[case(FieldTag::PascalCase, "LogLevel")]
    #[case(FieldTag::ScreamingSnakeCase, "LOG_LEVEL")]
    fn renders_names(#[case] tag: FieldTag, #[case] expected: &str) {
        assert_eq!(tag.render("log_level"), expected);
        assert_eq!(tag.resolve(expected, FIELDS), Some("log_level"));
    }

    #[test]
    fn falls_back_to_case_insensitive_matches() {
        assert_eq!(FieldTag::CamelCase.resolve("LOGLEVEL", FIELDS), Some("log_level"));
        assert_eq!(FieldTag::Exact.resolve("Also_To_Stderr", FIELDS), Some("also_to_stderr"));
        assert_eq!(FieldTag::CamelCase.resolve("unrelated", FIELDS), None);
    }

    #[rstest]
    #[case("json", FieldTag::Exact)]
    #[case("", FieldTag::Exact)]
    #[case("camelCase", FieldTag::CamelCase)]
    #[case("KEBAB-CASE", FieldTag::KebabCase)]
    #[case("screaming_snake_case", FieldTag::ScreamingSnakeCase)]
    fn parses_tag_names(#[case] raw: &str, #[case] expected: FieldTag) {
        assert_eq!(raw.parse::<FieldTag>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_tags() {
        assert!("toml".parse::<FieldTag>().is_err());
    }
}
