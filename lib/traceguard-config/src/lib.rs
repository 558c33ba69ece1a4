//! Primitives for working with typed and untyped configuration data.
#![deny(warnings)]
#![deny(missing_docs)]

use figment::error::Kind;
use figment::providers::{Env, Format as _, Json, Yaml};
use figment::Figment;
use serde::de::DeserializeOwned;
use snafu::Snafu;
use traceguard_error::GenericError;

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// Environment variable prefix was empty.
    #[snafu(display("Environment variable prefix must not be empty."))]
    EmptyPrefix,

    /// Requested field had an unexpected data type.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        /// Name of the invalid field, as a period-separated path.
        field: String,

        /// Expected data type.
        expected_ty: String,

        /// Actual data type.
        actual_ty: String,
    },

    /// Generic configuration error.
    #[snafu(display("Failed to query configuration."))]
    Generic {
        /// Error source.
        source: GenericError,
    },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::InvalidType(actual_ty, expected_ty) => Self::InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            },
            _ => Self::Generic { source: e.into() },
        }
    }
}

/// Untyped configuration data with typed access on demand.
///
/// Configuration is layered from one or more providers (inline YAML/JSON documents, environment
/// variables) and deserialized into component-specific configuration types at build time.
#[derive(Clone, Default)]
pub struct GenericConfiguration {
    inner: Figment,
}

impl GenericConfiguration {
    /// Creates a configuration from an inline YAML document.
    ///
    /// # Errors
    ///
    /// If the document is not valid YAML, an error is returned.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigurationError> {
        let inner = Figment::new().merge(Yaml::string(content));

        // Eagerly surface malformed documents rather than deferring to the first typed lookup.
        inner.extract::<figment::value::Value>()?;

        Ok(Self { inner })
    }

    /// Creates a configuration from an inline JSON document.
    ///
    /// # Errors
    ///
    /// If the document is not valid JSON, an error is returned.
    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        let inner = Figment::new().merge(Json::string(content));
        inner.extract::<figment::value::Value>()?;

        Ok(Self { inner })
    }

    /// Creates a configuration from environment variables with the given prefix.
    ///
    /// The prefix is uppercased, and a trailing underscore appended if not present, before
    /// matching variables. `traceguard` would match `TRACEGUARD_TENANT_ID_HEADER_NAME`, and so on.
    ///
    /// # Errors
    ///
    /// If the prefix is empty, an error is returned.
    pub fn from_environment(prefix: &str) -> Result<Self, ConfigurationError> {
        if prefix.is_empty() {
            return Err(ConfigurationError::EmptyPrefix);
        }

        let mut prefix = prefix.to_uppercase();
        if !prefix.ends_with('_') {
            prefix.push('_');
        }

        Ok(Self {
            inner: Figment::new().merge(Env::prefixed(&prefix)),
        })
    }

    /// Deserializes the entire configuration into an instance of `T`.
    ///
    /// # Errors
    ///
    /// If a field is missing or has an unexpected type, an error is returned.
    pub fn as_typed<T: DeserializeOwned>(&self) -> Result<T, ConfigurationError> {
        self.inner.extract().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct TestConfig {
        name: String,

        #[serde(default)]
        count: u32,
    }

    #[test]
    fn typed_access_from_yaml() {
        let config = GenericConfiguration::from_yaml("name: redactor\ncount: 3\n").unwrap();
        let typed = config.as_typed::<TestConfig>().unwrap();
        assert_eq!(typed.name, "redactor");
        assert_eq!(typed.count, 3);
    }

    #[test]
    fn defaulted_field() {
        let config = GenericConfiguration::from_yaml("name: redactor\n").unwrap();
        let typed = config.as_typed::<TestConfig>().unwrap();
        assert_eq!(typed.count, 0);
    }

    #[test]
    fn invalid_field_type() {
        let config = GenericConfiguration::from_yaml("name: redactor\ncount: nope\n").unwrap();
        match config.as_typed::<TestConfig>() {
            Err(ConfigurationError::InvalidFieldType { field, .. }) => assert_eq!(field, "count"),
            other => panic!("expected invalid field type error, got {:?}", other.err()),
        }
    }

    #[test]
    fn empty_environment_prefix() {
        assert!(matches!(
            GenericConfiguration::from_environment(""),
            Err(ConfigurationError::EmptyPrefix)
        ));
    }
}
