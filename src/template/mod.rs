//! Infrastructure documents handed to the engine.
//!
//! - [`gcp`]: a fixed document for GKE clusters
//! - [`gardener`]: a document generated per call. The network block is
//!   chosen by the target provider and one worker block is emitted per node
//!
//! Documents reference their inputs as `var.<key>` and declare every
//! such key up front. A document is only handed out once each declared
//! key has a binding in the configuration map.

pub mod gardener;
pub mod gcp;

use std::fmt;

use crate::configuration::ConfigMap;
use crate::error::HydroformError;

/// Rendered infrastructure definition for one provisioning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
    variables: Vec<&'static str>,
}

impl Document {
    /// Creates a document from its body, prefixed with a declaration for each variable.
    pub(crate) fn new(variables: Vec<&'static str>, body: &str) -> Self {
        let mut text = String::new();
        for variable in &variables {
            text.push_str(&format!("variable \"{}\" {{}}\n", variable));
        }
        text.push('\n');
        text.push_str(body);
        Self { text, variables }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Keys the document declares as variables.
    pub fn variables(&self) -> &[&'static str] {
        &self.variables
    }

    /// Fails with the first declared variable that has no binding.
    pub fn check_bindings(&self, config: &ConfigMap) -> Result<(), HydroformError> {
        for variable in &self.variables {
            config.require(variable)?;
        }
        Ok(())
    }

    /// Whether the document configures the named provider plugin.
    pub fn declares_provider(&self, name: &str) -> bool {
        self.text.contains(&format!("provider \"{}\"", name))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_declares_variables() {
        let document = Document::new(vec!["a", "b"], "provider \"x\" {}\n");
        assert!(document.as_str().starts_with("variable \"a\" {}\nvariable \"b\" {}\n\n"));
        assert_eq!(document.variables(), &["a", "b"]);
        assert!(document.declares_provider("x"));
        assert!(!document.declares_provider("y"));
    }

    #[test]
    fn test_check_bindings_names_missing_key() {
        let document = Document::new(vec!["a", "b"], "");
        let mut config = ConfigMap::new();
        config.insert("a", "1");
        let err = document.check_bindings(&config).unwrap_err();
        assert!(matches!(err, HydroformError::MissingVariable(key) if key == "b"));

        config.insert("b", "2");
        assert!(document.check_bindings(&config).is_ok());
    }
}
