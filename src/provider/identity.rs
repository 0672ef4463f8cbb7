//! Adapter identity.

/// Stable name, display label and target model of an adapter. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderIdentity {
    name: String,
    model: String,
    id: Option<String>,
    label: Option<String>,
}

impl ProviderIdentity {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            id: None,
            label: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Backend family, e.g. `replicate`. Used as the cache namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Caller-chosen id, or `<name>:<model>`.
    pub fn id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.name, self.model))
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl std::fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut family = self.name.chars();
        let family: String = match family.next() {
            Some(first) => first.to_uppercase().chain(family).collect(),
            None => String::new(),
        };
        write!(f, "[{} Provider {}]", family, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_id_and_display() {
        let ident = ProviderIdentity::new("replicate", "meta/llama-3");
        assert_eq!(ident.id(), "replicate:meta/llama-3");
        assert_eq!(ident.to_string(), "[Replicate Provider meta/llama-3]");
        assert!(ident.label().is_none());
    }

    #[test]
    fn test_custom_id_and_label() {
        let ident = ProviderIdentity::new("replicate", "m")
            .with_id("judge")
            .with_label("Grader");
        assert_eq!(ident.id(), "judge");
        assert_eq!(ident.label(), Some("Grader"));
    }
}
