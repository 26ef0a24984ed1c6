//! JSON Schema export for the catalog and user-profile document formats.
//!
//! Catalog authors and the onboarding-wizard team consume these schemas for
//! editor validation and docs generation; nothing in the recommendation
//! pipeline itself depends on them. Built at runtime via `schemars` rather
//! than checked in as static files, so they never drift from the Rust types.

use schemars::schema_for;
use serde_json::Value;

use crate::catalog::CatalogEntry;
use crate::user_profile::UserProfile;

/// JSON Schema for a single catalog document entry (`entries[]` in the
/// on-disk catalog format).
pub fn catalog_entry_schema() -> Value {
    serde_json::to_value(schema_for!(CatalogEntry))
        .expect("schemars RootSchema always serializes")
}

/// JSON Schema for the onboarding wizard's user-profile document.
pub fn user_profile_schema() -> Value {
    serde_json::to_value(schema_for!(UserProfile)).expect("schemars RootSchema always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_entry_schema_declares_required_fields() {
        let schema = catalog_entry_schema();
        let required = schema["required"]
            .as_array()
            .expect("object schema declares a required array");
        let required: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert!(required.contains(&"id"));
        assert!(required.contains(&"variants"));
        assert!(required.contains(&"hardware"));
    }

    #[test]
    fn user_profile_schema_declares_required_fields() {
        let schema = user_profile_schema();
        let required = schema["required"]
            .as_array()
            .expect("object schema declares a required array");
        let required: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert!(required.contains(&"use_cases"));
        assert!(required.contains(&"cloud_willingness"));
    }
}
