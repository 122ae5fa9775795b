//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn source() -> PathBuf {
        "site".into()
    }

    pub fn output() -> PathBuf {
        "hugo".into()
    }
}

// ============================================================================
// [collections] Section Defaults
// ============================================================================

pub mod collections {
    /// Key of the collection used when none is configured.
    pub fn key() -> String {
        "pages".into()
    }
}

// ============================================================================
// [export] Section Defaults
// ============================================================================

pub mod export {
    pub fn base_url() -> String {
        "/".into()
    }
}
