//! # abac-engine
//!
//! Attribute-based access control over role permission strings.
//!
//! ## Components
//!
//! - **Store:** `PermissionStore` contract with file-backed and in-memory
//!   implementations of the role/route permission document.
//! - **Catalog:** per-instance grant catalog that switches a resource type
//!   to instance-level rules.
//! - **Rules:** compilation of a subject's roles into a `RuleSet` and
//!   evaluation of `AccessRequest`s against it.

pub mod catalog;
pub mod error;
pub mod rules;
pub mod store;

pub use catalog::{AttributeCatalog, AttributeGrant};
pub use error::StoreError;
pub use rules::{AccessRequest, CompiledRule, ResourceRef, RuleCondition, RuleSet};
pub use store::{
    FilePermissionStore, MemoryPermissionStore, PermissionDocument, PermissionStore,
};
