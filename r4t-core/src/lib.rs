pub mod capability;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod guard;
pub mod models;
pub mod roles;
pub mod service;
pub mod session;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use capability::{Action, CapabilityMatrix, ResourceKind, Route, GRANTS};
pub use config::{get_config_path, Config, Project};
pub use db::{create_backend, BackendType, DatabaseBackend};
pub use error::{CoreError, CoreResult, StoreError, StoreResult, ValidationError};
pub use filter::{apply_filters, FilterState, Filterable, PriorityFilter, Selection, StatusFilter};
pub use guard::{authorize, can_perform, visible_routes};
pub use models::{
    Author, NewRequirement, Requirement, RequirementInput, RequirementListing, RequirementPatch,
    RequirementPriority, RequirementStatus, RequirementsStore, User,
};
pub use roles::{display_role_id, Role, UnknownRole};
pub use service::RequirementService;
pub use session::{IdentityProvider, Session};
pub use storage::Storage;
pub use validation::{validate_create, validate_update};
