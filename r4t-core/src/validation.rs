//! Lifecycle validator
//!
//! Field-level legality and immutability for requirement create/update.
//! The validator trusts its caller to have consulted the authorization guard
//! and never persists anything itself.

use log::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{
    NewRequirement, Requirement, RequirementInput, RequirementPatch, RequirementPriority,
    RequirementStatus,
};

/// Validates a creation request
///
/// `actor` is the authenticated user and becomes `created_by`; nothing in the
/// client-supplied input can set authorship.
pub fn validate_create(input: RequirementInput, actor: Uuid) -> Result<NewRequirement, ValidationError> {
    let title = required_title(&input.title)?;
    let status = match input.status.as_deref() {
        Some(raw) => raw.parse::<RequirementStatus>()?,
        None => RequirementStatus::default(),
    };
    let priority = match input.priority.as_deref() {
        Some(raw) => raw.parse::<RequirementPriority>()?,
        None => RequirementPriority::default(),
    };

    Ok(NewRequirement {
        title,
        description: normalize_description(input.description),
        status,
        priority,
        created_by: actor,
    })
}

/// Validates an update and returns the merged requirement
///
/// Any status may follow any other status.
pub fn validate_update(
    existing: &Requirement,
    patch: RequirementPatch,
) -> Result<Requirement, ValidationError> {
    if let Some(field) = patch.immutable_field() {
        debug!("rejected patch on {}: {} is immutable", existing.id, field);
        return Err(ValidationError::ImmutableField(field));
    }

    let mut merged = existing.clone();
    if let Some(title) = patch.title {
        merged.title = required_title(&title)?;
    }
    if let Some(description) = patch.description {
        merged.description = normalize_description(Some(description));
    }
    if let Some(status) = patch.status {
        merged.status = status.parse()?;
    }
    if let Some(priority) = patch.priority {
        merged.priority = priority.parse()?;
    }

    Ok(merged)
}

fn required_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}
