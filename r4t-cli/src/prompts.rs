use anyhow::Result;
use inquire::{Confirm, Editor, Select, Text};

use r4t_core::{
    Requirement, RequirementInput, RequirementPatch, RequirementPriority, RequirementStatus, Role,
};

/// Prompts the user for a new requirement
///
/// Values are handed back as raw strings; the core validates them.
pub fn prompt_new_requirement() -> Result<RequirementInput> {
    let title = Text::new("Title:").prompt()?;

    // Use the Editor type for multiline input
    let description = Editor::new("Description:").prompt()?;

    let status = Select::new("Status:", RequirementStatus::all().to_vec()).prompt()?;
    let priority = Select::new("Priority:", RequirementPriority::all().to_vec())
        .with_starting_cursor(position(&RequirementPriority::all(), &RequirementPriority::default()))
        .prompt()?;

    Ok(RequirementInput {
        title,
        description: Some(description),
        status: Some(status.as_str().to_string()),
        priority: Some(priority.as_str().to_string()),
    })
}

/// Prompts for changes to an existing requirement, pre-filled with its values
///
/// Only fields the user actually changed end up in the patch.
pub fn prompt_requirement_patch(req: &Requirement) -> Result<RequirementPatch> {
    let mut patch = RequirementPatch::default();

    let title = Text::new("Title:").with_initial_value(&req.title).prompt()?;
    if title != req.title {
        patch.title = Some(title);
    }

    let current_description = req.description.clone().unwrap_or_default();
    let description = Editor::new("Description:")
        .with_predefined_text(&current_description)
        .prompt()?;
    if description.trim() != current_description.trim() {
        patch.description = Some(description);
    }

    let status = Select::new("Status:", RequirementStatus::all().to_vec())
        .with_starting_cursor(position(&RequirementStatus::all(), &req.status))
        .prompt()?;
    if status != req.status {
        patch.status = Some(status.as_str().to_string());
    }

    let priority = Select::new("Priority:", RequirementPriority::all().to_vec())
        .with_starting_cursor(position(&RequirementPriority::all(), &req.priority))
        .prompt()?;
    if priority != req.priority {
        patch.priority = Some(priority.as_str().to_string());
    }

    Ok(patch)
}

/// Prompts for whatever user profile fields were not given on the command line
pub fn prompt_new_user(
    name: Option<String>,
    email: Option<String>,
    role: Option<Role>,
) -> Result<(String, String, Role)> {
    let name = match name {
        Some(name) => name,
        None => Text::new("Full name:").prompt()?,
    };
    let email = match email {
        Some(email) => email,
        None => Text::new("Email:").prompt()?,
    };
    let role = match role {
        Some(role) => role,
        None => Select::new("Role:", Role::all().to_vec()).prompt()?,
    };
    Ok((name, email, role))
}

pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

fn position<T: PartialEq>(options: &[T], value: &T) -> usize {
    options.iter().position(|o| o == value).unwrap_or(0)
}
