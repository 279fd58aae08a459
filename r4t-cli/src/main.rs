mod cli;
mod identity;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use std::path::Path;

use r4t_core::db::{copy_store, export_to_json, import_from_json};
use r4t_core::{
    authorize, can_perform, create_backend, get_config_path, visible_routes, Action, Config,
    DatabaseBackend, FilterState, IdentityProvider, RequirementInput, RequirementPatch,
    RequirementPriority, RequirementService, RequirementStatus, ResourceKind, Role, User,
};

use crate::cli::{Cli, Command, DbCommand, ProjectCommand, UserCommand};
use crate::identity::CliIdentity;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = get_config_path()?;
    let mut config = Config::load(&config_path)?;

    // Commands that never touch a database
    match &cli.command {
        Command::Roles => return print_roles(),
        Command::Can {
            role,
            action,
            resource,
        } => return check_capability(role, action, resource),
        Command::Project(project_cmd) => {
            return handle_project_command(project_cmd, &mut config, &config_path)
        }
        _ => {}
    }

    // Determine which database to use
    let db_path = config.determine_database_path(cli.db.as_deref(), cli.project.as_deref())?;
    let backend = create_backend(&db_path, None)?;
    backend.create_if_not_exists()?;
    let service = RequirementService::new(backend);

    let login = cli.user.clone().or_else(|| config.default_user.clone());
    // `user add` is how the first profile gets created, so it must not need one
    let identity = match &cli.command {
        Command::User(_) => CliIdentity::resolve(service.backend(), None)?,
        _ => CliIdentity::resolve(service.backend(), login.as_deref())?,
    };

    match &cli.command {
        Command::Nav { role } => {
            show_navigation(role.as_deref(), &identity)?;
        }
        Command::Whoami => {
            whoami(&identity);
        }
        Command::User(user_cmd) => {
            handle_user_command(user_cmd, service.backend(), &mut config, &config_path)?;
        }
        Command::List {
            search,
            status,
            priority,
        } => {
            list_requirements(&service, &identity, search, status, priority)?;
        }
        Command::Show { id } => {
            show_requirement(&service, &identity, id)?;
        }
        Command::Add {
            title,
            description,
            status,
            priority,
            interactive,
        } => {
            let input = requirement_input(
                &identity,
                title.clone(),
                description.clone(),
                status.clone(),
                priority.clone(),
                *interactive,
            )?;
            let req = service.create(&identity, input)?;
            println!(
                "{} {} {}",
                "Requirement".green(),
                req.display_id().yellow(),
                "added successfully!".green()
            );
        }
        Command::Edit {
            id,
            title,
            description,
            status,
            priority,
            interactive,
        } => {
            let patch = RequirementPatch {
                title: title.clone(),
                description: description.clone(),
                status: status.clone(),
                priority: priority.clone(),
                ..Default::default()
            };
            edit_requirement(&service, &identity, id, patch, *interactive)?;
        }
        Command::Db(db_cmd) => {
            handle_db_command(db_cmd, service.backend(), &identity)?;
        }
        Command::Roles | Command::Can { .. } | Command::Project(_) => {}
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn print_roles() -> Result<()> {
    for role in Role::all() {
        println!("{} ({})", role.display_name().blue().bold(), role.as_str().dimmed());
        for duty in role.responsibilities() {
            println!("  - {}", duty);
        }
    }
    Ok(())
}

fn check_capability(role: &str, action: &str, resource: &str) -> Result<()> {
    let role: Role = role.parse()?;
    let action: Action = action.parse().map_err(anyhow::Error::msg)?;
    let resource: ResourceKind = resource.parse().map_err(anyhow::Error::msg)?;

    let verdict = if can_perform(Some(role), action, resource) {
        "allowed".green()
    } else {
        "denied".red()
    };
    println!("{} {} {}: {}", role.display_name(), action, resource, verdict);
    Ok(())
}

fn show_navigation(role: Option<&str>, identity: &CliIdentity) -> Result<()> {
    let role = match role {
        Some(raw) => Some(raw.parse::<Role>()?),
        None => identity.current_role(),
    };

    let routes = visible_routes(role);
    if routes.is_empty() {
        println!("{}", "No navigation entries. Sign in with --user.".yellow());
        return Ok(());
    }
    for route in routes {
        println!("{:<14} {}", route.label(), route.path().dimmed());
    }
    Ok(())
}

fn whoami(identity: &CliIdentity) {
    match identity.user() {
        Some(user) => {
            println!("{}: {} <{}>", "User".blue(), user.full_name, user.email);
            println!("{}: {}", "Role".blue(), user.role);
            println!("{}: {}", "ID".blue(), user.id);
        }
        None => println!("{}", "Not signed in. Use --user or set R4T_USER.".yellow()),
    }
}

fn handle_user_command(
    cmd: &UserCommand,
    backend: &dyn DatabaseBackend,
    config: &mut Config,
    config_path: &Path,
) -> Result<()> {
    match cmd {
        UserCommand::Add {
            name,
            email,
            role,
            default,
        } => {
            let role = role.as_deref().map(str::parse::<Role>).transpose()?;
            let (name, email, role) = prompts::prompt_new_user(name.clone(), email.clone(), role)?;
            let user = backend.add_user(User::new(name, email, role))?;
            println!(
                "{} {} ({})",
                "Added user".green(),
                user.email.yellow(),
                user.role
            );

            if *default {
                config.default_user = Some(user.email.clone());
                config.save(config_path)?;
                println!("{}", "Set as default user".green());
            }
        }
        UserCommand::List => {
            let users = backend.list_users()?;
            if users.is_empty() {
                println!("{}", "No users found.".yellow());
                return Ok(());
            }

            println!("{:<4} | {:<25} | {:<30} | {:<22}", "", "Name", "Email", "Role");
            println!("{}", "-".repeat(90));
            for user in users {
                println!(
                    "{:<4} | {:<25} | {:<30} | {:<22}",
                    user.initials(),
                    user.full_name,
                    user.email,
                    user.role.display_name()
                );
            }
        }
    }
    Ok(())
}

fn list_requirements(
    service: &RequirementService,
    identity: &CliIdentity,
    search: &Option<String>,
    status: &Option<String>,
    priority: &Option<String>,
) -> Result<()> {
    let filter = FilterState::parse(
        search.as_deref().unwrap_or(""),
        status.as_deref().unwrap_or("all"),
        priority.as_deref().unwrap_or("all"),
    )?;
    let listings = service.list(identity, &filter)?;

    if listings.is_empty() {
        println!("{}", "No requirements found.".yellow());
        return Ok(());
    }

    println!(
        "{:<8} | {:<40} | {:<11} | {:<8} | {:<20} | {:<16}",
        "REQ-ID", "Title", "Status", "Priority", "Author", "Created"
    );
    println!("{}", "-".repeat(118));

    for listing in &listings {
        let req = &listing.requirement;
        println!(
            "{:<8} | {:<40} | {:<11} | {:<8} | {:<20} | {:<16}",
            req.display_id(),
            truncate(&req.title, 40),
            status_label(req.status),
            priority_label(req.priority),
            truncate(listing.author_label(), 20),
            req.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    if !filter.is_unfiltered() {
        println!("{}", format!("{} matching", listings.len()).dimmed());
    }
    Ok(())
}

fn show_requirement(service: &RequirementService, identity: &CliIdentity, id: &str) -> Result<()> {
    let req = service.get(identity, id)?;
    let author = service.backend().get_user(&req.created_by)?;

    println!("{}: {}", "ID".blue(), req.id);
    if let Some(spec_id) = &req.spec_id {
        println!("{}: {}", "REQ-ID".blue(), spec_id);
    }
    println!("{}: {}", "Title".blue(), req.title);
    println!(
        "{}: {}",
        "Description".blue(),
        req.description.as_deref().unwrap_or("-")
    );
    println!("{}: {}", "Status".blue(), status_label(req.status));
    println!("{}: {}", "Priority".blue(), priority_label(req.priority));
    match author {
        Some(user) => println!("{}: {} <{}>", "Author".blue(), user.full_name, user.email),
        None => println!("{}: {}", "Author".blue(), "Unknown".dimmed()),
    }
    println!("{}: {}", "Created".blue(), req.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("{}: {}", "Modified".blue(), req.updated_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Gathers the fields for a new requirement, prompting when no title was given
fn requirement_input(
    identity: &CliIdentity,
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    interactive: bool,
) -> Result<RequirementInput> {
    // Fail on permission before prompting for anything
    authorize(identity.current_role(), Action::Create, ResourceKind::Requirement)?;
    match title {
        Some(title) if !interactive => Ok(RequirementInput {
            title,
            description,
            status,
            priority,
        }),
        _ => prompts::prompt_new_requirement(),
    }
}

fn edit_requirement(
    service: &RequirementService,
    identity: &CliIdentity,
    id: &str,
    patch: RequirementPatch,
    interactive: bool,
) -> Result<()> {
    let patch = if interactive || patch.is_empty() {
        // Fail on permission before prompting for anything
        authorize(identity.current_role(), Action::Edit, ResourceKind::Requirement)?;
        let existing = service.get(identity, id)?;
        prompts::prompt_requirement_patch(&existing)?
    } else {
        patch
    };

    if patch.is_empty() {
        println!("{}", "No changes made.".yellow());
        return Ok(());
    }

    let req = service.update(identity, id, patch)?;
    println!(
        "{} {} {}",
        "Requirement".green(),
        req.display_id().yellow(),
        "updated successfully!".green()
    );
    Ok(())
}

fn handle_db_command(
    cmd: &DbCommand,
    backend: &dyn DatabaseBackend,
    identity: &CliIdentity,
) -> Result<()> {
    match cmd {
        DbCommand::Path => {
            println!("{}", backend.path().display());
        }
        DbCommand::Stats => {
            let stats = backend.stats()?;
            let name = backend.get_name()?;
            if !name.is_empty() {
                println!("{}: {}", "Name".blue(), name);
            }
            println!("{}: {}", "Backend".blue(), stats.backend_type);
            println!("{}: {}", "Requirements".blue(), stats.requirement_count);
            println!("{}: {}", "Users".blue(), stats.user_count);
        }
        DbCommand::Migrate { to } => {
            authorize(identity.current_role(), Action::View, ResourceKind::Requirement)?;
            if to == backend.path() {
                anyhow::bail!("Source and destination are the same file: {}", to.display());
            }
            let target = create_backend(to, None)?;
            let counts = copy_store(backend, target.as_ref())
                .with_context(|| format!("Failed to migrate to {}", to.display()))?;
            println!(
                "{} {} requirements and {} users to {} ({})",
                "Migrated".green(),
                counts.requirements,
                counts.users,
                to.display(),
                target.backend_type()
            );
        }
        DbCommand::Export { output } => {
            authorize(identity.current_role(), Action::View, ResourceKind::Requirement)?;
            let counts = export_to_json(backend, output)?;
            println!(
                "{} {} requirements to {}",
                "Exported".green(),
                counts.requirements,
                output.display()
            );
        }
        DbCommand::Import { input, yes } => {
            authorize(identity.current_role(), Action::Edit, ResourceKind::Requirement)?;
            if !*yes {
                let prompt = format!(
                    "Replace everything in {} with {}?",
                    backend.path().display(),
                    input.display()
                );
                if !prompts::confirm(&prompt)? {
                    println!("{}", "Import cancelled.".yellow());
                    return Ok(());
                }
            }
            let counts = import_from_json(input, backend)?;
            println!(
                "{} {} requirements and {} users",
                "Imported".green(),
                counts.requirements,
                counts.users
            );
        }
    }
    Ok(())
}

fn handle_project_command(
    cmd: &ProjectCommand,
    config: &mut Config,
    config_path: &Path,
) -> Result<()> {
    match cmd {
        ProjectCommand::Add {
            name,
            path,
            description,
            default,
        } => {
            let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            config.register_project(
                name,
                &absolute.to_string_lossy(),
                description.as_deref().unwrap_or(""),
            );
            if *default {
                config.set_default_project(name)?;
            }
            config.save(config_path)?;
            println!(
                "{} {} -> {}",
                "Registered project".green(),
                name.yellow(),
                absolute.display()
            );
        }
        ProjectCommand::List => {
            if config.projects.is_empty() {
                println!(
                    "{} {}",
                    "No projects registered in".yellow(),
                    config_path.display()
                );
                return Ok(());
            }
            for (name, project) in &config.projects {
                let marker = if config.default_project.as_deref() == Some(name.as_str()) {
                    "*".green()
                } else {
                    " ".normal()
                };
                println!("{} {:<20} {}", marker, name, project.path);
                if !project.description.is_empty() {
                    println!("  {}", project.description.dimmed());
                }
            }
        }
        ProjectCommand::Default { name } => {
            config.set_default_project(name)?;
            config.save(config_path)?;
            println!("{} {}", "Default project set to".green(), name.yellow());
        }
    }
    Ok(())
}

fn status_label(status: RequirementStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        RequirementStatus::Draft => label.yellow(),
        RequirementStatus::Approved => label.blue(),
        RequirementStatus::Implemented => label.cyan(),
        RequirementStatus::Tested => label.green(),
    }
}

fn priority_label(priority: RequirementPriority) -> ColoredString {
    let label = priority.to_string();
    match priority {
        RequirementPriority::Critical => label.red().bold(),
        RequirementPriority::High => label.red(),
        RequirementPriority::Medium => label.yellow(),
        RequirementPriority::Low => label.green(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
