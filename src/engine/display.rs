//! Plan and apply output

use blueprint::{Action, ActionStatus, ApplyReport, Plan, PropChange, Resource, RunMode};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use super::Planned;

/// Old and new option text of an alter, one option per line.
fn alter_texts(resource: &Resource, changes: &[PropChange]) -> (String, String) {
    let mut old = String::new();
    let mut new = String::new();
    for change in changes {
        let Some((_, spec)) = resource.kind().prop(change.name) else {
            continue;
        };
        if let Some(line) = spec.prop.render(change.from.as_ref()) {
            old.push_str(&line);
            old.push('\n');
        }
        if let Some(line) = spec.prop.render(Some(&change.to)) {
            new.push_str(&line);
            new.push('\n');
        }
    }
    (old, new)
}

fn print_alter_diff(resource: &Resource, changes: &[PropChange]) {
    let (old, new) = alter_texts(resource, changes);
    let diff = TextDiff::from_lines(&old, &new);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => print!("│       {}", format!("- {change}").red()),
            ChangeTag::Insert => print!("│       {}", format!("+ {change}").green()),
            ChangeTag::Equal => {}
        }
    }
}

/// Display a plan in a user-friendly format
pub fn display_plan(planned: &Planned) {
    let plan = &planned.plan;
    let mode = match planned.blueprint.run_mode() {
        RunMode::CreateOrUpdate => "create or update",
        RunMode::FullyManaged => "fully managed",
    };

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", format!("Plan: {}", planned.name).bold());
    println!(
        "│ {}",
        format!(
            "{} ({}), {} resources, {mode}",
            plan.session.account,
            plan.session.account_edition,
            planned.blueprint.resources().count()
        )
        .dimmed()
    );
    println!("│");

    if plan.is_empty() {
        println!("│   {} No changes needed", "✓".green());
    }

    for action in plan {
        let symbol = match action {
            Action::Create(_) => "+".green(),
            Action::Alter { .. } => "~".yellow(),
            Action::Drop(_) => "-".red(),
        };
        println!("│   {} {}", symbol, action.urn());
        if let Action::Alter { resource, changes } = action {
            print_alter_diff(resource, changes);
        }
    }

    for exclusion in &plan.excluded {
        println!(
            "│   {} {} {}",
            "⊘".dimmed(),
            exclusion.urn,
            format!("(not available on {})", exclusion.edition).dimmed()
        );
    }

    let summary = plan.summary();
    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} create, {} alter, {} drop)",
        summary.total().to_string().bold(),
        summary.create.to_string().green(),
        summary.alter.to_string().yellow(),
        summary.drop.to_string().red()
    );
    if !plan.is_empty() {
        println!("│ Fingerprint: {}", plan.fingerprint().dimmed());
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// Print a plan's statements, one per line
pub fn print_sql(plan: &Plan) {
    for sql in plan.sql() {
        println!("{sql};");
    }
}

/// Print failures, skips and counts after an apply
pub fn print_summary(report: &ApplyReport) {
    let summary = report.summary();

    println!();
    if summary.is_success() {
        println!("  {} Plan applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Plan applied with errors", "⚠".yellow().bold());
    }

    for outcome in &report.outcomes {
        match &outcome.status {
            ActionStatus::Skipped { code: Some(code), reason } => {
                println!("    {} {} skipped ({code}: {reason})", "⊘".dimmed(), outcome.urn);
            }
            ActionStatus::Failed { error } => {
                println!("    {} {} failed: {error}", "✗".red(), outcome.urn);
                println!("      {}", outcome.sql.dimmed());
            }
            _ => {}
        }
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.altered > 0 {
        println!("    • {} resources altered", summary.altered);
    }
    if summary.dropped > 0 {
        println!("    • {} resources dropped", summary.dropped);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
    if summary.aborted > 0 {
        println!("    • {} resources not attempted", summary.aborted);
    }
}
