//! Command execution.

use crate::loader;
use crate::Commands;
use colored::Colorize;
use ruleflow_core::{
    CoreError, EntitySnapshot, MachineManager, RuleInfo, StateMachineRegistry, TransitionQuery,
};

/// Executes a command and returns the formatted output.
pub fn execute(
    registry: &StateMachineRegistry,
    cmd: Commands,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::List => {
            let summaries = registry.list_summaries();
            if json {
                return Ok(serde_json::to_string_pretty(&summaries)?);
            }

            let mut output = String::new();
            for s in summaries {
                let marker = if s.id.eq_ignore_ascii_case(registry.default_machine_id()) {
                    " (default)".dimmed().to_string()
                } else {
                    String::new()
                };
                output.push_str(&format!(
                    "{}{}  {}  initial: {}  states: {}  rules: {}\n",
                    s.id.cyan(),
                    marker,
                    s.name,
                    s.initial_state.yellow(),
                    s.state_count,
                    s.rule_count
                ));
            }
            Ok(output.trim_end().to_string())
        }

        Commands::Show { id } => {
            let info = registry.require(&id)?.info();
            if json {
                return Ok(serde_json::to_string_pretty(&info)?);
            }

            let mut output = format!("{}\n", format!("State machine {}", info.id.cyan()).bold());
            output.push_str(&format!("  Name: {}\n", info.name));
            output.push_str(&format!("  Initial state: {}\n", info.initial_state.yellow()));
            output.push_str(&format!("  States: {}\n", info.states.join(", ")));
            output.push_str(&format!("  Modified: {}\n", info.modified_at.to_rfc3339()));
            output.push_str(&format!("  Checksum: {}\n", info.checksum));
            output.push_str("  Rules:\n");
            output.push_str(&format_rules(&info.rules));
            Ok(output.trim_end().to_string())
        }

        Commands::Rules { id, state } => {
            let machine = registry.require(&id)?;
            let rules = match state {
                Some(state) => machine.rules_for_state(&state)?,
                None => machine.info().rules,
            };
            if json {
                return Ok(serde_json::to_string_pretty(&rules)?);
            }
            if rules.is_empty() {
                return Ok("No rules".yellow().to_string());
            }
            Ok(format_rules(&rules).trim_end().to_string())
        }

        Commands::Transitions { id, state } => {
            let machine = registry.require(&id)?;
            if !machine.state_exists(&state) {
                return Err(CoreError::StateNotFound { state }.into());
            }
            let targets = machine.available_transitions(&state);
            if json {
                return Ok(serde_json::to_string_pretty(&targets)?);
            }
            if targets.is_empty() {
                return Ok(format!("No transitions from {}", state.yellow()));
            }
            Ok(targets.join("\n"))
        }

        Commands::Check { id, from, to } => {
            let machine = registry.require(&id)?;
            let allowed = machine.can_transition(&from, &to);
            if json {
                return Ok(serde_json::json!({ "from": from, "to": to, "allowed": allowed })
                    .to_string());
            }
            if allowed {
                Ok(format!("{} {} → {}", "Allowed".green(), from, to.yellow()))
            } else {
                Ok(format!("{} {} → {}", "Not allowed".red(), from, to))
            }
        }

        Commands::Next {
            id,
            state,
            name,
            created_at,
            updated_at,
        } => {
            let machine = registry.require(&id)?;
            if !machine.state_exists(&state) {
                return Err(CoreError::StateNotFound { state }.into());
            }

            let mut snapshot = EntitySnapshot::new(state);
            snapshot.name = name;
            if let Some(created_at) = created_at {
                snapshot.created_at = created_at;
            }
            snapshot.updated_at = updated_at;

            let next = machine.next_state(&snapshot);
            if json {
                return Ok(serde_json::json!({ "from": snapshot.state, "next": next }).to_string());
            }
            match next {
                Some(next) => Ok(format!("{} → {}", snapshot.state, next.yellow())),
                None => Ok(format!(
                    "{} from {}",
                    "No eligible transition".yellow(),
                    snapshot.state
                )),
            }
        }

        Commands::Validate { file } => {
            let definition = loader::parse_definition_file(&file)?;
            let validated = definition.validate()?;
            Ok(format!(
                "{} {} ({} states, {} rules, checksum: {})",
                "Valid".green(),
                file.display(),
                validated.states.len(),
                validated.rules.len(),
                validated.checksum
            ))
        }
    }
}

fn format_rules(rules: &[RuleInfo]) -> String {
    let mut output = String::new();
    for rule in rules {
        let status = if rule.is_active {
            String::new()
        } else {
            " (inactive)".dimmed().to_string()
        };
        output.push_str(&format!(
            "    [{:>3}] {} → {} when {}{}",
            rule.priority,
            rule.from_state,
            rule.to_state.yellow(),
            rule.condition.cyan(),
            status
        ));
        if !rule.description.is_empty() {
            output.push_str(&format!("  {}", rule.description.dimmed()));
        }
        output.push('\n');
    }
    output
}
