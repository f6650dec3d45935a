//! Conversion of trajectory outcomes into export records.

use std::io::{self, Write};

use flight_core::{State, StateSchema};
use flight_export::phases::{self, Record};
use flight_export::summary::{MissionSummary, NamedValue, PhaseSummary};
use flight_trajectory::TrajectoryOutcome;

/// JSON summary of a completed run, values in each variable's display unit.
pub fn summarize(mission: &str, outcome: &TrajectoryOutcome) -> MissionSummary {
    MissionSummary {
        mission: mission.to_string(),
        end_time_s: outcome.final_states.time,
        final_outputs: outcome
            .final_states
            .quantities()
            .map(|(name, quantity)| NamedValue {
                name: name.to_string(),
                value: quantity.value,
                units: quantity.unit.to_string(),
            })
            .collect(),
        phases: outcome
            .phases
            .iter()
            .map(|phase| PhaseSummary {
                name: phase.name.clone(),
                trigger_index: phase.trigger_index,
                trigger: phase.trigger.to_string(),
                start_time_s: phase.start_time,
                end_time_s: phase.end_time,
                accepted_steps: phase.accepted_steps,
                rejected_steps: phase.rejected_steps,
                initial_state: named_values(&phase.schema, &phase.initial_state),
                terminal_state: named_values(&phase.schema, &phase.terminal_state),
            })
            .collect(),
    }
}

fn named_values(schema: &StateSchema, state: &State) -> Vec<NamedValue> {
    schema
        .iter()
        .filter_map(|variable| {
            state.get(&variable.name).map(|si| NamedValue {
                name: variable.name.clone(),
                value: variable.display_unit.from_si(si),
                units: variable.display_unit.to_string(),
            })
        })
        .collect()
}

/// Write one CSV row per phase, header first.
pub fn write_phase_table(writer: &mut dyn Write, outcome: &TrajectoryOutcome) -> io::Result<()> {
    let triggers: Vec<String> = outcome
        .phases
        .iter()
        .map(|phase| phase.trigger.to_string())
        .collect();
    let records = outcome
        .phases
        .iter()
        .zip(&triggers)
        .enumerate()
        .map(|(index, (phase, trigger))| Record {
            index,
            name: &phase.name,
            trigger_index: phase.trigger_index,
            trigger,
            start_time_s: phase.start_time,
            end_time_s: phase.end_time,
            duration_s: phase.duration(),
            accepted_steps: phase.accepted_steps,
            rejected_steps: phase.rejected_steps,
            locator_iterations: phase.locator_iterations,
        });
    phases::write_table(writer, records)
}
