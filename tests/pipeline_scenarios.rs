//! End-to-end chain behaviour
//!
//! These tests drive whole chains through the coordinator and check:
//! - Streaming order and one-object-at-a-time interleaving
//! - Terminating and non-terminating faults
//! - Host stop, upstream cut and the termination wave
//! - Reverse-order disposal on every exit path
//! - Stream preferences

mod common;

use cmdpipe::pipeline::{
    CommandRegistry, CommandResult, CommandSpec, ErrorCategory, ErrorRecord, InformationRecord,
    ParameterMetadata, Phase, Pipeline, PipelineStatus, RecordKind, StopToken,
};
use cmdpipe::{ActionPreference, Command, CommandContext, EngineConfig, Value};
use common::builders::{EventLog, RecordingCommand};
use common::{error_ids, ints};

fn builtin(name: &str) -> CommandSpec {
    CommandSpec::new(CommandRegistry::new().create(name).unwrap())
}

#[test]
fn test_filtered_objects_reach_collector_in_order() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(builtin("Write-Output").arg(ints(&[1, 2, 3])))
        .command(builtin("Where-Object").arg("item > 1"))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Collect", &log)))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Succeeded);
    assert_eq!(
        log.of("Collect"),
        vec!["begin", "process:2", "process:3", "end", "dispose"]
    );
    assert_eq!(outcome.output_values(), ints(&[2, 3]));
    assert!(outcome.errors().is_empty());
}

#[test]
fn test_terminating_fault_fails_chain_and_releases_all() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::producer(
            "Gen",
            &log,
            ints(&[1, 2, 3]),
        )))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("Filter", &log).fault_on(2, true),
        ))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Collect", &log)))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(outcome.output_values(), ints(&[1]));
    assert_eq!(log.count("Collect:process:1"), 1);
    assert_eq!(log.count("Collect:process:2"), 0);
    assert_eq!(log.count("Filter:process:3"), 0);

    let errors: Vec<_> = outcome.of_kind(RecordKind::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].source().name, "Filter");
    let error = errors[0].as_error().unwrap();
    assert!(error.terminating);
    assert_eq!(error.phase, Some(Phase::Process));
    assert_eq!(error.target, Some(Value::Int(2)));
    assert_eq!(outcome.terminal_fault.as_ref(), Some(error));

    for name in ["Gen", "Filter", "Collect"] {
        assert_eq!(log.count(&format!("{}:dispose", name)), 1, "{} released once", name);
        assert_eq!(log.count(&format!("{}:end", name)), 0);
    }
    // Commands that were still running get the stop hook; the faulted one does not.
    assert_eq!(log.count("Gen:stop"), 1);
    assert_eq!(log.count("Collect:stop"), 1);
    assert_eq!(log.count("Filter:stop"), 0);
}

#[test]
fn test_host_stop_after_first_object() {
    let log = EventLog::new();
    let host = StopToken::new();
    let outcome = Pipeline::builder()
        .stop_token(host.clone())
        .command(builtin("Write-Output").arg(ints(&[1, 2, 3])))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Filter", &log)))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("Collect", &log).signal_after(1, host.clone()),
        ))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Stopped);
    assert!(outcome.terminal_fault.is_none());
    assert_eq!(outcome.output_values(), ints(&[1]));
    assert_eq!(log.count("Filter:process:2"), 0);
    for name in ["Filter", "Collect"] {
        assert_eq!(log.count(&format!("{}:stop", name)), 1);
        assert_eq!(log.count(&format!("{}:dispose", name)), 1);
    }
}

#[test]
fn test_objects_interleave_one_at_a_time() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("A", &log)))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("B", &log)))
        .build()
        .invoke_with_input([1, 2]);

    assert!(outcome.succeeded());
    let processing: Vec<_> = log
        .entries()
        .into_iter()
        .filter(|e| e.contains(":process:"))
        .collect();
    assert_eq!(
        processing,
        vec!["A:process:1", "B:process:1", "A:process:2", "B:process:2"]
    );
}

#[test]
fn test_termination_wave_and_reverse_disposal() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::producer(
            "Gen",
            &log,
            ints(&[7]),
        )))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Mid", &log)))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Tail", &log)))
        .build()
        .invoke();

    assert!(outcome.succeeded());
    assert_eq!(
        log.entries(),
        vec![
            "Gen:begin",
            "Mid:begin",
            "Tail:begin",
            "Gen:process",
            "Mid:process:7",
            "Tail:process:7",
            "Gen:end",
            "Mid:end",
            "Tail:end",
            "Tail:dispose",
            "Mid:dispose",
            "Gen:dispose",
        ]
    );
}

#[test]
fn test_downstream_without_input_skips_process() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::producer("Gen", &log, Vec::new())))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Tail", &log)))
        .build()
        .invoke();

    assert!(outcome.succeeded());
    assert_eq!(log.of("Tail"), vec!["begin", "end", "dispose"]);
}

#[test]
fn test_non_terminating_fault_skips_object() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("Check", &log).fault_on(2, false),
        ))
        .build()
        .invoke_with_input([1, 2, 3]);

    assert_eq!(outcome.status, PipelineStatus::Succeeded);
    assert_eq!(outcome.output_values(), ints(&[1, 3]));
    let errors = outcome.errors();
    assert_eq!(errors.len(), 1);
    assert!(!errors[0].terminating);
    assert_eq!(errors[0].target, Some(Value::Int(2)));
    assert_eq!(log.count("Check:end"), 1);
}

#[test]
fn test_begin_fault_aborts_remaining_begins() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("A", &log)))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("B", &log).fault_in(Phase::Begin, true),
        ))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("C", &log)))
        .build()
        .invoke_with_input([1]);

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(log.of("C"), vec!["dispose"]);
    assert_eq!(log.of("B"), vec!["begin", "dispose"]);
    assert_eq!(log.of("A"), vec!["begin", "stop", "dispose"]);
    assert_eq!(
        outcome.terminal_fault.as_ref().map(|e| e.phase),
        Some(Some(Phase::Begin))
    );
}

#[test]
fn test_write_in_begin_is_rejected() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("Eager", &log).write_in_begin(),
        ))
        .build()
        .invoke_with_input([1]);

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert!(outcome.output_values().is_empty());
    assert_eq!(error_ids(&outcome), vec!["WriteObjectInBegin"]);
    assert_eq!(
        outcome.errors()[0].category,
        ErrorCategory::InvalidOperation
    );
}

#[test]
fn test_static_binding_fails_fast() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("A", &log)))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("B", &log)).named("Bogus", 1))
        .build()
        .invoke_with_input([1]);

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(log.entries(), vec!["B:dispose", "A:dispose"]);
    let fault = outcome.terminal_fault.unwrap();
    assert_eq!(fault.error_id, "ParameterNotFound");
    assert_eq!(fault.phase, Some(Phase::Bind));
}

#[test]
fn test_cleanup_faults_are_reported_without_changing_status() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("A", &log)))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("B", &log).dispose_fault(),
        ))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("C", &log).dispose_panic(),
        ))
        .build()
        .invoke_with_input([1]);

    assert_eq!(outcome.status, PipelineStatus::Succeeded);
    assert_eq!(outcome.output_values(), ints(&[1]));
    for name in ["A", "B", "C"] {
        assert_eq!(log.count(&format!("{}:dispose", name)), 1);
    }

    let errors: Vec<_> = outcome.of_kind(RecordKind::Error).collect();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].source().name, "C");
    assert_eq!(errors[1].source().name, "B");
    for record in errors {
        let error = record.as_error().unwrap();
        assert!(error.during_cleanup);
        assert_eq!(error.category, ErrorCategory::Cleanup);
        assert_eq!(error.phase, Some(Phase::Dispose));
    }
}

#[test]
fn test_select_first_cuts_upstream() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Source", &log)))
        .command(builtin("select").named("First", 2))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Tail", &log)))
        .build()
        .invoke_with_input(1..=10i64);

    assert_eq!(outcome.status, PipelineStatus::Succeeded);
    assert_eq!(outcome.output_values(), ints(&[1, 2]));
    assert_eq!(log.of("Source"), vec!["begin", "process:1", "process:2", "stop", "dispose"]);
    assert_eq!(
        log.of("Tail"),
        vec!["begin", "process:1", "process:2", "end", "dispose"]
    );
}

#[test]
fn test_command_cut_after_is_not_stopped_itself() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Head", &log)))
        .command(CommandSpec::plugin(
            RecordingCommand::pass_through("Taker", &log).cut_after(1),
        ))
        .build()
        .invoke_with_input([5, 6]);

    assert!(outcome.succeeded());
    assert_eq!(outcome.output_values(), ints(&[5]));
    assert_eq!(log.count("Head:end"), 0);
    assert_eq!(log.count("Head:stop"), 1);
    assert_eq!(log.count("Taker:end"), 1);
}

#[test]
fn test_sequences_increase_per_channel() {
    let outcome = Pipeline::builder()
        .command(builtin("Write-Output").arg(ints(&[1, 2, 3, 4])))
        .command(builtin("ForEach-Object").arg("if item == 3 { throw \"three\" } item * 10"))
        .build()
        .invoke();

    assert_eq!(outcome.output_values(), ints(&[10, 20, 40]));
    assert_eq!(outcome.errors().len(), 1);
    for kind in [RecordKind::Object, RecordKind::Error] {
        let sequences: Vec<u64> = outcome.of_kind(kind).map(|r| r.sequence()).collect();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]), "{:?}: {:?}", kind, sequences);
    }
}

/// Writes one record on every stream, then a result object.
struct Chatter;

static NO_PARAMETERS: &[ParameterMetadata] = &[];

impl Command for Chatter {
    fn name(&self) -> &str {
        "Write-Chatter"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        NO_PARAMETERS
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        ctx.write_warning("careful")?;
        ctx.write_verbose("details")?;
        ctx.write_debug("internals")?;
        ctx.write_information(InformationRecord::new("note"))?;
        ctx.write_error(ErrorRecord::new("bad input").with_id("Chatter"))?;
        ctx.write_object("done")
    }
}

#[test]
fn test_default_preferences() {
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Chatter))
        .build()
        .invoke();

    assert!(outcome.succeeded());
    assert_eq!(outcome.warnings(), vec!["careful"]);
    assert!(outcome.verbose().is_empty());
    assert!(outcome.debug().is_empty());
    assert_eq!(outcome.information().len(), 1);
    assert_eq!(error_ids(&outcome), vec!["Chatter"]);
    assert_eq!(outcome.output_values(), vec![Value::from("done")]);
}

#[test]
fn test_common_parameters_override_preferences() {
    let outcome = Pipeline::builder()
        .command(
            CommandSpec::plugin(Chatter)
                .switch("Verbose")
                .named("wa", "SilentlyContinue")
                .named("ErrorAction", "SilentlyContinue"),
        )
        .build()
        .invoke();

    assert!(outcome.succeeded());
    assert!(outcome.warnings().is_empty());
    assert_eq!(outcome.verbose(), vec!["details"]);
    // Errors are always delivered.
    assert_eq!(error_ids(&outcome), vec!["Chatter"]);
}

#[test]
fn test_config_preferences_apply_to_chain() {
    let mut config = EngineConfig::default();
    config.preferences.debug = ActionPreference::Continue;
    let outcome = Pipeline::builder()
        .config(config)
        .command(CommandSpec::plugin(Chatter))
        .build()
        .invoke();

    assert_eq!(outcome.debug(), vec!["internals"]);
}

#[test]
fn test_stop_preference_escalates_after_delivery() {
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Chatter).named("WarningAction", "Stop"))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(outcome.warnings(), vec!["careful"]);
    assert!(outcome.output_values().is_empty());
    assert_eq!(
        outcome.terminal_fault.map(|e| e.error_id),
        Some("ActionPreferenceStop".to_string())
    );
}

#[test]
fn test_error_action_stop_makes_errors_terminating() {
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Chatter).named("ea", "stop"))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(error_ids(&outcome), vec!["Chatter", "ActionPreferenceStop"]);
    let errors = outcome.errors();
    assert!(!errors[0].terminating);
    assert!(errors[1].terminating);
    assert!(outcome.output_values().is_empty());
}

/// Ignores what `write_error` returns and carries on writing.
struct Careless;

impl Command for Careless {
    fn name(&self) -> &str {
        "Write-Careless"
    }

    fn parameters(&self) -> &[ParameterMetadata] {
        NO_PARAMETERS
    }

    fn process(&mut self, ctx: &mut CommandContext<'_>) -> CommandResult {
        let _ignored = ctx.write_error(ErrorRecord::new("boom").with_id("Careless"));
        ctx.write_object(1)
    }
}

#[test]
fn test_error_action_stop_holds_when_result_is_dropped() {
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Careless).named("ErrorAction", "Stop"))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(error_ids(&outcome), vec!["Careless", "ActionPreferenceStop"]);
    assert!(outcome.output_values().is_empty());
    assert_eq!(
        outcome.terminal_fault.map(|e| e.error_id),
        Some("ActionPreferenceStop".to_string())
    );
}

#[test]
fn test_error_action_stop_is_scoped_to_the_writing_command() {
    let log = EventLog::new();
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Careless).named("ErrorAction", "Stop"))
        .command(CommandSpec::plugin(RecordingCommand::pass_through("Sink", &log)))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(log.count("Sink:process:1"), 0);
    assert_eq!(log.count("Sink:dispose"), 1);
}

#[test]
fn test_unknown_preference_is_a_binding_error() {
    let outcome = Pipeline::builder()
        .command(CommandSpec::plugin(Chatter).named("ErrorAction", "Loudly"))
        .build()
        .invoke();

    assert_eq!(outcome.status, PipelineStatus::Failed);
    assert_eq!(error_ids(&outcome), vec!["TypeConversionFailed"]);
}
