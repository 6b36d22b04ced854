//! Property-based tests for machine and rule store invariants.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use ruleflow_core::{
    ConditionError, CoreError, EntitySnapshot, MachineDefinition, MachineManager, RuleStore,
    StateDefinition, StateMachineInstance, TransitionQuery, TransitionRule,
};

const STATE_POOL: [&str; 8] = [
    "New",
    "InProgress",
    "Completed",
    "Cancelled",
    "Archived",
    "Blocked",
    "Review",
    "Rejected",
];

fn default_machine() -> StateMachineInstance {
    StateMachineInstance::new("default-workflow", &MachineDefinition::default_workflow()).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    AddState(usize),
    RemoveState(usize),
    AddRule(usize, usize, i32),
}

prop_compose! {
    fn arbitrary_op()(kind in 0..3u8, a in 0..8usize, b in 0..8usize, p in -5..5i32) -> Op {
        match kind {
            0 => Op::AddState(a),
            1 => Op::RemoveState(a),
            _ => Op::AddRule(a, b, p),
        }
    }
}

fn apply(machine: &StateMachineInstance, op: &Op) {
    let _ = match op {
        Op::AddState(i) => machine.add_state(&StateDefinition::new(STATE_POOL[*i], "")),
        Op::RemoveState(i) => machine.remove_state(STATE_POOL[*i]),
        Op::AddRule(a, b, p) => machine.add_rule(
            TransitionRule::builder()
                .from(STATE_POOL[*a])
                .to(STATE_POOL[*b])
                .priority(*p)
                .build(),
        ),
    };
}

proptest! {
    #[test]
    fn initial_state_is_always_a_member(ops in prop::collection::vec(arbitrary_op(), 0..40)) {
        let machine = default_machine();
        for op in &ops {
            apply(&machine, op);
            let info = machine.info();
            prop_assert!(info.states.contains(&info.initial_state));
        }
    }

    #[test]
    fn removing_initial_state_always_fails(ops in prop::collection::vec(arbitrary_op(), 0..20)) {
        let machine = default_machine();
        for op in &ops {
            apply(&machine, op);
        }
        let result = machine.remove_state(&machine.initial_state().to_uppercase());
        let protected = matches!(result, Err(CoreError::ProtectedState { .. }));
        prop_assert!(protected, "removing the initial state must fail, got {:?}", result);
    }

    #[test]
    fn removed_state_leaves_no_rules(
        ops in prop::collection::vec(arbitrary_op(), 0..40),
        victim in 1..8usize,
    ) {
        let machine = default_machine();
        for op in &ops {
            apply(&machine, op);
        }
        let name = STATE_POOL[victim];
        if machine.state_exists(name) {
            machine.remove_state(name).unwrap();
            let info = machine.info();
            let dangling = info.rules.iter().any(|r| {
                r.from_state.eq_ignore_ascii_case(name) || r.to_state.eq_ignore_ascii_case(name)
            });
            prop_assert!(!dangling, "rules still reference removed state {}", name);
        }
    }

    #[test]
    fn rules_for_is_priority_sorted_and_stable(
        priorities in prop::collection::vec(-3..3i32, 0..30),
        inactive in prop::collection::vec(any::<bool>(), 30),
    ) {
        let store = RuleStore::new();
        for (i, p) in priorities.iter().enumerate() {
            store.add(
                TransitionRule::builder()
                    .from("S")
                    .to(format!("T{}", i))
                    .priority(*p)
                    .active(!inactive[i])
                    .build(),
            ).unwrap();
        }

        let mut expected: Vec<(usize, i32)> = priorities
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, _)| !inactive[*i])
            .collect();
        expected.sort_by(|a, b| b.1.cmp(&a.1));
        let expected: Vec<String> = expected.iter().map(|(i, _)| format!("T{}", i)).collect();

        let actual: Vec<String> = store.rules_for("s").into_iter().map(|r| r.to_state).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn can_transition_requires_known_states(from in "[A-Za-z]{0,12}", to in "[A-Za-z]{0,12}") {
        let machine = default_machine();
        machine.add_rule(TransitionRule::new("Archived", "New")).unwrap();

        let states = machine.all_states();
        let known = |s: &str| states.iter().any(|k| k.eq_ignore_ascii_case(s));
        if !known(&from) || !known(&to) {
            prop_assert!(!machine.can_transition(&from, &to));
        }
    }

    #[test]
    fn next_state_returns_known_state_or_none(
        failing in prop::collection::vec(any::<bool>(), 4),
        name in proptest::option::of("[ a-z]{0,6}"),
        minutes in 0..3000i64,
        state in 0..5usize,
    ) {
        let machine = default_machine();
        let targets = ["InProgress", "Completed", "Cancelled", "Archived"];
        for (i, fail) in failing.iter().enumerate() {
            if *fail {
                let _ = machine.add_rule(
                    TransitionRule::builder()
                        .from(STATE_POOL[state])
                        .to(targets[i])
                        .priority(20 + i as i32)
                        .when("fails", |_: &EntitySnapshot, _| {
                            Err(ConditionError::failed("unavailable"))
                        })
                        .build(),
                );
            }
        }

        let now = Utc::now();
        let snapshot = EntitySnapshot {
            name,
            created_at: now - Duration::minutes(minutes),
            updated_at: Some(now - Duration::minutes(minutes)),
            state: STATE_POOL[state].to_string(),
        };

        if let Some(next) = machine.next_state_at(&snapshot, now) {
            prop_assert!(machine.state_exists(&next));
            prop_assert!(machine.can_transition(&snapshot.state, &next));
        }
    }
}
