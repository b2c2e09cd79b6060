// tests/execution_order_props.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, TaskConfigBuilder};

use std::collections::HashSet;

use proptest::prelude::*;

use assetdag::config::ConfigFile;
use assetdag::registry::TaskRegistry;

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_config_strategy(max_tasks: usize) -> impl Strategy<Value = ConfigFile> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut builder = ConfigFileBuilder::new();
            for (i, potential_deps) in raw_deps.into_iter().enumerate() {
                let mut task = TaskConfigBuilder::new();
                let mut seen = HashSet::new();
                for dep in potential_deps {
                    if i > 0 && seen.insert(dep % i) {
                        task = task.after(&format!("task_{}", dep % i));
                    }
                }
                builder = builder.with_task(&format!("task_{i}"), task.build());
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn dependencies_precede_dependents_exactly_once(cfg in dag_config_strategy(10), pick in any::<usize>()) {
        let registry = TaskRegistry::from_config(&cfg).unwrap();
        let names: Vec<String> = registry.tasks().iter().map(|t| t.name().to_string()).collect();
        let root = &names[pick % names.len()];

        let order = registry.execution_order(root).unwrap();

        prop_assert_eq!(order.last(), Some(root));
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());

        for (pos, name) in order.iter().enumerate() {
            for dep in registry.get(name).unwrap().deps() {
                let dep_pos = order.iter().position(|n| n == dep);
                prop_assert!(dep_pos.is_some_and(|d| d < pos), "{} must run before {}", dep, name);
            }
        }
    }
}
