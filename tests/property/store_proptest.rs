//! Property-based tests for the local store
//!
//! Random operation sequences across several users, checked against the
//! user partitioning and pending-queue rules.

use crate::common::create_test_store;
use expense_sync::shared::{ExpensePatch, NewExpense};
use proptest::prelude::*;
use std::collections::HashMap;

const USERS: [&str; 3] = ["alice", "bob", "carol"];

#[derive(Debug, Clone)]
enum Op {
    Create { user: usize, amount: u32 },
    Confirm { index: usize },
    Fail { index: usize },
    Delete { index: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..USERS.len(), 1u32..10_000).prop_map(|(user, amount)| Op::Create { user, amount }),
        1 => any::<usize>().prop_map(|index| Op::Confirm { index }),
        1 => any::<usize>().prop_map(|index| Op::Fail { index }),
        1 => any::<usize>().prop_map(|index| Op::Delete { index }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_partitions_and_pending_queue(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let store = create_test_store().await;
            // id -> owner
            let mut live: Vec<(String, &str)> = Vec::new();
            let mut confirmed = 0usize;

            for op in ops {
                match op {
                    Op::Create { user, amount } => {
                        let record = store
                            .create_expense(NewExpense::offline(
                                USERS[user],
                                f64::from(amount) / 100.0,
                                None,
                                "2024-03-01",
                            ))
                            .await
                            .unwrap();
                        live.push((record.id, USERS[user]));
                    }
                    Op::Confirm { index } if !live.is_empty() => {
                        let slot = index % live.len();
                        confirmed += 1;
                        let server_id = format!("srv-{}", confirmed);
                        store
                            .update_expense(&live[slot].0, ExpensePatch::confirmed(server_id.clone()))
                            .await
                            .unwrap();
                        live[slot].0 = server_id;
                    }
                    Op::Fail { index } if !live.is_empty() => {
                        let slot = index % live.len();
                        store.update_expense(&live[slot].0, ExpensePatch::failed()).await.unwrap();
                    }
                    Op::Delete { index } if !live.is_empty() => {
                        let (id, _) = live.remove(index % live.len());
                        store.delete_expense(&id).await.unwrap();
                    }
                    _ => {}
                }
            }

            let mut expected: HashMap<&str, usize> = HashMap::new();
            for (_, owner) in &live {
                *expected.entry(*owner).or_default() += 1;
            }

            for user in USERS {
                let all = store.get_all_expenses(user).await.unwrap();
                prop_assert_eq!(all.len(), expected.get(user).copied().unwrap_or(0));
                prop_assert!(all.iter().all(|r| r.user_id == user));
                prop_assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));

                let pending = store.get_pending_sync(user).await.unwrap();
                let mut pending_ids: Vec<&str> = pending.iter().map(|r| r.id.as_str()).collect();
                let mut subset: Vec<&str> = all
                    .iter()
                    .filter(|r| r.pending_sync)
                    .map(|r| r.id.as_str())
                    .collect();
                pending_ids.sort_unstable();
                subset.sort_unstable();
                prop_assert_eq!(pending_ids, subset);

                for record in &all {
                    prop_assert_eq!(record.pending_sync, !record.id.starts_with("srv-"));
                }
            }
            Ok(())
        })?;
    }
}
