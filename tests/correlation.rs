//! Correlation under concurrent commands and out-of-order replies.

mod common;

// ============================================================================
// Imports
// ============================================================================

use proptest::prelude::*;
use serde_json::json;
use webdriver_bidi::GenericCommand;

use common::connected_broker;

// ============================================================================
// Properties
// ============================================================================

/// Command count plus a permutation giving the reply order.
fn reply_order() -> impl Strategy<Value = Vec<usize>> {
    (1usize..32).prop_flat_map(|count| Just((0..count).collect::<Vec<_>>()).prop_shuffle())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_each_caller_gets_its_own_reply(order in reply_order()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        runtime.block_on(async move {
            let (broker, peer) = connected_broker().await;
            let count = order.len();

            let callers: Vec<_> = (0..count)
                .map(|key| {
                    let broker = broker.clone();
                    tokio::spawn(async move {
                        let command = GenericCommand::new("test.echo", json!({ "key": key }));
                        (key, broker.execute(&command).await)
                    })
                })
                .collect();

            let mut received = Vec::with_capacity(count);
            for _ in 0..count {
                let command = peer.next_command().await.expect("command");
                let id = command["id"].as_u64().expect("id");
                let key = command["params"]["key"].as_u64().expect("key");
                received.push((id, key));
            }

            for index in order {
                let (id, key) = received[index];
                peer.reply_success(id, json!({ "key": key })).expect("reply");
            }

            for caller in callers {
                let (key, result) = caller.await.expect("join");
                let result = result.expect("resolved");
                assert_eq!(result, json!({ "key": key }));
            }

            assert_eq!(broker.pending_count(), 0);
            broker.close().await;
        });
    }
}
