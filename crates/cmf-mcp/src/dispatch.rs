//! Fan-out of one query across CMF connections.

use std::future::Future;
use std::sync::Arc;

use cmf_client::CmfApi;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// Outcome of a query against one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetResult {
    Success {
        #[serde(rename = "cmfClient")]
        cmf_client: String,
        data: Value,
    },
    Failure {
        #[serde(rename = "cmfClient")]
        cmf_client: String,
        error: String,
    },
}

impl TargetResult {
    /// Identifier of the connection this result came from.
    pub fn cmf_client(&self) -> &str {
        match self {
            Self::Success { cmf_client, .. } | Self::Failure { cmf_client, .. } => cmf_client,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Run `op` against each target connection in turn and collect one result
/// per target.
///
/// Targets are resolved by [`ConnectionRegistry::resolve_targets`]. An error
/// from one target is rendered into that target's record and the remaining
/// targets still run; this function never fails.
pub async fn dispatch<F, Fut>(
    registry: &ConnectionRegistry,
    filter: Option<&[String]>,
    op: F,
) -> Vec<TargetResult>
where
    F: Fn(Arc<dyn CmfApi>) -> Fut,
    Fut: Future<Output = cmf_client::Result<Value>>,
{
    let targets = registry.resolve_targets(filter);
    let mut results = Vec::with_capacity(targets.len());

    for conn in targets {
        debug!(url = %conn.id, "Querying CMF server");
        match op(Arc::clone(&conn.client)).await {
            Ok(data) => results.push(TargetResult::Success {
                cmf_client: conn.id.clone(),
                data,
            }),
            Err(e) => {
                warn!(url = %conn.id, error = %e, "CMF query failed");
                results.push(TargetResult::Failure {
                    cmf_client: conn.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{registry_of, FakeCmf};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_failed_target_is_isolated() {
        let h1 = FakeCmf::ok("http://h1", json!([{"id": 1}]));
        let h2 = FakeCmf::failing("http://h2", "timeout");
        let registry = registry_of(vec![h1, h2]);

        let results = dispatch(&registry, None, |client| async move {
            client.get_executions("train").await
        })
        .await;

        assert_eq!(
            serde_json::to_value(&results).unwrap(),
            json!([
                {"cmfClient": "http://h1", "data": [{"id": 1}]},
                {"cmfClient": "http://h2", "error": "timeout"}
            ])
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_skip_later_targets() {
        let h1 = FakeCmf::failing("http://h1", "boom");
        let h2 = FakeCmf::ok("http://h2", json!(["p"]));
        let h3 = FakeCmf::failing("http://h3", "timeout");
        let registry = registry_of(vec![h1.clone(), h2.clone(), h3.clone()]);

        let results = dispatch(&registry, None, |client| async move {
            client.get_pipelines().await
        })
        .await;

        assert_eq!(results.len(), 3);
        assert!(!results[0].is_success());
        assert!(results[1].is_success());
        assert!(!results[2].is_success());
        assert_eq!(h3.calls.load(Ordering::SeqCst), 1);
        match &results[0] {
            TargetResult::Failure { error, .. } => {
                assert_eq!(error, "CMF server returned 500: boom")
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unfiltered_order_is_stable_across_calls() {
        let h1 = FakeCmf::ok("http://h1", json!(1));
        let h2 = FakeCmf::failing("http://h2", "boom");
        let registry = registry_of(vec![h1, h2]);

        for _ in 0..2 {
            let results = dispatch(&registry, None, |client| async move {
                client.get_artifact_types().await
            })
            .await;
            let order: Vec<&str> = results.iter().map(TargetResult::cmf_client).collect();
            assert_eq!(order, vec!["http://h1", "http://h2"]);
        }
    }

    #[tokio::test]
    async fn test_filter_order_and_unknown_ids() {
        let h1 = FakeCmf::ok("http://h1", json!(1));
        let h2 = FakeCmf::ok("http://h2", json!(2));
        let registry = registry_of(vec![h1.clone(), h2]);
        let filter = vec!["http://h2".to_string(), "http://gone".to_string()];

        let results = dispatch(&registry, Some(filter.as_slice()), |client| async move {
            client.get_python_env().await
        })
        .await;

        let order: Vec<&str> = results.iter().map(TargetResult::cmf_client).collect();
        assert_eq!(order, vec!["http://h2"]);
        assert_eq!(h1.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_only_filter_is_empty() {
        let registry = registry_of(vec![FakeCmf::ok("http://h1", json!([]))]);
        let filter = vec!["http://gone".to_string()];

        let results = dispatch(&registry, Some(filter.as_slice()), |client| async move {
            client.get_pipelines().await
        })
        .await;

        assert!(results.is_empty());
    }

    #[test]
    fn test_target_result_roundtrip_shape() {
        let success: TargetResult =
            serde_json::from_value(json!({"cmfClient": "http://h1", "data": null})).unwrap();
        assert!(success.is_success());
        let failure: TargetResult =
            serde_json::from_value(json!({"cmfClient": "http://h1", "error": "x"})).unwrap();
        assert!(!failure.is_success());
    }
}
