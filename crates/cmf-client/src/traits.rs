//! Backend capability trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Queries a CMF server answers.
///
/// Every query returns the server's JSON unchanged (apart from page merging)
/// or an error. Implementations are shared behind `Arc` and must be usable
/// from any task.
#[async_trait]
pub trait CmfApi: Send + Sync {
    /// Base address of the server this handle talks to.
    fn base_url(&self) -> &str;

    /// List pipeline names.
    async fn get_pipelines(&self) -> Result<Value>;

    /// All executions of a pipeline, every page merged.
    async fn get_executions(&self, pipeline: &str) -> Result<Value>;

    /// Execution identifiers of a pipeline.
    async fn get_list_of_executions(&self, pipeline: &str) -> Result<Value>;

    /// Artifact types known to the server.
    async fn get_artifact_types(&self) -> Result<Value>;

    /// Artifacts of one type in a pipeline, every page merged.
    async fn get_artifacts(&self, pipeline: &str, artifact_type: &str) -> Result<Value>;

    /// Lineage tree around one execution.
    async fn get_execution_lineage(&self, pipeline: &str, execution_uuid: &str) -> Result<Value>;

    /// Artifact lineage tree of a pipeline.
    async fn get_artifact_lineage(&self, pipeline: &str) -> Result<Value>;

    /// Python environment recorded by the server.
    async fn get_python_env(&self) -> Result<Value>;

    /// Release the session. Queries fail afterwards.
    async fn close_session(&self) -> Result<()>;
}
