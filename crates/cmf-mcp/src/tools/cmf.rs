//! CMF query tools.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{Tool, ToolError};
use crate::context::ServerContext;
use crate::dispatch::{dispatch, TargetResult};
use crate::protocol::McpToolDefinition;

/// Argument naming the connections to query.
pub const TARGETS_ARG: &str = "cmfClient_instances";

/// The CMF queries exposed as tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Pipelines,
    Executions,
    ListOfExecutions,
    ArtifactTypes,
    Artifacts,
    ExecutionLineage,
    ArtifactLineage,
    PythonEnv,
}

impl QueryKind {
    /// Every query, in `tools/list` order.
    pub const ALL: [QueryKind; 8] = [
        QueryKind::Pipelines,
        QueryKind::Executions,
        QueryKind::ListOfExecutions,
        QueryKind::ArtifactTypes,
        QueryKind::Artifacts,
        QueryKind::ExecutionLineage,
        QueryKind::ArtifactLineage,
        QueryKind::PythonEnv,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Pipelines => "cmf_show_pipelines",
            Self::Executions => "cmf_show_executions",
            Self::ListOfExecutions => "cmf_show_list_of_executions",
            Self::ArtifactTypes => "cmf_show_artifact_types",
            Self::Artifacts => "cmf_show_artifacts",
            Self::ExecutionLineage => "cmf_show_execution_lineage",
            Self::ArtifactLineage => "cmf_show_artifact_lineage",
            Self::PythonEnv => "cmf_show_python_env",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::Pipelines => "Lists all Pipelines in CMF server",
            Self::Executions => "Lists all Executions for a given pipeline in CMF server",
            Self::ListOfExecutions => {
                "Lists the execution identifiers of a given pipeline in CMF server"
            }
            Self::ArtifactTypes => "Lists all Artifact types in CMF server",
            Self::Artifacts => {
                "Lists all Artifacts of a given type for a given pipeline in CMF server"
            }
            Self::ExecutionLineage => {
                "Shows the lineage tree around one execution of a pipeline in CMF server"
            }
            Self::ArtifactLineage => "Shows the artifact lineage tree of a pipeline in CMF server",
            Self::PythonEnv => "Shows the Python environment recorded by CMF server",
        }
    }

    /// Required string parameters with their schema descriptions.
    fn params(self) -> &'static [(&'static str, &'static str)] {
        const PIPELINE: (&str, &str) = ("pipeline", "Name of the pipeline");
        match self {
            Self::Pipelines | Self::ArtifactTypes | Self::PythonEnv => &[],
            Self::Executions | Self::ListOfExecutions | Self::ArtifactLineage => &[PIPELINE],
            Self::Artifacts => &[
                PIPELINE,
                ("artifact_type", "Artifact type, e.g. Dataset, Model or Metrics"),
            ],
            Self::ExecutionLineage => &[
                PIPELINE,
                ("execution_uuid", "UUID of the execution to trace"),
            ],
        }
    }
}

/// Arguments after validation.
#[derive(Debug, Default, PartialEq)]
struct QueryArgs {
    pipeline: String,
    artifact_type: String,
    execution_uuid: String,
    targets: Option<Vec<String>>,
}

impl QueryArgs {
    fn parse(kind: QueryKind, arguments: &Value) -> Result<Self, ToolError> {
        let empty = Map::new();
        let map = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ToolError::invalid_args("arguments must be an object")),
        };

        let mut args = QueryArgs {
            targets: parse_targets(map.get(TARGETS_ARG))?,
            ..Default::default()
        };
        for (name, _) in kind.params() {
            let value = match map.get(*name) {
                None | Some(Value::Null) => return Err(ToolError::missing_param(*name)),
                Some(Value::String(s)) => s.clone(),
                Some(_) => return Err(ToolError::wrong_type(*name, "string")),
            };
            match *name {
                "pipeline" => args.pipeline = value,
                "artifact_type" => args.artifact_type = value,
                _ => args.execution_uuid = value,
            }
        }
        Ok(args)
    }
}

fn parse_targets(value: Option<&Value>) -> Result<Option<Vec<String>>, ToolError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ToolError::wrong_type(TARGETS_ARG, "array of strings"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(ToolError::wrong_type(TARGETS_ARG, "array of strings")),
    }
}

/// One CMF query fanned out over the selected connections.
pub struct CmfTool {
    kind: QueryKind,
}

impl CmfTool {
    pub fn new(kind: QueryKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }
}

#[async_trait]
impl Tool for CmfTool {
    fn name(&self) -> &str {
        self.kind.tool_name()
    }

    fn definition(&self) -> McpToolDefinition {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, description) in self.kind.params() {
            properties.insert(
                name.to_string(),
                json!({"type": "string", "description": description}),
            );
            required.push(Value::String(name.to_string()));
        }
        properties.insert(
            TARGETS_ARG.to_string(),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "description": "Optional list of CMF server URLs to query. Queries every configured server when omitted."
            }),
        );

        McpToolDefinition {
            name: self.kind.tool_name().to_string(),
            description: Some(self.kind.description().to_string()),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        QueryArgs::parse(self.kind, arguments).map(|_| ())
    }

    async fn call(
        &self,
        arguments: &Value,
        ctx: &ServerContext,
    ) -> Result<Vec<TargetResult>, ToolError> {
        let args = QueryArgs::parse(self.kind, arguments)?;
        let registry = ctx.registry();
        let filter = args.targets.as_deref();
        let pipeline = args.pipeline.as_str();
        let artifact_type = args.artifact_type.as_str();
        let execution_uuid = args.execution_uuid.as_str();

        let results = match self.kind {
            QueryKind::Pipelines => {
                dispatch(registry, filter, |c| async move { c.get_pipelines().await }).await
            }
            QueryKind::Executions => {
                dispatch(registry, filter, |c| async move {
                    c.get_executions(pipeline).await
                })
                .await
            }
            QueryKind::ListOfExecutions => {
                dispatch(registry, filter, |c| async move {
                    c.get_list_of_executions(pipeline).await
                })
                .await
            }
            QueryKind::ArtifactTypes => {
                dispatch(registry, filter, |c| async move {
                    c.get_artifact_types().await
                })
                .await
            }
            QueryKind::Artifacts => {
                dispatch(registry, filter, |c| async move {
                    c.get_artifacts(pipeline, artifact_type).await
                })
                .await
            }
            QueryKind::ExecutionLineage => {
                dispatch(registry, filter, |c| async move {
                    c.get_execution_lineage(pipeline, execution_uuid).await
                })
                .await
            }
            QueryKind::ArtifactLineage => {
                dispatch(registry, filter, |c| async move {
                    c.get_artifact_lineage(pipeline).await
                })
                .await
            }
            QueryKind::PythonEnv => {
                dispatch(registry, filter, |c| async move { c.get_python_env().await }).await
            }
        };
        Ok(results)
    }
}
