use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::Error;
use crate::mcp::text_content;
use crate::release;
use crate::repository::RepoInput;
use crate::schema::action_release_schema;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const GET_ACTION_VERSIONS: &str = "get_action_versions";
pub const GET_LATEST_ACTION_VERSION: &str = "get_latest_action_version";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let schema = action_release_schema().to_json_schema();
    vec![
        ToolDescriptor {
            name: GET_ACTION_VERSIONS.into(),
            description: "List all the releases, versions of a GitHub Action".into(),
            input_schema: schema.clone(),
        },
        ToolDescriptor {
            name: GET_LATEST_ACTION_VERSION.into(),
            description: "Get the latest release, version of a GitHub Action. \
                Use this tool to get the latest version of a GitHub Action, \
                and keep your workflow files up to date. (using tag_name or sha)"
                .into(),
            input_schema: schema,
        },
    ]
}

/// Shared, read-only state every tool call runs against.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub client: Client,
    pub cfg: Config,
}

impl ToolContext {
    pub fn new(cfg: Config) -> Result<Self, Error> {
        let client = crate::http::build_client(&cfg)?;
        Ok(Self { client, cfg })
    }
}

fn has_arguments(arguments: &Value) -> bool {
    match arguments {
        Value::Null => false,
        Value::Object(m) => !m.is_empty(),
        _ => true,
    }
}

/// Run tool `name` and return the MCP `tools/call` result payload.
pub async fn call_tool(ctx: &ToolContext, name: &str, arguments: &Value) -> Result<Value, Error> {
    if !has_arguments(arguments) {
        return Err(Error::MissingArguments);
    }
    let text = match name {
        GET_ACTION_VERSIONS => {
            let input: RepoInput = action_release_schema().parse(arguments)?;
            let releases = release::list_releases(&ctx.client, &ctx.cfg, &input).await?;
            serde_json::to_string_pretty(&releases)?
        }
        GET_LATEST_ACTION_VERSION => {
            let input: RepoInput = action_release_schema().parse(arguments)?;
            let latest = release::get_latest_release(&ctx.client, &ctx.cfg, &input).await?;
            serde_json::to_string_pretty(&latest)?
        }
        other => return Err(Error::UnknownTool(other.to_string())),
    };
    Ok(text_content(text))
}
