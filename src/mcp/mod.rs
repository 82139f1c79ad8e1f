// src/mcp/mod.rs
// MCP Server implementation

pub mod tools;

use crate::config::EnvConfig;
use crate::github::GitHubClient;
use crate::http::create_client_with_timeout;
use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam,
        ServerCapabilities, ServerInfo,
    },
    schemars,
    service::{RequestContext, RoleServer},
    tool, tool_router, ErrorData, ServerHandler,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// MCP Server state
#[derive(Clone)]
pub struct RemctxServer {
    pub env: EnvConfig,
    pub http: reqwest::Client,
    pub github: Arc<GitHubClient>,
    tool_router: ToolRouter<Self>,
}

impl RemctxServer {
    pub fn new(env: EnvConfig) -> Self {
        let http = create_client_with_timeout(env.fetch.request_timeout);
        let github = Arc::new(GitHubClient::new(
            http.clone(),
            env.github_token.clone(),
            &env.fetch,
        ));
        Self {
            env,
            http,
            github,
            tool_router: Self::tool_router(),
        }
    }
}

// Request types for tools with parameters
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetWorkspaceContextRequest {
    #[schemars(description = "Workspace path (defaults to CONTEXT_WORKDIR)")]
    pub workspace_path: Option<String>,
    #[schemars(description = "Include git repository information (default true)")]
    pub include_git_info: Option<bool>,
    #[schemars(description = "Include key manifest analysis (default true)")]
    pub include_file_analysis: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FetchAndSetupRequest {
    #[schemars(description = "Workspace path (defaults to CONTEXT_WORKDIR)")]
    pub workspace_dir: Option<String>,
    #[schemars(description = "Explicit instruction URLs; overrides resolution for the category")]
    pub instructions_urls: Option<Vec<String>>,
    #[schemars(description = "Explicit chat-mode URLs; overrides resolution for the category")]
    pub chatmodes_urls: Option<Vec<String>>,
    #[schemars(description = "Explicit prompt URLs; overrides resolution for the category")]
    pub prompts_urls: Option<Vec<String>>,
    #[schemars(description = "Detect project types and resolve from configuration (default true)")]
    pub auto_detect: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetActiveProfileRequest {
    #[schemars(description = "Project type (python, javascript, ...)")]
    pub project_type: String,
    #[schemars(description = "Profile to activate")]
    pub profile_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetAvailableProfilesRequest {
    #[schemars(description = "Project type (python, javascript, ...)")]
    pub project_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ContextUrlRequest {
    #[schemars(description = "Project type (python, javascript, ...)")]
    pub project_type: String,
    #[schemars(description = "Profile name")]
    pub profile_name: String,
    #[schemars(description = "Category: instructions, chatmodes, or prompts")]
    pub category: String,
    #[schemars(description = "Context URL")]
    pub url: String,
}

#[tool_router]
impl RemctxServer {
    #[tool(
        description = "Get workspace context: detected project types, framework conditions, git info, and key manifests. Input for the other tools."
    )]
    async fn get_workspace_context(
        &self,
        Parameters(req): Parameters<GetWorkspaceContextRequest>,
    ) -> Result<String, String> {
        tools::workspace::get_workspace_context(
            self,
            req.workspace_path,
            req.include_git_info.unwrap_or(true),
            req.include_file_analysis.unwrap_or(true),
        )
        .await
    }

    #[tool(
        description = "Fetch remote instructions, chat modes, and prompts into .github/<profile>/ directories and update VS Code settings."
    )]
    async fn fetch_and_setup_copilot_files(
        &self,
        Parameters(req): Parameters<FetchAndSetupRequest>,
    ) -> Result<String, String> {
        tools::context::fetch_and_setup(
            self,
            req.workspace_dir,
            req.instructions_urls,
            req.chatmodes_urls,
            req.prompts_urls,
            req.auto_detect.unwrap_or(true),
        )
        .await
    }

    #[tool(description = "List the current context configuration: project types, profiles, and their sources.")]
    async fn list_context_config(&self) -> Result<String, String> {
        tools::profiles::list_context_config(self).await
    }

    #[tool(description = "Set the active profile for a project type. Takes effect on the next fetch.")]
    async fn set_active_profile(
        &self,
        Parameters(req): Parameters<SetActiveProfileRequest>,
    ) -> Result<String, String> {
        tools::profiles::set_active_profile(self, req.project_type, req.profile_name).await
    }

    #[tool(description = "List available profiles for a project type.")]
    async fn get_available_profiles(
        &self,
        Parameters(req): Parameters<GetAvailableProfilesRequest>,
    ) -> Result<String, String> {
        tools::profiles::get_available_profiles(self, req.project_type).await
    }

    #[tool(description = "Add a context URL to a profile's always-fetch list.")]
    async fn add_context_url(
        &self,
        Parameters(req): Parameters<ContextUrlRequest>,
    ) -> Result<String, String> {
        tools::profiles::add_context_url(
            self,
            req.project_type,
            req.profile_name,
            req.category,
            req.url,
        )
        .await
    }

    #[tool(description = "Remove a context URL from a profile's always-fetch list.")]
    async fn remove_context_url(
        &self,
        Parameters(req): Parameters<ContextUrlRequest>,
    ) -> Result<String, String> {
        tools::profiles::remove_context_url(
            self,
            req.project_type,
            req.profile_name,
            req.category,
            req.url,
        )
        .await
    }
}

impl ServerHandler for RemctxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "remctx".into(),
                title: Some("remctx - Remote context files for Copilot workspaces".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "remctx fetches remote instruction, chat-mode, and prompt files for a workspace \
                 based on detected project characteristics and profile configuration."
                    .into(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let tool_name = request.name.to_string();
            let call_id = uuid::Uuid::new_v4().to_string();
            let start = std::time::Instant::now();

            let ctx = ToolCallContext::new(self, request, context);
            let result = self.tool_router.call(ctx).await;

            let duration_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => debug!(tool = %tool_name, call_id = %call_id, duration_ms, "Tool call finished"),
                Err(e) => {
                    warn!(tool = %tool_name, call_id = %call_id, duration_ms, error = %e.message, "Tool call failed")
                }
            }

            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchSettings;
    use std::path::PathBuf;

    fn env() -> EnvConfig {
        EnvConfig {
            github_token: None,
            config_file: "context_config.yaml".to_string(),
            workdir: PathBuf::from("."),
            fetch: FetchSettings::default(),
        }
    }

    #[test]
    fn test_server_construction() {
        let server = RemctxServer::new(env());
        assert!(!server.github.has_token());
    }

    #[test]
    fn test_server_info() {
        let server = RemctxServer::new(env());
        let info = server.get_info();
        assert_eq!(info.server_info.name, "remctx");
        assert!(info.instructions.is_some());
    }
}
