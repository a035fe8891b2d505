use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mintset::{parse_page_spec, Assembler, BuildReport, Config, SelectionRecord, SourceCheck};

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ParsePagesRequest {
    #[schemars(description = "Page specification using 1-based pages (e.g., '2-4,6')")]
    pub spec: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecordInput {
    #[schemars(description = "Unique question id (e.g., '2014_P1_Q12')")]
    pub identifier: String,
    #[schemars(description = "Cover-page title; derived from the id and metadata when omitted")]
    #[serde(default)]
    pub title: Option<String>,
    #[schemars(description = "Local path or http(s) URL of the question PDF")]
    #[serde(default)]
    pub question_source: Option<String>,
    #[schemars(description = "Question pages (e.g., '2-3'); empty means the whole document")]
    #[serde(default)]
    pub question_pages: Option<String>,
    #[schemars(description = "Local path or http(s) URL of the solution PDF")]
    #[serde(default)]
    pub solution_source: Option<String>,
    #[schemars(description = "Solution pages")]
    #[serde(default)]
    pub solution_pages: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub paper: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl From<RecordInput> for SelectionRecord {
    fn from(input: RecordInput) -> Self {
        SelectionRecord {
            identifier: input.identifier,
            title: input.title,
            question_source: input.question_source,
            question_pages: input.question_pages,
            solution_source: input.solution_source,
            solution_pages: input.solution_pages,
            year: input.year,
            paper: input.paper,
            topic: input.topic,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BuildRequest {
    #[schemars(description = "Questions in cover order")]
    pub records: Vec<RecordInput>,
    #[schemars(description = "Output file path")]
    pub output: String,
    #[schemars(description = "Append solution pages after the questions (default: server setting)")]
    #[serde(default)]
    pub include_solutions: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CheckRequest {
    #[schemars(description = "Questions to check")]
    pub records: Vec<RecordInput>,
    #[schemars(description = "Also check solution sources (default: server setting)")]
    #[serde(default)]
    pub include_solutions: Option<bool>,
}

#[derive(Clone)]
pub struct PracticeServer {
    assembler: Arc<Assembler>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl PracticeServer {
    pub fn new(assembler: Assembler) -> Self {
        Self {
            assembler: Arc::new(assembler),
            tool_router: Self::tool_router(),
        }
    }

    fn include_solutions(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(self.assembler.config().include_solutions)
    }
}

#[tool_router]
impl PracticeServer {
    #[tool(description = "Expand a page specification like '2-4,6' into sorted, de-duplicated zero-based page indices. Invalid parts are ignored.")]
    fn parse_pages(
        &self,
        Parameters(ParsePagesRequest { spec }): Parameters<ParsePagesRequest>,
    ) -> String {
        let result = ParsePagesResult {
            indices: parse_page_spec(&spec),
            spec,
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }

    #[tool(description = "Build a practice set PDF: a cover listing the questions, then every question's pages, then every solution's pages. Missing sources and pages are skipped and reported.")]
    async fn build_practice_set(&self, Parameters(req): Parameters<BuildRequest>) -> String {
        let include_solutions = self.include_solutions(req.include_solutions);
        let records: Vec<SelectionRecord> = req.records.into_iter().map(Into::into).collect();
        let assembly = match self
            .assembler
            .assemble_with_report(&records, include_solutions)
            .await
        {
            Ok(a) => a,
            Err(e) => return format!("Error: {}", e),
        };

        if let Err(e) = tokio::fs::write(&req.output, &assembly.bytes).await {
            return format!("Error: Failed to write {}: {}", req.output, e);
        }

        let result = BuildResult {
            output_path: req.output,
            page_count: assembly.report.total_pages(),
            report: assembly.report,
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }

    #[tool(description = "Resolve every question and solution source without building, reporting page counts, selected pages and out-of-range pages")]
    async fn check_sources(&self, Parameters(req): Parameters<CheckRequest>) -> String {
        let include_solutions = self.include_solutions(req.include_solutions);
        let records: Vec<SelectionRecord> = req.records.into_iter().map(Into::into).collect();
        let checks: Vec<SourceCheck> = self.assembler.check(&records, include_solutions).await;
        serde_json::to_string_pretty(&checks).unwrap_or_else(|e| format!("Error: {}", e))
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
pub struct ParsePagesResult {
    pub spec: String,
    pub indices: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct BuildResult {
    pub output_path: String,
    pub page_count: usize,
    pub report: BuildReport,
}

#[tool_handler]
impl ServerHandler for PracticeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Maths practice set tools. Use parse_pages to preview a page specification, \
                 check_sources to verify that question and solution PDFs resolve, and \
                 build_practice_set to write the combined PDF."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let server = PracticeServer::new(Assembler::from_config(config)?);

    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
