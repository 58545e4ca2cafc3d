use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prospect_core::{build_compact_payload, CompactionInputs, CompactionLimits};
use prospect_local::{
    brief_llm_from_env, generate_brief, run_company_analysis, AnalysisOptions, CallPacing,
    CompanyAnalysis, OpenAiCompatClient, RemoteToolClient, RetryPolicy, Tools,
};
use serde::Serialize;
use std::path::PathBuf;

const MISSING_QUERY: &str = "Missing query.";

#[derive(Parser, Debug)]
#[command(name = "prospect")]
#[command(about = "Company prospect research: domain resolution, compact payloads, sales briefs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the company, fetch every data category, print the compact analysis (json).
    Research(QueryCmd),
    /// Research plus an LLM-generated sales brief (json).
    Brief(QueryCmd),
    /// Resolve a company name or URL to its domain (json).
    Resolve(QueryCmd),
    /// Compact a saved bundle of raw tool payloads (json; no network).
    Compact(CompactCmd),
    /// List the tools exposed by the remote tool server.
    ListTools(ListToolsCmd),
    /// Run as an MCP stdio server.
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct QueryCmd {
    /// Company name, domain, or URL (words are joined with spaces).
    query: Vec<String>,
    /// Retries per tool call after the first attempt.
    #[arg(long, env = "PROSPECT_TOOL_RETRIES", default_value_t = 2)]
    retries: u32,
    /// Skip the pauses between sequential tool calls.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_pause: bool,
}

impl QueryCmd {
    fn query(&self) -> Result<String> {
        let q = self.query.join(" ").trim().to_string();
        if q.is_empty() {
            anyhow::bail!(MISSING_QUERY);
        }
        Ok(q)
    }

    fn tools(&self) -> Tools<RemoteToolClient> {
        Tools::new(RemoteToolClient::from_env()).with_retry(RetryPolicy {
            retries: self.retries,
            ..RetryPolicy::default()
        })
    }

    fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            pacing: if self.no_pause {
                CallPacing::none()
            } else {
                CallPacing::default()
            },
            limits: CompactionLimits::default(),
        }
    }
}

#[derive(clap::Args, Debug)]
struct CompactCmd {
    /// JSON bundle of raw payloads keyed firmo, techno, cloudSpend, fai, securitySpend,
    /// contracts, productCategories, productVendors, productAttributes, intentTopics,
    /// productInfo, productReviews. Use `-` for stdin.
    #[arg(long)]
    input: PathBuf,
}

#[derive(clap::Args, Debug)]
struct ListToolsCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn to_json<T: Serialize>(v: &T) -> serde_json::Value {
    serde_json::to_value(v).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}

/// `{...analysis, brief}`.
async fn analysis_with_brief(
    analysis: &CompanyAnalysis,
    llm: Option<&OpenAiCompatClient>,
) -> serde_json::Value {
    let compact = to_json(&analysis.compact);
    let brief = generate_brief(
        llm,
        &compact,
        &analysis.company_domain,
        analysis.company_name.as_deref(),
    )
    .await;
    let mut out = to_json(analysis);
    out["brief"] = brief;
    out
}

fn read_bundle(path: &std::path::Path) -> Result<CompactionInputs> {
    let txt = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("read bundle from stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    };
    serde_json::from_str(&txt).with_context(|| format!("parse bundle {}", path.display()))
}

#[cfg(feature = "stdio")]
mod mcp {
    use super::*;
    use prospect_local::resolve_company_domain;
    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;
    use std::sync::Arc;

    const SCHEMA_VERSION: u64 = 1;

    #[path = "envelope.rs"]
    mod envelope;
    use envelope::*;

    const TOOL_NAMES: [&str; 5] = [
        "prospect_meta",
        "resolve_company_domain",
        "compact_payload",
        "company_analysis",
        "sales_brief",
    ];

    fn tool_result(payload: serde_json::Value) -> CallToolResult {
        // Structured content for machine consumers, plus a text copy for clients that only
        // read `content[0].text`.
        let mut r = CallToolResult::structured(payload.clone());
        r.content = vec![Content::text(payload.to_string())];
        r
    }

    fn failure(kind: &str, t0: std::time::Instant, error: serde_json::Value) -> CallToolResult {
        tracing::warn!(
            tool = kind,
            code = error.get("code").and_then(serde_json::Value::as_str).unwrap_or(""),
            message = error.get("message").and_then(serde_json::Value::as_str).unwrap_or(""),
            "mcp tool failed"
        );
        let mut payload = serde_json::json!({ "ok": false, "error": error });
        add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
        tool_result(payload)
    }

    fn has_env(k: &str) -> bool {
        std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct QueryArgs {
        /// Company name, domain, or URL.
        #[serde(default)]
        query: Option<String>,
    }

    impl QueryArgs {
        fn query(&self) -> Option<String> {
            self.query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
        }
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct CompactPayloadArgs {
        /// Raw payloads keyed firmo, techno, cloudSpend, fai, securitySpend, contracts,
        /// productCategories, productVendors, productAttributes, intentTopics, productInfo,
        /// productReviews. Missing keys are treated as null.
        #[serde(default)]
        input: Option<serde_json::Value>,
        /// Cap for technographic highlights (default 15).
        #[serde(default)]
        tech_top_n: Option<usize>,
        /// Cap for catalog label lists (default 12).
        #[serde(default)]
        list_top_n: Option<usize>,
    }

    #[derive(Clone)]
    pub(crate) struct ProspectMcp {
        tool_router: RmcpToolRouter<Self>,
        tools: Arc<Tools<RemoteToolClient>>,
        llm: Option<OpenAiCompatClient>,
        opts: AnalysisOptions,
    }

    #[tool_router]
    impl ProspectMcp {
        pub(crate) fn new() -> Self {
            Self::with_parts(
                Tools::new(RemoteToolClient::from_env()),
                brief_llm_from_env(),
                AnalysisOptions::default(),
            )
        }

        pub(crate) fn with_parts(
            tools: Tools<RemoteToolClient>,
            llm: Option<OpenAiCompatClient>,
            opts: AnalysisOptions,
        ) -> Self {
            Self {
                tool_router: Self::tool_router(),
                tools: Arc::new(tools),
                llm,
                opts,
            }
        }

        #[tool(description = "Report prospect configuration + version (no secrets)")]
        async fn prospect_meta(&self) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            // Only report booleans, never values.
            let mut payload = serde_json::json!({
                "ok": true,
                "name": "prospect",
                "version": env!("CARGO_PKG_VERSION"),
                "configured": {
                    "tool_server": self.tools.client().url().is_some(),
                    "llm": self.llm.is_some(),
                    "llm_pricing": has_env("PROSPECT_LLM_INPUT_COST_PER_1K")
                        || has_env("LLM_INPUT_COST_PER_1K")
                        || has_env("PROSPECT_LLM_OUTPUT_COST_PER_1K")
                        || has_env("LLM_OUTPUT_COST_PER_1K"),
                },
                "tools": TOOL_NAMES,
            });
            add_envelope_fields(&mut payload, "prospect_meta", t0.elapsed().as_millis());
            Ok(tool_result(payload))
        }

        #[tool(
            description = "Resolve a company name or URL to its domain (direct parse, directory search, web search, then a .com guess)"
        )]
        async fn resolve_company_domain(
            &self,
            params: Parameters<Option<QueryArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let kind = "resolve_company_domain";
            let args = params.0.unwrap_or_default();
            let Some(query) = args.query() else {
                return Ok(failure(
                    kind,
                    t0,
                    error_obj(ErrorCode::InvalidParams, MISSING_QUERY, ErrorCode::InvalidParams.default_hint()),
                ));
            };
            match resolve_company_domain(&*self.tools, &query).await {
                Ok(resolved) => {
                    let mut payload = serde_json::json!({
                        "ok": true,
                        "query": query,
                        "domain": resolved.domain,
                    });
                    if let Some(name) = resolved.name {
                        payload["name"] = serde_json::json!(name);
                    }
                    add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
                    Ok(tool_result(payload))
                }
                Err(e) => Ok(failure(kind, t0, error_from(&e))),
            }
        }

        #[tool(
            description = "Compact a bundle of raw company data payloads into the sales-oriented compact payload (no network)"
        )]
        async fn compact_payload(
            &self,
            params: Parameters<Option<CompactPayloadArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let kind = "compact_payload";
            let args = params.0.unwrap_or_default();
            let raw = args.input.unwrap_or_else(|| serde_json::json!({}));
            let inputs: CompactionInputs = match serde_json::from_value(raw) {
                Ok(i) => i,
                Err(e) => {
                    return Ok(failure(
                        kind,
                        t0,
                        error_obj(
                            ErrorCode::InvalidParams,
                            format!("input must be an object of raw payloads: {e}"),
                            "Pass input={firmo: ..., techno: ..., ...}; missing keys are allowed.",
                        ),
                    ))
                }
            };
            let defaults = CompactionLimits::default();
            let limits = CompactionLimits {
                tech_top_n: args.tech_top_n.unwrap_or(defaults.tech_top_n).clamp(1, 100),
                list_top_n: args.list_top_n.unwrap_or(defaults.list_top_n).clamp(1, 100),
                ..defaults
            };
            let mut payload = serde_json::json!({
                "ok": true,
                "compact": to_json(&build_compact_payload(&inputs, &limits)),
            });
            add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
            Ok(tool_result(payload))
        }

        #[tool(
            description = "Resolve a company and gather firmographic, technographic, spend, contract and product signals into a compact payload"
        )]
        async fn company_analysis(
            &self,
            params: Parameters<Option<QueryArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let kind = "company_analysis";
            let args = params.0.unwrap_or_default();
            let Some(query) = args.query() else {
                return Ok(failure(
                    kind,
                    t0,
                    error_obj(ErrorCode::InvalidParams, MISSING_QUERY, ErrorCode::InvalidParams.default_hint()),
                ));
            };
            match run_company_analysis(&*self.tools, &query, &self.opts).await {
                Ok(analysis) => {
                    let mut payload = to_json(&analysis);
                    payload["ok"] = serde_json::json!(true);
                    add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
                    Ok(tool_result(payload))
                }
                Err(e) => Ok(failure(kind, t0, error_from(&e))),
            }
        }

        #[tool(
            description = "Company analysis plus an LLM-generated Challenger-style sales call brief"
        )]
        async fn sales_brief(
            &self,
            params: Parameters<Option<QueryArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let t0 = std::time::Instant::now();
            let kind = "sales_brief";
            let args = params.0.unwrap_or_default();
            let Some(query) = args.query() else {
                return Ok(failure(
                    kind,
                    t0,
                    error_obj(ErrorCode::InvalidParams, MISSING_QUERY, ErrorCode::InvalidParams.default_hint()),
                ));
            };
            match run_company_analysis(&*self.tools, &query, &self.opts).await {
                Ok(analysis) => {
                    let mut payload = analysis_with_brief(&analysis, self.llm.as_ref()).await;
                    payload["ok"] = serde_json::json!(true);
                    add_envelope_fields(&mut payload, kind, t0.elapsed().as_millis());
                    Ok(tool_result(payload))
                }
                Err(e) => Ok(failure(kind, t0, error_from(&e))),
            }
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for ProspectMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Company prospect research. Resolve a company, compact its data, and draft a sales brief; outputs are JSON and schema-versioned."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio() -> Result<(), McpError> {
        let svc = ProspectMcp::new();
        tracing::info!(
            tool_server = svc.tools.client().url().is_some(),
            llm = svc.llm.is_some(),
            "mcp stdio server starting"
        );
        let running = svc
            .serve(stdio())
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        // Keep the stdio server alive until the client closes.
        running
            .waiting()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(())
    }

}

/// Optional env-file loader (`PROSPECT_ENV_FILE`). Never overrides the process env and
/// never logs values.
fn load_env_file() {
    let Ok(p) = std::env::var("PROSPECT_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

/// Logs go to stderr: stdout carries JSON output and the MCP stdio protocol.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_pretty<T: Serialize>(v: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Research(args) => {
            let query = args.query()?;
            let tools = args.tools();
            let analysis = run_company_analysis(&tools, &query, &args.options()).await;
            tools.into_inner().close().await;
            print_pretty(&analysis?)?;
        }
        Commands::Brief(args) => {
            let query = args.query()?;
            let tools = args.tools();
            let analysis = run_company_analysis(&tools, &query, &args.options()).await;
            tools.into_inner().close().await;
            let analysis = analysis?;
            let llm = brief_llm_from_env();
            print_pretty(&analysis_with_brief(&analysis, llm.as_ref()).await)?;
        }
        Commands::Resolve(args) => {
            let query = args.query()?;
            let tools = args.tools();
            let resolved = prospect_local::resolve_company_domain(&tools, &query).await;
            tools.into_inner().close().await;
            print_pretty(&resolved?)?;
        }
        Commands::Compact(args) => {
            let inputs = read_bundle(&args.input)?;
            print_pretty(&build_compact_payload(&inputs, &CompactionLimits::default()))?;
        }
        Commands::ListTools(args) => {
            let client = RemoteToolClient::from_env();
            let names = prospect_core::ToolClient::list_tools(&client).await;
            client.close().await;
            let names = names?;
            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    println!("TOOLS:");
                    for n in &names {
                        println!("- {n}");
                    }
                }
                _ => println!(
                    "{}",
                    serde_json::json!({
                        "schema_version": 1,
                        "kind": "list_tools",
                        "ok": true,
                        "tools": names,
                    })
                ),
            }
        }
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            mcp::serve_stdio()
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "prospect",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("prospect {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}
