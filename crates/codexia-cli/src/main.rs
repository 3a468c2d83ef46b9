mod display;
mod index;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use codexia_ai::EmbeddingMode;
use codexia_core::{Assessment, Claim, PlanResult, RiskWeights};
use codexia_service::{
    ActRequest, Gateway, IndexBackend, Pipeline, PlanRequest, ServiceError, Settings, init_logging,
};

#[derive(Parser)]
#[command(name = "codexia")]
#[command(about = "Deterministic claim review: assess denial risk, plan a fix, act on it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(Args)]
struct GlobalOpts {
    /// Directory holding the vector index
    #[arg(long, global = true, env = "CODEXIA_VECTOR_PATH", default_value = "./var/vector")]
    vector_path: PathBuf,

    /// Directory for day-partitioned audit logs
    #[arg(long, global = true, env = "CODEXIA_AUDIT_PATH", default_value = "./var/audit")]
    audit_path: PathBuf,

    /// Directory of policy markdown files
    #[arg(long, global = true, env = "CODEXIA_POLICIES_PATH", default_value = "./data/policies")]
    policies_path: PathBuf,

    /// Maximum evidence passages per assessment
    #[arg(long, global = true, env = "CODEXIA_TOPK", default_value_t = 5)]
    topk: usize,

    /// Request body limit in bytes
    #[arg(long, global = true, env = "CODEXIA_MAX_PAYLOAD_BYTES", default_value_t = 1024 * 1024)]
    max_payload_bytes: usize,

    /// Requests per second allowed per client
    #[arg(long, global = true, env = "CODEXIA_RATE", default_value_t = 5.0)]
    rate: f64,

    /// Embedding backend: hash or onnx
    #[arg(long, global = true, env = "CODEXIA_EMBEDDING", default_value = "hash")]
    embedding: EmbeddingMode,

    /// ONNX model directory (model.onnx + tokenizer.json)
    #[arg(long, global = true, env = "CODEXIA_MODEL_DIR", default_value = "./models/all-MiniLM-L6-v2")]
    model_dir: PathBuf,

    /// Index backend: flat or lance
    #[arg(long, global = true, env = "CODEXIA_INDEX_BACKEND", default_value = "flat")]
    index_backend: IndexBackend,

    /// Risk weights as a JSON object, e.g. '{"lines": 0.05}'
    #[arg(long, global = true, env = "CODEXIA_RISK_WEIGHTS")]
    risk_weights: Option<String>,

    /// Client key used for rate limiting
    #[arg(long, global = true, default_value = "cli")]
    client: String,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector index from the policy corpus
    Index {
        /// Rebuild even if the corpus is unchanged
        #[arg(long)]
        rebuild: bool,

        /// Also write the passages to a LanceDB table
        #[arg(long)]
        lance: bool,
    },

    /// Score a claim's denial risk and gather evidence
    Assess {
        /// Claim JSON file, or - for stdin
        claim: PathBuf,

        /// Print a readable card instead of JSON
        #[arg(long)]
        card: bool,
    },

    /// Rank a recoding plan and an appeal plan
    Plan {
        /// Claim JSON file, or - for stdin
        claim: PathBuf,

        /// Assessment JSON; assessed on the fly when omitted
        #[arg(long)]
        assessment: Option<PathBuf>,
    },

    /// Apply the preferred plan and record it in the audit log
    Act {
        /// Claim JSON file, or - for stdin
        claim: PathBuf,

        /// PlanResult JSON; planned on the fly when omitted
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Assessment JSON whose evidence feeds appeal letters
        #[arg(long)]
        assessment: Option<PathBuf>,
    },
}

impl GlobalOpts {
    fn settings(&self) -> anyhow::Result<Settings> {
        let risk_weights = match &self.risk_weights {
            Some(json) => serde_json::from_str::<RiskWeights>(json).context("parsing risk weights")?,
            None => RiskWeights::default(),
        };
        Ok(Settings {
            vector_path: self.vector_path.clone(),
            audit_path: self.audit_path.clone(),
            policies_path: self.policies_path.clone(),
            topk: self.topk,
            max_payload_bytes: self.max_payload_bytes,
            rate_per_sec: self.rate,
            embedding: self.embedding,
            model_dir: self.model_dir.clone(),
            index_backend: self.index_backend,
            risk_weights,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.opts.log_level)?;
    tracing::debug!("codexia v{}", env!("CARGO_PKG_VERSION"));

    let settings = cli.opts.settings()?;
    let client = cli.opts.client.as_str();

    match cli.command {
        Commands::Index { rebuild, lance } => {
            let embedder = codexia_ai::load_embedder(settings.embedding, &settings.model_dir)?;
            let stats =
                index::run_index_pipeline(&settings, embedder.as_ref(), rebuild, lance).await?;
            if let Some(rows) = stats.lance_rows {
                eprintln!("  LanceDB table has {rows} rows");
            }
            eprintln!("Done in {:.2}s", stats.elapsed_secs);
        }
        Commands::Assess { claim, card } => {
            let gateway = open_gateway(&settings).await?;
            let body = read_input(&claim)?;
            let assessment = gateway.assess(client, &body).await.map_err(service_error)?;
            if card {
                let claim: Claim = serde_json::from_slice(&body).context("parsing claim")?;
                display::print_assessment_card(&claim, &assessment);
            } else {
                print_json(&assessment)?;
            }
        }
        Commands::Plan { claim, assessment } => {
            let gateway = open_gateway(&settings).await?;
            let body = read_input(&claim)?;
            let assessment = assessment.map(|p| read_json::<Assessment>(&p)).transpose()?;
            let plans = plan_for(&gateway, client, &body, assessment).await?;
            print_json(&plans)?;
        }
        Commands::Act {
            claim,
            plan,
            assessment,
        } => {
            let gateway = open_gateway(&settings).await?;
            let body = read_input(&claim)?;
            let assessment = assessment.map(|p| read_json::<Assessment>(&p)).transpose()?;
            let plan = match plan {
                Some(path) => read_json::<PlanResult>(&path)?,
                None => plan_for(&gateway, client, &body, assessment.clone()).await?,
            };
            let request = ActRequest {
                claim: serde_json::from_slice(&body).context("parsing claim")?,
                plan,
                assessment,
            };
            let artifact = gateway
                .act(client, &serde_json::to_vec(&request)?)
                .await
                .map_err(service_error)?;
            print_json(&artifact)?;
        }
    }

    Ok(())
}

async fn open_gateway(settings: &Settings) -> anyhow::Result<Gateway> {
    let pipeline = Pipeline::open(settings)
        .await
        .map_err(service_error)
        .context("opening pipeline (run `codexia index` first?)")?;
    Ok(Gateway::new(Arc::new(pipeline), settings))
}

/// Plan for a claim body, assessing it first when no assessment is given.
async fn plan_for(
    gateway: &Gateway,
    client: &str,
    body: &[u8],
    assessment: Option<Assessment>,
) -> anyhow::Result<PlanResult> {
    let assessment = match assessment {
        Some(assessment) => assessment,
        None => gateway.assess(client, body).await.map_err(service_error)?,
    };
    let request = PlanRequest {
        claim: serde_json::from_slice(body).context("parsing claim")?,
        assessment,
    };
    gateway
        .plan(client, &serde_json::to_vec(&request)?)
        .await
        .map_err(service_error)
}

fn service_error(err: ServiceError) -> anyhow::Error {
    let status = err.status_code();
    anyhow!(err).context(format!("request failed with status {status}"))
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = read_input(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
