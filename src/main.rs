use clap::{Parser, Subcommand};
use genai_client::config::config_search_paths;
use genai_client::translate::request::{render_create_interaction, render_generate_content};
use genai_client::types::{Content, CreateInteractionParams, GenerateContentConfig};
use genai_client::{Backend, Client, ClientConfig, GenerateContentParameters, RecordingTransport};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "genai",
    about = "Generative AI client for the developer and cloud platform backends",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend override: developer (mldev, gemini) or cloud (vertex, vertexai)
    #[arg(short, long, global = true)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the wire request without sending it
    Render {
        #[command(flatten)]
        prompt: PromptArgs,

        /// Render as a streaming request
        #[arg(long)]
        stream: bool,

        /// Render an interactions request instead of generate-content
        #[arg(long)]
        interaction: bool,
    },
    /// Send a prompt and print the reply
    Generate {
        #[command(flatten)]
        prompt: PromptArgs,

        /// Stream the reply as it arrives
        #[arg(long)]
        stream: bool,

        /// Save the exchange as a replay fixture
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Print config search paths
    Paths,
}

#[derive(clap::Args)]
struct PromptArgs {
    /// Model identifier, bare or fully qualified
    #[arg(short, long, default_value = "gemini-2.5-flash")]
    model: String,

    /// System instruction
    #[arg(long)]
    system: Option<String>,

    #[arg(long)]
    temperature: Option<f64>,

    /// Prompt text
    prompt: String,
}

impl PromptArgs {
    fn params(&self) -> GenerateContentParameters {
        let config = GenerateContentConfig {
            system_instruction: self.system.clone().map(Content::user),
            temperature: self.temperature,
            ..GenerateContentConfig::default()
        };
        GenerateContentParameters::new(self.model.clone(), vec![Content::user(self.prompt.clone())])
            .with_config(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let load_config = || -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::find_and_load(cli.config.as_deref())?;
        if cli.backend.is_some() {
            config.backend = cli.backend;
        }
        Ok(config)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genai_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Paths => {
            println!("Config search paths:");
            for (i, path) in config_search_paths().iter().enumerate() {
                println!("  {}. {}", i + 1, path.display());
            }
        }
        Command::Render {
            prompt,
            stream,
            interaction,
        } => {
            let config = load_config()?;
            let profile = config.profile()?;
            let request = if interaction {
                let mut params = CreateInteractionParams::with_model(
                    prompt.model.clone(),
                    prompt.prompt.clone(),
                );
                params.system_instruction = prompt.system.clone();
                render_create_interaction(&params, &profile, stream)?
            } else {
                render_generate_content(&prompt.params(), &profile, stream)?
            };
            println!("{} {}", request.method, request.target());
            if let Some(body) = &request.body {
                println!("{}", serde_json::to_string_pretty(body)?);
            }
        }
        Command::Generate {
            prompt,
            stream,
            record,
        } => {
            let config = load_config()?;
            let profile = config.profile()?;
            info!(backend = %profile.backend, model = %prompt.model, "generating");

            let recorder = match &record {
                Some(_) => Some(Arc::new(RecordingTransport::new(config.build_transport()?))),
                None => None,
            };
            let client = match &recorder {
                Some(recorder) => Client::new(profile, recorder.clone()),
                None => config.build_client()?,
            };

            let params = prompt.params();
            if stream {
                let mut chunks = client.generate_content_stream(&params).await?;
                let mut stdout = std::io::stdout();
                while let Some(chunk) = chunks.next().await? {
                    if let Some(text) = chunk.text() {
                        write!(stdout, "{text}")?;
                        stdout.flush()?;
                    }
                }
                println!();
            } else {
                let response = client.generate_content(&params).await?;
                println!("{}", response.text().unwrap_or_default());
                for call in response.function_calls() {
                    let args = call.args.clone().unwrap_or_default();
                    println!("function call: {}({args})", call.name.as_deref().unwrap_or("?"));
                }
            }

            if let (Some(recorder), Some(path)) = (recorder, record) {
                recorder.save(&path)?;
                info!(path = %path.display(), "recorded session");
            }
        }
    }

    Ok(())
}
