//! Explainer CLI: command-line client for the Explainer API.
//!
//! Set EXPLAINER_API_URL (or API_URL); defaults to http://localhost:8000.

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use explainer_api_client::{ApiClient, AudioFormat, CreateOptions, RepositorySource};
use explainer_cli::{default_audio_output, init_tracing, truncate_string};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "explainer", about = "Repository explainer API CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a repository from a git URL or a local archive
    #[command(group(ArgGroup::new("source").required(true).args(["url", "archive"])))]
    Create {
        /// Remote git URL (https or ssh)
        #[arg(long)]
        url: Option<String>,
        /// Branch to clone (remote only)
        #[arg(long, requires = "url")]
        branch: Option<String>,
        /// Path to a .zip, .tar, .tar.gz or .tgz archive
        #[arg(long)]
        archive: Option<PathBuf>,
        /// Repository id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Wait until ingestion settles
        #[arg(long)]
        wait: bool,
    },
    /// List repositories, newest first
    List {
        /// One line per repository instead of JSON
        #[arg(long)]
        brief: bool,
    },
    /// Get a single repository by id
    Get { id: String },
    /// List the files of a ready repository
    Files {
        id: String,
        /// Only files with this extension (e.g. "rs")
        #[arg(long)]
        extension: Option<String>,
    },
    /// Print the content of a repository file
    Cat {
        id: String,
        /// Path relative to the repository root
        path: String,
    },
    /// Delete a repository and its questions
    Delete { id: String },
    /// Ask a question about a repository
    Ask {
        id: String,
        question: String,
        /// Restrict the context to these paths (repeatable)
        #[arg(long = "context")]
        context: Vec<String>,
        /// Also synthesize the answer: mp3, wav or ogg
        #[arg(long)]
        speak: Option<AudioFormat>,
    },
    /// Explain a standalone source file or snippet
    Explain {
        /// File to explain; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Synthesize speech and save the clip locally
    Speak {
        text: String,
        #[arg(long, default_value = "mp3")]
        format: AudioFormat,
        #[arg(long)]
        voice: Option<String>,
        /// Output file (defaults to ./<audio_id>.<format>)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = ApiClient::from_env()
        .context("Failed to create API client. Set EXPLAINER_API_URL (or API_URL)")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            url,
            branch,
            archive,
            id,
            name,
            description,
            wait,
        } => {
            let source = match (url, archive) {
                (Some(url), _) => RepositorySource::Remote { url, branch },
                (None, Some(archive)) => {
                    RepositorySource::ArchiveFile(archive.to_string_lossy().into_owned())
                }
                (None, None) => anyhow::bail!("Either --url or --archive is required"),
            };
            let options = CreateOptions {
                id,
                name,
                description,
                wait,
            };
            let response = client.create_repository(source, options).await?;
            print_json(&response)?;
        }
        Commands::List { brief } => {
            let repositories = client.list_repositories().await?;
            if brief {
                println!("{:<40} {:<8} {:>7}  NAME", "ID", "STATUS", "FILES");
                for repo in &repositories {
                    println!(
                        "{:<40} {:<8} {:>7}  {}",
                        truncate_string(&repo.id, 40),
                        repo.status.to_string(),
                        repo.file_count,
                        truncate_string(&repo.name, 40)
                    );
                }
            } else {
                print_json(&repositories)?;
            }
        }
        Commands::Get { id } => {
            let response = client.get_repository(&id).await?;
            print_json(&response)?;
        }
        Commands::Files { id, extension } => {
            let response = client.list_files(&id, extension.as_deref()).await?;
            print_json(&response)?;
        }
        Commands::Cat { id, path } => {
            let content = client.read_file(&id, &path).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&content).context("Write file content")?;
            stdout.flush().context("Write file content")?;
        }
        Commands::Delete { id } => {
            let response = client.delete_repository(&id).await?;
            print_json(&response)?;
        }
        Commands::Ask {
            id,
            question,
            context,
            speak,
        } => {
            let response = client.ask(&id, &question, context, speak).await?;
            print_json(&response)?;
        }
        Commands::Explain { file } => {
            let code = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => std::io::read_to_string(std::io::stdin()).context("Read stdin")?,
            };
            let response = client.explain(&code).await?;
            print_json(&response.explanation)?;
        }
        Commands::Speak {
            text,
            format,
            voice,
            output,
        } => {
            let response = client.synthesize(&text, format, voice).await?;
            let audio = client.fetch_audio(response.audio_id).await?;
            let output = output.unwrap_or_else(|| {
                default_audio_output(&response.audio_id.to_string(), format.extension())
            });
            std::fs::write(&output, &audio)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_json(&serde_json::json!({
                "audio_id": response.audio_id,
                "format": response.format,
                "url": response.url,
                "duration_seconds": response.duration_seconds,
                "saved_to": output.display().to_string(),
                "bytes": audio.len(),
            }))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use uuid::Uuid;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn create_requires_a_source() {
        assert!(Cli::try_parse_from(["explainer", "create", "--wait"]).is_err());
        assert!(Cli::try_parse_from([
            "explainer",
            "create",
            "--url",
            "https://example.com/a.git",
            "--archive",
            "a.zip"
        ])
        .is_err());
    }

    #[test]
    fn ask_parses_context_and_speech() {
        let cli = Cli::try_parse_from([
            "explainer",
            "ask",
            "repo",
            "What is this?",
            "--context",
            "src/lib.rs",
            "--context",
            "README.md",
            "--speak",
            "ogg",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask { context, speak, .. } => {
                assert_eq!(context, vec!["src/lib.rs", "README.md"]);
                assert_eq!(speak, Some(AudioFormat::Ogg));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn explain_file_is_optional() {
        match Cli::try_parse_from(["explainer", "explain"]).unwrap().command {
            Commands::Explain { file } => assert!(file.is_none()),
            _ => panic!("expected explain"),
        }
        match Cli::try_parse_from(["explainer", "explain", "src/lib.rs"])
            .unwrap()
            .command
        {
            Commands::Explain { file } => assert_eq!(file, Some(PathBuf::from("src/lib.rs"))),
            _ => panic!("expected explain"),
        }
    }

    #[test]
    fn speak_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["explainer", "speak", "hi", "--format", "flac"]).is_err());
    }

    #[test]
    fn audio_id_is_uuid() {
        let id = Uuid::new_v4();
        assert!(default_audio_output(&id.to_string(), "mp3")
            .to_string_lossy()
            .ends_with(".mp3"));
    }
}
