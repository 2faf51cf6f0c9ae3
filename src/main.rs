use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capfetch::cli::{Cli, Commands};
use capfetch::config::Config;
use capfetch::model::FetchRequest;
use capfetch::pipeline::TranscriptPipeline;
use capfetch::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "capfetch=debug"
    } else {
        "capfetch=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().await?;

    match cli.command {
        Commands::Fetch {
            reference,
            output,
            format,
            language,
            tier,
            session,
            stt,
            client_key,
            timestamps,
        } => {
            let video_id = utils::extract_video_id(&reference)?;
            tracing::info!("Fetching transcript for video {}", video_id);

            let request = FetchRequest {
                video_id,
                language_hint: language,
                tier: tier.into(),
                session_token: session,
                client_key,
                allow_stt: stt,
            };

            let pipeline = TranscriptPipeline::new(config)?;

            match pipeline.fetch(&request).await {
                Ok(response) => match output {
                    Some(path) => {
                        capfetch::output::save_to_file(&response, &path, &format, timestamps)
                            .await?;
                        println!("Transcript saved to: {}", path.display());
                    }
                    None => {
                        capfetch::output::print_to_console(&response, &format, timestamps)?;
                    }
                },
                Err(e) => {
                    eprintln!("{}", capfetch::output::render_error(&e));
                    std::process::exit(1);
                }
            }
        }
        Commands::Strategies => {
            println!("Strategy chain (priority order):");
            for (i, name) in config.strategies.iter().enumerate() {
                println!("  {}. {}", i + 1, name);
            }
            println!("  -. stt (paid-tier fallback, runs after all of the above fail)");
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save().await?;
                println!("Configuration written; edit it to reorder strategies or set the STT bucket.");
            }
        }
    }

    Ok(())
}
