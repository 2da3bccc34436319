use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use avatarkit_api::{AvatarHttpClient, ImageProbe};
use avatarkit_engine::{AvatarControl, AvatarEvent, AvatarResolver, ProviderChain, ProviderSettings, ResolutionPhase, VisualStyle};
use avatarkit_types::{IdentityHints, ResolvedVisual, Scheme};
use avatarkit_util::{ColorSelector, RandomColorSelector, ResolverSettings, SeededColorSelector, settings::default_settings_path};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "avatarkit", version, about = "Resolve identity hints into an avatar")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve one avatar and print the visual as JSON.
    Resolve(ResolveArgs),
    /// List the provider chain in priority order.
    Providers,
    /// Print the effective resolver settings.
    Settings {
        /// Write the settings file (file values, or defaults) to its default location.
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// JSON file with hints; flags below override its fields.
    #[arg(long, value_name = "PATH")]
    hints: Option<PathBuf>,
    #[arg(long)]
    facebook_id: Option<String>,
    #[arg(long)]
    google_id: Option<String>,
    #[arg(long)]
    skype_id: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Image URL used after every provider; `<size>` is replaced.
    #[arg(long)]
    src: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Text shown when there is no name.
    #[arg(long)]
    value: Option<String>,
    #[arg(long)]
    size: Option<u32>,
    #[arg(long)]
    round: bool,
    /// Initials background; a palette color is chosen otherwise.
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    fg_color: Option<String>,
    /// Fetch each candidate image and move on when it does not load.
    #[arg(long)]
    probe: bool,
    /// Seed for the background color choice.
    #[arg(long)]
    seed: Option<u64>,
    /// Build plain `http:` provider URLs.
    #[arg(long)]
    http: bool,
    /// Double Gravatar sizes for high-density displays.
    #[arg(long)]
    high_density: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Resolve(args) => run_resolve(args).await,
        Command::Providers => {
            for entry in ProviderChain::standard().entries() {
                let mode = if entry.synchronous { "direct" } else { "lookup" };
                println!("{:<10} {:<18} {}", entry.kind.as_str(), format!("{:?}", entry.required_hint), mode);
            }
            Ok(())
        }
        Command::Settings { write } => run_settings(write),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` directives, `info` when unset or invalid.
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn run_settings(write: bool) -> Result<()> {
    let path = default_settings_path();
    if write {
        let stored = ResolverSettings::load_from(&path).context("read avatarkit settings")?;
        stored
            .save_to(&path)
            .with_context(|| format!("write settings file {}", path.display()))?;
        info!(path = %path.display(), "wrote resolver settings");
    }
    let effective = ResolverSettings::load().context("load avatarkit settings")?;
    println!("{}", serde_json::to_string_pretty(&effective)?);
    Ok(())
}

async fn run_resolve(args: ResolveArgs) -> Result<()> {
    let mut settings = ResolverSettings::load().context("load avatarkit settings")?;
    if args.http {
        settings.scheme = Scheme::Http;
    }
    if args.high_density {
        settings.high_density = true;
    }

    let hints = build_hints(&args, &settings)?;
    let mut colors: Box<dyn ColorSelector> = match args.seed {
        Some(seed) => Box::new(SeededColorSelector::new(seed, settings.palette.clone())),
        None => Box::new(RandomColorSelector::new(settings.palette.clone())),
    };

    let client = Arc::new(AvatarHttpClient::new(
        Duration::from_secs(settings.request_timeout_secs),
        settings.user_agent.clone(),
    )?);
    let resolver = AvatarResolver::new(client.clone(), ProviderSettings::from(&settings));

    let visual = if args.probe {
        resolve_with_renderer(&resolver, hints, colors.as_mut(), client.as_ref()).await?
    } else {
        resolver.resolve(&hints, colors.as_mut()).await
    };

    let output = serde_json::json!({
        "visual": visual,
        "style": VisualStyle::for_visual(&visual),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_hints(args: &ResolveArgs, settings: &ResolverSettings) -> Result<IdentityHints> {
    let mut hints = match &args.hints {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read hints file {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parse hints file {}", path.display()))?
        }
        None => IdentityHints {
            target_size_px: settings.default_size_px,
            ..IdentityHints::default()
        },
    };

    let overrides = [
        (&mut hints.facebook_id, &args.facebook_id),
        (&mut hints.google_id, &args.google_id),
        (&mut hints.skype_id, &args.skype_id),
        (&mut hints.email, &args.email),
        (&mut hints.explicit_image_url, &args.src),
        (&mut hints.display_name, &args.name),
        (&mut hints.literal_value, &args.value),
        (&mut hints.background_color, &args.color),
    ];
    for (field, value) in overrides {
        if value.is_some() {
            field.clone_from(value);
        }
    }
    if let Some(size) = args.size {
        hints.target_size_px = size;
    }
    if args.round {
        hints.prefer_round_mask = true;
    }
    if let Some(color) = &args.fg_color {
        hints.foreground_color = color.clone();
    }
    Ok(hints)
}

/// Plays the renderer: probes every image the session proposes and reports
/// failures back until the session settles.
async fn resolve_with_renderer(
    resolver: &AvatarResolver,
    hints: IdentityHints,
    colors: &mut dyn ColorSelector,
    probe: &dyn ImageProbe,
) -> Result<ResolvedVisual> {
    let (control_tx, control_rx) = unbounded_channel();
    let (event_tx, event_rx) = unbounded_channel();
    let cancellation = CancellationToken::new();

    let (session, settled) = tokio::join!(
        resolver.drive(hints, colors, control_rx, event_tx, cancellation.clone()),
        render(event_rx, control_tx, probe),
    );
    session?;
    settled.context("avatar session ended before settling")
}

async fn render(
    mut event_rx: UnboundedReceiver<AvatarEvent>,
    control_tx: UnboundedSender<AvatarControl>,
    probe: &dyn ImageProbe,
) -> Option<ResolvedVisual> {
    while let Some(event) = event_rx.recv().await {
        let (visual, phase) = match event {
            AvatarEvent::LookupStarted { provider, url } => {
                debug!(%provider, %url, "lookup started");
                continue;
            }
            AvatarEvent::VisualChanged { visual, phase } => (visual, phase),
        };

        match (&visual, phase) {
            (ResolvedVisual::Image { url, .. }, _) => match probe.probe(url).await {
                Ok(()) => {
                    let _ = control_tx.send(AvatarControl::Teardown);
                    return Some(visual);
                }
                Err(error) => {
                    info!(%url, error = %error, "image did not load");
                    let _ = control_tx.send(AvatarControl::LoadFailed { url: url.clone() });
                }
            },
            (ResolvedVisual::Initials { .. }, ResolutionPhase::SettledInitials) => {
                let _ = control_tx.send(AvatarControl::Teardown);
                return Some(visual);
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn rust_log_controls_verbosity() {
        temp_env::with_var("RUST_LOG", Some("debug"), || {
            assert_eq!(log_filter().max_level_hint(), Some(LevelFilter::DEBUG));
        });
        temp_env::with_var("RUST_LOG", Some("avatarkit_engine=trace"), || {
            assert_eq!(log_filter().max_level_hint(), Some(LevelFilter::TRACE));
        });
    }

    #[test]
    fn verbosity_defaults_to_info() {
        temp_env::with_var_unset("RUST_LOG", || {
            assert_eq!(log_filter().max_level_hint(), Some(LevelFilter::INFO));
        });
    }

    #[test]
    fn flags_override_hints_file_defaults() {
        let cli = Cli::parse_from(["avatarkit", "resolve", "--email", "ada@example.org", "--size", "64", "--round"]);
        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        let hints = build_hints(&args, &ResolverSettings::default()).expect("hints");
        assert_eq!(hints.email.as_deref(), Some("ada@example.org"));
        assert_eq!(hints.target_size_px, 64);
        assert!(hints.prefer_round_mask);
    }

    #[test]
    fn settings_write_round_trips_through_settings_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        temp_env::with_vars(
            [
                ("AVATARKIT_SETTINGS_PATH", Some(path.to_str().expect("utf8 path"))),
                ("AVATARKIT_SCHEME", None),
                ("AVATARKIT_HIGH_DENSITY", None),
            ],
            || {
                run_settings(true).expect("write settings");
                let stored = ResolverSettings::load_from(&path).expect("reload");
                assert_eq!(stored, ResolverSettings::default());
            },
        );
        assert!(path.exists());
    }
}
