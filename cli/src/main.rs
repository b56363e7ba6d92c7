mod atomic_write;
mod config;
mod generate;
mod logging;
mod paths;
mod settings;

use std::io::Read as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::CommandFactory;
use clap::FromArgMatches;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use supports_color::Stream;
use writeup_client::WriteupClient;
use writeup_protocol::wire::ExportFormat;
use writeup_tui::ExitReason;

use crate::config::ConfigStore;
use crate::config::FileConfig;
use crate::generate::GenerateJob;
use crate::logging::LogTarget;
use crate::settings::SettingOverrides;
use crate::settings::Settings;
use crate::settings::user_agent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
enum CliExport {
    /// Zip archive with the markdown and its images.
    Zip,
    Docx,
}

impl CliExport {
    fn as_format(self) -> ExportFormat {
        match self {
            CliExport::Zip => ExportFormat::Package,
            CliExport::Docx => ExportFormat::Docx,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Draft CTF writeups from a prompt, screenshots, and code snippets"
)]
struct Cli {
    /// Base URL of the writeup service.
    #[arg(long = "server", env = "WRITEUP_SERVER_URL", value_name = "URL", global = true)]
    server: Option<String>,

    /// Challenge category sent with each generation.
    #[arg(long, env = "WRITEUP_CATEGORY", value_name = "NAME", global = true)]
    category: Option<String>,

    /// Directory exports are saved into.
    #[arg(long, env = "WRITEUP_DOWNLOAD_DIR", value_name = "DIR", global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

impl Cli {
    fn overrides(&self) -> SettingOverrides {
        SettingOverrides {
            server_url: self.server.clone(),
            category: self.category.clone(),
            download_dir: self.download_dir.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Generate one writeup without the interactive screen.
    Generate(GenerateArgs),
    /// Check that the writeup service is reachable.
    Ping,
    /// Edit `~/.writeup/config.toml`.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Prompt text; may reference `[[imgN]]` and `[[codeN]]` tokens.
    #[arg(long, conflicts_with = "prompt_file", required_unless_present = "prompt_file")]
    prompt: Option<String>,

    /// Read the prompt from a file (`-` for stdin).
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,

    /// Attach an image; the Nth `--image` becomes `[[imgN]]`.
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// Attach a code file; the Nth `--code` becomes `[[codeN]]`.
    #[arg(long = "code", value_name = "PATH")]
    code: Vec<PathBuf>,

    /// Append every attachment token to the end of the prompt.
    #[arg(long)]
    append_placeholders: bool,

    /// Write the markdown here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Save an export of the result; repeat for both formats.
    #[arg(long = "export", value_enum, value_name = "FORMAT")]
    exports: Vec<CliExport>,
}

impl GenerateArgs {
    fn into_job(self, settings: &Settings) -> anyhow::Result<GenerateJob> {
        let prompt = match (self.prompt, self.prompt_file) {
            (Some(prompt), _) => prompt,
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut prompt = String::new();
                std::io::stdin()
                    .read_to_string(&mut prompt)
                    .context("read prompt from stdin")?;
                prompt
            }
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("read prompt file {}", path.display()))?,
            (None, None) => anyhow::bail!("either --prompt or --prompt-file is required"),
        };

        let mut exports: Vec<ExportFormat> = Vec::new();
        for export in self.exports {
            let format = export.as_format();
            if !exports.contains(&format) {
                exports.push(format);
            }
        }

        Ok(GenerateJob {
            prompt,
            images: self.images,
            code: self.code,
            append_placeholders: self.append_placeholders,
            category: settings.category.clone(),
            output: self.output,
            exports,
            download_dir: settings.download_dir.clone(),
        })
    }
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Persist the service URL.
    SetServer { url: String },
    /// Persist the default category.
    SetCategory { name: String },
    /// Persist the export directory.
    SetDownloadDir { dir: PathBuf },
    /// Print the effective settings and where they come from.
    Show,
}

fn parse_cli() -> Cli {
    let matches = Cli::command()
        .version(writeup_tui::WRITEUP_VERSION)
        .get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = parse_cli();
    let target = if cli.command.is_none() {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    if let Err(err) = logging::init_logging(target) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    if let Err(err) = run(cli).await {
        tracing::error!("{err:#}");
        eprintln!("{}", render_error(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = ConfigStore::new_default();
    let overrides = cli.overrides();

    if let Some(CliCommand::Config { action }) = cli.command {
        return run_config(&store?, action, overrides);
    }

    let settings = Settings::resolve(
        overrides,
        load_file_config(store.ok().as_ref()),
        paths::default_download_dir,
    );
    let client = WriteupClient::new(&settings.server_url, &user_agent())
        .map_err(|err| anyhow::anyhow!(err.user_message()))?;
    tracing::info!(server = %client.base_url(), category = %settings.category, "starting");

    match cli.command {
        None => {
            let exit_info = writeup_tui::run_app(settings.app_config(), client).await?;
            if exit_info.exit_reason == ExitReason::InputClosed {
                tracing::warn!("terminal input closed");
            }
            if let Some(session) = exit_info.session {
                tracing::info!(session = %session.session_id, "exited with an active session");
            }
            Ok(())
        }
        Some(CliCommand::Generate(args)) => {
            let job = args.into_job(&settings)?;
            generate::run_generate(&client, &job, &mut std::io::stdout(), &mut std::io::stderr())
                .await?;
            Ok(())
        }
        Some(CliCommand::Ping) => {
            let banner = client
                .ping()
                .await
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("{} is up: {banner}", client.base_url());
            Ok(())
        }
        Some(CliCommand::Config { .. }) => Ok(()),
    }
}

fn load_file_config(store: Option<&ConfigStore>) -> FileConfig {
    let Some(store) = store else {
        return FileConfig::default();
    };
    store.load().unwrap_or_else(|err| {
        tracing::warn!("ignoring {}: {err:#}", store.path().display());
        FileConfig::default()
    })
}

fn run_config(
    store: &ConfigStore,
    action: ConfigAction,
    overrides: SettingOverrides,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::SetServer { url } => {
            WriteupClient::new(&url, &user_agent())
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            store.set_string(config::SERVER_URL_KEY, url.trim())?;
        }
        ConfigAction::SetCategory { name } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("category must not be empty");
            }
            store.set_string(config::DEFAULT_CATEGORY_KEY, name)?;
        }
        ConfigAction::SetDownloadDir { dir } => {
            let Some(dir) = dir.to_str() else {
                anyhow::bail!("download directory must be valid UTF-8");
            };
            store.set_string(config::DOWNLOAD_DIR_KEY, dir)?;
        }
        ConfigAction::Show => {
            let settings =
                Settings::resolve(overrides, store.load()?, paths::default_download_dir);
            println!("config:       {}", paths::display_with_tilde(store.path()));
            println!("server_url:   {}", settings.server_url);
            println!("category:     {}", settings.category);
            println!(
                "download_dir: {}",
                paths::display_with_tilde(&settings.download_dir)
            );
            return Ok(());
        }
    }
    println!("Updated {}", paths::display_with_tilde(store.path()));
    Ok(())
}

fn render_error(err: &anyhow::Error) -> String {
    let text = format!("{err:#}");
    if supports_color::on_cached(Stream::Stderr).is_some() {
        ansi_red(&text)
    } else {
        text
    }
}

fn ansi_red(text: &str) -> String {
    format!("\u{1b}[31m{text}\u{1b}[0m")
}
