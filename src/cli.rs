use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AssistConfig;
use crate::dom::{parse_selector, HostDocument};
use crate::generation::HttpReplyGenerator;
use crate::locator::CandidateList;
use crate::notice::{DesktopNotices, FanoutNotices, LogNotices, NoticeSink, RecordingNotices};
use crate::session::AssistSession;

/// Compose Assist - replay saved webmail pages through the reply augmentation engine
#[derive(Parser)]
#[command(name = "compose-assist")]
#[command(about = "Diagnose and replay the compose reply augmentation engine against saved pages")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the generation endpoint
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which candidate pattern of each list matches a saved page
    Inspect(InspectArgs),

    /// Inject the control into a saved page, activate it once and report
    Reply(ReplyArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Saved host page (HTML)
    pub page: PathBuf,
}

#[derive(Args)]
pub struct ReplyArgs {
    /// Saved host page (HTML)
    pub page: PathBuf,

    /// Write the resulting document here
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// CLI command handler
pub struct CliHandler {
    config: AssistConfig,
}

impl CliHandler {
    /// Create a handler from the global flags
    pub async fn new(cli: &Cli) -> Result<Self> {
        let mut config = AssistConfig::load(cli.config.as_deref()).await?;
        if let Some(endpoint) = &cli.endpoint {
            config.endpoint = endpoint.clone();
        }
        config.validate()?;
        Ok(Self { config })
    }

    /// Handle CLI commands
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Inspect(args) => self.handle_inspect(args).await,
            Commands::Reply(args) => self.handle_reply(args).await,
            Commands::Config => self.handle_config(),
        }
    }

    async fn handle_inspect(&self, args: InspectArgs) -> Result<()> {
        let doc = load_page(&args.page).await?;
        let selectors = &self.config.selectors;

        println!("🔍 Candidate report for {}", args.page.display());
        println!("==============================\n");

        report_candidates(&doc, "Toolbar anchor", &CandidateList::parse(&selectors.toolbar)?);
        report_candidates(&doc, "Email content", &CandidateList::parse(&selectors.content)?);

        let surface = parse_selector(&selectors.edit_surface)?;
        match doc.query_first(&surface) {
            Some(_) => println!("✅ Edit surface: {}", selectors.edit_surface),
            None => println!("❌ Edit surface: {} (not found)", selectors.edit_surface),
        }

        let signal = parse_selector(&selectors.compose_signal)?;
        println!(
            "   Compose signal matches: {}",
            doc.query_all(&signal).len()
        );

        if let Some(text) = CandidateList::parse(&selectors.content)?.locate_text(&doc) {
            let preview: String = text.chars().take(120).collect();
            println!("\n   Content preview: {}", preview);
        }
        Ok(())
    }

    async fn handle_reply(&self, args: ReplyArgs) -> Result<()> {
        let doc = load_page(&args.page).await?;
        let recorded = RecordingNotices::new();
        let mut notices = FanoutNotices::new()
            .with(Arc::new(LogNotices))
            .with(Arc::new(recorded.clone()));
        if self.config.notices.desktop {
            notices = notices.with(Arc::new(DesktopNotices::new("compose-assist")));
        }
        let notices: Arc<dyn NoticeSink> = Arc::new(notices);

        let generator = Arc::new(HttpReplyGenerator::from_config(&self.config));
        println!("✉️  Requesting reply from {}", generator.endpoint());

        let mut session = AssistSession::new(doc, &self.config, generator, notices)?;
        if session.inject_now().is_none() {
            return Err(anyhow!(
                "No toolbar anchor matched; run `compose-assist inspect` on the page"
            ));
        }

        let handle = session.handle();
        handle.activate();
        handle.shutdown();
        let report = session.run().await;

        println!("\n📊 Result");
        println!("=========");
        println!("   Replies inserted:    {}", report.stats.replies_inserted);
        println!("   Generation failures: {}", report.stats.generation_failures);
        println!("   Surface misses:      {}", report.stats.surface_misses);
        for notice in recorded.notices() {
            println!("   ⚠️  {}: {}", notice.title, notice.message);
        }

        let surface = parse_selector(&self.config.selectors.edit_surface)?;
        if let Some(text) = report
            .document
            .query_first(&surface)
            .and_then(|id| report.document.text_content(id))
        {
            println!("\n{}", text);
        }

        if let Some(out) = args.out {
            tokio::fs::write(&out, report.document.html()).await?;
            println!("\n💾 Wrote {}", out.display());
        }
        Ok(())
    }

    fn handle_config(&self) -> Result<()> {
        println!("# {}", AssistConfig::config_file_path().display());
        println!("{}", toml::to_string_pretty(&self.config)?);
        Ok(())
    }
}

async fn load_page(path: &Path) -> Result<HostDocument> {
    let markup = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(HostDocument::parse(&markup))
}

fn report_candidates(doc: &HostDocument, title: &str, candidates: &CandidateList) {
    match candidates.locate(doc) {
        Some(found) => {
            let pattern = candidates.patterns().nth(found.index).unwrap_or_default();
            println!("✅ {}: candidate #{} {}", title, found.index + 1, pattern);
        }
        None => println!("❌ {}: none of {} candidates matched", title, candidates.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_command_parses_with_global_flags() {
        let cli = Cli::try_parse_from([
            "compose-assist",
            "config",
            "--endpoint",
            "http://127.0.0.1:9000/api/email/generate",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(
            cli.endpoint.as_deref(),
            Some("http://127.0.0.1:9000/api/email/generate")
        );
    }

    #[test]
    fn test_config_command_prints_endpoint_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio_test::block_on(AssistConfig::default().save_to(&path)).unwrap();

        let cli = Cli::try_parse_from([
            "compose-assist",
            "--config",
            path.to_str().unwrap(),
            "--endpoint",
            "http://127.0.0.1:9000/api/email/generate",
            "config",
        ])
        .unwrap();
        let handler = tokio_test::block_on(CliHandler::new(&cli)).unwrap();

        assert_eq!(handler.config.endpoint, "http://127.0.0.1:9000/api/email/generate");
        assert!(handler.handle_config().is_ok());
    }

    #[test]
    fn test_reply_requires_page() {
        assert!(Cli::try_parse_from(["compose-assist", "reply"]).is_err());
    }
}
