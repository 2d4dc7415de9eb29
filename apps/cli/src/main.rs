use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use markzen_core::{
    table_of_contents, Collaborators, Confirmation, DocumentStats, DocumentStore, FileAction,
    FileFilter, FilePicker, FileSession, LocalStorage, Notice, NoticeLevel, Notifier,
    PickerError, PreformattedRenderer, SessionOutcome, Storage, SystemClock, Workbench,
    WorkbenchEvent, AUTOSAVE_DEBOUNCE,
};
use markzen_core::{AutosavePipeline, ContentSync, ScrollSyncCoordinator};
use markzen_settings::{EditorConfigPatch, Layout, PreferencesStore, Theme};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "MARKZEN_LOG";

#[derive(Parser)]
#[command(
    name = "markzen-cli",
    about = "Command-line companion for the MarkZen markdown editor",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 將 Markdown 匯出為 HTML。 / Export a markdown file as a standalone HTML page.
    Export(ExportArgs),
    /// 顯示文件統計。 / Print word, character, line and paragraph counts.
    Stats(StatsArgs),
    /// 列出文件標題。 / Print the heading outline.
    Outline(OutlineArgs),
    /// 檢視或修改偏好設定。 / Show or change preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
    /// 附加文字並等待自動儲存寫回。 / Append text and wait for autosave to write it back.
    Autosave(AutosaveArgs),
}

#[derive(Args)]
struct ExportArgs {
    input: PathBuf,
    /// 輸出路徑；預設為輸入檔名改為 `.html`。 / Output path; defaults to the input with an `.html` extension.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct StatsArgs {
    input: PathBuf,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OutlineArgs {
    input: PathBuf,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 以 JSON 顯示目前偏好設定。 / Print the current preferences as JSON.
    Show,
    /// 修改偏好設定。 / Change one or more preferences.
    Set(PreferencesSetArgs),
}

#[derive(Args)]
struct PreferencesSetArgs {
    #[arg(long)]
    theme: Option<Theme>,
    #[arg(long)]
    layout: Option<Layout>,
    #[arg(long, value_name = "true|false")]
    scroll_sync: Option<bool>,
    #[arg(long, value_name = "true|false")]
    sidebar: Option<bool>,
    #[arg(long, value_name = "PX")]
    font_size: Option<u32>,
}

#[derive(Args)]
struct AutosaveArgs {
    file: PathBuf,
    /// 要附加的文字。 / Text appended to the end of the document.
    #[arg(long)]
    append: String,
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<()> {
    let Cli { workspace, command } = Cli::parse();
    match command {
        Commands::Export(args) => execute_export(args).await,
        Commands::Stats(args) => execute_stats(args).await,
        Commands::Outline(args) => execute_outline(args).await,
        Commands::Preferences(subcommand) => {
            let workspace_root = resolve_workspace(workspace)?;
            execute_preferences_command(subcommand, &workspace_root)
        }
        Commands::Autosave(args) => execute_autosave(args).await,
    }
}

/// 以命令列參數回答檔案對話框。 / Answers file dialogs from command-line arguments.
struct ArgumentPicker {
    open: Option<PathBuf>,
    save: Option<PathBuf>,
}

#[async_trait]
impl FilePicker for ArgumentPicker {
    async fn pick_open_path(&self, _filters: &[FileFilter]) -> Result<Option<PathBuf>, PickerError> {
        Ok(self.open.clone())
    }

    async fn pick_save_path(
        &self,
        _default_name: &str,
        _filters: &[FileFilter],
    ) -> Result<Option<PathBuf>, PickerError> {
        Ok(self.save.clone())
    }

    async fn pick_directory(&self) -> Result<Option<PathBuf>, PickerError> {
        Err(PickerError("folders cannot be chosen from the command line".into()))
    }
}

/// 命令列沒有互動確認。 / The command line never prompts.
struct NonInteractive;

#[async_trait]
impl Confirmation for NonInteractive {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}

struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
    }
}

fn collaborators(open: Option<PathBuf>, save: Option<PathBuf>) -> Collaborators {
    Collaborators {
        storage: Arc::new(LocalStorage::new()),
        picker: Arc::new(ArgumentPicker { open, save }),
        renderer: Arc::new(PreformattedRenderer),
        confirmation: Arc::new(NonInteractive),
        notifier: Arc::new(LogNotifier),
    }
}

async fn execute_export(args: ExportArgs) -> Result<()> {
    let input = resolve_input_path(&args.input)?;
    let output = match args.output {
        Some(path) => resolve_input_path(&path)?,
        None => input.with_extension("html"),
    };
    let session = FileSession::new(collaborators(Some(input.clone()), Some(output.clone())));
    let mut store = DocumentStore::new();
    session
        .open_file(&mut store)
        .await
        .with_context(|| format!("failed to open {}", input.display()))?;
    let outcome = session
        .export_as_html(&store)
        .await
        .with_context(|| format!("failed to export to {}", output.display()))?;
    if outcome != SessionOutcome::Completed {
        bail!("export of {} was cancelled", input.display());
    }
    println!("Exported {} to {}", input.display(), output.display());
    Ok(())
}

async fn read_document(path: &Path) -> Result<String> {
    let input = resolve_input_path(path)?;
    LocalStorage::new()
        .read_file(&input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))
}

async fn execute_stats(args: StatsArgs) -> Result<()> {
    let text = read_document(&args.input).await?;
    let stats = DocumentStats::of(&text);
    if args.json {
        let value = serde_json::json!({
            "words": stats.words,
            "characters": stats.characters,
            "charactersNoSpaces": stats.characters_no_spaces,
            "lines": stats.lines,
            "paragraphs": stats.paragraphs,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Words: {}", stats.words);
        println!("Characters: {}", stats.characters);
        println!("Characters (no spaces): {}", stats.characters_no_spaces);
        println!("Lines: {}", stats.lines);
        println!("Paragraphs: {}", stats.paragraphs);
    }
    Ok(())
}

async fn execute_outline(args: OutlineArgs) -> Result<()> {
    let text = read_document(&args.input).await?;
    let headings = table_of_contents(&text);
    if headings.is_empty() {
        println!("No headings found.");
        return Ok(());
    }
    for heading in headings {
        let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
        println!("{indent}- {} (#{})", heading.title, heading.anchor);
    }
    Ok(())
}

fn execute_preferences_command(command: PreferencesCommand, workspace_root: &Path) -> Result<()> {
    match command {
        PreferencesCommand::Show => show_preferences(workspace_root),
        PreferencesCommand::Set(args) => set_preferences(args, workspace_root),
    }
}

fn load_preferences(workspace_root: &Path) -> Result<PreferencesStore> {
    let prefs_path = preferences_path(workspace_root);
    PreferencesStore::load(&prefs_path)
        .with_context(|| format!("failed to load preferences from {}", prefs_path.display()))
}

fn show_preferences(workspace_root: &Path) -> Result<()> {
    let store = load_preferences(workspace_root)?;
    println!("{}", serde_json::to_string_pretty(store.preferences())?);
    Ok(())
}

fn set_preferences(args: PreferencesSetArgs, workspace_root: &Path) -> Result<()> {
    let backend = load_preferences(workspace_root)?;
    let prefs_path = backend.path().to_path_buf();
    let mut store = DocumentStore::with_preferences(Box::new(backend));
    let mut changed = false;

    if let Some(theme) = args.theme {
        store.set_theme(theme);
        changed = true;
    }
    if let Some(layout) = args.layout {
        store.set_layout(layout);
        changed = true;
    }
    if let Some(enabled) = args.scroll_sync {
        store.set_scroll_sync(enabled);
        changed = true;
    }
    if let Some(visible) = args.sidebar {
        if store.state().sidebar_visible() != visible {
            store.toggle_sidebar();
        }
        changed = true;
    }
    if let Some(font_size) = args.font_size {
        store.update_editor_config(&EditorConfigPatch {
            font_size: Some(font_size),
            ..EditorConfigPatch::default()
        });
        changed = true;
    }
    if !changed {
        bail!("nothing to change; pass at least one preference flag");
    }

    // 值未變時 store 不一定寫檔，這裡明確寫回整份紀錄。 / The store may skip unchanged values, so write the record explicitly.
    let preferences = store.state().preferences();
    PreferencesStore::new(prefs_path.clone(), preferences.clone())
        .persist()
        .with_context(|| format!("failed to write preferences to {}", prefs_path.display()))?;

    println!("Updated preferences at {}", prefs_path.display());
    println!("{}", serde_json::to_string_pretty(&preferences)?);
    Ok(())
}

async fn execute_autosave(args: AutosaveArgs) -> Result<()> {
    let file = resolve_input_path(&args.file)?;
    let delay = args
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or(AUTOSAVE_DEBOUNCE);
    let mut bench = Workbench::new(
        SystemClock,
        DocumentStore::new(),
        collaborators(Some(file.clone()), None),
    )
    .with_pipelines(
        ContentSync::default(),
        ScrollSyncCoordinator::default(),
        AutosavePipeline::new(delay),
    );

    bench
        .handle(WorkbenchEvent::File(FileAction::Open))
        .await
        .with_context(|| format!("failed to open {}", file.display()))?;
    let edited = format!("{}{}", bench.store().state().content(), args.append);
    bench.handle(WorkbenchEvent::EditorChanged(edited)).await?;

    while let Some(deadline) = bench.next_deadline() {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        let report = bench.tick().await;
        debug!(?report, "tick");
        match report.autosaved {
            Some(true) => {
                println!("Autosaved {}", file.display());
                return Ok(());
            }
            Some(false) => bail!("autosave of {} failed", file.display()),
            None => {}
        }
    }
    bail!("nothing was scheduled for autosave")
}

fn preferences_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".markzen").join("preferences.json")
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
