#![deny(clippy::all)]
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, warn};
use vannolib::{
    annotations::{self, AnnotationFormat},
    cfg::{self, Cfg},
    control::{Control, Nav, Prompt},
    image_scan,
    result::{to_vn, trace_ok_err, VnResult},
    session::{stats_log, Checklist, JobAssignment},
    tracing_setup, vnerr,
};

/// Answers no to every question since there is nobody to ask.
struct CliPrompt;
impl Prompt for CliPrompt {
    fn discard_changes(&mut self, image_path: &str) -> bool {
        warn!("keeping unsaved changes of {image_path}");
        false
    }
    fn warn(&mut self, title: &str, msg: &str) {
        warn!("{title}: {msg}");
    }
    fn error(&mut self, title: &str, msg: &str) {
        error!("{title}: {msg}");
    }
    fn pick_save_dir(&mut self) -> Option<PathBuf> {
        None
    }
}

#[derive(Parser)]
#[command(version, about = "Review sessions and annotation files of image datasets")]
struct Cli {
    /// Config file, defaults to `~/.vanno/vanno_cfg.toml`
    #[arg(long)]
    cfg: Option<PathBuf>,
    /// Overrides the dataset of the config
    #[arg(long)]
    dataset: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the config to its file, creating it with defaults if it does not exist
    Init,
    /// List all supported images below a folder
    Scan { dir: PathBuf },
    /// List the numeric sub folders of a folder
    Dirs { dir: PathBuf },
    /// List the sessions assigned to an identity
    Sessions {
        #[arg(long)]
        id: String,
    },
    /// List the folders of a session and whether they are done
    Folders {
        #[arg(long)]
        id: String,
        #[arg(long)]
        session: usize,
    },
    /// Toggle folders of a session and persist the checklist
    Check {
        #[arg(long)]
        id: String,
        #[arg(long)]
        session: usize,
        #[arg(required = true)]
        folders: Vec<String>,
    },
    /// Print the statistics log
    Stats,
    /// Print an annotation file as json
    Show { annotation: PathBuf },
    /// Convert between Pascal VOC and label files, formats follow the extensions
    Convert { input: PathBuf, output: PathBuf },
}

fn read_cfg(cli: &Cli) -> VnResult<Cfg> {
    let mut cfg = match &cli.cfg {
        Some(p) => cfg::read_cfg_from(p)?,
        None => cfg::get_cfg()?,
    };
    if let Some(dataset) = &cli.dataset {
        cfg.dataset = dataset.clone();
    }
    Ok(cfg)
}

fn run(cli: Cli, cfg: Cfg) -> VnResult<()> {
    let env = cfg.env_paths();
    match cli.command {
        Command::Init => {
            let cfg_path = cli.cfg.unwrap_or_else(cfg::get_cfg_path);
            cfg::write_cfg_to(&cfg, &cfg_path)?;
            println!("{cfg_path:?}");
        }
        Command::Scan { dir } => {
            for p in image_scan::scan_images(dir)? {
                println!("{p}");
            }
        }
        Command::Dirs { dir } => {
            for d in image_scan::scan_dirs(dir)? {
                println!("{d}");
            }
        }
        Command::Sessions { id } => {
            let jobs = JobAssignment::load(env.job_assign())?;
            for session in 1..=jobs.session_count(&id)? {
                println!("{session:02}: {}", jobs.folders_for(&id, session)?.join(", "));
            }
        }
        Command::Folders { id, session } => {
            let jobs = JobAssignment::load(env.job_assign())?;
            let checklist = Checklist::open(&env, &jobs, &id, session)?;
            for (name, folder_id) in checklist.folders().iter().zip(checklist.folder_ids()) {
                let mark = if checklist.is_done(*folder_id) { "x" } else { " " };
                println!("[{mark}] {name}");
            }
            println!("{}/{}", checklist.n_done(), checklist.n_total());
        }
        Command::Check {
            id,
            session,
            folders,
        } => {
            let mut ctrl = Control::new(cfg)?;
            let mut prompt = CliPrompt;
            if let Nav::Aborted(reason) = ctrl.open_session(&id, session, &mut prompt)? {
                return Err(vnerr!("could not open session due to {:?}", reason));
            }
            for folder in &folders {
                let done = ctrl.toggle_folder(session, folder)?;
                println!("{folder}: {}", if done { "done" } else { "open" });
            }
            println!("{}", ctrl.persist_checklist()?);
        }
        Command::Stats => {
            for line in stats_log::read_all(env.statistics())? {
                println!("{line}");
            }
        }
        Command::Show { annotation } => {
            let record = annotations::load(&annotation, annotations::format_of(&annotation))?;
            println!("{}", serde_json::to_string_pretty(&record).map_err(to_vn)?);
        }
        Command::Convert { input, output } => {
            let (record, colors) = match annotations::format_of(&input) {
                AnnotationFormat::LabelFile => {
                    let label_file = annotations::load_label_file(&input)?;
                    let colors = label_file.colors.unwrap_or_else(|| cfg.doc_colors());
                    (label_file.record, colors)
                }
                format => (annotations::load(&input, format)?, cfg.doc_colors()),
            };
            annotations::save_with_colors(&output, &record, annotations::format_of(&output), colors)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let cfg = read_cfg(&cli);
    let log_cfg = cfg.as_ref().map(|cfg| cfg.log.clone()).unwrap_or_default();
    let _guard_flush_to_logfile = tracing_setup::tracing_setup(&log_cfg);
    if trace_ok_err(cfg.and_then(|cfg| run(cli, cfg))).is_none() {
        std::process::exit(1);
    }
}
