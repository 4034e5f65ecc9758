use crate::{
    annotations::AnnotationFormat,
    domain::{DocColors, Rgba},
    file_util::{self, DEFAULT_HOMEDIR},
    result::{to_vn, to_vn_kind, ErrorKind, VnResult},
    session::EnvPaths,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CFG_DEFAULT: &str = r#"
    dataset = "jester"
    anno_format = "PascalVoc"  # "PascalVoc" or "LabelFile"
    auto_save = false
    single_class = false
    fallback_to_previous_annotation = false
    line_color = [0, 255, 0, 128]
    fill_color = [255, 0, 0, 128]
    recent_files = []
    # results_folder =
    # save_dir =
    # identities_file =
    # predefined_classes_file =

    [log]
    level = "Info"  # "Error", "Warn", "Info", "Debug", or "Trace"
    file_prefix = "vanno"
    "#;

pub const MAX_RECENT_FILES: usize = 7;

pub fn get_default_cfg() -> Cfg {
    toml::from_str(CFG_DEFAULT).expect("default config broken")
}

pub fn get_cfg_path() -> PathBuf {
    DEFAULT_HOMEDIR.join("vanno_cfg.toml")
}

pub fn get_log_folder() -> PathBuf {
    DEFAULT_HOMEDIR.join("logs")
}

pub fn read_cfg_from(cfg_toml_path: &Path) -> VnResult<Cfg> {
    if cfg_toml_path.exists() {
        let toml_str = file_util::read_to_string(cfg_toml_path)?;
        toml::from_str(&toml_str).map_err(to_vn_kind(ErrorKind::InvalidFormat))
    } else {
        Ok(get_default_cfg())
    }
}

pub fn get_cfg() -> VnResult<Cfg> {
    read_cfg_from(&get_cfg_path())
}

pub fn write_cfg_to(cfg: &Cfg, cfg_toml_path: &Path) -> VnResult<()> {
    let cfg_str = toml::to_string_pretty(cfg).map_err(to_vn)?;
    file_util::write_atomic(cfg_toml_path, cfg_str)
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_log_file_prefix() -> String {
    "vanno".to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LogCfg {
    #[serde(default)]
    pub level: LogLevel,
    /// Log files are named `<file_prefix>.<date>` inside the log folder.
    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}
impl Default for LogCfg {
    fn default() -> Self {
        LogCfg {
            level: LogLevel::default(),
            file_prefix: default_log_file_prefix(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    /// Name of the dataset, determines the result and environment folders.
    pub dataset: String,
    /// Parent of all results, defaults to `~/.vanno/results`.
    pub results_folder: Option<String>,
    /// Where annotation files go. Defaults to `<results_folder>/<dataset>`.
    pub save_dir: Option<String>,
    pub anno_format: AnnotationFormat,
    pub auto_save: bool,
    pub single_class: bool,
    /// Try the annotation of the previously opened image if the current one has none.
    pub fallback_to_previous_annotation: bool,
    pub line_color: Rgba,
    pub fill_color: Rgba,
    #[serde(default)]
    pub recent_files: Vec<String>,
    pub last_open_dir: Option<String>,
    pub identities_file: Option<String>,
    pub predefined_classes_file: Option<String>,
    #[serde(default)]
    pub log: LogCfg,
}

impl Default for Cfg {
    fn default() -> Self {
        get_default_cfg()
    }
}

impl Cfg {
    pub fn results_folder(&self) -> PathBuf {
        match &self.results_folder {
            Some(rf) => PathBuf::from(rf),
            None => DEFAULT_HOMEDIR.join("results"),
        }
    }

    pub fn results_dir(&self) -> PathBuf {
        self.results_folder().join(&self.dataset)
    }

    pub fn env_folder(&self) -> PathBuf {
        self.results_folder().join(format!("{}_env", self.dataset))
    }

    pub fn save_dir(&self) -> PathBuf {
        match &self.save_dir {
            Some(sd) => PathBuf::from(sd),
            None => self.results_dir(),
        }
    }

    pub fn identities_file(&self) -> PathBuf {
        match &self.identities_file {
            Some(f) => PathBuf::from(f),
            None => self.env_folder().join("ids.txt"),
        }
    }

    pub fn doc_colors(&self) -> DocColors {
        DocColors {
            line_color: self.line_color,
            fill_color: self.fill_color,
        }
    }

    pub fn set_doc_colors(&mut self, colors: DocColors) {
        self.line_color = colors.line_color;
        self.fill_color = colors.fill_color;
    }

    pub fn env_paths(&self) -> EnvPaths {
        EnvPaths::new(self.env_folder(), self.results_dir(), self.identities_file())
    }

    /// Most recent first, without duplicates, at most [`MAX_RECENT_FILES`](MAX_RECENT_FILES).
    pub fn add_recent_file(&mut self, file_path: &str) {
        if let Some(idx) = self.recent_files.iter().position(|f| f == file_path) {
            self.recent_files.remove(idx);
        } else if self.recent_files.len() >= MAX_RECENT_FILES {
            self.recent_files.pop();
        }
        self.recent_files.insert(0, file_path.to_string());
    }
}

#[test]
fn test_default_cfg() {
    let cfg = get_default_cfg();
    assert_eq!(cfg.dataset, "jester");
    assert_eq!(cfg.anno_format, AnnotationFormat::PascalVoc);
    assert_eq!(cfg.doc_colors(), DocColors::default());
    assert_eq!(cfg.log, LogCfg::default());
    assert!(cfg.env_folder().ends_with("jester_env"));
    assert_eq!(cfg.save_dir(), cfg.results_dir());
}

#[test]
fn test_recent_files() {
    let mut cfg = get_default_cfg();
    for i in 0..10 {
        cfg.add_recent_file(&format!("{i}.png"));
    }
    assert_eq!(cfg.recent_files.len(), MAX_RECENT_FILES);
    assert_eq!(cfg.recent_files[0], "9.png");
    cfg.add_recent_file("5.png");
    assert_eq!(cfg.recent_files[0], "5.png");
    assert_eq!(cfg.recent_files.len(), MAX_RECENT_FILES);
    assert_eq!(cfg.recent_files.iter().filter(|f| *f == "5.png").count(), 1);
}

#[test]
fn test_cfg_roundtrip() {
    use crate::defer_folder_removal;
    let folder = file_util::DEFAULT_TMPDIR.join(format!("cfg_{}", uuid::Uuid::new_v4()));
    defer_folder_removal!(&folder);
    let path = folder.join("cfg.toml");
    let mut cfg = get_default_cfg();
    cfg.save_dir = Some("/some/where".to_string());
    cfg.anno_format = AnnotationFormat::LabelFile;
    write_cfg_to(&cfg, &path).unwrap();
    assert_eq!(read_cfg_from(&path).unwrap(), cfg);
}

#[test]
fn test_log_cfg() {
    let mut cfg: Cfg = toml::from_str(
        r#"
        dataset = "d"
        anno_format = "LabelFile"
        auto_save = true
        single_class = false
        fallback_to_previous_annotation = false
        line_color = [1, 2, 3, 4]
        fill_color = [5, 6, 7, 8]
        "#,
    )
    .unwrap();
    assert_eq!(cfg.log, LogCfg::default());
    assert_eq!(cfg.doc_colors().fill_color, Rgba::new(5, 6, 7, 8));
    cfg.log.level = LogLevel::Debug;
    cfg.log.file_prefix = "review".to_string();
    let read: Cfg = toml::from_str(&toml::to_string_pretty(&cfg).unwrap()).unwrap();
    assert_eq!(read, cfg);
    let partial: Cfg = toml::from_str(
        r#"
        dataset = "d"
        anno_format = "PascalVoc"
        auto_save = false
        single_class = true
        fallback_to_previous_annotation = false
        line_color = [1, 2, 3, 4]
        fill_color = [5, 6, 7, 8]
        [log]
        level = "Warn"
        "#,
    )
    .unwrap();
    assert_eq!(partial.log.level, LogLevel::Warn);
    assert_eq!(partial.log.file_prefix, "vanno");
}
