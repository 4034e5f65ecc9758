use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use crate::{
    cfg::{get_default_cfg, Cfg},
    control::Prompt,
    file_util::{self, DEFAULT_TMPDIR},
    result::VnResult,
    vnerr,
};

/// Answers the discard question from a queue, declining once the queue is empty, and records
/// everything else it is told.
#[derive(Clone, Debug, Default)]
pub struct ScriptedPrompt {
    pub discard_answers: VecDeque<bool>,
    pub save_dir: Option<PathBuf>,
    pub n_discard_questions: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn discarding(answers: &[bool]) -> Self {
        ScriptedPrompt {
            discard_answers: answers.iter().copied().collect(),
            ..Default::default()
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn discard_changes(&mut self, _image_path: &str) -> bool {
        self.n_discard_questions += 1;
        self.discard_answers.pop_front().unwrap_or(false)
    }
    fn warn(&mut self, title: &str, msg: &str) {
        self.warnings.push(format!("{title}: {msg}"));
    }
    fn error(&mut self, title: &str, msg: &str) {
        self.errors.push(format!("{title}: {msg}"));
    }
    fn pick_save_dir(&mut self) -> Option<PathBuf> {
        self.save_dir.clone()
    }
}

/// Fresh folder below the temp dir. Remove it with `defer_folder_removal!`.
pub fn make_test_folder(prefix: &str) -> PathBuf {
    DEFAULT_TMPDIR.join(format!("{prefix}_{}", uuid::Uuid::new_v4()))
}

/// Config whose results and environment live inside `folder`.
pub fn make_test_cfg(folder: &Path) -> Cfg {
    let mut cfg = get_default_cfg();
    cfg.results_folder = Some(folder.join("results").to_string_lossy().to_string());
    cfg
}

/// Writes a small gray png or jpg depending on the extension of `path`.
pub fn write_test_image(path: &Path, w: u32, h: u32) -> VnResult<()> {
    if let Some(parent) = path.parent() {
        file_util::create_dir_all(parent)?;
    }
    image::RgbImage::from_pixel(w, h, image::Rgb([128, 128, 128]))
        .save(path)
        .map_err(|e| vnerr!("could not write test image {:?} due to {:?}", path, e))
}

pub struct TestDataset {
    /// Remove this folder after the test.
    pub folder: PathBuf,
    /// Contains one sub folder of images per folder name.
    pub image_root: PathBuf,
    pub cfg: Cfg,
}

/// Creates `n_images` images `img_{i}.png` in every folder and stores `jobs_json` as job
/// assignment of the dataset.
pub fn make_test_dataset(
    prefix: &str,
    jobs_json: &str,
    folders: &[&str],
    n_images: usize,
) -> VnResult<TestDataset> {
    let folder = make_test_folder(prefix);
    let image_root = folder.join("images");
    for f in folders {
        for i in 0..n_images {
            write_test_image(&image_root.join(f).join(format!("img_{i}.png")), 8, 6)?;
        }
    }
    let cfg = make_test_cfg(&folder);
    file_util::write_atomic(cfg.env_paths().job_assign(), jobs_json)?;
    Ok(TestDataset {
        folder,
        image_root,
        cfg,
    })
}
