//! Multi-file orchestration: every configured file finishes a stage before
//! any file starts the next one.

use std::io;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::grf::config::{format_grfid, GrfConfig, GrfConfigFlags, GrfStatus, LoaderConfig};
use crate::grf::context::LoadContext;
use crate::grf::finalise::{finalise, StringRemap};
use crate::grf::pipeline;
use crate::grf::stage::LoadingStage;
use crate::host::{GrfStringTable, RecordingSpriteCache, SpriteCache, StringTable};

/// Where file contents come from.
pub trait FileSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl FileSource for DiskSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

pub struct Loader {
    ctx: LoadContext,
    source: Box<dyn FileSource>,
    remap: StringRemap,
    /// Registry index of each config, assigned during the label scan
    file_index: Vec<Option<usize>>,
}

impl Loader {
    pub fn new(config: &LoaderConfig, sprites: Box<dyn SpriteCache>, strings: Box<dyn StringTable>) -> Self {
        let mut ctx = LoadContext::new(config.environment.clone(), config.sprite_base, sprites, strings);
        ctx.configs = config.files.iter().map(|entry| entry.to_config()).collect();
        Self { ctx, source: Box::new(DiskSource), remap: StringRemap::default(), file_index: Vec::new() }
    }

    pub fn with_source(mut self, source: Box<dyn FileSource>) -> Self {
        self.source = source;
        self
    }

    pub fn configs(&self) -> &[GrfConfig] {
        &self.ctx.configs
    }

    pub fn context(&self) -> &LoadContext {
        &self.ctx
    }

    pub fn into_context(self) -> LoadContext {
        self.ctx
    }

    /// Text ids resolved by the last finished load.
    pub fn string_remap(&self) -> &StringRemap {
        &self.remap
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.source.read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound { path: path.to_string() },
            _ => Error::Io(format!("{path}: {e}")),
        })
    }

    /// Identify a file without loading it: its info block, checksum and
    /// whether it uses actions unsafe for static content.
    pub fn scan_file(&self, path: &str) -> Result<GrfConfig> {
        let data = self.read_file(path)?;
        scan_data(GrfConfig::new(path), &self.ctx, &data)
    }

    /// Run a full load session over the configured files.
    pub fn load(&mut self) {
        self.begin_session();
        self.fill_details();

        for stage in LoadingStage::LOAD {
            self.ctx.stage = stage;
            self.ctx.spriteid = self.ctx.sprite_base;
            for config in &mut self.ctx.configs {
                if config.status == GrfStatus::Activated {
                    config.status = GrfStatus::Initialised;
                }
            }
            for index in 0..self.ctx.configs.len() {
                self.run_stage(index);
            }
            debug!(%stage, next_image = self.ctx.spriteid, "stage finished");
        }

        self.remap = finalise(&mut self.ctx);
        let activated = self.ctx.configs.iter().filter(|c| c.status == GrfStatus::Activated).count();
        info!(files = self.ctx.configs.len(), activated, "load session finished");
    }

    fn begin_session(&mut self) {
        let ctx = &mut self.ctx;
        ctx.tables.reset();
        ctx.grm.reset();
        ctx.bindings.reset();
        ctx.registry.begin_session();
        ctx.misc_features = Default::default();
        for config in &mut ctx.configs {
            config.flags.remove(GrfConfigFlags::RESERVED);
            if config.status != GrfStatus::NotFound {
                config.status = GrfStatus::Unknown;
                config.error = None;
            }
        }
        self.file_index = vec![None; ctx.configs.len()];
        self.remap = StringRemap::default();
    }

    /// Scan configs whose identity is not known yet, so files can find each
    /// other by grfid.
    fn fill_details(&mut self) {
        for index in 0..self.ctx.configs.len() {
            if self.ctx.configs[index].ident.grfid != 0 {
                continue;
            }
            let config = self.ctx.configs[index].clone();
            let scanned = self.read_file(&config.filename).and_then(|data| scan_data(config, &self.ctx, &data));
            match scanned {
                Ok(scanned) => self.ctx.configs[index] = scanned,
                // reported when the load reaches it
                Err(e) => debug!(file = %self.ctx.configs[index].filename, error = %e, "could not scan file"),
            }
        }
        for config in &mut self.ctx.configs {
            if config.flags.contains(GrfConfigFlags::INVALID) && config.is_usable() {
                warn!(file = %config.filename, version = config.version, "unsupported format version, disabling");
                config.disable(None);
            }
        }
    }

    fn run_stage(&mut self, index: usize) {
        let stage = self.ctx.stage;
        let config = &self.ctx.configs[index];
        if !config.is_usable() {
            return;
        }
        if stage > LoadingStage::Init && config.flags.contains(GrfConfigFlags::INIT_ONLY) {
            return;
        }
        let filename = config.filename.clone();
        let data = match self.read_file(&filename) {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %filename, error = %e, "file not found");
                self.ctx.configs[index].status = GrfStatus::NotFound;
                return;
            }
        };

        if stage == LoadingStage::LabelScan {
            let grfid = self.ctx.configs[index].ident.grfid;
            self.file_index[index] = Some(self.ctx.registry.init_file(&filename, grfid));
        }
        let Some(file) = self.file_index[index] else {
            warn!(file = %filename, %stage, "file missed the label scan, skipping");
            return;
        };

        let config = &self.ctx.configs[index];
        let runs = match stage {
            LoadingStage::Reserve => config.status == GrfStatus::Initialised,
            LoadingStage::Activation => config.flags.contains(GrfConfigFlags::RESERVED),
            _ => true,
        };
        if runs {
            let params = config.params.clone();
            self.ctx.registry[file].reset_params(&params);
            self.ctx.begin_file(index, file);
            if let Err(e) = pipeline::load_file(&mut self.ctx, &data) {
                warn!(file = %filename, error = %e, "unreadable file");
                self.ctx.configs[index].disable(None);
            }
        }

        let init_only = self.ctx.configs[index].flags.contains(GrfConfigFlags::INIT_ONLY);
        match stage {
            LoadingStage::Reserve => self.ctx.configs[index].flags |= GrfConfigFlags::RESERVED,
            LoadingStage::Activation => {
                self.ctx.configs[index].flags.remove(GrfConfigFlags::RESERVED);
                let tables = &self.ctx.tables;
                let file = &mut self.ctx.registry[file];
                file.clear_temporary();
                file.build_cargo_map(tables);
            }
            LoadingStage::Init if init_only => self.ctx.registry[file].clear_temporary(),
            _ => {}
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(&LoaderConfig::default(), Box::new(RecordingSpriteCache::new()), Box::new(GrfStringTable::new()))
    }
}

/// File scan then safety scan over `data`, in a scratch context so nothing
/// leaks into the session.
fn scan_data(mut config: GrfConfig, session: &LoadContext, data: &[u8]) -> Result<GrfConfig> {
    config.ident.checksum = crc32fast::hash(data);
    let params = config.params.clone();
    let filename = config.filename.clone();

    let mut ctx = LoadContext::new(
        session.env.clone(),
        session.sprite_base,
        Box::new(RecordingSpriteCache::new()),
        Box::new(GrfStringTable::new()),
    );
    ctx.configs.push(config);
    let file = ctx.registry.init_file(&filename, 0);

    for stage in [LoadingStage::FileScan, LoadingStage::SafetyScan] {
        ctx.stage = stage;
        ctx.registry[file].reset_params(&params);
        ctx.begin_file(0, file);
        pipeline::load_file(&mut ctx, data)?;
    }

    let mut config = ctx.configs.swap_remove(0);
    config.status = GrfStatus::Unknown;
    debug!(
        file = %filename,
        grfid = %format_grfid(config.ident.grfid),
        checksum = format_args!("{:08x}", config.ident.checksum),
        flags = ?config.flags,
        "scanned"
    );
    Ok(config)
}
