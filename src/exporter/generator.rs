// file: src/exporter/generator.rs
// description: regenerates the match file and prompt templates from the full store state
// reference: internal artifact generation

use crate::config::OutputConfig;
use crate::database::RecordStore;
use crate::error::{Result, SyncError};
use crate::exporter::{match_file, templates};
use crate::models::{PayloadDefaults, RecordPayload, StoredRecord};
use crate::utils::Validator;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct ArtifactReport {
    pub match_file: PathBuf,
    pub match_entries: usize,
    pub template_dir: Option<PathBuf>,
    pub templates_written: usize,
    /// Point id or filename, with the reason it was left out.
    pub skipped: Vec<(String, SyncError)>,
}

pub struct ArtifactGenerator {
    output: OutputConfig,
    defaults: PayloadDefaults,
}

impl ArtifactGenerator {
    pub fn new(output: OutputConfig, defaults: PayloadDefaults) -> Self {
        Self { output, defaults }
    }

    /// Output directories must already exist.
    pub fn validate_targets(&self) -> Result<()> {
        Validator::validate_output_directory(&self.output.match_dir, "Match file")?;
        if let Some(dir) = &self.output.template_dir {
            Validator::validate_output_directory(dir, "Template")?;
        }
        Ok(())
    }

    /// Rewrites every artifact from the complete store contents.
    pub async fn regenerate(&self, store: &dyn RecordStore) -> Result<ArtifactReport> {
        self.validate_targets()?;

        let records = store.list_records().await?;
        let mut report = ArtifactReport {
            match_file: self.output.match_file_path(),
            template_dir: self.output.template_dir.clone(),
            ..ArtifactReport::default()
        };
        let payloads = self.collect_payloads(&records, &mut report);

        write_atomic(&report.match_file, &match_file::render(&payloads)?)?;
        report.match_entries = payloads.len();
        info!(
            "Wrote {} entries to {}",
            report.match_entries,
            report.match_file.display()
        );

        if let Some(dir) = &self.output.template_dir {
            report.templates_written = self.write_templates(dir, &payloads, &mut report.skipped)?;
            info!(
                "Wrote {} templates to {}",
                report.templates_written,
                dir.display()
            );
        }

        Ok(report)
    }

    /// One payload per filename (first in store order), sorted by filename.
    fn collect_payloads(
        &self,
        records: &[StoredRecord],
        report: &mut ArtifactReport,
    ) -> Vec<RecordPayload> {
        let mut seen = HashSet::new();
        let mut payloads = Vec::new();

        for record in records {
            match record.payload.complete(&self.defaults) {
                Ok((payload, _)) => {
                    if seen.insert(payload.filename.clone()) {
                        payloads.push(payload);
                    } else {
                        debug!("Ignoring duplicate point {} for {}", record.id, payload.filename);
                    }
                }
                Err(e) => {
                    warn!("Leaving point {} out of the artifacts: {}", record.id, e);
                    report.skipped.push((record.id.to_string(), e));
                }
            }
        }

        payloads.sort_by(|a, b| a.filename.cmp(&b.filename));
        payloads
    }

    fn write_templates(
        &self,
        dir: &Path,
        payloads: &[RecordPayload],
        skipped: &mut Vec<(String, SyncError)>,
    ) -> Result<usize> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
                fs::remove_file(&path)?;
            }
        }

        let mut names = HashSet::new();
        let mut written = 0;
        for payload in payloads {
            let name = templates::template_file_name(&payload.filename);
            if !names.insert(name.clone()) {
                warn!("Template {} already written, skipping {}", name, payload.filename);
                skipped.push((
                    payload.filename.clone(),
                    SyncError::Validation(format!(
                        "{}: template name {} is already taken",
                        payload.filename, name
                    )),
                ));
                continue;
            }
            fs::write(dir.join(&name), templates::render(payload)?)?;
            written += 1;
        }
        Ok(written)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    if let Err(e) = fs::rename(&tmp, path) {
        if let Err(cleanup) = fs::remove_file(&tmp) {
            warn!("Could not remove {}: {}", tmp.display(), cleanup);
        }
        return Err(e.into());
    }
    Ok(())
}
