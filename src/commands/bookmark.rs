use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::BookmarkArgs;
use crate::commands::inventory::discover_pdfs;
use crate::headings::resolve_mapping;
use crate::llm::{GeminiClient, TitlePageInference, infer_document_mapping};
use crate::model::{BookmarkDocumentRecord, BookmarkRunReport};
use crate::pdf::{DocumentError, PdfDocument, TextSourceFactory, inject_outline};
use crate::util::{
    ensure_directory, file_name_string, now_utc_string, replace_file, run_id, sibling_temp_path,
    write_json_pretty,
};

const REPORT_VERSION: u32 = 1;

pub fn run(args: BookmarkArgs) -> Result<()> {
    let client = GeminiClient::new(args.llm.to_config())?;
    let report = bookmark_input(&args, &args.text_backend, &client)?;

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote bookmark report");
    }

    info!(
        documents = report.document_count,
        updated = report.updated_count,
        empty = report.empty_count,
        failed = report.failed_count,
        "bookmarking completed"
    );
    Ok(())
}

pub fn bookmark_input(
    args: &BookmarkArgs,
    texts: &dyn TextSourceFactory,
    inference: &dyn TitlePageInference,
) -> Result<BookmarkRunReport> {
    let mut documents = Vec::new();

    if args.input.is_dir() {
        let paths = discover_pdfs(&args.input)?;
        if paths.is_empty() {
            warn!(path = %args.input.display(), "no PDFs found to bookmark");
        }
        if let Some(output_dir) = &args.output_dir {
            ensure_directory(output_dir)?;
        }

        for path in paths {
            let target = match &args.output_dir {
                Some(output_dir) => output_dir.join(file_name_string(&path)),
                None => path.clone(),
            };

            let record = match bookmark_document(&path, &target, args, texts, inference) {
                Ok(record) => record,
                Err(error) => {
                    warn!(
                        path = %path.display(),
                        unreadable = error.downcast_ref::<DocumentError>().is_some(),
                        error = %format!("{error:#}"),
                        "failed to bookmark document; continuing with the next one"
                    );
                    BookmarkDocumentRecord {
                        path: path.display().to_string(),
                        output_path: None,
                        status: "failed".to_string(),
                        entries_added: 0,
                        entries_discarded: 0,
                        error: Some(format!("{error:#}")),
                    }
                }
            };
            documents.push(record);
        }
    } else {
        let target = single_output_path(&args.input, args.output_dir.as_deref());
        if let Some(parent) = target.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }
        documents.push(bookmark_document(
            &args.input,
            &target,
            args,
            texts,
            inference,
        )?);
    }

    let count_status = |status: &str| {
        documents
            .iter()
            .filter(|record| record.status == status)
            .count()
    };

    Ok(BookmarkRunReport {
        report_version: REPORT_VERSION,
        run_id: run_id("bookmark"),
        generated_at: now_utc_string(),
        input_path: args.input.display().to_string(),
        model: inference.model().to_string(),
        document_count: documents.len(),
        updated_count: count_status("updated"),
        empty_count: count_status("no_entries"),
        failed_count: count_status("failed"),
        documents,
    })
}

fn single_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let directory = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    directory.join(format!("updated_{}", file_name_string(input)))
}

fn bookmark_document(
    source: &Path,
    target: &Path,
    args: &BookmarkArgs,
    texts: &dyn TextSourceFactory,
    inference: &dyn TitlePageInference,
) -> Result<BookmarkDocumentRecord> {
    let mut document = PdfDocument::open(source)?;
    info!(
        path = %source.display(),
        pages = document.page_count(),
        "asking model for headings"
    );

    let mapping = {
        let pages = texts.open(&document)?;
        infer_document_mapping(pages.as_ref(), inference, args.llm.max_document_chars)?
    };

    if mapping.is_empty() {
        info!(path = %source.display(), "model returned no usable headings");
    }

    let conversion = resolve_mapping(&mapping, document.page_count());
    for entry in &conversion.discarded {
        info!(
            title = %entry.title,
            page_number = entry.page_number,
            page_count = document.page_count(),
            "discarding bookmark outside the document"
        );
    }
    let entries_discarded = conversion.discarded.len() + mapping.malformed.len();

    let mut record = BookmarkDocumentRecord {
        path: source.display().to_string(),
        output_path: None,
        status: "no_entries".to_string(),
        entries_added: 0,
        entries_discarded,
        error: None,
    };

    if conversion.applied.is_empty() {
        info!(path = %source.display(), "no valid bookmarks found; leaving document untouched");
        return Ok(record);
    }

    let added = inject_outline(&mut document, &conversion.applied, args.replace)?;
    if added == 0 {
        return Ok(record);
    }

    let temp_path = sibling_temp_path(target);
    if let Err(error) = document.save_to(&temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }
    if let Err(error) = replace_file(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(error);
    }

    info!(
        path = %target.display(),
        added,
        discarded = entries_discarded,
        "wrote bookmarks"
    );

    record.output_path = Some(target.display().to_string());
    record.status = "updated".to_string();
    record.entries_added = added;
    Ok(record)
}
