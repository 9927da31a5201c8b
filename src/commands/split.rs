use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{SplitArgs, SplitStrategy};
use crate::headings::{
    HeadingScan, MappingHeadings, OutlineHeadings, PageRef, PageResolver, PatternHeadings,
    PatternMatcher, collect_candidates,
};
use crate::llm::{GeminiClient, TitlePageInference, infer_document_mapping};
use crate::model::{SectionRecord, SplitRunReport};
use crate::partition::{PartitionOptions, partition_with};
use crate::pdf::{LopdfRangeWriter, PageRangeWriter, PdfDocument, TextSourceFactory, read_outline};
use crate::sanitize::section_output_path;
use crate::util::{ensure_directory, now_utc_string, run_id, sha256_file, write_json_pretty};

const REPORT_VERSION: u32 = 1;

pub fn run(args: SplitArgs) -> Result<()> {
    let document = PdfDocument::open(&args.input)?;
    info!(
        path = %args.input.display(),
        pages = document.page_count(),
        strategy = args.strategy.as_str(),
        "opened input PDF"
    );

    let client = match args.strategy {
        SplitStrategy::Llm => Some(GeminiClient::new(args.llm.to_config())?),
        SplitStrategy::Outline | SplitStrategy::Pattern => None,
    };
    let inference = client
        .as_ref()
        .map(|client| client as &dyn TitlePageInference);

    let scan = scan_headings(&document, &args, &args.text_backend, inference)?;
    let writer = LopdfRangeWriter::new(&document);
    let report = split_document(&document, scan, &args, &writer)?;

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote split report");
    }

    info!(
        status = %report.status,
        sections = report.sections.len(),
        skipped = report.skipped_sections.len(),
        discarded = report.discarded_candidates.len(),
        duplicates = report.duplicate_candidates.len(),
        "split completed"
    );
    Ok(())
}

pub fn scan_headings(
    document: &PdfDocument,
    args: &SplitArgs,
    texts: &dyn TextSourceFactory,
    inference: Option<&dyn TitlePageInference>,
) -> Result<HeadingScan> {
    match args.strategy {
        SplitStrategy::Outline => {
            let nodes = read_outline(document)?;
            if nodes.is_empty() {
                info!(path = %document.path().display(), "PDF has no outline");
            }
            let source = OutlineHeadings::new(nodes, |target: &PageRef| document.resolve(target));
            info!(entries = source.entry_count(), "reading headings from outline");
            Ok(collect_candidates(&source))
        }
        SplitStrategy::Pattern => {
            let matcher = PatternMatcher::new(args.pattern, args.regex.as_deref())?;
            let pages = texts.open(document)?;
            info!(
                pattern = matcher.policy().as_str(),
                pages = pages.page_count(),
                "scanning page text for headings"
            );
            Ok(collect_candidates(&PatternHeadings::new(pages.as_ref(), &matcher)))
        }
        SplitStrategy::Llm => {
            let inference = inference.context("llm strategy needs a model client")?;
            let pages = texts.open(document)?;
            let mapping =
                infer_document_mapping(pages.as_ref(), inference, args.llm.max_document_chars)?;
            Ok(collect_candidates(&MappingHeadings::new(
                mapping,
                document.page_count(),
            )))
        }
    }
}

pub fn split_document(
    document: &PdfDocument,
    scan: HeadingScan,
    args: &SplitArgs,
    writer: &dyn PageRangeWriter,
) -> Result<SplitRunReport> {
    let page_count = document.page_count();
    let options = PartitionOptions {
        front_matter_title: args.front_matter_title.clone(),
    };
    let outcome = partition_with(scan.candidates, page_count, &options);
    let log = outcome.log().clone();

    let mut report = SplitRunReport {
        report_version: REPORT_VERSION,
        run_id: run_id("split"),
        generated_at: now_utc_string(),
        input_path: document.path().display().to_string(),
        input_sha256: sha256_file(document.path())?,
        output_dir: args.output_dir.display().to_string(),
        strategy: args.strategy.as_str().to_string(),
        page_count,
        status: String::new(),
        dry_run: args.dry_run,
        sections: Vec::new(),
        skipped_sections: log.skipped,
        discarded_candidates: log.discarded,
        duplicate_candidates: log.duplicates,
        warnings: scan.warnings,
    };

    if outcome.is_empty() {
        info!(
            path = %document.path().display(),
            "no sections found; nothing to write"
        );
        report.status = "no_sections_found".to_string();
        return Ok(report);
    }

    if !args.dry_run {
        ensure_directory(&args.output_dir)?;
    }

    for section in outcome.sections() {
        let output_path = section_output_path(&args.output_dir, &section.title, section.start_page);

        let sha256 = if args.dry_run {
            info!(
                path = %output_path.display(),
                first_page = section.start_page + 1,
                last_page = section.end_page,
                "would write section"
            );
            None
        } else {
            writer
                .write_range(section, &output_path)
                .with_context(|| format!("failed to write section '{}'", section.title))?;
            info!(
                path = %output_path.display(),
                first_page = section.start_page + 1,
                last_page = section.end_page,
                pages = section.page_count(),
                "wrote section"
            );
            Some(sha256_file(&output_path)?)
        };

        report.sections.push(SectionRecord {
            title: section.title.clone(),
            start_page: section.start_page,
            end_page: section.end_page,
            first_page_number: section.start_page + 1,
            last_page_number: section.end_page,
            output_path: output_path.display().to_string(),
            sha256,
        });
    }

    report.status = if args.dry_run { "dry_run" } else { "split" }.to_string();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};

    use anyhow::bail;
    use lopdf::Document;

    use super::*;
    use crate::cli::LlmArgs;
    use crate::headings::PatternPolicy;
    use crate::llm::fake::ScriptedInference;
    use crate::model::{Candidate, Section};
    use crate::pdf::fixtures::{page_labels, sample_document, write_sample_pdf};
    use crate::pdf::{PageTextSource, TextBackend, inject_outline};

    fn split_args(input: &Path, output_dir: &Path, strategy: SplitStrategy) -> SplitArgs {
        SplitArgs {
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            strategy,
            pattern: PatternPolicy::Strict,
            regex: None,
            text_backend: TextBackend::Lopdf,
            front_matter_title: None,
            dry_run: false,
            report_path: None,
            llm: LlmArgs {
                api_key: None,
                model: "scripted".to_string(),
                llm_endpoint: "http://127.0.0.1:9".to_string(),
                llm_timeout_secs: 1,
                max_document_chars: 10_000,
            },
        }
    }

    fn bookmarked_pdf(path: &Path, page_count: usize, entries: &[(&str, usize)]) {
        let mut document = PdfDocument::from_document(path, sample_document(page_count));
        let entries = entries
            .iter()
            .map(|(title, page)| (title.to_string(), *page))
            .collect::<Vec<_>>();
        inject_outline(&mut document, &entries, false).expect("inject");
        document.save_to(path).expect("save");
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    struct PagesFromText(Vec<&'static str>);

    impl PageTextSource for PagesFromText {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, page_index: usize) -> Result<String> {
            Ok(self.0[page_index].to_string())
        }
    }

    struct FixedTexts(Vec<&'static str>);

    impl TextSourceFactory for FixedTexts {
        fn open<'a>(&self, _document: &'a PdfDocument) -> Result<Box<dyn PageTextSource + 'a>> {
            Ok(Box::new(PagesFromText(self.0.clone())))
        }
    }

    struct RecordingWriter {
        calls: RefCell<Vec<(Section, PathBuf)>>,
        fail_on: Option<usize>,
    }

    impl PageRangeWriter for RecordingWriter {
        fn write_range(&self, section: &Section, output_path: &Path) -> Result<()> {
            let mut calls = self.calls.borrow_mut();
            if self.fail_on == Some(calls.len()) {
                bail!("disk full");
            }
            fs::write(output_path, b"%PDF-stub").expect("write stub");
            calls.push((section.clone(), output_path.to_path_buf()));
            Ok(())
        }
    }

    #[test]
    fn outline_strategy_writes_one_file_per_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        bookmarked_pdf(
            &input,
            10,
            &[("Chapter 2: Growth", 4), ("Chapter 1: Roots", 0), ("Epilogue", 8)],
        );
        let output_dir = dir.path().join("sections");
        let report_path = dir.path().join("report.json");

        let mut args = split_args(&input, &output_dir, SplitStrategy::Outline);
        args.report_path = Some(report_path.clone());
        run(args).expect("split");

        assert_eq!(
            file_names(&output_dir),
            vec![
                "Page_0001_Chapter_1_Roots.pdf",
                "Page_0005_Chapter_2_Growth.pdf",
                "Page_0009_Epilogue.pdf",
            ]
        );
        let second =
            Document::load(output_dir.join("Page_0005_Chapter_2_Growth.pdf")).expect("load");
        assert_eq!(page_labels(&second), vec!["Page 5", "Page 6", "Page 7", "Page 8"]);

        let report: serde_json::Value =
            serde_json::from_slice(&fs::read(&report_path).expect("read report")).expect("json");
        assert_eq!(report["status"], "split");
        assert_eq!(report["sections"].as_array().map(Vec::len), Some(3));
        assert_eq!(report["sections"][2]["last_page_number"], 10);
    }

    #[test]
    fn dry_run_reports_sections_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        bookmarked_pdf(&input, 6, &[("Intro", 0), ("Body", 2)]);
        let document = PdfDocument::open(&input).expect("open");
        let output_dir = dir.path().join("never");

        let mut args = split_args(&input, &output_dir, SplitStrategy::Outline);
        args.dry_run = true;
        let scan = scan_headings(&document, &args, &args.text_backend, None).expect("scan");
        let writer = RecordingWriter {
            calls: RefCell::new(Vec::new()),
            fail_on: None,
        };
        let report = split_document(&document, scan, &args, &writer).expect("split");

        assert_eq!(report.status, "dry_run");
        assert_eq!(report.sections.len(), 2);
        assert!(report.sections.iter().all(|record| record.sha256.is_none()));
        assert!(writer.calls.borrow().is_empty());
        assert!(!output_dir.exists());
    }

    #[test]
    fn document_without_headings_produces_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("plain.pdf");
        write_sample_pdf(&input, 5);
        let output_dir = dir.path().join("sections");

        run(split_args(&input, &output_dir, SplitStrategy::Outline)).expect("split");
        assert!(!output_dir.exists());
    }

    #[test]
    fn missing_input_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = split_args(
            &dir.path().join("absent.pdf"),
            &dir.path().join("out"),
            SplitStrategy::Outline,
        );
        assert!(run(args).is_err());
    }

    #[test]
    fn pattern_strategy_uses_page_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        write_sample_pdf(&input, 5);
        let document = PdfDocument::open(&input).expect("open");
        let output_dir = dir.path().join("sections");

        let args = split_args(&input, &output_dir, SplitStrategy::Pattern);
        let texts = FixedTexts(vec![
            "Title page",
            "PART I Foundations\nChapter 1 Basics",
            "more text",
            "Chapter 2 Deeper",
            "end",
        ]);
        let scan = scan_headings(&document, &args, &texts, None).expect("scan");
        assert_eq!(
            scan.candidates,
            vec![
                Candidate::new("PART I Foundations", 1),
                Candidate::new("Chapter 2 Deeper", 3),
            ]
        );

        let writer = LopdfRangeWriter::new(&document);
        let report = split_document(&document, scan, &args, &writer).expect("split");
        assert_eq!(report.sections.len(), 2);
        assert_eq!(
            file_names(&output_dir),
            vec!["Page_0002_PART_I_Foundations.pdf", "Page_0004_Chapter_2_Deeper.pdf"]
        );
    }

    #[test]
    fn llm_strategy_discards_pages_outside_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        write_sample_pdf(&input, 50);
        let document = PdfDocument::open(&input).expect("open");

        let args = split_args(&input, &dir.path().join("out"), SplitStrategy::Llm);
        let texts = FixedTexts(vec!["some text"; 50]);
        let inference = ScriptedInference::replying(vec![Ok(r#"{"Intro": 1, "Ghost": 999}"#)]);

        let scan = scan_headings(&document, &args, &texts, Some(&inference)).expect("scan");
        assert_eq!(scan.candidates, vec![Candidate::new("Intro", 0)]);
        assert_eq!(scan.warnings.len(), 1);

        let writer = RecordingWriter {
            calls: RefCell::new(Vec::new()),
            fail_on: None,
        };
        let report = split_document(&document, scan, &args, &writer).expect("split");
        let calls = writer.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.start_page, 0);
        assert_eq!(calls[0].0.end_page, 50);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn llm_strategy_requires_a_client() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        write_sample_pdf(&input, 2);
        let document = PdfDocument::open(&input).expect("open");

        let args = split_args(&input, &dir.path().join("out"), SplitStrategy::Llm);
        let texts = FixedTexts(vec!["a", "b"]);
        assert!(scan_headings(&document, &args, &texts, None).is_err());
    }

    #[test]
    fn writer_failure_keeps_earlier_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        write_sample_pdf(&input, 6);
        let document = PdfDocument::open(&input).expect("open");
        let output_dir = dir.path().join("sections");

        let args = split_args(&input, &output_dir, SplitStrategy::Outline);
        let scan = HeadingScan {
            candidates: vec![
                Candidate::new("One", 0),
                Candidate::new("Two", 2),
                Candidate::new("Three", 4),
            ],
            warnings: Vec::new(),
        };
        let writer = RecordingWriter {
            calls: RefCell::new(Vec::new()),
            fail_on: Some(1),
        };

        let error = split_document(&document, scan, &args, &writer).expect_err("should fail");
        assert!(format!("{error:#}").contains("disk full"));
        assert_eq!(file_names(&output_dir), vec!["Page_0001_One.pdf"]);
    }

    #[test]
    fn front_matter_title_covers_leading_pages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("book.pdf");
        write_sample_pdf(&input, 8);
        let document = PdfDocument::open(&input).expect("open");

        let mut args = split_args(&input, &dir.path().join("out"), SplitStrategy::Outline);
        args.dry_run = true;
        args.front_matter_title = Some("Front Matter".to_string());
        let scan = HeadingScan {
            candidates: vec![Candidate::new("Chapter 1", 3)],
            warnings: Vec::new(),
        };
        let writer = RecordingWriter {
            calls: RefCell::new(Vec::new()),
            fail_on: None,
        };

        let report = split_document(&document, scan, &args, &writer).expect("split");
        let ranges = report
            .sections
            .iter()
            .map(|record| (record.title.as_str(), record.start_page, record.end_page))
            .collect::<Vec<_>>();
        assert_eq!(ranges, vec![("Front Matter", 0, 3), ("Chapter 1", 3, 8)]);
        assert!(report.sections[0].output_path.ends_with("Page_0001_Front_Matter.pdf"));
    }
}
