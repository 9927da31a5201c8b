use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

pub const MAX_TITLE_CHARS: usize = 90;

pub fn page_prefix(start_page: usize) -> String {
    format!("Page_{:04}", start_page + 1)
}

pub fn sanitize_title(title: &str) -> String {
    let ascii = title.nfkd().filter(char::is_ascii).collect::<String>();

    let mut out = String::with_capacity(ascii.len());
    let mut in_whitespace = false;
    for ch in ascii.chars() {
        if ch.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&ch) {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            out.push(ch);
        }
    }

    let trimmed = out.trim_matches('_');
    trimmed.chars().take(MAX_TITLE_CHARS).collect()
}

pub fn section_file_stem(title: &str, start_page: usize) -> String {
    let prefix = page_prefix(start_page);
    let safe_title = sanitize_title(title);
    if safe_title.is_empty() {
        prefix
    } else {
        format!("{}_{}", prefix, safe_title)
    }
}

pub fn section_output_path(output_dir: &Path, title: &str, start_page: usize) -> PathBuf {
    output_dir.join(format!("{}.pdf", section_file_stem(title, start_page)))
}
