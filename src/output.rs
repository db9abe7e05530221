//! Output sink for a won race: one HTML file per invocation.

use crate::error::Result;
use crate::tools::fetch::Target;
use chrono::{DateTime, Local, TimeZone};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// `<domain>_single_page_<YYYYmmdd_HHMMSS>.html`, dots in the domain
/// replaced by underscores.
pub fn default_file_name<Tz: TimeZone>(target: &Target, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}_single_page_{}.html",
        target.domain().replace('.', "_"),
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Write `content` to `path`, preceded by provenance comments.
pub fn save_content(path: &Path, content: &str, target: &Target, strategy: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "<!-- Scraped from: {target} -->")?;
    writeln!(out, "<!-- Scraped with: {strategy} -->")?;
    writeln!(
        out,
        "<!-- Scraped at: {} -->",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out)?;
    out.write_all(content.as_bytes())?;
    out.flush()?;

    info!(path = %path.display(), bytes = content.len(), "content saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;

    #[test]
    fn file_name_uses_domain_and_timestamp() {
        let target = Target::parse("https://www.ambitionbox.com/company/tcs").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_file_name(&target, &now),
            "ambitionbox_com_single_page_20240309_140507.html"
        );
    }

    #[test]
    fn saved_file_starts_with_provenance() {
        let target = Target::parse("example.com").unwrap();
        let path = std::env::temp_dir().join(format!("pagerace-out-{}.html", std::process::id()));

        save_content(&path, "<html>hi</html>", &target, "plain").unwrap();
        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("<!-- Scraped from: https://example.com/ -->"));
        assert_eq!(lines.next(), Some("<!-- Scraped with: plain -->"));
        assert!(lines.next().unwrap_or_default().starts_with("<!-- Scraped at: "));
        assert!(written.ends_with("\n\n<html>hi</html>"));
    }
}
