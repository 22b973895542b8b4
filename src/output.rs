use std::io::{self, Write};

use serde::Serialize;

use crate::upload::UploadSummary;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Json,
    Text,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_upload(summary: &UploadSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_upload(summary: &UploadSummary) -> io::Result<()> {
        let mut stdout = io::stdout();
        Self::write_upload(&mut stdout, summary)
    }

    pub fn write_upload<W: Write>(out: &mut W, summary: &UploadSummary) -> io::Result<()> {
        writeln!(out, "url:          {}", summary.url)?;
        writeln!(out, "filename:     {}", summary.original_filename)?;
        writeln!(out, "content type: {}", summary.content_type)?;
        writeln!(out, "bytes:        {}", summary.bytes)?;
        writeln!(out, "path:         {}", summary.path)?;
        Ok(())
    }
}
