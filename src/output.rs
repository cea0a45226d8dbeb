use std::io::{self, Write};

use serde::Serialize;

use crate::installer::InstallResult;

#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub url: String,
    pub path: String,
    pub action: String,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_install(result: &InstallResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_download(result: &DownloadReport) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
