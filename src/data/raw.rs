use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde_json::Value as JsonValue;

use super::clean::{column_index, PAYMENT_SOURCE_COLUMNS};
use super::store::{discard_tmp, tmp_path};
use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Path of the payments file, downloading it first when no cache exists.
pub fn ensure_payments(config: &PipelineConfig) -> Result<PathBuf> {
    let path = &config.payments_path;
    if path.is_file() {
        info!("Loading payments from cache {}", path.display());
        return Ok(path.clone());
    }
    if config.offline {
        return Err(PipelineError::FetchDisabled(path.clone()).into());
    }
    info!("No payments cache at {}, fetching from {}", path.display(), config.source_url);
    fetch_payments(&config.source_url, path)?;
    Ok(path.clone())
}

/// Path of the census file. Its absence is fatal.
pub fn ensure_census(config: &PipelineConfig) -> Result<PathBuf> {
    if config.census_path.is_file() {
        Ok(config.census_path.clone())
    } else {
        Err(PipelineError::MissingCensusFile(config.census_path.clone()).into())
    }
}

/// `distribution[0].downloadURL` of a dataset descriptor.
pub fn download_url(descriptor: &JsonValue) -> Result<&str, PipelineError> {
    descriptor
        .get("distribution")
        .and_then(|d| d.get(0))
        .and_then(|d| d.get("downloadURL"))
        .and_then(JsonValue::as_str)
        .ok_or(PipelineError::MissingDownloadUrl)
}

/// Resolve the descriptor, stream the CSV it points at and cache the
/// source columns at `dest`.
pub fn fetch_payments(descriptor_url: &str, dest: &Path) -> Result<()> {
    let client = Client::builder()
        .timeout(None::<Duration>)
        .build()
        .context("building HTTP client")?;
    download_payments(&client, descriptor_url, dest)
}

/// Two-step download through `client`. The cache only appears once the
/// whole CSV was projected; a failed transfer leaves nothing behind.
pub fn download_payments(client: &Client, descriptor_url: &str, dest: &Path) -> Result<()> {
    let descriptor: JsonValue = client
        .get(descriptor_url)
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("requesting {descriptor_url}"))?
        .json()
        .context("parsing dataset descriptor")?;
    let csv_url = download_url(&descriptor)?;

    info!("Downloading payments CSV from {csv_url}");
    let response = client
        .get(csv_url)
        .send()
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("requesting {csv_url}"))?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp = tmp_path(dest);
    let cached = fs::File::create(&tmp)
        .with_context(|| format!("creating {}", tmp.display()))
        .and_then(|file| project_columns(response, file, &PAYMENT_SOURCE_COLUMNS, csv_url))
        .and_then(|rows| {
            fs::rename(&tmp, dest).with_context(|| format!("moving {} into place", dest.display()))?;
            Ok(rows)
        });
    match cached {
        Ok(rows) => {
            info!("Cached {rows} payment rows at {}", dest.display());
            Ok(())
        }
        Err(err) => {
            discard_tmp(&[&tmp]);
            Err(err)
        }
    }
}

/// Copy `columns` (in that order) from a CSV stream to `writer`. Returns the
/// number of data rows written.
pub fn project_columns<R: Read, W: Write>(reader: R, writer: W, columns: &[&str], source: &str) -> Result<usize> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr
        .headers()
        .with_context(|| format!("{source}: reading CSV headers"))?
        .clone();
    let indices = columns
        .iter()
        .map(|c| column_index(&headers, c, source))
        .collect::<Result<Vec<_>, _>>()?;

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(columns).context("writing cache header")?;

    let mut rows = 0usize;
    for (row_no, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("{source}: CSV row {row_no}"))?;
        wtr.write_record(indices.iter().map(|&i| record.get(i).unwrap_or("")))
            .context("writing cache row")?;
        rows += 1;
    }
    wtr.flush().context("flushing cache")?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    /// Answer one request per route with the body registered for its path.
    fn serve(listener: TcpListener, routes: Vec<(String, String)>) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            let mut requested = Vec::new();
            for _ in 0..routes.len() {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut chunk).unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                let request = String::from_utf8_lossy(&buf).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or_default().to_string();
                let body = routes
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, b)| b.as_str())
                    .unwrap_or_default();
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
                requested.push(path);
            }
            requested
        })
    }

    fn loopback(csv: &str) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let descriptor = json!({ "distribution": [{ "downloadURL": format!("{base}/payments.csv") }] });
        let server = serve(
            listener,
            vec![
                ("/descriptor".to_string(), descriptor.to_string()),
                ("/payments.csv".to_string(), csv.to_string()),
            ],
        );
        (format!("{base}/descriptor"), server)
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn descriptor_download_url() {
        let descriptor = json!({
            "title": "General Payment Data",
            "distribution": [{ "downloadURL": "https://example.org/payments.csv" }]
        });
        assert_eq!(download_url(&descriptor).unwrap(), "https://example.org/payments.csv");

        let empty = json!({ "distribution": [] });
        assert!(matches!(download_url(&empty), Err(PipelineError::MissingDownloadUrl)));
    }

    #[test]
    fn projection_keeps_requested_columns_in_order() {
        let input = "Extra,Recipient_State,Total_Amount_of_Payment_USDollars\nx,CA,10\ny,,5\n";
        let mut out = Vec::new();
        let rows = project_columns(
            input.as_bytes(),
            &mut out,
            &["Total_Amount_of_Payment_USDollars", "Recipient_State"],
            "src",
        )
        .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Total_Amount_of_Payment_USDollars,Recipient_State\n10,CA\n5,\n"
        );
    }

    #[test]
    fn projection_fails_on_missing_column() {
        let err = project_columns("a,b\n1,2\n".as_bytes(), Vec::new(), &["Recipient_State"], "src").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn download_follows_descriptor_and_caches_source_columns() {
        let csv = "Extra,Covered_Recipient_Profile_ID,Covered_Recipient_Specialty_1,\
                   Total_Amount_of_Payment_USDollars,Date_of_Payment,\
                   Nature_of_Payment_or_Transfer_of_Value,Recipient_State\n\
                   x,1,Cardiology,10,01/01/2023,Grant,CA\n";
        let (descriptor_url, server) = loopback(csv);
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("raw").join("payments.csv");

        download_payments(&local_client(), &descriptor_url, &dest).unwrap();

        assert_eq!(server.join().unwrap(), vec!["/descriptor", "/payments.csv"]);
        let cached = fs::read_to_string(&dest).unwrap();
        assert_eq!(
            cached,
            format!("{}\n1,Cardiology,10,01/01/2023,Grant,CA\n", PAYMENT_SOURCE_COLUMNS.join(","))
        );
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn incomplete_download_leaves_no_cache() {
        let (descriptor_url, server) = loopback("Covered_Recipient_Profile_ID,Recipient_State\n1,CA\n");
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("payments.csv");

        let err = download_payments(&local_client(), &descriptor_url, &dest).unwrap_err();

        assert_eq!(server.join().unwrap().len(), 2);
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingColumn { .. })
        ));
        assert!(!dest.exists());
        assert!(!tmp_path(&dest).exists());
    }

    #[test]
    fn offline_without_cache_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::with_raw_dir(dir.path(), dir.path());
        config.offline = true;
        let err = ensure_payments(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::FetchDisabled(_))
        ));
    }

    #[test]
    fn cached_payments_are_used_as_is() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::with_raw_dir(dir.path(), dir.path());
        config.offline = true;
        fs::write(&config.payments_path, "x\n").unwrap();
        assert_eq!(ensure_payments(&config).unwrap(), config.payments_path);
    }

    #[test]
    fn missing_census_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::with_raw_dir(dir.path(), dir.path());
        let err = ensure_census(&config).unwrap_err();
        assert!(err.to_string().contains("Missing census file"));
    }
}
