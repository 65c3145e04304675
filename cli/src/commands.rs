use anyhow::{Context, Result};
use reverseip_core::{
    ApiError, CancellationToken, Failure, LookupResult, QueryOption, ReverseIpClient,
};
use tracing::{debug, info, warn};

/// Cursor the service treats as "before the first domain".
const FIRST_CURSOR: &str = "1";

pub async fn lookup(
    client: &ReverseIpClient,
    cancel: &CancellationToken,
    ip: &str,
    from: Option<String>,
    show_raw: bool,
) -> Result<()> {
    let opts: Vec<QueryOption> = from.into_iter().map(QueryOption::from_cursor).collect();

    let (page, raw) = client
        .get(cancel, ip, &opts)
        .await
        .map_err(report_envelope)
        .context("lookup failed")?;

    for record in &page.results {
        println!("{}", format_record(record));
    }
    info!(size = page.size, current_page = %page.current_page, "Page received");

    if show_raw {
        println!("{}", raw.text());
    }
    Ok(())
}

/// Walk every page for `ip`, advancing the cursor to the last name of each
/// page until a page comes back shorter than `page_limit`.
pub async fn fetch_all(
    client: &ReverseIpClient,
    cancel: &CancellationToken,
    ip: &str,
    page_limit: usize,
) -> Result<Vec<LookupResult>, Failure> {
    let mut from = FIRST_CURSOR.to_string();
    let mut results = Vec::new();

    loop {
        let (page, _) = client
            .get(cancel, ip, &[QueryOption::from_cursor(from.as_str())])
            .await?;
        debug!(from = %from, size = page.size, "Fetched page");

        let short = page.size < page_limit;
        let next = page.last_name().map(str::to_string);
        results.extend(page.results);

        match next {
            Some(name) if !short => from = name,
            _ => break,
        }
    }

    Ok(results)
}

pub async fn all(
    client: &ReverseIpClient,
    cancel: &CancellationToken,
    ip: &str,
    page_limit: usize,
) -> Result<()> {
    let results = fetch_all(client, cancel, ip, page_limit)
        .await
        .map_err(report_envelope)
        .context("paged lookup failed")?;

    println!("{} domains", results.len());
    for record in &results {
        println!("{}", format_record(record));
    }
    Ok(())
}

pub async fn raw(
    client: &ReverseIpClient,
    cancel: &CancellationToken,
    ip: &str,
    format: &str,
    from: Option<String>,
) -> Result<()> {
    let mut opts = vec![QueryOption::output_format(format)];
    opts.extend(from.map(QueryOption::from_cursor));

    match client.get_raw(cancel, ip, &opts).await {
        Ok(raw) => {
            println!("{}", raw.text());
            Ok(())
        }
        Err(failure) => {
            // The body is still worth showing when only the status was bad.
            if let Some(raw) = failure.response() {
                if !raw.body.is_empty() {
                    println!("{}", raw.text());
                }
            }
            Err(failure).context("raw lookup failed")
        }
    }
}

fn report_envelope(failure: Failure) -> Failure {
    if let ApiError::Envelope(envelope) = failure.error() {
        warn!(code = envelope.code, message = %envelope.message, "Service rejected the lookup");
    }
    failure
}

pub fn format_record(record: &LookupResult) -> String {
    let stamp = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    format!(
        "Name: {}, First: {}, Last: {}",
        record.name,
        stamp(record.first_seen_at()),
        stamp(record.last_visit_at())
    )
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use mock_server::{paths, sample_records, MockState, API_KEY};
    use reverseip_core::ClientParams;

    use super::*;

    fn start_server(state: Arc<MockState>) -> SocketAddr {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        std_listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
                mock_server::run_with_state(listener, state).await
            })
            .unwrap();
        });
        addr
    }

    fn client(addr: SocketAddr, path: &str) -> ReverseIpClient {
        let params = ClientParams {
            base_url: Some(format!("http://{addr}{path}")),
            ..ClientParams::default()
        };
        ReverseIpClient::new(API_KEY, params).unwrap()
    }

    #[test]
    fn format_record_uses_rfc3339() {
        let record = LookupResult {
            name: "iana.com".to_string(),
            first_seen: 1570492800,
            last_visit: 1657756800,
        };
        assert_eq!(
            format_record(&record),
            "Name: iana.com, First: 2019-10-08T00:00:00+00:00, Last: 2022-07-14T00:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn fetch_all_follows_cursor() {
        let state = Arc::new(MockState::new(sample_records(10), 4));
        let addr = start_server(state.clone());
        let cancel = CancellationToken::new();

        let results = fetch_all(&client(addr, paths::LOOKUP), &cancel, "8.8.8.8", 4)
            .await
            .unwrap();

        assert_eq!(results.len(), 10);
        assert_eq!(results[9].name, "domain0009.example");
        assert_eq!(state.hits(), 3);
    }

    #[tokio::test]
    async fn fetch_all_exact_multiple_ends_on_empty_page() {
        let state = Arc::new(MockState::new(sample_records(8), 4));
        let addr = start_server(state.clone());
        let cancel = CancellationToken::new();

        let results = fetch_all(&client(addr, paths::LOOKUP), &cancel, "8.8.8.8", 4)
            .await
            .unwrap();

        assert_eq!(results.len(), 8);
        assert_eq!(state.hits(), 3);
    }

    #[tokio::test]
    async fn fetch_all_stops_on_error() {
        let state = Arc::new(MockState::default());
        let addr = start_server(state);
        let cancel = CancellationToken::new();

        let failure = fetch_all(&client(addr, paths::ERROR), &cancel, "8.8.8.8", 300)
            .await
            .unwrap_err();

        assert_eq!(failure.to_string(), "API error: [499] Test error message.");
    }
}
