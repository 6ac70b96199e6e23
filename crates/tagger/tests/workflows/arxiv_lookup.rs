use wiremock::{
  matchers::{method, path, query_param},
  Mock, MockBuilder, MockServer, ResponseTemplate,
};

use super::*;

const FOUND: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=1706.03762</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <title>Attention Is All You Need</title>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <author><name>Niki Parmar</name></author>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

const EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=2310.99999</title>
  <updated>2024-01-01T00:00:00-05:00</updated>
</feed>"#;

fn endpoint(server: &MockServer) -> String {
  format!("{}/api/query?id_list={{identifier}}", server.uri())
}

fn query(identifier: &str) -> MockBuilder {
  Mock::given(method("GET")).and(path("/api/query")).and(query_param("id_list", identifier))
}

fn fast_retries(attempts: u32) -> RetryPolicy {
  RetryPolicy::with_max_attempts(attempts)
    .with_delays(Duration::from_millis(5), Duration::from_millis(5))
}

#[tokio::test]
async fn test_lookup_found() -> TestResult<()> {
  let server = MockServer::start().await;
  query("1706.03762")
    .respond_with(ResponseTemplate::new(200).set_body_string(FOUND))
    .mount(&server)
    .await;

  let client = ArxivClient::new(endpoint(&server))?;
  let record = client.lookup("1706.03762").await?.into_record().expect("paper exists");

  assert_eq!(record.title, "Attention Is All You Need");
  assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer", "Niki Parmar"]);
  assert_eq!(record.primary_category, "cs.CL");
  assert_eq!(record.filename(), PathBuf::from("attention_is_all_you_need.pdf"));
  Ok(())
}

#[tokio::test]
async fn test_empty_feed_is_not_found_and_not_retried() -> TestResult<()> {
  let server = MockServer::start().await;
  query("2310.99999")
    .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY))
    .expect(1)
    .mount(&server)
    .await;

  let resolver = Resolver::new(Arc::new(ArxivClient::new(endpoint(&server))?))
    .with_retry(fast_retries(3));
  assert_eq!(resolver.resolve("2310.99999").await?, Lookup::NotFound);
  Ok(())
}

#[tokio::test]
async fn test_server_error_is_a_lookup_failure() -> TestResult<()> {
  let server = MockServer::start().await;
  query("2310.12345").respond_with(ResponseTemplate::new(500)).mount(&server).await;

  let client = ArxivClient::new(endpoint(&server))?;
  let err = client.lookup("2310.12345").await.unwrap_err();

  assert!(matches!(err, TaggerError::HttpStatus(500)));
  assert!(err.is_lookup_failure());
  assert!(err.is_transient());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_rate_limit_is_retried() -> TestResult<()> {
  let server = MockServer::start().await;
  query("1706.03762")
    .respond_with(ResponseTemplate::new(429))
    .up_to_n_times(1)
    .expect(1)
    .mount(&server)
    .await;
  query("1706.03762")
    .respond_with(ResponseTemplate::new(200).set_body_string(FOUND))
    .expect(1)
    .mount(&server)
    .await;

  let resolver = Resolver::new(Arc::new(ArxivClient::new(endpoint(&server))?))
    .with_retry(fast_retries(3));
  let lookup = resolver.resolve("1706.03762").await?;

  assert!(matches!(lookup, Lookup::Found(record) if record.title == "Attention Is All You Need"));
  assert!(logs_contain("retrying"));
  Ok(())
}

#[tokio::test]
async fn test_client_error_is_not_retried() -> TestResult<()> {
  let server = MockServer::start().await;
  query("2310.12345").respond_with(ResponseTemplate::new(400)).expect(1).mount(&server).await;

  let resolver = Resolver::new(Arc::new(ArxivClient::new(endpoint(&server))?))
    .with_retry(fast_retries(3));
  assert!(matches!(resolver.resolve("2310.12345").await, Err(TaggerError::HttpStatus(400))));
  Ok(())
}

#[tokio::test]
async fn test_slow_service_times_out() -> TestResult<()> {
  let server = MockServer::start().await;
  query("2310.12345")
    .respond_with(
      ResponseTemplate::new(200).set_body_string(FOUND).set_delay(Duration::from_secs(2)),
    )
    .mount(&server)
    .await;

  let resolver = Resolver::new(Arc::new(ArxivClient::new(endpoint(&server))?))
    .with_retry(fast_retries(1))
    .with_timeout(Duration::from_millis(100));
  assert!(matches!(resolver.resolve("2310.12345").await, Err(TaggerError::LookupTimeout(_))));
  Ok(())
}

#[tokio::test]
async fn test_malformed_response_is_a_lookup_failure() -> TestResult<()> {
  let server = MockServer::start().await;
  query("2310.12345")
    .respond_with(ResponseTemplate::new(200).set_body_string("<feed><entry></feed>"))
    .mount(&server)
    .await;

  let client = ArxivClient::new(endpoint(&server))?;
  let err = client.lookup("2310.12345").await.unwrap_err();
  assert!(err.is_lookup_failure());
  assert!(!err.is_transient());
  Ok(())
}

#[tokio::test]
async fn test_download_filed_through_http_lookup() -> TestResult<()> {
  let server = MockServer::start().await;
  query("1706.03762")
    .respond_with(ResponseTemplate::new(200).set_body_string(FOUND))
    .mount(&server)
    .await;

  let downloads = tempdir()?;
  let papers = tempdir()?;
  let config = Config { endpoint: endpoint(&server), ..Config::default() }
    .with_source_dir(downloads.path())
    .with_destination_dir(papers.path().join("library"));
  config.validate()?;

  let tracker = Arc::new(PendingTransfers::from_config(&config));
  let resolver = Resolver::from_config(Arc::new(ArxivClient::from_config(&config)?), &config);
  let dispatcher = Dispatcher::new(tracker, resolver, Placer::from_config(&config));

  let temporary = downloads.path().join("Unconfirmed 1234.crdownload");
  let finished = downloads.path().join("1706.03762.pdf");
  dispatcher.handle(Notification::Created { path: temporary.clone(), is_dir: false });
  std::fs::write(&finished, b"%PDF-1.5")?;
  let task = dispatcher
    .handle(Notification::Renamed { from: temporary, to: finished.clone(), is_dir: false })
    .expect("tracked");

  let Outcome::Placed(placement) = task.await? else { panic!("download was not placed") };
  assert_eq!(placement.destination, papers.path().join("library/attention_is_all_you_need.pdf"));
  assert!(Path::new(&placement.destination).exists());
  Ok(())
}
