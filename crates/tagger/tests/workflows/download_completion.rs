use super::*;

#[tokio::test]
async fn test_completed_download_is_filed_by_title() -> TestResult<()> {
  let harness = Harness::new(FakeSource::default().with_paper("2310.12345", "Foo Bar"));
  let temporary = harness.download_path("tmp1.crdownload");
  let t0 = Instant::now();

  let spawned = harness
    .dispatcher
    .handle_at(Notification::Created { path: temporary.clone(), is_dir: false }, t0);
  assert!(spawned.is_none());
  assert!(harness.dispatcher.tracker().is_tracked(&temporary));

  let finished = harness.finish("2310.12345.pdf");
  let task = harness
    .dispatcher
    .handle_at(
      Notification::Renamed { from: temporary, to: finished.clone(), is_dir: false },
      t0 + Duration::from_millis(300),
    )
    .expect("a tracked rename starts the pipeline");

  let Outcome::Placed(placement) = task.await? else { panic!("download was not placed") };
  assert_eq!(harness.source.asked(), vec!["2310.12345"]);
  assert_eq!(placement.destination, harness.papers.path().join("foo_bar.pdf"));
  assert_eq!(placement.identifier, "2310.12345");
  assert_eq!(placement.title, "Foo Bar");
  assert!(placement.destination.exists());
  assert!(!finished.exists());
  Ok(())
}

#[tokio::test]
async fn test_rename_after_eviction_is_untracked() {
  let harness = Harness::new(FakeSource::default().with_paper("2310.99999", "Foo Bar"));
  let temporary = harness.download_path("tmp2.crdownload");
  let t0 = Instant::now();

  let created = Notification::Created { path: temporary.clone(), is_dir: false };
  harness.dispatcher.handle_at(created, t0);
  assert_eq!(harness.dispatcher.tracker().evict_stale(t0 + Duration::from_secs(5)), 1);

  let finished = harness.finish("2310.99999.pdf");
  let task = harness.dispatcher.handle_at(
    Notification::Renamed { from: temporary, to: finished.clone(), is_dir: false },
    t0 + Duration::from_secs(5),
  );

  assert!(task.is_none());
  assert!(harness.source.asked().is_empty());
  assert!(finished.exists());
  assert!(std::fs::read_dir(harness.papers.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_each_download_completes_once() -> TestResult<()> {
  let harness = Harness::new(FakeSource::default().with_paper("2310.12345", "Foo Bar"));
  let temporary = harness.download_path("tmp1.crdownload");
  let finished = harness.finish("2310.12345.pdf");

  harness.dispatcher.handle(Notification::Created { path: temporary.clone(), is_dir: false });
  let first = harness.dispatcher.handle(Notification::Renamed {
    from:   temporary.clone(),
    to:     finished.clone(),
    is_dir: false,
  });
  let second = harness.dispatcher.handle(Notification::Renamed {
    from:   temporary,
    to:     finished,
    is_dir: false,
  });

  assert!(second.is_none());
  assert!(matches!(first.unwrap().await?, Outcome::Placed(_)));
  assert_eq!(harness.source.asked().len(), 1);
  Ok(())
}

#[tokio::test]
async fn test_concurrent_downloads_are_independent() -> TestResult<()> {
  let harness = Harness::new(
    FakeSource::default()
      .with_paper("2310.00001", "First Paper")
      .with_paper("2310.00002", "Second Paper"),
  );

  for name in ["a.crdownload", "b.crdownload", "c.crdownload"] {
    harness
      .dispatcher
      .handle(Notification::Created { path: harness.download_path(name), is_dir: false });
  }
  assert_eq!(harness.dispatcher.tracker().len(), 3);

  let mut tasks = Vec::new();
  for (temporary, name) in [("b.crdownload", "2310.00002.pdf"), ("a.crdownload", "2310.00001.pdf")]
  {
    let finished = harness.finish(name);
    tasks.push(harness.dispatcher.handle(Notification::Renamed {
      from:   harness.download_path(temporary),
      to:     finished,
      is_dir: false,
    }));
  }

  for task in tasks {
    assert!(matches!(task.unwrap().await?, Outcome::Placed(_)));
  }
  assert!(harness.papers.path().join("first_paper.pdf").exists());
  assert!(harness.papers.path().join("second_paper.pdf").exists());
  assert!(harness.dispatcher.tracker().is_tracked(&harness.download_path("c.crdownload")));
  Ok(())
}

#[tokio::test]
async fn test_unknown_paper_stays_in_downloads() -> TestResult<()> {
  let harness = Harness::new(FakeSource::default());
  let temporary = harness.download_path("tmp1.crdownload");
  harness.dispatcher.handle(Notification::Created { path: temporary.clone(), is_dir: false });

  let finished = harness.finish("2310.54321.pdf");
  let task = harness
    .dispatcher
    .handle(Notification::Renamed { from: temporary, to: finished.clone(), is_dir: false });

  assert!(matches!(task.unwrap().await?, Outcome::NotFound(id) if id == "2310.54321"));
  assert!(finished.exists());
  Ok(())
}

#[tokio::test]
async fn test_directory_events_are_ignored() {
  let harness = Harness::new(FakeSource::default());
  let directory = harness.download_path("folder.crdownload");

  harness.dispatcher.handle(Notification::Created { path: directory.clone(), is_dir: true });
  assert!(!harness.dispatcher.tracker().is_tracked(&directory));

  let task = harness.dispatcher.handle(Notification::Renamed {
    from:   directory,
    to:     harness.download_path("2310.12345.pdf"),
    is_dir: true,
  });
  assert!(task.is_none());
}
