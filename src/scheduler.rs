use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use tracing::{error, info};

use crate::cycle::Watcher;
use crate::fetch::PageSource;
use crate::notify::{format, Transport};

/// Run cycles back to back with `interval` between them until `shutdown`
/// resolves. Shutdown is only observed while waiting, never mid-cycle; a
/// signal arriving during a cycle takes effect at the following pause.
pub async fn run<S, T, F>(watcher: &mut Watcher<S, T>, interval: Duration, shutdown: F) -> anyhow::Result<()>
where
    S: PageSource,
    T: Transport,
    F: Future<Output = io::Result<()>>,
{
    let minutes = interval.as_secs() / 60;
    let notifier = watcher.notifier();
    let startup = format::startup_message(notifier.recipients().len(), minutes, notifier.area(), Local::now());
    notifier.broadcast(&startup).await;
    info!(
        "Watching {} area every {} minutes for {} recipients",
        notifier.area(),
        minutes,
        notifier.recipients().len()
    );

    tokio::pin!(shutdown);
    let mut check = 0u64;
    loop {
        check += 1;
        info!("Check #{}", check);
        match watcher.run_cycle().await {
            Ok(report) => info!(
                "Check #{} done: {} ({} rooms notified so far)",
                check,
                report,
                watcher.tracker().len()
            ),
            Err(e) => error!("Check #{} failed: {:#}", check, e),
        }

        info!("Waiting {} minutes until next check", minutes);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = &mut shutdown => {
                return match signal {
                    Ok(()) => {
                        if watcher.tracker().is_empty() {
                            info!("Shutdown requested, stopping (no rooms were notified)");
                        } else {
                            info!("Shutdown requested, stopping ({} rooms notified)", watcher.tracker().len());
                        }
                        watcher.notifier().broadcast(&format::shutdown_message(Local::now())).await;
                        Ok(())
                    }
                    Err(e) => {
                        error!("Signal handling failed: {}", e);
                        let message = format::error_message(&e.to_string(), Local::now());
                        watcher.notifier().broadcast(&message).await;
                        Err(e).context("failed to listen for shutdown signals")
                    }
                };
            }
        }
    }
}

/// Install the Ctrl-C (and, on unix, SIGTERM) handlers now and return a
/// future that resolves once either arrives. A signal received before the
/// future is first polled is held, not lost.
pub fn shutdown_signal() -> io::Result<impl Future<Output = io::Result<()>>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => info!("Received SIGINT"),
                _ = terminate.recv() => info!("Received SIGTERM"),
            }
            Ok::<(), io::Error>(())
        })
    }

    #[cfg(not(unix))]
    {
        let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
        Ok(async move {
            ctrl_c.recv().await;
            Ok::<(), io::Error>(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractConfig;
    use crate::notify::Notifier;
    use crate::testing::{FakePageSource, FakeTransport};

    const INTERVAL: Duration = Duration::from_secs(5 * 60);

    const STUDIO: &str = r#"<div class="logement">Studio 18m² - Résidence Beauregard - 350€ - disponible immédiatement</div>"#;

    fn watcher(source: FakePageSource, transport: FakeTransport) -> Watcher<FakePageSource, FakeTransport> {
        let notifier = Notifier::new(
            transport,
            vec!["111".to_string(), "222".to_string()],
            "Rennes".to_string(),
            "https://example.org/search".to_string(),
        );
        Watcher::new(
            source,
            notifier,
            "https://example.org/search".to_string(),
            ExtractConfig {
                default_area: "Rennes".to_string(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn startup_cycles_and_shutdown() {
        let source = FakePageSource::serving(STUDIO);
        let transport = FakeTransport::default();
        let mut w = watcher(source.clone(), transport.clone());

        // three cycles fit before the signal: t=0, t=5m, t=10m
        let shutdown = async {
            tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(60)).await;
            Ok(())
        };
        run(&mut w, INTERVAL, shutdown).await.unwrap();

        assert_eq!(source.fetches(), 3);
        let messages: Vec<String> = transport
            .sent()
            .into_iter()
            .filter(|(r, _)| r == "111")
            .map(|(_, m)| m)
            .collect();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("CROUS Checker Started!"));
        assert!(messages[0].contains("Notifying: 2 user(s)"));
        assert!(messages[0].contains("Check interval: 5 minutes"));
        assert!(messages[1].contains("1 Rooms Available!"));
        assert!(messages[2].contains("CROUS Checker Stopped"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_fetch_keeps_the_loop_alive() {
        let source = FakePageSource::default();
        let transport = FakeTransport::default();
        let mut w = watcher(source.clone(), transport.clone());

        let shutdown = async {
            tokio::time::sleep(INTERVAL * 3 + Duration::from_secs(1)).await;
            Ok(())
        };
        run(&mut w, INTERVAL, shutdown).await.unwrap();

        assert_eq!(source.fetches(), 4);
        // startup and shutdown only
        assert_eq!(transport.sent().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn signal_error_is_reported_and_fatal() {
        let transport = FakeTransport::default();
        let mut w = watcher(FakePageSource::default(), transport.clone());

        let shutdown = async { Err(io::Error::new(io::ErrorKind::Other, "no signal driver")) };
        let err = run(&mut w, INTERVAL, shutdown).await.unwrap_err();

        assert!(format!("{:#}", err).contains("no signal driver"));
        let last = transport.sent().pop().unwrap().1;
        assert!(last.contains("CROUS Checker Error"));
        assert!(last.contains("no signal driver"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn signal_before_first_poll_stops_after_the_cycle() {
        let source = FakePageSource::serving(STUDIO);
        let transport = FakeTransport::default();
        let mut w = watcher(source.clone(), transport.clone());

        let shutdown = shutdown_signal().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(10), run(&mut w, INTERVAL, shutdown))
            .await
            .expect("held signal should end the loop at the first pause")
            .unwrap();

        assert_eq!(source.fetches(), 1);
        let last = transport.sent().pop().unwrap().1;
        assert!(last.contains("CROUS Checker Stopped"));
    }
}
