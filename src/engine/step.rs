use std::any::Any;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinError;

use crate::models::{FailureDetail, FailureKind};
use crate::registry::EffectFuture;

/// Run one hook or case effect to completion.
///
/// The effect runs as its own task: a panic surfaces as a `JoinError`
/// instead of unwinding through the engine, and a timeout or abort cancels
/// the task instead of leaving it running detached.
pub(crate) async fn run_step(
    effect: EffectFuture,
    timeout: Option<Duration>,
    abort: &mut watch::Receiver<bool>,
) -> Result<(), FailureDetail> {
    if *abort.borrow() {
        return Err(interrupted());
    }

    let mut task = tokio::spawn(effect);

    tokio::select! {
        biased;

        joined = &mut task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(FailureDetail::from_error(&err)),
            Err(err) => Err(join_failure(err)),
        },

        _ = deadline(timeout) => {
            task.abort();
            let after_ms = timeout.map(|d| d.as_millis()).unwrap_or_default();
            tracing::debug!(after_ms, "step timed out, task aborted");
            Err(FailureDetail::timeout(after_ms))
        }

        _ = aborted(abort) => {
            task.abort();
            Err(interrupted())
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

async fn aborted(abort: &mut watch::Receiver<bool>) {
    // A dropped sender means nobody can abort any more.
    if abort.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn interrupted() -> FailureDetail {
    FailureDetail::new(FailureKind::Interrupted, "Run aborted before the test finished")
}

fn join_failure(err: JoinError) -> FailureDetail {
    if err.is_panic() {
        let message = panic_message(err.into_panic().as_ref());
        FailureDetail::new(FailureKind::Panic, message)
    } else {
        FailureDetail::new(FailureKind::Interrupted, err.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn ok_effect_succeeds() {
        let (_tx, mut rx) = channel();
        let effect = async { Ok::<(), anyhow::Error>(()) }.boxed();
        let result = run_step(effect, None, &mut rx).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_message_is_preserved() {
        let (_tx, mut rx) = channel();
        let failure = run_step(
            async { Err::<(), _>(anyhow::anyhow!("assertion failed")) }.boxed(),
            None,
            &mut rx,
        )
        .await
        .unwrap_err();
        assert_eq!(failure.message, "assertion failed");
        assert_eq!(failure.kind, FailureKind::Error);
    }

    #[tokio::test]
    async fn panic_is_captured() {
        let (_tx, mut rx) = channel();
        let failure = run_step(
            async {
                panic!("exploded");
                #[allow(unreachable_code)]
                Ok::<(), anyhow::Error>(())
            }
            .boxed(),
            None,
            &mut rx,
        )
        .await
        .unwrap_err();
        assert_eq!(failure.message, "exploded");
        assert_eq!(failure.kind, FailureKind::Panic);
    }

    #[tokio::test]
    async fn timeout_cancels_the_effect() {
        let (_tx, mut rx) = channel();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let failure = run_step(
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<(), anyhow::Error>(())
            }
            .boxed(),
            Some(Duration::from_millis(20)),
            &mut rx,
        )
        .await
        .unwrap_err();

        assert!(failure.is_timeout());
        assert_eq!(failure.message, "Test timed out after 20ms");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn abort_interrupts_a_running_effect() {
        let (tx, mut rx) = channel();
        let handle = tokio::spawn(async move {
            run_step(
                std::future::pending::<anyhow::Result<()>>().boxed(),
                None,
                &mut rx,
            )
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send_replace(true);

        let failure = handle.await.unwrap().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Interrupted);
    }
}
